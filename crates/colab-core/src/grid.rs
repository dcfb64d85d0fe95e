//! Layout algebra for sibling cards inside one card content.
//!
//! Cells are axis-aligned integer rectangles. The grid guarantees two
//! things after a resolution pass: no two cells overlap, and the cell set
//! is anchored at (1,1). All operations are total; malformed geometry is
//! normalized instead of rejected.

use serde::{Deserialize, Serialize};

use colab_api::{Card, CardId};

/// Geometry assigned to a card detached from any grid, before re-insertion.
pub const DEFAULT_X_COORDINATE: i32 = 1;
pub const DEFAULT_Y_COORDINATE: i32 = 1;

/// One card's rectangle in its parent's grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    pub card: CardId,
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Cell {
    pub fn new(card: CardId, x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            card,
            x,
            y,
            width,
            height,
        }
    }

    pub fn from_card(card: &Card) -> Self {
        Self::new(card.id, card.x, card.y, card.width, card.height)
    }

    /// Non-positive dimensions collapse to 1x1.
    fn normalized(mut self) -> Self {
        if self.width < 1 {
            self.width = 1;
        }
        if self.height < 1 {
            self.height = 1;
        }
        self
    }

    fn has_valid_position(&self) -> bool {
        self.x >= 1 && self.y >= 1
    }

    /// Rectangle intersection on half-open ranges; touching edges do not
    /// overlap.
    pub fn overlaps(&self, other: &Cell) -> bool {
        self.x < other.x + other.width
            && other.x < self.x + self.width
            && self.y < other.y + other.height
            && other.y < self.y + self.height
    }
}

/// A set of non-overlapping cells.
#[derive(Clone, Debug, Default)]
pub struct Grid {
    cells: Vec<Cell>,
}

impl Grid {
    /// Place every cell, in the given (stable) order, relocating any cell
    /// whose rectangle collides with an already-placed one to the first
    /// free slot scanning row-major from (1,1).
    pub fn resolve_conflicts(cells: impl IntoIterator<Item = Cell>) -> Self {
        let mut grid = Grid::default();
        for cell in cells {
            grid.place(cell);
        }
        grid
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn position_of(&self, card: CardId) -> Option<Cell> {
        self.cells.iter().copied().find(|c| c.card == card)
    }

    /// Remove a cell from consideration; returns its last known geometry.
    pub fn reset_cell(&mut self, card: CardId) -> Option<Cell> {
        let index = self.cells.iter().position(|c| c.card == card)?;
        Some(self.cells.remove(index))
    }

    /// Insert one cell, claiming its requested rectangle when free and
    /// otherwise the first free slot. Already-placed cells never move.
    pub fn add_cell(&mut self, cell: Cell) -> Cell {
        self.place(cell)
    }

    /// Re-anchor the set so that `min(x) == 1` and `min(y) == 1`. No-op on
    /// an empty grid.
    pub fn shift(&mut self) {
        let Some(min_x) = self.cells.iter().map(|c| c.x).min() else {
            return;
        };
        let min_y = self.cells.iter().map(|c| c.y).min().unwrap_or(1);
        if min_x == 1 && min_y == 1 {
            return;
        }
        for cell in &mut self.cells {
            cell.x -= min_x - 1;
            cell.y -= min_y - 1;
        }
    }

    fn place(&mut self, cell: Cell) -> Cell {
        let mut cell = cell.normalized();
        if !cell.has_valid_position() || self.collides(&cell) {
            let (x, y) = self.first_free_slot(cell.width, cell.height);
            cell.x = x;
            cell.y = y;
        }
        self.cells.push(cell);
        cell
    }

    fn collides(&self, cell: &Cell) -> bool {
        self.cells.iter().any(|placed| placed.overlaps(cell))
    }

    /// Row-major scan from (1,1) for the first rectangle of the given size
    /// that overlaps nothing. Columns are bounded by the rightmost occupied
    /// column so a full grid grows downward; the row just below the lowest
    /// placed cell is always free, so the scan terminates inside the bounds.
    fn first_free_slot(&self, width: i32, height: i32) -> (i32, i32) {
        let max_x = self
            .cells
            .iter()
            .map(|c| c.x + c.width - 1)
            .max()
            .unwrap_or(1)
            .max(1);
        let max_y = self
            .cells
            .iter()
            .map(|c| c.y + c.height - 1)
            .max()
            .unwrap_or(0);
        for y in 1..=max_y + 1 {
            for x in 1..=max_x {
                let probe = Cell::new(CardId(0), x, y, width, height);
                if !self.collides(&probe) {
                    return (x, y);
                }
            }
        }
        (1, max_y + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell(id: u64, x: i32, y: i32, w: i32, h: i32) -> Cell {
        Cell::new(CardId(id), x, y, w, h)
    }

    fn assert_no_overlap(grid: &Grid) {
        let cells = grid.cells();
        for (i, a) in cells.iter().enumerate() {
            for b in &cells[i + 1..] {
                assert!(!a.overlaps(b), "{a:?} overlaps {b:?}");
            }
        }
    }

    #[test]
    fn adjacency_is_not_overlap() {
        let a = cell(1, 1, 1, 1, 1);
        let b = cell(2, 2, 1, 1, 1);
        let c = cell(3, 1, 2, 1, 1);
        assert!(!a.overlaps(&b));
        assert!(!a.overlaps(&c));
        assert!(a.overlaps(&a));
    }

    #[test]
    fn conflicting_cells_are_relocated_in_order() {
        let grid = Grid::resolve_conflicts(vec![
            cell(1, 1, 1, 1, 1),
            cell(2, 1, 1, 1, 1),
            cell(3, 1, 1, 1, 1),
        ]);
        assert_no_overlap(&grid);
        assert_eq!(grid.position_of(CardId(1)).unwrap(), cell(1, 1, 1, 1, 1));
        // The occupied area is one column wide, so relocation grows downward.
        assert_eq!(grid.position_of(CardId(2)).unwrap(), cell(2, 1, 2, 1, 1));
        assert_eq!(grid.position_of(CardId(3)).unwrap(), cell(3, 1, 3, 1, 1));
    }

    #[test]
    fn wide_cell_wraps_to_next_row() {
        let grid = Grid::resolve_conflicts(vec![cell(1, 1, 1, 2, 1), cell(2, 2, 1, 2, 1)]);
        assert_no_overlap(&grid);
        let moved = grid.position_of(CardId(2)).unwrap();
        assert_eq!((moved.x, moved.y), (1, 2));
    }

    #[test]
    fn malformed_geometry_is_normalized_to_unit_cell() {
        let grid = Grid::resolve_conflicts(vec![cell(1, 0, -3, 0, -1)]);
        let placed = grid.position_of(CardId(1)).unwrap();
        assert_eq!(placed, cell(1, 1, 1, 1, 1));
    }

    #[test]
    fn shift_reanchors_to_origin() {
        let mut grid = Grid::resolve_conflicts(vec![cell(1, 4, 3, 1, 1), cell(2, 5, 7, 2, 2)]);
        grid.shift();
        assert_eq!(grid.position_of(CardId(1)).unwrap(), cell(1, 1, 1, 1, 1));
        assert_eq!(grid.position_of(CardId(2)).unwrap(), cell(2, 2, 5, 2, 2));
        assert_eq!(grid.cells().iter().map(|c| c.x).min(), Some(1));
        assert_eq!(grid.cells().iter().map(|c| c.y).min(), Some(1));
    }

    #[test]
    fn shift_on_empty_grid_is_noop() {
        let mut grid = Grid::default();
        grid.shift();
        assert!(grid.cells().is_empty());
    }

    #[test]
    fn add_cell_never_perturbs_placed_cells() {
        let mut grid = Grid::resolve_conflicts(vec![cell(1, 1, 1, 1, 1), cell(2, 2, 1, 1, 1)]);
        let before: Vec<Cell> = grid.cells().to_vec();
        let placed = grid.add_cell(cell(3, 1, 1, 1, 1));
        assert_eq!((placed.x, placed.y), (1, 2));
        for old in before {
            assert_eq!(grid.position_of(old.card), Some(old));
        }
        assert_no_overlap(&grid);
    }

    #[test]
    fn reset_then_add_reclaims_the_freed_slot() {
        let mut grid = Grid::resolve_conflicts(vec![
            cell(1, 1, 1, 1, 1),
            cell(2, 2, 1, 1, 1),
            cell(3, 3, 1, 1, 1),
        ]);
        let freed = grid.reset_cell(CardId(2)).unwrap();
        assert_eq!((freed.x, freed.y), (2, 1));
        let placed = grid.add_cell(cell(4, DEFAULT_X_COORDINATE, DEFAULT_Y_COORDINATE, 1, 1));
        assert_eq!((placed.x, placed.y), (2, 1));
        assert_no_overlap(&grid);
    }
}
