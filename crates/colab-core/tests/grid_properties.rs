//! Property-based coverage of the grid layout algebra.

use proptest::prelude::*;

use colab_api::CardId;
use colab_core::grid::{Cell, Grid};

// Deliberately includes invalid positions and non-positive dimensions;
// the grid must normalize and relocate rather than reject.
fn arb_cell(id: u64) -> impl Strategy<Value = Cell> {
    (-3i32..12, -3i32..12, -2i32..4, -2i32..4)
        .prop_map(move |(x, y, w, h)| Cell::new(CardId(id), x, y, w, h))
}

fn arb_cells() -> impl Strategy<Value = Vec<Cell>> {
    prop::collection::vec((-3i32..12, -3i32..12, -2i32..4, -2i32..4), 0..12).prop_map(|raw| {
        raw.into_iter()
            .enumerate()
            .map(|(i, (x, y, w, h))| Cell::new(CardId(i as u64 + 1), x, y, w, h))
            .collect()
    })
}

fn check_no_overlap(grid: &Grid) -> Result<(), TestCaseError> {
    let cells = grid.cells();
    for (i, a) in cells.iter().enumerate() {
        for b in &cells[i + 1..] {
            prop_assert!(!a.overlaps(b), "{a:?} overlaps {b:?}");
        }
    }
    Ok(())
}

proptest! {
    #[test]
    fn resolution_produces_no_overlaps(cells in arb_cells()) {
        let grid = Grid::resolve_conflicts(cells);
        check_no_overlap(&grid)?;
        for cell in grid.cells() {
            prop_assert!(cell.width >= 1 && cell.height >= 1);
            prop_assert!(cell.x >= 1 && cell.y >= 1);
        }
    }

    #[test]
    fn shift_anchors_a_nonempty_grid_at_the_origin(cells in arb_cells()) {
        let mut grid = Grid::resolve_conflicts(cells);
        grid.shift();
        check_no_overlap(&grid)?;
        if !grid.cells().is_empty() {
            prop_assert_eq!(grid.cells().iter().map(|c| c.x).min(), Some(1));
            prop_assert_eq!(grid.cells().iter().map(|c| c.y).min(), Some(1));
        }
    }

    #[test]
    fn adding_a_cell_never_moves_placed_cells(cells in arb_cells(), extra in arb_cell(99)) {
        let mut grid = Grid::resolve_conflicts(cells);
        let before: Vec<Cell> = grid.cells().to_vec();
        grid.add_cell(extra);
        check_no_overlap(&grid)?;
        for old in before {
            prop_assert_eq!(grid.position_of(old.card), Some(old));
        }
    }
}
