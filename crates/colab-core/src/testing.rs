//! Shared fixtures for unit and integration tests.
//!
//! A [`Bench`] owns one store pre-seeded with a project; tests drive the
//! engines through a fresh [`RequestContext`] per call so the store stays
//! freely borrowable in between.

use colab_api::{CardContentId, CardId, ProjectId, Result};

use crate::engine::lifecycle;
use crate::security::{OpenAccess, RequestContext};
use crate::store::ColabStore;

/// One project with its root card, ready for test scenarios.
pub struct Bench {
    pub store: ColabStore,
    pub project: ProjectId,
    pub root_content: CardContentId,
}

impl Bench {
    pub fn new() -> Self {
        let mut store = ColabStore::new();
        let gate = OpenAccess;
        let ctx = RequestContext::new(&gate);
        let project =
            lifecycle::create_project(&mut store, &ctx, "bench").expect("project creation");
        let root_content = store.root_content_of(project).expect("root content");
        Self {
            store,
            project,
            root_content,
        }
    }

    /// Run one engine call under an all-allowing gate.
    pub fn run<T>(
        &mut self,
        op: impl FnOnce(&mut ColabStore, &RequestContext<'_>) -> Result<T>,
    ) -> Result<T> {
        let gate = OpenAccess;
        let ctx = RequestContext::new(&gate);
        op(&mut self.store, &ctx)
    }

    /// Create a card under the root content.
    pub fn card(&mut self) -> CardId {
        let root_content = self.root_content;
        self.run(|store, ctx| lifecycle::create_new_card(store, ctx, root_content, None))
            .expect("card creation")
    }

    /// Create a card under an explicit parent content.
    pub fn card_under(&mut self, parent: CardContentId) -> CardId {
        self.run(|store, ctx| lifecycle::create_new_card(store, ctx, parent, None))
            .expect("card creation")
    }

    /// The first content variant of a card.
    pub fn content_of(&self, card: CardId) -> CardContentId {
        self.store.variants_of(card)[0]
    }
}

impl Default for Bench {
    fn default() -> Self {
        Self::new()
    }
}
