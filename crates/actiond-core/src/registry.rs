use std::collections::HashMap;
use std::sync::Arc;

use crate::action::Action;
use crate::error::{ActiondError, Result};

/// Exact-name action lookup.
pub trait ActionLookup: Send + Sync {
    fn resolve(&self, name: &str) -> Option<Arc<dyn Action>>;
}

/// Action catalogue populated at startup and shared read-only afterwards.
#[derive(Default, Clone)]
pub struct ActionRegistry {
    actions: HashMap<String, Arc<dyn Action>>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, action: impl Action + 'static) -> Result<()> {
        let name = action.name().to_string();
        if self.actions.contains_key(&name) {
            return Err(ActiondError::DuplicateAction(name));
        }
        self.actions.insert(name, Arc::new(action));
        Ok(())
    }

    /// Actions sorted by name.
    pub fn actions(&self) -> Vec<Arc<dyn Action>> {
        let mut all: Vec<_> = self.actions.values().cloned().collect();
        all.sort_by(|a, b| a.name().cmp(b.name()));
        all
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

impl ActionLookup for ActionRegistry {
    fn resolve(&self, name: &str) -> Option<Arc<dyn Action>> {
        self.actions.get(name).cloned()
    }
}
