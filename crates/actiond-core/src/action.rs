use serde_json::Value;

use crate::params::ParameterSet;
use crate::types::Target;

/// A named operation invoked once per resolved target.
///
/// An action with no declared types is type-less: it runs exactly once per
/// request against `Target::None`.
pub trait Action: Send + Sync {
    fn name(&self) -> &str;

    /// Object types this action applies to. Empty means type-less.
    fn types(&self) -> &[String];

    fn invoke(&self, target: &Target, params: &ParameterSet) -> anyhow::Result<Value>;
}

type Handler = dyn Fn(&Target, &ParameterSet) -> anyhow::Result<Value> + Send + Sync;

/// An action backed by a closure.
pub struct FnAction {
    name: String,
    types: Vec<String>,
    handler: Box<Handler>,
}

impl FnAction {
    pub fn new<F>(name: impl Into<String>, types: &[&str], handler: F) -> Self
    where
        F: Fn(&Target, &ParameterSet) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            types: types.iter().map(|t| t.to_string()).collect(),
            handler: Box::new(handler),
        }
    }
}

impl Action for FnAction {
    fn name(&self) -> &str {
        &self.name
    }

    fn types(&self) -> &[String] {
        &self.types
    }

    fn invoke(&self, target: &Target, params: &ParameterSet) -> anyhow::Result<Value> {
        (self.handler)(target, params)
    }
}

impl std::fmt::Debug for FnAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnAction")
            .field("name", &self.name)
            .field("types", &self.types)
            .finish_non_exhaustive()
    }
}
