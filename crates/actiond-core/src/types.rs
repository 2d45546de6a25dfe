use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

use crate::object::ConfigObject;

pub const FAILURE_CODE: u16 = 500;
pub const FAILURE_STATUS: &str = "Action execution failed.";

// ---------------------------------------------------------------------------
// Target
// ---------------------------------------------------------------------------

/// What a single invocation runs against. Type-less actions receive
/// `Target::None` exactly once.
#[derive(Debug, Clone)]
pub enum Target {
    Object(Arc<ConfigObject>),
    None,
}

impl Target {
    pub fn object(&self) -> Option<&ConfigObject> {
        match self {
            Target::Object(obj) => Some(obj),
            Target::None => None,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Target::None)
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Object(obj) => write!(f, "{}", obj.qualified_name()),
            Target::None => write!(f, "<none>"),
        }
    }
}

impl From<Arc<ConfigObject>> for Target {
    fn from(obj: Arc<ConfigObject>) -> Self {
        Target::Object(obj)
    }
}

// ---------------------------------------------------------------------------
// Result entries
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailureRecord {
    pub code: u16,
    pub status: String,
    #[serde(
        rename = "diagnostic information",
        skip_serializing_if = "Option::is_none"
    )]
    pub diagnostic: Option<String>,
}

impl FailureRecord {
    pub fn action_failed(diagnostic: Option<String>) -> Self {
        Self {
            code: FAILURE_CODE,
            status: FAILURE_STATUS.to_string(),
            diagnostic,
        }
    }
}

/// One element of the ordered outcome list. Serializes as the action's raw
/// value on success, or as the failure record.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ResultEntry {
    Success(Value),
    Failure(FailureRecord),
}

impl ResultEntry {
    pub fn is_failure(&self) -> bool {
        matches!(self, ResultEntry::Failure(_))
    }
}

impl From<std::result::Result<Value, FailureRecord>> for ResultEntry {
    fn from(outcome: std::result::Result<Value, FailureRecord>) -> Self {
        match outcome {
            Ok(value) => ResultEntry::Success(value),
            Err(failure) => ResultEntry::Failure(failure),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Envelope {
    pub results: Vec<ResultEntry>,
}

impl Envelope {
    pub fn failures(&self) -> usize {
        self.results.iter().filter(|r| r.is_failure()).count()
    }
}
