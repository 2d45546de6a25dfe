mod expr;

use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use crate::object::{ConfigObject, ObjectStore};
use crate::params::ParameterSet;
use crate::types::Target;

pub use expr::{parse, Expr};

// ---------------------------------------------------------------------------
// QueryDescription / FilterEngine
// ---------------------------------------------------------------------------

/// The object types a query may target. Built per request from the action's
/// declared types.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryDescription {
    pub types: BTreeSet<String>,
}

impl QueryDescription {
    pub fn for_types<I, S>(types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            types: types.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Error)]
pub enum FilterError {
    #[error("Type must be specified when there is more than one type.")]
    TypeRequired,

    #[error("Invalid type '{0}' specified for this query.")]
    InvalidType(String),

    #[error("Object '{name}' of type '{type_name}' does not exist.")]
    NoSuchObject { type_name: String, name: String },

    #[error("Parameter '{key}' must be {expected}.")]
    InvalidParameter { key: String, expected: &'static str },

    #[error("Invalid filter expression: {0}")]
    Syntax(String),

    #[error("Filter variable '{0}' is not defined.")]
    UnknownVariable(String),

    #[error("Filter path '{path}' must start with '{prefix}.'")]
    InvalidPath { path: String, prefix: String },
}

/// Turns a query description plus request parameters into an ordered target
/// sequence.
pub trait FilterEngine: Send + Sync {
    fn resolve(
        &self,
        query: &QueryDescription,
        params: &ParameterSet,
    ) -> Result<Vec<Target>, FilterError>;
}

// ---------------------------------------------------------------------------
// StoreFilterEngine
// ---------------------------------------------------------------------------

/// Resolves targets against an in-memory `ObjectStore`.
///
/// Selection parameters, for a type `Host`:
/// - `type`: required when the query allows more than one type
/// - `host`: one object name
/// - `hosts`: array of object names
/// - `filter`: expression evaluated against every `Host`, with `filter_vars`
///   supplying named values
///
/// The selections are unioned in that order. With none of them present every
/// object of the type is targeted.
pub struct StoreFilterEngine {
    store: Arc<ObjectStore>,
}

impl StoreFilterEngine {
    pub fn new(store: Arc<ObjectStore>) -> Self {
        Self { store }
    }

    fn lookup(&self, type_name: &str, name: &str) -> Result<Arc<ConfigObject>, FilterError> {
        self.store
            .get(type_name, name)
            .ok_or_else(|| FilterError::NoSuchObject {
                type_name: type_name.to_string(),
                name: name.to_string(),
            })
    }
}

impl FilterEngine for StoreFilterEngine {
    fn resolve(
        &self,
        query: &QueryDescription,
        params: &ParameterSet,
    ) -> Result<Vec<Target>, FilterError> {
        let type_name = select_type(query, params)?;
        let singular = type_name.to_lowercase();
        let plural = plural_name(&singular);

        let mut selected: Vec<Arc<ConfigObject>> = Vec::new();
        let mut explicit = false;

        if let Some(name) = string_param(params, &singular)? {
            explicit = true;
            selected.push(self.lookup(&type_name, name)?);
        }

        if let Some(value) = params.get(&plural) {
            explicit = true;
            for name in string_list(&plural, value)? {
                selected.push(self.lookup(&type_name, name)?);
            }
        }

        if let Some(src) = string_param(params, "filter")? {
            explicit = true;
            let expr = parse(src)?;
            let vars = filter_vars(params)?;
            for obj in self.store.of_type(&type_name) {
                if expr.eval(&singular, obj, &vars)? {
                    selected.push(Arc::clone(obj));
                }
            }
        }

        if !explicit {
            selected.extend(self.store.of_type(&type_name).cloned());
        }

        let mut targets: Vec<Target> = Vec::with_capacity(selected.len());
        for obj in selected {
            let seen = targets
                .iter()
                .any(|t| t.object().is_some_and(|o| std::ptr::eq(o, obj.as_ref())));
            if !seen {
                targets.push(Target::Object(obj));
            }
        }

        debug!(type_name = %type_name, count = targets.len(), "resolved filter targets");
        Ok(targets)
    }
}

fn select_type(query: &QueryDescription, params: &ParameterSet) -> Result<String, FilterError> {
    let type_name = match string_param(params, "type")? {
        Some(t) => t.to_string(),
        None if query.types.len() == 1 => query.types.iter().next().cloned().unwrap_or_default(),
        None => return Err(FilterError::TypeRequired),
    };
    if !query.types.contains(&type_name) {
        return Err(FilterError::InvalidType(type_name));
    }
    Ok(type_name)
}

/// A single-valued string parameter. A repeated query key arrives as an
/// array and its last element wins; an empty array or a non-string value is
/// rejected rather than treated as absent.
fn string_param<'a>(params: &'a ParameterSet, key: &str) -> Result<Option<&'a str>, FilterError> {
    let Some(value) = params.get(key) else {
        return Ok(None);
    };
    let last = match value {
        Value::Array(items) => items.last(),
        other => Some(other),
    };
    last.and_then(Value::as_str)
        .map(Some)
        .ok_or_else(|| FilterError::InvalidParameter {
            key: key.to_string(),
            expected: "a string",
        })
}

/// `host` -> `hosts`, `dependency` -> `dependencies`.
fn plural_name(singular: &str) -> String {
    match singular.strip_suffix('y') {
        Some(stem) if !stem.is_empty() => format!("{stem}ies"),
        _ => format!("{singular}s"),
    }
}

fn string_list<'a>(key: &str, value: &'a Value) -> Result<Vec<&'a str>, FilterError> {
    let invalid = || FilterError::InvalidParameter {
        key: key.to_string(),
        expected: "an array of strings",
    };
    match value {
        Value::String(s) => Ok(vec![s.as_str()]),
        Value::Array(items) => items
            .iter()
            .map(|v| v.as_str().ok_or_else(invalid))
            .collect(),
        _ => Err(invalid()),
    }
}

/// `filter_vars` may arrive as a JSON object (body) or a JSON-encoded string
/// (query string).
fn filter_vars(params: &ParameterSet) -> Result<Map<String, Value>, FilterError> {
    let invalid = || FilterError::InvalidParameter {
        key: "filter_vars".to_string(),
        expected: "a JSON object",
    };
    let value = match params.get("filter_vars") {
        None => return Ok(Map::new()),
        Some(Value::Array(items)) => items.last(),
        Some(other) => Some(other),
    };
    match value {
        Some(Value::Object(map)) => Ok(map.clone()),
        Some(Value::String(s)) => serde_json::from_str(s).map_err(|_| invalid()),
        _ => Err(invalid()),
    }
}
