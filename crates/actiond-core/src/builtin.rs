//! Actions registered by default.

use anyhow::{anyhow, bail, Context};
use serde_json::{json, Value};

use crate::action::Action;
use crate::error::Result;
use crate::params::ParameterSet;
use crate::registry::ActionRegistry;
use crate::types::Target;

const OBJECT_TYPES: [&str; 2] = ["Host", "Service"];

fn object_types() -> Vec<String> {
    OBJECT_TYPES.iter().map(|t| t.to_string()).collect()
}

fn success(status: impl Into<String>) -> Value {
    json!({ "code": 200, "status": status.into() })
}

impl ActionRegistry {
    /// A registry holding every built-in action.
    pub fn with_builtins() -> Result<Self> {
        let mut registry = Self::new();
        registry.register(Ping)?;
        registry.register(DescribeObject::default())?;
        registry.register(RequireAttribute::default())?;
        Ok(registry)
    }
}

// ---------------------------------------------------------------------------
// ping
// ---------------------------------------------------------------------------

/// Type-less liveness check; echoes the request parameters back.
pub struct Ping;

impl Action for Ping {
    fn name(&self) -> &str {
        "ping"
    }

    fn types(&self) -> &[String] {
        &[]
    }

    fn invoke(&self, _target: &Target, params: &ParameterSet) -> anyhow::Result<Value> {
        let mut result = success("pong");
        result["params"] = Value::Object(params.as_map().clone());
        Ok(result)
    }
}

// ---------------------------------------------------------------------------
// describe-object
// ---------------------------------------------------------------------------

pub struct DescribeObject {
    types: Vec<String>,
}

impl Default for DescribeObject {
    fn default() -> Self {
        Self {
            types: object_types(),
        }
    }
}

impl Action for DescribeObject {
    fn name(&self) -> &str {
        "describe-object"
    }

    fn types(&self) -> &[String] {
        &self.types
    }

    fn invoke(&self, target: &Target, _params: &ParameterSet) -> anyhow::Result<Value> {
        let obj = target
            .object()
            .ok_or_else(|| anyhow!("describe-object requires a target object"))?;
        let mut result = success(format!("Described object '{}'.", obj.name));
        result["type"] = json!(obj.type_name);
        result["name"] = json!(obj.name);
        result["attrs"] = Value::Object(obj.attrs.clone());
        Ok(result)
    }
}

// ---------------------------------------------------------------------------
// require-attribute
// ---------------------------------------------------------------------------

/// Fails for every target lacking the attribute named by the `attribute`
/// parameter (dotted paths reach into nested maps).
pub struct RequireAttribute {
    types: Vec<String>,
}

impl Default for RequireAttribute {
    fn default() -> Self {
        Self {
            types: object_types(),
        }
    }
}

impl Action for RequireAttribute {
    fn name(&self) -> &str {
        "require-attribute"
    }

    fn types(&self) -> &[String] {
        &self.types
    }

    fn invoke(&self, target: &Target, params: &ParameterSet) -> anyhow::Result<Value> {
        let obj = target
            .object()
            .ok_or_else(|| anyhow!("require-attribute requires a target object"))?;
        let attribute = params
            .last_str("attribute")
            .context("parameter 'attribute' is required")?;
        let path: Vec<&str> = attribute.split('.').collect();
        match obj.attr(&path) {
            Some(Value::Null) | None => bail!(
                "object '{}' has no attribute '{attribute}'",
                obj.qualified_name()
            ),
            Some(value) => {
                let mut result = success(format!(
                    "Attribute '{attribute}' is set on object '{}'.",
                    obj.name
                ));
                result["value"] = value.clone();
                Ok(result)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::ConfigObject;
    use std::sync::Arc;

    fn host() -> Target {
        Target::Object(Arc::new(
            ConfigObject::new("Host", "web-01").with_attr("vars", json!({ "os": "linux" })),
        ))
    }

    fn params(pairs: &[(&str, Value)]) -> ParameterSet {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn builtins_register_without_conflict() {
        let registry = ActionRegistry::with_builtins().unwrap();
        assert_eq!(registry.len(), 3);
        let names: Vec<_> = registry
            .actions()
            .iter()
            .map(|a| a.name().to_string())
            .collect();
        assert_eq!(names, vec!["describe-object", "ping", "require-attribute"]);
    }

    #[test]
    fn ping_is_typeless_and_echoes() {
        assert!(Ping.types().is_empty());
        let out = Ping
            .invoke(&Target::None, &params(&[("note", json!("hello"))]))
            .unwrap();
        assert_eq!(out["status"], "pong");
        assert_eq!(out["params"]["note"], "hello");
    }

    #[test]
    fn describe_object_returns_attrs() {
        let out = DescribeObject::default()
            .invoke(&host(), &ParameterSet::new())
            .unwrap();
        assert_eq!(out["code"], 200);
        assert_eq!(out["type"], "Host");
        assert_eq!(out["attrs"]["vars"]["os"], "linux");
    }

    #[test]
    fn describe_object_needs_a_target() {
        assert!(DescribeObject::default()
            .invoke(&Target::None, &ParameterSet::new())
            .is_err());
    }

    #[test]
    fn require_attribute_checks_nested_paths() {
        let action = RequireAttribute::default();
        let ok = action
            .invoke(&host(), &params(&[("attribute", json!("vars.os"))]))
            .unwrap();
        assert_eq!(ok["value"], "linux");

        let err = action
            .invoke(&host(), &params(&[("attribute", json!("vars.arch"))]))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "object 'Host!web-01' has no attribute 'vars.arch'"
        );

        assert!(action.invoke(&host(), &ParameterSet::new()).is_err());
    }
}
