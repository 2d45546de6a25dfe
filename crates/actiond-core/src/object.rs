use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;

// ---------------------------------------------------------------------------
// ConfigObject
// ---------------------------------------------------------------------------

/// One addressable entity an action can be invoked against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigObject {
    #[serde(rename = "type")]
    pub type_name: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub attrs: Map<String, Value>,
}

impl ConfigObject {
    pub fn new(type_name: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            name: name.into(),
            attrs: Map::new(),
        }
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: Value) -> Self {
        self.attrs.insert(key.into(), value);
        self
    }

    /// Walk nested attribute maps, e.g. `["vars", "os"]`.
    pub fn attr(&self, path: &[&str]) -> Option<&Value> {
        let (first, rest) = path.split_first()?;
        let mut current = self.attrs.get(*first)?;
        for segment in rest {
            current = current.as_object()?.get(*segment)?;
        }
        Some(current)
    }

    /// `Host!web-01`
    pub fn qualified_name(&self) -> String {
        format!("{}!{}", self.type_name, self.name)
    }
}

// ---------------------------------------------------------------------------
// ObjectStore
// ---------------------------------------------------------------------------

/// Read-only object inventory, built once at startup.
///
/// Iteration order is insertion order. When the same `(type, name)` pair is
/// inserted twice the first definition wins; `Config::validate` reports the
/// duplicate.
#[derive(Debug, Default)]
pub struct ObjectStore {
    objects: Vec<Arc<ConfigObject>>,
    index: HashMap<(String, String), usize>,
}

impl ObjectStore {
    pub fn new(objects: impl IntoIterator<Item = ConfigObject>) -> Self {
        let mut store = Self::default();
        for object in objects {
            let key = (object.type_name.clone(), object.name.clone());
            if store.index.contains_key(&key) {
                continue;
            }
            store.index.insert(key, store.objects.len());
            store.objects.push(Arc::new(object));
        }
        store
    }

    pub fn get(&self, type_name: &str, name: &str) -> Option<Arc<ConfigObject>> {
        self.index
            .get(&(type_name.to_string(), name.to_string()))
            .and_then(|&i| self.objects.get(i))
            .cloned()
    }

    pub fn of_type<'a>(
        &'a self,
        type_name: &'a str,
    ) -> impl Iterator<Item = &'a Arc<ConfigObject>> + 'a {
        self.objects
            .iter()
            .filter(move |o| o.type_name == type_name)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}
