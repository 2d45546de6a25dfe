use serde_json::{Map, Value};

/// Request parameters: the JSON body object merged with the URL query
/// string. Query keys override body keys; a query key given more than once
/// becomes an array.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterSet(Map<String, Value>);

impl ParameterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a request body. An empty (or all-whitespace) body yields an
    /// empty set; anything else must be a JSON object.
    pub fn from_body(body: &[u8]) -> Result<Self, serde_json::Error> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        let map: Map<String, Value> = serde_json::from_slice(body)?;
        Ok(Self(map))
    }

    pub fn merge_query<I, K, V>(&mut self, pairs: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut seen: Vec<String> = Vec::new();
        for (key, value) in pairs {
            let key = key.into();
            let value = Value::String(value.into());
            if !seen.contains(&key) {
                seen.push(key.clone());
                self.0.insert(key, value);
                continue;
            }
            match self.0.get_mut(&key) {
                Some(Value::Array(items)) => items.push(value),
                Some(existing) => {
                    let first = existing.take();
                    *existing = Value::Array(vec![first, value]);
                }
                None => {
                    self.0.insert(key, value);
                }
            }
        }
    }

    /// Overlay `other` on top of `self`; keys in `other` win.
    pub fn merge(&mut self, other: ParameterSet) {
        self.0.extend(other.0);
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.0.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Like `get`, but an array yields its last element.
    pub fn last(&self, key: &str) -> Option<&Value> {
        match self.0.get(key)? {
            Value::Array(items) => items.last(),
            other => Some(other),
        }
    }

    pub fn last_str(&self, key: &str) -> Option<&str> {
        self.last(key).and_then(Value::as_str)
    }

    /// `true`, non-zero numbers and the strings `"1"`/`"true"` are truthy.
    pub fn is_truthy(&self, key: &str) -> bool {
        match self.last(key) {
            Some(Value::Bool(b)) => *b,
            Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
            Some(Value::String(s)) => matches!(s.as_str(), "1" | "true"),
            _ => false,
        }
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, Value)> for ParameterSet {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}
