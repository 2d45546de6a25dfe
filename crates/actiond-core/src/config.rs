use crate::error::{ActiondError, Result};
use crate::object::{ConfigObject, ObjectStore};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::net::ToSocketAddrs;
use std::path::Path;

pub const DEFAULT_CONFIG_FILE: &str = "actiond.yaml";

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// DispatchConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Upper bound on concurrent invocations within one request.
    #[serde(default = "default_workers")]
    pub workers: usize,
}

fn default_workers() -> usize {
    1
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config (top-level)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_listen")]
    pub listen: String,
    /// Include diagnostic detail in every error response, not only for
    /// requests that ask for it.
    #[serde(default)]
    pub verbose_errors: bool,
    #[serde(default)]
    pub dispatch: DispatchConfig,
    #[serde(default)]
    pub objects: Vec<ConfigObject>,
}

fn default_listen() -> String {
    "127.0.0.1:5665".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            verbose_errors: false,
            dispatch: DispatchConfig::default(),
            objects: Vec::new(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ActiondError::NotConfigured(path.to_path_buf()));
        }
        let data = std::fs::read_to_string(path)?;
        Self::from_yaml(&data)
    }

    pub fn from_yaml(data: &str) -> Result<Self> {
        // serde_yaml rejects an empty document for a struct
        if data.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(data)?)
    }

    /// Build the read-only object inventory described by `objects`.
    pub fn object_store(&self) -> ObjectStore {
        ObjectStore::new(self.objects.iter().cloned())
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        if self.dispatch.workers == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "dispatch.workers is 0; requests will dispatch sequentially".to_string(),
            });
        }

        let resolvable = self
            .listen
            .to_socket_addrs()
            .is_ok_and(|mut addrs| addrs.next().is_some());
        if !resolvable {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: format!("listen address '{}' is not a valid socket address", self.listen),
            });
        }

        let mut seen = HashSet::new();
        for obj in &self.objects {
            if obj.type_name.trim().is_empty() || obj.name.trim().is_empty() {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Error,
                    message: format!(
                        "object with empty type or name (type '{}', name '{}')",
                        obj.type_name, obj.name
                    ),
                });
                continue;
            }
            if !seen.insert((obj.type_name.as_str(), obj.name.as_str())) {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Warning,
                    message: format!(
                        "duplicate object '{}'; the first definition is used",
                        obj.qualified_name()
                    ),
                });
            }
        }

        warnings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SAMPLE: &str = r#"
listen: 0.0.0.0:8080
verbose_errors: true
dispatch:
  workers: 4
objects:
  - type: Host
    name: web-01
    attrs:
      address: 10.0.0.1
  - type: Service
    name: web-01!http
"#;

    #[test]
    fn defaults_when_fields_absent() {
        let cfg = Config::from_yaml("objects: []\n").unwrap();
        assert_eq!(cfg.listen, "127.0.0.1:5665");
        assert!(!cfg.verbose_errors);
        assert_eq!(cfg.dispatch.workers, 1);
    }

    #[test]
    fn empty_document_is_default() {
        let cfg = Config::from_yaml("").unwrap();
        assert!(cfg.objects.is_empty());
    }

    #[test]
    fn load_reads_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(DEFAULT_CONFIG_FILE);
        std::fs::write(&path, SAMPLE).unwrap();

        let cfg = Config::load(&path).unwrap();
        assert_eq!(cfg.listen, "0.0.0.0:8080");
        assert!(cfg.verbose_errors);
        assert_eq!(cfg.dispatch.workers, 4);
        assert_eq!(cfg.objects.len(), 2);
        assert!(cfg.object_store().get("Host", "web-01").is_some());
        assert!(cfg.validate().is_empty());
    }

    #[test]
    fn load_missing_file_is_not_configured() {
        let dir = TempDir::new().unwrap();
        let err = Config::load(&dir.path().join("nope.yaml")).unwrap_err();
        assert!(matches!(err, ActiondError::NotConfigured(_)));
    }

    #[test]
    fn malformed_yaml_is_an_error() {
        assert!(matches!(
            Config::from_yaml("dispatch: [1, 2"),
            Err(ActiondError::Yaml(_))
        ));
    }

    #[test]
    fn hostname_listen_address_is_valid() {
        let cfg = Config::from_yaml("listen: localhost:5665\n").unwrap();
        assert!(cfg.validate().is_empty());
    }

    #[test]
    fn validate_flags_problems() {
        let cfg = Config::from_yaml(
            r#"
listen: not-an-address
dispatch:
  workers: 0
objects:
  - { type: Host, name: h1 }
  - { type: Host, name: h1 }
  - { type: Host, name: "" }
"#,
        )
        .unwrap();
        let warnings = cfg.validate();
        assert_eq!(warnings.len(), 4);
        assert_eq!(
            warnings
                .iter()
                .filter(|w| w.level == WarnLevel::Error)
                .count(),
            2
        );
        assert!(warnings
            .iter()
            .any(|w| w.message.contains("duplicate object 'Host!h1'")));
    }
}
