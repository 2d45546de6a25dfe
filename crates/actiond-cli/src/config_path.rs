use actiond_core::config::{Config, DEFAULT_CONFIG_FILE};
use anyhow::Context;
use std::path::{Path, PathBuf};

/// Resolve the config file.
///
/// Priority:
/// 1. `--config` flag / `ACTIOND_CONFIG` env var (passed in as `explicit`)
/// 2. Walk upward from `start` looking for `actiond.yaml`
/// 3. None: run on built-in defaults
pub fn resolve_config(explicit: Option<&Path>, start: &Path) -> Option<PathBuf> {
    if let Some(p) = explicit {
        return Some(p.to_path_buf());
    }

    let mut dir = start.to_path_buf();
    loop {
        let candidate = dir.join(DEFAULT_CONFIG_FILE);
        if candidate.is_file() {
            return Some(candidate);
        }
        match dir.parent() {
            Some(p) => dir = p.to_path_buf(),
            None => return None,
        }
    }
}

/// Load the resolved config. An explicit path must exist; with no config
/// anywhere the defaults are used.
pub fn load_config(explicit: Option<&Path>) -> anyhow::Result<Config> {
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    match resolve_config(explicit, &cwd) {
        Some(path) => {
            tracing::debug!(path = %path.display(), "loading config");
            Config::load(&path).with_context(|| format!("failed to load {}", path.display()))
        }
        None => Ok(Config::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn explicit_path_wins() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(DEFAULT_CONFIG_FILE), "").unwrap();
        let explicit = dir.path().join("other.yaml");
        let result = resolve_config(Some(&explicit), dir.path());
        assert_eq!(result, Some(explicit));
    }

    #[test]
    fn finds_config_in_ancestor() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(DEFAULT_CONFIG_FILE), "").unwrap();
        let subdir = dir.path().join("deploy/staging");
        std::fs::create_dir_all(&subdir).unwrap();

        let result = resolve_config(None, &subdir);
        assert_eq!(result, Some(dir.path().join(DEFAULT_CONFIG_FILE)));
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let err = load_config(Some(&dir.path().join("missing.yaml"))).unwrap_err();
        assert!(format!("{err:#}").contains("config file not found"));
    }
}
