//! Rules loading and shared hot-reloadable handle.

use std::path::Path;
use std::sync::{Arc, RwLock};

use amlscan_core::{AmlError, AmlResult};
use tracing::{info, warn};

use crate::schema::{default_rules, RulesConfig};
use crate::validation::validate_rules;

/// Load a rules file (YAML, falling back to JSON for `.json` paths).
///
/// A missing file is not an error: the built-in minimal configuration is
/// returned so classification keeps working.
pub fn load_rules(path: &Path) -> AmlResult<RulesConfig> {
    if !path.exists() {
        warn!(path = %path.display(), "rules config not found, using built-in defaults");
        return Ok(default_rules());
    }

    let text = std::fs::read_to_string(path)?;
    let rules: RulesConfig = if path.extension().is_some_and(|e| e == "json") {
        serde_json::from_str(&text).map_err(|e| AmlError::serialization(e.to_string()))?
    } else {
        serde_yaml::from_str(&text).map_err(|e| AmlError::serialization(e.to_string()))?
    };

    for warning in validate_rules(&rules) {
        warn!(path = %path.display(), "{warning}");
    }
    info!(
        path = %path.display(),
        version = %rules.version,
        categories = rules.categories.len(),
        "loaded rules config"
    );
    Ok(rules)
}

/// Shared rules handle.
///
/// Readers take a cheap `Arc` clone; `reload` swaps the pointer atomically
/// so in-flight classification keeps its snapshot.
#[derive(Debug)]
pub struct SharedRules {
    inner: RwLock<Arc<RulesConfig>>,
}

impl SharedRules {
    /// Create a handle around an already-loaded config.
    pub fn new(rules: RulesConfig) -> Self {
        Self {
            inner: RwLock::new(Arc::new(rules)),
        }
    }

    /// Load from a path, falling back to built-in defaults.
    pub fn from_path(path: &Path) -> AmlResult<Self> {
        Ok(Self::new(load_rules(path)?))
    }

    /// Current config snapshot.
    pub fn get(&self) -> Arc<RulesConfig> {
        self.inner
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Re-read the file and swap the snapshot.
    pub fn reload(&self, path: &Path) -> AmlResult<()> {
        let fresh = Arc::new(load_rules(path)?);
        let mut guard = self
            .inner
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = fresh;
        Ok(())
    }
}

impl Default for SharedRules {
    fn default() -> Self {
        Self::new(default_rules())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_missing_file_falls_back() {
        let rules = load_rules(Path::new("/nonexistent/rules.yaml")).unwrap();
        assert_eq!(rules.scoring.get("GAMBLING"), Some(&30));
    }

    #[test]
    fn test_load_yaml_file() {
        let mut f = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(
            f,
            "version: \"2.0.0\"\nscoring:\n  GAMBLING: 40\ncategories:\n  gambling:\n    bookmaker: [\"\\\\bsts\\\\b\"]"
        )
        .unwrap();
        let rules = load_rules(f.path()).unwrap();
        assert_eq!(rules.version, "2.0.0");
        assert_eq!(rules.scoring.get("GAMBLING"), Some(&40));
    }

    #[test]
    fn test_shared_reload_swaps_snapshot() {
        let shared = SharedRules::default();
        let before = shared.get();
        assert_eq!(before.version, "1.0.0");

        let mut f = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(f, "version: \"9.9.9\"").unwrap();
        shared.reload(f.path()).unwrap();

        // Old snapshot unchanged, new readers see the fresh config.
        assert_eq!(before.version, "1.0.0");
        assert_eq!(shared.get().version, "9.9.9");
    }
}
