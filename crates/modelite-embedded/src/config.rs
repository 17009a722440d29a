use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Options of the embedded store
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddedConfig {
    /// Create a schemaless model on first reference instead of failing
    /// with `ModelNotFound`
    pub auto_create_models: bool,
    /// Snapshot file loaded by `open` and written by `save`
    pub snapshot_path: Option<PathBuf>,
}

impl EmbeddedConfig {
    /// Volatile store with explicit model creation
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Store persisted to `path`
    pub fn persistent(path: impl Into<PathBuf>) -> Self {
        Self {
            snapshot_path: Some(path.into()),
            ..Self::default()
        }
    }

    pub fn with_auto_create(mut self, enabled: bool) -> Self {
        self.auto_create_models = enabled;
        self
    }
}
