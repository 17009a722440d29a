// Common test utilities for embedded store integration tests

use modelite_core::{Backend, FieldSpec, FieldType, ModelRef, Query, Record};
use modelite_embedded::{EmbeddedBackend, EmbeddedConfig};
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

/// Store with a `User` model and a temporary snapshot location
pub struct StoreFixture {
    #[allow(dead_code)]
    pub temp_dir: TempDir,
    pub snapshot_path: PathBuf,
    pub backend: Arc<EmbeddedBackend>,
}

impl StoreFixture {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let snapshot_path = temp_dir.path().join("store.snap");
        let backend = EmbeddedBackend::open(EmbeddedConfig::persistent(&snapshot_path))
            .expect("Failed to open store");
        backend
            .create_model(
                "User",
                vec![
                    FieldSpec::new("name", FieldType::String).required(),
                    FieldSpec::new("age", FieldType::Int),
                    FieldSpec::new("role", FieldType::String),
                    FieldSpec::new("visits", FieldType::Int),
                    FieldSpec::new("tags", FieldType::List),
                ],
            )
            .expect("Failed to create model");

        Self {
            temp_dir,
            snapshot_path,
            backend: Arc::new(backend),
        }
    }

    pub fn model(&self) -> ModelRef {
        ModelRef::new("User")
    }

    pub fn query(&self) -> Query {
        Query::new(self.model(), self.backend.clone())
    }

    /// Insert `count` users named user1..userN with age = index
    #[allow(dead_code)]
    pub fn seed(&self, count: i64) {
        for i in 1..=count {
            let role = if i % 2 == 0 { "admin" } else { "guest" };
            self.backend
                .add(
                    &self.model(),
                    Record::new()
                        .with("name", format!("user{}", i))
                        .with("age", i)
                        .with("role", role),
                )
                .expect("Failed to insert user");
        }
    }
}

impl Default for StoreFixture {
    fn default() -> Self {
        Self::new()
    }
}
