// Common test utilities for the models facade

use modelite::{
    EmbeddedBackend, EmbeddedConfig, FieldSpec, FieldType, Models, ModelsConfig, Record, ScopeFilter,
};
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

/// Models over a persistent embedded store with a `Post` model and the
/// scopes `published` and `mine` (author = context variable `user`)
pub struct ModelsFixture {
    #[allow(dead_code)]
    pub temp_dir: TempDir,
    #[allow(dead_code)]
    pub snapshot_path: PathBuf,
    #[allow(dead_code)]
    pub backend: Arc<EmbeddedBackend>,
    pub models: Models,
}

impl ModelsFixture {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let snapshot_path = temp_dir.path().join("models.snap");
        let backend = EmbeddedBackend::open(EmbeddedConfig::persistent(&snapshot_path))
            .expect("Failed to open store");
        backend
            .create_model(
                "Post",
                vec![
                    FieldSpec::new("title", FieldType::String).required(),
                    FieldSpec::new("slug", FieldType::String),
                    FieldSpec::new("status", FieldType::String),
                    FieldSpec::new("author", FieldType::Int),
                    FieldSpec::new("views", FieldType::Int),
                ],
            )
            .expect("Failed to create model");
        let backend = Arc::new(backend);

        let config = ModelsConfig::default()
            .with_scope("published", vec![ScopeFilter::value("status", "published")])
            .with_scope("mine", vec![ScopeFilter::var("author", "user")]);
        let models = Models::with_backend(backend.clone(), config);

        Self {
            temp_dir,
            snapshot_path,
            backend,
            models,
        }
    }

    /// Insert posts 1..=count: `views` = index, every third post is a draft,
    /// odd posts belong to author 1 and even ones to author 2
    #[allow(dead_code)]
    pub fn seed_posts(&self, count: i64) {
        for i in 1..=count {
            let status = if i % 3 == 0 { "draft" } else { "published" };
            let author = if i % 2 == 1 { 1 } else { 2 };
            self.models
                .save(
                    "Post",
                    Record::new()
                        .with("title", format!("Post {}", i))
                        .with("status", status)
                        .with("author", author)
                        .with("views", i),
                )
                .expect("Failed to insert post");
        }
    }
}

impl Default for ModelsFixture {
    fn default() -> Self {
        Self::new()
    }
}
