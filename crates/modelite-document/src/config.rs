use serde::{Deserialize, Serialize};

/// Options of the document backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentConfig {
    /// Name of the store's primary key field; records expose it as `id`
    pub id_field: String,
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            id_field: "_id".to_string(),
        }
    }
}
