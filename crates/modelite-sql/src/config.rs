use serde::{Deserialize, Serialize};

/// Parameter placeholder style of the target engine
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Placeholder {
    /// `?` (SQLite, MySQL)
    #[default]
    QuestionMark,
    /// `$1`, `$2`, ... (PostgreSQL)
    Numbered,
}

/// Options of the relational backend
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SqlConfig {
    pub placeholder: Placeholder,
}

impl SqlConfig {
    pub fn numbered() -> Self {
        Self {
            placeholder: Placeholder::Numbered,
        }
    }
}
