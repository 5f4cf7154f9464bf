// ── Error Types ──

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MindspireError {
    #[error("name must not be empty")]
    EmptyName,

    #[error("unknown knowledge base: {0}")]
    UnknownKnowledgeBase(String),

    #[error("item not found: {0}")]
    ItemNotFound(String),

    #[error("invalid parent {parent_id}: {reason}")]
    InvalidParent { parent_id: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, MindspireError>;
