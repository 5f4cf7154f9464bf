use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ── Types ──

pub type ItemId = String;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ItemType {
    Folder,
    File,
}

/// Where a dragged item lands relative to the drop target.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MovePosition {
    Into,
    Before,
    After,
    Root,
}

/// A top-level container owning an independent item hierarchy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeBase {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

/// A folder or markdown file inside a knowledge base.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: ItemId,
    pub kb_id: String,
    pub parent_id: Option<ItemId>,
    #[serde(rename = "type")]
    pub item_type: ItemType,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Manual sort key among siblings.
    pub order: i64,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Breadcrumb {
    pub id: ItemId,
    pub name: String,
}

// ── Helpers ──

pub(crate) fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Current time at millisecond precision, the resolution snapshots store.
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

impl KnowledgeBase {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            name: name.into(),
            description: description.into(),
            created_at: now(),
        }
    }
}

impl Item {
    pub fn is_folder(&self) -> bool {
        self.item_type == ItemType::Folder
    }

    pub fn is_file(&self) -> bool {
        self.item_type == ItemType::File
    }
}

impl std::fmt::Display for ItemType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ItemType::Folder => write!(f, "folder"),
            ItemType::File => write!(f, "file"),
        }
    }
}

impl std::str::FromStr for ItemType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "folder" | "dir" => Ok(ItemType::Folder),
            "file" | "doc" => Ok(ItemType::File),
            other => Err(format!("unknown item type: {other}")),
        }
    }
}

impl std::fmt::Display for MovePosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MovePosition::Into => write!(f, "into"),
            MovePosition::Before => write!(f, "before"),
            MovePosition::After => write!(f, "after"),
            MovePosition::Root => write!(f, "root"),
        }
    }
}

impl std::str::FromStr for MovePosition {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "into" | "inside" => Ok(MovePosition::Into),
            "before" => Ok(MovePosition::Before),
            "after" => Ok(MovePosition::After),
            "root" => Ok(MovePosition::Root),
            other => Err(format!("unknown move position: {other}")),
        }
    }
}
