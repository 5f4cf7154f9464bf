// ── Snapshot and Persistence Port ──
//
// The whole library state as one value. Persistence is full-snapshot only:
// the port receives everything after each mutation, never a diff.

use std::cell::RefCell;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::{Item, KnowledgeBase};

// ── Types ──

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    #[serde(default)]
    pub knowledge_bases: Vec<KnowledgeBase>,
    #[serde(default)]
    pub items: Vec<Item>,
}

/// Durable storage for snapshots.
///
/// `load` returns `None` when storage holds nothing usable (see
/// [`Snapshot::is_usable`]), in which case the caller seeds default content.
pub trait PersistencePort {
    fn load(&self) -> Result<Option<Snapshot>>;
    fn save(&self, snapshot: &Snapshot) -> Result<()>;
}

/// Port that keeps the last saved snapshot in memory.
#[derive(Debug, Default)]
pub struct MemoryPort {
    saved: RefCell<Option<Snapshot>>,
    saves: RefCell<usize>,
}

// ── Public API ──

impl Snapshot {
    /// A snapshot without knowledge bases cannot hold any reachable items.
    pub fn is_usable(&self) -> bool {
        !self.knowledge_bases.is_empty()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(input: &str) -> Result<Self> {
        Ok(serde_json::from_str(input)?)
    }
}

impl MemoryPort {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_snapshot(snapshot: Snapshot) -> Self {
        Self {
            saved: RefCell::new(Some(snapshot)),
            saves: RefCell::new(0),
        }
    }

    pub fn saved(&self) -> Option<Snapshot> {
        self.saved.borrow().clone()
    }

    /// Number of `save` calls since construction.
    pub fn save_count(&self) -> usize {
        *self.saves.borrow()
    }
}

impl PersistencePort for MemoryPort {
    fn load(&self) -> Result<Option<Snapshot>> {
        Ok(self.saved.borrow().clone().filter(|s| s.is_usable()))
    }

    fn save(&self, snapshot: &Snapshot) -> Result<()> {
        *self.saved.borrow_mut() = Some(snapshot.clone());
        *self.saves.borrow_mut() += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_field_names() {
        let snapshot = Snapshot {
            knowledge_bases: vec![KnowledgeBase::new("Docs", "All docs")],
            items: Vec::new(),
        };
        let json = snapshot.to_json().unwrap();
        assert!(json.contains("\"knowledgeBases\""));
        assert!(json.contains("\"createdAt\""));

        let back = Snapshot::from_json(&json).unwrap();
        assert_eq!(back, snapshot);
    }

    #[test]
    fn test_from_json_rejects_garbage() {
        assert!(Snapshot::from_json("not json").is_err());
    }

    #[test]
    fn test_memory_port_treats_empty_as_none() {
        let port = MemoryPort::with_snapshot(Snapshot::default());
        assert!(port.load().unwrap().is_none());

        let snapshot = Snapshot {
            knowledge_bases: vec![KnowledgeBase::new("Docs", "")],
            items: Vec::new(),
        };
        port.save(&snapshot).unwrap();
        assert_eq!(port.load().unwrap(), Some(snapshot));
        assert_eq!(port.save_count(), 1);
    }
}
