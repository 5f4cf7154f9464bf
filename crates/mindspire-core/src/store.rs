// ── Item Store ──
//
// Flat keyed arena of items plus the knowledge base list. Parent links are
// plain ids, so the hierarchy never owns itself. Writes are crate-private:
// only the engine mutates the store.

use std::collections::BTreeMap;

use crate::types::{Item, ItemId, KnowledgeBase};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemStore {
    knowledge_bases: Vec<KnowledgeBase>,
    items: BTreeMap<ItemId, Item>,
}

// ── Public API ──

impl ItemStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &str) -> Option<&Item> {
        self.items.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.items.contains_key(id)
    }

    /// All items, in id order.
    pub fn all(&self) -> impl Iterator<Item = &Item> {
        self.items.values()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Raw members of the sibling group `(kb_id, parent_id)`, unsorted.
    pub fn group(&self, kb_id: &str, parent_id: Option<&str>) -> Vec<&Item> {
        self.items
            .values()
            .filter(|i| i.kb_id == kb_id && i.parent_id.as_deref() == parent_id)
            .collect()
    }

    pub fn knowledge_bases(&self) -> &[KnowledgeBase] {
        &self.knowledge_bases
    }

    pub fn knowledge_base(&self, id: &str) -> Option<&KnowledgeBase> {
        self.knowledge_bases.iter().find(|kb| kb.id == id)
    }

    // ── Engine-only writes ──

    pub(crate) fn get_mut(&mut self, id: &str) -> Option<&mut Item> {
        self.items.get_mut(id)
    }

    pub(crate) fn put(&mut self, item: Item) {
        self.items.insert(item.id.clone(), item);
    }

    pub(crate) fn remove(&mut self, id: &str) -> Option<Item> {
        self.items.remove(id)
    }

    pub(crate) fn put_knowledge_base(&mut self, kb: KnowledgeBase) {
        match self.knowledge_bases.iter_mut().find(|k| k.id == kb.id) {
            Some(existing) => *existing = kb,
            None => self.knowledge_bases.push(kb),
        }
    }
}
