// ── Mutation Engine ──
//
// The only writer of the item store. Every operation runs to completion on
// `&mut self`, so observers never see a half-applied change. Routine invalid
// gestures (stale ids, self drops, cycles) are reported as no-op outcomes
// rather than errors; only input validation fails with `Err`.

use std::collections::{BTreeSet, HashSet};

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::assist::{self, AiAction, Language};
use crate::error::{MindspireError, Result};
use crate::guard;
use crate::query::{self, TreeEntry};
use crate::snapshot::Snapshot;
use crate::store::ItemStore;
use crate::types::{new_id, now, Breadcrumb, Item, ItemId, ItemType, KnowledgeBase, MovePosition};

// ── Types ──

/// What to do when an item is dropped onto a target in another knowledge base.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CrossKbPolicy {
    /// Leave the store untouched.
    #[default]
    Reject,
    /// Move the item and its whole subtree into the target's knowledge base.
    Adopt,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct EngineConfig {
    #[serde(default)]
    pub cross_kb_moves: CrossKbPolicy,
}

/// Where a move left the dragged item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovedItem {
    pub id: ItemId,
    pub kb_id: String,
    pub parent_id: Option<ItemId>,
    pub order: i64,
    /// Folder a tree view should expand to reveal the item (`Into` drops).
    pub expand: Option<ItemId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveRejection {
    SelfTarget,
    MissingItem,
    MissingTarget,
    Cycle,
    CrossKnowledgeBase,
    NotAFolder,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveOutcome {
    Moved(MovedItem),
    Rejected(MoveRejection),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Engine {
    store: ItemStore,
    config: EngineConfig,
}

// ── Public API ──

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            store: ItemStore::new(),
            config,
        }
    }

    /// Build an engine from a snapshot that may not have gone through the
    /// engine (hand edits, bulk imports). Broken references, parent loops and
    /// duplicate sibling orders are repaired so the usual invariants hold.
    pub fn from_snapshot(snapshot: Snapshot, config: EngineConfig) -> Self {
        let mut store = ItemStore::new();
        for kb in snapshot.knowledge_bases {
            store.put_knowledge_base(kb);
        }
        for mut item in snapshot.items {
            if store.knowledge_base(&item.kb_id).is_none() {
                log::warn!("dropping item {} of unknown knowledge base {}", item.id, item.kb_id);
                continue;
            }
            if item.is_folder() && item.content.take().is_some() {
                log::warn!("clearing content of folder {}", item.id);
            }
            store.put(item);
        }

        let mut engine = Self { store, config };
        engine.repair_parents();
        engine.repair_orders();
        engine
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            knowledge_bases: self.store.knowledge_bases().to_vec(),
            items: self.store.all().cloned().collect(),
        }
    }

    pub fn store(&self) -> &ItemStore {
        &self.store
    }

    // ── Queries ──

    pub fn get(&self, id: &str) -> Option<&Item> {
        self.store.get(id)
    }

    pub fn knowledge_bases(&self) -> &[KnowledgeBase] {
        self.store.knowledge_bases()
    }

    pub fn children_of(&self, kb_id: &str, parent_id: Option<&str>) -> Vec<&Item> {
        query::children_of(&self.store, kb_id, parent_id)
    }

    pub fn descendants_of(&self, id: &str) -> Vec<ItemId> {
        query::descendants_of(&self.store, id)
    }

    pub fn breadcrumbs(&self, id: &str) -> Vec<Breadcrumb> {
        query::breadcrumbs(&self.store, id)
    }

    pub fn tree(&self, kb_id: &str) -> Vec<TreeEntry<'_>> {
        query::tree(&self.store, kb_id)
    }

    pub fn would_create_cycle(&self, dragged_id: &str, target_id: Option<&str>) -> bool {
        guard::would_create_cycle(&self.store, dragged_id, target_id)
    }

    // ── Mutations ──

    pub fn create_knowledge_base(
        &mut self,
        name: &str,
        description: Option<&str>,
    ) -> Result<KnowledgeBase> {
        if name.trim().is_empty() {
            return Err(MindspireError::EmptyName);
        }
        let kb = KnowledgeBase::new(name, description.unwrap_or("New Knowledge Base"));
        log::info!("created knowledge base {} ({})", kb.id, kb.name);
        self.store.put_knowledge_base(kb.clone());
        Ok(kb)
    }

    /// Create an item appended after every current sibling.
    pub fn create_item(
        &mut self,
        kb_id: &str,
        parent_id: Option<&str>,
        item_type: ItemType,
        name: &str,
    ) -> Result<Item> {
        if name.trim().is_empty() {
            return Err(MindspireError::EmptyName);
        }
        if self.store.knowledge_base(kb_id).is_none() {
            return Err(MindspireError::UnknownKnowledgeBase(kb_id.to_string()));
        }
        if let Some(parent_id) = parent_id {
            self.check_parent(kb_id, parent_id)?;
        }

        let ts = now();
        let item = Item {
            id: new_id(),
            kb_id: kb_id.to_string(),
            parent_id: parent_id.map(String::from),
            item_type,
            name: name.to_string(),
            content: match item_type {
                ItemType::File => Some(format!("# {name}")),
                ItemType::Folder => None,
            },
            order: query::next_order(&self.store, kb_id, parent_id, None),
            created_at: ts,
            updated_at: ts,
        };

        log::debug!(
            "created {} {} at order {} under {:?}",
            item.item_type,
            item.id,
            item.order,
            parent_id
        );
        self.store.put(item.clone());
        Ok(item)
    }

    /// Returns `Ok(false)` when the item no longer exists.
    pub fn rename_item(&mut self, id: &str, new_name: &str) -> Result<bool> {
        if new_name.trim().is_empty() {
            return Err(MindspireError::EmptyName);
        }
        let Some(item) = self.store.get_mut(id) else {
            return Ok(false);
        };
        item.name = new_name.to_string();
        item.updated_at = now();
        Ok(true)
    }

    /// Replace a file's content. Folders and stale ids are left alone.
    pub fn edit_content(&mut self, id: &str, content: impl Into<String>) -> bool {
        match self.store.get_mut(id) {
            Some(item) if item.is_file() => {
                item.content = Some(content.into());
                item.updated_at = now();
                true
            }
            _ => false,
        }
    }

    /// Fold a content generator's answer into a file.
    pub fn apply_generated(
        &mut self,
        id: &str,
        action: AiAction,
        generated: &str,
        language: Language,
    ) -> bool {
        let Some(item) = self.store.get(id).filter(|i| i.is_file()) else {
            return false;
        };
        let current = item.content.as_deref().unwrap_or_default();
        let updated = assist::apply_generated(current, action, generated, language);
        self.edit_content(id, updated)
    }

    /// Remove an item and its whole subtree. Returns every removed id (the item
    /// first) so callers can drop selection or open-file references to them.
    /// Surviving siblings keep their orders.
    pub fn delete_item(&mut self, id: &str) -> Vec<ItemId> {
        if !self.store.contains(id) {
            return Vec::new();
        }
        let mut removed = vec![id.to_string()];
        removed.extend(query::descendants_of(&self.store, id));
        for rid in &removed {
            self.store.remove(rid);
        }
        log::debug!("deleted {} ({} items)", id, removed.len());
        removed
    }

    /// Drop `dragged_id` relative to `target_id`.
    ///
    /// `Root` ignores the target for placement; every other position needs an
    /// existing target. Rejections leave the store untouched.
    pub fn move_item(
        &mut self,
        dragged_id: &str,
        target_id: Option<&str>,
        position: MovePosition,
    ) -> MoveOutcome {
        match self.plan_move(dragged_id, target_id, position) {
            Ok(plan) => MoveOutcome::Moved(self.commit_move(dragged_id, plan)),
            Err(reason) => {
                log::debug!("move of {dragged_id} {position} {target_id:?} rejected: {reason:?}");
                MoveOutcome::Rejected(reason)
            }
        }
    }

    // ── Helpers ──

    fn check_parent(&self, kb_id: &str, parent_id: &str) -> Result<()> {
        let invalid = |reason: &str| MindspireError::InvalidParent {
            parent_id: parent_id.to_string(),
            reason: reason.to_string(),
        };
        let parent = self.store.get(parent_id).ok_or_else(|| invalid("no such item"))?;
        if !parent.is_folder() {
            return Err(invalid("only folders can contain items"));
        }
        if parent.kb_id != kb_id {
            return Err(invalid("parent belongs to another knowledge base"));
        }
        Ok(())
    }

    fn plan_move(
        &self,
        dragged_id: &str,
        target_id: Option<&str>,
        position: MovePosition,
    ) -> std::result::Result<MovePlan, MoveRejection> {
        if target_id == Some(dragged_id) {
            return Err(MoveRejection::SelfTarget);
        }
        let dragged = self.store.get(dragged_id).ok_or(MoveRejection::MissingItem)?;
        if self.would_create_cycle(dragged_id, target_id) {
            return Err(MoveRejection::Cycle);
        }

        if position == MovePosition::Root {
            return Ok(MovePlan {
                kb_id: dragged.kb_id.clone(),
                parent_id: None,
                placement: Placement::Append,
                expand: None,
            });
        }

        let target = target_id
            .and_then(|id| self.store.get(id))
            .ok_or(MoveRejection::MissingTarget)?;
        if target.kb_id != dragged.kb_id && self.config.cross_kb_moves == CrossKbPolicy::Reject {
            return Err(MoveRejection::CrossKnowledgeBase);
        }

        let plan = if position == MovePosition::Into {
            if !target.is_folder() {
                return Err(MoveRejection::NotAFolder);
            }
            MovePlan {
                kb_id: target.kb_id.clone(),
                parent_id: Some(target.id.clone()),
                placement: Placement::Append,
                expand: Some(target.id.clone()),
            }
        } else {
            MovePlan {
                kb_id: target.kb_id.clone(),
                parent_id: target.parent_id.clone(),
                placement: Placement::Beside {
                    target_id: target.id.clone(),
                    after: position == MovePosition::After,
                },
                expand: None,
            }
        };
        Ok(plan)
    }

    fn commit_move(&mut self, dragged_id: &str, plan: MovePlan) -> MovedItem {
        let MovePlan {
            kb_id,
            parent_id,
            placement,
            expand,
        } = plan;

        let order = match placement {
            Placement::Append => {
                query::next_order(&self.store, &kb_id, parent_id.as_deref(), Some(dragged_id))
            }
            Placement::Beside { target_id, after } => {
                let mut sequence: Vec<ItemId> =
                    query::children_of(&self.store, &kb_id, parent_id.as_deref())
                        .into_iter()
                        .filter(|i| i.id != dragged_id)
                        .map(|i| i.id.clone())
                        .collect();
                let target_index = sequence
                    .iter()
                    .position(|id| *id == target_id)
                    .unwrap_or(sequence.len());
                let insert_at = if after { target_index + 1 } else { target_index };
                let insert_at = insert_at.min(sequence.len());
                sequence.insert(insert_at, dragged_id.to_string());

                for (index, id) in sequence.iter().enumerate() {
                    if let Some(sibling) = self.store.get_mut(id) {
                        sibling.order = index as i64;
                    }
                }
                insert_at as i64
            }
        };

        self.adopt_subtree(dragged_id, &kb_id);

        if let Some(item) = self.store.get_mut(dragged_id) {
            item.parent_id = parent_id.clone();
            item.order = order;
            item.updated_at = now();
        }

        log::debug!("moved {dragged_id} under {parent_id:?} at order {order}");
        MovedItem {
            id: dragged_id.to_string(),
            kb_id,
            parent_id,
            order,
            expand,
        }
    }

    /// Rewrite the knowledge base of an item and its subtree when it crosses
    /// into another knowledge base.
    fn adopt_subtree(&mut self, id: &str, kb_id: &str) {
        let Some(item) = self.store.get(id) else {
            return;
        };
        if item.kb_id == kb_id {
            return;
        }
        let from = item.kb_id.clone();
        let mut ids = vec![id.to_string()];
        ids.extend(query::descendants_of(&self.store, id));
        for moved in &ids {
            if let Some(item) = self.store.get_mut(moved) {
                item.kb_id = kb_id.to_string();
            }
        }
        log::info!("moved {} items from knowledge base {from} to {kb_id}", ids.len());
    }

    /// Detach items whose parent is missing, not a folder, in another knowledge
    /// base, or part of a parent loop. Detached items are appended at the root.
    fn repair_parents(&mut self) {
        let ids: Vec<ItemId> = self.store.all().map(|i| i.id.clone()).collect();
        for id in &ids {
            let Some(item) = self.store.get(id) else { continue };
            let Some(parent_id) = item.parent_id.as_deref() else { continue };
            let broken = match self.store.get(parent_id) {
                None => true,
                Some(parent) => !parent.is_folder() || parent.kb_id != item.kb_id,
            };
            if broken || self.in_parent_loop(id) {
                log::warn!("reattaching {id} to the root: invalid parent {parent_id}");
                self.detach_to_root(id);
            }
        }
    }

    fn in_parent_loop(&self, id: &str) -> bool {
        let mut seen = HashSet::new();
        let mut current = self.store.get(id).and_then(|i| i.parent_id.as_deref());
        while let Some(pid) = current {
            if pid == id {
                return true;
            }
            if !seen.insert(pid) {
                // A loop further up that does not include `id`; its members get
                // detached when they are visited.
                return false;
            }
            current = self.store.get(pid).and_then(|i| i.parent_id.as_deref());
        }
        false
    }

    fn detach_to_root(&mut self, id: &str) {
        let Some(kb_id) = self.store.get(id).map(|i| i.kb_id.clone()) else {
            return;
        };
        let order = query::next_order(&self.store, &kb_id, None, Some(id));
        if let Some(item) = self.store.get_mut(id) {
            item.parent_id = None;
            item.order = order;
        }
    }

    /// Densely reindex any sibling group that holds duplicate orders.
    fn repair_orders(&mut self) {
        let groups: BTreeSet<(String, Option<ItemId>)> = self
            .store
            .all()
            .map(|i| (i.kb_id.clone(), i.parent_id.clone()))
            .collect();

        for (kb_id, parent_id) in groups {
            let mut members: Vec<(i64, chrono::DateTime<Utc>, ItemId)> = self
                .store
                .group(&kb_id, parent_id.as_deref())
                .into_iter()
                .map(|i| (i.order, i.created_at, i.id.clone()))
                .collect();
            let distinct: HashSet<i64> = members.iter().map(|m| m.0).collect();
            if distinct.len() == members.len() {
                continue;
            }

            log::warn!("reindexing sibling group {kb_id}/{parent_id:?}: duplicate orders");
            members.sort();
            for (index, (_, _, id)) in members.iter().enumerate() {
                if let Some(item) = self.store.get_mut(id) {
                    item.order = index as i64;
                }
            }
        }
    }
}

struct MovePlan {
    kb_id: String,
    parent_id: Option<ItemId>,
    placement: Placement,
    expand: Option<ItemId>,
}

enum Placement {
    Append,
    Beside { target_id: ItemId, after: bool },
}

impl MoveOutcome {
    pub fn is_moved(&self) -> bool {
        matches!(self, MoveOutcome::Moved(_))
    }
}

impl std::fmt::Display for MoveRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let reason = match self {
            MoveRejection::SelfTarget => "item dropped onto itself",
            MoveRejection::MissingItem => "dragged item does not exist",
            MoveRejection::MissingTarget => "drop target does not exist",
            MoveRejection::Cycle => "a folder cannot move into its own subtree",
            MoveRejection::CrossKnowledgeBase => "target belongs to another knowledge base",
            MoveRejection::NotAFolder => "only folders accept items dropped into them",
        };
        write!(f, "{reason}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine_with_kb() -> (Engine, String) {
        let mut engine = Engine::new(EngineConfig::default());
        let kb = engine.create_knowledge_base("kb1", None).unwrap();
        (engine, kb.id)
    }

    fn folder(engine: &mut Engine, kb: &str, parent: Option<&str>, name: &str) -> String {
        engine.create_item(kb, parent, ItemType::Folder, name).unwrap().id
    }

    fn file(engine: &mut Engine, kb: &str, parent: Option<&str>, name: &str) -> String {
        engine.create_item(kb, parent, ItemType::File, name).unwrap().id
    }

    fn order_of(engine: &Engine, id: &str) -> i64 {
        engine.get(id).unwrap().order
    }

    fn names(engine: &Engine, kb: &str, parent: Option<&str>) -> Vec<String> {
        engine
            .children_of(kb, parent)
            .iter()
            .map(|i| i.name.clone())
            .collect()
    }

    // ── create / rename / edit ──

    #[test]
    fn test_create_appends_and_seeds_content() {
        let (mut engine, kb) = engine_with_kb();
        let f = folder(&mut engine, &kb, None, "Docs");
        let g = file(&mut engine, &kb, None, "Readme");

        assert_eq!(order_of(&engine, &f), 0);
        assert_eq!(order_of(&engine, &g), 1);
        assert_eq!(engine.get(&g).unwrap().content.as_deref(), Some("# Readme"));
        assert_eq!(engine.get(&f).unwrap().content, None);
    }

    #[test]
    fn test_create_after_delete_uses_max_plus_one() {
        let (mut engine, kb) = engine_with_kb();
        let a = file(&mut engine, &kb, None, "a");
        file(&mut engine, &kb, None, "b");
        let c = file(&mut engine, &kb, None, "c");
        engine.delete_item(&a);
        engine.move_item(&c, None, MovePosition::Root);
        let d = file(&mut engine, &kb, None, "d");
        assert_eq!(order_of(&engine, &c), 2);
        assert_eq!(order_of(&engine, &d), 3);
    }

    #[test]
    fn test_create_validation() {
        let (mut engine, kb) = engine_with_kb();
        let doc = file(&mut engine, &kb, None, "doc");

        assert!(matches!(
            engine.create_item(&kb, None, ItemType::File, "   "),
            Err(MindspireError::EmptyName)
        ));
        assert!(matches!(
            engine.create_item("nope", None, ItemType::File, "x"),
            Err(MindspireError::UnknownKnowledgeBase(_))
        ));
        assert!(matches!(
            engine.create_item(&kb, Some(&doc), ItemType::File, "x"),
            Err(MindspireError::InvalidParent { .. })
        ));
        assert!(matches!(
            engine.create_item(&kb, Some("ghost"), ItemType::File, "x"),
            Err(MindspireError::InvalidParent { .. })
        ));
        assert_eq!(engine.store().len(), 1);
    }

    #[test]
    fn test_create_rejects_parent_in_other_kb() {
        let (mut engine, kb) = engine_with_kb();
        let other = engine.create_knowledge_base("kb2", None).unwrap();
        let f = folder(&mut engine, &kb, None, "F");
        assert!(engine.create_item(&other.id, Some(&f), ItemType::File, "x").is_err());
    }

    #[test]
    fn test_rename() {
        let (mut engine, kb) = engine_with_kb();
        let doc = file(&mut engine, &kb, None, "doc");
        let before = engine.get(&doc).unwrap().updated_at;

        assert!(engine.rename_item(&doc, "Document").unwrap());
        let item = engine.get(&doc).unwrap();
        assert_eq!(item.name, "Document");
        assert!(item.updated_at >= before);

        assert!(matches!(engine.rename_item(&doc, ""), Err(MindspireError::EmptyName)));
        assert!(!engine.rename_item("ghost", "x").unwrap());
    }

    #[test]
    fn test_edit_content_only_touches_files() {
        let (mut engine, kb) = engine_with_kb();
        let f = folder(&mut engine, &kb, None, "F");
        let doc = file(&mut engine, &kb, None, "doc");

        assert!(engine.edit_content(&doc, "new body"));
        assert_eq!(engine.get(&doc).unwrap().content.as_deref(), Some("new body"));
        assert!(!engine.edit_content(&f, "nope"));
        assert_eq!(engine.get(&f).unwrap().content, None);
        assert!(!engine.edit_content("ghost", "nope"));
    }

    #[test]
    fn test_apply_generated() {
        let (mut engine, kb) = engine_with_kb();
        let doc = file(&mut engine, &kb, None, "Plan");

        assert!(engine.apply_generated(&doc, AiAction::Continue, "Next steps.", Language::En));
        assert_eq!(engine.get(&doc).unwrap().content.as_deref(), Some("# Plan\n\nNext steps."));

        assert!(engine.apply_generated(&doc, AiAction::Improve, "# Better plan", Language::En));
        assert_eq!(engine.get(&doc).unwrap().content.as_deref(), Some("# Better plan"));

        let f = folder(&mut engine, &kb, None, "F");
        assert!(!engine.apply_generated(&f, AiAction::Improve, "x", Language::En));
    }

    // ── delete ──

    #[test]
    fn test_delete_cascades() {
        let (mut engine, kb) = engine_with_kb();
        let f = folder(&mut engine, &kb, None, "F");
        let sub = folder(&mut engine, &kb, Some(&f), "Sub");
        let a = file(&mut engine, &kb, Some(&sub), "a");
        let b = file(&mut engine, &kb, Some(&f), "b");
        let keep = file(&mut engine, &kb, None, "keep");

        let removed = engine.delete_item(&f);
        assert_eq!(removed, vec![f.clone(), sub, a, b]);
        assert_eq!(engine.store().len(), 1);
        assert!(engine.get(&keep).is_some());
        // Surviving siblings are not renumbered.
        assert_eq!(order_of(&engine, &keep), 1);
    }

    #[test]
    fn test_delete_missing_is_noop() {
        let (mut engine, kb) = engine_with_kb();
        file(&mut engine, &kb, None, "doc");
        let before = engine.snapshot();
        assert!(engine.delete_item("ghost").is_empty());
        assert_eq!(engine.snapshot(), before);
    }

    // ── move ──

    #[test]
    fn test_scenario_a_move_file_into_folder() {
        let (mut engine, kb) = engine_with_kb();
        let f = folder(&mut engine, &kb, None, "F");
        let g = file(&mut engine, &kb, None, "G");
        let f_before = engine.get(&f).unwrap().clone();

        let moved = match engine.move_item(&g, Some(&f), MovePosition::Into) {
            MoveOutcome::Moved(moved) => moved,
            other => panic!("expected a move, got {other:?}"),
        };
        assert_eq!(moved.expand.as_deref(), Some(f.as_str()));

        let g_item = engine.get(&g).unwrap();
        assert_eq!(g_item.parent_id.as_deref(), Some(f.as_str()));
        assert_eq!(g_item.order, 0);
        assert_eq!(engine.get(&f).unwrap(), &f_before);
        assert_eq!(names(&engine, &kb, None), vec!["F"]);
    }

    #[test]
    fn test_scenario_b_move_before_reindexes() {
        let (mut engine, kb) = engine_with_kb();
        let f = folder(&mut engine, &kb, None, "F");
        let a = file(&mut engine, &kb, Some(&f), "A");
        let b = file(&mut engine, &kb, Some(&f), "B");
        let c = file(&mut engine, &kb, Some(&f), "C");
        let b_updated = engine.get(&b).unwrap().updated_at;

        assert!(engine.move_item(&c, Some(&a), MovePosition::Before).is_moved());
        assert_eq!(order_of(&engine, &c), 0);
        assert_eq!(order_of(&engine, &a), 1);
        assert_eq!(order_of(&engine, &b), 2);
        // Reindexed siblings keep their timestamps.
        assert_eq!(engine.get(&b).unwrap().updated_at, b_updated);
    }

    #[test]
    fn test_scenario_c_move_into_own_child_is_noop() {
        let (mut engine, kb) = engine_with_kb();
        let f = folder(&mut engine, &kb, None, "F");
        let child = folder(&mut engine, &kb, Some(&f), "child");
        let before = engine.snapshot();

        let outcome = engine.move_item(&f, Some(&child), MovePosition::Into);
        assert_eq!(outcome, MoveOutcome::Rejected(MoveRejection::Cycle));
        assert_eq!(engine.snapshot(), before);
    }

    #[test]
    fn test_scenario_d_root_move_recomputes_order() {
        let (mut engine, kb) = engine_with_kb();
        let a = file(&mut engine, &kb, None, "a");
        let b = file(&mut engine, &kb, None, "b");
        let c = file(&mut engine, &kb, None, "c");
        let x = file(&mut engine, &kb, None, "x");
        engine.delete_item(&c);
        assert_eq!(order_of(&engine, &x), 3);

        assert!(engine.move_item(&x, None, MovePosition::Root).is_moved());
        assert_eq!(order_of(&engine, &a), 0);
        assert_eq!(order_of(&engine, &b), 1);
        assert_eq!(order_of(&engine, &x), 2);
    }

    #[test]
    fn test_move_after_across_groups() {
        let (mut engine, kb) = engine_with_kb();
        let f = folder(&mut engine, &kb, None, "F");
        let a = file(&mut engine, &kb, Some(&f), "A");
        let b = file(&mut engine, &kb, Some(&f), "B");
        let loose = file(&mut engine, &kb, None, "Loose");

        assert!(engine.move_item(&loose, Some(&a), MovePosition::After).is_moved());
        assert_eq!(names(&engine, &kb, Some(&f)), vec!["A", "Loose", "B"]);
        assert_eq!(order_of(&engine, &a), 0);
        assert_eq!(order_of(&engine, &loose), 1);
        assert_eq!(order_of(&engine, &b), 2);
        assert_eq!(names(&engine, &kb, None), vec!["F"]);
    }

    #[test]
    fn test_move_after_last_sibling() {
        let (mut engine, kb) = engine_with_kb();
        let a = file(&mut engine, &kb, None, "A");
        let b = file(&mut engine, &kb, None, "B");
        let c = file(&mut engine, &kb, None, "C");

        assert!(engine.move_item(&a, Some(&c), MovePosition::After).is_moved());
        assert_eq!(names(&engine, &kb, None), vec!["B", "C", "A"]);
        assert_eq!(order_of(&engine, &b), 0);
        assert_eq!(order_of(&engine, &a), 2);
    }

    #[test]
    fn test_move_rejections_leave_store_unchanged() {
        let (mut engine, kb) = engine_with_kb();
        let f = folder(&mut engine, &kb, None, "F");
        let doc = file(&mut engine, &kb, Some(&f), "doc");
        let other = file(&mut engine, &kb, None, "other");
        let before = engine.snapshot();

        let cases = [
            (f.as_str(), Some(f.as_str()), MovePosition::Into, MoveRejection::SelfTarget),
            (f.as_str(), Some(f.as_str()), MovePosition::Root, MoveRejection::SelfTarget),
            ("ghost", Some(f.as_str()), MovePosition::Into, MoveRejection::MissingItem),
            (doc.as_str(), Some("ghost"), MovePosition::Before, MoveRejection::MissingTarget),
            (doc.as_str(), None, MovePosition::Into, MoveRejection::MissingTarget),
            (f.as_str(), Some(doc.as_str()), MovePosition::After, MoveRejection::Cycle),
            (f.as_str(), Some(doc.as_str()), MovePosition::Root, MoveRejection::Cycle),
            (doc.as_str(), Some(other.as_str()), MovePosition::Into, MoveRejection::NotAFolder),
        ];
        for (dragged, target, position, reason) in cases {
            assert_eq!(
                engine.move_item(dragged, target, position),
                MoveOutcome::Rejected(reason),
                "{dragged} {position} {target:?}"
            );
            assert_eq!(engine.snapshot(), before);
        }
    }

    #[test]
    fn test_cross_kb_move_rejected_by_default() {
        let (mut engine, kb) = engine_with_kb();
        let other = engine.create_knowledge_base("kb2", None).unwrap();
        let doc = file(&mut engine, &kb, None, "doc");
        let target = folder(&mut engine, &other.id, None, "T");
        let before = engine.snapshot();

        assert_eq!(
            engine.move_item(&doc, Some(&target), MovePosition::Into),
            MoveOutcome::Rejected(MoveRejection::CrossKnowledgeBase)
        );
        assert_eq!(engine.snapshot(), before);
    }

    #[test]
    fn test_cross_kb_move_adopts_subtree() {
        let mut engine = Engine::new(EngineConfig {
            cross_kb_moves: CrossKbPolicy::Adopt,
        });
        let kb1 = engine.create_knowledge_base("kb1", None).unwrap().id;
        let kb2 = engine.create_knowledge_base("kb2", None).unwrap().id;
        let f = folder(&mut engine, &kb1, None, "F");
        let inner = file(&mut engine, &kb1, Some(&f), "inner");
        let target = folder(&mut engine, &kb2, None, "T");

        let MoveOutcome::Moved(moved) = engine.move_item(&f, Some(&target), MovePosition::Into)
        else {
            panic!("cross-kb move should be adopted");
        };
        assert_eq!(moved.kb_id, kb2);
        assert_eq!(engine.get(&f).unwrap().kb_id, kb2);
        assert_eq!(engine.get(&inner).unwrap().kb_id, kb2);
        assert!(engine.children_of(&kb1, None).is_empty());
        assert_eq!(names(&engine, &kb2, Some(&target)), vec!["F"]);
    }

    #[test]
    fn test_cross_kb_before_after_adopts_into_target_group() {
        let mut engine = Engine::new(EngineConfig {
            cross_kb_moves: CrossKbPolicy::Adopt,
        });
        let kb1 = engine.create_knowledge_base("kb1", None).unwrap().id;
        let kb2 = engine.create_knowledge_base("kb2", None).unwrap().id;
        let f = folder(&mut engine, &kb1, None, "F");
        let inner = file(&mut engine, &kb1, Some(&f), "inner");
        let x = file(&mut engine, &kb1, None, "X");
        let a = file(&mut engine, &kb2, None, "A");
        let b = file(&mut engine, &kb2, None, "B");
        let c = file(&mut engine, &kb2, None, "C");

        let MoveOutcome::Moved(moved) = engine.move_item(&f, Some(&b), MovePosition::Before)
        else {
            panic!("cross-kb before should be adopted");
        };
        assert_eq!(moved.kb_id, kb2);
        assert_eq!(moved.parent_id, None);
        assert_eq!(moved.order, 1);
        let inner = engine.get(&inner).unwrap();
        assert_eq!(inner.kb_id, kb2);
        assert_eq!(inner.parent_id.as_deref(), Some(f.as_str()));
        assert_eq!(names(&engine, &kb2, None), vec!["A", "F", "B", "C"]);
        assert_eq!([&a, &f, &b, &c].map(|id| order_of(&engine, id)), [0, 1, 2, 3]);

        assert!(engine.move_item(&x, Some(&c), MovePosition::After).is_moved());
        assert_eq!(engine.get(&x).unwrap().kb_id, kb2);
        assert_eq!(names(&engine, &kb2, None), vec!["A", "F", "B", "C", "X"]);
        assert_eq!(order_of(&engine, &x), 4);
        assert!(engine.children_of(&kb1, None).is_empty());
    }

    #[test]
    fn test_move_updates_only_moved_timestamp() {
        let (mut engine, kb) = engine_with_kb();
        let a = file(&mut engine, &kb, None, "A");
        let b = file(&mut engine, &kb, None, "B");
        let a_before = engine.get(&a).unwrap().updated_at;
        let b_before = engine.get(&b).unwrap().updated_at;

        engine.move_item(&b, Some(&a), MovePosition::Before);
        assert_eq!(engine.get(&a).unwrap().updated_at, a_before);
        assert!(engine.get(&b).unwrap().updated_at >= b_before);
    }

    // ── snapshot loading ──

    fn raw(id: &str, kb: &str, parent: Option<&str>, kind: ItemType, order: i64) -> Item {
        let now = Utc::now();
        Item {
            id: id.to_string(),
            kb_id: kb.to_string(),
            parent_id: parent.map(String::from),
            item_type: kind,
            name: id.to_string(),
            content: Some(String::new()),
            order,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_from_snapshot_repairs_bad_data() {
        let kb = KnowledgeBase {
            id: "kb".to_string(),
            name: "kb".to_string(),
            description: String::new(),
            created_at: Utc::now(),
        };
        let snapshot = Snapshot {
            knowledge_bases: vec![kb],
            items: vec![
                raw("a", "kb", None, ItemType::Folder, 0),
                raw("b", "kb", None, ItemType::File, 0),
                raw("orphan", "kb", Some("ghost"), ItemType::File, 0),
                raw("under-file", "kb", Some("b"), ItemType::File, 0),
                raw("loop1", "kb", Some("loop2"), ItemType::Folder, 0),
                raw("loop2", "kb", Some("loop1"), ItemType::Folder, 0),
                raw("stray", "nokb", None, ItemType::File, 0),
            ],
        };

        let engine = Engine::from_snapshot(snapshot, EngineConfig::default());
        assert!(engine.get("stray").is_none());
        assert_eq!(engine.get("a").unwrap().content, None);
        assert_eq!(engine.get("orphan").unwrap().parent_id, None);
        assert_eq!(engine.get("under-file").unwrap().parent_id, None);

        for item in engine.store().all() {
            assert!(!engine.would_create_cycle("__none__", Some(&item.id)));
        }

        let roots = engine.children_of("kb", None);
        let mut orders: Vec<i64> = roots.iter().map(|i| i.order).collect();
        orders.dedup();
        assert_eq!(orders.len(), roots.len());
    }

    #[test]
    fn test_from_snapshot_keeps_valid_data() {
        let (mut engine, kb) = engine_with_kb();
        let f = folder(&mut engine, &kb, None, "F");
        file(&mut engine, &kb, Some(&f), "doc");
        let snapshot = engine.snapshot();

        let reloaded = Engine::from_snapshot(snapshot.clone(), EngineConfig::default());
        assert_eq!(reloaded.snapshot(), snapshot);
    }
}
