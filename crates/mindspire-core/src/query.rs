// ── Query Engine ──
//
// Read-only views derived from the item store. Nothing here mutates.

use crate::store::ItemStore;
use crate::types::{Breadcrumb, Item, ItemId};

// ── Types ──

/// One row of a depth-first tree listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry<'a> {
    pub depth: usize,
    pub item: &'a Item,
}

// ── Public API ──

/// Siblings of the group `(kb_id, parent_id)`, ascending by `order`.
///
/// Equal orders keep store iteration order (the sort is stable), but the engine
/// never produces ties, so callers should not depend on it.
pub fn children_of<'a>(
    store: &'a ItemStore,
    kb_id: &str,
    parent_id: Option<&str>,
) -> Vec<&'a Item> {
    let mut children = store.group(kb_id, parent_id);
    children.sort_by_key(|i| i.order);
    children
}

/// Every item whose parent chain passes through `id`, depth-first and in sibling
/// order. `id` itself is not included. Unknown ids have no descendants.
pub fn descendants_of(store: &ItemStore, id: &str) -> Vec<ItemId> {
    let mut out = Vec::new();
    if let Some(item) = store.get(id) {
        collect_descendants(store, item, &mut out);
    }
    out
}

fn collect_descendants(store: &ItemStore, parent: &Item, out: &mut Vec<ItemId>) {
    for child in children_of(store, &parent.kb_id, Some(&parent.id)) {
        out.push(child.id.clone());
        collect_descendants(store, child, out);
    }
}

/// Largest `order` in the group, ignoring `exclude`.
pub fn max_order(
    store: &ItemStore,
    kb_id: &str,
    parent_id: Option<&str>,
    exclude: Option<&str>,
) -> Option<i64> {
    store
        .group(kb_id, parent_id)
        .into_iter()
        .filter(|i| Some(i.id.as_str()) != exclude)
        .map(|i| i.order)
        .max()
}

/// The order key that appends after every current member of the group.
pub fn next_order(
    store: &ItemStore,
    kb_id: &str,
    parent_id: Option<&str>,
    exclude: Option<&str>,
) -> i64 {
    max_order(store, kb_id, parent_id, exclude).map_or(0, |m| m + 1)
}

/// Path from the knowledge base root down to `id`, inclusive.
pub fn breadcrumbs(store: &ItemStore, id: &str) -> Vec<Breadcrumb> {
    let mut path = Vec::new();
    let mut current = store.get(id);
    while let Some(item) = current {
        path.push(Breadcrumb {
            id: item.id.clone(),
            name: item.name.clone(),
        });
        // Bounded by store size in case a snapshot slipped a cycle past repair.
        if path.len() > store.len() {
            break;
        }
        current = item.parent_id.as_deref().and_then(|p| store.get(p));
    }
    path.reverse();
    path
}

/// Depth-first listing of a whole knowledge base in display order.
pub fn tree<'a>(store: &'a ItemStore, kb_id: &str) -> Vec<TreeEntry<'a>> {
    let mut out = Vec::new();
    walk_tree(store, kb_id, None, 0, &mut out);
    out
}

fn walk_tree<'a>(
    store: &'a ItemStore,
    kb_id: &str,
    parent_id: Option<&str>,
    depth: usize,
    out: &mut Vec<TreeEntry<'a>>,
) {
    for item in children_of(store, kb_id, parent_id) {
        out.push(TreeEntry { depth, item });
        if item.is_folder() {
            walk_tree(store, kb_id, Some(&item.id), depth + 1, out);
        }
    }
}

/// Parent for a new item given the current tree selection: inside a selected
/// folder, next to a selected file, at the root otherwise.
pub fn creation_parent(store: &ItemStore, selected: Option<&str>) -> Option<ItemId> {
    let item = store.get(selected?)?;
    if item.is_folder() {
        Some(item.id.clone())
    } else {
        item.parent_id.clone()
    }
}
