// ── Cycle Guard ──

use crate::store::ItemStore;

/// Whether placing `dragged_id` relative to `target_id` would make an item its
/// own ancestor.
///
/// Walks the parent chain upward from the target. Meeting the dragged item
/// (including `target_id == dragged_id`) rejects the move; a root target is
/// always safe. Runs in O(depth) over parent pointers only.
pub fn would_create_cycle(store: &ItemStore, dragged_id: &str, target_id: Option<&str>) -> bool {
    let mut current = target_id;
    let mut steps = 0;
    while let Some(id) = current {
        if id == dragged_id {
            return true;
        }
        steps += 1;
        if steps > store.len() {
            // A pre-existing loop that does not pass through the dragged item.
            return true;
        }
        current = store.get(id).and_then(|i| i.parent_id.as_deref());
    }
    false
}
