//! Reconstruction of discussion trees from the flat record store.
//!
//! The store keeps one row per review or reply, linked by `parent_id`.
//! [`build`] turns a fetched batch into a forest of [`ThreadNode`]s, bounded
//! to [`MAX_REPLY_LEVEL`] generations below each root regardless of what the
//! stored `reply_level` column claims. Rows that cannot be placed are never
//! dropped silently: unreachable subtrees land in `orphans`, over-deep ones
//! in `truncated`.

use std::collections::HashMap;

use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::db::models::review::{ReviewRecord, MAX_REPLY_LEVEL};
use crate::thread::permissions::NodePermissions;

/// One review or reply plus its replies, ordered oldest first.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ThreadNode {
    pub record: ReviewRecord,
    /// What the requesting actor may do with this node. All false until the
    /// service annotates the forest for a concrete actor.
    pub permissions: NodePermissions,
    #[schema(no_recursion)]
    pub children: Vec<ThreadNode>,
}

impl ThreadNode {
    fn new(record: ReviewRecord, children: Vec<ThreadNode>) -> Self {
        Self { record, permissions: NodePermissions::default(), children }
    }

    /// Nodes in this subtree, the node itself included.
    pub fn len(&self) -> usize {
        1 + self.children.iter().map(ThreadNode::len).sum::<usize>()
    }
}

/// Result of one tree reconstruction. Every input record appears exactly
/// once across `roots` (nested children included), `orphans` and
/// `truncated`.
#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct ThreadForest {
    /// Top-level reviews, newest first, each with its subtree attached.
    pub roots: Vec<ThreadNode>,
    /// Replies whose parent is missing from the fetched set (typically after
    /// a parent was deleted), together with their own descendants, oldest
    /// first. Display policy is the caller's decision.
    pub orphans: Vec<ReviewRecord>,
    /// Records that would sit deeper than [`MAX_REPLY_LEVEL`]. A non-empty
    /// list is an integrity warning: such rows can only come from corrupted
    /// or externally inserted data, since writes cap the level.
    pub truncated: Vec<ReviewRecord>,
}

impl ThreadForest {
    /// Records placed in the forest proper, not counting orphans or
    /// truncated rows.
    pub fn attached_len(&self) -> usize {
        self.roots.iter().map(ThreadNode::len).sum()
    }
}

/// Builds the forest from a flat batch, in any input order.
///
/// Roots and replies are partitioned, replies grouped by `parent_id`, and
/// children attached recursively with a depth counter that deliberately
/// ignores the stored `reply_level` — the cap must hold even when that
/// column lies. Grouping is O(n), sorting O(n log n); per-product batches
/// are small enough that nothing fancier is warranted.
///
/// A parent-pointer cycle in corrupt data is unreachable from any root, so
/// the recursion never sees it; its records surface in `orphans`.
pub fn build(records: Vec<ReviewRecord>) -> ThreadForest {
    let mut roots = Vec::new();
    let mut by_parent: HashMap<Uuid, Vec<ReviewRecord>> = HashMap::new();
    for record in records {
        match record.parent_id {
            None => roots.push(record),
            Some(parent_id) => by_parent.entry(parent_id).or_default().push(record),
        }
    }
    // Newest review first, the order the storefront lists them in.
    roots.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    let mut truncated = Vec::new();
    let roots = roots
        .into_iter()
        .map(|record| attach(record, &mut by_parent, 0, &mut truncated))
        .collect();

    // Whatever is still grouped never connected to a root: orphaned
    // subtrees, flattened.
    let mut orphans: Vec<ReviewRecord> = by_parent.into_values().flatten().collect();
    orphans.sort_by_key(|r| r.created_at);
    truncated.sort_by_key(|r| r.created_at);

    ThreadForest { roots, orphans, truncated }
}

fn attach(
    record: ReviewRecord,
    by_parent: &mut HashMap<Uuid, Vec<ReviewRecord>>,
    depth: i32,
    truncated: &mut Vec<ReviewRecord>,
) -> ThreadNode {
    let mut children = by_parent.remove(&record.id).unwrap_or_default();
    children.sort_by_key(|r| r.created_at);

    if depth >= MAX_REPLY_LEVEL {
        // This node sits at the cap; anything below it is cut off whole.
        for child in children {
            cut(child, by_parent, truncated);
        }
        return ThreadNode::new(record, Vec::new());
    }

    let children = children
        .into_iter()
        .map(|child| attach(child, by_parent, depth + 1, truncated))
        .collect();
    ThreadNode::new(record, children)
}

/// Moves `record` and its entire subtree into the truncated list.
fn cut(
    record: ReviewRecord,
    by_parent: &mut HashMap<Uuid, Vec<ReviewRecord>>,
    truncated: &mut Vec<ReviewRecord>,
) {
    if let Some(children) = by_parent.remove(&record.id) {
        for child in children {
            cut(child, by_parent, truncated);
        }
    }
    truncated.push(record);
}
