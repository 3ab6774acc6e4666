//! Change recorder: minimal diff-entry computation.
//!
//! Given pre/post scalar snapshots and explicit relation deltas, this module
//! computes the zero-or-more entry drafts a mutation produces. It is pure —
//! the transactional half lives with the store, which appends the drafts in
//! the same unit of work as the mutation itself (see
//! [`crate::db::SqliteHistory`]).
//!
//! Guarantees:
//! - creation emits exactly one `entity.created` draft carrying the full
//!   initial field object
//! - only fields whose values differ produce `field.updated` drafts
//! - every added/removed related id produces exactly one relation draft

use crate::entry::{ChangeType, EntryDraft, FieldName, RelationKind};
use crate::model::TaskFields;
use serde_json::Value;
use std::collections::BTreeSet;

/// An explicit add/remove delta for one relation kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelationDelta {
    pub added: Vec<String>,
    pub removed: Vec<String>,
}

impl RelationDelta {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// The single `entity.created` draft for a new task.
#[must_use]
pub fn creation_draft(
    fields: &TaskFields,
    actor_id: Option<&str>,
    metadata: Option<Value>,
) -> EntryDraft {
    EntryDraft {
        change_type: ChangeType::EntityCreated,
        field_name: None,
        relation_kind: None,
        related_id: None,
        old_value: None,
        new_value: Some(fields.to_object()),
        actor_id: actor_id.map(str::to_string),
        metadata,
    }
}

/// One `field.updated` draft per tracked field whose value differs.
///
/// Iterates [`FieldName::ALL`], so a newly tracked field is diffed the
/// moment it exists. Unchanged fields never produce drafts.
#[must_use]
pub fn field_diffs(pre: &TaskFields, post: &TaskFields, actor_id: Option<&str>) -> Vec<EntryDraft> {
    FieldName::ALL
        .into_iter()
        .filter_map(|field| {
            let old_value = pre.value_of(field);
            let new_value = post.value_of(field);
            if old_value == new_value {
                return None;
            }
            Some(EntryDraft {
                change_type: ChangeType::FieldUpdated,
                field_name: Some(field),
                relation_kind: None,
                related_id: None,
                old_value: Some(old_value),
                new_value: Some(new_value),
                actor_id: actor_id.map(str::to_string),
                metadata: None,
            })
        })
        .collect()
}

/// Relation drafts for one kind's delta: removals first, then additions.
///
/// Removal-before-addition keeps replace-style mutations ("remove A, add B")
/// readable in the ledger; correctness does not depend on it because
/// membership is per-`related_id` last-writer-wins.
#[must_use]
pub fn relation_diffs(
    kind: RelationKind,
    delta: &RelationDelta,
    actor_id: Option<&str>,
) -> Vec<EntryDraft> {
    let relation_draft = |change_type: ChangeType, related_id: &String| EntryDraft {
        change_type,
        field_name: None,
        relation_kind: Some(kind),
        related_id: Some(related_id.clone()),
        old_value: None,
        new_value: None,
        actor_id: actor_id.map(str::to_string),
        metadata: None,
    };

    delta
        .removed
        .iter()
        .map(|id| relation_draft(ChangeType::RelationRemoved, id))
        .chain(
            delta
                .added
                .iter()
                .map(|id| relation_draft(ChangeType::RelationAdded, id)),
        )
        .collect()
}

/// Compute the delta between live membership and a desired target set.
#[must_use]
pub fn diff_membership(pre: &BTreeSet<String>, post: &BTreeSet<String>) -> RelationDelta {
    RelationDelta {
        added: post.difference(pre).cloned().collect(),
        removed: pre.difference(post).cloned().collect(),
    }
}
