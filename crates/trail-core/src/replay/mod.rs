//! Deterministic point-in-time reconstruction over the history ledger.
//!
//! The engine owns no mutable state: "states" are field-value tuples and
//! "transitions" are individual history entries. [`fields::fold_fields`] and
//! [`relations::fold_relation`] are pure functions over ordered entry
//! slices; the functions here resolve a target entry through a
//! [`HistoryStore`], fetch the bounded prefix, and fold.
//!
//! Reads are bounded: each reconstruction considers at most the configured
//! cap of entries, so entities with very long histories cannot produce
//! unbounded request latency or memory use.

pub mod fields;
pub mod relations;
pub mod snapshot;

pub use fields::{fold_fields, FieldProjection};
pub use relations::fold_relation;
pub use snapshot::{snapshot_at, EntryMeta, Snapshot};

use crate::entry::{HistoryEntry, RelationKind};
use crate::error::{HistoryError, Result};
use crate::resolve::RelationNameResolver;
use crate::store::HistoryStore;
use std::collections::BTreeSet;
use tracing::warn;

/// Default bound on entries considered per reconstruction.
pub const DEFAULT_REPLAY_CAP: usize = 10_000;

/// Resolve the target entry, scoped to the owning entity.
///
/// # Errors
///
/// `NotFound` if the entry does not exist or belongs to another entity.
pub fn resolve_target<S: HistoryStore + ?Sized>(
    store: &S,
    entity_id: &str,
    target_entry_id: &str,
) -> Result<HistoryEntry> {
    store
        .entry(entity_id, target_entry_id)?
        .ok_or_else(|| HistoryError::entry_not_found(entity_id, target_entry_id))
}

/// Reconstruct the scalar fields of `entity_id` as of `target_entry_id`.
///
/// Pure with respect to the ledger: identical arguments always yield an
/// identical projection.
///
/// # Errors
///
/// `NotFound` if the target entry is absent or foreign-owned; `ReplayCap`
/// if the prefix exceeds `cap`; storage errors pass through.
pub fn reconstruct_fields<S: HistoryStore + ?Sized>(
    store: &S,
    entity_id: &str,
    target_entry_id: &str,
    cap: usize,
) -> Result<FieldProjection> {
    let target = resolve_target(store, entity_id, target_entry_id)?;
    let prefix = store.entries_up_to(entity_id, target.position(), cap)?;
    if prefix.len() > cap {
        return Err(HistoryError::ReplayCap {
            entity_id: entity_id.to_string(),
            cap,
        });
    }
    Ok(fold_fields(&prefix))
}

/// Reconstruct one relation set of `entity_id` as of `target_entry_id`.
///
/// Member ids that no longer resolve through `names` (a hard-deleted label,
/// a departed user) are omitted with a warning; pass
/// [`crate::resolve::IdentityResolver`] to get raw ledger membership.
///
/// # Errors
///
/// Same contract as [`reconstruct_fields`].
pub fn reconstruct_relation<S: HistoryStore + ?Sized>(
    store: &S,
    names: &dyn RelationNameResolver,
    entity_id: &str,
    kind: RelationKind,
    target_entry_id: &str,
    cap: usize,
) -> Result<BTreeSet<String>> {
    let target = resolve_target(store, entity_id, target_entry_id)?;
    let prefix = store.relation_entries_up_to(entity_id, kind, target.position(), cap)?;
    if prefix.len() > cap {
        return Err(HistoryError::ReplayCap {
            entity_id: entity_id.to_string(),
            cap,
        });
    }
    Ok(resolve_members(names, kind, fold_relation(&prefix)))
}

/// Drop member ids that no longer resolve in the related store.
///
/// A hard-deleted label or departed user must not fail the reconstruction;
/// it is omitted with a warning.
pub(crate) fn resolve_members(
    names: &dyn RelationNameResolver,
    kind: RelationKind,
    members: BTreeSet<String>,
) -> BTreeSet<String> {
    members
        .into_iter()
        .filter(|id| {
            let live = names.resolve(kind, id).is_some();
            if !live {
                warn!(kind = %kind, related_id = %id, "omitting unresolvable related id");
            }
            live
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::FieldName;
    use crate::model::{Priority, TaskFields};
    use crate::record::RelationDelta;
    use crate::resolve::IdentityResolver;
    use crate::store::{CurrentState, MemoryHistory};
    use serde_json::json;

    fn seeded() -> (MemoryHistory, Vec<String>) {
        let mut store = MemoryHistory::new();
        let mut ids = Vec::new();

        let created = store
            .create_task(
                "task-1",
                TaskFields {
                    name: "Fix auth retry".into(),
                    priority: Some(Priority::Medium),
                    ..TaskFields::default()
                },
                Some("alice"),
                1_000,
            )
            .expect("create");
        ids.push(created.id);

        let mut post = store.task("task-1").expect("query").expect("task").fields;
        post.priority = Some(Priority::High);
        let written = store
            .update_task("task-1", post, Some("alice"), 2_000)
            .expect("update");
        ids.push(written[0].id.clone());

        let written = store
            .apply_relations(
                "task-1",
                RelationKind::Assignee,
                &RelationDelta {
                    added: vec!["alice".into()],
                    removed: vec![],
                },
                Some("alice"),
                3_000,
            )
            .expect("assign");
        ids.push(written[0].id.clone());

        (store, ids)
    }

    #[test]
    fn fields_at_each_point_in_history() {
        let (store, ids) = seeded();
        let at_create =
            reconstruct_fields(&store, "task-1", &ids[0], DEFAULT_REPLAY_CAP).expect("replay");
        assert_eq!(at_create.get(FieldName::Priority), Some(&json!("medium")));

        let at_update =
            reconstruct_fields(&store, "task-1", &ids[1], DEFAULT_REPLAY_CAP).expect("replay");
        assert_eq!(at_update.get(FieldName::Priority), Some(&json!("high")));
    }

    #[test]
    fn relation_membership_at_target() {
        let (store, ids) = seeded();
        let before = reconstruct_relation(
            &store,
            &IdentityResolver,
            "task-1",
            RelationKind::Assignee,
            &ids[1],
            DEFAULT_REPLAY_CAP,
        )
        .expect("replay");
        assert!(before.is_empty());

        let after = reconstruct_relation(
            &store,
            &IdentityResolver,
            "task-1",
            RelationKind::Assignee,
            &ids[2],
            DEFAULT_REPLAY_CAP,
        )
        .expect("replay");
        assert!(after.contains("alice"));
    }

    #[test]
    fn hard_deleted_member_is_omitted_from_relation_projection() {
        struct Deleted;

        impl RelationNameResolver for Deleted {
            fn resolve(&self, _kind: RelationKind, related_id: &str) -> Option<String> {
                (related_id != "alice").then(|| related_id.to_string())
            }
        }

        let (mut store, _) = seeded();
        let written = store
            .apply_relations(
                "task-1",
                RelationKind::Assignee,
                &RelationDelta {
                    added: vec!["bob".into()],
                    removed: vec![],
                },
                None,
                4_000,
            )
            .expect("assign bob");

        let members = reconstruct_relation(
            &store,
            &Deleted,
            "task-1",
            RelationKind::Assignee,
            &written[0].id,
            DEFAULT_REPLAY_CAP,
        )
        .expect("replay");
        assert_eq!(members, BTreeSet::from(["bob".to_string()]));
    }

    #[test]
    fn unknown_target_is_not_found() {
        let (store, _) = seeded();
        let err =
            reconstruct_fields(&store, "task-1", "blake3:missing", DEFAULT_REPLAY_CAP).unwrap_err();
        assert!(matches!(err, HistoryError::NotFound { .. }));
    }

    #[test]
    fn foreign_entry_is_not_found() {
        let (mut store, ids) = seeded();
        store
            .create_task("task-2", TaskFields::default(), None, 5_000)
            .expect("create");
        let err =
            reconstruct_fields(&store, "task-2", &ids[0], DEFAULT_REPLAY_CAP).unwrap_err();
        assert!(matches!(err, HistoryError::NotFound { .. }));
    }

    #[test]
    fn over_budget_prefix_fails_loudly() {
        let (store, ids) = seeded();
        let err = reconstruct_fields(&store, "task-1", &ids[1], 1).unwrap_err();
        assert!(matches!(err, HistoryError::ReplayCap { cap: 1, .. }));
    }

    #[test]
    fn repeated_calls_are_identical() {
        let (store, ids) = seeded();
        let a = reconstruct_fields(&store, "task-1", &ids[1], DEFAULT_REPLAY_CAP).expect("replay");
        let b = reconstruct_fields(&store, "task-1", &ids[1], DEFAULT_REPLAY_CAP).expect("replay");
        assert_eq!(a, b);
    }
}
