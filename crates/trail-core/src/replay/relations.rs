//! Time-varying relation membership from add/remove entries.
//!
//! Membership at a point in history is last-writer-wins per related id: a
//! related id is a member iff the chronologically last relation entry at or
//! before the target is `relation.added`. Toggle chains (added → removed →
//! added) resolve correctly because only the final verb per id counts.
//!
//! The fold is linear in the relation entries for one entity and kind; the
//! store contract guarantees unrelated entities are never scanned.

use crate::entry::{ChangeType, HistoryEntry};
use std::collections::{BTreeMap, BTreeSet};
use tracing::warn;

/// Fold an ascending, single-kind relation entry prefix into a member set.
///
/// Entries that are not relation verbs or lack a `related_id` are skipped
/// with a warning — malformed history degrades, it never fails.
#[must_use]
pub fn fold_relation(entries: &[HistoryEntry]) -> BTreeSet<String> {
    // Last verb per related id wins; BTreeMap keeps the result ordered.
    let mut last_verb: BTreeMap<&str, bool> = BTreeMap::new();

    for entry in entries {
        let added = match entry.change_type {
            ChangeType::RelationAdded => true,
            ChangeType::RelationRemoved => false,
            ChangeType::EntityCreated | ChangeType::FieldUpdated => {
                warn!(
                    entity_id = %entry.entity_id,
                    entry_id = %entry.id,
                    change_type = %entry.change_type,
                    "non-relation entry in relation replay prefix"
                );
                continue;
            }
        };

        match entry.related_id.as_deref() {
            Some(related_id) => {
                last_verb.insert(related_id, added);
            }
            None => {
                warn!(
                    entity_id = %entry.entity_id,
                    entry_id = %entry.id,
                    "relation entry missing related_id"
                );
            }
        }
    }

    last_verb
        .into_iter()
        .filter_map(|(id, added)| added.then(|| id.to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::{EntryDraft, Position, RelationKind};

    fn rel(seq: u64, added: bool, related_id: &str) -> HistoryEntry {
        EntryDraft {
            change_type: if added {
                ChangeType::RelationAdded
            } else {
                ChangeType::RelationRemoved
            },
            field_name: None,
            relation_kind: Some(RelationKind::Label),
            related_id: Some(related_id.into()),
            old_value: None,
            new_value: None,
            actor_id: None,
            metadata: None,
        }
        .into_entry(
            "task-1",
            Position {
                changed_at_us: 1_000 + i64::try_from(seq).unwrap_or(0),
                sequence: seq,
            },
        )
    }

    #[test]
    fn empty_prefix_is_empty_set() {
        assert!(fold_relation(&[]).is_empty());
    }

    #[test]
    fn single_add_is_member() {
        let set = fold_relation(&[rel(0, true, "backend")]);
        assert_eq!(set, BTreeSet::from(["backend".to_string()]));
    }

    #[test]
    fn add_then_remove_is_not_member() {
        let set = fold_relation(&[rel(0, true, "backend"), rel(1, false, "backend")]);
        assert!(set.is_empty());
    }

    #[test]
    fn toggle_chain_resolves_to_last_verb() {
        let set = fold_relation(&[
            rel(0, true, "backend"),
            rel(1, false, "backend"),
            rel(2, true, "backend"),
        ]);
        assert_eq!(set, BTreeSet::from(["backend".to_string()]));
    }

    #[test]
    fn ids_are_independent() {
        let set = fold_relation(&[
            rel(0, true, "alice"),
            rel(1, true, "bob"),
            rel(2, false, "alice"),
        ]);
        assert_eq!(set, BTreeSet::from(["bob".to_string()]));
    }

    #[test]
    fn remove_without_prior_add_stays_out() {
        let set = fold_relation(&[rel(0, false, "ghost"), rel(1, true, "real")]);
        assert_eq!(set, BTreeSet::from(["real".to_string()]));
    }

    #[test]
    fn malformed_entries_degrade() {
        let mut missing_id = rel(0, true, "x");
        missing_id.related_id = None;
        let mut wrong_type = rel(1, true, "y");
        wrong_type.change_type = ChangeType::FieldUpdated;
        let set = fold_relation(&[missing_id, wrong_type, rel(2, true, "z")]);
        assert_eq!(set, BTreeSet::from(["z".to_string()]));
    }

    #[test]
    fn fold_is_idempotent() {
        let entries = [rel(0, true, "a"), rel(1, false, "a"), rel(2, true, "b")];
        assert_eq!(fold_relation(&entries), fold_relation(&entries));
    }
}
