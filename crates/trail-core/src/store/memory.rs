//! In-memory history store.
//!
//! Backs unit tests and property tests: the replay engine can be fed
//! synthetic entry sequences without a live database. Mirrors the SQLite
//! store's observable behavior — position assignment, id hashing, filter
//! semantics — minus durability and transactions (each mutator is a single
//! in-process step, so atomicity is trivial).

use crate::entry::{EntryDraft, HistoryEntry, Position, RelationKind};
use crate::error::{HistoryError, Result};
use crate::model::{RelationSets, TaskFields, TaskRecord};
use crate::record::{self, RelationDelta};
use crate::store::{matches_filter, CurrentState, HistoryFilter, HistoryStore};
use std::collections::HashMap;

/// Ledger plus minimal live store, all in process memory.
#[derive(Debug, Default)]
pub struct MemoryHistory {
    /// Ascending per-entity entry lists (append order == ledger order).
    entries: HashMap<String, Vec<HistoryEntry>>,
    tasks: HashMap<String, TaskRecord>,
    relations: HashMap<String, RelationSets>,
}

impl MemoryHistory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a task and record its `entity.created` entry.
    ///
    /// # Errors
    ///
    /// `Validation` if the id is already taken.
    pub fn create_task(
        &mut self,
        entity_id: &str,
        fields: TaskFields,
        actor_id: Option<&str>,
        at_us: i64,
    ) -> Result<HistoryEntry> {
        if self.tasks.contains_key(entity_id) {
            return Err(HistoryError::validation(format!(
                "task '{entity_id}' already exists"
            )));
        }

        let draft = record::creation_draft(&fields, actor_id, None);
        let mut written = self.append(entity_id, at_us, vec![draft])?;
        let entry = written.pop().ok_or_else(|| {
            HistoryError::validation("creation produced no entry")
        })?;

        self.tasks.insert(
            entity_id.to_string(),
            TaskRecord {
                id: entity_id.to_string(),
                fields,
                created_at_us: entry.changed_at_us,
                updated_at_us: entry.changed_at_us,
            },
        );
        self.relations
            .insert(entity_id.to_string(), RelationSets::default());
        Ok(entry)
    }

    /// Apply a scalar mutation, recording one entry per changed field.
    ///
    /// # Errors
    ///
    /// `NotFound` if the task does not exist.
    pub fn update_task(
        &mut self,
        entity_id: &str,
        post: TaskFields,
        actor_id: Option<&str>,
        at_us: i64,
    ) -> Result<Vec<HistoryEntry>> {
        let pre = self
            .tasks
            .get(entity_id)
            .ok_or_else(|| HistoryError::entity_not_found(entity_id))?
            .fields
            .clone();

        let drafts = record::field_diffs(&pre, &post, actor_id);
        if drafts.is_empty() {
            return Ok(vec![]);
        }

        let written = self.append(entity_id, at_us, drafts)?;
        let task = self
            .tasks
            .get_mut(entity_id)
            .ok_or_else(|| HistoryError::entity_not_found(entity_id))?;
        task.fields = post;
        if let Some(last) = written.last() {
            task.updated_at_us = last.changed_at_us;
        }
        Ok(written)
    }

    /// Apply a relation delta, recording one entry per added/removed id.
    ///
    /// # Errors
    ///
    /// `NotFound` if the task does not exist.
    pub fn apply_relations(
        &mut self,
        entity_id: &str,
        kind: RelationKind,
        delta: &RelationDelta,
        actor_id: Option<&str>,
        at_us: i64,
    ) -> Result<Vec<HistoryEntry>> {
        if !self.tasks.contains_key(entity_id) {
            return Err(HistoryError::entity_not_found(entity_id));
        }
        if delta.is_empty() {
            return Ok(vec![]);
        }

        let drafts = record::relation_diffs(kind, delta, actor_id);
        let written = self.append(entity_id, at_us, drafts)?;

        let sets = self.relations.entry(entity_id.to_string()).or_default();
        let members = sets.get_mut(kind);
        for id in &delta.removed {
            members.remove(id);
        }
        for id in &delta.added {
            members.insert(id.clone());
        }
        Ok(written)
    }
}

#[cfg(test)]
impl MemoryHistory {
    /// Test-only drift injection: mutate the live row without recording
    /// history, to exercise the consistency-degradation path.
    pub(crate) fn inject_drift(
        &mut self,
        entity_id: &str,
        mutate: impl FnOnce(&mut TaskRecord),
    ) {
        if let Some(task) = self.tasks.get_mut(entity_id) {
            mutate(task);
        }
    }
}

impl HistoryStore for MemoryHistory {
    fn append(
        &mut self,
        entity_id: &str,
        at_us: i64,
        drafts: Vec<EntryDraft>,
    ) -> Result<Vec<HistoryEntry>> {
        let list = self.entries.entry(entity_id.to_string()).or_default();

        // Ledger order must match append order even when the wall clock
        // steps backwards: clamp forward to the last recorded timestamp.
        let (mut next_seq, changed_at_us) = list.last().map_or((0, at_us), |last| {
            (last.sequence + 1, at_us.max(last.changed_at_us))
        });

        let mut written = Vec::with_capacity(drafts.len());
        for draft in drafts {
            let entry = draft.into_entry(
                entity_id,
                Position {
                    changed_at_us,
                    sequence: next_seq,
                },
            );
            next_seq += 1;
            list.push(entry.clone());
            written.push(entry);
        }
        Ok(written)
    }

    fn entry(&self, entity_id: &str, entry_id: &str) -> Result<Option<HistoryEntry>> {
        Ok(self
            .entries
            .get(entity_id)
            .and_then(|list| list.iter().find(|e| e.id == entry_id))
            .cloned())
    }

    fn latest(&self, entity_id: &str) -> Result<Option<HistoryEntry>> {
        Ok(self
            .entries
            .get(entity_id)
            .and_then(|list| list.last())
            .cloned())
    }

    fn entries_up_to(
        &self,
        entity_id: &str,
        up_to: Position,
        cap: usize,
    ) -> Result<Vec<HistoryEntry>> {
        Ok(self
            .entries
            .get(entity_id)
            .map(|list| {
                list.iter()
                    .filter(|e| e.position() <= up_to)
                    .take(cap + 1)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn relation_entries_up_to(
        &self,
        entity_id: &str,
        kind: RelationKind,
        up_to: Position,
        cap: usize,
    ) -> Result<Vec<HistoryEntry>> {
        Ok(self
            .entries
            .get(entity_id)
            .map(|list| {
                list.iter()
                    .filter(|e| e.relation_kind == Some(kind) && e.position() <= up_to)
                    .take(cap + 1)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn page(&self, filter: &HistoryFilter) -> Result<(Vec<HistoryEntry>, u64)> {
        let Some(list) = self.entries.get(&filter.entity_id) else {
            return Ok((vec![], 0));
        };

        let matching: Vec<&HistoryEntry> = list
            .iter()
            .rev() // descending (changed_at_us, sequence)
            .filter(|e| matches_filter(e, filter))
            .collect();
        let total = matching.len() as u64;
        let page = matching
            .into_iter()
            .skip(filter.offset as usize)
            .take(filter.limit as usize)
            .cloned()
            .collect();
        Ok((page, total))
    }
}

impl CurrentState for MemoryHistory {
    fn task(&self, entity_id: &str) -> Result<Option<TaskRecord>> {
        Ok(self.tasks.get(entity_id).cloned())
    }

    fn relations(&self, entity_id: &str) -> Result<RelationSets> {
        Ok(self.relations.get(entity_id).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::ChangeType;
    use crate::model::Priority;

    fn store_with_task() -> MemoryHistory {
        let mut store = MemoryHistory::new();
        store
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
        store
    }

    #[test]
    fn creation_is_first_and_only_entry() {
        let store = store_with_task();
        let latest = store.latest("task-1").expect("query").expect("entry");
        assert_eq!(latest.change_type, ChangeType::EntityCreated);
        assert_eq!(latest.sequence, 0);
    }

    #[test]
    fn duplicate_create_rejected() {
        let mut store = store_with_task();
        let err = store
            .create_task("task-1", TaskFields::default(), None, 2_000)
            .unwrap_err();
        assert!(matches!(err, HistoryError::Validation { .. }));
    }

    #[test]
    fn sequences_increase_within_one_append() {
        let mut store = store_with_task();
        let mut post = store.task("task-1").expect("query").expect("task").fields;
        post.priority = Some(Priority::High);
        post.completed = true;
        let written = store
            .update_task("task-1", post, None, 2_000)
            .expect("update");
        assert_eq!(written.len(), 2);
        assert_eq!(written[0].sequence, 1);
        assert_eq!(written[1].sequence, 2);
        assert_eq!(written[0].changed_at_us, written[1].changed_at_us);
    }

    #[test]
    fn clock_stepping_backwards_clamps_forward() {
        let mut store = store_with_task();
        let mut post = store.task("task-1").expect("query").expect("task").fields;
        post.completed = true;
        let written = store.update_task("task-1", post, None, 10).expect("update");
        // Created at 1_000; the earlier wall clock must not reorder the ledger.
        assert_eq!(written[0].changed_at_us, 1_000);
        assert_eq!(written[0].sequence, 1);
    }

    #[test]
    fn no_op_update_writes_nothing() {
        let mut store = store_with_task();
        let fields = store.task("task-1").expect("query").expect("task").fields;
        let written = store
            .update_task("task-1", fields, None, 2_000)
            .expect("update");
        assert!(written.is_empty());
        let (_, total) = store
            .page(&HistoryFilter {
                entity_id: "task-1".into(),
                change_type: None,
                field_name: None,
                limit: 10,
                offset: 0,
            })
            .expect("page");
        assert_eq!(total, 1);
    }

    #[test]
    fn relations_update_live_sets_and_ledger() {
        let mut store = store_with_task();
        store
            .apply_relations(
                "task-1",
                RelationKind::Assignee,
                &RelationDelta {
                    added: vec!["alice".into()],
                    removed: vec![],
                },
                None,
                2_000,
            )
            .expect("assign");
        let sets = store.relations("task-1").expect("relations");
        assert!(sets.assignees.contains("alice"));
        let rel = store
            .relation_entries_up_to(
                "task-1",
                RelationKind::Assignee,
                Position {
                    changed_at_us: i64::MAX,
                    sequence: u64::MAX,
                },
                100,
            )
            .expect("scan");
        assert_eq!(rel.len(), 1);
    }

    #[test]
    fn entry_lookup_is_entity_scoped() {
        let mut store = store_with_task();
        store
            .create_task("task-2", TaskFields::default(), None, 1_500)
            .expect("create");
        let id = store
            .latest("task-1")
            .expect("query")
            .expect("entry")
            .id;
        assert!(store.entry("task-1", &id).expect("query").is_some());
        assert!(store.entry("task-2", &id).expect("query").is_none());
    }

    #[test]
    fn prefix_scan_respects_cap_overflow_slot() {
        let mut store = store_with_task();
        for i in 0..5 {
            let mut post = store.task("task-1").expect("query").expect("task").fields;
            post.estimation_points = Some(i);
            store
                .update_task("task-1", post, None, 2_000 + i)
                .expect("update");
        }
        let prefix = store
            .entries_up_to(
                "task-1",
                Position {
                    changed_at_us: i64::MAX,
                    sequence: u64::MAX,
                },
                3,
            )
            .expect("scan");
        assert_eq!(prefix.len(), 4); // cap + 1 sentinel
    }
}
