//! Snapshot assembly: one entity projection per target entry.
//!
//! Composes the field reconstruction with the three relation folds and
//! attaches the target entry's metadata for display context.
//!
//! The principal end-to-end correctness check for the whole subsystem lives
//! here: a snapshot at the entity's *latest* entry must equal the live
//! current-state row and live relationship membership. A mismatch is a
//! consistency violation — it is logged at error severity and the snapshot
//! degrades to live state with `degraded: true` instead of failing the
//! request.

use crate::entry::{ChangeType, RelationKind};
use crate::error::{HistoryError, Result};
use crate::replay::{fold_fields, fold_relation, resolve_members, resolve_target};
use crate::resolve::{ActorResolver, RelationNameResolver};
use crate::store::{CurrentState, HistoryStore};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeSet;
use tracing::error;

/// Display context from the snapshot's target entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryMeta {
    pub entry_id: String,
    pub changed_at_us: i64,
    pub change_type: ChangeType,
    pub actor_id: Option<String>,
    /// Resolved display name, when the actor directory knows the id.
    pub actor_name: Option<String>,
}

/// A reconstructed entity projection as of one history entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    pub entity_id: String,
    /// Field object keyed by tracked field name (stable shape, nulls kept).
    pub fields: Value,
    pub assignees: Vec<String>,
    pub labels: Vec<String>,
    pub projects: Vec<String>,
    pub entry_meta: EntryMeta,
    /// True when a latest-entry consistency check failed and live state was
    /// substituted for the reconstruction.
    pub degraded: bool,
}

impl Snapshot {
    /// Membership list for one relation kind.
    #[must_use]
    pub fn relation(&self, kind: RelationKind) -> &[String] {
        match kind {
            RelationKind::Assignee => &self.assignees,
            RelationKind::Label => &self.labels,
            RelationKind::Project => &self.projects,
        }
    }
}

/// Assemble the snapshot of `entity_id` as of `target_entry_id`.
///
/// # Errors
///
/// `NotFound` if the target entry is absent or foreign-owned; `ReplayCap`
/// if any replay prefix exceeds `cap`; storage errors pass through.
/// Consistency violations never error — they degrade (see module docs).
pub fn snapshot_at<S: HistoryStore + CurrentState + ?Sized>(
    store: &S,
    actors: &dyn ActorResolver,
    names: &dyn RelationNameResolver,
    entity_id: &str,
    target_entry_id: &str,
    cap: usize,
) -> Result<Snapshot> {
    let target = resolve_target(store, entity_id, target_entry_id)?;
    let position = target.position();

    let prefix = store.entries_up_to(entity_id, position, cap)?;
    if prefix.len() > cap {
        return Err(HistoryError::ReplayCap {
            entity_id: entity_id.to_string(),
            cap,
        });
    }
    let projection = fold_fields(&prefix);

    let mut membership: [BTreeSet<String>; 3] = Default::default();
    for (slot, kind) in membership.iter_mut().zip(RelationKind::ALL) {
        let rel_prefix = store.relation_entries_up_to(entity_id, kind, position, cap)?;
        if rel_prefix.len() > cap {
            return Err(HistoryError::ReplayCap {
                entity_id: entity_id.to_string(),
                cap,
            });
        }
        *slot = fold_relation(&rel_prefix);
    }
    let [assignees, labels, projects] = membership;

    let entry_meta = EntryMeta {
        entry_id: target.id.clone(),
        changed_at_us: target.changed_at_us,
        change_type: target.change_type,
        actor_id: target.actor_id.clone(),
        actor_name: target.actor_id.as_deref().and_then(|id| actors.actor_name(id)),
    };

    // Round-trip verification: at the latest entry, reconstruction must
    // agree with the authoritative live state.
    let is_latest = store
        .latest(entity_id)?
        .is_some_and(|latest| latest.id == target.id);
    if is_latest {
        match store.task(entity_id)? {
            Some(live) => {
                let live_relations = store.relations(entity_id)?;
                let consistent = projection.matches(&live.fields)
                    && assignees == live_relations.assignees
                    && labels == live_relations.labels
                    && projects == live_relations.projects;
                if !consistent {
                    error!(
                        entity_id,
                        target_entry_id,
                        anomalies = projection.anomalies,
                        "latest-entry reconstruction disagrees with live state; \
                         returning live state"
                    );
                    return Ok(Snapshot {
                        entity_id: entity_id.to_string(),
                        fields: live.fields.to_object(),
                        assignees: live_relations.assignees.into_iter().collect(),
                        labels: live_relations.labels.into_iter().collect(),
                        projects: live_relations.projects.into_iter().collect(),
                        entry_meta,
                        degraded: true,
                    });
                }
            }
            None => {
                // History without a live row; nothing to degrade to.
                error!(entity_id, "history exists but live task row is missing");
            }
        }
    }

    Ok(Snapshot {
        entity_id: entity_id.to_string(),
        fields: projection.to_object(),
        assignees: resolve_members(names, RelationKind::Assignee, assignees)
            .into_iter()
            .collect(),
        labels: resolve_members(names, RelationKind::Label, labels)
            .into_iter()
            .collect(),
        projects: resolve_members(names, RelationKind::Project, projects)
            .into_iter()
            .collect(),
        entry_meta,
        degraded: false,
    })
}
