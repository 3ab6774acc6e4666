//! Entry data model for the trail history ledger.
//!
//! This module defines [`HistoryEntry`] — one immutable recorded fact about
//! one task — plus the [`EntryDraft`] shape the change recorder emits before
//! the store assigns a position, and the [`Position`] key that totally orders
//! an entity's entries.
//!
//! Entry ids are content hashes: BLAKE3 over the canonical tab-joined entry
//! line, rendered as `blake3:<hex>`. Because the line includes the per-entity
//! `(changed_at_us, sequence)` position, ids are globally unique and
//! deterministic for a given ledger.

pub mod canonical;
pub mod types;

pub use canonical::canonicalize_json;
pub use types::{
    ChangeType, FieldName, RelationKind, UnknownChangeType, UnknownFieldName, UnknownRelationKind,
};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The total-order key for an entity's entries: `(changed_at_us, sequence)`.
///
/// `changed_at_us` is a coarse wall clock (microseconds since Unix epoch);
/// `sequence` is the per-entity monotonic counter that breaks same-microsecond
/// ties deterministically. Derived `Ord` compares fields in declaration order,
/// which is exactly the ledger order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Position {
    /// Wall-clock microseconds since Unix epoch.
    pub changed_at_us: i64,
    /// Per-entity monotonic counter.
    pub sequence: u64,
}

/// A single entry in the history ledger.
///
/// Entries are immutable once written: they are appended by the change
/// recorder inside the same transaction as the mutation they describe, and
/// only ever disappear when the owning entity is deleted (cascade).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Content-hash identifier, `blake3:<hex>`.
    pub id: String,

    /// The task this entry belongs to.
    pub entity_id: String,

    /// Wall-clock microseconds since Unix epoch (coarse clock).
    pub changed_at_us: i64,

    /// Per-entity monotonic counter; orders entries sharing a timestamp.
    pub sequence: u64,

    /// What kind of fact this entry records.
    pub change_type: ChangeType,

    /// Present only for [`ChangeType::FieldUpdated`].
    pub field_name: Option<FieldName>,

    /// Present only for relation entries.
    pub relation_kind: Option<RelationKind>,

    /// Present only for relation entries; the related entity's id.
    pub related_id: Option<String>,

    /// Previous scalar value, for `field.updated`.
    pub old_value: Option<Value>,

    /// New scalar value for `field.updated`; full initial field object for
    /// `entity.created`.
    pub new_value: Option<Value>,

    /// Who made the change, when known.
    pub actor_id: Option<String>,

    /// Optional free-form context.
    pub metadata: Option<Value>,
}

impl HistoryEntry {
    /// The entry's position in its entity's total order.
    #[must_use]
    pub const fn position(&self) -> Position {
        Position {
            changed_at_us: self.changed_at_us,
            sequence: self.sequence,
        }
    }
}

impl std::fmt::Display for HistoryEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}\t{}\t{}/{}\t{}\t{}",
            self.id,
            self.entity_id,
            self.changed_at_us,
            self.sequence,
            self.change_type,
            match self.change_type {
                ChangeType::EntityCreated => "created".to_string(),
                ChangeType::FieldUpdated => self
                    .field_name
                    .map_or_else(|| "?".to_string(), |fname| fname.to_string()),
                ChangeType::RelationAdded | ChangeType::RelationRemoved => format!(
                    "{}:{}",
                    self.relation_kind
                        .map_or_else(|| "?".to_string(), |kind| kind.to_string()),
                    self.related_id.as_deref().unwrap_or("?"),
                ),
            }
        )
    }
}

/// A recorded fact before the store has assigned its position.
///
/// The change recorder emits drafts; [`crate::store::HistoryStore::append`]
/// turns them into [`HistoryEntry`] values by stamping `(changed_at_us,
/// sequence)` and computing the content-hash id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryDraft {
    pub change_type: ChangeType,
    pub field_name: Option<FieldName>,
    pub relation_kind: Option<RelationKind>,
    pub related_id: Option<String>,
    pub old_value: Option<Value>,
    pub new_value: Option<Value>,
    pub actor_id: Option<String>,
    pub metadata: Option<Value>,
}

impl EntryDraft {
    /// Stamp a draft with its assigned position, producing a full entry.
    ///
    /// Scalar payloads are canonicalized (sorted keys, compact) so the stored
    /// bytes — and therefore every later reconstruction — are deterministic.
    #[must_use]
    pub fn into_entry(self, entity_id: &str, at: Position) -> HistoryEntry {
        let old_value = self.old_value.map(recanonicalize);
        let new_value = self.new_value.map(recanonicalize);
        let id = compute_entry_id(
            entity_id,
            at,
            self.change_type,
            self.field_name,
            self.relation_kind,
            self.related_id.as_deref(),
            old_value.as_ref(),
            new_value.as_ref(),
        );
        HistoryEntry {
            id,
            entity_id: entity_id.to_string(),
            changed_at_us: at.changed_at_us,
            sequence: at.sequence,
            change_type: self.change_type,
            field_name: self.field_name,
            relation_kind: self.relation_kind,
            related_id: self.related_id,
            old_value,
            new_value,
            actor_id: self.actor_id,
            metadata: self.metadata,
        }
    }
}

/// Reparse a value through its canonical string so key order is normalized.
fn recanonicalize(value: Value) -> Value {
    serde_json::from_str(&canonicalize_json(&value)).unwrap_or(value)
}

/// Compute the BLAKE3 entry id from the canonical tab-joined entry line.
///
/// The hash input is the UTF-8 bytes of:
/// `{entity_id}\t{changed_at_us}\t{sequence}\t{change_type}\t{field}\t{kind}\t{related}\t{old}\t{new}\n`
/// with absent optional fields rendered as `-`. Returns `blake3:<hex>`.
#[must_use]
#[allow(clippy::too_many_arguments)]
pub fn compute_entry_id(
    entity_id: &str,
    at: Position,
    change_type: ChangeType,
    field_name: Option<FieldName>,
    relation_kind: Option<RelationKind>,
    related_id: Option<&str>,
    old_value: Option<&Value>,
    new_value: Option<&Value>,
) -> String {
    let hash_input = format!(
        "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\n",
        entity_id,
        at.changed_at_us,
        at.sequence,
        change_type,
        field_name.map_or("-", FieldName::as_str),
        relation_kind.map_or("-", RelationKind::as_str),
        related_id.unwrap_or("-"),
        old_value.map_or_else(|| "-".to_string(), canonicalize_json),
        new_value.map_or_else(|| "-".to_string(), canonicalize_json),
    );
    let hash = blake3::hash(hash_input.as_bytes());
    format!("blake3:{hash}")
}
