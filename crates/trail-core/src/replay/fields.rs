//! Scalar-field reconstruction: a left fold over an ordered entry prefix.
//!
//! The fold is a pure function of its input slice: the `entity.created`
//! entry seeds every tracked field from its payload, and each subsequent
//! `field.updated` entry overwrites exactly that field. Calling it twice
//! with the same prefix yields byte-identical projections.
//!
//! Malformed history (no creation entry, duplicate creation, updates missing
//! payloads) should never occur given the recorder's atomicity guarantee.
//! When it does appear, anomalous entries are skipped with a warning and
//! tallied, and the fold returns the best-effort projection built from the
//! entries it could interpret.

use crate::entry::{ChangeType, FieldName, HistoryEntry};
use crate::model::TaskFields;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::warn;

/// A reconstructed field-level view of an entity at some point in history.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FieldProjection {
    values: BTreeMap<FieldName, Value>,
    /// Count of entries the fold could not interpret (consistency anomalies).
    pub anomalies: u32,
}

impl FieldProjection {
    /// The reconstructed value for one tracked field, if history set it.
    #[must_use]
    pub fn get(&self, field: FieldName) -> Option<&Value> {
        self.values.get(&field)
    }

    /// The projection as a JSON object keyed by tracked field name.
    ///
    /// Fields history never set are rendered as `null` so the object shape
    /// is stable across entities.
    #[must_use]
    pub fn to_object(&self) -> Value {
        let mut map = serde_json::Map::new();
        for field in FieldName::ALL {
            map.insert(
                field.as_str().to_string(),
                self.values.get(&field).cloned().unwrap_or(Value::Null),
            );
        }
        Value::Object(map)
    }

    /// Whether this projection equals a live field set, field by field.
    #[must_use]
    pub fn matches(&self, live: &TaskFields) -> bool {
        FieldName::ALL.into_iter().all(|field| {
            self.values.get(&field).cloned().unwrap_or(Value::Null) == live.value_of(field)
        })
    }
}

/// Fold an ascending entry prefix into a field projection.
///
/// Relation entries in the prefix are not scalar facts and are skipped
/// silently; everything else is interpreted or counted as an anomaly.
#[must_use]
pub fn fold_fields(entries: &[HistoryEntry]) -> FieldProjection {
    let mut projection = FieldProjection::default();
    let mut seeded = false;

    for entry in entries {
        match entry.change_type {
            ChangeType::EntityCreated => {
                if seeded {
                    warn!(
                        entity_id = %entry.entity_id,
                        entry_id = %entry.id,
                        "duplicate entity.created entry in replay prefix"
                    );
                    projection.anomalies += 1;
                    continue;
                }
                match entry.new_value.as_ref().and_then(Value::as_object) {
                    Some(initial) => {
                        for field in FieldName::ALL {
                            let value =
                                initial.get(field.as_str()).cloned().unwrap_or(Value::Null);
                            projection.values.insert(field, value);
                        }
                        seeded = true;
                    }
                    None => {
                        warn!(
                            entity_id = %entry.entity_id,
                            entry_id = %entry.id,
                            "entity.created entry without an initial field object"
                        );
                        projection.anomalies += 1;
                    }
                }
            }
            ChangeType::FieldUpdated => {
                if !seeded {
                    warn!(
                        entity_id = %entry.entity_id,
                        entry_id = %entry.id,
                        "field.updated entry before entity.created"
                    );
                    projection.anomalies += 1;
                    // Best effort: the update still carries usable state.
                }
                match (entry.field_name, entry.new_value.clone()) {
                    (Some(field), Some(value)) => {
                        projection.values.insert(field, value);
                    }
                    _ => {
                        warn!(
                            entity_id = %entry.entity_id,
                            entry_id = %entry.id,
                            "field.updated entry missing field name or payload"
                        );
                        projection.anomalies += 1;
                    }
                }
            }
            ChangeType::RelationAdded | ChangeType::RelationRemoved => {}
        }
    }

    projection
}
