use crate::entry::FieldName;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeSet;
use std::{fmt, str::FromStr};

/// The four task priority levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
    Urgent,
}

impl Priority {
    /// All priorities in ascending order.
    pub const ALL: [Self; 4] = [Self::Low, Self::Medium, Self::High, Self::Urgent];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Urgent => "urgent",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing a priority from text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsePriorityError {
    pub got: String,
}

impl fmt::Display for ParsePriorityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid priority '{}': expected one of low, medium, high, urgent",
            self.got
        )
    }
}

impl std::error::Error for ParsePriorityError {}

impl FromStr for Priority {
    type Err = ParsePriorityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "urgent" => Ok(Self::Urgent),
            other => Err(ParsePriorityError {
                got: other.to_string(),
            }),
        }
    }
}

/// The tracked scalar fields of a task.
///
/// This is the exact field set the ledger records `field.updated` entries
/// for; one struct field per [`FieldName`] variant. Dates are wall-clock
/// microseconds since Unix epoch.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskFields {
    pub name: String,
    pub description: Option<String>,
    pub priority: Option<Priority>,
    pub completed: bool,
    pub start_date_us: Option<i64>,
    pub end_date_us: Option<i64>,
    pub estimation_points: Option<i64>,
    pub list_id: Option<String>,
}

impl TaskFields {
    /// The JSON payload value for one tracked field (`Null` when unset).
    ///
    /// Exhaustive by construction: a new [`FieldName`] variant fails to
    /// compile until it is mapped here.
    #[must_use]
    pub fn value_of(&self, field: FieldName) -> Value {
        match field {
            FieldName::Name => json!(self.name),
            FieldName::Description => json!(self.description),
            FieldName::Priority => json!(self.priority),
            FieldName::Completed => json!(self.completed),
            FieldName::StartDate => json!(self.start_date_us),
            FieldName::EndDate => json!(self.end_date_us),
            FieldName::EstimationPoints => json!(self.estimation_points),
            FieldName::ListId => json!(self.list_id),
        }
    }

    /// The full field object keyed by tracked field name.
    ///
    /// Used as the `new_value` payload of `entity.created` entries, so it
    /// always carries all tracked keys even when null.
    #[must_use]
    pub fn to_object(&self) -> Value {
        let mut map = serde_json::Map::new();
        for field in FieldName::ALL {
            map.insert(field.as_str().to_string(), self.value_of(field));
        }
        Value::Object(map)
    }
}

/// The live current-state row for a task.
///
/// Authoritative for hot-path reads; the history ledger is a derived audit
/// trail replayed only for historical queries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub id: String,
    #[serde(flatten)]
    pub fields: TaskFields,
    pub created_at_us: i64,
    pub updated_at_us: i64,
}

/// Compact task identity attached to history pages for display context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSummary {
    pub id: String,
    pub name: String,
    pub created_at_us: i64,
}

/// Live membership of the three relation sets.
///
/// Sets are ordered (`BTreeSet`) so comparisons against reconstructed
/// membership are deterministic.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RelationSets {
    pub assignees: BTreeSet<String>,
    pub labels: BTreeSet<String>,
    pub projects: BTreeSet<String>,
}

impl RelationSets {
    /// The member set for one relation kind.
    #[must_use]
    pub const fn get(&self, kind: crate::entry::RelationKind) -> &BTreeSet<String> {
        match kind {
            crate::entry::RelationKind::Assignee => &self.assignees,
            crate::entry::RelationKind::Label => &self.labels,
            crate::entry::RelationKind::Project => &self.projects,
        }
    }

    /// Mutable member set for one relation kind.
    pub fn get_mut(&mut self, kind: crate::entry::RelationKind) -> &mut BTreeSet<String> {
        match kind {
            crate::entry::RelationKind::Assignee => &mut self.assignees,
            crate::entry::RelationKind::Label => &mut self.labels,
            crate::entry::RelationKind::Project => &mut self.projects,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::RelationKind;

    #[test]
    fn priority_roundtrip() {
        for p in Priority::ALL {
            let parsed: Priority = p.as_str().parse().expect("should parse");
            assert_eq!(parsed, p);
        }
        assert!("critical".parse::<Priority>().is_err());
    }

    #[test]
    fn priority_serde_lowercase() {
        assert_eq!(
            serde_json::to_string(&Priority::Urgent).expect("serialize"),
            "\"urgent\""
        );
    }

    #[test]
    fn value_of_covers_every_tracked_field() {
        let fields = TaskFields {
            name: "Ship it".into(),
            description: Some("notes".into()),
            priority: Some(Priority::High),
            completed: true,
            start_date_us: Some(1_000),
            end_date_us: None,
            estimation_points: Some(3),
            list_id: Some("doing".into()),
        };
        assert_eq!(fields.value_of(FieldName::Name), json!("Ship it"));
        assert_eq!(fields.value_of(FieldName::Priority), json!("high"));
        assert_eq!(fields.value_of(FieldName::Completed), json!(true));
        assert_eq!(fields.value_of(FieldName::EndDate), Value::Null);
    }

    #[test]
    fn to_object_carries_all_tracked_keys() {
        let obj = TaskFields::default().to_object();
        let map = obj.as_object().expect("object");
        assert_eq!(map.len(), FieldName::ALL.len());
        for field in FieldName::ALL {
            assert!(map.contains_key(field.as_str()), "missing {field}");
        }
    }

    #[test]
    fn relation_sets_get_mut_targets_one_kind() {
        let mut sets = RelationSets::default();
        sets.get_mut(RelationKind::Label).insert("backend".into());
        assert!(sets.labels.contains("backend"));
        assert!(sets.assignees.is_empty());
        assert!(sets.get(RelationKind::Project).is_empty());
    }
}
