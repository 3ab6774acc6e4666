//! Closed discriminant enums for history entries.
//!
//! `ChangeType`, `FieldName`, and `RelationKind` behave as closed tagged
//! unions: every consumer matches exhaustively, so adding a new change kind
//! or tracked field is a compile-time-checked change everywhere. The string
//! representations use the dotted `noun.verb` format stored in the ledger.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The four kinds of recorded fact in the history ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeType {
    /// First entry of an entity; `new_value` carries the full initial field set.
    EntityCreated,
    /// A tracked scalar field changed; carries `old_value`/`new_value`.
    FieldUpdated,
    /// A related id joined a relation set (assignee, label, project).
    RelationAdded,
    /// A related id left a relation set.
    RelationRemoved,
}

/// Error returned when parsing an unknown change type string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownChangeType {
    /// The unrecognised input string.
    pub raw: String,
}

impl fmt::Display for UnknownChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown change type '{}': expected one of entity.created, \
             field.updated, relation.added, relation.removed",
            self.raw
        )
    }
}

impl std::error::Error for UnknownChangeType {}

impl ChangeType {
    /// All change types in catalog order.
    pub const ALL: [Self; 4] = [
        Self::EntityCreated,
        Self::FieldUpdated,
        Self::RelationAdded,
        Self::RelationRemoved,
    ];

    /// Return the canonical `noun.verb` string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::EntityCreated => "entity.created",
            Self::FieldUpdated => "field.updated",
            Self::RelationAdded => "relation.added",
            Self::RelationRemoved => "relation.removed",
        }
    }

    /// Whether this type is one of the two relation membership verbs.
    #[must_use]
    pub const fn is_relation(self) -> bool {
        matches!(self, Self::RelationAdded | Self::RelationRemoved)
    }
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChangeType {
    type Err = UnknownChangeType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "entity.created" => Ok(Self::EntityCreated),
            "field.updated" => Ok(Self::FieldUpdated),
            "relation.added" => Ok(Self::RelationAdded),
            "relation.removed" => Ok(Self::RelationRemoved),
            _ => Err(UnknownChangeType { raw: s.to_string() }),
        }
    }
}

// Custom serde: serialize as the dotted string.
impl Serialize for ChangeType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ChangeType {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_str(&s).map_err(serde::de::Error::custom)
    }
}

/// The tracked scalar fields of a task.
///
/// Only these fields produce `field.updated` entries; anything else on the
/// live row is untracked and invisible to reconstruction. Ordered by catalog
/// position so projections keyed by field are deterministic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FieldName {
    Name,
    Description,
    Priority,
    Completed,
    StartDate,
    EndDate,
    EstimationPoints,
    ListId,
}

/// Error returned when parsing an unknown field name string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownFieldName {
    /// The unrecognised input string.
    pub raw: String,
}

impl fmt::Display for UnknownFieldName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown field name '{}': expected one of name, description, \
             priority, completed, start_date, end_date, estimation_points, list_id",
            self.raw
        )
    }
}

impl std::error::Error for UnknownFieldName {}

impl FieldName {
    /// All tracked fields in catalog order.
    pub const ALL: [Self; 8] = [
        Self::Name,
        Self::Description,
        Self::Priority,
        Self::Completed,
        Self::StartDate,
        Self::EndDate,
        Self::EstimationPoints,
        Self::ListId,
    ];

    /// Return the snake_case column name used in the ledger.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Description => "description",
            Self::Priority => "priority",
            Self::Completed => "completed",
            Self::StartDate => "start_date",
            Self::EndDate => "end_date",
            Self::EstimationPoints => "estimation_points",
            Self::ListId => "list_id",
        }
    }
}

impl fmt::Display for FieldName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldName {
    type Err = UnknownFieldName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "name" => Ok(Self::Name),
            "description" => Ok(Self::Description),
            "priority" => Ok(Self::Priority),
            "completed" => Ok(Self::Completed),
            "start_date" => Ok(Self::StartDate),
            "end_date" => Ok(Self::EndDate),
            "estimation_points" => Ok(Self::EstimationPoints),
            "list_id" => Ok(Self::ListId),
            _ => Err(UnknownFieldName { raw: s.to_string() }),
        }
    }
}

impl Serialize for FieldName {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for FieldName {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_str(&s).map_err(serde::de::Error::custom)
    }
}

/// The three time-varying many-to-many relation sets tracked per task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RelationKind {
    Assignee,
    Label,
    Project,
}

/// Error returned when parsing an unknown relation kind string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownRelationKind {
    /// The unrecognised input string.
    pub raw: String,
}

impl fmt::Display for UnknownRelationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown relation kind '{}': expected one of assignee, label, project",
            self.raw
        )
    }
}

impl std::error::Error for UnknownRelationKind {}

impl RelationKind {
    /// All relation kinds in catalog order.
    pub const ALL: [Self; 3] = [Self::Assignee, Self::Label, Self::Project];

    /// Return the canonical lowercase string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Assignee => "assignee",
            Self::Label => "label",
            Self::Project => "project",
        }
    }
}

impl fmt::Display for RelationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RelationKind {
    type Err = UnknownRelationKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "assignee" => Ok(Self::Assignee),
            "label" => Ok(Self::Label),
            "project" => Ok(Self::Project),
            _ => Err(UnknownRelationKind { raw: s.to_string() }),
        }
    }
}

impl Serialize for RelationKind {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for RelationKind {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_str(&s).map_err(serde::de::Error::custom)
    }
}
