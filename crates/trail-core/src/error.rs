//! Error taxonomy for history reads and writes.
//!
//! Validation and not-found failures are returned to callers as typed
//! variants. Consistency violations are deliberately *not* represented here:
//! they are recovered locally (a degraded snapshot, a skipped entry) and
//! surfaced only through `tracing`, never as a caller-visible failure.
//! Authorization is delegated entirely to the caller's permission layer and
//! never appears in this crate.

/// Failures surfaced by the history subsystem.
#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    /// Malformed request input: bad pagination bounds or filter values.
    #[error("invalid request: {reason}")]
    Validation { reason: String },

    /// Entity or entry absent, or the entry belongs to another entity.
    #[error("not found: entity '{entity_id}'{}", entry_id.as_deref().map(|id| format!(" entry '{id}'")).unwrap_or_default())]
    NotFound {
        entity_id: String,
        entry_id: Option<String>,
    },

    /// The bounded-replay budget was exceeded for this entity.
    ///
    /// Truncating the fold would silently drop the creation entry and break
    /// the round-trip guarantee, so an over-budget prefix fails loudly
    /// instead.
    #[error("history for entity '{entity_id}' exceeds the replay cap of {cap} entries")]
    ReplayCap { entity_id: String, cap: usize },

    /// Underlying datastore failure. No internal retries: the surrounding
    /// request's caller decides whether to retry.
    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),
}

impl HistoryError {
    /// Shorthand for a validation failure.
    pub fn validation(reason: impl Into<String>) -> Self {
        Self::Validation {
            reason: reason.into(),
        }
    }

    /// Shorthand for a missing entity.
    pub fn entity_not_found(entity_id: impl Into<String>) -> Self {
        Self::NotFound {
            entity_id: entity_id.into(),
            entry_id: None,
        }
    }

    /// Shorthand for a missing (or foreign-owned) entry.
    pub fn entry_not_found(entity_id: impl Into<String>, entry_id: impl Into<String>) -> Self {
        Self::NotFound {
            entity_id: entity_id.into(),
            entry_id: Some(entry_id.into()),
        }
    }
}

/// Crate-wide result alias.
pub type Result<T, E = HistoryError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_entry_when_present() {
        let err = HistoryError::entry_not_found("task-1", "blake3:abc");
        let msg = err.to_string();
        assert!(msg.contains("task-1"));
        assert!(msg.contains("blake3:abc"));

        let err = HistoryError::entity_not_found("task-1");
        assert!(!err.to_string().contains("entry"));
    }

    #[test]
    fn replay_cap_names_budget() {
        let err = HistoryError::ReplayCap {
            entity_id: "task-1".into(),
            cap: 10_000,
        };
        assert!(err.to_string().contains("10000"));
    }
}
