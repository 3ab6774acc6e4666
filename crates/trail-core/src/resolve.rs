//! Display-name resolution for actors and related entities.
//!
//! These collaborators exist only to label snapshot output for humans;
//! membership truth at past times always comes from the ledger. Resolution
//! failures therefore degrade (raw id, or omission with a warning) and never
//! fail a reconstruction.

use crate::entry::RelationKind;

/// Resolves actor ids to human-readable display names.
pub trait ActorResolver {
    /// `None` when the actor is unknown; callers fall back to the raw id.
    fn actor_name(&self, actor_id: &str) -> Option<String>;
}

/// Resolves related-entity ids for one relation kind.
///
/// `None` means the related entity no longer exists (for example a
/// hard-deleted label); the snapshot assembler omits it with a warning.
pub trait RelationNameResolver {
    fn resolve(&self, kind: RelationKind, related_id: &str) -> Option<String>;
}

/// Resolver that treats every id as live and displays it verbatim.
///
/// The default when no external directory is wired in: historical membership
/// is shown as raw ids and nothing is omitted.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityResolver;

impl ActorResolver for IdentityResolver {
    fn actor_name(&self, _actor_id: &str) -> Option<String> {
        None
    }
}

impl RelationNameResolver for IdentityResolver {
    fn resolve(&self, _kind: RelationKind, related_id: &str) -> Option<String> {
        Some(related_id.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_resolver_passes_ids_through() {
        let resolver = IdentityResolver;
        assert_eq!(
            resolver.resolve(RelationKind::Label, "backend"),
            Some("backend".to_string())
        );
        assert_eq!(resolver.actor_name("user-1"), None);
    }
}
