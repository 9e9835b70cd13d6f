//! AniTrack's population steps.
//!
//! Each schema version's seed/transform logic is a statically compiled
//! [`PopulationStep`](crate::populate::PopulationStep), selected from a
//! registry by its `(from, to)` transition. [`default_registry`] holds the
//! steps shipped with the schema artifacts in `migrations/`.

use std::sync::Arc;

use crate::populate::PopulationRegistry;

pub mod legacy;
pub mod lookup;
pub mod metadata;
pub mod text;

pub use legacy::LegacyAnimeMigration;
pub use lookup::LookupSeedStep;
pub use metadata::{MetadataProvider, SeriesRecord};

/// The registry of steps matching the shipped schema artifacts.
///
/// | Transition | Step |
/// |---|---|
/// | `0 -> 2` | `v2_create_populate`: seed genre and stream-service lookups |
/// | `0 -> 3` | `v3_create_populate`: v2 seeding plus content statuses |
/// | `1 -> 2` | `v1_to_v2_upgrade_populate`: lookup seeding and legacy row migration |
/// | `2 -> 3` | `v2_to_v3_upgrade_populate`: seed the content-status lookup |
///
/// `provider` enables metadata enrichment during the `1 -> 2` legacy
/// migration; pass `None` to migrate rows with lookup references only.
pub fn default_registry(provider: Option<Arc<dyn MetadataProvider>>) -> PopulationRegistry {
    let mut registry = PopulationRegistry::new();
    registry.register(0, 2, LookupSeedStep::v2());
    registry.register(0, 3, LookupSeedStep::v3());
    registry.register(1, 2, LegacyAnimeMigration::new(provider));
    registry.register(2, 3, LookupSeedStep::content_statuses());
    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_registry_covers_shipped_artifacts() {
        let registry = default_registry(None);
        assert!(registry.get(0, 2).is_some());
        assert!(registry.get(0, 3).is_some());
        assert!(registry.get(1, 2).is_some());
        assert!(registry.get(2, 3).is_some());
        // v1 has no seed data of its own.
        assert!(registry.get(0, 1).is_none());
    }
}
