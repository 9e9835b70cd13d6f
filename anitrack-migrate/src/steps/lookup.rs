//! Lookup-table seeding.

use anitrack_postgres::MigrationSession;
use async_trait::async_trait;
use tracing::info;

use crate::error::StepError;
use crate::populate::PopulationStep;

/// Genre list seeded by the v2 creation schema.
const GENRES_V2: &[&str] = &[
    "Action",
    "Adventure",
    "Comedy",
    "Drama",
    "Ecchi",
    "Fan Service",
    "Fantasy",
    "Harem",
    "Historical",
    "Horror",
    "Isekai",
    "Magic",
    "Martial Arts",
    "Mecha",
    "Mystery",
    "Romance",
    "School",
    "Sci-Fi",
    "Shonen",
    "Slice of Life",
    "Supernatural",
];

/// Expanded genre list seeded by the v1 -> v2 upgrade, which also has to
/// cover genres only present in metadata-sourced records.
const GENRES_V2_EXPANDED: &[&str] = &[
    "Action",
    "Adventure",
    "Comedy",
    "Drama",
    "Ecchi",
    "Fan Service",
    "Fantasy",
    "Gore",
    "Harem",
    "Historical",
    "Horror",
    "Isekai",
    "Magic",
    "Martial Arts",
    "Mecha",
    "Methodology",
    "Mystery",
    "Psychological",
    "Reincarnation",
    "Romance",
    "School",
    "Sci-Fi",
    "Shonen",
    "Slice of Life",
    "Supernatural",
    "Super Power",
    "Suspense",
    "Survival",
];

const SERVICES_V2: &[(&str, Option<&str>)] = &[
    ("AnimeLab", Some("https://www.animelab.com")),
    ("Crunchyroll", Some("https://www.crunchyroll.com")),
    ("Funimation", Some("https://www.funimation.com")),
    ("HiDive", Some("https://www.hidive.com")),
    ("Netflix", Some("https://www.netflix.com")),
    ("Other", None),
];

const SERVICES_V2_UPGRADE: &[(&str, Option<&str>)] = &[
    ("AnimeLab", Some("https://www.animelab.com")),
    ("Crunchyroll", Some("https://www.crunchyroll.com")),
    ("Funimation", Some("https://www.funimation.com")),
    ("HiDive", Some("https://www.hidive.com")),
    ("Netflix", Some("https://www.netflix.com")),
];

const CONTENT_STATUSES_V3: &[&str] = &["Completed", "Dropped", "Queue"];

/// Seeds the lookup tables for one schema version.
///
/// Every insert is `ON CONFLICT (name) DO NOTHING`, so re-running a seed
/// against an already-populated database changes nothing.
#[derive(Clone, Copy)]
pub(crate) struct LookupSeed {
    genres: &'static [&'static str],
    services: &'static [(&'static str, Option<&'static str>)],
    content_statuses: &'static [&'static str],
}

impl LookupSeed {
    pub(crate) fn v2_create() -> Self {
        Self {
            genres: GENRES_V2,
            services: SERVICES_V2,
            content_statuses: &[],
        }
    }

    pub(crate) fn v2_upgrade() -> Self {
        Self {
            genres: GENRES_V2_EXPANDED,
            services: SERVICES_V2_UPGRADE,
            content_statuses: &[],
        }
    }

    pub(crate) fn v3_create() -> Self {
        Self {
            content_statuses: CONTENT_STATUSES_V3,
            ..Self::v2_create()
        }
    }

    pub(crate) async fn seed(&self, session: &mut MigrationSession) -> Result<(), StepError> {
        info!("seeding lookup tables");

        for genre in self.genres {
            session
                .execute(
                    "INSERT INTO genre (name) VALUES ($1) ON CONFLICT (name) DO NOTHING",
                    &[genre],
                )
                .await?;
        }

        for (name, domain_url) in self.services {
            session
                .execute(
                    "INSERT INTO stream_service (name, domain_url) VALUES ($1, $2) \
                     ON CONFLICT (name) DO NOTHING",
                    &[name, domain_url],
                )
                .await?;
        }

        for status in self.content_statuses {
            session
                .execute(
                    "INSERT INTO content_status (name) VALUES ($1) \
                     ON CONFLICT (name) DO NOTHING",
                    &[status],
                )
                .await?;
        }

        Ok(())
    }
}

/// Creation-time lookup seeding step.
pub struct LookupSeedStep {
    seed: LookupSeed,
}

impl LookupSeedStep {
    /// The step registered for the `0 -> 2` transition.
    pub fn v2() -> Self {
        Self {
            seed: LookupSeed::v2_create(),
        }
    }

    /// The step registered for the `0 -> 3` transition.
    pub fn v3() -> Self {
        Self {
            seed: LookupSeed::v3_create(),
        }
    }

    /// The step registered for the `2 -> 3` transition, which only adds the
    /// content-status lookup.
    pub fn content_statuses() -> Self {
        Self {
            seed: LookupSeed {
                genres: &[],
                services: &[],
                content_statuses: CONTENT_STATUSES_V3,
            },
        }
    }
}

#[async_trait]
impl PopulationStep for LookupSeedStep {
    async fn populate(&self, session: &mut MigrationSession) -> Result<(), StepError> {
        self.seed.seed(session).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_v3_extends_v2() {
        let v2 = LookupSeed::v2_create();
        let v3 = LookupSeed::v3_create();
        assert_eq!(v2.genres, v3.genres);
        assert_eq!(v2.services, v3.services);
        assert!(v2.content_statuses.is_empty());
        assert_eq!(v3.content_statuses, CONTENT_STATUSES_V3);
    }

    #[test]
    fn test_upgrade_list_is_expanded() {
        let create = LookupSeed::v2_create();
        let upgrade = LookupSeed::v2_upgrade();
        assert!(upgrade.genres.len() > create.genres.len());
        for genre in create.genres {
            assert!(
                upgrade.genres.contains(genre),
                "creation genre '{genre}' missing from the upgrade list"
            );
        }
    }
}
