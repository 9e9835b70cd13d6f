//! Legacy row migration for the `1 -> 2` transition.
//!
//! Version 1 stored one denormalized row per series: free-text service and
//! genre fields, a season count, and a running episode total. The v1 -> v2
//! upgrade schema renames that table to `anime_old`; this step then moves
//! every row into the normalized schema, resolving the free-text fields
//! against the lookup tables and optionally reconstructing seasons, episodes,
//! and watch history from an external metadata source.

use std::sync::Arc;

use anitrack_postgres::MigrationSession;
use async_trait::async_trait;
use chrono::NaiveDate;
use tracing::{debug, info, warn};

use crate::error::StepError;
use crate::populate::PopulationStep;
use crate::steps::lookup::LookupSeed;
use crate::steps::metadata::{MetadataProvider, SeriesRecord};
use crate::steps::text::{sanitise_text_common, strip_numbered_qualifiers, strip_text};

/// One row of the version-1 `anime_old` table.
#[derive(Debug)]
struct LegacyRow {
    id: i32,
    name: String,
    seasons: i32,
    episodes: i32,
    times_watched: i32,
    service: Option<String>,
    watch_date: Option<NaiveDate>,
    genres: Option<String>,
}

/// Whether a metadata title resolves to the same series key.
///
/// Sources title each season separately (`... Season 2`), so the comparison
/// drops numbered qualifiers from both sides.
fn title_matches(title: &str, key: &str) -> bool {
    let cleaned = strip_numbered_qualifiers(&strip_text(title));
    cleaned == key || cleaned == strip_numbered_qualifiers(key)
}

/// The `v1_to_v2_upgrade_populate` step.
///
/// Seeds the expanded v2 lookup lists, migrates every `anime_old` row into
/// the normalized schema, and finally drops `anime_old`. When a
/// [`MetadataProvider`] is supplied, each migrated series is enriched with
/// its seasons, episodes, and reconstructed watch history; without one the
/// rows are migrated with lookup references only.
pub struct LegacyAnimeMigration {
    provider: Option<Arc<dyn MetadataProvider>>,
}

impl LegacyAnimeMigration {
    /// Create the step, optionally with a metadata source for enrichment.
    pub fn new(provider: Option<Arc<dyn MetadataProvider>>) -> Self {
        Self { provider }
    }

    /// Fetch the next unmigrated legacy row.
    ///
    /// Rows are deleted as they are migrated, so fetching one at a time by
    /// lowest id walks the whole table.
    async fn next_row(&self, session: &mut MigrationSession) -> Result<Option<LegacyRow>, StepError> {
        let row = session
            .query_opt(
                "SELECT id, name, season, episode, times_watched, service, watch_date, genres \
                 FROM anime_old ORDER BY id LIMIT 1",
                &[],
            )
            .await?;

        Ok(row.map(|r| LegacyRow {
            id: r.get(0),
            name: r.get(1),
            seasons: r.get(2),
            episodes: r.get(3),
            times_watched: r.get(4),
            service: r.get(5),
            watch_date: r.get(6),
            genres: r.get(7),
        }))
    }

    /// Insert the series if it is not present yet; return its id either way.
    async fn add_anime(
        &self,
        session: &mut MigrationSession,
        name: &str,
        display_name: &str,
    ) -> Result<i32, StepError> {
        let existing = session
            .query_opt("SELECT id FROM anime WHERE name = $1 LIMIT 1", &[&name])
            .await?;
        if let Some(row) = existing {
            return Ok(row.get(0));
        }

        debug!(display_name, "adding anime");
        let row = session
            .query_one(
                "INSERT INTO anime (name, display_name) VALUES ($1, $2) RETURNING id",
                &[&name, &display_name],
            )
            .await?;
        Ok(row.get(0))
    }

    /// Link the series to a stream service by name.
    ///
    /// An unknown service is logged and skipped rather than failing the
    /// migration; the lookup lists cover every service the v1 data used.
    async fn add_service(
        &self,
        session: &mut MigrationSession,
        anime_id: i32,
        service: &str,
    ) -> Result<(), StepError> {
        let row = session
            .query_opt("SELECT id FROM stream_service WHERE name = $1", &[&service])
            .await?;
        let Some(row) = row else {
            warn!(service, "service not found in the stream_service table");
            return Ok(());
        };

        let service_id: i32 = row.get(0);
        session
            .execute(
                "INSERT INTO anime_stream_service (anime_id, stream_service_id) VALUES ($1, $2) \
                 ON CONFLICT (anime_id, stream_service_id) DO NOTHING",
                &[&anime_id, &service_id],
            )
            .await?;
        Ok(())
    }

    /// Link the series to a genre by name.
    async fn add_genre(
        &self,
        session: &mut MigrationSession,
        anime_id: i32,
        genre: &str,
    ) -> Result<(), StepError> {
        // The v1 data spelled this one without the hyphen.
        let genre = if genre == "Sci Fi" { "Sci-Fi" } else { genre };

        let row = session
            .query_opt("SELECT id FROM genre WHERE name = $1", &[&genre])
            .await?;
        let Some(row) = row else {
            warn!(genre, "genre not found in the genre table");
            return Ok(());
        };

        let genre_id: i32 = row.get(0);
        session
            .execute(
                "INSERT INTO anime_genre (anime_id, genre_id) VALUES ($1, $2) \
                 ON CONFLICT (anime_id, genre_id) DO NOTHING",
                &[&anime_id, &genre_id],
            )
            .await?;
        Ok(())
    }

    /// Resolve the free-text service and genre fields into join-table rows.
    async fn convert_to_lookup_references(
        &self,
        session: &mut MigrationSession,
        anime_id: i32,
        service: Option<&str>,
        genres_text: Option<&str>,
    ) -> Result<(), StepError> {
        if let Some(service) = service {
            if !service.is_empty() {
                self.add_service(session, anime_id, service).await?;
            }
        }

        if let Some(genres_text) = genres_text {
            for genre in genres_text.split(", ").filter(|g| !g.is_empty()) {
                self.add_genre(session, anime_id, genre).await?;
            }
        }

        Ok(())
    }

    /// Insert a season from a metadata record; return its id.
    async fn add_season(
        &self,
        session: &mut MigrationSession,
        anime_id: i32,
        record: &SeriesRecord,
        number: i32,
    ) -> Result<i32, StepError> {
        for genre in &record.genres {
            self.add_genre(session, anime_id, genre).await?;
        }

        let existing = session
            .query_opt(
                "SELECT id FROM season WHERE anime_id = $1 AND number = $2",
                &[&anime_id, &number],
            )
            .await?;
        if let Some(row) = existing {
            return Ok(row.get(0));
        }

        debug!(anime_id, number, "adding season");
        let row = session
            .query_one(
                "INSERT INTO season (number, anime_id, source_url, thumbnail_url, source_id, \
                 episode_count, ep_duration, summary) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING id",
                &[
                    &number,
                    &anime_id,
                    &record.url,
                    &record.thumbnail_url,
                    &record.source_id,
                    &record.episode_count,
                    &record.episode_duration_min,
                    &record.synopsis,
                ],
            )
            .await?;
        let season_id: i32 = row.get(0);

        if record.episode_count == 0 {
            warn!(anime_id, number, "no episode data available for season");
            return Ok(season_id);
        }

        debug!(season_id, count = record.episode_count, "adding episodes");
        for ep_num in 1..=record.episode_count {
            session
                .execute(
                    "INSERT INTO episode (anime_id, season_id, number) VALUES ($1, $2, $3) \
                     ON CONFLICT (season_id, number) DO NOTHING",
                    &[&anime_id, &season_id, &ep_num],
                )
                .await?;
        }

        Ok(season_id)
    }

    /// Reconstruct seasons, episodes, and watch history from metadata.
    async fn enrich_from_metadata(
        &self,
        session: &mut MigrationSession,
        provider: &Arc<dyn MetadataProvider>,
        anime_id: i32,
        display_name: &str,
        key: &str,
        legacy: &LegacyRow,
    ) -> Result<(), StepError> {
        debug!(key, "querying metadata source for series");
        let records = provider.search_series(key).await?;
        let matched: Vec<SeriesRecord> = records
            .into_iter()
            .filter(|r| r.released && r.titles.iter().any(|t| title_matches(t, key)))
            .collect();

        if matched.is_empty() {
            return Err(format!("no matching series found for '{display_name}'").into());
        }
        if matched.len() < legacy.seasons as usize {
            warn!(
                display_name,
                recorded = legacy.seasons,
                found = matched.len(),
                "more recorded seasons than metadata results, skipping enrichment"
            );
            return Ok(());
        }

        let mut remaining_eps = legacy.episodes;
        for (i, record) in matched.iter().take(legacy.seasons as usize).enumerate() {
            let season_id = self
                .add_season(session, anime_id, record, (i + 1) as i32)
                .await?;

            for licensor in &record.licensors {
                if !licensor.is_empty() {
                    self.add_service(session, anime_id, licensor).await?;
                }
            }

            let watched = record.episode_count.min(remaining_eps);
            if watched <= 0 {
                continue;
            }

            let completion =
                ((watched as f32 / record.episode_count as f32) * 100.0).round() / 100.0;
            for _ in 0..legacy.times_watched {
                session
                    .execute(
                        "INSERT INTO watch_history (anime_id, season_id, date, eps_watched, \
                         completion_percentage) VALUES ($1, $2, $3, $4, $5)",
                        &[&anime_id, &season_id, &legacy.watch_date, &watched, &completion],
                    )
                    .await?;
            }
            remaining_eps -= watched;
        }

        Ok(())
    }

    /// Migrate one legacy row, then remove it from `anime_old`.
    async fn migrate_row(
        &self,
        session: &mut MigrationSession,
        legacy: LegacyRow,
    ) -> Result<(), StepError> {
        let display_name = legacy.name.clone();
        let name = sanitise_text_common(&display_name);

        let anime_id = self.add_anime(session, &name, &display_name).await?;
        debug!(anime_id, name = %name, "updating records related to anime");

        self.convert_to_lookup_references(
            session,
            anime_id,
            legacy.service.as_deref(),
            legacy.genres.as_deref(),
        )
        .await?;

        if let Some(provider) = &self.provider {
            self.enrich_from_metadata(session, provider, anime_id, &display_name, &name, &legacy)
                .await?;
        }

        session
            .execute("DELETE FROM anime_old WHERE id = $1", &[&legacy.id])
            .await?;
        info!(anime = %display_name, "migrated and removed from anime_old");
        Ok(())
    }
}

#[async_trait]
impl PopulationStep for LegacyAnimeMigration {
    async fn populate(&self, session: &mut MigrationSession) -> Result<(), StepError> {
        info!("seeding lookup tables for the v2 schema");
        LookupSeed::v2_upgrade().seed(session).await?;

        info!("starting data transformation for the anime table");
        while let Some(row) = self.next_row(session).await? {
            self.migrate_row(session, row).await?;
        }

        session.batch_execute("DROP TABLE IF EXISTS anime_old").await?;
        info!("legacy anime table migrated and dropped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_matches_exact_key() {
        assert!(title_matches("Attack on Titan", "attack_on_titan"));
        assert!(!title_matches("Attack on Titan", "one_piece"));
    }

    #[test]
    fn test_title_matches_drops_season_qualifier() {
        assert!(title_matches("My Hero Academia Season 2", "my_hero_academia"));
        assert!(title_matches("Re:Zero Part 2", "re_zero"));
    }

    #[test]
    fn test_title_matches_qualified_key() {
        assert!(title_matches("Overlord", "overlord_season_3"));
    }
}
