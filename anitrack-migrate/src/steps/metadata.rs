//! Metadata lookup collaborator for population steps.
//!
//! The engine treats metadata enrichment as an external concern: the HTTP
//! client that talks to an anime-metadata API lives in the surrounding
//! application and is injected here behind a trait. Whatever a provider
//! raises is carried through as an opaque step error.

use async_trait::async_trait;

use crate::error::StepError;

/// One season-level record returned by a metadata source.
#[derive(Debug, Clone)]
pub struct SeriesRecord {
    /// All known titles (original, English, synonyms).
    pub titles: Vec<String>,
    /// Canonical page URL at the source.
    pub url: String,
    /// The source's own identifier.
    pub source_id: i32,
    /// Cover image URL.
    pub thumbnail_url: Option<String>,
    /// Number of episodes in this season. Zero when unknown.
    pub episode_count: i32,
    /// Episode duration in minutes.
    pub episode_duration_min: Option<i32>,
    /// Synopsis text.
    pub synopsis: Option<String>,
    /// Genre and theme names.
    pub genres: Vec<String>,
    /// Licensor names (usable as stream services).
    pub licensors: Vec<String>,
    /// Whether the season has aired; unaired entries are never matched.
    pub released: bool,
}

/// External anime-metadata source.
#[async_trait]
pub trait MetadataProvider: Send + Sync {
    /// Search the source for all seasons of a series, ordered by start
    /// date. `title` is a sanitised comparison key; providers should widen
    /// it back to a plain-text query as needed.
    async fn search_series(&self, title: &str) -> Result<Vec<SeriesRecord>, StepError>;
}
