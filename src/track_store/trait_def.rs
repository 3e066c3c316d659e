//! TrackStore trait definition.

use super::models::{InsertOutcome, NewTrack, TrackRecord};
use crate::enrichment::Enrichment;
use crate::tagging::CategorizedTags;
use anyhow::Result;

/// Trait for track storage backends.
pub trait TrackStore: Send + Sync {
    // =========================================================================
    // Tracks
    // =========================================================================

    /// Insert a track unless one with the same (name, artist) exists.
    fn insert_or_skip(&self, track: &NewTrack) -> Result<InsertOutcome>;

    /// Id of the track with exactly this (name, artist), if any.
    fn find_by_name_artist(&self, name: &str, artist: &str) -> Result<Option<i64>>;

    fn get(&self, id: i64) -> Result<Option<TrackRecord>>;

    /// Every track, ordered by id.
    fn list_all(&self) -> Result<Vec<TrackRecord>>;

    fn count(&self) -> Result<usize>;

    /// Delete a track. Returns false when it did not exist.
    fn delete(&self, id: i64) -> Result<bool>;

    // =========================================================================
    // Generated tags
    // =========================================================================

    /// Replace a track's tags. An empty set is stored as no tags.
    /// Returns false when the track does not exist.
    fn update_generated_tags(&self, id: i64, tags: &CategorizedTags) -> Result<bool>;

    /// Replace the stored lookup result. An empty one is stored as none.
    fn update_enrichment(&self, id: i64, enrichment: &Enrichment) -> Result<bool>;

    /// Clear tags of one track, or of every track when `id` is `None`.
    /// Returns the number of tracks touched.
    fn clear_generated_tags(&self, id: Option<i64>) -> Result<usize>;

    // =========================================================================
    // Settings
    // =========================================================================

    /// The stored tag limit, or the default when never set.
    fn get_tag_limit(&self) -> Result<u32>;

    fn set_tag_limit(&self, limit: u32) -> Result<()>;
}
