//! Data models for the track store.

use crate::enrichment::Enrichment;
use crate::library_xml::{OriginalMetadata, TrackAttributes};
use crate::tagging::CategorizedTags;

/// A track ready to be inserted.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTrack {
    pub name: String,
    pub artist: String,
    pub bpm: Option<f64>,
    pub key: Option<String>,
    pub genre: Option<String>,
    pub label: Option<String>,
    pub comments: Option<String>,
    pub grouping: Option<String>,
    pub original_metadata: OriginalMetadata,
    /// Comma-joined `TAGS/TAG` names from the library file.
    pub legacy_tags: Option<String>,
    /// First lookup candidate; empty when the lookup found nothing.
    pub enrichment: Enrichment,
    pub generated_tags: CategorizedTags,
}

impl NewTrack {
    /// Build from parsed attributes. `None` when name or artist is missing.
    pub fn from_attributes(
        track: &TrackAttributes,
        enrichment: Enrichment,
        generated_tags: CategorizedTags,
    ) -> Option<Self> {
        let metadata = &track.metadata;
        Some(Self {
            name: track.name()?.to_string(),
            artist: track.artist()?.to_string(),
            bpm: metadata.bpm(),
            key: metadata.tonality.clone(),
            genre: metadata.genre.clone(),
            label: metadata.label.clone(),
            comments: metadata.comments.clone(),
            grouping: metadata.grouping.clone(),
            original_metadata: metadata.clone(),
            legacy_tags: track.legacy_tags.clone(),
            enrichment,
            generated_tags,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted(i64),
    /// A record with the same (name, artist) already exists; nothing was written.
    Duplicate,
}

/// A persisted track.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackRecord {
    pub id: i64,
    pub name: String,
    pub artist: String,
    pub bpm: Option<f64>,
    pub key: Option<String>,
    pub genre: Option<String>,
    pub label: Option<String>,
    pub comments: Option<String>,
    pub grouping: Option<String>,
    /// `None` until tags were generated, or after they were cleared.
    pub generated_tags: Option<CategorizedTags>,
    /// The attribute snapshot exactly as stored.
    pub original_metadata_json: String,
    pub legacy_tags: Option<String>,
    /// `None` when no lookup ever returned anything for this track.
    pub enrichment: Option<Enrichment>,
    pub created_at: i64,
}

impl TrackRecord {
    pub fn original_metadata(&self) -> Result<OriginalMetadata, serde_json::Error> {
        serde_json::from_str(&self.original_metadata_json)
    }

    /// The track as it was read from the library file.
    pub fn attributes(&self) -> Result<TrackAttributes, serde_json::Error> {
        Ok(TrackAttributes {
            metadata: self.original_metadata()?,
            legacy_tags: self.legacy_tags.clone(),
        })
    }

    /// The record's tags, or an empty set when it has none.
    pub fn tags(&self) -> CategorizedTags {
        self.generated_tags.clone().unwrap_or_default()
    }
}
