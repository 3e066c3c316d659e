//! Library import and tag regeneration.

use super::{Pipeline, TaggedTrack, TrackWork};
use crate::library_xml::parse_library_bytes;
use crate::tagging::TaggingConfig;
use crate::track_store::{InsertOutcome, NewTrack, TrackRecord};
use anyhow::{bail, Context, Result};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use tracing::{debug, info, warn};

/// What happened to each track of an imported file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    /// Track records the parser produced.
    pub parsed: usize,
    pub imported: usize,
    pub duplicates: usize,
    /// Tracks lacking a name or an artist.
    pub skipped_missing_key: usize,
    pub failed: usize,
}

impl fmt::Display for ImportReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "parsed {}, imported {}, duplicates {}, skipped (missing name/artist) {}, failed {}",
            self.parsed, self.imported, self.duplicates, self.skipped_missing_key, self.failed
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RetagReport {
    pub processed: usize,
    pub retagged: usize,
    /// Tracks for which no tags came back; their previous tags are kept.
    pub unchanged: usize,
    pub failed: usize,
}

impl fmt::Display for RetagReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "processed {}, retagged {}, unchanged {}, failed {}",
            self.processed, self.retagged, self.unchanged, self.failed
        )
    }
}

impl Pipeline {
    /// Import every track of a library file.
    ///
    /// A file that cannot be parsed fails the whole import before anything
    /// is written. Per-track problems are counted in the report and never
    /// stop the batch; tracks already written stay written.
    pub async fn import_library(&self, bytes: &[u8], config: &TaggingConfig) -> Result<ImportReport> {
        let document = parse_library_bytes(bytes).context("Failed to parse library file")?;
        if let Some(entries) = document.declared_entries() {
            debug!(entries, "Library declares collection size");
        }

        let mut report = ImportReport::default();
        let mut queued: HashSet<(String, String)> = HashSet::new();
        let mut work = Vec::new();

        for track in document.tracks() {
            report.parsed += 1;
            let (Some(name), Some(artist)) = (track.name(), track.artist()) else {
                warn!(
                    name = track.name().unwrap_or_default(),
                    artist = track.artist().unwrap_or_default(),
                    "Skipping track without name or artist"
                );
                report.skipped_missing_key += 1;
                continue;
            };

            let key = (name.to_string(), artist.to_string());
            if queued.contains(&key) {
                debug!(name, artist, "Skipping repeated track in file");
                report.duplicates += 1;
                continue;
            }
            match self.store.find_by_name_artist(name, artist) {
                Ok(Some(id)) => {
                    debug!(name, artist, id, "Skipping track already in library");
                    report.duplicates += 1;
                    continue;
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(name, artist, error = %e, "Duplicate check failed");
                    report.failed += 1;
                    continue;
                }
            }

            queued.insert(key);
            work.push(TrackWork::new(track));
        }

        info!(
            parsed = report.parsed,
            queued = work.len(),
            "Starting enrichment and tagging"
        );

        let mut results = stream::iter(work)
            .map(|unit| unit.run(self.enrichment.as_ref(), &self.generator, config))
            .buffered(self.concurrency);

        while let Some(TaggedTrack {
            track,
            enrichment,
            tags,
        }) = results.next().await
        {
            let Some(new_track) = NewTrack::from_attributes(&track, enrichment, tags) else {
                report.skipped_missing_key += 1;
                continue;
            };
            match self.store.insert_or_skip(&new_track) {
                Ok(InsertOutcome::Inserted(id)) => {
                    debug!(
                        id,
                        name = %new_track.name,
                        artist = %new_track.artist,
                        tags = new_track.generated_tags.count(),
                        "Imported track"
                    );
                    report.imported += 1;
                }
                Ok(InsertOutcome::Duplicate) => {
                    debug!(
                        name = %new_track.name,
                        artist = %new_track.artist,
                        "Track appeared in library during import"
                    );
                    report.duplicates += 1;
                }
                Err(e) => {
                    warn!(
                        name = %new_track.name,
                        artist = %new_track.artist,
                        error = ?e,
                        "Failed to store track"
                    );
                    report.failed += 1;
                }
            }
        }

        info!(
            parsed = report.parsed,
            imported = report.imported,
            duplicates = report.duplicates,
            skipped_missing_key = report.skipped_missing_key,
            failed = report.failed,
            "Import finished"
        );
        Ok(report)
    }

    /// Regenerate tags, with fresh enrichment, for one track or all of them.
    pub async fn retag(&self, id: Option<i64>, config: &TaggingConfig) -> Result<RetagReport> {
        let records: Vec<TrackRecord> = match id {
            Some(id) => match self.store.get(id)? {
                Some(record) => vec![record],
                None => bail!("Track {} not found", id),
            },
            None => self.store.list_all()?,
        };

        let mut report = RetagReport::default();
        let mut work = Vec::with_capacity(records.len());
        for record in records {
            report.processed += 1;
            match record.attributes() {
                Ok(attributes) => work.push((record.id, TrackWork::new(attributes))),
                Err(e) => {
                    warn!(id = record.id, error = %e, "Cannot retag track with corrupt metadata");
                    report.failed += 1;
                }
            }
        }

        let mut results = stream::iter(work)
            .map(|(id, unit)| async move {
                (
                    id,
                    unit.run(self.enrichment.as_ref(), &self.generator, config)
                        .await,
                )
            })
            .buffered(self.concurrency);

        while let Some((id, tagged)) = results.next().await {
            if !tagged.enrichment.is_empty() {
                if let Err(e) = self.store.update_enrichment(id, &tagged.enrichment) {
                    warn!(id, error = ?e, "Failed to store enrichment");
                }
            }
            if tagged.tags.is_empty() {
                debug!(id, "No tags generated, keeping previous tags");
                report.unchanged += 1;
                continue;
            }
            match self.store.update_generated_tags(id, &tagged.tags) {
                Ok(true) => report.retagged += 1,
                Ok(false) => {
                    warn!(id, "Track disappeared before its tags were stored");
                    report.failed += 1;
                }
                Err(e) => {
                    warn!(id, error = ?e, "Failed to store tags");
                    report.failed += 1;
                }
            }
        }

        info!(
            processed = report.processed,
            retagged = report.retagged,
            unchanged = report.unchanged,
            failed = report.failed,
            "Retag finished"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enrichment::NoopEnrichment;
    use crate::tagging::{CategorizedTags, MockTagBackend, TagCategory, TagGenerator};
    use crate::track_store::{SqliteTrackStore, TrackStore};
    use std::sync::Arc;
    use tempfile::TempDir;

    const LIBRARY: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<DJ_PLAYLISTS Version="1.0.0">
  <COLLECTION Entries="4">
    <TRACK TrackID="1" Name="Floorshow" Artist="Surgeon" AverageBpm="138.00"/>
    <TRACK TrackID="2" Artist="No Title"/>
    <TRACK TrackID="3" Name="Spastik" Artist="Plastikman" Tonality="Am"/>
    <TRACK TrackID="4" Name="Floorshow" Artist="Surgeon"/>
  </COLLECTION>
</DJ_PLAYLISTS>"#;

    fn pipeline() -> (Pipeline, Arc<SqliteTrackStore>, TempDir) {
        let tmp = TempDir::new().unwrap();
        let store = Arc::new(SqliteTrackStore::new(tmp.path().join("tracks.db")).unwrap());
        let pipeline = Pipeline::new(
            store.clone(),
            Arc::new(NoopEnrichment),
            TagGenerator::mock(),
            2,
        );
        (pipeline, store, tmp)
    }

    #[tokio::test]
    async fn test_import_counts_every_outcome() {
        let (pipeline, store, _tmp) = pipeline();
        let report = pipeline
            .import_library(LIBRARY.as_bytes(), &TaggingConfig::default())
            .await
            .unwrap();

        assert_eq!(
            report,
            ImportReport {
                parsed: 4,
                imported: 2,
                duplicates: 1,
                skipped_missing_key: 1,
                failed: 0,
            }
        );
        assert_eq!(store.count().unwrap(), 2);

        let records = store.list_all().unwrap();
        assert_eq!(records[0].name, "Floorshow");
        assert_eq!(records[1].name, "Spastik");
        assert_eq!(records[0].generated_tags, Some(MockTagBackend::tags()));
    }

    #[tokio::test]
    async fn test_reimport_is_idempotent() {
        let (pipeline, store, _tmp) = pipeline();
        let config = TaggingConfig::default();
        pipeline.import_library(LIBRARY.as_bytes(), &config).await.unwrap();
        let second = pipeline.import_library(LIBRARY.as_bytes(), &config).await.unwrap();

        assert_eq!(second.imported, 0);
        assert_eq!(second.duplicates, 3);
        assert_eq!(store.count().unwrap(), 2);
    }

    #[tokio::test]
    async fn test_malformed_file_persists_nothing() {
        let (pipeline, store, _tmp) = pipeline();
        let err = pipeline
            .import_library(b"definitely not xml", &TaggingConfig::default())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Failed to parse library file"));
        assert_eq!(store.count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_retag_overwrites_tags() {
        let (pipeline, store, _tmp) = pipeline();
        pipeline
            .import_library(LIBRARY.as_bytes(), &TaggingConfig::default())
            .await
            .unwrap();
        let id = store.find_by_name_artist("Spastik", "Plastikman").unwrap().unwrap();
        let custom = CategorizedTags::from_pairs([(TagCategory::PrimaryGenre, ["minimal"])]);
        store.update_generated_tags(id, &custom).unwrap();

        let report = pipeline
            .retag(Some(id), &TaggingConfig::default())
            .await
            .unwrap();
        assert_eq!(report.retagged, 1);
        assert_eq!(
            store.get(id).unwrap().unwrap().generated_tags,
            Some(MockTagBackend::tags())
        );

        assert!(pipeline
            .retag(Some(id + 1000), &TaggingConfig::default())
            .await
            .is_err());
    }
}
