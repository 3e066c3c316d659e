//! Round-trip export of the stored library.

use crate::library_xml::{merge_generated_tags, write_library, OriginalMetadata};
use crate::track_store::TrackStore;
use anyhow::{Context, Result};
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct ExportOutcome {
    pub xml: String,
    pub exported: usize,
    /// Records left out because their attribute snapshot was unusable.
    pub skipped: usize,
}

/// Rebuild a library document from every stored track, in id order.
///
/// Each track is written from its original attribute snapshot with the
/// generated tags merged into Grouping and Comments.
pub fn export_library(store: &dyn TrackStore) -> Result<ExportOutcome> {
    let records = store.list_all().context("Failed to read tracks for export")?;

    let mut skipped = 0;
    let mut tracks: Vec<OriginalMetadata> = Vec::with_capacity(records.len());
    for record in &records {
        match record.original_metadata() {
            Ok(metadata) if !metadata.is_empty() => {
                tracks.push(merge_generated_tags(&metadata, &record.tags()));
            }
            Ok(_) => {
                warn!(id = record.id, "Skipping track with empty attribute snapshot");
                skipped += 1;
            }
            Err(e) => {
                warn!(id = record.id, error = %e, "Skipping track with corrupt attribute snapshot");
                skipped += 1;
            }
        }
    }

    let xml = write_library(&tracks);
    info!(exported = tracks.len(), skipped, "Export finished");
    Ok(ExportOutcome {
        xml,
        exported: tracks.len(),
        skipped,
    })
}
