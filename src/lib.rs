//! Tag Genius Library
//!
//! Imports a DJ library file, tags every track through an enrichment lookup
//! and a text generation service, and exports the tagged library back.

pub mod config;
pub mod enrichment;
pub mod library_xml;
pub mod llm;
pub mod pipeline;
pub mod resilience;
pub mod sqlite_persistence;
pub mod tagging;
pub mod track_store;

// Re-export commonly used types for convenience
pub use pipeline::{export_library, ExportOutcome, ImportReport, Pipeline, RetagReport};
pub use tagging::{CategorizedTags, TagCategory, TagGenerator, TaggingConfig};
pub use track_store::{SqliteTrackStore, TrackStore};
