//! The DJ library interchange format: parsing on import, writing on export.

mod models;
mod parser;
mod writer;

pub use models::{OriginalMetadata, TrackAttributes, TRACK_ATTRIBUTE_ORDER};
pub use parser::{parse_library_bytes, LibraryDocument, LibraryXmlError};
pub use writer::{escape_attribute, merge_generated_tags, write_library};
