//! Reading DJ library interchange documents.

use super::models::{OriginalMetadata, TrackAttributes};
use roxmltree::{Document, Node};
use thiserror::Error;
use tracing::debug;

const COLLECTION_TAG: &str = "COLLECTION";
const TRACK_TAG: &str = "TRACK";
const LEGACY_TAGS_TAG: &str = "TAGS";
const LEGACY_TAG_TAG: &str = "TAG";

#[derive(Debug, Error)]
pub enum LibraryXmlError {
    #[error("Library file is not valid UTF-8: {0}")]
    NotUtf8(#[from] std::str::Utf8Error),

    #[error("Library file is not well-formed XML: {0}")]
    Malformed(#[from] roxmltree::Error),

    #[error("Library file has no COLLECTION element")]
    MissingCollection,
}

/// A parsed library document.
///
/// Parsing is all-or-nothing: a document that is not well-formed, or that
/// has no collection, is rejected before any track is handed out.
pub struct LibraryDocument<'input> {
    doc: Document<'input>,
}

impl<'input> LibraryDocument<'input> {
    pub fn parse(xml: &'input str) -> Result<Self, LibraryXmlError> {
        let doc = Document::parse(xml)?;
        if find_collection(&doc).is_none() {
            return Err(LibraryXmlError::MissingCollection);
        }
        Ok(Self { doc })
    }

    /// The `Entries` count the collection declares, if any.
    pub fn declared_entries(&self) -> Option<usize> {
        find_collection(&self.doc)
            .and_then(|c| c.attribute("Entries"))
            .and_then(|e| e.trim().parse().ok())
    }

    /// Single pass over the collection's tracks.
    ///
    /// Tracks with neither a Name nor an Artist are skipped.
    pub fn tracks(&self) -> impl Iterator<Item = TrackAttributes> + '_ {
        find_collection(&self.doc)
            .into_iter()
            .flat_map(|collection| collection.children())
            .filter(|node| node.has_tag_name(TRACK_TAG))
            .filter_map(|node| {
                let track = read_track(node);
                if track.name().is_none() && track.artist().is_none() {
                    debug!(
                        track_id = ?track.metadata.track_id,
                        "Skipping track with neither Name nor Artist"
                    );
                    return None;
                }
                Some(track)
            })
    }
}

/// Parse raw file bytes, rejecting anything that is not UTF-8.
pub fn parse_library_bytes(bytes: &[u8]) -> Result<LibraryDocument<'_>, LibraryXmlError> {
    let xml = std::str::from_utf8(bytes)?;
    LibraryDocument::parse(xml)
}

fn find_collection<'a, 'input>(doc: &'a Document<'input>) -> Option<Node<'a, 'input>> {
    doc.root_element()
        .descendants()
        .find(|node| node.has_tag_name(COLLECTION_TAG))
}

fn read_track(node: Node<'_, '_>) -> TrackAttributes {
    let mut metadata = OriginalMetadata::default();
    for attribute in node.attributes() {
        metadata.set(attribute.name(), attribute.value());
    }

    let legacy: Vec<&str> = node
        .children()
        .filter(|child| child.has_tag_name(LEGACY_TAGS_TAG))
        .flat_map(|tags| tags.children())
        .filter(|child| child.has_tag_name(LEGACY_TAG_TAG))
        .filter_map(|tag| tag.attribute("NAME"))
        .collect();

    TrackAttributes {
        metadata,
        legacy_tags: if legacy.is_empty() {
            None
        } else {
            Some(legacy.join(", "))
        },
    }
}
