//! Attribute records for tracks in the DJ library interchange format.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Native attribute order of a `TRACK` element as written by DJ software.
///
/// The writer emits known attributes in this order so exported files diff
/// cleanly against the originals.
pub const TRACK_ATTRIBUTE_ORDER: &[&str] = &[
    "TrackID",
    "Name",
    "Artist",
    "Composer",
    "Album",
    "Grouping",
    "Genre",
    "Kind",
    "Size",
    "TotalTime",
    "DiscNumber",
    "TrackNumber",
    "Year",
    "AverageBpm",
    "DateModified",
    "DateAdded",
    "BitRate",
    "SampleRate",
    "Comments",
    "PlayCount",
    "LastPlayed",
    "Rating",
    "Location",
    "Remixer",
    "Tonality",
    "Label",
    "Mix",
    "Colour",
];

/// Snapshot of every attribute a `TRACK` element carried at import time.
///
/// The attributes the pipeline reads are named fields; everything else lands
/// in `extra`. Values are the raw attribute strings, never normalized, so
/// the snapshot can be written back byte-identical. Serialized as one flat
/// JSON object keyed by attribute name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OriginalMetadata {
    #[serde(rename = "Name", default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "Artist", default, skip_serializing_if = "Option::is_none")]
    pub artist: Option<String>,
    #[serde(rename = "AverageBpm", default, skip_serializing_if = "Option::is_none")]
    pub average_bpm: Option<String>,
    #[serde(rename = "Tonality", default, skip_serializing_if = "Option::is_none")]
    pub tonality: Option<String>,
    #[serde(rename = "Genre", default, skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,
    #[serde(rename = "Label", default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(rename = "Comments", default, skip_serializing_if = "Option::is_none")]
    pub comments: Option<String>,
    #[serde(rename = "Grouping", default, skip_serializing_if = "Option::is_none")]
    pub grouping: Option<String>,
    #[serde(rename = "TrackID", default, skip_serializing_if = "Option::is_none")]
    pub track_id: Option<String>,
    #[serde(rename = "Location", default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(rename = "Year", default, skip_serializing_if = "Option::is_none")]
    pub year: Option<String>,
    /// Attributes the pipeline does not model.
    #[serde(flatten)]
    pub extra: BTreeMap<String, String>,
}

impl OriginalMetadata {
    /// Route one raw attribute into its named field or the extension map.
    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        match key {
            "Name" => self.name = Some(value),
            "Artist" => self.artist = Some(value),
            "AverageBpm" => self.average_bpm = Some(value),
            "Tonality" => self.tonality = Some(value),
            "Genre" => self.genre = Some(value),
            "Label" => self.label = Some(value),
            "Comments" => self.comments = Some(value),
            "Grouping" => self.grouping = Some(value),
            "TrackID" => self.track_id = Some(value),
            "Location" => self.location = Some(value),
            "Year" => self.year = Some(value),
            _ => {
                self.extra.insert(key.to_string(), value);
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        match key {
            "Name" => self.name.as_deref(),
            "Artist" => self.artist.as_deref(),
            "AverageBpm" => self.average_bpm.as_deref(),
            "Tonality" => self.tonality.as_deref(),
            "Genre" => self.genre.as_deref(),
            "Label" => self.label.as_deref(),
            "Comments" => self.comments.as_deref(),
            "Grouping" => self.grouping.as_deref(),
            "TrackID" => self.track_id.as_deref(),
            "Location" => self.location.as_deref(),
            "Year" => self.year.as_deref(),
            _ => self.extra.get(key).map(String::as_str),
        }
    }

    /// Number of attributes captured, named and extra.
    pub fn len(&self) -> usize {
        self.attributes().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All attributes in writing order: the native order for known names,
    /// then the remaining extension attributes sorted by name.
    pub fn attributes(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        let known = TRACK_ATTRIBUTE_ORDER
            .iter()
            .filter_map(move |key| self.get(key).map(|value| (*key, value)));
        let rest = self
            .extra
            .iter()
            .filter(|(key, _)| !TRACK_ATTRIBUTE_ORDER.contains(&key.as_str()))
            .map(|(key, value)| (key.as_str(), value.as_str()));
        known.chain(rest)
    }

    /// AverageBpm as a number, when present and well-formed.
    pub fn bpm(&self) -> Option<f64> {
        self.average_bpm
            .as_deref()
            .and_then(|bpm| bpm.trim().parse::<f64>().ok())
    }
}

/// One `TRACK` element as produced by the parser.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackAttributes {
    pub metadata: OriginalMetadata,
    /// Comma-joined `TAGS/TAG@NAME` children, for libraries that carry them.
    pub legacy_tags: Option<String>,
}

impl TrackAttributes {
    pub fn name(&self) -> Option<&str> {
        non_blank(self.metadata.name.as_deref())
    }

    pub fn artist(&self) -> Option<&str> {
        non_blank(self.metadata.artist.as_deref())
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_routes_known_and_extra_attributes() {
        let mut meta = OriginalMetadata::default();
        meta.set("Name", "Spastik");
        meta.set("Artist", "Plastikman");
        meta.set("Kind", "MP3 File");
        meta.set("PlayCount", "12");

        assert_eq!(meta.name.as_deref(), Some("Spastik"));
        assert_eq!(meta.get("Kind"), Some("MP3 File"));
        assert_eq!(meta.extra.len(), 2);
        assert_eq!(meta.len(), 4);
    }

    #[test]
    fn test_serializes_as_flat_object() {
        let mut meta = OriginalMetadata::default();
        meta.set("Name", "Strings of Life");
        meta.set("Grouping", "");
        meta.set("Mix", "Original");

        let json = serde_json::to_value(&meta).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"Name": "Strings of Life", "Grouping": "", "Mix": "Original"})
        );

        let back: OriginalMetadata = serde_json::from_value(json).unwrap();
        assert_eq!(back, meta);
    }

    #[test]
    fn test_attributes_follow_native_order() {
        let mut meta = OriginalMetadata::default();
        meta.set("zCustom", "1");
        meta.set("Location", "file://localhost/a.mp3");
        meta.set("Name", "A");
        meta.set("TrackID", "7");
        meta.set("Album", "B");

        let keys: Vec<&str> = meta.attributes().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["TrackID", "Name", "Album", "Location", "zCustom"]);
    }

    #[test]
    fn test_bpm_parsing() {
        let mut meta = OriginalMetadata::default();
        assert_eq!(meta.bpm(), None);
        meta.set("AverageBpm", "128.00");
        assert_eq!(meta.bpm(), Some(128.0));
        meta.set("AverageBpm", "fast");
        assert_eq!(meta.bpm(), None);
    }
}
