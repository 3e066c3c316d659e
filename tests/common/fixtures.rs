//! Library files and store helpers shared by the end-to-end tests.

use anyhow::{bail, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tag_genius::enrichment::Enrichment;
use tag_genius::library_xml::TrackAttributes;
use tag_genius::tagging::TagBackend;
use tag_genius::track_store::{InsertOutcome, NewTrack, TrackRecord};
use tag_genius::{CategorizedTags, SqliteTrackStore, TaggingConfig, TrackStore};
use tempfile::TempDir;

/// A small library exercising the attributes the pipeline cares about.
///
/// Five TRACK elements: three complete, one with an Artist but no Name, and
/// one with neither (dropped by the parser).
pub const LIBRARY_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<DJ_PLAYLISTS Version="1.0.0">
  <PRODUCT Name="rekordbox" Version="6.8.2" Company="AlphaTheta"/>
  <COLLECTION Entries="5">
    <TRACK TrackID="101" Name="Jack Your Body" Artist="Steve &quot;Silk&quot; Hurley" Composer="" Album="Jack Trax" Genre="House" Kind="MP3 File" Size="8123456" TotalTime="342" Year="1986" AverageBpm="122.00" DateAdded="2023-04-01" BitRate="320" SampleRate="44100" Comments="Chicago &amp; proud" Rating="0" Location="file://localhost/Music/jack.mp3" Tonality="Gm" Label="DJ International" Grouping="House" Colour="0x25FDE9">
      <TEMPO Inizio="0.050" Bpm="122.00" Metro="4/4" Battito="1"/>
    </TRACK>
    <TRACK TrackID="102" Name="Floorshow" Artist="Surgeon" AverageBpm="138.00" Tonality="8A" Genre="Techno" Grouping="" Comments="">
      <TAGS>
        <TAG NAME="warehouse"/>
        <TAG NAME="dark"/>
      </TAGS>
    </TRACK>
    <TRACK TrackID="103" Artist="Nameless Artist" Genre="Ambient"/>
    <TRACK TrackID="104" Genre="Unknown"/>
    <TRACK TrackID="105" Name="Spastik" Artist="Plastikman" AverageBpm="130.5" Tonality="Am" Label="NovaMute" MyTag="line1&#10;line2"/>
  </COLLECTION>
</DJ_PLAYLISTS>
"#;

/// Complete tracks in `LIBRARY_XML`, in document order.
pub const LIBRARY_IMPORTABLE: usize = 3;

pub const MALFORMED_LIBRARY: &[u8] = b"\x00\x01 this is not an XML document <TRACK";

pub const LIBRARY_WITHOUT_COLLECTION: &str =
    r#"<?xml version="1.0" encoding="UTF-8"?><DJ_PLAYLISTS Version="1.0.0"></DJ_PLAYLISTS>"#;

/// A store on a fresh database that lives as long as this value.
pub struct TestStore {
    pub store: Arc<SqliteTrackStore>,
    pub db_path: std::path::PathBuf,
    _temp_dir: TempDir,
}

impl TestStore {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("tag_genius.db");
        let store =
            Arc::new(SqliteTrackStore::new(&db_path).expect("Failed to create track store"));
        Self {
            store,
            db_path,
            _temp_dir: temp_dir,
        }
    }
}

/// Backend that never produces tags.
pub struct NoTagsBackend;

#[async_trait]
impl TagBackend for NoTagsBackend {
    fn name(&self) -> &str {
        "none"
    }

    async fn generate(
        &self,
        _track: &TrackAttributes,
        _enrichment: &Enrichment,
        _config: &TaggingConfig,
    ) -> CategorizedTags {
        CategorizedTags::default()
    }
}

/// A SQLite store whose insert fails for one track name.
pub struct FailingInsertStore {
    pub inner: Arc<SqliteTrackStore>,
    pub failing_name: String,
}

impl TrackStore for FailingInsertStore {
    fn insert_or_skip(&self, track: &NewTrack) -> Result<InsertOutcome> {
        if track.name == self.failing_name {
            bail!("disk I/O error while inserting {:?}", track.name);
        }
        self.inner.insert_or_skip(track)
    }

    fn find_by_name_artist(&self, name: &str, artist: &str) -> Result<Option<i64>> {
        self.inner.find_by_name_artist(name, artist)
    }

    fn get(&self, id: i64) -> Result<Option<TrackRecord>> {
        self.inner.get(id)
    }

    fn list_all(&self) -> Result<Vec<TrackRecord>> {
        self.inner.list_all()
    }

    fn count(&self) -> Result<usize> {
        self.inner.count()
    }

    fn delete(&self, id: i64) -> Result<bool> {
        self.inner.delete(id)
    }

    fn update_generated_tags(&self, id: i64, tags: &CategorizedTags) -> Result<bool> {
        self.inner.update_generated_tags(id, tags)
    }

    fn update_enrichment(&self, id: i64, enrichment: &Enrichment) -> Result<bool> {
        self.inner.update_enrichment(id, enrichment)
    }

    fn clear_generated_tags(&self, id: Option<i64>) -> Result<usize> {
        self.inner.clear_generated_tags(id)
    }

    fn get_tag_limit(&self) -> Result<u32> {
        self.inner.get_tag_limit()
    }

    fn set_tag_limit(&self, limit: u32) -> Result<()> {
        self.inner.set_tag_limit(limit)
    }
}
