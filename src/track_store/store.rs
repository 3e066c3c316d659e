//! SQLite-backed track store implementation.

use super::models::{InsertOutcome, NewTrack, TrackRecord};
use super::schema::TRACK_VERSIONED_SCHEMAS;
use super::trait_def::TrackStore;
use crate::enrichment::Enrichment;
use crate::sqlite_persistence::open_versioned;
use crate::tagging::{CategorizedTags, DEFAULT_TAG_LIMIT};
use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

const TAG_LIMIT_SETTING: &str = "tag_limit";

const TRACK_COLUMNS: &str = "id, name, artist, bpm, key, genre, label, comments, grouping,
     generated_tags, original_metadata, legacy_tags, enrichment, created_at";

/// SQLite-backed track store.
#[derive(Clone)]
pub struct SqliteTrackStore {
    read_conn: Arc<Mutex<Connection>>,
    write_conn: Arc<Mutex<Connection>>,
}

impl SqliteTrackStore {
    /// Open (or create) the track database at `db_path`.
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let db_path_ref = db_path.as_ref();

        let mut write_conn = Connection::open_with_flags(
            db_path_ref,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI
                | rusqlite::OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .with_context(|| format!("Failed to open track database {:?}", db_path_ref))?;

        open_versioned(&mut write_conn, TRACK_VERSIONED_SCHEMAS, "track")?;

        write_conn
            .pragma_update(None, "journal_mode", "WAL")
            .context("Failed to set WAL mode on track write connection")?;

        let read_conn = Connection::open_with_flags(
            db_path_ref,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_ONLY
                | rusqlite::OpenFlags::SQLITE_OPEN_URI
                | rusqlite::OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .context("Failed to open track database for reading")?;

        let track_count: usize =
            read_conn.query_row("SELECT COUNT(*) FROM tracks", [], |r| r.get(0))?;
        info!("Track store ready: {} tracks at {:?}", track_count, db_path_ref);

        Ok(Self {
            read_conn: Arc::new(Mutex::new(read_conn)),
            write_conn: Arc::new(Mutex::new(write_conn)),
        })
    }
}

// Helper: empty tag sets are stored as NULL
fn tags_json_or_null(tags: &CategorizedTags) -> Result<Option<String>> {
    if tags.is_empty() {
        return Ok(None);
    }
    serde_json::to_string(tags)
        .map(Some)
        .context("Failed to serialize generated tags")
}

// Helper: an empty lookup result is stored as NULL
fn enrichment_json_or_null(enrichment: &Enrichment) -> Result<Option<String>> {
    if enrichment.is_empty() {
        return Ok(None);
    }
    serde_json::to_string(enrichment)
        .map(Some)
        .context("Failed to serialize enrichment")
}

fn parse_enrichment(id: i64, json: Option<String>) -> Option<Enrichment> {
    json.and_then(|json| {
        serde_json::from_str(&json)
            .map_err(|e| warn!("Malformed enrichment for track {}: {}", id, e))
            .ok()
    })
}

// Helper: malformed tag JSON reads as no tags
fn parse_tags(id: i64, json: Option<String>) -> Option<CategorizedTags> {
    json.and_then(|json| {
        serde_json::from_str(&json)
            .map_err(|e| warn!("Malformed generated_tags for track {}: {}", id, e))
            .ok()
    })
}

fn row_to_record(row: &Row) -> rusqlite::Result<TrackRecord> {
    let id: i64 = row.get(0)?;
    Ok(TrackRecord {
        id,
        name: row.get(1)?,
        artist: row.get(2)?,
        bpm: row.get(3)?,
        key: row.get(4)?,
        genre: row.get(5)?,
        label: row.get(6)?,
        comments: row.get(7)?,
        grouping: row.get(8)?,
        generated_tags: parse_tags(id, row.get(9)?),
        original_metadata_json: row.get(10)?,
        legacy_tags: row.get(11)?,
        enrichment: parse_enrichment(id, row.get(12)?),
        created_at: row.get(13)?,
    })
}

impl TrackStore for SqliteTrackStore {
    fn insert_or_skip(&self, track: &NewTrack) -> Result<InsertOutcome> {
        let original_metadata = serde_json::to_string(&track.original_metadata)
            .context("Failed to serialize original metadata")?;
        let generated_tags = tags_json_or_null(&track.generated_tags)?;
        let enrichment = enrichment_json_or_null(&track.enrichment)?;

        let conn = self.write_conn.lock().unwrap();
        let inserted = conn
            .execute(
                "INSERT INTO tracks
                 (name, artist, bpm, key, genre, label, comments, grouping,
                  generated_tags, original_metadata, legacy_tags, enrichment)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
                 ON CONFLICT(name, artist) DO NOTHING",
                params![
                    track.name,
                    track.artist,
                    track.bpm,
                    track.key,
                    track.genre,
                    track.label,
                    track.comments,
                    track.grouping,
                    generated_tags,
                    original_metadata,
                    track.legacy_tags,
                    enrichment,
                ],
            )
            .with_context(|| {
                format!("Failed to insert track {:?} by {:?}", track.name, track.artist)
            })?;

        if inserted == 0 {
            Ok(InsertOutcome::Duplicate)
        } else {
            Ok(InsertOutcome::Inserted(conn.last_insert_rowid()))
        }
    }

    fn find_by_name_artist(&self, name: &str, artist: &str) -> Result<Option<i64>> {
        let conn = self.read_conn.lock().unwrap();
        let id = conn
            .prepare_cached("SELECT id FROM tracks WHERE name = ?1 AND artist = ?2")?
            .query_row(params![name, artist], |r| r.get(0))
            .optional()?;
        Ok(id)
    }

    fn get(&self, id: i64) -> Result<Option<TrackRecord>> {
        let conn = self.read_conn.lock().unwrap();
        let mut stmt =
            conn.prepare_cached(&format!("SELECT {} FROM tracks WHERE id = ?1", TRACK_COLUMNS))?;
        let record = stmt.query_row(params![id], row_to_record).optional()?;
        Ok(record)
    }

    fn list_all(&self) -> Result<Vec<TrackRecord>> {
        let conn = self.read_conn.lock().unwrap();
        let mut stmt =
            conn.prepare_cached(&format!("SELECT {} FROM tracks ORDER BY id", TRACK_COLUMNS))?;
        let records = stmt
            .query_map([], row_to_record)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }

    fn count(&self) -> Result<usize> {
        let conn = self.read_conn.lock().unwrap();
        let count: usize = conn.query_row("SELECT COUNT(*) FROM tracks", [], |r| r.get(0))?;
        Ok(count)
    }

    fn delete(&self, id: i64) -> Result<bool> {
        let conn = self.write_conn.lock().unwrap();
        let deleted = conn.execute("DELETE FROM tracks WHERE id = ?1", params![id])?;
        Ok(deleted > 0)
    }

    fn update_generated_tags(&self, id: i64, tags: &CategorizedTags) -> Result<bool> {
        let generated_tags = tags_json_or_null(tags)?;
        let conn = self.write_conn.lock().unwrap();
        let updated = conn.execute(
            "UPDATE tracks SET generated_tags = ?1 WHERE id = ?2",
            params![generated_tags, id],
        )?;
        Ok(updated > 0)
    }

    fn update_enrichment(&self, id: i64, enrichment: &Enrichment) -> Result<bool> {
        let enrichment = enrichment_json_or_null(enrichment)?;
        let conn = self.write_conn.lock().unwrap();
        let updated = conn.execute(
            "UPDATE tracks SET enrichment = ?1 WHERE id = ?2",
            params![enrichment, id],
        )?;
        Ok(updated > 0)
    }

    fn clear_generated_tags(&self, id: Option<i64>) -> Result<usize> {
        let conn = self.write_conn.lock().unwrap();
        let cleared = match id {
            Some(id) => conn.execute(
                "UPDATE tracks SET generated_tags = NULL WHERE id = ?1",
                params![id],
            )?,
            None => conn.execute(
                "UPDATE tracks SET generated_tags = NULL WHERE generated_tags IS NOT NULL",
                [],
            )?,
        };
        Ok(cleared)
    }

    fn get_tag_limit(&self) -> Result<u32> {
        let conn = self.read_conn.lock().unwrap();
        let value: Option<String> = conn
            .query_row(
                "SELECT value FROM settings WHERE key = ?1",
                params![TAG_LIMIT_SETTING],
                |r| r.get(0),
            )
            .optional()?;

        Ok(match value {
            None => DEFAULT_TAG_LIMIT,
            Some(value) => value.trim().parse().unwrap_or_else(|e| {
                warn!("Invalid stored tag limit {:?}: {}", value, e);
                DEFAULT_TAG_LIMIT
            }),
        })
    }

    fn set_tag_limit(&self, limit: u32) -> Result<()> {
        let conn = self.write_conn.lock().unwrap();
        conn.execute(
            "INSERT INTO settings (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![TAG_LIMIT_SETTING, limit.to_string()],
        )
        .context("Failed to store tag limit")?;
        Ok(())
    }
}
