//! SQLite schema definitions for the track library database.

use crate::sqlite_column;
use crate::sqlite_persistence::{SqlType, Table, VersionedSchema, DEFAULT_TIMESTAMP};
use anyhow::Result;
use rusqlite::Connection;

/// Imported tracks, one row per (name, artist).
const TRACKS_TABLE_V_0: Table = Table {
    name: "tracks",
    columns: &[
        sqlite_column!(
            "id",
            &SqlType::Integer,
            is_primary_key = true,
            auto_increment = true
        ),
        sqlite_column!("name", &SqlType::Text, non_null = true),
        sqlite_column!("artist", &SqlType::Text, non_null = true),
        sqlite_column!("bpm", &SqlType::Real),
        sqlite_column!("key", &SqlType::Text),
        sqlite_column!("genre", &SqlType::Text),
        sqlite_column!("label", &SqlType::Text),
        sqlite_column!("comments", &SqlType::Text),
        sqlite_column!("grouping", &SqlType::Text),
        sqlite_column!("generated_tags", &SqlType::Text), // JSON object, NULL until tagged
        sqlite_column!("original_metadata", &SqlType::Text, non_null = true), // JSON object
        sqlite_column!(
            "created_at",
            &SqlType::Integer,
            non_null = true,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    indices: &[("idx_tracks_artist", "artist")],
    unique_constraints: &[&["name", "artist"]],
};

/// V1: keeps the enrichment the tags were generated from, and the legacy
/// `TAGS` string from the library file.
const TRACKS_TABLE_V_1: Table = Table {
    name: "tracks",
    columns: &[
        sqlite_column!(
            "id",
            &SqlType::Integer,
            is_primary_key = true,
            auto_increment = true
        ),
        sqlite_column!("name", &SqlType::Text, non_null = true),
        sqlite_column!("artist", &SqlType::Text, non_null = true),
        sqlite_column!("bpm", &SqlType::Real),
        sqlite_column!("key", &SqlType::Text),
        sqlite_column!("genre", &SqlType::Text),
        sqlite_column!("label", &SqlType::Text),
        sqlite_column!("comments", &SqlType::Text),
        sqlite_column!("grouping", &SqlType::Text),
        sqlite_column!("generated_tags", &SqlType::Text), // JSON object, NULL until tagged
        sqlite_column!("original_metadata", &SqlType::Text, non_null = true), // JSON object
        sqlite_column!(
            "created_at",
            &SqlType::Integer,
            non_null = true,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
        sqlite_column!("enrichment", &SqlType::Text), // JSON object, NULL when the lookup found nothing
        sqlite_column!("legacy_tags", &SqlType::Text),
    ],
    indices: &[("idx_tracks_artist", "artist")],
    unique_constraints: &[&["name", "artist"]],
};

/// Key/value settings that outlive a single run.
const SETTINGS_TABLE_V_0: Table = Table {
    name: "settings",
    columns: &[
        sqlite_column!("key", &SqlType::Text, is_primary_key = true),
        sqlite_column!("value", &SqlType::Text, non_null = true),
    ],
    indices: &[],
    unique_constraints: &[],
};

fn migrate_to_v1(conn: &Connection) -> Result<()> {
    conn.execute("ALTER TABLE tracks ADD COLUMN enrichment TEXT", [])?;
    conn.execute("ALTER TABLE tracks ADD COLUMN legacy_tags TEXT", [])?;
    Ok(())
}

pub const TRACK_VERSIONED_SCHEMAS: &[VersionedSchema] = &[
    VersionedSchema {
        version: 0,
        tables: &[TRACKS_TABLE_V_0, SETTINGS_TABLE_V_0],
        migration: None,
    },
    VersionedSchema {
        version: 1,
        tables: &[TRACKS_TABLE_V_1, SETTINGS_TABLE_V_0],
        migration: Some(migrate_to_v1),
    },
];
