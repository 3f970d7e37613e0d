//! SQLite schema definitions for the analytics database.
//!
//! Raw engagement events and the artist/track registry are written by other
//! parts of the platform; the stats and score tables are owned by this crate
//! and can be rebuilt from the events at any time.

use crate::sqlite_column;
use crate::sqlite_persistence::{
    Column, ForeignKey, ForeignKeyOnChange, SqlType, Table, VersionedSchema,
};

// =============================================================================
// Version 1 - Registry, raw events, derived stats and scores
// =============================================================================

const ARTISTS_TABLE_V1: Table = Table {
    name: "artists",
    columns: &[
        sqlite_column!("id", &SqlType::Text, is_primary_key = true),
        sqlite_column!("name", &SqlType::Text, non_null = true),
        sqlite_column!(
            "is_active",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("1")
        ),
    ],
    indices: &[],
    unique_constraints: &[],
};

const ARTIST_FOREIGN_KEY: ForeignKey = ForeignKey {
    foreign_table: "artists",
    foreign_column: "id",
    on_delete: ForeignKeyOnChange::Cascade,
};

const TRACKS_TABLE_V1: Table = Table {
    name: "tracks",
    columns: &[
        sqlite_column!("id", &SqlType::Text, is_primary_key = true),
        sqlite_column!(
            "artist_id",
            &SqlType::Text,
            non_null = true,
            foreign_key = Some(&ARTIST_FOREIGN_KEY)
        ),
    ],
    indices: &[("idx_tracks_artist_id", "artist_id")],
    unique_constraints: &[],
};

const PLAY_EVENTS_TABLE_V1: Table = Table {
    name: "play_events",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true), // AUTOINCREMENT
        sqlite_column!("track_id", &SqlType::Text, non_null = true),
        sqlite_column!("session_id", &SqlType::Text, non_null = true),
        sqlite_column!("timestamp", &SqlType::Integer, non_null = true), // unix millis
        sqlite_column!("duration", &SqlType::Real),
        sqlite_column!("completion_rate", &SqlType::Real),
        sqlite_column!(
            "skipped",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("0")
        ),
        sqlite_column!(
            "replayed",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("0")
        ),
        sqlite_column!("source", &SqlType::Text, non_null = true),
        sqlite_column!("ip", &SqlType::Text),
    ],
    indices: &[
        ("idx_play_events_timestamp", "timestamp"),
        ("idx_play_events_track_timestamp", "track_id, timestamp"),
    ],
    unique_constraints: &[],
};

const INTERACTION_COLUMNS: &[Column] = &[
    sqlite_column!("id", &SqlType::Integer, is_primary_key = true), // AUTOINCREMENT
    sqlite_column!("track_id", &SqlType::Text, non_null = true),
    sqlite_column!("session_id", &SqlType::Text, non_null = true),
    sqlite_column!("timestamp", &SqlType::Integer, non_null = true), // unix millis
    sqlite_column!("action", &SqlType::Text),
];

const LIKE_EVENTS_TABLE_V1: Table = Table {
    name: "like_events",
    columns: INTERACTION_COLUMNS,
    indices: &[("idx_like_events_track_timestamp", "track_id, timestamp")],
    unique_constraints: &[],
};

const SHARE_EVENTS_TABLE_V1: Table = Table {
    name: "share_events",
    columns: INTERACTION_COLUMNS,
    indices: &[("idx_share_events_track_timestamp", "track_id, timestamp")],
    unique_constraints: &[],
};

const DOWNLOAD_EVENTS_TABLE_V1: Table = Table {
    name: "download_events",
    columns: INTERACTION_COLUMNS,
    indices: &[("idx_download_events_track_timestamp", "track_id, timestamp")],
    unique_constraints: &[],
};

const SAVE_EVENTS_TABLE_V1: Table = Table {
    name: "save_events",
    columns: INTERACTION_COLUMNS,
    indices: &[("idx_save_events_track_timestamp", "track_id, timestamp")],
    unique_constraints: &[],
};

/// Builds the column list of a stats table; only the period column differs.
macro_rules! stats_columns {
    ($period_column:expr) => {
        &[
            sqlite_column!("track_id", &SqlType::Text, non_null = true),
            sqlite_column!($period_column, &SqlType::Integer, non_null = true),
            sqlite_column!("total_plays", &SqlType::Integer, non_null = true),
            sqlite_column!("unique_plays", &SqlType::Integer, non_null = true),
            sqlite_column!("total_likes", &SqlType::Integer, non_null = true),
            sqlite_column!("total_shares", &SqlType::Integer, non_null = true),
            sqlite_column!("total_downloads", &SqlType::Integer, non_null = true),
            sqlite_column!("total_saves", &SqlType::Integer, non_null = true),
            sqlite_column!("avg_duration", &SqlType::Real, non_null = true),
            sqlite_column!("avg_completion_rate", &SqlType::Real, non_null = true),
            sqlite_column!("skip_rate", &SqlType::Real, non_null = true),
            sqlite_column!("replay_rate", &SqlType::Real, non_null = true),
        ]
    };
}

const DAILY_TRACK_STATS_TABLE_V1: Table = Table {
    name: "daily_track_stats",
    columns: stats_columns!("date"),
    indices: &[("idx_daily_track_stats_date", "date")],
    unique_constraints: &[&["track_id", "date"]],
};

const WEEKLY_TRACK_STATS_TABLE_V1: Table = Table {
    name: "weekly_track_stats",
    columns: stats_columns!("week_start"),
    indices: &[("idx_weekly_track_stats_week_start", "week_start")],
    unique_constraints: &[&["track_id", "week_start"]],
};

const MONTHLY_TRACK_STATS_TABLE_V1: Table = Table {
    name: "monthly_track_stats",
    columns: stats_columns!("month_start"),
    indices: &[("idx_monthly_track_stats_month_start", "month_start")],
    unique_constraints: &[&["track_id", "month_start"]],
};

const YEARLY_TRACK_STATS_TABLE_V1: Table = Table {
    name: "yearly_track_stats",
    columns: stats_columns!("year"),
    indices: &[("idx_yearly_track_stats_year", "year")],
    unique_constraints: &[&["track_id", "year"]],
};

const ARTIST_STRENGTH_SCORES_TABLE_V1: Table = Table {
    name: "artist_strength_scores",
    columns: &[
        sqlite_column!("artist_id", &SqlType::Text, non_null = true),
        sqlite_column!("time_range", &SqlType::Text, non_null = true),
        sqlite_column!("engagement_score", &SqlType::Real, non_null = true),
        sqlite_column!("growth_score", &SqlType::Real, non_null = true),
        sqlite_column!("quality_score", &SqlType::Real, non_null = true),
        sqlite_column!("potential_score", &SqlType::Real, non_null = true),
        sqlite_column!("overall_score", &SqlType::Real, non_null = true),
        sqlite_column!("updated_at", &SqlType::Text, non_null = true), // RFC 3339
    ],
    indices: &[(
        "idx_artist_strength_scores_range_overall",
        "time_range, overall_score DESC",
    )],
    unique_constraints: &[&["artist_id", "time_range"]],
};

// =============================================================================
// Versioned Schema Definition
// =============================================================================

/// All versioned schemas for the analytics database.
///
/// Version 1: registry, raw events, daily/weekly/monthly/yearly stats, strength scores
pub const ANALYTICS_VERSIONED_SCHEMAS: &[VersionedSchema] = &[VersionedSchema {
    version: 1,
    tables: &[
        ARTISTS_TABLE_V1,
        TRACKS_TABLE_V1,
        PLAY_EVENTS_TABLE_V1,
        LIKE_EVENTS_TABLE_V1,
        SHARE_EVENTS_TABLE_V1,
        DOWNLOAD_EVENTS_TABLE_V1,
        SAVE_EVENTS_TABLE_V1,
        DAILY_TRACK_STATS_TABLE_V1,
        WEEKLY_TRACK_STATS_TABLE_V1,
        MONTHLY_TRACK_STATS_TABLE_V1,
        YEARLY_TRACK_STATS_TABLE_V1,
        ARTIST_STRENGTH_SCORES_TABLE_V1,
    ],
    migration: None, // Initial version has no migration
}];
