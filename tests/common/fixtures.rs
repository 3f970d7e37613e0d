//! Test data for end-to-end tests
//!
//! Seeds a fixed week of engagement (2024-03-04 to 2024-03-10, UTC) plus a
//! few plays in the last hours so live time ranges have data.

use super::constants::*;
use anyhow::Result;
use chrono::{NaiveDate, TimeZone, Utc};
use pezzottify_analytics::analytics_store::{
    InteractionEvent, InteractionKind, PlayEvent, SqliteAnalyticsStore,
};
use std::path::PathBuf;
use tempfile::TempDir;

/// Plays of TRACK_1 per day of the seeded week, Monday first
pub const TRACK_1_DAILY_PLAYS: [u64; 7] = [3, 1, 4, 1, 5, 9, 2];

pub fn create_test_store() -> Result<(TempDir, PathBuf, SqliteAnalyticsStore)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("analytics.db");
    let store = SqliteAnalyticsStore::new(&db_path)?;
    seed_test_data(&store)?;
    Ok((temp_dir, db_path, store))
}

fn ms_at(date: NaiveDate, hour: u32) -> i64 {
    let naive = date.and_hms_opt(hour, 0, 0).unwrap();
    Utc.from_utc_datetime(&naive).timestamp_millis()
}

pub fn play(track_id: &str, session_id: &str, timestamp: i64, completion: f64) -> PlayEvent {
    PlayEvent {
        track_id: track_id.to_string(),
        session_id: session_id.to_string(),
        timestamp,
        duration: Some(completion * 2.0),
        completion_rate: Some(completion),
        skipped: completion < 30.0,
        replayed: false,
        source: "web".to_string(),
        ip: Some("192.168.1.10".to_string()),
    }
}

pub fn seed_test_data(store: &SqliteAnalyticsStore) -> Result<()> {
    store.upsert_artist(ARTIST_1_ID, "The Test Band", true)?;
    store.upsert_artist(ARTIST_2_ID, "Jazz Ensemble", true)?;
    store.upsert_artist(ARTIST_3_ID, "Silent Duo", true)?;
    store.add_track(TRACK_1_ID, ARTIST_1_ID)?;
    store.add_track(TRACK_2_ID, ARTIST_1_ID)?;
    store.add_track(TRACK_3_ID, ARTIST_2_ID)?;

    let week_start = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
    for (offset, plays) in TRACK_1_DAILY_PLAYS.iter().enumerate() {
        let date = week_start + chrono::Duration::days(offset as i64);
        for i in 0..*plays {
            let session = format!("{}-{}", date, i);
            store.insert_play_event(&play(TRACK_1_ID, &session, ms_at(date, 12), 80.0))?;
        }
    }

    // Wednesday: 10 plays of TRACK_2, three of them in one session
    let wednesday = week_start + chrono::Duration::days(2);
    for i in 0..10 {
        let session = if i < 3 {
            "shared-session".to_string()
        } else {
            format!("solo-{}", i)
        };
        store.insert_play_event(&play(TRACK_2_ID, &session, ms_at(wednesday, 9 + i), 50.0))?;
    }
    store.insert_interaction_event(&InteractionEvent {
        kind: InteractionKind::Like,
        track_id: TRACK_2_ID.to_string(),
        session_id: "shared-session".to_string(),
        timestamp: ms_at(wednesday, 10),
        action: Some("like".to_string()),
    })?;

    // Recent activity for the live ranges
    let now = Utc::now().timestamp_millis();
    for i in 0..6 {
        store.insert_play_event(&play(
            TRACK_1_ID,
            &format!("recent-{}", i),
            now - (i + 1) * 600_000,
            90.0,
        ))?;
    }
    store.insert_play_event(&play(TRACK_3_ID, "recent-jazz", now - 1_800_000, 20.0))?;

    Ok(())
}
