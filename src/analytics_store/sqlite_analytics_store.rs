use super::models::{
    ArtistStrengthScore, ArtistSummary, AudienceStats, Granularity, InteractionEvent,
    InteractionKind, PlayEvent, PlaySummary, RankedArtist, TimeWindow, TrackPlaySummary,
    TrackStats,
};
use super::schema::ANALYTICS_VERSIONED_SCHEMAS;
use super::{ArtistRegistry, EventStore, ScoreStore, StatsStore};
use crate::sqlite_persistence::open_versioned_database;
use crate::strength::TimeRange;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

const PLAY_SUMMARY_COLUMNS: &str = "COUNT(*), COUNT(DISTINCT session_id), \
     COALESCE(SUM(duration), 0), COUNT(duration), \
     COALESCE(SUM(completion_rate), 0), COUNT(completion_rate), \
     COALESCE(SUM(skipped), 0), COALESCE(SUM(replayed), 0)";

const STATS_VALUE_COLUMNS: &str = "total_plays, unique_plays, total_likes, total_shares, \
     total_downloads, total_saves, avg_duration, avg_completion_rate, skip_rate, replay_rate";

/// WHERE clause over an event table plus its bound values.
struct EventFilter {
    clause: String,
    values: Vec<Value>,
}

impl EventFilter {
    fn new(window: TimeWindow, track_ids: Option<&[String]>) -> Self {
        let mut clause = String::from("timestamp >= ? AND timestamp < ?");
        let mut values = vec![Value::Integer(window.start), Value::Integer(window.end)];
        if let Some(track_ids) = track_ids {
            clause.push_str(&format!(" AND track_id IN ({})", placeholders(track_ids.len())));
            values.extend(track_ids.iter().map(|id| Value::Text(id.clone())));
        }
        Self { clause, values }
    }

    fn with_action(mut self, action: Option<&str>) -> Self {
        if let Some(action) = action {
            self.clause.push_str(" AND action = ?");
            self.values.push(Value::Text(action.to_string()));
        }
        self
    }
}

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

fn to_u64(value: i64) -> u64 {
    value.max(0) as u64
}

pub struct SqliteAnalyticsStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteAnalyticsStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = open_versioned_database(db_path, ANALYTICS_VERSIONED_SCHEMAS)
            .context("Failed to open analytics database")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    // -------------------------------------------------------------------------
    // Write path for events and registry
    //
    // In production these tables are filled by the ingestion and catalog
    // services; the methods exist for imports, fixtures and tests.
    // -------------------------------------------------------------------------

    pub fn upsert_artist(&self, artist_id: &str, name: &str, is_active: bool) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO artists (id, name, is_active) VALUES (?1, ?2, ?3)
             ON CONFLICT(id) DO UPDATE SET name = ?2, is_active = ?3",
            params![artist_id, name, is_active],
        )?;
        Ok(())
    }

    pub fn add_track(&self, track_id: &str, artist_id: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO tracks (id, artist_id) VALUES (?1, ?2)
             ON CONFLICT(id) DO UPDATE SET artist_id = ?2",
            params![track_id, artist_id],
        )?;
        Ok(())
    }

    pub fn insert_play_event(&self, event: &PlayEvent) -> Result<i64> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO play_events
                (track_id, session_id, timestamp, duration, completion_rate,
                 skipped, replayed, source, ip)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                event.track_id,
                event.session_id,
                event.timestamp,
                event.duration,
                event.completion_rate,
                event.skipped,
                event.replayed,
                event.source,
                event.ip,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn insert_interaction_event(&self, event: &InteractionEvent) -> Result<i64> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            &format!(
                "INSERT INTO {} (track_id, session_id, timestamp, action) VALUES (?1, ?2, ?3, ?4)",
                event.kind.table_name()
            ),
            params![event.track_id, event.session_id, event.timestamp, event.action],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn row_to_play_summary(row: &rusqlite::Row, offset: usize) -> rusqlite::Result<PlaySummary> {
        Ok(PlaySummary {
            total_plays: to_u64(row.get(offset)?),
            unique_sessions: to_u64(row.get(offset + 1)?),
            duration_sum: row.get(offset + 2)?,
            duration_samples: to_u64(row.get(offset + 3)?),
            completion_sum: row.get(offset + 4)?,
            completion_samples: to_u64(row.get(offset + 5)?),
            skipped_plays: to_u64(row.get(offset + 6)?),
            replayed_plays: to_u64(row.get(offset + 7)?),
        })
    }

    fn row_to_track_stats(granularity: Granularity, row: &rusqlite::Row) -> rusqlite::Result<TrackStats> {
        let period: i64 = row.get(1)?;
        Ok(TrackStats {
            granularity,
            track_id: row.get(0)?,
            period: period as u32,
            total_plays: to_u64(row.get(2)?),
            unique_plays: to_u64(row.get(3)?),
            total_likes: to_u64(row.get(4)?),
            total_shares: to_u64(row.get(5)?),
            total_downloads: to_u64(row.get(6)?),
            total_saves: to_u64(row.get(7)?),
            avg_duration: row.get(8)?,
            avg_completion_rate: row.get(9)?,
            skip_rate: row.get(10)?,
            replay_rate: row.get(11)?,
        })
    }

    fn parse_datetime(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now())
    }

    fn row_to_strength_score(row: &rusqlite::Row) -> rusqlite::Result<ArtistStrengthScore> {
        let time_range_str: String = row.get("time_range")?;
        let time_range = time_range_str.parse::<TimeRange>().map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                1,
                rusqlite::types::Type::Text,
                Box::new(e),
            )
        })?;
        let updated_at: String = row.get("updated_at")?;
        Ok(ArtistStrengthScore {
            artist_id: row.get("artist_id")?,
            time_range,
            engagement_score: row.get("engagement_score")?,
            growth_score: row.get("growth_score")?,
            quality_score: row.get("quality_score")?,
            potential_score: row.get("potential_score")?,
            overall_score: row.get("overall_score")?,
            updated_at: Self::parse_datetime(&updated_at),
        })
    }
}

impl EventStore for SqliteAnalyticsStore {
    fn get_active_track_ids(&self, window: TimeWindow) -> Result<Vec<String>> {
        let conn = self.conn.lock().unwrap();
        let tables = std::iter::once("play_events")
            .chain(InteractionKind::ALL.iter().map(|k| k.table_name()));

        let mut selects = Vec::new();
        let mut values = Vec::new();
        for table in tables {
            selects.push(format!(
                "SELECT track_id FROM {} WHERE timestamp >= ? AND timestamp < ?",
                table
            ));
            values.push(Value::Integer(window.start));
            values.push(Value::Integer(window.end));
        }
        // UNION already deduplicates
        let sql = format!("{} ORDER BY track_id", selects.join(" UNION "));

        let mut stmt = conn.prepare(&sql)?;
        let track_ids = stmt
            .query_map(params_from_iter(values.iter()), |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(track_ids)
    }

    fn get_play_summaries_by_track(&self, window: TimeWindow) -> Result<Vec<TrackPlaySummary>> {
        let conn = self.conn.lock().unwrap();
        let filter = EventFilter::new(window, None);
        let mut stmt = conn.prepare(&format!(
            "SELECT track_id, {} FROM play_events WHERE {} GROUP BY track_id ORDER BY track_id",
            PLAY_SUMMARY_COLUMNS, filter.clause
        ))?;
        let summaries = stmt
            .query_map(params_from_iter(filter.values.iter()), |row| {
                Ok(TrackPlaySummary {
                    track_id: row.get(0)?,
                    summary: Self::row_to_play_summary(row, 1)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(summaries)
    }

    fn get_interaction_counts_by_track(
        &self,
        kind: InteractionKind,
        window: TimeWindow,
    ) -> Result<HashMap<String, u64>> {
        let conn = self.conn.lock().unwrap();
        let filter = EventFilter::new(window, None).with_action(kind.counted_action());
        let mut stmt = conn.prepare(&format!(
            "SELECT track_id, COUNT(*) FROM {} WHERE {} GROUP BY track_id",
            kind.table_name(),
            filter.clause
        ))?;
        let counts = stmt
            .query_map(params_from_iter(filter.values.iter()), |row| {
                Ok((row.get::<_, String>(0)?, to_u64(row.get(1)?)))
            })?
            .collect::<rusqlite::Result<HashMap<_, _>>>()?;
        Ok(counts)
    }

    fn get_play_summary(&self, track_ids: &[String], window: TimeWindow) -> Result<PlaySummary> {
        if track_ids.is_empty() || window.is_empty() {
            return Ok(PlaySummary::default());
        }
        let conn = self.conn.lock().unwrap();
        let filter = EventFilter::new(window, Some(track_ids));
        let summary = conn.query_row(
            &format!(
                "SELECT {} FROM play_events WHERE {}",
                PLAY_SUMMARY_COLUMNS, filter.clause
            ),
            params_from_iter(filter.values.iter()),
            |row| Self::row_to_play_summary(row, 0),
        )?;
        Ok(summary)
    }

    fn count_interactions(
        &self,
        kind: InteractionKind,
        track_ids: &[String],
        window: TimeWindow,
    ) -> Result<u64> {
        if track_ids.is_empty() || window.is_empty() {
            return Ok(0);
        }
        let conn = self.conn.lock().unwrap();
        let filter = EventFilter::new(window, Some(track_ids)).with_action(kind.counted_action());
        let count: i64 = conn.query_row(
            &format!(
                "SELECT COUNT(*) FROM {} WHERE {}",
                kind.table_name(),
                filter.clause
            ),
            params_from_iter(filter.values.iter()),
            |row| row.get(0),
        )?;
        Ok(to_u64(count))
    }

    fn get_audience_stats(
        &self,
        track_ids: &[String],
        window: TimeWindow,
    ) -> Result<AudienceStats> {
        if track_ids.is_empty() || window.is_empty() {
            return Ok(AudienceStats::default());
        }
        let conn = self.conn.lock().unwrap();
        let filter = EventFilter::new(window, Some(track_ids));

        let (distinct_ips, distinct_sources, avg_duration, avg_completion_rate): (i64, i64, f64, f64) =
            conn.query_row(
                &format!(
                    "SELECT COUNT(DISTINCT ip), COUNT(DISTINCT source),
                            COALESCE(AVG(duration), 0.0), COALESCE(AVG(completion_rate), 0.0)
                     FROM play_events WHERE {}",
                    filter.clause
                ),
                params_from_iter(filter.values.iter()),
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
            )?;

        let (total_sessions, repeat_sessions): (i64, i64) = conn.query_row(
            &format!(
                "SELECT COUNT(*), COALESCE(SUM(CASE WHEN plays > 1 THEN 1 ELSE 0 END), 0)
                 FROM (SELECT session_id, COUNT(*) AS plays FROM play_events
                       WHERE {} GROUP BY session_id)",
                filter.clause
            ),
            params_from_iter(filter.values.iter()),
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        Ok(AudienceStats {
            distinct_ips: to_u64(distinct_ips),
            distinct_sources: to_u64(distinct_sources),
            total_sessions: to_u64(total_sessions),
            repeat_sessions: to_u64(repeat_sessions),
            avg_duration,
            avg_completion_rate,
        })
    }
}

impl ArtistRegistry for SqliteAnalyticsStore {
    fn get_artist_track_ids(&self, artist_id: &str) -> Result<Vec<String>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT id FROM tracks WHERE artist_id = ?1 ORDER BY id")?;
        let track_ids = stmt
            .query_map(params![artist_id], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(track_ids)
    }

    fn get_active_artists(&self) -> Result<Vec<ArtistSummary>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt =
            conn.prepare("SELECT id, name FROM artists WHERE is_active = 1 ORDER BY id")?;
        let artists = stmt
            .query_map([], |row| {
                Ok(ArtistSummary {
                    id: row.get(0)?,
                    name: row.get(1)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(artists)
    }
}

impl StatsStore for SqliteAnalyticsStore {
    fn upsert_track_stats(&self, rows: &[TrackStats]) -> Result<usize> {
        if rows.is_empty() {
            return Ok(0);
        }
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        for row in rows {
            let granularity = row.granularity;
            let period_column = granularity.period_column();
            let mut stmt = tx.prepare_cached(&format!(
                "INSERT INTO {table} (track_id, {period}, {values})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
                 ON CONFLICT(track_id, {period}) DO UPDATE SET
                    total_plays = excluded.total_plays,
                    unique_plays = excluded.unique_plays,
                    total_likes = excluded.total_likes,
                    total_shares = excluded.total_shares,
                    total_downloads = excluded.total_downloads,
                    total_saves = excluded.total_saves,
                    avg_duration = excluded.avg_duration,
                    avg_completion_rate = excluded.avg_completion_rate,
                    skip_rate = excluded.skip_rate,
                    replay_rate = excluded.replay_rate",
                table = granularity.table_name(),
                period = period_column,
                values = STATS_VALUE_COLUMNS,
            ))?;
            stmt.execute(params![
                row.track_id,
                row.period,
                row.total_plays as i64,
                row.unique_plays as i64,
                row.total_likes as i64,
                row.total_shares as i64,
                row.total_downloads as i64,
                row.total_saves as i64,
                row.avg_duration,
                row.avg_completion_rate,
                row.skip_rate,
                row.replay_rate,
            ])
            .with_context(|| {
                format!(
                    "Failed to upsert {} stats for track {} period {}",
                    granularity, row.track_id, row.period
                )
            })?;
        }
        tx.commit()?;
        Ok(rows.len())
    }

    fn get_track_stats(
        &self,
        granularity: Granularity,
        from: u32,
        to: u32,
        track_ids: Option<&[String]>,
    ) -> Result<Vec<TrackStats>> {
        if matches!(track_ids, Some(ids) if ids.is_empty()) {
            return Ok(Vec::new());
        }
        let conn = self.conn.lock().unwrap();
        let period_column = granularity.period_column();

        let mut sql = format!(
            "SELECT track_id, {period}, {values} FROM {table} WHERE {period} >= ? AND {period} < ?",
            period = period_column,
            values = STATS_VALUE_COLUMNS,
            table = granularity.table_name(),
        );
        let mut values = vec![Value::Integer(from as i64), Value::Integer(to as i64)];
        if let Some(track_ids) = track_ids {
            sql.push_str(&format!(" AND track_id IN ({})", placeholders(track_ids.len())));
            values.extend(track_ids.iter().map(|id| Value::Text(id.clone())));
        }
        sql.push_str(&format!(" ORDER BY track_id, {}", period_column));

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(values.iter()), |row| {
                Self::row_to_track_stats(granularity, row)
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    fn get_stats_periods(&self, granularity: Granularity, from: u32, to: u32) -> Result<Vec<u32>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT DISTINCT {period} FROM {table} WHERE {period} >= ?1 AND {period} < ?2 ORDER BY {period}",
            period = granularity.period_column(),
            table = granularity.table_name(),
        ))?;
        let periods = stmt
            .query_map(params![from as i64, to as i64], |row| row.get::<_, i64>(0))?
            .map(|period| period.map(|p| p as u32))
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(periods)
    }

    fn get_latest_stats_period(&self, granularity: Granularity) -> Result<Option<u32>> {
        let conn = self.conn.lock().unwrap();
        let latest: Option<i64> = conn.query_row(
            &format!(
                "SELECT MAX({}) FROM {}",
                granularity.period_column(),
                granularity.table_name()
            ),
            [],
            |row| row.get(0),
        )?;
        Ok(latest.map(|p| p as u32))
    }
}

impl ScoreStore for SqliteAnalyticsStore {
    fn upsert_strength_score(&self, score: &ArtistStrengthScore) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO artist_strength_scores
                (artist_id, time_range, engagement_score, growth_score, quality_score,
                 potential_score, overall_score, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT(artist_id, time_range) DO UPDATE SET
                engagement_score = ?3, growth_score = ?4, quality_score = ?5,
                potential_score = ?6, overall_score = ?7, updated_at = ?8",
            params![
                score.artist_id,
                score.time_range.as_str(),
                score.engagement_score,
                score.growth_score,
                score.quality_score,
                score.potential_score,
                score.overall_score,
                score.updated_at.to_rfc3339(),
            ],
        )
        .with_context(|| {
            format!(
                "Failed to upsert strength score for artist {} ({})",
                score.artist_id, score.time_range
            )
        })?;
        Ok(())
    }

    fn get_strength_score(
        &self,
        artist_id: &str,
        time_range: TimeRange,
    ) -> Result<Option<ArtistStrengthScore>> {
        let conn = self.conn.lock().unwrap();
        let score = conn
            .query_row(
                "SELECT artist_id, time_range, engagement_score, growth_score, quality_score,
                        potential_score, overall_score, updated_at
                 FROM artist_strength_scores WHERE artist_id = ?1 AND time_range = ?2",
                params![artist_id, time_range.as_str()],
                Self::row_to_strength_score,
            )
            .optional()?;
        Ok(score)
    }

    fn get_top_strength_scores(
        &self,
        time_range: TimeRange,
        limit: usize,
    ) -> Result<Vec<RankedArtist>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT s.artist_id, a.name, s.overall_score, s.engagement_score, s.growth_score,
                    s.quality_score, s.potential_score, s.updated_at
             FROM artist_strength_scores s
             JOIN artists a ON a.id = s.artist_id
             WHERE s.time_range = ?1
             ORDER BY s.overall_score DESC, s.artist_id ASC
             LIMIT ?2",
        )?;
        let ranked = stmt
            .query_map(params![time_range.as_str(), limit as i64], |row| {
                let updated_at: String = row.get(7)?;
                Ok(RankedArtist {
                    artist_id: row.get(0)?,
                    artist_name: row.get(1)?,
                    overall_score: row.get(2)?,
                    engagement_score: row.get(3)?,
                    growth_score: row.get(4)?,
                    quality_score: row.get(5)?,
                    potential_score: row.get(6)?,
                    updated_at: Self::parse_datetime(&updated_at),
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(ranked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    struct TestStore {
        store: SqliteAnalyticsStore,
        _temp_dir: TempDir, // Keep temp dir alive
    }

    fn create_test_store() -> TestStore {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("analytics.db");
        let store = SqliteAnalyticsStore::new(&db_path).unwrap();
        TestStore {
            store,
            _temp_dir: temp_dir,
        }
    }

    fn play(track_id: &str, session_id: &str, timestamp: i64) -> PlayEvent {
        PlayEvent {
            track_id: track_id.to_string(),
            session_id: session_id.to_string(),
            timestamp,
            duration: None,
            completion_rate: None,
            skipped: false,
            replayed: false,
            source: "web".to_string(),
            ip: None,
        }
    }

    fn interaction(kind: InteractionKind, track_id: &str, timestamp: i64, action: Option<&str>) -> InteractionEvent {
        InteractionEvent {
            kind,
            track_id: track_id.to_string(),
            session_id: "s".to_string(),
            timestamp,
            action: action.map(|a| a.to_string()),
        }
    }

    fn stats(granularity: Granularity, track_id: &str, period: u32, plays: u64) -> TrackStats {
        TrackStats {
            granularity,
            track_id: track_id.to_string(),
            period,
            total_plays: plays,
            unique_plays: plays,
            total_likes: 0,
            total_shares: 0,
            total_downloads: 0,
            total_saves: 0,
            avg_duration: 0.0,
            avg_completion_rate: 0.0,
            skip_rate: 0.0,
            replay_rate: 0.0,
        }
    }

    const WINDOW: TimeWindow = TimeWindow {
        start: 1_000,
        end: 2_000,
    };

    #[test]
    fn test_active_tracks_include_every_event_kind() {
        let test = create_test_store();
        let store = &test.store;

        store.insert_play_event(&play("t-play", "s1", 1_100)).unwrap();
        store
            .insert_interaction_event(&interaction(InteractionKind::Download, "t-dl", 1_200, None))
            .unwrap();
        // An "unlike" still makes the track active for the day
        store
            .insert_interaction_event(&interaction(InteractionKind::Like, "t-unlike", 1_300, Some("unlike")))
            .unwrap();
        // Outside the window (end is exclusive)
        store.insert_play_event(&play("t-late", "s1", 2_000)).unwrap();

        let active = store.get_active_track_ids(WINDOW).unwrap();
        assert_eq!(active, vec!["t-dl", "t-play", "t-unlike"]);
    }

    #[test]
    fn test_play_summaries_group_by_track() {
        let test = create_test_store();
        let store = &test.store;

        let mut p = play("t1", "s1", 1_100);
        p.duration = Some(120.0);
        p.completion_rate = Some(80.0);
        p.skipped = true;
        store.insert_play_event(&p).unwrap();
        store.insert_play_event(&play("t1", "s1", 1_200)).unwrap();
        let mut r = play("t1", "s2", 1_300);
        r.replayed = true;
        r.duration = Some(60.0);
        store.insert_play_event(&r).unwrap();
        store.insert_play_event(&play("t2", "s3", 1_400)).unwrap();

        let summaries = store.get_play_summaries_by_track(WINDOW).unwrap();
        assert_eq!(summaries.len(), 2);
        let t1 = &summaries[0];
        assert_eq!(t1.track_id, "t1");
        assert_eq!(t1.summary.total_plays, 3);
        assert_eq!(t1.summary.unique_sessions, 2);
        assert_eq!(t1.summary.duration_samples, 2);
        assert_eq!(t1.summary.avg_duration(), 90.0);
        assert_eq!(t1.summary.completion_samples, 1);
        assert_eq!(t1.summary.avg_completion_rate(), 80.0);
        assert_eq!(t1.summary.skipped_plays, 1);
        assert_eq!(t1.summary.replayed_plays, 1);
    }

    #[test]
    fn test_interaction_counts_filter_actions() {
        let test = create_test_store();
        let store = &test.store;

        for action in [Some("like"), Some("like"), Some("unlike"), None] {
            store
                .insert_interaction_event(&interaction(InteractionKind::Like, "t1", 1_500, action))
                .unwrap();
        }
        for action in [Some("whatever"), None] {
            store
                .insert_interaction_event(&interaction(InteractionKind::Share, "t1", 1_500, action))
                .unwrap();
        }

        let likes = store
            .get_interaction_counts_by_track(InteractionKind::Like, WINDOW)
            .unwrap();
        assert_eq!(likes.get("t1"), Some(&2));
        let shares = store
            .count_interactions(InteractionKind::Share, &["t1".to_string()], WINDOW)
            .unwrap();
        assert_eq!(shares, 2);
    }

    #[test]
    fn test_play_summary_counts_sessions_across_tracks() {
        let test = create_test_store();
        let store = &test.store;

        store.insert_play_event(&play("t1", "shared", 1_100)).unwrap();
        store.insert_play_event(&play("t2", "shared", 1_200)).unwrap();
        store.insert_play_event(&play("t3", "other", 1_300)).unwrap();

        let ids = vec!["t1".to_string(), "t2".to_string()];
        let summary = store.get_play_summary(&ids, WINDOW).unwrap();
        assert_eq!(summary.total_plays, 2);
        assert_eq!(summary.unique_sessions, 1);

        assert_eq!(store.get_play_summary(&[], WINDOW).unwrap(), PlaySummary::default());
    }

    #[test]
    fn test_audience_stats() {
        let test = create_test_store();
        let store = &test.store;

        let mut a = play("t1", "s1", 1_100);
        a.ip = Some("10.0.0.1".to_string());
        a.duration = Some(200.0);
        store.insert_play_event(&a).unwrap();
        let mut b = play("t1", "s1", 1_200);
        b.ip = Some("10.0.0.1".to_string());
        b.source = "android".to_string();
        store.insert_play_event(&b).unwrap();
        let mut c = play("t1", "s2", 1_300);
        c.ip = Some("10.0.0.2".to_string());
        c.duration = Some(100.0);
        store.insert_play_event(&c).unwrap();
        store.insert_play_event(&play("t1", "s3", 1_400)).unwrap();

        let audience = store
            .get_audience_stats(&["t1".to_string()], WINDOW)
            .unwrap();
        assert_eq!(
            audience,
            AudienceStats {
                distinct_ips: 2,
                distinct_sources: 2,
                total_sessions: 3,
                repeat_sessions: 1,
                avg_duration: 150.0,
                avg_completion_rate: 0.0,
            }
        );
    }

    #[test]
    fn test_upsert_track_stats_overwrites() {
        let test = create_test_store();
        let store = &test.store;

        store
            .upsert_track_stats(&[stats(Granularity::Daily, "t1", 20240102, 5)])
            .unwrap();
        store
            .upsert_track_stats(&[
                stats(Granularity::Daily, "t1", 20240102, 7),
                stats(Granularity::Daily, "t2", 20240103, 1),
                stats(Granularity::Yearly, "t1", 2024, 7),
            ])
            .unwrap();

        let daily = store
            .get_track_stats(Granularity::Daily, 20240101, 20240108, None)
            .unwrap();
        assert_eq!(daily.len(), 2);
        assert_eq!(daily[0].track_id, "t1");
        assert_eq!(daily[0].total_plays, 7);

        let only_t2 = store
            .get_track_stats(Granularity::Daily, 20240101, 20240108, Some(&["t2".to_string()]))
            .unwrap();
        assert_eq!(only_t2.len(), 1);

        let yearly = store
            .get_track_stats(Granularity::Yearly, 2024, 2025, None)
            .unwrap();
        assert_eq!(yearly[0].granularity, Granularity::Yearly);
        assert_eq!(yearly[0].period, 2024);
    }

    #[test]
    fn test_stats_periods_and_latest_period() {
        let test = create_test_store();
        let store = &test.store;

        assert_eq!(store.get_latest_stats_period(Granularity::Daily).unwrap(), None);

        store
            .upsert_track_stats(&[
                stats(Granularity::Daily, "t1", 20240102, 5),
                stats(Granularity::Daily, "t2", 20240102, 1),
                stats(Granularity::Daily, "t1", 20240105, 2),
                stats(Granularity::Weekly, "t1", 20240108, 2),
            ])
            .unwrap();

        assert_eq!(
            store.get_stats_periods(Granularity::Daily, 20240101, 20240105).unwrap(),
            vec![20240102]
        );
        assert_eq!(
            store.get_stats_periods(Granularity::Daily, 20240101, 20240201).unwrap(),
            vec![20240102, 20240105]
        );
        assert_eq!(
            store.get_latest_stats_period(Granularity::Daily).unwrap(),
            Some(20240105)
        );
        assert_eq!(
            store.get_latest_stats_period(Granularity::Weekly).unwrap(),
            Some(20240108)
        );
    }

    #[test]
    fn test_strength_scores_upsert_and_rank() {
        let test = create_test_store();
        let store = &test.store;

        for (id, name) in [("a1", "First"), ("a2", "Second"), ("a3", "Third")] {
            store.upsert_artist(id, name, true).unwrap();
        }
        let score = |artist_id: &str, overall: f64| ArtistStrengthScore {
            artist_id: artist_id.to_string(),
            time_range: TimeRange::SevenDays,
            engagement_score: 10.0,
            growth_score: 20.0,
            quality_score: 30.0,
            potential_score: 40.0,
            overall_score: overall,
            updated_at: Utc::now(),
        };
        store.upsert_strength_score(&score("a1", 10.0)).unwrap();
        store.upsert_strength_score(&score("a2", 50.0)).unwrap();
        store.upsert_strength_score(&score("a3", 30.0)).unwrap();
        // Recompute replaces the previous value
        store.upsert_strength_score(&score("a1", 70.0)).unwrap();

        let top = store.get_top_strength_scores(TimeRange::SevenDays, 2).unwrap();
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].artist_id, "a1");
        assert_eq!(top[0].artist_name, "First");
        assert_eq!(top[1].artist_id, "a2");

        let stored = store
            .get_strength_score("a1", TimeRange::SevenDays)
            .unwrap()
            .unwrap();
        assert_eq!(stored.overall_score, 70.0);
        assert!(store
            .get_strength_score("a1", TimeRange::ThirtyDays)
            .unwrap()
            .is_none());
        assert!(store
            .get_top_strength_scores(TimeRange::OneYear, 10)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_registry_lists_active_artists_and_tracks() {
        let test = create_test_store();
        let store = &test.store;

        store.upsert_artist("a1", "Active", true).unwrap();
        store.upsert_artist("a2", "Retired", false).unwrap();
        store.add_track("t2", "a1").unwrap();
        store.add_track("t1", "a1").unwrap();

        let artists = store.get_active_artists().unwrap();
        assert_eq!(
            artists,
            vec![ArtistSummary {
                id: "a1".to_string(),
                name: "Active".to_string()
            }]
        );
        assert_eq!(store.get_artist_track_ids("a1").unwrap(), vec!["t1", "t2"]);
        assert!(store.get_artist_track_ids("missing").unwrap().is_empty());
    }
}
