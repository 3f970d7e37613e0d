use crate::strength::TimeRange;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Raw Events
// ============================================================================

/// A single playback of a track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayEvent {
    pub track_id: String,
    pub session_id: String,
    /// Unix timestamp in milliseconds
    pub timestamp: i64,
    /// Listening time in seconds
    pub duration: Option<f64>,
    /// Percentage of the track that was played, 0-100
    pub completion_rate: Option<f64>,
    pub skipped: bool,
    pub replayed: bool,
    /// Where playback was started from: "web", "android", "playlist", ...
    pub source: String,
    pub ip: Option<String>,
}

/// Kinds of non-play engagement events. Each kind lives in its own table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionKind {
    Like,
    Share,
    Download,
    Save,
}

impl InteractionKind {
    pub const ALL: [InteractionKind; 4] = [
        InteractionKind::Like,
        InteractionKind::Share,
        InteractionKind::Download,
        InteractionKind::Save,
    ];

    pub fn table_name(&self) -> &'static str {
        match self {
            InteractionKind::Like => "like_events",
            InteractionKind::Share => "share_events",
            InteractionKind::Download => "download_events",
            InteractionKind::Save => "save_events",
        }
    }

    /// Likes and saves can be undone ("unlike", "unsave"), only the positive
    /// action counts towards totals.
    pub fn counted_action(&self) -> Option<&'static str> {
        match self {
            InteractionKind::Like => Some("like"),
            InteractionKind::Save => Some("save"),
            InteractionKind::Share | InteractionKind::Download => None,
        }
    }
}

/// A like / share / download / save event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionEvent {
    pub kind: InteractionKind,
    pub track_id: String,
    pub session_id: String,
    /// Unix timestamp in milliseconds
    pub timestamp: i64,
    pub action: Option<String>,
}

/// Half-open time window `[start, end)` in unix milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeWindow {
    pub start: i64,
    pub end: i64,
}

impl TimeWindow {
    pub fn new(start: i64, end: i64) -> Self {
        Self { start, end }
    }

    pub fn len_ms(&self) -> i64 {
        (self.end - self.start).max(0)
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// The window of equal length ending where this one starts.
    pub fn preceding(&self) -> Self {
        Self {
            start: self.start - self.len_ms(),
            end: self.start,
        }
    }
}

// ============================================================================
// Grouped Query Results
// ============================================================================

/// Sums and counts over a set of play events, as returned by grouped queries.
///
/// Averages and rates are derived from these so that summaries of disjoint
/// event sets can be merged exactly.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PlaySummary {
    pub total_plays: u64,
    pub unique_sessions: u64,
    pub duration_sum: f64,
    pub duration_samples: u64,
    pub completion_sum: f64,
    pub completion_samples: u64,
    pub skipped_plays: u64,
    pub replayed_plays: u64,
}

fn mean(sum: f64, samples: u64) -> f64 {
    if samples == 0 {
        0.0
    } else {
        sum / samples as f64
    }
}

fn percentage(part: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 * 100.0 / total as f64
    }
}

impl PlaySummary {
    pub fn avg_duration(&self) -> f64 {
        mean(self.duration_sum, self.duration_samples)
    }

    pub fn avg_completion_rate(&self) -> f64 {
        mean(self.completion_sum, self.completion_samples)
    }

    pub fn skip_rate(&self) -> f64 {
        percentage(self.skipped_plays, self.total_plays)
    }

    pub fn replay_rate(&self) -> f64 {
        percentage(self.replayed_plays, self.total_plays)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrackPlaySummary {
    pub track_id: String,
    pub summary: PlaySummary,
}

/// Session, device and network spread of a set of play events, plus the
/// per-sample means. None of these can be summed from daily rows.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AudienceStats {
    /// Distinct non-null IP addresses
    pub distinct_ips: u64,
    pub distinct_sources: u64,
    pub total_sessions: u64,
    /// Sessions with more than one play
    pub repeat_sessions: u64,
    /// Mean over plays that carry a duration
    pub avg_duration: f64,
    /// Mean over plays that carry a completion rate
    pub avg_completion_rate: f64,
}

// ============================================================================
// Derived Stats
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl Granularity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Granularity::Daily => "daily",
            Granularity::Weekly => "weekly",
            Granularity::Monthly => "monthly",
            Granularity::Yearly => "yearly",
        }
    }

    pub fn table_name(&self) -> &'static str {
        match self {
            Granularity::Daily => "daily_track_stats",
            Granularity::Weekly => "weekly_track_stats",
            Granularity::Monthly => "monthly_track_stats",
            Granularity::Yearly => "yearly_track_stats",
        }
    }

    /// Column holding the period key: a `YYYYMMDD` date, or a plain year.
    pub fn period_column(&self) -> &'static str {
        match self {
            Granularity::Daily => "date",
            Granularity::Weekly => "week_start",
            Granularity::Monthly => "month_start",
            Granularity::Yearly => "year",
        }
    }

    /// The table a rollup of this granularity reads from.
    pub fn finer(&self) -> Option<Granularity> {
        match self {
            Granularity::Daily => None,
            Granularity::Weekly => Some(Granularity::Daily),
            Granularity::Monthly => Some(Granularity::Weekly),
            Granularity::Yearly => Some(Granularity::Monthly),
        }
    }
}

impl std::fmt::Display for Granularity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One summary row of a stats table, keyed by `(track_id, period)`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackStats {
    pub granularity: Granularity,
    pub track_id: String,
    /// `YYYYMMDD` for daily/weekly/monthly rows, the year for yearly rows
    pub period: u32,
    pub total_plays: u64,
    pub unique_plays: u64,
    pub total_likes: u64,
    pub total_shares: u64,
    pub total_downloads: u64,
    pub total_saves: u64,
    pub avg_duration: f64,
    pub avg_completion_rate: f64,
    pub skip_rate: f64,
    pub replay_rate: f64,
}

// ============================================================================
// Artists & Scores
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtistSummary {
    pub id: String,
    pub name: String,
}

/// Persisted strength score, one per `(artist_id, time_range)`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArtistStrengthScore {
    pub artist_id: String,
    pub time_range: TimeRange,
    pub engagement_score: f64,
    pub growth_score: f64,
    pub quality_score: f64,
    pub potential_score: f64,
    pub overall_score: f64,
    pub updated_at: DateTime<Utc>,
}

/// A stored score joined with the artist's display name.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedArtist {
    pub artist_id: String,
    pub artist_name: String,
    pub overall_score: f64,
    pub engagement_score: f64,
    pub growth_score: f64,
    pub quality_score: f64,
    pub potential_score: f64,
    pub updated_at: DateTime<Utc>,
}
