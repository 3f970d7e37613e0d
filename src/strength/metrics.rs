use crate::analytics_store::{AudienceStats, PlaySummary};
use serde::Serialize;

/// Engagement counters and averages of an artist's tracks over a window.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BaseMetrics {
    pub total_plays: u64,
    /// Distinct listening sessions
    pub unique_plays: u64,
    pub total_likes: u64,
    pub total_shares: u64,
    pub total_downloads: u64,
    pub total_saves: u64,
    /// Seconds
    pub avg_duration: f64,
    /// Percentage, 0-100
    pub avg_completion_rate: f64,
    /// Percentage, 0-100
    pub skip_rate: f64,
    /// Percentage, 0-100
    pub replay_rate: f64,
}

impl BaseMetrics {
    pub fn from_play_summary(
        summary: &PlaySummary,
        total_likes: u64,
        total_shares: u64,
        total_downloads: u64,
        total_saves: u64,
    ) -> Self {
        Self {
            total_plays: summary.total_plays,
            unique_plays: summary.unique_sessions,
            total_likes,
            total_shares,
            total_downloads,
            total_saves,
            avg_duration: summary.avg_duration(),
            avg_completion_rate: summary.avg_completion_rate(),
            skip_rate: summary.skip_rate(),
            replay_rate: summary.replay_rate(),
        }
    }
}

/// Measures computed on top of the base metrics.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DerivedMetrics {
    /// Relative change in plays against the preceding window of equal length
    pub growth_velocity: f64,
    /// Plays per distinct session
    pub viral_coefficient: f64,
    /// Distinct non-null client IPs. A coarse stand-in for geography.
    pub geographic_reach: u64,
    pub cross_platform_score: f64,
    /// Percentage of sessions with more than one play
    pub retention_rate: f64,
}

impl DerivedMetrics {
    pub fn compute(base: &BaseMetrics, previous_plays: u64, audience: &AudienceStats) -> Self {
        Self {
            growth_velocity: growth_velocity(base.total_plays, previous_plays),
            viral_coefficient: viral_coefficient(base.total_plays, audience.total_sessions),
            geographic_reach: audience.distinct_ips,
            cross_platform_score: cross_platform_score(audience.distinct_sources, base.total_plays),
            retention_rate: retention_rate(audience.repeat_sessions, audience.total_sessions),
        }
    }
}

pub fn growth_velocity(current_plays: u64, previous_plays: u64) -> f64 {
    if previous_plays == 0 {
        if current_plays > 0 {
            1.0
        } else {
            0.0
        }
    } else {
        (current_plays as f64 - previous_plays as f64) / previous_plays as f64
    }
}

pub fn viral_coefficient(total_plays: u64, sessions: u64) -> f64 {
    if sessions == 0 {
        0.0
    } else {
        total_plays as f64 / sessions as f64
    }
}

pub fn cross_platform_score(distinct_sources: u64, total_plays: u64) -> f64 {
    if distinct_sources == 0 {
        return 0.0;
    }
    let sources = distinct_sources as f64;
    (10.0 * sources + (total_plays as f64 / sources) / 10.0).min(100.0)
}

pub fn retention_rate(repeat_sessions: u64, total_sessions: u64) -> f64 {
    if total_sessions == 0 {
        0.0
    } else {
        100.0 * repeat_sessions as f64 / total_sessions as f64
    }
}
