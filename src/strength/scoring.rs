//! Sub-score formulas. Every term is clamped to [0, 1] before weighting, so
//! each score lands in [0, 100] for any input.

use super::metrics::{BaseMetrics, DerivedMetrics};
use super::potential::PotentialInputs;

pub const ENGAGEMENT_WEIGHT: f64 = 0.40;
pub const GROWTH_WEIGHT: f64 = 0.30;
pub const QUALITY_WEIGHT: f64 = 0.20;
pub const POTENTIAL_WEIGHT: f64 = 0.10;

fn unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

fn ratio(part: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64
    }
}

pub fn engagement_score(base: &BaseMetrics) -> f64 {
    let plays = base.total_plays;
    100.0
        * (0.30 * unit(base.avg_completion_rate / 100.0)
            + 0.25 * unit(base.replay_rate / 100.0)
            + 0.20 * unit(ratio(base.total_likes, plays) * 10.0)
            + 0.15 * unit(ratio(base.total_saves, plays) * 20.0)
            + 0.10 * unit(ratio(base.total_shares, plays) * 50.0))
}

pub fn growth_score(base: &BaseMetrics, derived: &DerivedMetrics, days_in_range: u32) -> f64 {
    let plays_per_day = base.total_plays as f64 / days_in_range.max(1) as f64;
    100.0
        * (0.40 * unit(plays_per_day / 100.0)
            + 0.30 * unit(ratio(base.unique_plays, base.total_plays))
            + 0.20 * unit(derived.geographic_reach as f64 / 10.0)
            + 0.10 * unit(derived.growth_velocity))
}

pub fn quality_score(base: &BaseMetrics, derived: &DerivedMetrics, inputs: &PotentialInputs) -> f64 {
    100.0
        * (0.40 * unit(1.0 - base.skip_rate / 100.0)
            + 0.30 * unit(derived.retention_rate / 100.0)
            + 0.20 * unit(derived.cross_platform_score / 100.0)
            + 0.10 * unit(inputs.genre_fit))
}

pub fn potential_score(derived: &DerivedMetrics, inputs: &PotentialInputs) -> f64 {
    100.0
        * (0.50 * unit(derived.viral_coefficient)
            + 0.30 * unit(inputs.market_position)
            + 0.20 * unit(inputs.demographic_appeal))
}

pub fn overall_score(engagement: f64, growth: f64, quality: f64, potential: f64) -> f64 {
    (ENGAGEMENT_WEIGHT * engagement
        + GROWTH_WEIGHT * growth
        + QUALITY_WEIGHT * quality
        + POTENTIAL_WEIGHT * potential)
        .clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEFAULT_INPUTS: PotentialInputs = PotentialInputs {
        genre_fit: 0.8,
        market_position: 0.75,
        demographic_appeal: 0.7,
    };

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_all_zero_metrics() {
        let base = BaseMetrics::default();
        let derived = DerivedMetrics::default();

        let engagement = engagement_score(&base);
        let growth = growth_score(&base, &derived, 7);
        let quality = quality_score(&base, &derived, &DEFAULT_INPUTS);
        let potential = potential_score(&derived, &DEFAULT_INPUTS);

        assert_eq!(engagement, 0.0);
        assert_eq!(growth, 0.0);
        // No skips counts as perfect skip behaviour; genre fit is a placeholder
        assert!(approx(quality, 48.0));
        assert!(approx(potential, 36.5));
        assert!(approx(
            overall_score(engagement, growth, quality, potential),
            0.2 * 48.0 + 0.1 * 36.5
        ));
    }

    #[test]
    fn test_saturated_metrics_cap_at_100() {
        let base = BaseMetrics {
            total_plays: 10_000,
            unique_plays: 10_000,
            total_likes: 10_000,
            total_shares: 10_000,
            total_downloads: 10_000,
            total_saves: 10_000,
            avg_duration: 300.0,
            avg_completion_rate: 100.0,
            skip_rate: 0.0,
            replay_rate: 100.0,
        };
        let derived = DerivedMetrics {
            growth_velocity: 12.0,
            viral_coefficient: 4.0,
            geographic_reach: 1_000,
            cross_platform_score: 100.0,
            retention_rate: 100.0,
        };
        let inputs = PotentialInputs {
            genre_fit: 1.0,
            market_position: 1.0,
            demographic_appeal: 1.0,
        };

        assert!(approx(engagement_score(&base), 100.0));
        assert!(approx(growth_score(&base, &derived, 1), 100.0));
        assert!(approx(quality_score(&base, &derived, &inputs), 100.0));
        assert!(approx(potential_score(&derived, &inputs), 100.0));
        assert!(approx(overall_score(100.0, 100.0, 100.0, 100.0), 100.0));
    }

    #[test]
    fn test_negative_velocity_and_out_of_range_rates_stay_in_bounds() {
        let base = BaseMetrics {
            total_plays: 10,
            unique_plays: 10,
            skip_rate: 150.0,
            avg_completion_rate: -20.0,
            ..Default::default()
        };
        let derived = DerivedMetrics {
            growth_velocity: -0.9,
            ..Default::default()
        };

        let engagement = engagement_score(&base);
        let growth = growth_score(&base, &derived, 30);
        let quality = quality_score(&base, &derived, &DEFAULT_INPUTS);
        for score in [engagement, growth, quality] {
            assert!((0.0..=100.0).contains(&score), "{} out of range", score);
        }
        // 10 plays over 30 days, every play from a distinct session
        assert!(approx(growth, 100.0 * (0.40 * (10.0 / 30.0) / 100.0 + 0.30)));
    }

    #[test]
    fn test_engagement_weights() {
        let base = BaseMetrics {
            total_plays: 100,
            avg_completion_rate: 50.0,
            replay_rate: 20.0,
            total_likes: 5,
            total_saves: 1,
            total_shares: 1,
            ..Default::default()
        };
        // 0.30*0.5 + 0.25*0.2 + 0.20*0.5 + 0.15*0.2 + 0.10*0.5
        assert!(approx(engagement_score(&base), 38.0));
    }
}
