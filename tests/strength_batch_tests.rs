//! Batch scoring with a registry that fails for one artist.

mod common;

use anyhow::{bail, Result};
use chrono::FixedOffset;
use common::{create_test_store, ARTIST_1_ID, ARTIST_2_ID, ARTIST_3_ID};
use pezzottify_analytics::analytics_store::{ArtistRegistry, ArtistSummary, ScoreStore};
use pezzottify_analytics::strength::{
    AggregatedMetricsSource, ConstantPotentialModel, MetricsSourcePolicy, RawEventMetricsSource,
};
use pezzottify_analytics::{ArtistStrengthCalculator, SqliteAnalyticsStore, TimeRange};
use std::sync::Arc;

/// Registry that cannot resolve the tracks of one artist.
struct FailingRegistry {
    inner: Arc<SqliteAnalyticsStore>,
    failing_artist: &'static str,
}

impl ArtistRegistry for FailingRegistry {
    fn get_artist_track_ids(&self, artist_id: &str) -> Result<Vec<String>> {
        if artist_id == self.failing_artist {
            bail!("registry unavailable for {}", artist_id);
        }
        self.inner.get_artist_track_ids(artist_id)
    }

    fn get_active_artists(&self) -> Result<Vec<ArtistSummary>> {
        self.inner.get_active_artists()
    }
}

fn create_calculator(store: Arc<SqliteAnalyticsStore>) -> ArtistStrengthCalculator {
    let offset = FixedOffset::east_opt(0).unwrap();
    let registry = Arc::new(FailingRegistry {
        inner: store.clone(),
        failing_artist: ARTIST_2_ID,
    });
    ArtistStrengthCalculator::new(
        registry,
        store.clone(),
        Arc::new(RawEventMetricsSource::new(store.clone())),
        Arc::new(AggregatedMetricsSource::new(store.clone(), store.clone(), offset)),
        MetricsSourcePolicy::Raw,
        Arc::new(ConstantPotentialModel::default()),
        2,
    )
    .unwrap()
}

#[test]
fn test_batch_continues_past_failing_artist() {
    let (_dir, _path, store) = create_test_store().unwrap();
    let store = Arc::new(store);
    let calculator = create_calculator(store.clone());

    let report = calculator
        .batch_calculate_scores(TimeRange::SevenDays)
        .unwrap();

    assert_eq!(report.scored, 2);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0, ARTIST_2_ID);
    assert!(report.failed[0].1.contains("registry unavailable"));

    for artist_id in [ARTIST_1_ID, ARTIST_3_ID] {
        assert!(store
            .get_strength_score(artist_id, TimeRange::SevenDays)
            .unwrap()
            .is_some());
    }
    assert!(store
        .get_strength_score(ARTIST_2_ID, TimeRange::SevenDays)
        .unwrap()
        .is_none());
}

#[test]
fn test_single_artist_failure_propagates() {
    let (_dir, _path, store) = create_test_store().unwrap();
    let calculator = create_calculator(Arc::new(store));

    let result = calculator.calculate_artist_strength_score(ARTIST_2_ID, TimeRange::SevenDays);
    assert!(result.is_err());
}

#[test]
fn test_top_artists_respects_limit_and_order() {
    let (_dir, _path, store) = create_test_store().unwrap();
    let calculator = create_calculator(Arc::new(store));
    calculator
        .batch_calculate_scores(TimeRange::SevenDays)
        .unwrap();

    let top = calculator
        .get_top_artists(TimeRange::SevenDays, 5)
        .unwrap();
    assert_eq!(top.len(), 2);
    assert!(top[0].overall_score >= top[1].overall_score);

    let top = calculator
        .get_top_artists(TimeRange::SevenDays, 1)
        .unwrap();
    assert_eq!(top.len(), 1);
    assert_eq!(top[0].artist_id, ARTIST_1_ID);
}

#[test]
fn test_unknown_time_range_name_is_rejected() {
    let result = "fortnight".parse::<TimeRange>();
    assert!(result.is_err());
}
