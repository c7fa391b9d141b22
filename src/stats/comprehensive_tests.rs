//! Property-based tests for the statistics reducer

use super::{round3, StatisticsSummary};
use crate::models::ProbeRecord;
use proptest::collection::vec;
use proptest::prelude::*;

/// Property-based test generators
mod generators {
    use super::*;

    /// A probe outcome: failed about a quarter of the time
    pub fn elapsed_seconds() -> impl Strategy<Value = f64> {
        prop_oneof![
            1 => Just(-1.0),
            3 => 0.0f64..5.0,
        ]
    }

    pub fn records() -> impl Strategy<Value = Vec<ProbeRecord>> {
        vec(elapsed_seconds(), 1..200).prop_map(|values| {
            values
                .into_iter()
                .map(|seconds| ProbeRecord::from_seconds(seconds, "127.0.0.1", 80))
                .collect()
        })
    }
}

proptest! {
    /// Every record lands in exactly one bucket
    #[test]
    fn partition_is_complete(records in generators::records()) {
        let summary = StatisticsSummary::summarize(&records, "127.0.0.1", 80).unwrap();
        prop_assert_eq!(summary.successful + summary.failed, summary.total);
        prop_assert_eq!(summary.total, records.len());
    }

    /// Loss percentage is exactly failed / total * 100
    #[test]
    fn loss_percentage_is_exact(records in generators::records()) {
        let summary = StatisticsSummary::summarize(&records, "127.0.0.1", 80).unwrap();
        let expected = summary.failed as f64 / summary.total as f64 * 100.0;
        prop_assert_eq!(summary.loss_percentage, expected);
        prop_assert!((0.0..=100.0).contains(&summary.loss_percentage));
    }

    /// Average sits between min and max, all over successes only
    #[test]
    fn average_between_min_and_max(records in generators::records()) {
        let summary = StatisticsSummary::summarize(&records, "127.0.0.1", 80).unwrap();
        if summary.successful == 0 {
            prop_assert_eq!(summary.min_ms, 0.0);
            prop_assert_eq!(summary.max_ms, 0.0);
            prop_assert_eq!(summary.average_ms, 0.0);
        } else {
            prop_assert!(summary.min_ms <= summary.average_ms + 1e-9);
            prop_assert!(summary.average_ms <= summary.max_ms + 1e-9);
            prop_assert!(summary.min_ms >= 0.0);
        }
    }

    /// Failed records never influence the timing figures
    #[test]
    fn failures_do_not_move_timings(
        records in generators::records(),
        extra_failures in 1usize..20,
    ) {
        let base = StatisticsSummary::summarize(&records, "127.0.0.1", 80).unwrap();

        let mut padded = records.clone();
        padded.extend((0..extra_failures).map(|_| ProbeRecord::failed("127.0.0.1", 80)));
        let with_failures = StatisticsSummary::summarize(&padded, "127.0.0.1", 80).unwrap();

        prop_assert_eq!(base.min_ms, with_failures.min_ms);
        prop_assert_eq!(base.max_ms, with_failures.max_ms);
        prop_assert_eq!(base.average_ms, with_failures.average_ms);
        prop_assert_eq!(with_failures.failed, base.failed + extra_failures);
    }

    /// Rounding never moves a value by more than half a thousandth
    #[test]
    fn round3_is_close(value in 0.0f64..100000.0) {
        prop_assert!((round3(value) - value).abs() <= 0.0005 + 1e-9);
    }

    /// The rendered summary always prints floats with a fractional part
    #[test]
    fn display_keeps_fractional_digits(records in generators::records()) {
        let summary = StatisticsSummary::summarize(&records, "127.0.0.1", 80).unwrap();
        let text = summary.to_string();
        let fails_line = text.lines().nth(2).unwrap();
        let value = fails_line.trim_start_matches("Fails percentage: ");
        prop_assert!(value.contains('.'), "missing fractional digits in {:?}", value);
    }
}
