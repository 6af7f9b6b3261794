//! Reduce a scenario's outcomes into latency and throughput statistics.
use dexload_core::{AggregateResult, RequestOutcome, P99_MIN_SAMPLE};
use std::collections::BTreeMap;
use std::time::Duration;

/// Fold a completed outcome set into an [`AggregateResult`].
///
/// Latency statistics cover successful outcomes only and are all zero when there are none.
/// p95 is the 19th cut of a 20-quantile partition. p99 is the 99th cut of a 100-quantile
/// partition once there are at least [`P99_MIN_SAMPLE`] successes, and the maximum below that.
pub fn reduce(outcomes: &[RequestOutcome], total_duration: Duration) -> AggregateResult {
    let total_requests = outcomes.len();

    let mut latencies = Vec::with_capacity(total_requests);
    let mut errors = BTreeMap::new();
    for outcome in outcomes {
        match outcome.error() {
            None => latencies.push(outcome.latency_ms()),
            Some(err) => *errors.entry(err.kind).or_insert(0) += 1,
        }
    }
    latencies.sort_by(f64::total_cmp);

    let successful_requests = latencies.len();
    let failed_requests = total_requests - successful_requests;
    let total_duration_s = total_duration.as_secs_f64();

    let mut result = AggregateResult {
        total_requests,
        successful_requests,
        failed_requests,
        total_duration_s,
        requests_per_second: if total_duration_s > 0. {
            total_requests as f64 / total_duration_s
        } else {
            0.
        },
        error_rate_pct: if total_requests > 0 {
            failed_requests as f64 / total_requests as f64 * 100.
        } else {
            0.
        },
        errors,
        ..Default::default()
    };

    if let (Some(min), Some(max)) = (latencies.first(), latencies.last()) {
        result.avg_latency_ms = statistical::mean(&latencies);
        result.min_latency_ms = *min;
        result.max_latency_ms = *max;
        result.p95_latency_ms = quantile_cut(&latencies, 20, 19);
        result.p99_latency_ms = if latencies.len() >= P99_MIN_SAMPLE {
            quantile_cut(&latencies, 100, 99)
        } else {
            *max
        };
    }

    result
}

/// The `i`th of the `n - 1` cut points splitting `sorted` into `n` equal-probability groups.
///
/// Positions use the exclusive method (`i * (len + 1) / n`), clamped to the sample and
/// interpolated linearly between neighbours. On small samples high cuts extrapolate past the
/// largest value.
fn quantile_cut(sorted: &[f64], n: usize, i: usize) -> f64 {
    match sorted.len() {
        0 => 0.,
        1 => sorted[0],
        len => {
            let m = len + 1;
            let j = (i * m / n).clamp(1, len - 1);
            let delta = (i * m) as f64 - (j * n) as f64;
            let n = n as f64;
            (sorted[j - 1] * (n - delta) + sorted[j] * delta) / n
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dexload_core::{ErrorKind, RequestError, ResponseMetadata};
    use rand::{rngs::SmallRng, SeedableRng};
    use rand_distr::{Distribution, SkewNormal};

    fn ok(id: usize, ms: f64) -> RequestOutcome {
        RequestOutcome::success(
            id,
            Duration::from_secs_f64(ms / 1_000.),
            ResponseMetadata::Health { status: None },
        )
    }

    fn failed(id: usize, kind: ErrorKind) -> RequestOutcome {
        RequestOutcome::failure(id, Duration::from_millis(5), RequestError::new(kind, "boom"))
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-3
    }

    #[test]
    fn counts_always_add_up() {
        let mut outcomes: Vec<_> = (0..17).map(|i| ok(i, 10.)).collect();
        outcomes.extend((17..20).map(|i| failed(i, ErrorKind::Timeout)));

        let result = reduce(&outcomes, Duration::from_secs(2));

        assert_eq!(result.total_requests, 20);
        assert_eq!(result.successful_requests, 17);
        assert_eq!(result.failed_requests, 3);
        assert_eq!(
            result.successful_requests + result.failed_requests,
            result.total_requests
        );
        assert_eq!(result.error_rate_pct, 3. / 20. * 100.);
        assert_eq!(result.errors.get(&ErrorKind::Timeout), Some(&3));
    }

    #[test]
    fn failed_latencies_are_excluded() {
        let outcomes = vec![ok(0, 10.), ok(1, 30.), failed(2, ErrorKind::Transport)];
        let result = reduce(&outcomes, Duration::from_secs(1));

        assert!(close(result.avg_latency_ms, 20.));
        assert!(close(result.min_latency_ms, 10.));
        assert!(close(result.max_latency_ms, 30.));
    }

    #[test]
    fn all_failed_yields_zero_latency() {
        let outcomes: Vec<_> = (0..10)
            .map(|i| failed(i, ErrorKind::ProtocolStatus))
            .collect();
        let result = reduce(&outcomes, Duration::from_millis(500));

        assert_eq!(result.successful_requests, 0);
        assert_eq!(result.error_rate_pct, 100.);
        assert_eq!(result.avg_latency_ms, 0.);
        assert_eq!(result.min_latency_ms, 0.);
        assert_eq!(result.max_latency_ms, 0.);
        assert_eq!(result.p95_latency_ms, 0.);
        assert_eq!(result.p99_latency_ms, 0.);
    }

    #[test]
    fn throughput_over_wall_clock() {
        let outcomes: Vec<_> = (0..50).map(|i| ok(i, 1.)).collect();
        let result = reduce(&outcomes, Duration::from_millis(250));
        assert_eq!(result.requests_per_second, 50. / 0.25);
        assert_eq!(result.total_duration_s, 0.25);
    }

    #[test]
    fn zero_duration_has_zero_throughput() {
        let result = reduce(&[ok(0, 1.)], Duration::ZERO);
        assert_eq!(result.requests_per_second, 0.);
    }

    #[test]
    fn p95_interpolates_twenty_way_cut() {
        let outcomes: Vec<_> = (1..=20).map(|i| ok(i, i as f64)).collect();
        let result = reduce(&outcomes, Duration::from_secs(1));
        assert!(close(result.p95_latency_ms, 19.95));
    }

    #[test]
    fn p99_small_sample_is_max() {
        let outcomes: Vec<_> = (0..99).map(|i| ok(i, (i * 3 % 41) as f64)).collect();
        let result = reduce(&outcomes, Duration::from_secs(1));
        assert_eq!(result.p99_latency_ms, result.max_latency_ms);
        assert!(close(result.max_latency_ms, 40.));
    }

    #[test]
    fn p99_hundred_way_cut_from_hundred_samples() {
        let outcomes: Vec<_> = (1..=100).map(|i| ok(i, i as f64)).collect();
        let result = reduce(&outcomes, Duration::from_secs(1));
        assert!(close(result.p99_latency_ms, 99.99));
        assert!(result.p99_latency_ms < result.max_latency_ms);
    }

    #[test]
    fn high_cut_extrapolates_on_tiny_samples() {
        let outcomes = vec![ok(0, 10.), ok(1, 20.)];
        let result = reduce(&outcomes, Duration::from_secs(1));
        assert!(close(result.p95_latency_ms, 28.5));
        assert!(close(result.p99_latency_ms, 20.));
    }

    #[test]
    fn single_sample_stats() {
        let result = reduce(&[ok(0, 7.)], Duration::from_secs(1));
        assert!(close(result.p95_latency_ms, 7.));
        assert!(close(result.p99_latency_ms, 7.));
        assert!(close(result.avg_latency_ms, 7.));
    }

    #[test]
    fn skewed_sample_is_ordered() {
        let normal: SkewNormal<f64> = SkewNormal::new(40., 15., 20.).unwrap();
        let mut rng = SmallRng::seed_from_u64(42);
        let outcomes: Vec<_> = (0..500)
            .map(|i| ok(i, normal.sample(&mut rng).max(0.)))
            .collect();

        let result = reduce(&outcomes, Duration::from_secs(3));

        assert!(result.min_latency_ms <= result.avg_latency_ms);
        assert!(result.avg_latency_ms <= result.p95_latency_ms);
        assert!(result.p95_latency_ms <= result.p99_latency_ms);
        assert!(result.p99_latency_ms <= result.max_latency_ms);
    }

    #[test]
    fn quantile_cut_of_empty_is_zero() {
        assert_eq!(quantile_cut(&[], 20, 19), 0.);
    }
}
