mod utils;
#[allow(unused)]
use utils::*;

mod tests {
    use super::*;

    use dexload::aggregator::reduce;
    use dexload::core::{ErrorKind, ResponseMetadata};
    use dexload::prelude::*;
    use dexload::report::HealthBand;
    use std::sync::Arc;
    use std::time::Duration;
    use url::Url;

    #[tokio::test]
    async fn basic_concurrent_load_is_clean() {
        let (base, state) = mock(Duration::ZERO).await;
        let spec = spec("Basic concurrent load", 100, 25);

        let target = QuoteTarget::new(&base, QuotePayload::default()).unwrap();
        let batch = dispatch(target, &spec).await;
        let result = reduce(&batch.outcomes, batch.elapsed);

        assert!(!batch.interrupted);
        assert_eq!(result.total_requests, 100);
        assert_eq!(result.successful_requests, 100);
        assert_eq!(result.error_rate_pct, 0.);
        assert!(result.errors.is_empty());
        assert_eq!(state.total(), 100);

        for outcome in &batch.outcomes {
            match outcome.metadata() {
                Some(ResponseMetadata::Quote {
                    routes_count,
                    amount_out,
                    ..
                }) => {
                    assert_eq!(*routes_count, 2);
                    assert_eq!(amount_out.as_deref(), Some("3012450000"));
                }
                other => panic!("unexpected metadata: {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn server_never_sees_more_than_the_concurrency() {
        let (base, state) = mock(Duration::from_millis(50)).await;
        let spec = spec("capped", 60, 12);

        let target = QuoteTarget::new(&base, QuotePayload::default()).unwrap();
        let batch = dispatch(target, &spec).await;

        assert_eq!(batch.outcomes.len(), 60);
        assert!(state.peak() <= 12, "peak was {}", state.peak());
        assert!(state.peak() > 1);
        // Five waves of 50ms at minimum.
        assert!(batch.elapsed >= Duration::from_millis(250));
    }

    #[tokio::test]
    async fn non_2xx_statuses_are_failures() {
        let (base, _) = mock(Duration::ZERO).await;
        let spec = spec("failing", 30, 10);

        let target = QuoteTarget::with_path(&base, "/status/500", QuotePayload::default()).unwrap();
        let batch = dispatch(target, &spec).await;
        let result = reduce(&batch.outcomes, batch.elapsed);

        assert_eq!(result.failed_requests, 30);
        assert_eq!(result.error_rate_pct, 100.);
        assert_eq!(result.errors.get(&ErrorKind::ProtocolStatus), Some(&30));
        assert_eq!(result.p95_latency_ms, 0.);

        let report = ScenarioReport::new(spec, result, batch.interrupted);
        assert_eq!(report.band, HealthBand::Poor);
        assert!(report.to_string().contains("status:"));

        let err = batch.outcomes[0].error().unwrap();
        assert_eq!(err.message, "HTTP 500");
    }

    #[tokio::test]
    async fn malformed_body_is_a_raw_success() {
        let (base, _) = mock(Duration::ZERO).await;
        let spec = spec("malformed", 10, 5);

        let target = QuoteTarget::with_path(&base, "/malformed", QuotePayload::default()).unwrap();
        let batch = dispatch(target, &spec).await;

        assert!(batch.outcomes.iter().all(|o| o.is_success()));
        assert!(batch
            .outcomes
            .iter()
            .all(|o| matches!(o.metadata(), Some(ResponseMetadata::Raw { text }) if text.starts_with("<html>"))));
    }

    #[tokio::test]
    async fn rate_limited_endpoint_mixes_outcomes() {
        let (base, _) = mock(Duration::ZERO).await;
        let spec = spec("limited", 40, 10);

        let target =
            QuoteTarget::with_path(&base, "/limited/5/quote", QuotePayload::default()).unwrap();
        let batch = dispatch(target, &spec).await;
        let result = reduce(&batch.outcomes, batch.elapsed);

        assert_eq!(result.total_requests, 40);
        assert!(result.successful_requests >= 1);
        assert!(result.failed_requests >= 1);
        assert_eq!(
            result.errors.get(&ErrorKind::ProtocolStatus),
            Some(&result.failed_requests)
        );
    }

    #[tokio::test]
    async fn swap_metadata_is_captured() {
        let (base, _) = mock(Duration::ZERO).await;
        let spec = spec("swap", 10, 5);

        let target = SwapTarget::new(&base, SwapPayload::default()).unwrap();
        let batch = dispatch(target, &spec).await;

        for outcome in &batch.outcomes {
            match outcome.metadata() {
                Some(ResponseMetadata::Swap {
                    tx_hash: Some(tx_hash),
                    amount_out,
                    gas_used,
                }) => {
                    assert!(tx_hash.starts_with("0x"));
                    assert_eq!(tx_hash.len(), 66);
                    assert_eq!(amount_out.as_deref(), Some("250000000"));
                    assert_eq!(*gas_used, Some(152_340));
                }
                other => panic!("unexpected metadata: {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn health_target_reads_status() {
        let (base, _) = mock(Duration::ZERO).await;
        let spec = spec("health", 5, 5);

        let target = HealthTarget::new(&base, "/api/portfolio/health").unwrap();
        let batch = dispatch(target, &spec).await;

        assert!(batch.outcomes.iter().all(|o| o.metadata()
            == Some(&ResponseMetadata::Health {
                status: Some("healthy".to_string())
            })));
    }

    #[tokio::test]
    async fn slow_responses_time_out() {
        let (base, _) = mock(Duration::from_millis(500)).await;
        let spec = spec("slow", 6, 3);
        let config = DispatchConfig {
            total_timeout: Duration::from_millis(100),
            ..Default::default()
        };

        let target = QuoteTarget::new(&base, QuotePayload::default()).unwrap();
        let batch = dispatch_with(target, &spec, config).await;
        let result = reduce(&batch.outcomes, batch.elapsed);

        assert_eq!(result.errors.get(&ErrorKind::Timeout), Some(&6));
        assert!(batch.elapsed < Duration::from_millis(500));
    }

    #[tokio::test]
    async fn refused_connections_are_transport_failures() {
        init();
        let base = Url::parse("http://127.0.0.1:9").unwrap();
        let spec = spec("refused", 8, 4);

        let target = QuoteTarget::new(&base, QuotePayload::default()).unwrap();
        let batch = dispatch(target, &spec).await;
        let result = reduce(&batch.outcomes, batch.elapsed);

        assert_eq!(result.failed_requests, 8);
        assert_eq!(result.errors.get(&ErrorKind::Transport), Some(&8));
    }

    #[tokio::test]
    async fn runner_executes_plan_against_service() {
        let (base, state) = mock(Duration::from_millis(2)).await;
        let plan = vec![spec("Warm-up test", 20, 4), spec("Basic concurrent load", 40, 10)];

        let target = QuoteTarget::new(&base, QuotePayload::default()).unwrap();
        let mut runner = ScenarioRunner::new(plan).pause(Duration::from_millis(50));

        let mut printed = vec![];
        let summary = runner
            .run(Arc::new(target), Interrupt::never(), |report| {
                printed.push(report.to_string())
            })
            .await;

        assert_eq!(summary.state, RunState::Completed);
        assert_eq!(summary.state.exit_code(), 0);
        assert_eq!(summary.reports.len(), 2);
        assert_eq!(printed.len(), 2);
        assert!(printed[1].contains("LOAD TEST RESULTS: Basic concurrent load"));
        assert_eq!(state.total(), 60);
        assert!(summary.reports.iter().all(|r| r.result.error_rate_pct == 0.));
    }

    #[tokio::test]
    async fn interrupt_mid_scenario_reports_partial_results() {
        let (base, _) = mock(Duration::from_millis(100)).await;
        let plan = vec![spec("long", 100, 5), spec("never runs", 10, 5)];
        let (handle, interrupt) = Interrupt::pair();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(350)).await;
            handle.trigger();
        });

        let target = QuoteTarget::new(&base, QuotePayload::default()).unwrap();
        let mut runner = ScenarioRunner::new(plan).pause(Duration::ZERO);
        let summary = runner.run(Arc::new(target), interrupt, |_| {}).await;

        assert_eq!(summary.state, RunState::Aborted(AbortReason::Interrupted));
        assert_eq!(summary.state.exit_code(), 130);
        assert_eq!(summary.reports.len(), 1);

        let report = &summary.reports[0];
        assert!(report.partial);
        assert!(report.result.total_requests > 0);
        assert!(report.result.total_requests < 100);
        assert_eq!(
            report.result.successful_requests + report.result.failed_requests,
            report.result.total_requests
        );
    }
}
