mod utils;
#[allow(unused)]
use utils::*;

mod tests {
    use super::*;

    use dexload::probe::BodyShape;
    use dexload::prelude::*;
    use std::time::Duration;

    #[tokio::test]
    async fn every_default_endpoint_passes() {
        let (base, state) = mock(Duration::ZERO).await;

        let checks = default_checks();
        let count = checks.len();
        let summary = run_checks(&base, checks).await.unwrap();

        assert!(summary.all_passed(), "{summary}");
        assert_eq!(summary.passed(), count);
        assert_eq!(state.total(), count as u64);
        assert!(summary.to_string().contains(&format!("Successful: {count}/{count}")));

        let analytics: Vec<_> = summary
            .results
            .iter()
            .filter(|r| r.check.path.starts_with("/api/analytics"))
            .collect();
        assert_eq!(analytics.len(), 9);
        assert!(analytics.iter().all(|r| r.passed()));

        let health = &summary.results[0];
        match &health.outcome {
            Ok(res) => assert!(matches!(&res.shape, BodyShape::Keys(keys) if keys.contains(&"status".to_string()))),
            Err(err) => panic!("health failed: {err}"),
        }
    }

    #[tokio::test]
    async fn missing_endpoint_fails_the_probe() {
        let (base, _) = mock(Duration::ZERO).await;

        let checks = vec![
            EndpointCheck::get("/health", "Health"),
            EndpointCheck::get("/api/missing", "Missing"),
        ];
        let summary = run_checks(&base, checks).await.unwrap();

        assert!(!summary.all_passed());
        assert!(summary.results[0].passed());
        assert!(!summary.results[1].passed());
        assert!(summary.to_string().contains("FAILED: Status 404"));
    }

    #[tokio::test]
    async fn slow_endpoint_times_out() {
        let (base, _) = mock(Duration::from_millis(500)).await;

        let checks = vec![EndpointCheck::get("/health", "Health").timeout(Duration::from_millis(50))];
        let summary = run_checks(&base, checks).await.unwrap();

        let err = summary.results[0].outcome.as_ref().unwrap_err();
        assert_eq!(err.kind, dexload::core::ErrorKind::Timeout);
    }
}
