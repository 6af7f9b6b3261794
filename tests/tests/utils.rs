use dexload::dispatcher::Dispatch;
use dexload::prelude::*;
use mock_service::{MockConfig, MockState};
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use url::Url;

#[allow(unused)]
pub fn init() {
    static ONCE_LOCK: OnceLock<()> = OnceLock::new();

    ONCE_LOCK.get_or_init(|| {
        let _ = tracing_subscriber::FmtSubscriber::builder()
            .with_env_filter("dexload=debug,mock_service=debug")
            .with_test_writer()
            .try_init();
    });
}

/// Start a mock service on an ephemeral port.
#[allow(unused)]
pub async fn mock(delay: Duration) -> (Url, Arc<MockState>) {
    init();
    let (addr, state) = mock_service::spawn(MockConfig { delay })
        .await
        .expect("mock service should bind");
    let base = Url::parse(&format!("http://{addr}")).expect("loopback URL");
    (base, state)
}

#[allow(unused)]
pub fn spec(label: &str, request_count: usize, concurrency: usize) -> ScenarioSpec {
    ScenarioSpec::try_new(label, request_count, concurrency).expect("non-zero scenario")
}

/// Run one batch over a fresh pool.
#[allow(unused)]
pub async fn dispatch<T: Target>(target: T, spec: &ScenarioSpec) -> Dispatch {
    dispatch_with(target, spec, DispatchConfig::default()).await
}

#[allow(unused)]
pub async fn dispatch_with<T: Target>(
    target: T,
    spec: &ScenarioSpec,
    config: DispatchConfig,
) -> Dispatch {
    let pool = Arc::new(ConnectionPool::new(spec.pool_config(), config).expect("client builds"));
    let batch = RequestDispatcher::new(Arc::new(target), pool.clone())
        .run(spec, &mut Interrupt::never())
        .await;
    pool.close();
    batch
}
