use mock_service::{MockConfig, MockState};
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("mock_service=info,tower_http=info")),
        )
        .init();

    let state = Arc::new(MockState::new(MockConfig {
        delay: Duration::from_millis(10),
    }));
    tokio::task::spawn(tps_measure_task(state.clone()));

    let addr: SocketAddr = ([0, 0, 0, 0], 8080).into();
    mock_service::serve(addr, state).await?;
    Ok(())
}

async fn tps_measure_task(state: Arc<MockState>) {
    let mut last = 0;
    loop {
        tokio::time::sleep(Duration::from_millis(1000)).await;
        let total = state.total();
        println!("{} TPS (peak in flight {})", total - last, state.peak());
        last = total;
    }
}
