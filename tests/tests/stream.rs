mod utils;
#[allow(unused)]
use utils::*;

mod tests {
    use super::*;

    use dexload::aggregator::reduce;
    use dexload::core::{ErrorKind, ResponseMetadata};
    use dexload::prelude::*;
    use dexload::target::ws_endpoint;
    use std::time::Duration;

    #[tokio::test]
    async fn first_event_completes_each_request() {
        let (base, state) = mock(Duration::ZERO).await;
        let spec = spec("stream", 20, 5);

        let url = ws_endpoint(&base, "/ws").unwrap();
        let target = StreamTarget::new(url, &["execution", "routing"]);
        let batch = dispatch(target, &spec).await;
        let result = reduce(&batch.outcomes, batch.elapsed);

        assert_eq!(result.successful_requests, 20);
        assert!(batch.outcomes.iter().all(|o| o.metadata()
            == Some(&ResponseMetadata::Event {
                event_type: "execution".to_string()
            })));
        assert!(state.total() >= 20);
    }

    #[tokio::test]
    async fn silent_stream_times_out() {
        let (base, _) = mock(Duration::ZERO).await;
        let spec = spec("silent", 4, 2);
        let config = DispatchConfig {
            total_timeout: Duration::from_millis(150),
            ..Default::default()
        };

        // No event types: only the acknowledgement arrives.
        let url = ws_endpoint(&base, "/ws").unwrap();
        let target = StreamTarget::new(url, &[]);
        let batch = dispatch_with(target, &spec, config).await;
        let result = reduce(&batch.outcomes, batch.elapsed);

        assert_eq!(result.errors.get(&ErrorKind::Timeout), Some(&4));
    }

    #[tokio::test]
    async fn missing_socket_is_a_transport_failure() {
        let (base, _) = mock(Duration::ZERO).await;
        let spec = spec("no socket", 3, 3);

        let url = ws_endpoint(&base, "/not-a-socket").unwrap();
        let batch = dispatch(StreamTarget::new(url, &["execution"]), &spec).await;
        let result = reduce(&batch.outcomes, batch.elapsed);

        assert_eq!(result.errors.get(&ErrorKind::Transport), Some(&3));
    }
}
