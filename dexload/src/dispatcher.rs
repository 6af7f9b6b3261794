//! Bounded-concurrency request dispatch.
//!
//! Every logical request is its own task. A task waits for one of `concurrency` slots, then
//! times and performs exactly one call against the target. Nothing is retried, and a failure in
//! one request never touches another. Outcomes are collected once the whole batch is done and
//! handed back as a single collection in completion order; `request_id` carries submission
//! order.
use crate::interrupt::Interrupt;
use crate::pool::ConnectionPool;
use crate::target::Target;
use dexload_core::{ErrorKind, RequestError, RequestOutcome, ScenarioSpec};
use futures_util::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
#[allow(unused)]
use tracing::{debug, error, info, instrument, trace, warn};

/// Everything one batch produced.
#[derive(Debug)]
pub struct Dispatch {
    pub outcomes: Vec<RequestOutcome>,
    /// Wall-clock time from the first submission to the last collected outcome.
    pub elapsed: Duration,
    /// Set when the batch was cut short; `outcomes` then only holds the requests that finished.
    pub interrupted: bool,
}

pub struct RequestDispatcher<T> {
    target: Arc<T>,
    pool: Arc<ConnectionPool>,
}

impl<T: Target> RequestDispatcher<T> {
    pub fn new(target: Arc<T>, pool: Arc<ConnectionPool>) -> Self {
        Self { target, pool }
    }

    #[instrument(name = "dispatch", skip_all, fields(scenario = %spec.label))]
    pub async fn run(&self, spec: &ScenarioSpec, interrupt: &mut Interrupt) -> Dispatch {
        let request_count = spec.request_count.get();
        let concurrency = spec.concurrency.get();
        if concurrency > Semaphore::MAX_PERMITS {
            warn!("Concurrency {concurrency} capped at {}", Semaphore::MAX_PERMITS);
        }
        let gate = Arc::new(Semaphore::new(concurrency.min(Semaphore::MAX_PERMITS)));
        let label: Arc<str> = Arc::from(spec.label.as_str());

        let start = Instant::now();
        let mut tasks = JoinSet::new();
        for request_id in 0..request_count {
            let gate = gate.clone();
            let target = self.target.clone();
            let pool = self.pool.clone();
            let label = label.clone();

            tasks.spawn(async move {
                let Ok(_slot) = gate.acquire_owned().await else {
                    return RequestOutcome::failure(
                        request_id,
                        Duration::ZERO,
                        RequestError::new(ErrorKind::Interrupt, "dispatch gate closed"),
                    );
                };
                attempt(request_id, target.as_ref(), &pool, &label).await
            });
        }
        debug!("Submitted {request_count} requests to {}", self.target.name());

        let mut outcomes = Vec::with_capacity(request_count);
        let mut interrupted = false;
        loop {
            tokio::select! {
                joined = tasks.join_next() => match joined {
                    Some(Ok(outcome)) => outcomes.push(outcome),
                    Some(Err(err)) if err.is_cancelled() => {}
                    Some(Err(err)) => error!("Request task failed: {err}"),
                    None => break,
                },
                _ = interrupt.triggered(), if !interrupted => {
                    warn!("Interrupted with {} of {request_count} requests complete", outcomes.len());
                    tasks.abort_all();
                    gate.close();
                    interrupted = true;
                }
            }
        }

        Dispatch {
            outcomes,
            elapsed: start.elapsed(),
            interrupted,
        }
    }
}

/// One timed attempt. The clock starts after the slot is held, so queueing is not latency.
async fn attempt<T: Target>(
    request_id: usize,
    target: &T,
    pool: &ConnectionPool,
    #[allow(unused)] label: &str,
) -> RequestOutcome {
    #[cfg(feature = "metrics")]
    let _in_flight = InFlightGauge::enter(label);

    let start = Instant::now();
    let result = AssertUnwindSafe(target.call(pool))
        .catch_unwind()
        .await
        .unwrap_or_else(|_| Err(RequestError::transport("target panicked")));
    let latency = start.elapsed();

    let outcome = RequestOutcome {
        request_id,
        latency,
        result,
    };

    #[cfg(feature = "metrics")]
    record_metrics(label, &outcome);

    match &outcome.result {
        Ok(_) => trace!("Request {request_id} succeeded in {latency:?}"),
        Err(err) => trace!("Request {request_id} failed in {latency:?}: {err}"),
    }

    outcome
}

/// Holds one unit of the in-flight gauge until dropped, including when the task is aborted.
#[cfg(feature = "metrics")]
struct InFlightGauge(metrics::Gauge);

#[cfg(feature = "metrics")]
impl InFlightGauge {
    fn enter(label: &str) -> Self {
        let gauge = metrics::gauge!("dexload_in_flight", "scenario" => label.to_string());
        gauge.increment(1.);
        Self(gauge)
    }
}

#[cfg(feature = "metrics")]
impl Drop for InFlightGauge {
    fn drop(&mut self) {
        self.0.decrement(1.);
    }
}

#[cfg(feature = "metrics")]
fn record_metrics(label: &str, outcome: &RequestOutcome) {
    let scenario = label.to_string();
    metrics::histogram!("dexload_request_latency", "scenario" => scenario.clone())
        .record(outcome.latency_ms());

    match outcome.error() {
        None => metrics::counter!("dexload_request_success", "scenario" => scenario).increment(1),
        Some(err) => metrics::counter!(
            "dexload_request_error",
            "scenario" => scenario,
            "kind" => err.kind.to_string()
        )
        .increment(1),
    }
}
