//! Sequential execution of a scenario plan.
//!
//! Scenarios run one after another with a settle pause between them, each with its own
//! connection pool. The first interrupt or failure stops the whole queue; nothing is skipped
//! or retried.
use crate::aggregator;
use crate::dispatcher::RequestDispatcher;
use crate::error::DexloadError;
use crate::interrupt::Interrupt;
use crate::pool::ConnectionPool;
use crate::report::ScenarioReport;
use crate::target::Target;
use dexload_core::{DispatchConfig, ScenarioSpec, DEFAULT_SCENARIO_PAUSE};
use std::sync::Arc;
use std::time::Duration;
#[allow(unused)]
use tracing::{debug, error, info, instrument, trace, warn, Instrument};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RunState {
    Pending,
    Running,
    Completed,
    Aborted(AbortReason),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AbortReason {
    Interrupted,
    Failed(String),
}

impl RunState {
    /// Process exit status for a run that ended in this state.
    pub fn exit_code(&self) -> u8 {
        match self {
            RunState::Completed => 0,
            RunState::Aborted(AbortReason::Interrupted) => 130,
            _ => 1,
        }
    }
}

#[derive(Debug)]
pub struct RunSummary {
    pub state: RunState,
    /// One report per scenario that ran, in plan order. An interrupted scenario's report is
    /// included and marked partial.
    pub reports: Vec<ScenarioReport>,
}

pub struct ScenarioRunner {
    plan: Vec<ScenarioSpec>,
    dispatch: DispatchConfig,
    pause: Duration,
    state: RunState,
}

impl ScenarioRunner {
    pub fn new(plan: Vec<ScenarioSpec>) -> Self {
        Self {
            plan,
            dispatch: DispatchConfig::default(),
            pause: DEFAULT_SCENARIO_PAUSE,
            state: RunState::Pending,
        }
    }

    pub fn dispatch_config(mut self, dispatch: DispatchConfig) -> Self {
        self.dispatch = dispatch;
        self
    }

    /// Settle time between consecutive scenarios.
    pub fn pause(mut self, pause: Duration) -> Self {
        self.pause = pause;
        self
    }

    pub fn plan(&self) -> &[ScenarioSpec] {
        &self.plan
    }

    pub fn state(&self) -> &RunState {
        &self.state
    }

    /// Run the plan against `target`, calling `on_report` as each scenario finishes.
    #[instrument(name = "run", skip_all, fields(target = target.name()))]
    pub async fn run<T: Target>(
        &mut self,
        target: Arc<T>,
        mut interrupt: Interrupt,
        mut on_report: impl FnMut(&ScenarioReport),
    ) -> RunSummary {
        info!(
            "Running {} scenarios ({})",
            self.plan.len(),
            self.dispatch
        );
        self.state = RunState::Running;

        let mut reports = Vec::with_capacity(self.plan.len());
        for (idx, spec) in self.plan.iter().enumerate() {
            if idx > 0 {
                debug!("Settling for {}", humantime::format_duration(self.pause));
                tokio::select! {
                    _ = tokio::time::sleep(self.pause) => {}
                    _ = interrupt.triggered() => {
                        warn!("Interrupted between scenarios");
                        self.state = RunState::Aborted(AbortReason::Interrupted);
                        break;
                    }
                }
            }

            match run_scenario(spec, self.dispatch, target.clone(), &mut interrupt).await {
                Ok(report) => {
                    on_report(&report);
                    let partial = report.partial;
                    reports.push(report);

                    if partial {
                        self.state = RunState::Aborted(AbortReason::Interrupted);
                        break;
                    }
                }
                Err(err) => {
                    error!("Scenario {} failed: {err}", spec.label);
                    self.state = RunState::Aborted(AbortReason::Failed(err.to_string()));
                    break;
                }
            }
        }

        if self.state == RunState::Running {
            self.state = RunState::Completed;
        }
        info!("Run finished: {:?}", self.state);

        RunSummary {
            state: self.state.clone(),
            reports,
        }
    }
}

#[instrument(name = "scenario", skip_all, fields(name = %spec.label))]
async fn run_scenario<T: Target>(
    spec: &ScenarioSpec,
    dispatch: DispatchConfig,
    target: Arc<T>,
    interrupt: &mut Interrupt,
) -> Result<ScenarioReport, DexloadError> {
    info!("Starting {spec}");

    let pool = Arc::new(ConnectionPool::new(spec.pool_config(), dispatch)?);
    let batch = RequestDispatcher::new(target, pool.clone())
        .run(spec, interrupt)
        .await;
    pool.close();

    let result = aggregator::reduce(&batch.outcomes, batch.elapsed);
    info!(
        "Scenario complete: {}/{} ok, {:.1} rps, p95={:.1}ms",
        result.successful_requests,
        result.total_requests,
        result.requests_per_second,
        result.p95_latency_ms
    );

    Ok(ScenarioReport::new(spec.clone(), result, batch.interrupted))
}
