#![doc = include_str!("../README.md")]

pub mod aggregator;
pub mod dispatcher;
pub mod error;
pub mod interrupt;
pub mod pool;
pub mod probe;
pub mod report;
pub mod runner;
pub mod target;

pub use dexload_core as core;

pub mod prelude {
    pub use crate::dispatcher::RequestDispatcher;
    pub use crate::error::DexloadError;
    pub use crate::interrupt::Interrupt;
    pub use crate::pool::ConnectionPool;
    pub use crate::probe::{default_checks, run_checks, EndpointCheck};
    pub use crate::report::{ScenarioReport, Summary};
    pub use crate::runner::{AbortReason, RunState, RunSummary, ScenarioRunner};
    pub use crate::target::{HealthTarget, QuoteTarget, StreamTarget, SwapTarget, Target};

    pub use dexload_core::{
        AggregateResult, DispatchConfig, QuotePayload, ScenarioSpec, SwapPayload,
    };
}
