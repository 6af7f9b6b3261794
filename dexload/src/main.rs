use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use dexload::prelude::*;
use dexload::target::ws_endpoint;
use dexload_core::DEFAULT_BASE_URL;
#[cfg(feature = "metrics")]
use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;
#[allow(unused)]
use tracing::{debug, error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use url::Url;

const DEFAULT_LOG_FILTER: &str = "dexload=info";
const STREAM_EVENT_TYPES: &[&str] = &["execution", "routing", "slippage", "failure"];

/// Scenario-driven load tester for DEX aggregator APIs.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Base URL of the API under test
    #[arg(short, long, default_value = DEFAULT_BASE_URL, global = true)]
    base_url: Url,

    /// Request kind each scenario drives
    #[arg(short, long, value_enum, default_value_t = TargetKind::Quote)]
    target: TargetKind,

    /// Health path for `--target health`
    #[arg(long, default_value = "/health")]
    health_path: String,

    /// WebSocket path for `--target stream`
    #[arg(long, default_value = "/api/trade-streaming/ws")]
    ws_path: String,

    /// Also print each scenario result as a JSON line
    #[arg(long)]
    json: bool,

    /// Serve Prometheus metrics on this address
    #[cfg(feature = "metrics")]
    #[arg(long)]
    metrics_addr: Option<SocketAddr>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check every API endpoint once
    Probe,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum TargetKind {
    Quote,
    Swap,
    Health,
    Stream,
}

#[tokio::main]
async fn main() -> ExitCode {
    FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(code) => code,
        Err(err) => {
            error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    #[cfg(feature = "metrics")]
    if let Some(addr) = cli.metrics_addr {
        metrics_exporter_prometheus::PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()?;
        info!("Serving metrics on {addr}");
    }

    match cli.command {
        Some(Command::Probe) => probe(&cli.base_url).await,
        None => load(&cli).await,
    }
}

async fn probe(base: &Url) -> Result<ExitCode> {
    println!("Testing API integration at {base}");
    println!("{}", "=".repeat(50));

    let summary = run_checks(base, default_checks()).await?;
    println!("{summary}");

    Ok(if summary.all_passed() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

async fn load(cli: &Cli) -> Result<ExitCode> {
    let base = &cli.base_url;
    let runner = ScenarioRunner::new(ScenarioSpec::default_plan());

    println!("DEX AGGREGATOR LOAD TEST");
    println!("Target: {base} ({:?})", cli.target);
    for spec in runner.plan() {
        println!("  {spec}");
    }
    println!();

    let summary = match cli.target {
        TargetKind::Quote => {
            let target = QuoteTarget::new(base, QuotePayload::default())?;
            run_plan(runner, target, cli.json).await
        }
        TargetKind::Swap => {
            let target = SwapTarget::new(base, SwapPayload::default())?;
            run_plan(runner, target, cli.json).await
        }
        TargetKind::Health => {
            let target = HealthTarget::new(base, &cli.health_path)?;
            run_plan(runner, target, cli.json).await
        }
        TargetKind::Stream => {
            let target = StreamTarget::new(ws_endpoint(base, &cli.ws_path)?, STREAM_EVENT_TYPES);
            run_plan(runner, target, cli.json).await
        }
    };

    println!();
    println!("{}", Summary(&summary.reports));
    match &summary.state {
        RunState::Aborted(AbortReason::Failed(reason)) => error!("Run aborted: {reason}"),
        RunState::Aborted(AbortReason::Interrupted) => warn!("Run interrupted"),
        _ => {}
    }

    Ok(ExitCode::from(summary.state.exit_code()))
}

async fn run_plan<T: Target>(mut runner: ScenarioRunner, target: T, json: bool) -> RunSummary {
    runner
        .run(Arc::new(target), Interrupt::ctrl_c(), |report| {
            println!("{report}\n");
            if json {
                match serde_json::to_string(report) {
                    Ok(line) => println!("{line}"),
                    Err(err) => warn!("Unable to serialize report: {err}"),
                }
            }
        })
        .await
}
