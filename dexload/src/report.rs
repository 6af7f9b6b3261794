//! Health classification and the text report.
use dexload_core::{AggregateResult, ScenarioSpec};
use serde::Serialize;
use std::fmt;

const RULE_WIDTH: usize = 60;
const SECTION_WIDTH: usize = 30;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum HealthBand {
    Excellent,
    Good,
    Acceptable,
    Poor,
}

impl HealthBand {
    pub fn description(&self) -> &'static str {
        match self {
            HealthBand::Excellent => "Zero errors, 100+ RPS",
            HealthBand::Good => "Low error rate, decent throughput",
            HealthBand::Acceptable => "Some errors, needs optimization",
            HealthBand::Poor => "High error rate, system overloaded",
        }
    }
}

impl fmt::Display for HealthBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HealthBand::Excellent => "EXCELLENT",
            HealthBand::Good => "GOOD",
            HealthBand::Acceptable => "ACCEPTABLE",
            HealthBand::Poor => "POOR",
        };
        f.write_str(name)
    }
}

/// Band a result by error rate and throughput. First matching band wins.
pub fn classify(result: &AggregateResult) -> HealthBand {
    let error_rate = result.error_rate_pct;
    let rps = result.requests_per_second;

    if error_rate == 0. && rps >= 100. {
        HealthBand::Excellent
    } else if error_rate < 1. && rps >= 50. {
        HealthBand::Good
    } else if error_rate < 5. {
        HealthBand::Acceptable
    } else {
        HealthBand::Poor
    }
}

/// One scenario's result, ready to print.
#[derive(Clone, Debug, Serialize)]
pub struct ScenarioReport {
    pub spec: ScenarioSpec,
    pub result: AggregateResult,
    pub band: HealthBand,
    /// The scenario was interrupted; `result` only covers requests that had finished.
    pub partial: bool,
}

impl ScenarioReport {
    pub fn new(spec: ScenarioSpec, result: AggregateResult, partial: bool) -> Self {
        let band = classify(&result);
        Self {
            spec,
            result,
            band,
            partial,
        }
    }
}

impl fmt::Display for ScenarioReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let r = &self.result;
        let rule = "=".repeat(RULE_WIDTH);
        let section = "-".repeat(SECTION_WIDTH);

        writeln!(f, "{rule}")?;
        writeln!(f, "LOAD TEST RESULTS: {}", self.spec.label)?;
        writeln!(f, "{rule}")?;
        if self.partial {
            writeln!(
                f,
                "PARTIAL: interrupted after {} of {} requests",
                r.total_requests, self.spec.request_count
            )?;
        }
        writeln!(f, "{:<21}{}", "Total Requests:", thousands(r.total_requests))?;
        writeln!(f, "{:<21}{}", "Successful:", thousands(r.successful_requests))?;
        writeln!(f, "{:<21}{}", "Failed:", thousands(r.failed_requests))?;
        writeln!(f, "{:<21}{:.2}%", "Error Rate:", r.error_rate_pct)?;
        writeln!(f, "{:<21}{:.2}s", "Total Duration:", r.total_duration_s)?;
        writeln!(f, "{:<21}{:.1}", "Requests/Second:", r.requests_per_second)?;
        writeln!(f)?;
        writeln!(f, "RESPONSE TIME METRICS")?;
        writeln!(f, "{section}")?;
        writeln!(f, "{:<21}{:.1}ms", "Average:", r.avg_latency_ms)?;
        writeln!(f, "{:<21}{:.1}ms", "Minimum:", r.min_latency_ms)?;
        writeln!(f, "{:<21}{:.1}ms", "Maximum:", r.max_latency_ms)?;
        writeln!(f, "{:<21}{:.1}ms", "95th Percentile:", r.p95_latency_ms)?;
        writeln!(f, "{:<21}{:.1}ms", "99th Percentile:", r.p99_latency_ms)?;
        writeln!(f)?;

        if !r.errors.is_empty() {
            writeln!(f, "ERRORS")?;
            writeln!(f, "{section}")?;
            for (kind, count) in &r.errors {
                writeln!(f, "{:<21}{}", format!("{kind}:"), thousands(*count))?;
            }
            writeln!(f)?;
        }

        write!(f, "{}: {}", self.band, self.band.description())
    }
}

/// One line per scenario.
pub struct Summary<'a>(pub &'a [ScenarioReport]);

impl fmt::Display for Summary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", "=".repeat(RULE_WIDTH))?;
        writeln!(
            f,
            "{:<24}{:>10}{:>10}{:>9}  {}",
            "SCENARIO", "RPS", "P95(ms)", "ERR%", "HEALTH"
        )?;
        for report in self.0 {
            let r = &report.result;
            writeln!(
                f,
                "{:<24}{:>10.1}{:>10.1}{:>9.2}  {}{}",
                report.spec.label,
                r.requests_per_second,
                r.p95_latency_ms,
                r.error_rate_pct,
                report.band,
                if report.partial { " (partial)" } else { "" }
            )?;
        }
        write!(f, "{}", "=".repeat(RULE_WIDTH))
    }
}

fn thousands(n: usize) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}
