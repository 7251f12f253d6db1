#![forbid(unsafe_code)]

mod aggregate;
mod cancel;
mod error;
mod executor;
mod instance;
mod interrupt;
mod layout;
mod ledger;
mod metric;
mod plan;
mod plot;
mod probe;
mod run_config;
mod sample;
mod sampler;
mod selector;
mod source;
mod stats;
mod sweep;

pub use aggregate::aggregate_series;
pub use cancel::CancellationToken;
pub use error::{Error, Result};
pub use executor::{ExecutorSettings, LoadGenerator, RunExecutor, RunStats};
pub use instance::{ContainerControl, HostControl, InstanceControl, ServerInstance};
pub use interrupt::{CtrlCListener, Interrupt};
pub use layout::{
    BASELINE_LABEL, FINAL_PREFIX, LOG_FILE, OutputLayout, finalized_label, is_finalized_label,
};
pub use ledger::{RunState, is_complete, run_state};
pub use metric::Metric;
pub use plan::{ControlKind, PathVariant, Plan, PlanDuration, Settings};
pub use plot::render_series_plot;
pub use probe::{DEFAULT_BASELINE_REQUESTS, DEFAULT_PROBE_INTERVAL, LatencyProbe, ProbeOutcome};
pub use run_config::{DEFAULT_TARGET_URL, RunConfig};
pub use sample::{Sample, SampleSeries};
pub use sampler::{DEFAULT_SAMPLE_INTERVAL, sample_until_cancelled, spawn_sampler};
pub use selector::{RankedRun, Selection, best_of, rank_runs};
pub use source::{
    ContainerMetric, HostMetric, MetricSource, Sources, parse_loadavg, parse_meminfo,
};
pub use stats::Stats;
pub use sweep::{
    INSTANCE_START, RunOutcome, RunRecord, SweepController, SweepReport, SweepSettings,
};
