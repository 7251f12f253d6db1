use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

fn parse_duration(input: &str) -> Result<Duration, String> {
    let s = input.trim();
    if s.is_empty() {
        return Err("duration cannot be empty (expected e.g. 120s, 250ms, 2m)".to_string());
    }
    if s.chars().all(|c| c.is_ascii_digit()) {
        return s
            .parse()
            .map(Duration::from_secs)
            .map_err(|_| format!("duration '{s}' is too large"));
    }
    humantime::parse_duration(s)
        .map_err(|err| format!("invalid duration '{s}': {err} (expected e.g. 120s, 250ms, 2m)"))
}

#[derive(Debug, Parser)]
#[command(
    name = "sweepr",
    author,
    version,
    about = "Sweeps load-generator configurations against server instances and ranks them",
    long_about = "sweepr measures how server instances degrade under an external load generator.\n\nFor each server in a plan it records a baseline, runs every candidate configuration while sampling CPU, memory and request latency, picks the configuration with the highest latency score (median + mean), and re-runs it against each path variant.\n\nResults are persisted per run; an interrupted sweep resumes where it stopped.",
    after_help = "Examples:\n  sweepr run plans/sample.yaml\n  sweepr run plans/sample.yaml --cooldown 30s --only nginx_current\n  sweepr status plans/sample.yaml\n  sweepr rank nginx_current --include-final"
)]
pub struct Cli {
    /// Debug-level logging (RUST_LOG overrides)
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run every pending run of a plan
    #[command(
        long_about = "Run the sweep described by a plan file.\n\nRuns already complete on disk are skipped. CLI flags override the plan's `settings`."
    )]
    Run(RunArgs),

    /// List a server's completed runs by latency score, highest first
    Rank(RankArgs),

    /// Show which runs of a plan are complete, incomplete or missing
    Status(StatusArgs),
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Path to the plan (.yaml)
    pub plan: PathBuf,

    /// Results root (otherwise `settings.outputDir`)
    #[arg(long, env = "SWEEPR_OUTPUT_DIR")]
    pub output_dir: Option<PathBuf>,

    /// Pause after instance start and after each run (e.g. 120s, 30s, 0)
    #[arg(long, env = "SWEEPR_COOLDOWN", value_parser = parse_duration)]
    pub cooldown: Option<Duration>,

    /// Probe requests per baseline run
    #[arg(long)]
    pub baseline_requests: Option<u64>,

    /// Sweep only these servers (repeatable)
    #[arg(long, value_name = "SERVER")]
    pub only: Vec<String>,
}

#[derive(Debug, Args)]
pub struct RankArgs {
    /// Server label (directory under the results root)
    pub server: String,

    /// Results root
    #[arg(long, env = "SWEEPR_OUTPUT_DIR", default_value = "results")]
    pub output_dir: PathBuf,

    /// Include finalized path-variant runs
    #[arg(long)]
    pub include_final: bool,
}

#[derive(Debug, Args)]
pub struct StatusArgs {
    /// Path to the plan (.yaml)
    pub plan: PathBuf,

    /// Results root (otherwise `settings.outputDir`)
    #[arg(long, env = "SWEEPR_OUTPUT_DIR")]
    pub output_dir: Option<PathBuf>,
}
