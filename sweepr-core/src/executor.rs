use std::fs::OpenOptions;
use std::path::Path;
use std::process::Stdio;
use std::time::{Duration, Instant};

use sweepr_http::HttpClient;
use tokio::process::Command;
use tokio::task::JoinHandle;

use crate::aggregate::aggregate_series;
use crate::cancel::CancellationToken;
use crate::error::{Error, Result};
use crate::layout::LOG_FILE;
use crate::metric::Metric;
use crate::probe::{DEFAULT_BASELINE_REQUESTS, DEFAULT_PROBE_INTERVAL, LatencyProbe};
use crate::run_config::RunConfig;
use crate::sample::SampleSeries;
use crate::sampler::{DEFAULT_SAMPLE_INTERVAL, spawn_sampler};
use crate::source::{MetricSource, Sources};
use crate::stats::Stats;

/// External load generator: program plus leading arguments. Per-run flags are appended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadGenerator {
    pub program: String,
    pub args: Vec<String>,
}

impl Default for LoadGenerator {
    fn default() -> Self {
        Self {
            program: "go".to_string(),
            args: vec!["run".to_string(), "main.go".to_string()],
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExecutorSettings {
    pub sample_interval: Duration,
    pub probe_interval: Duration,
    pub request_timeout: Option<Duration>,
    pub baseline_requests: u64,
    /// Upper bound on a load generator's lifetime; `None` waits forever.
    pub attack_timeout: Option<Duration>,
    pub load_generator: LoadGenerator,
}

impl Default for ExecutorSettings {
    fn default() -> Self {
        Self {
            sample_interval: DEFAULT_SAMPLE_INTERVAL,
            probe_interval: DEFAULT_PROBE_INTERVAL,
            request_timeout: Some(Duration::from_secs(5)),
            baseline_requests: DEFAULT_BASELINE_REQUESTS,
            attack_timeout: Some(Duration::from_secs(30 * 60)),
            load_generator: LoadGenerator::default(),
        }
    }
}

/// Stats of one finished run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunStats {
    pub cpu: Stats,
    pub mem: Stats,
    pub latency: Stats,
}

/// Executes single measurement runs: samplers in the background, the latency probe in
/// the foreground, then aggregation into the run directory.
#[derive(Debug, Clone)]
pub struct RunExecutor {
    client: HttpClient,
    settings: ExecutorSettings,
}

impl RunExecutor {
    pub fn new(client: HttpClient, settings: ExecutorSettings) -> Self {
        Self { client, settings }
    }

    /// Resting levels: a fixed number of probe requests with no load generator running.
    pub async fn baseline<S>(
        &self,
        sources: &Sources<S>,
        url: &str,
        run_dir: &Path,
    ) -> Result<RunStats>
    where
        S: MetricSource + Clone,
    {
        tokio::fs::create_dir_all(run_dir).await?;
        self.warm_up(url).await;

        let samplers = Samplers::spawn(sources, self.settings.sample_interval);
        let outcome = self
            .probe(url)
            .run_iterations(self.settings.baseline_requests)
            .await;
        let (cpu, mem) = samplers.stop().await?;

        tracing::info!(
            run_dir = %run_dir.display(),
            attempts = outcome.attempts,
            failures = outcome.failures,
            "baseline measurement finished"
        );
        aggregate_run(cpu, mem, outcome.series, run_dir).await
    }

    /// Measures while the load generator runs with `config`.
    pub async fn attack<S>(
        &self,
        sources: &Sources<S>,
        config: &RunConfig,
        run_dir: &Path,
    ) -> Result<RunStats>
    where
        S: MetricSource + Clone,
    {
        tokio::fs::create_dir_all(run_dir).await?;
        let url = config.full_url();
        self.warm_up(&url).await;

        let log = OpenOptions::new()
            .create(true)
            .append(true)
            .open(run_dir.join(LOG_FILE))?;
        let log_err = log.try_clone()?;

        let generator = &self.settings.load_generator;
        let mut cmd = Command::new(&generator.program);
        cmd.args(&generator.args)
            .args(config.load_generator_args())
            .stdin(Stdio::null())
            .stdout(Stdio::from(log))
            .stderr(Stdio::from(log_err))
            .kill_on_drop(true);

        tracing::info!(
            run = %config.label,
            program = %generator.program,
            args = ?config.load_generator_args(),
            "starting load generator"
        );
        let mut child = cmd.spawn().map_err(|source| Error::LoadGeneratorSpawn {
            program: generator.program.clone(),
            source,
        })?;

        let samplers = Samplers::spawn(sources, self.settings.sample_interval);

        let deadline = self.settings.attack_timeout.map(|t| Instant::now() + t);
        let mut timed_out = false;
        let outcome = self
            .probe(&url)
            .run_while(|| {
                if deadline.is_some_and(|d| Instant::now() >= d) {
                    timed_out = true;
                    return false;
                }
                matches!(child.try_wait(), Ok(None))
            })
            .await;

        if timed_out {
            if let Err(err) = child.kill().await {
                tracing::warn!(run = %config.label, error = %err, "failed to kill load generator");
            }
            samplers.stop().await?;
            return Err(Error::LoadGeneratorTimeout(
                self.settings.attack_timeout.unwrap_or_default(),
            ));
        }

        let status = child.wait().await?;
        let (cpu, mem) = samplers.stop().await?;

        tracing::info!(
            run = %config.label,
            %status,
            attempts = outcome.attempts,
            failures = outcome.failures,
            "attack measurement finished"
        );
        aggregate_run(cpu, mem, outcome.series, run_dir).await
    }

    fn probe<'a>(&'a self, url: &'a str) -> LatencyProbe<'a> {
        LatencyProbe::new(&self.client, url)
            .interval(self.settings.probe_interval)
            .request_timeout(self.settings.request_timeout)
    }

    async fn warm_up(&self, url: &str) {
        if let Err(err) = self.probe(url).probe_once().await {
            tracing::warn!(url, error = %err, "warm-up request failed");
        }
    }
}

struct Samplers {
    token: CancellationToken,
    cpu: JoinHandle<SampleSeries>,
    mem: JoinHandle<SampleSeries>,
}

impl Samplers {
    fn spawn<S: MetricSource + Clone>(sources: &Sources<S>, interval: Duration) -> Self {
        let token = CancellationToken::new();
        Self {
            cpu: spawn_sampler(sources.cpu.clone(), token.clone(), interval),
            mem: spawn_sampler(sources.mem.clone(), token.clone(), interval),
            token,
        }
    }

    async fn stop(mut self) -> Result<(SampleSeries, SampleSeries)> {
        self.token.cancel();
        let cpu = (&mut self.cpu).await?;
        let mem = (&mut self.mem).await?;
        Ok((cpu, mem))
    }
}

// An abandoned run (interrupted sweep) must not leave samplers polling.
impl Drop for Samplers {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

/// Aggregates the three series in persist order; the latency record lands last.
async fn aggregate_run(
    cpu: SampleSeries,
    mem: SampleSeries,
    latency: SampleSeries,
    run_dir: &Path,
) -> Result<RunStats> {
    let run_dir = run_dir.to_path_buf();
    tokio::task::spawn_blocking(move || -> Result<RunStats> {
        Ok(RunStats {
            cpu: aggregate_series(&cpu, Metric::Cpu, &run_dir)?,
            mem: aggregate_series(&mem, Metric::Mem, &run_dir)?,
            latency: aggregate_series(&latency, Metric::Latency, &run_dir)?,
        })
    })
    .await?
}
