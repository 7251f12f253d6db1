//! The sweep: servers in declaration order, each with baseline, candidates, and the
//! best candidate re-run against every path variant. Strictly sequential.

use std::future::Future;
use std::ops::ControlFlow;
use std::path::Path;
use std::time::Duration;

use crate::error::Result;
use crate::executor::{RunExecutor, RunStats};
use crate::instance::{InstanceControl, ServerInstance};
use crate::interrupt::Interrupt;
use crate::layout::{BASELINE_LABEL, OutputLayout, finalized_label};
use crate::ledger::{RunState, run_state};
use crate::plan::{Plan, Settings};
use crate::selector::best_of;

/// Pseudo run label under which a failed instance start is reported.
pub const INSTANCE_START: &str = "instance_start";

#[derive(Debug, Clone)]
pub struct SweepSettings {
    /// Pause after instance start and after every executed run.
    pub cooldown: Duration,
    pub stop_running_on_start: bool,
    /// Remove the directory of a run that failed instead of leaving it for inspection.
    pub cleanup_incomplete: bool,
}

impl Default for SweepSettings {
    fn default() -> Self {
        Self::from(&Settings::default())
    }
}

impl From<&Settings> for SweepSettings {
    fn from(s: &Settings) -> Self {
        Self {
            cooldown: s.cooldown.into_inner(),
            stop_running_on_start: s.stop_running_on_start,
            cleanup_incomplete: s.cleanup_incomplete,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    Completed { score: f64 },
    /// Already complete from an earlier sweep.
    Skipped,
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunRecord {
    pub server: String,
    pub run: String,
    pub outcome: RunOutcome,
}

#[derive(Debug, Clone, Default)]
pub struct SweepReport {
    pub runs: Vec<RunRecord>,
    /// The operator aborted the sweep; later runs were not attempted.
    pub interrupted: bool,
}

impl SweepReport {
    fn push(&mut self, server: &str, run: &str, outcome: RunOutcome) {
        self.runs.push(RunRecord {
            server: server.to_string(),
            run: run.to_string(),
            outcome,
        });
    }

    pub fn completed(&self) -> usize {
        self.count(|o| matches!(o, RunOutcome::Completed { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, RunOutcome::Skipped))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, RunOutcome::Failed { .. }))
    }

    pub fn is_clean(&self) -> bool {
        !self.interrupted && self.failed() == 0
    }

    fn count(&self, f: impl Fn(&RunOutcome) -> bool) -> usize {
        self.runs.iter().filter(|r| f(&r.outcome)).count()
    }
}

pub struct SweepController<C> {
    control: C,
    executor: RunExecutor,
    layout: OutputLayout,
    settings: SweepSettings,
    interrupt: Interrupt,
}

impl<C: InstanceControl> SweepController<C> {
    pub fn new(
        control: C,
        executor: RunExecutor,
        layout: OutputLayout,
        settings: SweepSettings,
    ) -> Self {
        Self {
            control,
            executor,
            layout,
            settings,
            interrupt: Interrupt::new(),
        }
    }

    /// Shares `interrupt` with the caller so it can end cooldowns or abort the sweep.
    #[must_use]
    pub fn with_interrupt(mut self, interrupt: Interrupt) -> Self {
        self.interrupt = interrupt;
        self
    }

    /// Runs every pending run of `plan`. A failed run is reported and the sweep moves on;
    /// only a failure to clear stray instances at start aborts the whole sweep.
    ///
    /// Ctrl-C is routed to the shared [`Interrupt`] for the duration of the call.
    pub async fn run(&self, plan: &Plan) -> Result<SweepReport> {
        let mut report = SweepReport::default();
        let _listener = self.interrupt.listen_for_ctrl_c();

        if self.settings.stop_running_on_start {
            let stopped = self.control.stop_all_running().await?;
            if !stopped.is_empty() {
                tracing::info!(count = stopped.len(), ids = ?stopped, "stopped running instances");
            }
        }

        for server in &plan.servers {
            if self.interrupt.is_aborted() {
                report.interrupted = true;
                break;
            }
            if self.sweep_server(server, plan, &mut report).await.is_break() {
                tracing::warn!(server = %server.label, "sweep interrupted");
                report.interrupted = true;
                break;
            }
        }

        tracing::info!(
            completed = report.completed(),
            skipped = report.skipped(),
            failed = report.failed(),
            "sweep finished"
        );
        Ok(report)
    }

    async fn sweep_server(
        &self,
        server: &ServerInstance,
        plan: &Plan,
        report: &mut SweepReport,
    ) -> ControlFlow<()> {
        tracing::info!(server = %server.label, "starting instance");
        if let Err(err) = self.control.start(server).await {
            tracing::warn!(server = %server.label, error = %err, "instance failed to start");
            report.push(
                &server.label,
                INSTANCE_START,
                RunOutcome::Failed {
                    error: err.to_string(),
                },
            );
            return ControlFlow::Continue(());
        }

        let flow = self.measure_server(server, plan, report).await;

        tracing::info!(server = %server.label, "stopping instance");
        if let Err(err) = self.control.stop(server).await {
            tracing::warn!(server = %server.label, error = %err, "instance failed to stop");
        }
        flow
    }

    async fn measure_server(
        &self,
        server: &ServerInstance,
        plan: &Plan,
        report: &mut SweepReport,
    ) -> ControlFlow<()> {
        let sources = self.control.sources(server);
        self.cooldown(&server.label).await;

        let baseline_url = plan.baseline_url();
        let dir = self.layout.baseline_dir(&server.label);
        self.step(
            &server.label,
            BASELINE_LABEL,
            &dir,
            report,
            self.executor.baseline(&sources, &baseline_url, &dir),
        )
        .await?;

        for config in &plan.candidates {
            let dir = self.layout.run_dir(&server.label, &config.label);
            self.step(
                &server.label,
                &config.label,
                &dir,
                report,
                self.executor.attack(&sources, config, &dir),
            )
            .await?;
        }

        if plan.paths.is_empty() {
            return ControlFlow::Continue(());
        }

        let server_dir = self.layout.server_dir(&server.label);
        let best = match best_of(&server_dir, &plan.candidates, false) {
            Ok(Some(best)) => best,
            Ok(None) => {
                tracing::warn!(server = %server.label, "no completed candidate; skipping path variants");
                return ControlFlow::Continue(());
            }
            Err(err) => {
                tracing::warn!(server = %server.label, error = %err, "ranking failed; skipping path variants");
                return ControlFlow::Continue(());
            }
        };
        tracing::info!(
            server = %server.label,
            run = %best.config.label,
            score = best.run.score(),
            "selected best configuration"
        );

        for variant in &plan.paths {
            let config = best.config.with_path(&variant.path);
            let label = finalized_label(&best.config.label, &variant.label);
            let dir = self.layout.run_dir(&server.label, &label);
            self.step(
                &server.label,
                &label,
                &dir,
                report,
                self.executor.attack(&sources, &config, &dir),
            )
            .await?;
        }
        ControlFlow::Continue(())
    }

    /// One ledger-checked run followed by a cooldown. Breaks only on operator abort.
    async fn step<F>(
        &self,
        server: &str,
        run: &str,
        dir: &Path,
        report: &mut SweepReport,
        execute: F,
    ) -> ControlFlow<()>
    where
        F: Future<Output = Result<RunStats>>,
    {
        match run_state(dir) {
            RunState::Complete => {
                tracing::info!(server, run, "already complete, skipping");
                report.push(server, run, RunOutcome::Skipped);
                return ControlFlow::Continue(());
            }
            RunState::Incomplete => {
                tracing::info!(server, run, "re-running incomplete run");
            }
            RunState::Absent => {
                tracing::info!(server, run, "starting run");
            }
        }

        if self.interrupt.is_aborted() {
            return ControlFlow::Break(());
        }
        let result = tokio::select! {
            result = execute => result,
            () = self.interrupt.aborted() => {
                tracing::warn!(server, run, "run aborted by operator");
                return ControlFlow::Break(());
            }
        };
        match result {
            Ok(stats) => {
                let score = stats.latency.degradation_score();
                tracing::info!(server, run, score, "run complete");
                report.push(server, run, RunOutcome::Completed { score });
            }
            Err(err) => {
                tracing::warn!(server, run, error = %err, "run failed");
                if self.settings.cleanup_incomplete {
                    self.remove_run_dir(server, run, dir).await;
                }
                report.push(
                    server,
                    run,
                    RunOutcome::Failed {
                        error: err.to_string(),
                    },
                );
            }
        }

        self.cooldown(server).await;
        ControlFlow::Continue(())
    }

    async fn remove_run_dir(&self, server: &str, run: &str, dir: &Path) {
        match tokio::fs::remove_dir_all(dir).await {
            Ok(()) => tracing::debug!(server, run, "removed incomplete run directory"),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => {
                tracing::warn!(server, run, error = %err, "failed to remove incomplete run directory");
            }
        }
    }

    /// An interrupt ends a cooldown early; the sweep carries on.
    async fn cooldown(&self, server: &str) {
        let period = self.settings.cooldown;
        if period.is_zero() {
            return;
        }
        tracing::info!(server, cooldown = %humantime::format_duration(period), "cooling down");
        if self.interrupt.cooldown(period).await && !self.interrupt.is_aborted() {
            tracing::info!(server, "cooldown cut short by operator");
        }
    }
}
