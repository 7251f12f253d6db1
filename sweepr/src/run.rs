use anyhow::Context as _;
use std::fmt::Write as _;
use std::path::Path;

use sweepr_core::{
    ContainerControl, ControlKind, HostControl, OutputLayout, Plan, RunExecutor, RunOutcome,
    SweepController, SweepReport, SweepSettings,
};
use sweepr_http::{ClientOptions, HttpClient};

use crate::cli::RunArgs;
use crate::exit_codes::ExitCode;
use crate::run_error::RunError;

pub async fn run(args: RunArgs) -> Result<ExitCode, RunError> {
    let mut plan = load_plan(&args.plan).await?;
    apply_overrides(&mut plan, &args).map_err(RunError::InvalidInput)?;

    let client = HttpClient::new(ClientOptions {
        insecure_tls: plan.settings.insecure_tls,
        ..ClientOptions::default()
    })
    .context("failed to build HTTP client")
    .map_err(RunError::RuntimeError)?;
    let executor = RunExecutor::new(client, plan.executor_settings());
    let layout = OutputLayout::new(plan.settings.output_dir.clone());
    let settings = SweepSettings::from(&plan.settings);

    tracing::info!(
        plan = %args.plan.display(),
        servers = plan.servers.len(),
        candidates = plan.candidates.len(),
        paths = plan.paths.len(),
        output_dir = %layout.root().display(),
        control = %plan.settings.control,
        "starting sweep"
    );

    let report = match plan.settings.control {
        ControlKind::Docker => {
            let control = ContainerControl::new(&plan.settings.container_cli);
            SweepController::new(control, executor, layout, settings)
                .run(&plan)
                .await
        }
        ControlKind::Host => {
            SweepController::new(HostControl::default(), executor, layout, settings)
                .run(&plan)
                .await
        }
    }
    .map_err(|err| RunError::from_core(err, "sweep aborted".to_string()))?;

    print!("{}", render_report(&report));
    Ok(ExitCode::from_report(&report))
}

/// Any failure to read or validate the plan is invalid input.
pub(crate) async fn load_plan(path: &Path) -> Result<Plan, RunError> {
    Plan::load(path)
        .await
        .with_context(|| format!("failed to load plan {}", path.display()))
        .map_err(RunError::InvalidInput)
}

fn apply_overrides(plan: &mut Plan, args: &RunArgs) -> anyhow::Result<()> {
    if let Some(dir) = &args.output_dir {
        plan.settings.output_dir = dir.clone();
    }
    if let Some(cooldown) = args.cooldown {
        plan.settings.cooldown = cooldown.into();
    }
    if let Some(requests) = args.baseline_requests {
        plan.settings.baseline_requests = requests;
    }

    if !args.only.is_empty() {
        if let Some(unknown) = args
            .only
            .iter()
            .find(|label| !plan.servers.iter().any(|s| &s.label == *label))
        {
            anyhow::bail!("--only: server `{unknown}` is not in the plan");
        }
        plan.servers.retain(|s| args.only.contains(&s.label));
    }

    plan.validate().context("invalid overrides")?;
    Ok(())
}

pub(crate) fn render_report(report: &SweepReport) -> String {
    let server_w = report.runs.iter().map(|r| r.server.len()).max().unwrap_or(0);
    let run_w = report.runs.iter().map(|r| r.run.len()).max().unwrap_or(0);

    let mut out = String::new();
    for r in &report.runs {
        let outcome = match &r.outcome {
            RunOutcome::Completed { score } => format!("completed  score={score:.3}"),
            RunOutcome::Skipped => "skipped".to_string(),
            RunOutcome::Failed { error } => format!("failed     {error}"),
        };
        let _ = writeln!(out, "{:<server_w$}  {:<run_w$}  {outcome}", r.server, r.run);
    }
    let _ = writeln!(
        out,
        "completed={} skipped={} failed={}{}",
        report.completed(),
        report.skipped(),
        report.failed(),
        if report.interrupted { " (interrupted)" } else { "" }
    );
    out
}
