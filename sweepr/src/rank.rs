use std::fmt::Write as _;

use sweepr_core::{OutputLayout, RankedRun, rank_runs};

use crate::cli::RankArgs;
use crate::exit_codes::ExitCode;
use crate::run_error::RunError;

pub fn rank(args: RankArgs) -> Result<ExitCode, RunError> {
    let layout = OutputLayout::new(args.output_dir.clone());
    let dir = layout.server_dir(&args.server);
    if !dir.is_dir() {
        return Err(RunError::InvalidInput(anyhow::anyhow!(
            "no results for server `{}` in {}",
            args.server,
            layout.root().display()
        )));
    }

    let runs = rank_runs(&dir, args.include_final).map_err(|err| {
        RunError::from_core(err, format!("failed to rank runs in {}", dir.display()))
    })?;
    if runs.is_empty() {
        tracing::warn!(server = %args.server, "no completed runs");
    }
    print!("{}", render_ranking(&runs));
    Ok(ExitCode::Success)
}

fn render_ranking(runs: &[RankedRun]) -> String {
    let label_w = runs
        .iter()
        .map(|r| r.label.len())
        .max()
        .unwrap_or(0)
        .max("run".len());

    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:>4}  {:<label_w$}  {:>12}  {:>12}  {:>12}",
        "#", "run", "score", "median", "mean"
    );
    for (i, r) in runs.iter().enumerate() {
        let _ = writeln!(
            out,
            "{:>4}  {:<label_w$}  {:>12.3}  {:>12.3}  {:>12.3}",
            i + 1,
            r.label,
            r.score(),
            r.latency.median,
            r.latency.mean
        );
    }
    out
}
