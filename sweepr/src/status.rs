use std::fmt::Write as _;

use sweepr_core::{
    BASELINE_LABEL, OutputLayout, Plan, RunState, best_of, finalized_label, run_state,
};

use crate::cli::StatusArgs;
use crate::exit_codes::ExitCode;
use crate::run::load_plan;
use crate::run_error::RunError;

pub async fn status(args: StatusArgs) -> Result<ExitCode, RunError> {
    let plan = load_plan(&args.plan).await?;
    let root = args
        .output_dir
        .clone()
        .unwrap_or_else(|| plan.settings.output_dir.clone());

    let text = render_status(&plan, &OutputLayout::new(root))
        .map_err(|err| RunError::from_core(err, "failed to read results".to_string()))?;
    print!("{text}");
    Ok(ExitCode::Success)
}

fn render_status(plan: &Plan, layout: &OutputLayout) -> sweepr_core::Result<String> {
    let mut out = String::new();
    for server in &plan.servers {
        let _ = writeln!(out, "{}", server.label);

        let mut labels = vec![BASELINE_LABEL.to_string()];
        labels.extend(plan.candidates.iter().map(|c| c.label.clone()));

        let server_dir = layout.server_dir(&server.label);
        let best = best_of(&server_dir, &plan.candidates, false)?;
        match &best {
            Some(best) => labels.extend(
                plan.paths
                    .iter()
                    .map(|p| finalized_label(&best.config.label, &p.label)),
            ),
            None if !plan.paths.is_empty() => {
                let _ = writeln!(
                    out,
                    "  ({} path variants wait for a completed candidate)",
                    plan.paths.len()
                );
            }
            None => {}
        }

        for label in labels {
            let state = run_state(&layout.run_dir(&server.label, &label));
            let _ = writeln!(out, "  {:<10}  {label}", state_name(state));
        }
    }
    Ok(out)
}

fn state_name(state: RunState) -> String {
    match state {
        RunState::Absent => "pending".to_string(),
        other => other.to_string(),
    }
}
