use std::path::Path;

use crate::error::Result;
use crate::layout::{FINAL_PREFIX, is_finalized_label};
use crate::ledger::is_complete;
use crate::metric::Metric;
use crate::run_config::RunConfig;
use crate::stats::Stats;

/// A completed run of one server with its latency stats.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedRun {
    pub label: String,
    pub latency: Stats,
}

impl RankedRun {
    pub fn score(&self) -> f64 {
        self.latency.degradation_score()
    }
}

/// The winning run together with the candidate configuration it was measured with.
#[derive(Debug, Clone)]
pub struct Selection<'a> {
    pub run: RankedRun,
    pub config: &'a RunConfig,
}

/// Completed runs under `server_dir`, highest degradation score first.
///
/// Runs are ordered by label before ranking, so equal scores resolve to the
/// lexicographically first label on every platform. Finalized runs are skipped unless
/// `include_finalized` is set; hidden entries and incomplete runs are always skipped.
pub fn rank_runs(server_dir: &Path, include_finalized: bool) -> Result<Vec<RankedRun>> {
    let entries = match std::fs::read_dir(server_dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => return Err(err.into()),
    };

    let mut labels = Vec::new();
    for entry in entries {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let Some(label) = entry.file_name().to_str().map(str::to_string) else {
            continue;
        };
        if label.starts_with('.') || (!include_finalized && is_finalized_label(&label)) {
            continue;
        }
        labels.push(label);
    }
    labels.sort();

    let mut runs = Vec::with_capacity(labels.len());
    for label in labels {
        let run_dir = server_dir.join(&label);
        if !is_complete(&run_dir) {
            tracing::debug!(run = %label, "skipping incomplete run");
            continue;
        }
        let latency = Stats::read_from(&run_dir.join(Metric::Latency.record_file_name()))?;
        runs.push(RankedRun { label, latency });
    }

    // Stable sort keeps label order among equal scores.
    runs.sort_by(|a, b| b.score().total_cmp(&a.score()));
    Ok(runs)
}

/// Highest-scoring completed run that belongs to one of `candidates`.
///
/// Directories that do not map to a candidate (the baseline, stray folders) are ignored.
/// A finalized run maps back to the candidate it re-executed. Returns `None` when
/// nothing qualifies.
pub fn best_of<'a>(
    server_dir: &Path,
    candidates: &'a [RunConfig],
    include_finalized: bool,
) -> Result<Option<Selection<'a>>> {
    let runs = rank_runs(server_dir, include_finalized)?;
    Ok(runs.into_iter().find_map(|run| {
        originating_config(&run.label, candidates).map(|config| Selection { run, config })
    }))
}

fn originating_config<'a>(label: &str, candidates: &'a [RunConfig]) -> Option<&'a RunConfig> {
    if let Some(rest) = label.strip_prefix(FINAL_PREFIX) {
        // `FINAL_{candidate}_{path}`; candidate labels may contain `_`, prefer the longest.
        return candidates
            .iter()
            .filter(|c| {
                rest.strip_prefix(c.label.as_str())
                    .is_some_and(|tail| tail.starts_with('_'))
            })
            .max_by_key(|c| c.label.len());
    }
    candidates.iter().find(|c| c.label == label)
}
