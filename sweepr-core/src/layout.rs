use std::path::{Path, PathBuf};

/// Label prefix of runs that re-execute the selected configuration against a path variant.
pub const FINAL_PREFIX: &str = "FINAL_";
pub const BASELINE_LABEL: &str = "baseline";
/// Load generator stdout, appended per attempt.
pub const LOG_FILE: &str = "log.txt";

/// `{root}/{server}/{run}/` directory scheme of persisted results.
#[derive(Debug, Clone)]
pub struct OutputLayout {
    root: PathBuf,
}

impl OutputLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn server_dir(&self, server: &str) -> PathBuf {
        self.root.join(server)
    }

    pub fn run_dir(&self, server: &str, run: &str) -> PathBuf {
        self.server_dir(server).join(run)
    }

    pub fn baseline_dir(&self, server: &str) -> PathBuf {
        self.run_dir(server, BASELINE_LABEL)
    }

    pub fn finalized_dir(&self, server: &str, best: &str, path_label: &str) -> PathBuf {
        self.run_dir(server, &finalized_label(best, path_label))
    }
}

pub fn finalized_label(best: &str, path_label: &str) -> String {
    format!("{FINAL_PREFIX}{best}_{path_label}")
}

pub fn is_finalized_label(label: &str) -> bool {
    label.starts_with(FINAL_PREFIX)
}
