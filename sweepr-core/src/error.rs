use std::path::PathBuf;
use std::time::Duration;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("task join error: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("http client error: {0}")]
    Http(#[from] sweepr_http::Error),

    #[error("probe received HTTP status {0}")]
    UnexpectedStatus(u16),

    #[error("cannot aggregate `{0}`: series is empty")]
    EmptySeries(String),

    #[error("metric source `{source_name}` failed: {message}")]
    MetricSource {
        source_name: String,
        message: String,
    },

    #[error("failed to parse metric output: {0}")]
    MetricParse(String),

    #[error("failed to launch load generator `{program}`: {source}")]
    LoadGeneratorSpawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("load generator still running after {0:?}; killed")]
    LoadGeneratorTimeout(Duration),

    #[error("instance control `{action}` failed for `{instance}`: {message}")]
    InstanceControl {
        action: &'static str,
        instance: String,
        message: String,
    },

    #[error("invalid stats record {path}: {message}")]
    StatsRecord { path: PathBuf, message: String },

    #[error("plot rendering failed: {0}")]
    Plot(String),

    #[error("invalid plan: {0}")]
    InvalidPlan(String),

    #[error("failed to parse plan: {0}")]
    PlanParse(#[from] serde_yaml::Error),
}

impl Error {
    pub(crate) fn source_failure(source_name: &str, message: impl Into<String>) -> Self {
        Self::MetricSource {
            source_name: source_name.to_string(),
            message: message.into(),
        }
    }
}
