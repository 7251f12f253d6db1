use serde::{Deserialize, Serialize};

pub const DEFAULT_TARGET_URL: &str = "https://127.0.0.1:443";

/// Parameters of one attack configuration. Most of them are forwarded verbatim to the
/// load generator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunConfig {
    pub label: String,
    pub connections: u32,
    pub routines: u32,
    #[serde(default)]
    pub delay: u32,
    #[serde(rename = "frames")]
    pub frame_count: u32,
    pub connect_attempts: u32,
    #[serde(default = "default_consecutive_sends")]
    pub consecutive_sends: u32,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u32,
    #[serde(default = "default_target_url", rename = "url")]
    pub target_url: String,
    #[serde(default = "default_path")]
    pub path: String,
}

fn default_consecutive_sends() -> u32 {
    1
}

fn default_timeout_ms() -> u32 {
    1000
}

fn default_target_url() -> String {
    DEFAULT_TARGET_URL.to_string()
}

fn default_path() -> String {
    "/".to_string()
}

impl RunConfig {
    /// `target_url` joined with `path`.
    pub fn full_url(&self) -> String {
        join_url(&self.target_url, &self.path)
    }

    /// Same configuration aimed at another path.
    #[must_use]
    pub fn with_path(&self, path: &str) -> Self {
        Self {
            path: path.to_string(),
            ..self.clone()
        }
    }

    /// Load generator flags, in the order the generator documents them.
    pub fn load_generator_args(&self) -> Vec<String> {
        vec![
            "--url".to_string(),
            self.full_url(),
            "--connections".to_string(),
            self.connections.to_string(),
            "--routines".to_string(),
            self.routines.to_string(),
            "--delay".to_string(),
            self.delay.to_string(),
            "--frames".to_string(),
            self.frame_count.to_string(),
            "--connectAttempts".to_string(),
            self.connect_attempts.to_string(),
            "--consecutiveSends".to_string(),
            self.consecutive_sends.to_string(),
            "--timeout".to_string(),
            self.timeout_ms.to_string(),
        ]
    }
}

pub(crate) fn join_url(base: &str, path: &str) -> String {
    match (base.ends_with('/'), path.starts_with('/')) {
        (true, true) => format!("{base}{}", &path[1..]),
        (false, false) if !path.is_empty() => format!("{base}/{path}"),
        _ => format!("{base}{path}"),
    }
}
