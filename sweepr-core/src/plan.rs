//! Experiment plan: the servers to measure, the candidate attack configurations, the
//! path variants for finalized runs, and sweep settings. Loaded from YAML.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::executor::{ExecutorSettings, LoadGenerator};
use crate::instance::ServerInstance;
use crate::layout::{BASELINE_LABEL, is_finalized_label};
use crate::probe::{DEFAULT_BASELINE_REQUESTS, DEFAULT_PROBE_INTERVAL};
use crate::run_config::RunConfig;
use crate::sampler::DEFAULT_SAMPLE_INTERVAL;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    #[serde(default)]
    pub settings: Settings,
    pub servers: Vec<ServerInstance>,
    #[serde(default)]
    pub paths: Vec<PathVariant>,
    pub candidates: Vec<RunConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathVariant {
    pub label: String,
    pub path: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ControlKind {
    /// Containers started/stopped and inspected through `containerCli`.
    #[default]
    Docker,
    /// Targets already run on this machine.
    Host,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub output_dir: PathBuf,
    pub cooldown: PlanDuration,
    pub sample_interval: PlanDuration,
    pub probe_interval: PlanDuration,
    pub baseline_requests: u64,
    pub request_timeout: PlanDuration,
    pub insecure_tls: bool,
    /// Zero disables the limit.
    pub attack_timeout: PlanDuration,
    pub stop_running_on_start: bool,
    pub cleanup_incomplete: bool,
    /// Program followed by its leading arguments.
    pub load_generator: Vec<String>,
    pub control: ControlKind,
    pub container_cli: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub baseline_url: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        let generator = LoadGenerator::default();
        Self {
            output_dir: PathBuf::from("results"),
            cooldown: Duration::from_secs(120).into(),
            sample_interval: DEFAULT_SAMPLE_INTERVAL.into(),
            probe_interval: DEFAULT_PROBE_INTERVAL.into(),
            baseline_requests: DEFAULT_BASELINE_REQUESTS,
            request_timeout: Duration::from_secs(5).into(),
            insecure_tls: true,
            attack_timeout: Duration::from_secs(30 * 60).into(),
            stop_running_on_start: true,
            cleanup_incomplete: false,
            load_generator: std::iter::once(generator.program)
                .chain(generator.args)
                .collect(),
            control: ControlKind::Docker,
            container_cli: "docker".to_string(),
            baseline_url: None,
        }
    }
}

impl Plan {
    pub async fn load(path: &Path) -> Result<Self> {
        let text = tokio::fs::read_to_string(path).await?;
        Self::from_yaml_str(&text)
    }

    pub fn from_yaml_str(text: &str) -> Result<Self> {
        let plan: Self = serde_yaml::from_str(text)?;
        plan.validate()?;
        Ok(plan)
    }

    pub fn validate(&self) -> Result<()> {
        if self.servers.is_empty() {
            return Err(Error::InvalidPlan("`servers` must not be empty".to_string()));
        }
        if self.candidates.is_empty() {
            return Err(Error::InvalidPlan(
                "`candidates` must not be empty".to_string(),
            ));
        }

        check_labels("servers", self.servers.iter().map(|s| s.label.as_str()))?;
        check_labels("paths", self.paths.iter().map(|p| p.label.as_str()))?;
        check_labels("candidates", self.candidates.iter().map(|c| c.label.as_str()))?;

        for c in &self.candidates {
            if is_finalized_label(&c.label) || c.label == BASELINE_LABEL {
                return Err(Error::InvalidPlan(format!(
                    "candidate label `{}` is reserved",
                    c.label
                )));
            }
            url::Url::parse(&c.full_url()).map_err(|e| {
                Error::InvalidPlan(format!("candidate `{}` has an invalid url: {e}", c.label))
            })?;
        }

        if self.settings.control == ControlKind::Docker {
            if let Some(s) = self.servers.iter().find(|s| s.container_id.is_empty()) {
                return Err(Error::InvalidPlan(format!(
                    "server `{}` needs a `container` id with docker control",
                    s.label
                )));
            }
        }

        if self.settings.load_generator.is_empty() {
            return Err(Error::InvalidPlan(
                "`settings.loadGenerator` must name a program".to_string(),
            ));
        }
        if self.settings.baseline_requests == 0 {
            return Err(Error::InvalidPlan(
                "`settings.baselineRequests` must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Explicit `baselineUrl`, else the first candidate's base URL.
    pub fn baseline_url(&self) -> String {
        match (&self.settings.baseline_url, self.candidates.first()) {
            (Some(url), _) => url.clone(),
            (None, Some(c)) => c.target_url.clone(),
            (None, None) => crate::run_config::DEFAULT_TARGET_URL.to_string(),
        }
    }

    pub fn executor_settings(&self) -> ExecutorSettings {
        let s = &self.settings;
        let mut generator = s.load_generator.iter().cloned();
        ExecutorSettings {
            sample_interval: s.sample_interval.into_inner(),
            probe_interval: s.probe_interval.into_inner(),
            request_timeout: non_zero(s.request_timeout.into_inner()),
            baseline_requests: s.baseline_requests,
            attack_timeout: non_zero(s.attack_timeout.into_inner()),
            load_generator: LoadGenerator {
                program: generator.next().unwrap_or_default(),
                args: generator.collect(),
            },
        }
    }
}

fn non_zero(d: Duration) -> Option<Duration> {
    (!d.is_zero()).then_some(d)
}

fn check_labels<'a>(list: &str, labels: impl Iterator<Item = &'a str>) -> Result<()> {
    let mut seen = HashSet::new();
    for label in labels {
        if label.trim().is_empty() {
            return Err(Error::InvalidPlan(format!("empty label in `{list}`")));
        }
        if label.contains(['/', '\\']) || label == "." || label == ".." {
            return Err(Error::InvalidPlan(format!(
                "label `{label}` in `{list}` is not a valid directory name"
            )));
        }
        if !seen.insert(label) {
            return Err(Error::InvalidPlan(format!(
                "duplicate label `{label}` in `{list}`"
            )));
        }
    }
    Ok(())
}

/// Duration written as `120s`/`100ms`, or a plain number of seconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlanDuration(Duration);

impl PlanDuration {
    pub fn into_inner(self) -> Duration {
        self.0
    }
}

impl From<Duration> for PlanDuration {
    fn from(value: Duration) -> Self {
        Self(value)
    }
}

impl Serialize for PlanDuration {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&humantime::format_duration(self.0).to_string())
    }
}

impl<'de> Deserialize<'de> for PlanDuration {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct V;

        impl serde::de::Visitor<'_> for V {
            type Value = PlanDuration;

            fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                f.write_str("duration as string (e.g. 120s) or number of seconds")
            }

            fn visit_u64<E>(self, v: u64) -> std::result::Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                Ok(PlanDuration(Duration::from_secs(v)))
            }

            fn visit_i64<E>(self, v: i64) -> std::result::Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                let v = u64::try_from(v).map_err(|_| E::custom("duration must be >= 0"))?;
                self.visit_u64(v)
            }

            fn visit_f64<E>(self, v: f64) -> std::result::Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                Duration::try_from_secs_f64(v)
                    .map(PlanDuration)
                    .map_err(|_| E::custom("duration must be a finite, non-negative number"))
            }

            fn visit_str<E>(self, v: &str) -> std::result::Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                humantime::parse_duration(v.trim())
                    .map(PlanDuration)
                    .map_err(|e| E::custom(format!("invalid duration `{v}`: {e}")))
            }
        }

        deserializer.deserialize_any(V)
    }
}
