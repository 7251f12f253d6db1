use std::future::Future;

use serde::{Deserialize, Serialize};
use tokio::process::Command;

use crate::error::{Error, Result};
use crate::source::{ContainerMetric, HostMetric, MetricSource, Sources};

/// A target server. The label names its result directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerInstance {
    pub label: String,
    #[serde(default, rename = "container")]
    pub container_id: String,
}

/// Start/stop of target instances and access to their resource metrics.
pub trait InstanceControl: Send + Sync {
    type Source: MetricSource + Clone;

    fn start(&self, instance: &ServerInstance) -> impl Future<Output = Result<()>> + Send;

    fn stop(&self, instance: &ServerInstance) -> impl Future<Output = Result<()>> + Send;

    /// Stops every running instance, including ones the plan does not know about.
    fn stop_all_running(&self) -> impl Future<Output = Result<Vec<String>>> + Send;

    fn sources(&self, instance: &ServerInstance) -> Sources<Self::Source>;
}

/// Instances are containers driven through a docker-compatible CLI.
#[derive(Debug, Clone)]
pub struct ContainerControl {
    program: String,
}

impl Default for ContainerControl {
    fn default() -> Self {
        Self::new("docker")
    }
}

impl ContainerControl {
    pub fn new(program: &str) -> Self {
        Self {
            program: program.to_string(),
        }
    }

    async fn invoke(&self, action: &'static str, instance: &str, args: &[&str]) -> Result<String> {
        let out = Command::new(&self.program)
            .args(args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| Error::InstanceControl {
                action,
                instance: instance.to_string(),
                message: e.to_string(),
            })?;

        if !out.status.success() {
            return Err(Error::InstanceControl {
                action,
                instance: instance.to_string(),
                message: format!(
                    "{} ({})",
                    out.status,
                    String::from_utf8_lossy(&out.stderr).trim()
                ),
            });
        }
        Ok(String::from_utf8_lossy(&out.stdout).into_owned())
    }
}

impl InstanceControl for ContainerControl {
    type Source = ContainerMetric;

    async fn start(&self, instance: &ServerInstance) -> Result<()> {
        self.invoke("start", &instance.label, &["start", &instance.container_id])
            .await?;
        Ok(())
    }

    async fn stop(&self, instance: &ServerInstance) -> Result<()> {
        self.invoke("stop", &instance.label, &["stop", &instance.container_id])
            .await?;
        Ok(())
    }

    async fn stop_all_running(&self) -> Result<Vec<String>> {
        let listing = self.invoke("list", "*", &["ps", "-q"]).await?;
        let ids: Vec<String> = listing.split_whitespace().map(str::to_string).collect();
        if ids.is_empty() {
            return Ok(ids);
        }

        let mut args = vec!["stop"];
        args.extend(ids.iter().map(String::as_str));
        self.invoke("stop", "*", &args).await?;
        Ok(ids)
    }

    fn sources(&self, instance: &ServerInstance) -> Sources<ContainerMetric> {
        ContainerMetric::sources(&self.program, &instance.container_id)
    }
}

/// Instances already run on this machine; start/stop are no-ops and metrics are host-wide.
#[derive(Debug, Clone)]
pub struct HostControl {
    sources: Sources<HostMetric>,
}

impl Default for HostControl {
    fn default() -> Self {
        Self {
            sources: HostMetric::sources(),
        }
    }
}

impl InstanceControl for HostControl {
    type Source = HostMetric;

    async fn start(&self, instance: &ServerInstance) -> Result<()> {
        tracing::debug!(server = %instance.label, "host mode: assuming instance is running");
        Ok(())
    }

    async fn stop(&self, instance: &ServerInstance) -> Result<()> {
        tracing::debug!(server = %instance.label, "host mode: leaving instance running");
        Ok(())
    }

    async fn stop_all_running(&self) -> Result<Vec<String>> {
        Ok(Vec::new())
    }

    fn sources(&self, _instance: &ServerInstance) -> Sources<HostMetric> {
        self.sources.clone()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    fn instance() -> ServerInstance {
        ServerInstance {
            label: "nginx".to_string(),
            container_id: "a759a235a408".to_string(),
        }
    }

    #[tokio::test]
    async fn missing_container_cli_reports_control_error() {
        let control = ContainerControl::new("/nonexistent/sweepr-docker");
        let err = control.start(&instance()).await.unwrap_err();
        match err {
            Error::InstanceControl {
                action, instance, ..
            } => {
                assert_eq!(action, "start");
                assert_eq!(instance, "nginx");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failing_cli_exit_status_is_an_error() {
        let control = ContainerControl::new("false");
        assert!(control.stop(&instance()).await.is_err());
    }

    #[tokio::test]
    async fn host_control_is_a_no_op() {
        let control = HostControl::default();
        control.start(&instance()).await.unwrap();
        control.stop(&instance()).await.unwrap();
        assert!(control.stop_all_running().await.unwrap().is_empty());
        assert_eq!(control.sources(&instance()).cpu.name(), "cpu@host");
    }

    #[test]
    fn container_is_optional_in_yaml() {
        let inst: ServerInstance = serde_yaml::from_str("label: local\n").unwrap();
        assert_eq!(inst.container_id, "");
    }
}
