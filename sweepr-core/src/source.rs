use std::future::Future;
use std::sync::Arc;

use sysinfo::{MemoryRefreshKind, RefreshKind, System};
use tokio::process::Command;
use tokio::sync::Mutex;

use crate::error::{Error, Result};
use crate::metric::Metric;

/// A polled resource metric of one running instance.
pub trait MetricSource: Send + Sync + 'static {
    fn name(&self) -> &str;

    fn read(&self) -> impl Future<Output = Result<f64>> + Send;
}

/// CPU and memory sources for one instance.
#[derive(Debug, Clone)]
pub struct Sources<S> {
    pub cpu: S,
    pub mem: S,
}

/// Reads `/proc` files inside a container through the container CLI (`docker exec`).
#[derive(Debug, Clone)]
pub struct ContainerMetric {
    program: String,
    container_id: String,
    metric: Metric,
    name: String,
}

impl ContainerMetric {
    pub fn new(program: &str, container_id: &str, metric: Metric) -> Self {
        Self {
            program: program.to_string(),
            container_id: container_id.to_string(),
            metric,
            name: format!("{metric}@{container_id}"),
        }
    }

    pub fn sources(program: &str, container_id: &str) -> Sources<Self> {
        Sources {
            cpu: Self::new(program, container_id, Metric::Cpu),
            mem: Self::new(program, container_id, Metric::Mem),
        }
    }

    fn proc_file(&self) -> &'static str {
        match self.metric {
            Metric::Mem => "/proc/meminfo",
            Metric::Cpu | Metric::Latency => "/proc/loadavg",
        }
    }
}

impl MetricSource for ContainerMetric {
    fn name(&self) -> &str {
        &self.name
    }

    async fn read(&self) -> Result<f64> {
        let out = Command::new(&self.program)
            .args(["exec", &self.container_id, "cat", self.proc_file()])
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| Error::source_failure(&self.name, e.to_string()))?;

        if !out.status.success() {
            let stderr = String::from_utf8_lossy(&out.stderr);
            return Err(Error::source_failure(
                &self.name,
                format!("{} ({})", out.status, stderr.trim()),
            ));
        }

        let stdout = String::from_utf8_lossy(&out.stdout);
        match self.metric {
            Metric::Mem => parse_meminfo(&stdout),
            Metric::Cpu | Metric::Latency => parse_loadavg(&stdout),
        }
    }
}

/// Host-level metrics for instances that run directly on this machine.
#[derive(Debug, Clone)]
pub struct HostMetric {
    metric: Metric,
    name: String,
    sys: Arc<Mutex<System>>,
}

impl HostMetric {
    pub fn sources() -> Sources<Self> {
        let sys = Arc::new(Mutex::new(System::new_with_specifics(
            RefreshKind::nothing().with_memory(MemoryRefreshKind::nothing().with_ram()),
        )));
        Sources {
            cpu: Self {
                metric: Metric::Cpu,
                name: "cpu@host".to_string(),
                sys: sys.clone(),
            },
            mem: Self {
                metric: Metric::Mem,
                name: "mem@host".to_string(),
                sys,
            },
        }
    }
}

impl MetricSource for HostMetric {
    fn name(&self) -> &str {
        &self.name
    }

    async fn read(&self) -> Result<f64> {
        match self.metric {
            Metric::Mem => {
                let mut sys = self.sys.lock().await;
                sys.refresh_memory_specifics(MemoryRefreshKind::nothing().with_ram());
                // Same unit as /proc/meminfo.
                Ok((sys.available_memory() / 1024) as f64)
            }
            Metric::Cpu | Metric::Latency => Ok(System::load_average().one),
        }
    }
}

/// Parses the value of the third `/proc/meminfo` line (`MemAvailable:  123456 kB`).
pub fn parse_meminfo(text: &str) -> Result<f64> {
    let line = text
        .lines()
        .nth(2)
        .ok_or_else(|| Error::MetricParse("meminfo has fewer than 3 lines".to_string()))?;
    let (_, value) = line
        .split_once(':')
        .ok_or_else(|| Error::MetricParse(format!("meminfo line without `:`: {line}")))?;
    let value = value.trim();
    let value = value.strip_suffix("kB").unwrap_or(value).trim();
    value
        .parse::<u64>()
        .map(|v| v as f64)
        .map_err(|_| Error::MetricParse(format!("meminfo value is not an integer: {value}")))
}

/// Parses the one-minute load average (first token of `/proc/loadavg`).
pub fn parse_loadavg(text: &str) -> Result<f64> {
    let token = text
        .split_whitespace()
        .next()
        .ok_or_else(|| Error::MetricParse("loadavg is empty".to_string()))?;
    token
        .parse::<f64>()
        .map_err(|_| Error::MetricParse(format!("loadavg token is not a number: {token}")))
}
