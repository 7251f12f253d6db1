#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use sweepr_core::{
    Error, ExecutorSettings, InstanceControl, LoadGenerator, MetricSource, Result, RunConfig,
    ServerInstance, Sources,
};

/// Constant-valued metric source.
#[derive(Debug, Clone)]
pub struct FixedSource {
    name: String,
    value: f64,
}

impl FixedSource {
    pub fn sources(value: f64) -> Sources<Self> {
        Sources {
            cpu: Self {
                name: "cpu@fake".to_string(),
                value,
            },
            mem: Self {
                name: "mem@fake".to_string(),
                value: value * 1000.0,
            },
        }
    }
}

impl MetricSource for FixedSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn read(&self) -> Result<f64> {
        Ok(self.value)
    }
}

/// Records start/stop calls; instances listed in `broken` refuse to start.
#[derive(Debug, Clone, Default)]
pub struct FakeControl {
    pub events: Arc<Mutex<Vec<String>>>,
    pub broken: HashSet<String>,
    pub running: Vec<String>,
}

impl FakeControl {
    pub fn with_broken(label: &str) -> Self {
        Self {
            broken: HashSet::from([label.to_string()]),
            ..Self::default()
        }
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn log(&self, event: String) {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(event);
    }
}

impl InstanceControl for FakeControl {
    type Source = FixedSource;

    async fn start(&self, instance: &ServerInstance) -> Result<()> {
        if self.broken.contains(&instance.label) {
            return Err(Error::InstanceControl {
                action: "start",
                instance: instance.label.clone(),
                message: "no such container".to_string(),
            });
        }
        self.log(format!("start {}", instance.label));
        Ok(())
    }

    async fn stop(&self, instance: &ServerInstance) -> Result<()> {
        self.log(format!("stop {}", instance.label));
        Ok(())
    }

    async fn stop_all_running(&self) -> Result<Vec<String>> {
        self.log("stop_all".to_string());
        Ok(self.running.clone())
    }

    fn sources(&self, _instance: &ServerInstance) -> Sources<FixedSource> {
        FixedSource::sources(0.5)
    }
}

pub fn server(label: &str) -> ServerInstance {
    ServerInstance {
        label: label.to_string(),
        container_id: format!("{label}-id"),
    }
}

pub fn candidate(label: &str, base_url: &str, path: &str) -> RunConfig {
    RunConfig {
        label: label.to_string(),
        connections: 1,
        routines: 1,
        delay: 0,
        frame_count: 10,
        connect_attempts: 1,
        consecutive_sends: 1,
        timeout_ms: 100,
        target_url: base_url.to_string(),
        path: path.to_string(),
    }
}

/// `sh -c <script>`; the run's flags land in `$1..` and are ignored.
pub fn shell_generator(script: &str) -> LoadGenerator {
    LoadGenerator {
        program: "sh".to_string(),
        args: vec![
            "-c".to_string(),
            script.to_string(),
            "sweepr-fake-generator".to_string(),
        ],
    }
}

/// Fast intervals so a run takes a fraction of a second.
pub fn fast_settings(load_generator: LoadGenerator) -> ExecutorSettings {
    ExecutorSettings {
        sample_interval: Duration::from_millis(20),
        probe_interval: Duration::from_millis(10),
        request_timeout: Some(Duration::from_secs(2)),
        baseline_requests: 5,
        attack_timeout: Some(Duration::from_secs(20)),
        load_generator,
    }
}
