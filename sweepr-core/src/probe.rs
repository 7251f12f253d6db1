use std::time::{Duration, Instant};

use sweepr_http::{HttpClient, HttpRequest};

use crate::error::{Error, Result};
use crate::sample::SampleSeries;

pub const DEFAULT_PROBE_INTERVAL: Duration = Duration::from_millis(100);
pub const DEFAULT_BASELINE_REQUESTS: u64 = 1000;

#[derive(Debug, Clone, Default)]
pub struct ProbeOutcome {
    pub series: SampleSeries,
    pub attempts: u64,
    pub failures: u64,
}

/// Foreground latency measurement against one URL.
#[derive(Debug, Clone, Copy)]
pub struct LatencyProbe<'a> {
    client: &'a HttpClient,
    url: &'a str,
    interval: Duration,
    request_timeout: Option<Duration>,
}

impl<'a> LatencyProbe<'a> {
    pub fn new(client: &'a HttpClient, url: &'a str) -> Self {
        Self {
            client,
            url,
            interval: DEFAULT_PROBE_INTERVAL,
            request_timeout: None,
        }
    }

    #[must_use]
    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    #[must_use]
    pub fn request_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// One `HEAD` request; returns the round-trip time in milliseconds.
    pub async fn probe_once(&self) -> Result<f64> {
        let req = HttpRequest::head(self.url).with_timeout(self.request_timeout);
        let started = Instant::now();
        let res = self.client.request(req).await?;
        if !res.is_success() {
            return Err(Error::UnexpectedStatus(res.status));
        }
        Ok(started.elapsed().as_secs_f64() * 1000.0)
    }

    /// Probes exactly `requests` times (failed attempts count toward the budget).
    pub async fn run_iterations(&self, requests: u64) -> ProbeOutcome {
        let mut remaining = requests;
        self.run_while(|| {
            if remaining == 0 {
                return false;
            }
            remaining -= 1;
            true
        })
        .await
    }

    /// Probes until `keep_going` returns false. It is evaluated once before every attempt.
    pub async fn run_while(&self, mut keep_going: impl FnMut() -> bool) -> ProbeOutcome {
        let mut out = ProbeOutcome::default();

        while keep_going() {
            out.attempts += 1;
            match self.probe_once().await {
                Ok(ms) => out.series.record(ms),
                Err(err) => {
                    out.failures += 1;
                    tracing::warn!(url = self.url, error = %err, "latency probe failed");
                }
            }
            tokio::time::sleep(self.interval).await;
        }

        tracing::debug!(
            url = self.url,
            attempts = out.attempts,
            failures = out.failures,
            "latency probe finished"
        );
        out
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use sweepr_http::ClientOptions;
    use sweepr_testserver::TestServer;

    fn client() -> HttpClient {
        HttpClient::new(ClientOptions::default()).unwrap()
    }

    #[tokio::test]
    async fn healthy_target_yields_one_sample_per_attempt() {
        let server = TestServer::start().await.unwrap();
        let client = client();
        let probe = LatencyProbe::new(&client, &server.urls().health).interval(Duration::ZERO);

        let out = probe.run_iterations(20).await;
        assert_eq!(out.attempts, 20);
        assert_eq!(out.failures, 0);
        assert_eq!(out.series.len(), 20);
        assert!(out.series.values().all(|ms| ms >= 0.0));

        server.shutdown().await;
    }

    #[tokio::test]
    async fn failed_requests_produce_no_samples() {
        let server = TestServer::start().await.unwrap();
        let client = client();
        let probe = LatencyProbe::new(&client, &server.urls().flaky).interval(Duration::ZERO);

        let out = probe.run_iterations(10).await;
        assert_eq!(out.attempts, 10);
        assert_eq!(out.failures, server.stats().flaky_failed());
        assert_eq!(out.failures, 5);
        assert_eq!(out.series.len() as u64, out.attempts - out.failures);

        server.shutdown().await;
    }

    #[tokio::test]
    async fn unreachable_target_never_aborts_the_loop() {
        let client = HttpClient::new(ClientOptions {
            connect_timeout: Some(Duration::from_millis(50)),
            insecure_tls: false,
        })
        .unwrap();
        let probe = LatencyProbe::new(&client, "http://127.0.0.1:9/").interval(Duration::ZERO);

        let out = probe.run_iterations(3).await;
        assert_eq!(out.attempts, 3);
        assert_eq!(out.failures, 3);
        assert!(out.series.is_empty());
    }

    #[tokio::test]
    async fn run_while_evaluates_predicate_before_each_attempt() {
        let server = TestServer::start().await.unwrap();
        let client = client();
        let probe = LatencyProbe::new(&client, &server.urls().health).interval(Duration::ZERO);

        let mut checks = 0;
        let out = probe
            .run_while(|| {
                checks += 1;
                checks <= 4
            })
            .await;
        assert_eq!(checks, 5);
        assert_eq!(out.attempts, 4);

        server.shutdown().await;
    }

    #[tokio::test]
    async fn interval_paces_requests() {
        let server = TestServer::start().await.unwrap();
        let client = client();
        let probe = LatencyProbe::new(&client, &server.urls().health)
            .interval(Duration::from_millis(20));

        let started = Instant::now();
        let out = probe.run_iterations(10).await;
        assert_eq!(out.series.len(), 10);
        assert!(started.elapsed() >= Duration::from_millis(200));

        server.shutdown().await;
    }
}
