//! In-process HTTP target for sweepr tests.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::time::{Duration, sleep};

pub const PATH_HEALTH: &str = "/health";
pub const PATH_FLAKY: &str = "/flaky";
pub const PATH_SLOW: &str = "/slow";
pub const PATH_MISSING: &str = "/missing";

#[derive(Debug, Clone, Default)]
pub struct TestServerStats {
    requests_total: Arc<AtomicU64>,
    flaky_total: Arc<AtomicU64>,
    flaky_failed: Arc<AtomicU64>,
}

impl TestServerStats {
    fn inc_requests_total(&self) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns the zero-based index of this flaky request.
    fn next_flaky(&self) -> u64 {
        self.flaky_total.fetch_add(1, Ordering::Relaxed)
    }

    fn inc_flaky_failed(&self) {
        self.flaky_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn requests_total(&self) -> u64 {
        self.requests_total.load(Ordering::Relaxed)
    }

    pub fn flaky_total(&self) -> u64 {
        self.flaky_total.load(Ordering::Relaxed)
    }

    pub fn flaky_failed(&self) -> u64 {
        self.flaky_failed.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Clone)]
pub struct TestServerUrls {
    pub base_url: String,
    pub health: String,
    pub flaky: String,
    pub slow: String,
    pub missing: String,
}

impl TestServerUrls {
    pub fn new(base_url: String) -> Self {
        Self {
            health: format!("{base_url}{PATH_HEALTH}"),
            flaky: format!("{base_url}{PATH_FLAKY}"),
            slow: format!("{base_url}{PATH_SLOW}"),
            missing: format!("{base_url}{PATH_MISSING}"),
            base_url,
        }
    }
}

async fn handle_health(State(stats): State<TestServerStats>) -> &'static str {
    stats.inc_requests_total();
    "ok"
}

// Every second request fails with 503.
async fn handle_flaky(State(stats): State<TestServerStats>) -> (StatusCode, &'static str) {
    stats.inc_requests_total();
    if stats.next_flaky() % 2 == 1 {
        stats.inc_flaky_failed();
        return (StatusCode::SERVICE_UNAVAILABLE, "unavailable");
    }
    (StatusCode::OK, "ok")
}

async fn handle_slow(State(stats): State<TestServerStats>) -> &'static str {
    stats.inc_requests_total();
    sleep(Duration::from_millis(50)).await;
    "slow"
}

pub fn router(stats: TestServerStats) -> Router {
    Router::new()
        .route("/", get(handle_health))
        .route(PATH_HEALTH, get(handle_health))
        .route(PATH_FLAKY, get(handle_flaky))
        .route(PATH_SLOW, get(handle_slow))
        .with_state(stats)
}

pub struct TestServer {
    addr: SocketAddr,
    base_url: String,
    urls: TestServerUrls,
    stats: TestServerStats,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: Option<tokio::task::JoinHandle<()>>,
}

impl TestServer {
    pub async fn start() -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let stats = TestServerStats::default();
        let app = router(stats.clone());

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            let serve = axum::serve(listener, app).with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            });
            let _ = serve.await;
        });

        let base_url = format!("http://{addr}");
        let urls = TestServerUrls::new(base_url.clone());

        Ok(Self {
            addr,
            base_url,
            urls,
            stats,
            shutdown_tx: Some(shutdown_tx),
            task: Some(task),
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn urls(&self) -> &TestServerUrls {
        &self.urls
    }

    pub fn stats(&self) -> &TestServerStats {
        &self.stats
    }

    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }

        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if self.shutdown_tx.is_some()
            && let Some(task) = self.task.take()
        {
            task.abort();
        }
    }
}
