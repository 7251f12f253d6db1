use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use anyhow::Context as _;
use sweepr_testserver::TestServer;

fn status_code(out: &Output) -> i32 {
    out.status.code().unwrap_or(-1)
}

fn ensure_code(out: &Output, expected: i32) -> anyhow::Result<()> {
    anyhow::ensure!(
        status_code(out) == expected,
        "expected exit code {expected}, got {}\nstdout:\n{}\nstderr:\n{}",
        status_code(out),
        String::from_utf8_lossy(&out.stdout),
        String::from_utf8_lossy(&out.stderr)
    );
    Ok(())
}

async fn sweepr(args: Vec<String>) -> anyhow::Result<Output> {
    let exe = env!("CARGO_BIN_EXE_sweepr");
    tokio::task::spawn_blocking(move || {
        Command::new(exe)
            .args(&args)
            .env_remove("SWEEPR_OUTPUT_DIR")
            .env_remove("SWEEPR_COOLDOWN")
            .output()
    })
    .await
    .context("spawn_blocking join")?
    .context("run sweepr binary")
}

/// Host-controlled plan against the test server with a shell stand-in for the load generator.
fn write_plan(dir: &Path, base_url: &str, generator: &str, control: &str) -> anyhow::Result<PathBuf> {
    let plan = format!(
        r#"settings:
  outputDir: {out}
  cooldown: 0s
  sampleInterval: 20ms
  probeInterval: 10ms
  baselineRequests: 3
  requestTimeout: 2s
  control: {control}
  containerCli: /nonexistent/sweepr-docker
  baselineUrl: {base_url}/health
  loadGenerator: ["{generator}", "-c", "sleep 0.2", "fake-generator"]
servers:
  - label: local
    container: local-id
paths:
  - label: slow
    path: /slow
candidates:
  - label: gentle
    connections: 1
    routines: 1
    frames: 10
    connectAttempts: 1
    url: {base_url}
    path: /health
"#,
        out = dir.join("results").display(),
    );
    let path = dir.join("plan.yaml");
    std::fs::write(&path, plan).context("write plan")?;
    Ok(path)
}

#[test]
fn invalid_flags_exit_30() -> anyhow::Result<()> {
    let exe = env!("CARGO_BIN_EXE_sweepr");

    let out = Command::new(exe)
        .arg("run")
        .arg("./does-not-matter.yaml")
        .arg("--cooldown")
        .arg("10x")
        .output()
        .context("run sweepr binary")?;

    ensure_code(&out, 30)
}

#[tokio::test]
async fn missing_plan_exit_30() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let missing = dir.path().join("nope.yaml");
    let out = sweepr(vec!["run".into(), missing.display().to_string()]).await?;
    ensure_code(&out, 30)
}

#[tokio::test]
async fn rank_of_unknown_server_exit_30() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let out = sweepr(vec![
        "rank".into(),
        "ghost".into(),
        "--output-dir".into(),
        dir.path().display().to_string(),
    ])
    .await?;
    ensure_code(&out, 30)
}

#[cfg(unix)]
#[tokio::test]
async fn host_sweep_completes_then_ranks_exit_0() -> anyhow::Result<()> {
    let server = TestServer::start().await.context("start test server")?;
    let dir = tempfile::tempdir()?;
    let plan = write_plan(dir.path(), server.base_url(), "sh", "host")?;

    let out = sweepr(vec!["run".into(), plan.display().to_string()]).await?;
    ensure_code(&out, 0)?;
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("completed=3 skipped=0 failed=0"), "{stdout}");

    let server_dir = dir.path().join("results").join("local");
    for run in ["baseline", "gentle", "FINAL_gentle_slow"] {
        assert!(server_dir.join(run).join("latency.txt").is_file(), "{run}");
    }

    let out = sweepr(vec![
        "rank".into(),
        "local".into(),
        "--output-dir".into(),
        dir.path().join("results").display().to_string(),
        "--include-final".into(),
    ])
    .await?;
    ensure_code(&out, 0)?;
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("FINAL_gentle_slow"), "{stdout}");

    let out = sweepr(vec!["status".into(), plan.display().to_string()]).await?;
    ensure_code(&out, 0)?;
    assert!(!String::from_utf8_lossy(&out.stdout).contains("pending"));

    server.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn failed_runs_exit_10() -> anyhow::Result<()> {
    let server = TestServer::start().await.context("start test server")?;
    let dir = tempfile::tempdir()?;
    let plan = write_plan(
        dir.path(),
        server.base_url(),
        "/nonexistent/sweepr-load-generator",
        "host",
    )?;

    let out = sweepr(vec!["run".into(), plan.display().to_string()]).await?;
    server.shutdown().await;

    ensure_code(&out, 10)?;
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("completed=1 skipped=0 failed=1"), "{stdout}");
    Ok(())
}

#[tokio::test]
async fn unusable_container_cli_exit_40() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let plan = write_plan(dir.path(), "http://127.0.0.1:9", "sh", "docker")?;

    let out = sweepr(vec!["run".into(), plan.display().to_string()]).await?;
    ensure_code(&out, 40)
}
