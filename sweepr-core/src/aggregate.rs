use std::fs::OpenOptions;
use std::io::Write as _;
use std::path::Path;

use crate::error::{Error, Result};
use crate::metric::Metric;
use crate::plot::render_series_plot;
use crate::sample::SampleSeries;
use crate::stats::Stats;

/// Reduces `series` to [`Stats`] and persists the chart and text record into `run_dir`.
///
/// Only an empty series is an error. Failing to write either artifact is logged and the
/// computed stats are still returned.
pub fn aggregate_series(series: &SampleSeries, metric: Metric, run_dir: &Path) -> Result<Stats> {
    let name = metric.to_string();
    let stats = Stats::from_values(&name, series.values()).ok_or(Error::EmptySeries(name))?;

    let plot_path = run_dir.join(metric.plot_file_name());
    if let Err(err) = render_series_plot(series, &stats, &plot_path) {
        tracing::warn!(%metric, path = %plot_path.display(), error = %err, "failed to write plot");
    }

    let record_path = run_dir.join(metric.record_file_name());
    if let Err(err) = append_record(&record_path, &stats) {
        tracing::warn!(%metric, path = %record_path.display(), error = %err, "failed to write stats record");
    }

    tracing::debug!(
        %metric,
        samples = series.len(),
        median = stats.median,
        mean = stats.mean,
        "aggregated series"
    );
    Ok(stats)
}

/// Appends one record, starting on a fresh line so a torn tail cannot merge into it.
fn append_record(path: &Path, stats: &Stats) -> std::io::Result<()> {
    let torn_tail = match std::fs::read(path) {
        Ok(existing) => existing.last().is_some_and(|&b| b != b'\n'),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => false,
        Err(err) => return Err(err),
    };
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    if torn_tail {
        file.write_all(b"\n")?;
    }
    file.write_all(stats.to_string().as_bytes())?;
    file.sync_data()
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn writes_record_and_plot() {
        let dir = tempfile::tempdir().unwrap();
        let series: SampleSeries = [10.0, 20.0, 30.0].into_iter().collect();

        let stats = aggregate_series(&series, Metric::Latency, dir.path()).unwrap();
        assert_eq!(stats.name, "latency");
        assert_eq!(stats.median, 20.0);

        let persisted = Stats::read_from(&dir.path().join("latency.txt")).unwrap();
        assert_eq!(persisted, stats);
        assert!(dir.path().join("latency_plot.png").is_file());
    }

    #[test]
    fn empty_series_fails_without_writing() {
        let dir = tempfile::tempdir().unwrap();
        let err = aggregate_series(&SampleSeries::new(), Metric::Cpu, dir.path()).unwrap_err();
        assert!(matches!(err, Error::EmptySeries(ref name) if name == "cpu"));
        assert!(!dir.path().join("cpu.txt").exists());
    }

    #[test]
    fn missing_directory_still_returns_stats() {
        let dir = tempfile::tempdir().unwrap();
        let gone = dir.path().join("not-created");
        let series: SampleSeries = [1.0, 3.0].into_iter().collect();

        let stats = aggregate_series(&series, Metric::Mem, &gone).unwrap();
        assert_eq!(stats.mean, 2.0);
        assert!(!gone.exists());
    }

    #[test]
    fn records_are_appended() {
        let dir = tempfile::tempdir().unwrap();
        let first: SampleSeries = [1.0].into_iter().collect();
        let second: SampleSeries = [9.0].into_iter().collect();

        aggregate_series(&first, Metric::Cpu, dir.path()).unwrap();
        aggregate_series(&second, Metric::Cpu, dir.path()).unwrap();

        let text = std::fs::read_to_string(dir.path().join("cpu.txt")).unwrap();
        assert_eq!(text.matches("Stats type: cpu").count(), 2);
    }

    #[test]
    fn second_record_wins() {
        let dir = tempfile::tempdir().unwrap();
        let first: SampleSeries = [1.0].into_iter().collect();
        let second: SampleSeries = [9.0].into_iter().collect();

        aggregate_series(&first, Metric::Latency, dir.path()).unwrap();
        aggregate_series(&second, Metric::Latency, dir.path()).unwrap();

        let persisted = Stats::read_from(&dir.path().join("latency.txt")).unwrap();
        assert_eq!(persisted.median, 9.0);
        assert_eq!(persisted.max, 9.0);
    }

    #[test]
    fn record_after_torn_tail_starts_on_new_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("latency.txt");
        std::fs::write(&path, "Stats type: latency\nmedian: 4").unwrap();

        let series: SampleSeries = [2.0, 6.0].into_iter().collect();
        let stats = aggregate_series(&series, Metric::Latency, dir.path()).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("median: 4\nStats type: latency\n"));
        assert_eq!(Stats::read_from(&path).unwrap(), stats);
    }
}
