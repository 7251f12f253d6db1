use std::path::Path;

use crate::metric::Metric;
use crate::stats::Stats;

/// What a run directory holds right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum RunState {
    Absent,
    /// Exists but has no readable latency record (interrupted or failed run).
    Incomplete,
    Complete,
}

/// A run is complete once its latency record exists and parses. It is written last,
/// so an interrupted run is always re-measured on the next sweep.
pub fn is_complete(run_dir: &Path) -> bool {
    let record = run_dir.join(Metric::Latency.record_file_name());
    record.is_file() && Stats::read_from(&record).is_ok()
}

pub fn run_state(run_dir: &Path) -> RunState {
    if is_complete(run_dir) {
        RunState::Complete
    } else if run_dir.exists() {
        RunState::Incomplete
    } else {
        RunState::Absent
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::aggregate::aggregate_series;
    use crate::sample::SampleSeries;

    fn write_record(dir: &Path, metric: Metric) {
        let stats = Stats::from_values(&metric.to_string(), [1.0, 2.0]).unwrap();
        std::fs::write(dir.join(metric.record_file_name()), stats.to_string()).unwrap();
    }

    #[test]
    fn missing_directory_is_incomplete() {
        let dir = tempfile::tempdir().unwrap();
        let run = dir.path().join("never-ran");
        assert!(!is_complete(&run));
        assert_eq!(run_state(&run), RunState::Absent);
    }

    #[test]
    fn partial_records_are_incomplete_until_latency_exists() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(run_state(dir.path()), RunState::Incomplete);

        write_record(dir.path(), Metric::Cpu);
        write_record(dir.path(), Metric::Mem);
        assert!(!is_complete(dir.path()));
        assert_eq!(run_state(dir.path()), RunState::Incomplete);

        write_record(dir.path(), Metric::Latency);
        assert!(is_complete(dir.path()));
        assert_eq!(run_state(dir.path()), RunState::Complete);
    }

    #[test]
    fn truncated_latency_record_is_incomplete() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("latency.txt"), "Stats type: latency\nmedian: 1\n")
            .unwrap();
        assert!(!is_complete(dir.path()));
    }

    #[test]
    fn rerun_after_torn_latency_record_is_complete() {
        for torn in ["Stats type: latency\nmedian: 1\n", "Stats type: latency\nmedian: 1"] {
            let dir = tempfile::tempdir().unwrap();
            std::fs::write(dir.path().join("latency.txt"), torn).unwrap();
            assert_eq!(run_state(dir.path()), RunState::Incomplete);

            let series: SampleSeries = [10.0, 20.0, 30.0].into_iter().collect();
            aggregate_series(&series, Metric::Latency, dir.path()).unwrap();
            assert_eq!(run_state(dir.path()), RunState::Complete);

            let stats = Stats::read_from(&dir.path().join("latency.txt")).unwrap();
            assert_eq!(stats.median, 20.0);
        }
    }
}
