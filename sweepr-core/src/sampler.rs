use std::time::Duration;

use tokio::task::JoinHandle;

use crate::cancel::CancellationToken;
use crate::sample::SampleSeries;
use crate::source::MetricSource;

pub const DEFAULT_SAMPLE_INTERVAL: Duration = Duration::from_secs(1);

/// Polls `source` every `interval` until `token` is cancelled.
///
/// The source is read at least once, even if `token` is already cancelled. A failed
/// read is logged and skipped; the loop keeps going so a single hiccup of the metric
/// source never costs the rest of the series.
pub async fn sample_until_cancelled<S: MetricSource>(
    source: &S,
    token: &CancellationToken,
    interval: Duration,
) -> SampleSeries {
    let mut series = SampleSeries::new();
    let mut skipped = 0u64;

    loop {
        match source.read().await {
            Ok(value) => series.record(value),
            Err(err) => {
                skipped += 1;
                tracing::warn!(source = source.name(), error = %err, "skipping metric sample");
            }
        }

        if token.sleep(interval).await {
            break;
        }
    }

    tracing::debug!(
        source = source.name(),
        samples = series.len(),
        skipped,
        "metric sampler stopped"
    );
    series
}

/// Spawns a sampler task; join it after cancelling `token` to collect the series.
pub fn spawn_sampler<S: MetricSource>(
    source: S,
    token: CancellationToken,
    interval: Duration,
) -> JoinHandle<SampleSeries> {
    tokio::spawn(async move { sample_until_cancelled(&source, &token, interval).await })
}
