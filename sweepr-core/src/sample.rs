use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub value: f64,
    pub at: Instant,
}

/// Samples of one metric within one run, in recording order.
#[derive(Debug, Clone, Default)]
pub struct SampleSeries {
    samples: Vec<Sample>,
}

impl SampleSeries {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, value: f64) {
        self.push(Sample {
            value,
            at: Instant::now(),
        });
    }

    pub fn push(&mut self, sample: Sample) {
        debug_assert!(
            self.samples.last().is_none_or(|last| last.at <= sample.at),
            "samples must be recorded in time order"
        );
        self.samples.push(sample);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.samples.iter().map(|s| s.value)
    }

    /// `(seconds since first sample, value)` pairs.
    pub fn relative_points(&self) -> Vec<(f64, f64)> {
        let Some(first) = self.samples.first() else {
            return Vec::new();
        };
        self.samples
            .iter()
            .map(|s| (s.at.duration_since(first.at).as_secs_f64(), s.value))
            .collect()
    }
}

impl FromIterator<f64> for SampleSeries {
    fn from_iter<T: IntoIterator<Item = f64>>(iter: T) -> Self {
        let mut series = Self::new();
        for value in iter {
            series.record(value);
        }
        series
    }
}
