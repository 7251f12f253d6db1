use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Summary of one series. This is what gets persisted and compared across runs.
#[derive(Debug, Clone, PartialEq)]
pub struct Stats {
    pub name: String,
    pub median: f64,
    pub mean: f64,
    /// Sample standard deviation (n - 1); zero for a single sample.
    pub stdev: f64,
    pub min: f64,
    pub max: f64,
}

impl Stats {
    /// Returns `None` for an empty sequence.
    pub fn from_values(name: &str, values: impl IntoIterator<Item = f64>) -> Option<Self> {
        let mut values: Vec<f64> = values.into_iter().collect();
        if values.is_empty() {
            return None;
        }
        values.sort_by(f64::total_cmp);

        let n = values.len();
        let mean = values.iter().sum::<f64>() / n as f64;
        let median = if n % 2 == 1 {
            values[n / 2]
        } else {
            (values[n / 2 - 1] + values[n / 2]) / 2.0
        };
        let stdev = if n < 2 {
            0.0
        } else {
            let ss: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
            (ss / (n as f64 - 1.0)).sqrt()
        };

        Some(Self {
            name: name.to_string(),
            median,
            // Rounding can push the mean a hair outside the observed range.
            mean: mean.clamp(values[0], values[n - 1]),
            stdev,
            min: values[0],
            max: values[n - 1],
        })
    }

    /// Ranking score for attack configurations: `median + mean` latency.
    ///
    /// Higher means the configuration degraded the target more, so higher wins.
    pub fn degradation_score(&self) -> f64 {
        self.median + self.mean
    }

    pub fn read_from(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        text.parse::<Self>().map_err(|message| Error::StatsRecord {
            path: path.to_path_buf(),
            message,
        })
    }
}

const KEY_NAME: &str = "Stats type";
const KEY_MEDIAN: &str = "median";
const KEY_MEAN: &str = "mean";
const KEY_STDEV: &str = "standard deviation";
const KEY_MIN: &str = "min";
const KEY_MAX: &str = "max";

/// The persisted text record: six `key: value` lines.
impl fmt::Display for Stats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{KEY_NAME}: {}", self.name)?;
        writeln!(f, "{KEY_MEDIAN}: {}", self.median)?;
        writeln!(f, "{KEY_MEAN}: {}", self.mean)?;
        writeln!(f, "{KEY_STDEV}: {}", self.stdev)?;
        writeln!(f, "{KEY_MIN}: {}", self.min)?;
        writeln!(f, "{KEY_MAX}: {}", self.max)
    }
}

/// Parses the last complete record in `s`.
///
/// Records are appended per attempt, so a file may hold earlier attempts and torn
/// fragments of interrupted writes. Each `Stats type` line starts a record.
impl FromStr for Stats {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let lines: Vec<&str> = s.lines().collect();
        let starts: Vec<usize> = lines
            .iter()
            .enumerate()
            .filter(|(_, line)| line.trim_start().starts_with(KEY_NAME))
            .map(|(i, _)| i)
            .collect();

        let mut last_err = format!("missing `{KEY_NAME}` line");
        for (n, &start) in starts.iter().enumerate().rev() {
            let end = starts.get(n + 1).copied().unwrap_or(lines.len());
            match parse_record(&lines[start..end]) {
                Ok(stats) => return Ok(stats),
                Err(err) if n + 1 == starts.len() => last_err = err,
                Err(_) => {}
            }
        }
        Err(last_err)
    }
}

fn parse_record(record: &[&str]) -> std::result::Result<Stats, String> {
    let mut lines = record.iter();
    let mut field = |key: &str| -> std::result::Result<String, String> {
        let line = lines
            .next()
            .ok_or_else(|| format!("missing `{key}` line"))?;
        let (k, v) = line
            .split_once(':')
            .ok_or_else(|| format!("expected `{key}: <value>`, got `{line}`"))?;
        if k.trim() != key {
            return Err(format!("expected `{key}`, got `{}`", k.trim()));
        }
        Ok(v.trim().to_string())
    };

    let name = field(KEY_NAME)?;
    let mut number = |key: &str| -> std::result::Result<f64, String> {
        let raw = field(key)?;
        raw.parse::<f64>()
            .map_err(|_| format!("`{key}` is not a number: {raw}"))
    };

    Ok(Stats {
        median: number(KEY_MEDIAN)?,
        mean: number(KEY_MEAN)?,
        stdev: number(KEY_STDEV)?,
        min: number(KEY_MIN)?,
        max: number(KEY_MAX)?,
        name,
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    fn stats(values: &[f64]) -> Stats {
        Stats::from_values("latency", values.iter().copied()).unwrap()
    }

    #[test]
    fn empty_sequence_has_no_stats() {
        assert!(Stats::from_values("cpu", std::iter::empty()).is_none());
    }

    #[test]
    fn identical_values_have_zero_spread() {
        let s = stats(&[4.5, 4.5, 4.5, 4.5]);
        assert_eq!(s.mean, 4.5);
        assert_eq!(s.median, 4.5);
        assert_eq!(s.stdev, 0.0);
        assert_eq!(s.min, 4.5);
        assert_eq!(s.max, 4.5);
    }

    #[test]
    fn single_value_has_zero_stdev() {
        let s = stats(&[7.0]);
        assert_eq!(s.stdev, 0.0);
        assert_eq!(s.median, 7.0);
    }

    #[test]
    fn known_values() {
        let s = stats(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert_eq!(s.mean, 5.0);
        assert_eq!(s.median, 4.5);
        assert_eq!(s.min, 2.0);
        assert_eq!(s.max, 9.0);
        assert!((s.stdev - (32.0f64 / 7.0).sqrt()).abs() < 1e-12);

        let odd = stats(&[9.0, 1.0, 5.0]);
        assert_eq!(odd.median, 5.0);
    }

    #[test]
    fn central_values_stay_within_range() {
        let inputs: [&[f64]; 4] = [
            &[0.1, 0.2, 0.3],
            &[1e300, 1e300, 1e300],
            &[-3.0, 10.0, 0.5, 0.25, 99.0],
            &[0.1; 7],
        ];
        for values in inputs {
            let s = stats(values);
            assert!(s.min <= s.median && s.median <= s.max, "{s:?}");
            assert!(s.min <= s.mean && s.mean <= s.max, "{s:?}");
        }
    }

    #[test]
    fn degradation_score_is_median_plus_mean() {
        let s = Stats {
            name: "latency".to_string(),
            median: 5.0,
            mean: 7.0,
            stdev: 1.0,
            min: 1.0,
            max: 10.0,
        };
        assert_eq!(s.degradation_score(), 12.0);
    }

    #[test]
    fn record_parses_back_exactly() {
        let s = stats(&[0.1, 12.345678901, 3.0, 1e-7]);
        let text = s.to_string();
        assert!(text.starts_with("Stats type: latency\nmedian: "));
        assert_eq!(text.parse::<Stats>().unwrap(), s);
    }

    #[test]
    fn parse_reads_last_of_appended_records() {
        let first = stats(&[1.0, 2.0]);
        let second = stats(&[5.0, 6.0]);
        let text = format!("{first}{second}");
        assert_eq!(text.parse::<Stats>().unwrap(), second);
    }

    #[test]
    fn parse_skips_torn_fragments() {
        let good = stats(&[3.0, 4.0]);
        let text = format!("Stats type: latency\nmedian: 1\n{good}");
        assert_eq!(text.parse::<Stats>().unwrap(), good);

        // A torn write after a complete record leaves the earlier record in force.
        let text = format!("{good}Stats type: latency\nmedian: 9\n");
        assert_eq!(text.parse::<Stats>().unwrap(), good);
    }

    #[test]
    fn parse_rejects_truncated_or_mislabeled_records() {
        assert!("Stats type: cpu\nmedian: 1\n".parse::<Stats>().is_err());
        assert!(
            "Stats type: cpu\nmean: 1\nmedian: 1\nstandard deviation: 0\nmin: 1\nmax: 1\n"
                .parse::<Stats>()
                .is_err()
        );
        assert!(
            "Stats type: cpu\nmedian: x\nmean: 1\nstandard deviation: 0\nmin: 1\nmax: 1\n"
                .parse::<Stats>()
                .is_err()
        );
    }
}
