use crate::{DownloadResult, Status};

/// Summary of a download history.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Stats {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Mean elapsed seconds over successful downloads, `0.0` when there is none.
    pub average_elapsed: f64,
    /// Elapsed seconds distribution over successful downloads.
    pub elapsed: Metrics,
}

impl Stats {
    pub fn from_results(results: &[DownloadResult]) -> Self {
        let elapsed: Vec<f64> = results
            .iter()
            .filter_map(DownloadResult::elapsed)
            .map(|elapsed| elapsed.as_secs_f64())
            .collect();

        let total = results.len();
        let succeeded = results.iter().filter(|result| result.status() == Status::Success).count();
        let elapsed = Metrics::from_samples(&elapsed);

        Self {
            total,
            succeeded,
            failed: total - succeeded,
            average_elapsed: elapsed.mean,
            elapsed,
        }
    }
}

/// Descriptive statistics over a set of durations, in seconds.
///
/// Every field is `0.0` for an empty set. `std_dev` is the sample standard deviation and is `0.0`
/// with fewer than two samples.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Metrics {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub median: f64,
    pub std_dev: f64,
}

impl Metrics {
    pub fn from_samples(samples: &[f64]) -> Self {
        if samples.is_empty() {
            return Self::default();
        }

        let mut sorted = samples.to_vec();
        sorted.sort_by(f64::total_cmp);

        let count = sorted.len();
        let mean = sorted.iter().sum::<f64>() / count as f64;
        let median = match count % 2 {
            0 => (sorted[count / 2 - 1] + sorted[count / 2]) / 2.0,
            _ => sorted[count / 2],
        };
        let std_dev = if count > 1 {
            let variance = sorted.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (count - 1) as f64;
            variance.sqrt()
        } else {
            0.0
        };

        Self {
            count,
            min: sorted[0],
            max: sorted[count - 1],
            mean,
            median,
            std_dev,
        }
    }
}
