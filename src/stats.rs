//! Per-frame tracking time statistics.

use std::fmt;
use std::time::Duration;

/// Engine time for every processed frame, in replay order.
#[derive(Debug, Clone, Default)]
pub struct TimingLedger {
    durations: Vec<Duration>,
}

/// Summary of a finished run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimingSummary {
    pub count: usize,
    /// Element `count / 2` of the sorted durations (upper middle for even counts).
    pub median: Duration,
    pub mean: Duration,
    pub min: Duration,
    pub max: Duration,
    pub total: Duration,
}

impl TimingLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(n: usize) -> Self {
        Self {
            durations: Vec::with_capacity(n),
        }
    }

    pub fn record(&mut self, duration: Duration) {
        self.durations.push(duration);
    }

    pub fn durations(&self) -> &[Duration] {
        &self.durations
    }

    /// Consume the ledger. `None` when nothing was recorded.
    pub fn summarize(self) -> Option<TimingSummary> {
        let mut sorted = self.durations;
        if sorted.is_empty() {
            return None;
        }
        sorted.sort_unstable();

        let count = sorted.len();
        let total: Duration = sorted.iter().sum();
        let mean = Duration::from_nanos((total.as_nanos() / count as u128) as u64);

        Some(TimingSummary {
            count,
            median: sorted[count / 2],
            mean,
            min: sorted[0],
            max: sorted[count - 1],
            total,
        })
    }
}

impl fmt::Display for TimingSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "median tracking time: {:.6}", self.median.as_secs_f64())?;
        writeln!(f, "mean tracking time: {:.6}", self.mean.as_secs_f64())?;
        write!(
            f,
            "min/max tracking time: {:.6} / {:.6} ({} frames, {:.3} s total)",
            self.min.as_secs_f64(),
            self.max.as_secs_f64(),
            self.count,
            self.total.as_secs_f64()
        )
    }
}
