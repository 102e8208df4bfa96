//! Replay pacing: hold each frame for its recorded inter-frame interval.

use std::time::Duration;

use tracing::trace;

use super::clock::Clock;

/// How frame delivery is throttled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PacingMode {
    /// Wait out the recorded interval minus the engine's processing time.
    #[default]
    Realtime,
    /// Deliver frames back to back.
    Unthrottled,
}

/// What the scheduler did after a frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PacingOutcome {
    /// Slept for the remainder of the interval.
    Slept(Duration),
    /// Engine took at least the whole interval; `lag` is the overrun.
    Behind { lag: Duration },
    /// No positive interval to wait for (single frame, repeated or unordered timestamps).
    NoInterval,
    /// Pacing disabled.
    Unthrottled,
}

/// Recorded interval for frame `index` in seconds.
///
/// Uses the gap to the next frame, the gap to the previous one for the last
/// frame, and zero for a single-frame sequence.
pub fn target_interval(timestamps: &[f64], index: usize) -> f64 {
    let n = timestamps.len();
    if index + 1 < n {
        timestamps[index + 1] - timestamps[index]
    } else if index > 0 && index < n {
        timestamps[index] - timestamps[index - 1]
    } else {
        0.0
    }
}

/// Throttles frame delivery against a [`Clock`].
pub struct PacingScheduler<C: Clock> {
    clock: C,
    mode: PacingMode,
}

impl<C: Clock> PacingScheduler<C> {
    pub fn new(clock: C, mode: PacingMode) -> Self {
        Self { clock, mode }
    }

    /// Run `f` and return its result with the elapsed monotonic time.
    pub fn measure<R>(&self, f: impl FnOnce() -> R) -> (R, Duration) {
        let t1 = self.clock.now();
        let result = f();
        let t2 = self.clock.now();
        (result, t2.saturating_sub(t1))
    }

    /// Sleep off the rest of frame `index`'s interval given the time the
    /// engine spent on it. Never catches up on earlier overruns.
    pub fn pace(&self, timestamps: &[f64], index: usize, elapsed: Duration) -> PacingOutcome {
        if self.mode == PacingMode::Unthrottled {
            return PacingOutcome::Unthrottled;
        }

        let target = target_interval(timestamps, index);
        // Negative, NaN or overflowing intervals come from malformed manifests.
        if target <= 0.0 {
            return PacingOutcome::NoInterval;
        }
        let Ok(target) = Duration::try_from_secs_f64(target) else {
            return PacingOutcome::NoInterval;
        };
        if elapsed < target {
            let wait = target - elapsed;
            trace!(frame = index, wait_ms = wait.as_secs_f64() * 1e3, "pacing");
            self.clock.sleep(wait);
            PacingOutcome::Slept(wait)
        } else {
            PacingOutcome::Behind {
                lag: elapsed - target,
            }
        }
    }
}
