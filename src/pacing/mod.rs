//! Replay pacing against an injectable clock.

pub mod clock;
pub mod scheduler;

pub use clock::{Clock, ManualClock, SystemClock};
pub use scheduler::{PacingMode, PacingOutcome, PacingScheduler, target_interval};
