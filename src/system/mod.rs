//! Replay orchestration.
//!
//! `Replay` owns the tracking engine, the frame loader and the pacing
//! scheduler, and drives a manifest through them one frame at a time.

mod replay;

pub use replay::{Replay, ReplayConfig, ReplayReport};
