pub mod engine;
pub mod io;
pub mod masking;
pub mod pacing;
pub mod preprocess;
pub mod stats;
pub mod system;
