//! Replay loop: feed a recorded sequence to a tracking engine at the
//! original capture cadence.
//!
//! Per frame, strictly in order: decode images, preprocess masks, time the
//! engine call, sleep off the rest of the recorded interval, record the
//! engine time. After the last frame the engine is shut down, statistics
//! are reported and the trajectory is saved.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::engine::TrackingEngine;
use crate::io::{FrameLoader, Manifest};
use crate::masking::{MaskPair, MaskPreprocessor, StructuringElement};
use crate::pacing::{Clock, PacingMode, PacingOutcome, PacingScheduler};
use crate::stats::{TimingLedger, TimingSummary};

/// Log progress every this many frames.
const PROGRESS_INTERVAL: usize = 100;

/// Configuration for a replay run.
#[derive(Debug, Clone)]
pub struct ReplayConfig {
    pub pacing: PacingMode,
    /// Square erosion kernel side; `None` or zero passes masks through.
    pub kernel_size: Option<u32>,
    /// Where the engine saves its trajectory.
    pub trajectory_path: PathBuf,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            pacing: PacingMode::Realtime,
            kernel_size: None,
            trajectory_path: PathBuf::from("CameraTrajectory.txt"),
        }
    }
}

/// Outcome of a replay run.
#[derive(Debug, Clone, Default)]
pub struct ReplayReport {
    pub frames: usize,
    pub masked_frames: usize,
    /// Frames whose engine call took at least the recorded interval.
    pub late_frames: usize,
    pub total_sleep: Duration,
    /// `None` for an empty manifest.
    pub timing: Option<TimingSummary>,
    /// Engine time per frame, in replay order.
    pub durations: Vec<Duration>,
}

pub struct Replay<E, L, C>
where
    E: TrackingEngine,
    L: FrameLoader,
    C: Clock,
{
    engine: E,
    loader: L,
    scheduler: PacingScheduler<C>,
    preprocessor: MaskPreprocessor,
    config: ReplayConfig,
}

impl<E, L, C> Replay<E, L, C>
where
    E: TrackingEngine,
    L: FrameLoader,
    C: Clock,
{
    pub fn new(engine: E, loader: L, clock: C, config: ReplayConfig) -> Self {
        let element = StructuringElement::from_kernel_size(config.kernel_size);
        Self {
            engine,
            loader,
            scheduler: PacingScheduler::new(clock, config.pacing),
            preprocessor: MaskPreprocessor::new(element),
            config,
        }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Replay every frame of `manifest`, then shut the engine down, report
    /// timing and save the trajectory.
    ///
    /// An empty manifest does nothing beyond stopping the engine. Any load
    /// or engine error aborts the run before the trajectory is saved.
    pub fn run(&mut self, manifest: &Manifest) -> Result<ReplayReport> {
        if manifest.is_empty() {
            warn!("Manifest is empty, nothing to replay");
            self.engine.shutdown();
            return Ok(ReplayReport::default());
        }

        let mut report = ReplayReport {
            frames: manifest.len(),
            ..ReplayReport::default()
        };
        let ledger = self.replay_frames(manifest, &mut report)?;

        self.engine.shutdown();

        report.durations = ledger.durations().to_vec();
        report.timing = ledger.summarize();
        if let Some(timing) = &report.timing {
            info!(
                median_s = timing.median.as_secs_f64(),
                mean_s = timing.mean.as_secs_f64(),
                late = report.late_frames,
                "Tracking time statistics"
            );
        }

        self.engine.save_trajectory(&self.config.trajectory_path)?;
        Ok(report)
    }

    fn replay_frames(
        &mut self,
        manifest: &Manifest,
        report: &mut ReplayReport,
    ) -> Result<TimingLedger> {
        let timestamps = manifest.timestamps();
        let mut ledger = TimingLedger::with_capacity(manifest.len());

        for (i, entry) in manifest.iter().enumerate() {
            let left = self.loader.load_image(&entry.left_image)?;
            let right = self.loader.load_image(&entry.right_image)?;

            let raw_masks = match &entry.masks {
                Some(paths) => Some(MaskPair {
                    left: self.loader.load_mask(&paths.left)?,
                    right: self.loader.load_mask(&paths.right)?,
                }),
                None => None,
            };
            let masks = self.preprocessor.process(raw_masks)?;
            if masks.is_some() {
                report.masked_frames += 1;
            }

            let engine = &mut self.engine;
            let (result, elapsed) = self.scheduler.measure(|| {
                engine.track_stereo(&left, &right, masks.as_ref(), entry.timestamp)
            });
            result?;
            ledger.record(elapsed);

            match self.scheduler.pace(&timestamps, i, elapsed) {
                PacingOutcome::Slept(wait) => report.total_sleep += wait,
                PacingOutcome::Behind { lag } => {
                    report.late_frames += 1;
                    debug!(frame = i, lag_ms = lag.as_secs_f64() * 1e3, "Engine behind cadence");
                }
                PacingOutcome::NoInterval | PacingOutcome::Unthrottled => {}
            }

            if i % PROGRESS_INTERVAL == 0 {
                info!(
                    "Frame {}/{} (t={:.3}): tracked in {:.1} ms",
                    i,
                    manifest.len(),
                    entry.timestamp,
                    elapsed.as_secs_f64() * 1e3
                );
            }
        }

        Ok(ledger)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::sync::Arc;

    use anyhow::bail;
    use approx::assert_relative_eq;
    use image::{DynamicImage, GrayImage, Luma};

    use crate::io::{FrameEntry, MaskPaths};
    use crate::pacing::ManualClock;

    /// Engine that takes a scripted amount of virtual time per frame.
    struct ScriptedEngine {
        clock: Arc<ManualClock>,
        durations: Vec<Duration>,
        calls: Vec<Call>,
        shutdowns: usize,
        saved: Option<PathBuf>,
    }

    #[derive(Debug, Clone)]
    struct Call {
        start: Duration,
        timestamp: f64,
        masks: Option<MaskPair>,
    }

    impl ScriptedEngine {
        fn new(clock: Arc<ManualClock>, durations_s: &[f64]) -> Self {
            Self {
                clock,
                durations: durations_s.iter().map(|&s| Duration::from_secs_f64(s)).collect(),
                calls: Vec::new(),
                shutdowns: 0,
                saved: None,
            }
        }
    }

    impl TrackingEngine for ScriptedEngine {
        fn track_stereo(
            &mut self,
            _left: &DynamicImage,
            _right: &DynamicImage,
            masks: Option<&MaskPair>,
            timestamp: f64,
        ) -> Result<()> {
            let idx = self.calls.len();
            self.calls.push(Call {
                start: self.clock.now(),
                timestamp,
                masks: masks.cloned(),
            });
            let d = self.durations.get(idx).copied().unwrap_or_default();
            self.clock.advance(d);
            Ok(())
        }

        fn shutdown(&mut self) {
            self.shutdowns += 1;
        }

        fn save_trajectory(&mut self, path: &Path) -> Result<()> {
            self.saved = Some(path.to_path_buf());
            Ok(())
        }
    }

    /// Serves blank frames; any path containing "missing" fails to load.
    struct MemoryLoader {
        mask: GrayImage,
    }

    impl MemoryLoader {
        fn new() -> Self {
            let mut mask = GrayImage::from_pixel(5, 5, Luma([255]));
            mask.put_pixel(2, 2, Luma([0]));
            Self { mask }
        }
    }

    impl FrameLoader for MemoryLoader {
        fn load_image(&self, path: &Path) -> Result<DynamicImage> {
            if path.to_string_lossy().contains("missing") {
                bail!("Failed to load image at: {}", path.display());
            }
            Ok(DynamicImage::ImageLuma8(GrayImage::new(5, 5)))
        }

        fn load_mask(&self, path: &Path) -> Result<GrayImage> {
            if path.to_string_lossy().contains("missing") {
                bail!("Failed to load mask at: {}", path.display());
            }
            Ok(self.mask.clone())
        }
    }

    fn manifest(timestamps: &[f64], masked: bool) -> Manifest {
        Manifest::new(
            timestamps
                .iter()
                .enumerate()
                .map(|(i, &timestamp)| FrameEntry {
                    left_image: PathBuf::from(format!("left/{i}.png")),
                    right_image: PathBuf::from(format!("right/{i}.png")),
                    timestamp,
                    masks: masked.then(|| MaskPaths {
                        left: PathBuf::from(format!("mask_left/{i}.png")),
                        right: PathBuf::from(format!("mask_right/{i}.png")),
                    }),
                })
                .collect(),
        )
    }

    fn replay(
        durations_s: &[f64],
        config: ReplayConfig,
    ) -> (
        Replay<ScriptedEngine, MemoryLoader, Arc<ManualClock>>,
        Arc<ManualClock>,
    ) {
        let clock = Arc::new(ManualClock::new());
        let engine = ScriptedEngine::new(clock.clone(), durations_s);
        let replay = Replay::new(engine, MemoryLoader::new(), clock.clone(), config);
        (replay, clock)
    }

    #[test]
    fn test_three_frame_scenario() {
        let (mut replay, clock) = replay(&[0.02, 0.05, 0.01], ReplayConfig::default());
        let report = replay.run(&manifest(&[0.0, 0.1, 0.3], false)).unwrap();

        let sleeps = clock.sleeps();
        assert_eq!(sleeps.len(), 3);
        assert_relative_eq!(sleeps[0].as_secs_f64(), 0.08, epsilon = 1e-6);
        assert_relative_eq!(sleeps[1].as_secs_f64(), 0.15, epsilon = 1e-6);
        // Last frame falls back to the previous interval (0.2 s).
        assert_relative_eq!(sleeps[2].as_secs_f64(), 0.19, epsilon = 1e-6);

        let timing = report.timing.unwrap();
        assert_eq!(timing.count, 3);
        assert_relative_eq!(timing.median.as_secs_f64(), 0.02, epsilon = 1e-6);
        assert_relative_eq!(timing.mean.as_secs_f64(), 0.08 / 3.0, epsilon = 1e-6);
        assert_eq!(report.durations.len(), 3);
        assert_eq!(report.late_frames, 0);

        let engine = replay.engine();
        assert_eq!(engine.shutdowns, 1);
        assert_eq!(engine.saved, Some(PathBuf::from("CameraTrajectory.txt")));
    }

    #[test]
    fn test_call_starts_follow_recorded_intervals() {
        let (mut replay, _clock) = replay(&[0.02, 0.05, 0.01], ReplayConfig::default());
        replay.run(&manifest(&[0.0, 0.1, 0.3], false)).unwrap();

        let calls = &replay.engine().calls;
        let gap01 = (calls[1].start - calls[0].start).as_secs_f64();
        let gap12 = (calls[2].start - calls[1].start).as_secs_f64();
        assert_relative_eq!(gap01, 0.1, epsilon = 1e-6);
        assert_relative_eq!(gap12, 0.2, epsilon = 1e-6);
        assert_eq!(
            calls.iter().map(|c| c.timestamp).collect::<Vec<_>>(),
            vec![0.0, 0.1, 0.3]
        );
    }

    #[test]
    fn test_slow_engine_is_not_paced() {
        let (mut replay, clock) = replay(&[0.15, 0.15], ReplayConfig::default());
        let report = replay.run(&manifest(&[0.0, 0.1], false)).unwrap();

        assert!(clock.sleeps().is_empty());
        assert_eq!(report.late_frames, 2);
        let calls = &replay.engine().calls;
        assert_relative_eq!(
            (calls[1].start - calls[0].start).as_secs_f64(),
            0.15,
            epsilon = 1e-6
        );
    }

    #[test]
    fn test_empty_manifest_is_noop() {
        let (mut replay, clock) = replay(&[], ReplayConfig::default());
        let report = replay.run(&Manifest::default()).unwrap();

        assert!(report.timing.is_none());
        assert_eq!(report.frames, 0);
        assert!(clock.sleeps().is_empty());
        assert!(replay.engine().calls.is_empty());
        assert!(replay.engine().saved.is_none());
    }

    #[test]
    fn test_ledger_matches_frame_count() {
        let timestamps: Vec<f64> = (0..25).map(|i| i as f64 * 0.05).collect();
        let (mut replay, _clock) = replay(&[0.01; 25], ReplayConfig::default());
        let report = replay.run(&manifest(&timestamps, false)).unwrap();
        assert_eq!(report.durations.len(), 25);
        assert_eq!(report.timing.unwrap().count, 25);
    }

    #[test]
    fn test_masks_eroded_when_kernel_set() {
        let config = ReplayConfig {
            kernel_size: Some(3),
            ..ReplayConfig::default()
        };
        let (mut replay, _clock) = replay(&[0.0], config);
        let report = replay.run(&manifest(&[0.0], true)).unwrap();
        assert_eq!(report.masked_frames, 1);

        let masks = replay.engine().calls[0].masks.clone().unwrap();
        // The excluded centre pixel grows to a 3x3 block.
        assert_eq!(masks.left.get_pixel(1, 1)[0], 0);
        assert_eq!(masks.right.get_pixel(3, 3)[0], 0);
        assert_eq!(masks.left.get_pixel(0, 0)[0], 255);
    }

    #[test]
    fn test_masks_passed_through_without_kernel() {
        let (mut replay, _clock) = replay(&[0.0], ReplayConfig::default());
        replay.run(&manifest(&[0.0], true)).unwrap();

        let masks = replay.engine().calls[0].masks.clone().unwrap();
        assert_eq!(masks.left, MemoryLoader::new().mask);
    }

    #[test]
    fn test_unmasked_frames_use_plain_tracking() {
        let (mut replay, _clock) = replay(&[0.0, 0.0], ReplayConfig::default());
        let report = replay.run(&manifest(&[0.0, 0.1], false)).unwrap();
        assert_eq!(report.masked_frames, 0);
        assert!(replay.engine().calls.iter().all(|c| c.masks.is_none()));
    }

    #[test]
    fn test_missing_image_aborts_without_saving() {
        let mut frames = manifest(&[0.0, 0.1, 0.2], false);
        frames.frames[1].left_image = PathBuf::from("left/missing.png");

        let (mut replay, _clock) = replay(&[0.0; 3], ReplayConfig::default());
        let err = replay.run(&frames).unwrap_err();
        assert!(err.to_string().contains("missing.png"));

        let engine = replay.engine();
        assert_eq!(engine.calls.len(), 1);
        assert!(engine.saved.is_none());
    }

    #[test]
    fn test_missing_mask_aborts_without_saving() {
        let mut frames = manifest(&[0.0, 0.1, 0.2], true);
        if let Some(masks) = frames.frames[1].masks.as_mut() {
            masks.right = PathBuf::from("mask_right/missing.png");
        }

        let (mut replay, _clock) = replay(&[0.0; 3], ReplayConfig::default());
        let err = replay.run(&frames).unwrap_err();
        assert!(err.to_string().contains("mask_right/missing.png"));

        let engine = replay.engine();
        assert_eq!(engine.calls.len(), 1);
        assert!(engine.saved.is_none());
    }

    #[test]
    fn test_unthrottled_never_sleeps() {
        let config = ReplayConfig {
            pacing: PacingMode::Unthrottled,
            ..ReplayConfig::default()
        };
        let (mut replay, clock) = replay(&[0.01, 0.01], config);
        let report = replay.run(&manifest(&[0.0, 1.0], false)).unwrap();
        assert!(clock.sleeps().is_empty());
        assert_eq!(report.total_sleep, Duration::ZERO);
    }
}
