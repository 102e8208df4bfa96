//! Recording engine: a stand-in tracker that logs what it was fed.
//!
//! Each delivered frame is summarized on the caller's thread and handed to
//! a background log thread over a bounded channel, the same split the
//! replay loop will see with a real multi-threaded engine. The persisted
//! "trajectory" is the delivery log, one CSV row per frame.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use anyhow::{Context, Result, bail};
use crossbeam_channel::{Receiver, Sender, bounded};
use image::{DynamicImage, GenericImageView};
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::settings::EngineSettings;
use super::TrackingEngine;
use crate::io::images::active_fraction;
use crate::masking::MaskPair;

/// Capacity of the channel between the replay thread and the log thread.
/// When the channel is full, `track_stereo` blocks briefly.
const DELIVERY_CHANNEL_CAPACITY: usize = 16;

/// Relative deviation from the nominal frame interval before a recorded gap
/// counts as off-cadence.
const CADENCE_TOLERANCE: f64 = 0.5;

/// One row of the delivery log.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeliveryRecord {
    pub frame: usize,
    /// Recorded capture time (s).
    pub timestamp: f64,
    /// Wall-clock arrival relative to the first frame (s).
    pub arrival: f64,
    pub width: u32,
    pub height: u32,
    pub masked: bool,
    /// Fraction of usable (non-zero) pixels in each mask; 1.0 when unmasked.
    pub left_active: f64,
    pub right_active: f64,
}

/// State shared with the log thread.
#[derive(Default)]
struct DeliveryLog {
    records: Mutex<Vec<DeliveryRecord>>,
    shutdown_requested: AtomicBool,
}

pub struct RecordingEngine {
    settings: EngineSettings,
    log: Arc<DeliveryLog>,
    sender: Option<Sender<DeliveryRecord>>,
    log_handle: Option<JoinHandle<()>>,
    first_arrival: Option<Instant>,
    last_timestamp: Option<f64>,
    off_cadence: usize,
    frames: usize,
    size_warned: bool,
}

impl RecordingEngine {
    /// Create the engine and spawn its log thread.
    ///
    /// Fails if the vocabulary file does not exist.
    pub fn new(vocabulary: &Path, settings: EngineSettings) -> Result<Self> {
        if !vocabulary.is_file() {
            bail!("Vocabulary file not found: {}", vocabulary.display());
        }
        info!("Vocabulary: {}", vocabulary.display());

        let log = Arc::new(DeliveryLog::default());
        let (sender, receiver) = bounded::<DeliveryRecord>(DELIVERY_CHANNEL_CAPACITY);
        let log_handle = Self::spawn_log_thread(log.clone(), receiver)?;

        Ok(Self {
            settings,
            log,
            sender: Some(sender),
            log_handle: Some(log_handle),
            first_arrival: None,
            last_timestamp: None,
            off_cadence: 0,
            frames: 0,
            size_warned: false,
        })
    }

    fn spawn_log_thread(
        log: Arc<DeliveryLog>,
        receiver: Receiver<DeliveryRecord>,
    ) -> Result<JoinHandle<()>> {
        thread::Builder::new()
            .name("delivery-log".into())
            .spawn(move || {
                // Runs until every sender is dropped.
                for record in receiver.iter() {
                    log.records.lock().push(record);
                }
                debug!("Delivery log thread finished");
            })
            .context("Failed to spawn delivery log thread")
    }

    /// Snapshot of the rows received so far.
    pub fn records(&self) -> Vec<DeliveryRecord> {
        self.log.records.lock().clone()
    }

    /// Frames whose recorded gap to the previous frame strays from the
    /// settings' nominal interval.
    pub fn off_cadence_frames(&self) -> usize {
        self.off_cadence
    }

    fn check_cadence(&mut self, timestamp: f64) {
        let previous = self.last_timestamp.replace(timestamp);
        let (Some(previous), Some(nominal)) = (previous, self.settings.frame_interval()) else {
            return;
        };
        let gap = timestamp - previous;
        if ((gap - nominal) / nominal).abs() <= CADENCE_TOLERANCE {
            return;
        }
        if self.off_cadence == 0 {
            warn!(
                "Frame {}: recorded gap {:.4} s, settings expect {:.4} s",
                self.frames, gap, nominal
            );
        }
        self.off_cadence += 1;
    }

    fn check_size(&mut self, width: u32, height: u32) {
        if self.size_warned {
            return;
        }
        if let Some(expected) = self.settings.image_size() {
            if expected != (width, height) {
                warn!(
                    "Image size {}x{} differs from settings {}x{}",
                    width, height, expected.0, expected.1
                );
                self.size_warned = true;
            }
        }
    }
}

impl TrackingEngine for RecordingEngine {
    fn track_stereo(
        &mut self,
        left: &DynamicImage,
        right: &DynamicImage,
        masks: Option<&MaskPair>,
        timestamp: f64,
    ) -> Result<()> {
        if self.log.shutdown_requested.load(Ordering::SeqCst) {
            bail!("Engine received a frame after shutdown");
        }
        let now = Instant::now();
        let first = *self.first_arrival.get_or_insert(now);

        let (width, height) = left.dimensions();
        if right.dimensions() != (width, height) {
            warn!("Frame {}: left and right image sizes differ", self.frames);
        }
        self.check_size(width, height);
        self.check_cadence(timestamp);

        let (left_active, right_active) = match masks {
            Some(pair) => (active_fraction(&pair.left), active_fraction(&pair.right)),
            None => (1.0, 1.0),
        };

        let record = DeliveryRecord {
            frame: self.frames,
            timestamp,
            arrival: now.duration_since(first).as_secs_f64(),
            width,
            height,
            masked: masks.is_some(),
            left_active,
            right_active,
        };
        self.frames += 1;

        let sender = self
            .sender
            .as_ref()
            .context("Delivery log channel already closed")?;
        sender
            .send(record)
            .context("Delivery log thread stopped unexpectedly")?;
        Ok(())
    }

    /// Close the channel and wait for the log thread to drain it.
    fn shutdown(&mut self) {
        self.log.shutdown_requested.store(true, Ordering::SeqCst);
        self.sender.take();
        if let Some(handle) = self.log_handle.take() {
            if handle.join().is_err() {
                warn!("Delivery log thread panicked");
            }
        }
    }

    fn save_trajectory(&mut self, path: &Path) -> Result<()> {
        self.shutdown();

        let records = self.log.records.lock();
        let mut writer = csv::Writer::from_path(path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        for record in records.iter() {
            writer.serialize(record)?;
        }
        writer.flush()?;

        if self.off_cadence > 0 {
            warn!(
                "{} of {} frames were off the nominal cadence",
                self.off_cadence,
                records.len()
            );
        }
        info!("Saved delivery log ({} frames) to {}", records.len(), path.display());
        Ok(())
    }
}

impl Drop for RecordingEngine {
    fn drop(&mut self) {
        self.shutdown();
    }
}
