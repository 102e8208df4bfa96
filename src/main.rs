use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use tracing::Level;

use stereo_replay::engine::{EngineSettings, RecordingEngine};
use stereo_replay::io::{DiskLoader, SequenceLayout, load_manifest};
use stereo_replay::pacing::{PacingMode, SystemClock};
use stereo_replay::system::{Replay, ReplayConfig};

/// Replay a recorded stereo sequence at its capture rate
#[derive(Parser, Debug)]
#[command(name = "stereo_replay")]
#[command(about = "Replay a stereo sequence against a tracking engine at its capture rate", long_about = None)]
struct Args {
    /// Path to the vocabulary file
    vocabulary: PathBuf,

    /// Path to the camera settings YAML
    settings: PathBuf,

    /// Path to the sequence directory
    sequence: PathBuf,

    /// Root of the mask sequence (same layout as the images)
    mask_root: Option<PathBuf>,

    /// Side of the square erosion kernel applied to masks; 0 disables erosion
    kernel_size: Option<u32>,

    /// On-disk layout of the sequence
    #[arg(long, value_enum, default_value = "cityscapes")]
    layout: LayoutArg,

    /// Trajectory output file
    #[arg(short, long, default_value = "CameraTrajectory.txt")]
    output: PathBuf,

    /// Deliver frames as fast as the engine accepts them
    #[arg(long)]
    unthrottled: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LayoutArg {
    Cityscapes,
    Euroc,
}

impl From<LayoutArg> for SequenceLayout {
    fn from(arg: LayoutArg) -> Self {
        match arg {
            LayoutArg::Cityscapes => SequenceLayout::Cityscapes,
            LayoutArg::Euroc => SequenceLayout::Euroc,
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();
    let args = Args::parse();

    let manifest = load_manifest(
        args.layout.into(),
        &args.sequence,
        args.mask_root.as_deref(),
    )?;

    let settings = EngineSettings::load(&args.settings)?;
    let engine = RecordingEngine::new(&args.vocabulary, settings)?;

    let config = ReplayConfig {
        pacing: if args.unthrottled {
            PacingMode::Unthrottled
        } else {
            PacingMode::Realtime
        },
        kernel_size: args.kernel_size,
        trajectory_path: args.output.clone(),
    };

    println!();
    println!("-------");
    println!("Start processing sequence ...");
    println!("Images in the sequence: {}", manifest.len());
    if manifest.has_masks() {
        match args.kernel_size.filter(|&k| k > 0) {
            Some(k) => println!("Masks: eroded with {k}x{k} kernel"),
            None => println!("Masks: raw"),
        }
    }
    println!();

    let mut replay = Replay::new(engine, DiskLoader, SystemClock::new(), config);
    let report = replay.run(&manifest)?;

    if let Some(timing) = &report.timing {
        println!("-------");
        println!();
        println!("{timing}");
        println!(
            "late frames: {}/{}, total pacing sleep: {:.3} s",
            report.late_frames,
            report.frames,
            report.total_sleep.as_secs_f64()
        );
        let off_cadence = replay.engine().off_cadence_frames();
        if off_cadence > 0 {
            println!("frames off the nominal cadence: {off_cadence}");
        }
        println!("Trajectory saved to {}", args.output.display());
    }

    Ok(())
}
