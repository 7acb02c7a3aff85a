mod core;
mod decoder;
mod geometry;
mod output;
mod pose;
mod renderer;
mod shared;
mod utils;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::core::{run_session, FrameSink, StopSignal};
use crate::decoder::{SourceSpec, VideoSource};
use crate::output::{save_csv, AnnotatedWriter};
use crate::pose::joints::{Side, JOINTS};
use crate::pose::{PoseDetector, ReplayDetector};
use crate::shared::constants;
use crate::utils::config::{self, Settings};
use crate::utils::file_utils::{ensure_dir, OutputPaths};

#[derive(Parser)]
#[command(author, version, about = "Joint angles from pose landmarks, frame by frame", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Measure joint angles over a video file or camera and save them as CSV
    Run {
        /// Video file path or numeric camera index
        source: String,
        /// Do not write the annotated video
        #[arg(long, default_value_t = false)]
        no_video: bool,
        /// Landmarks exported by an external pose tool (JSON lines)
        #[arg(short, long, conflicts_with = "model")]
        landmarks: Option<PathBuf>,
        /// BlazePose landmark ONNX model (needs the `onnx` feature)
        #[arg(short, long)]
        model: Option<PathBuf>,
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
        #[arg(long, value_enum)]
        side: Option<Side>,
        /// Key that ends a live session
        #[arg(long, value_parser = config::parse_key)]
        stop_key: Option<char>,
        #[arg(long, value_parser = config::parse_fourcc)]
        fourcc: Option<String>,
        #[arg(short, long, default_value = constants::CONFIG_FILE)]
        config: PathBuf,
    },
    /// Print what the capture backend reports about a source
    Probe {
        source: String,
    },
    /// List the measured joints
    Joints,
}

fn open_detector(landmarks: Option<PathBuf>, model: Option<PathBuf>) -> Result<Box<dyn PoseDetector>> {
    match (landmarks, model) {
        (Some(path), _) => Ok(Box::new(ReplayDetector::open(&path)?)),
        #[cfg(feature = "onnx")]
        (None, Some(path)) => Ok(Box::new(crate::pose::onnx::OnnxPoseDetector::from_file(&path)?)),
        #[cfg(not(feature = "onnx"))]
        (None, Some(_)) => bail!("--model needs a build with the `onnx` feature"),
        (None, None) => bail!("no pose detector selected: pass --landmarks <FILE> or --model <FILE>"),
    }
}

fn main() -> Result<()> {
    crate::utils::logger::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            source,
            no_video,
            landmarks,
            model,
            output_dir,
            side,
            stop_key,
            fourcc,
            config,
        } => {
            let mut settings = Settings::load(&config)?;
            if let Some(dir) = output_dir {
                settings.output_dir = dir;
            }
            if no_video {
                settings.write_video = false;
            }
            if let Some(side) = side {
                settings.side = side;
            }
            if let Some(key) = stop_key {
                settings.stop_key = key;
            }
            if let Some(fourcc) = fourcc {
                settings.fourcc = fourcc;
            }
            crate::utils::logger::debug(&format!("Settings: {:?}", settings));

            let spec: SourceSpec = source.parse()?;
            let mut detector = open_detector(landmarks, model)?;
            let mut video = VideoSource::open(&spec)?;

            ensure_dir(&settings.output_dir)?;
            let paths = OutputPaths::stamped(&settings.output_dir, chrono::Local::now());

            let mut annotated = if settings.write_video {
                Some(AnnotatedWriter::create(&paths.video, video.info(), &settings.fourcc, settings.fallback_fps)?)
            } else {
                None
            };

            let session = {
                let stop = StopSignal::install(settings.stop_key)?;
                if stop.watches_keys() {
                    eprint!("Press '{}' to stop early.\r\n", settings.stop_key);
                }
                let sink = annotated.as_mut().map(|w| w as &mut dyn FrameSink);
                run_session(&mut video, &mut *detector, sink, &stop, settings.side)?
            };

            save_csv(&paths.csv, &session)?;

            match &annotated {
                Some(writer) => println!(
                    "Saved {} rows to {} (video: {}, {} frames)",
                    session.records.len(),
                    paths.csv.display(),
                    writer.path().display(),
                    writer.frames_written()
                ),
                None => println!("Saved {} rows to {}", session.records.len(), paths.csv.display()),
            }
            if session.stopped_early {
                println!("Stopped early after {} frames", session.frames_read);
            }
        }
        Commands::Probe { source } => {
            let spec: SourceSpec = source.parse()?;
            let video = VideoSource::open(&spec)?;
            println!("{}", serde_json::to_string_pretty(video.info())?);
        }
        Commands::Joints => {
            for joint in JOINTS {
                println!(
                    "{:<10} {:?} - {:?} - {:?}",
                    joint.name, joint.from, joint.vertex, joint.to
                );
            }
        }
    }

    Ok(())
}
