use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;

use facewatch_core::detection::infrastructure::onnx_model_provider::OnnxModelProvider;
use facewatch_core::pipeline::face_pipeline::FacePipeline;
use facewatch_core::pipeline::pipeline_logger::StdoutPipelineLogger;
use facewatch_core::shared::config::FaceWatchConfig;
use facewatch_core::tracking::infrastructure::bytetrack_tracker::ByteTracker;
use facewatch_core::video::domain::video_reader::VideoReader;
use facewatch_core::video::infrastructure::ffmpeg_reader::FfmpegReader;
use facewatch_core::video::infrastructure::image_sequence_reader::{
    is_image_file, ImageSequenceReader,
};

/// Face detection, watchlist recognition and tracking for videos and images.
///
/// Prints one JSON object per processed frame to stdout.
#[derive(Parser)]
#[command(name = "facewatch")]
struct Cli {
    /// Input video file, image file, or directory of images.
    input: PathBuf,

    /// JSON config file; flags below override its values.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Home directory containing `models/` and `face_db/`.
    #[arg(long)]
    home: Option<PathBuf>,

    /// Directory holding the detector and embedder models.
    #[arg(long)]
    models: Option<PathBuf>,

    /// Face database root with `whitelist/` and `blacklist/`.
    #[arg(long)]
    face_db: Option<PathBuf>,

    /// Run detection every Nth frame (1 = every frame).
    #[arg(long)]
    period: Option<u64>,

    /// Face detection confidence threshold (0.0-1.0).
    #[arg(long)]
    confidence: Option<f32>,

    /// Cosine similarity a match must exceed (0.0-1.0).
    #[arg(long)]
    recognition_threshold: Option<f32>,

    /// Frame rate used to timestamp image sequences.
    #[arg(long, default_value = "1.0")]
    fps: f64,

    /// Also print frames that produced no detections or events.
    #[arg(long)]
    all_frames: bool,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    validate(&cli)?;
    let config = build_config(&cli)?;

    let mut pipeline = FacePipeline::new(
        &config,
        Box::new(OnnxModelProvider),
        ByteTracker::factory(config.tracker_max_lost),
        Box::new(StdoutPipelineLogger::default()),
    );
    pipeline.initialize()?;

    let mut reader = open_reader(&cli.input, cli.fps);
    let metadata = reader.open(&cli.input)?;
    log::info!(
        "Processing {} ({}x{}, every {} frame(s))",
        cli.input.display(),
        metadata.width,
        metadata.height,
        config.detection_frame_period
    );

    let stdout = io::stdout();
    let mut out = stdout.lock();
    for frame in reader.frames() {
        let frame = frame?;
        let output = pipeline.push_frame(&frame);
        if cli.all_frames || !output.is_empty() {
            serde_json::to_writer(&mut out, &output)?;
            writeln!(out)?;
        }
    }
    out.flush()?;
    reader.close();

    pipeline.summary();
    if pipeline.is_terminated() {
        return Err("pipeline terminated before the end of the input".into());
    }
    Ok(())
}

fn build_config(cli: &Cli) -> Result<FaceWatchConfig, Box<dyn std::error::Error>> {
    let mut config = match (&cli.config, &cli.home) {
        (Some(path), _) => FaceWatchConfig::from_file(path)?,
        (None, Some(home)) => FaceWatchConfig::with_home_dir(home),
        (None, None) => FaceWatchConfig::default(),
    };
    if let (Some(_), Some(home)) = (&cli.config, &cli.home) {
        let rooted = FaceWatchConfig::with_home_dir(home);
        config.model_dir = rooted.model_dir;
        config.face_db_dir = rooted.face_db_dir;
    }
    if let Some(models) = &cli.models {
        config.model_dir = models.clone();
    }
    if let Some(face_db) = &cli.face_db {
        config.face_db_dir = face_db.clone();
    }
    if let Some(period) = cli.period {
        config.detection_frame_period = period;
    }
    if let Some(confidence) = cli.confidence {
        config.confidence_threshold = confidence;
    }
    if let Some(threshold) = cli.recognition_threshold {
        config.recognition_threshold = threshold;
    }
    config.validate()?;
    Ok(config)
}

fn validate(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    if !cli.input.exists() {
        return Err(format!("Input not found: {}", cli.input.display()).into());
    }
    for (name, value) in [
        ("Confidence", cli.confidence),
        ("Recognition threshold", cli.recognition_threshold),
    ] {
        if let Some(v) = value {
            if !(0.0..=1.0).contains(&v) {
                return Err(format!("{name} must be between 0.0 and 1.0, got {v}").into());
            }
        }
    }
    if cli.fps <= 0.0 {
        return Err(format!("FPS must be positive, got {}", cli.fps).into());
    }
    Ok(())
}

fn open_reader(input: &Path, fps: f64) -> Box<dyn VideoReader> {
    if input.is_dir() || is_image_file(input) {
        Box::new(ImageSequenceReader::new(fps))
    } else {
        Box::new(FfmpegReader::new())
    }
}
