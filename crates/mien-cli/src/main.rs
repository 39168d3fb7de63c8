mod config;
mod frames;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use config::Config;
use mien_core::calibration::{self, CalibrationProfile, PROFILE_FILE_NAME};
use mien_core::session::{CaptureProgress, EmotionHistory, TrainingSession, REPORT_ORDER};
use mien_core::{EmotionDetector, ExpressionWarper, LandmarkSet, Metric, Reading, WarpConfig};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "mien", about = "Facial-expression scoring and expression warping")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score every frame of a landmark stream
    Detect {
        /// JSON-lines landmark stream ("-" for stdin)
        frames: PathBuf,
        /// Calibration profile to apply
        #[arg(long)]
        calibration: Option<PathBuf>,
        /// Ignore any calibration profile
        #[arg(long, conflicts_with = "calibration")]
        no_calibration: bool,
        /// Show all emotion scores and metrics with each report
        #[arg(long)]
        debug: bool,
        /// Print one JSON reading per frame
        #[arg(long)]
        json: bool,
    },
    /// Capture training samples from a landmark stream and build a profile
    Train {
        /// JSON-lines landmark stream ("-" for stdin)
        frames: PathBuf,
        /// Samples per emotion
        #[arg(long)]
        quota: Option<usize>,
        /// Directory for the samples snapshot and profile
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },
    /// Rebuild a calibration profile from a saved samples snapshot
    Calibrate {
        /// Training samples JSON file
        samples: PathBuf,
        /// Where to write the profile
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Show the scorer thresholds a profile resolves to
    Thresholds {
        #[arg(long)]
        calibration: Option<PathBuf>,
    },
    /// Re-pose a target face after a source face's expression
    Warp {
        /// Source landmarks (JSON array)
        #[arg(long)]
        source: PathBuf,
        /// Image containing the target face
        #[arg(long)]
        target_image: PathBuf,
        /// Target landmarks (JSON array)
        #[arg(long)]
        target_landmarks: PathBuf,
        /// Output image path; format follows the extension
        #[arg(short, long)]
        output: PathBuf,
        /// Warp at reduced size above this width (0 disables)
        #[arg(long)]
        max_width: Option<u32>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = Config::from_env();

    match cli.command {
        Commands::Detect {
            frames,
            calibration,
            no_calibration,
            debug,
            json,
        } => {
            let use_calibration = !no_calibration && (calibration.is_some() || config.use_calibration);
            let detector = if use_calibration {
                let path = calibration.unwrap_or_else(|| config.calibration_path.clone());
                EmotionDetector::from_calibration_file(&path)
            } else {
                EmotionDetector::new(None)
            };
            detect(&config, &detector, &frames, debug, json)?;
        }
        Commands::Train {
            frames,
            quota,
            data_dir,
        } => {
            let quota = quota.unwrap_or(config.samples_per_emotion);
            let (data_dir, profile_path) = match data_dir {
                Some(dir) => {
                    let profile = dir.join(PROFILE_FILE_NAME);
                    (dir, profile)
                }
                None => (config.data_dir.clone(), config.calibration_path.clone()),
            };
            train(&frames, quota, &data_dir, &profile_path)?;
        }
        Commands::Calibrate { samples, output } => {
            let samples = calibration::load_samples(&samples)?;
            let profile = CalibrationProfile::build(&samples)?;
            let output = output.unwrap_or_else(|| config.calibration_path.clone());
            profile.save(&output)?;
            print_profile(&profile);
            println!("\nCalibration profile saved: {}", output.display());
        }
        Commands::Thresholds { calibration } => {
            let path = calibration.unwrap_or_else(|| config.calibration_path.clone());
            let detector = EmotionDetector::from_calibration_file(&path);
            let t = detector.thresholds();
            println!("Calibrated: {}", if detector.is_calibrated() { "yes" } else { "no" });
            println!("  happy (low):  smile_curve > {:.4}", t.happy_low);
            println!("  happy (high): smile_curve > {:.4}", t.happy_high);
            println!("  sad:          smile_curve < {:.4}", t.sad);
            println!("  sleepy:       eye_ratio   < {:.4}", t.sleepy);
            if let Some(profile) = detector.profile() {
                print_recommendations(profile);
            }
        }
        Commands::Warp {
            source,
            target_image,
            target_landmarks,
            output,
            max_width,
        } => {
            let source = load_landmarks(&source)?;
            let target = load_landmarks(&target_landmarks)?;
            let image = image::open(&target_image)
                .with_context(|| format!("opening image {}", target_image.display()))?
                .to_rgb8();

            let warper = ExpressionWarper::new(WarpConfig {
                max_width: max_width.unwrap_or(config.warp_max_width),
            });
            let warped = warper.warp(&source, &image, &target)?;
            warped
                .image
                .save(&output)
                .with_context(|| format!("writing image {}", output.display()))?;
            println!(
                "Warped {} triangles ({} skipped) -> {}",
                warped.applied,
                warped.skipped,
                output.display()
            );
        }
    }

    Ok(())
}

fn detect(config: &Config, detector: &EmotionDetector, input: &Path, debug: bool, json: bool) -> Result<()> {
    let mut history = EmotionHistory::new();

    for frame in frames::read_frames(frames::open(input)?) {
        let reading = frame?.map(|set| detector.detect(&set));
        history.record_frame(reading.as_ref());
        let n = history.frames();

        if json {
            println!("{}", serde_json::json!({ "frame": n, "reading": reading }));
            continue;
        }
        if n % config.report_every != 0 {
            continue;
        }

        match &reading {
            None => println!("Frame {n}: no face"),
            Some(r) => {
                println!("Frame {n}: {} ({:.0}%)", r.label(), r.confidence() * 100.0);
                if !debug {
                    continue;
                }
                if let Reading::Scored { metrics, score } = r {
                    let scores: Vec<String> = score
                        .scores
                        .ranked()
                        .iter()
                        .map(|(e, s)| format!("{e}={s:.2}"))
                        .collect();
                    println!("  Scores: {}", scores.join(" "));
                    let d = metrics.display();
                    println!(
                        "  Smile: {:.1}  Mouth: {:.1}  Eyes: {:.1}  Brows: {:.1}",
                        d.smile_curve, d.mouth_open, d.eye_open, d.brow_raise
                    );
                }
            }
        }
    }

    if !json {
        print_summary(&history);
    }
    Ok(())
}

fn print_summary(history: &EmotionHistory) {
    println!("\n{}", "=".repeat(50));
    println!("SESSION SUMMARY");
    println!("{}", "=".repeat(50));
    println!("Total frames: {}", history.frames());
    if !history.is_empty() {
        println!("\nEmotion distribution:");
        for (emotion, pct) in history.distribution() {
            let bar = "█".repeat((pct / 2.0) as usize);
            println!("  {:10}: {bar} {pct:.1}%", emotion.as_str());
        }
    }
    println!("{}", "=".repeat(50));
}

fn train(input: &Path, quota: usize, data_dir: &Path, profile_path: &Path) -> Result<()> {
    let mut session = TrainingSession::new(quota);
    if let Some(first) = session.current() {
        println!("Capturing {} samples per emotion, starting with {first}", session.quota());
    }

    for frame in frames::read_frames(frames::open(input)?) {
        let Some(landmarks) = frame? else {
            continue;
        };
        match session.capture(&landmarks) {
            Ok(CaptureProgress::Captured { emotion, count, quota }) => {
                println!("Captured {emotion} sample {count}/{quota}");
            }
            Ok(CaptureProgress::NextEmotion(next)) => println!("Next emotion: {next}"),
            Ok(CaptureProgress::Complete) => {
                println!("Training complete!");
                break;
            }
            Err(e) => tracing::debug!(error = %e, "frame not captured"),
        }
    }

    if !session.is_complete() {
        tracing::warn!(
            captured = session.samples().len(),
            waiting_on = ?session.current(),
            "frame stream ended before training finished"
        );
    }
    if session.samples().is_empty() {
        bail!("no training samples captured from {}", input.display());
    }

    let snapshot = calibration::save_samples(data_dir, session.samples())?;
    println!("\nTraining data saved: {}", snapshot.display());

    let profile = CalibrationProfile::build(session.samples())?;
    profile.save(profile_path)?;
    print_profile(&profile);
    println!("\nCalibration profile saved: {}", profile_path.display());
    print_recommendations(&profile);
    Ok(())
}

fn print_profile(profile: &CalibrationProfile) {
    for emotion in REPORT_ORDER {
        let Some(avg) = profile.averages(emotion) else {
            continue;
        };
        let get = |m: Metric| avg.get(&m).copied().unwrap_or(0.0);
        println!("\n{emotion}:");
        println!("  Smile curve: {:.4}", get(Metric::SmileCurve));
        println!("  Mouth ratio: {:.4}", get(Metric::MouthAspectRatio));
        println!("  Eye ratio: {:.4}", get(Metric::EyeAspectRatio));
        println!("  Brow raise: {:.4}", get(Metric::EyebrowRaise));
    }
}

fn print_recommendations(profile: &CalibrationProfile) {
    let r = profile.recommend();
    println!("\nRecommended thresholds:");
    println!("  Happy: smile_curve > {:.4}", r.happy_smile_min);
    println!("  Sad: smile_curve < {:.4}", r.sad_smile_max);
    println!("  Sleepy: eye_ratio < {:.4}", r.sleepy_eye_max);
    println!(
        "  Neutral smile range: {:.4} to {:.4}",
        r.neutral_smile_range.0, r.neutral_smile_range.1
    );
}

fn load_landmarks(path: &Path) -> Result<LandmarkSet> {
    let raw = std::fs::read_to_string(path).with_context(|| format!("reading landmarks {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing landmarks {}", path.display()))
}
