//! poselock CLI
//!
//! Usage:
//!   poselock --frames session.jsonl          # Replay recorded frames
//!   cat session.jsonl | poselock             # Replay from stdin
//!   poselock --frames f.jsonl --json         # JSON output, one step per line
//!   poselock --serve                         # HTTP API server
//!
//! Each input line is one JSON frame:
//!   {"measurement": {"sequence": 0, "timestamp_ms": 0,
//!     "face": {"bounds": {...}, "angle": {"yaw": 0.0, "pitch": 0.0}}}}

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use poselock::core::{run_server, CosineComparator, FaceComparator, LivenessSession};
use poselock::types::{Frame, SessionError, SessionResult, SessionSettings, StepOutput};
use poselock::VERSION;

#[derive(Parser, Debug)]
#[command(
    name = "poselock",
    version = VERSION,
    about = "Pose-challenge liveness sessions for face verification",
    long_about = "poselock asks the subject to turn their head toward a short, random\n\
                  sequence of bearings and captures a face sample for each one.\n\n\
                  Modes:\n  \
                  (default)  Replay JSON-lines frames from --frames or stdin\n  \
                  --serve    HTTP API server mode\n\n\
                  States:\n  \
                  NO_FACE         - No face tracked\n  \
                  FACE_FOUND      - Face tracked, holding still\n  \
                  FIXED           - Face steady, checking pose\n  \
                  ALIGNED         - Pose matches the requested bearing\n  \
                  MISALIGNED      - Pose does not match yet\n  \
                  SPOOF_SUSPECTED - Movement looked implausible\n  \
                  ABORTED         - Session failed\n  \
                  COMPLETE        - All bearings captured"
)]
struct Args {
    /// JSON-lines frame file (default: stdin)
    #[arg(short, long)]
    frames: Option<PathBuf>,

    /// Session settings as JSON; POSELOCK_* environment variables override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Seed for the bearing sequence
    #[arg(long)]
    seed: Option<u64>,

    /// Mirror frames before processing (front cameras)
    #[arg(long)]
    mirror: bool,

    /// Score captures by cosine similarity of their face templates
    #[arg(long)]
    compare: bool,

    /// Run as HTTP API server
    #[arg(short, long)]
    serve: bool,

    /// Server address (default: 127.0.0.1:3000)
    #[arg(long, default_value = "127.0.0.1:3000")]
    addr: String,

    /// Output as JSON
    #[arg(long)]
    json: bool,

    /// Disable colors in output
    #[arg(long)]
    no_color: bool,

    /// Show requirements and move hints
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    let settings = load_settings(&args)?;

    if args.serve {
        run_server(&args.addr, settings)
            .await
            .map_err(|e| anyhow::anyhow!("server failed: {}", e))?;
        return Ok(ExitCode::SUCCESS);
    }

    let input: Box<dyn BufRead> = match &args.frames {
        Some(path) => Box::new(BufReader::new(
            File::open(path).with_context(|| format!("opening {}", path.display()))?,
        )),
        None => Box::new(BufReader::new(io::stdin())),
    };
    run_replay(input, settings, &args)
}

fn load_settings(args: &Args) -> Result<SessionSettings> {
    let mut settings = match &args.config {
        Some(path) => SessionSettings::from_json_file(path)
            .with_context(|| format!("loading settings from {}", path.display()))?,
        None => SessionSettings::default(),
    }
    .with_env_overrides();
    if args.seed.is_some() {
        settings.seed = args.seed;
    }
    settings.validate().context("invalid settings")?;
    Ok(settings)
}

/// Replay recorded frames through one session
fn run_replay(input: Box<dyn BufRead>, settings: SessionSettings, args: &Args) -> Result<ExitCode> {
    let mut session = LivenessSession::new(settings)?;

    if !args.json {
        print_header(args.no_color);
    }
    if args.verbose && !args.json {
        let no_color = args.no_color;
        session.register_requirement_listener(move |requirement| {
            let line = format!("  → step {}: {} ({})", requirement.step, requirement.prompt, requirement.bearing);
            if no_color {
                println!("{}", line);
            } else {
                println!("{}", line.cyan().bold());
            }
        });
    }

    for (index, line) in input.lines().enumerate() {
        let line = line.context("reading frames")?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let frame: Frame = serde_json::from_str(line)
            .with_context(|| format!("line {}: invalid frame", index + 1))?;
        let frame = if args.mirror {
            frame
                .mirrored()
                .with_context(|| format!("line {}: --mirror needs the frame's image_size", index + 1))?
        } else {
            frame
        };

        let output = session.process(frame);
        print_step(&output, args);
        if output.captured && args.verbose && !args.json {
            if let Some(capture) = session.captures().last() {
                println!(
                    "    captured {} at #{} (image sha256 {})",
                    capture.bearing,
                    capture.measurement.sequence,
                    capture.image.digest_hex()
                );
            }
        }
        if session.is_finished() {
            break;
        }
    }

    if !session.is_finished() {
        tracing::warn!("input ended before the session finished");
        session.close();
    }

    let comparator = args.compare.then_some(&CosineComparator as &dyn FaceComparator);
    let outcome = session
        .finish(comparator)
        .unwrap_or(Err(SessionError::Cancelled));
    print_outcome(&outcome, args)?;

    Ok(match outcome {
        Ok(result) if result.passed() => ExitCode::SUCCESS,
        _ => ExitCode::FAILURE,
    })
}

/// Print header
fn print_header(no_color: bool) {
    let title = format!("poselock v{} - replay", VERSION);
    if no_color {
        println!("========================================");
        println!("  {}", title);
        println!("========================================");
    } else {
        println!("{}", "========================================".bold());
        println!("  {}", title.bold());
        println!("{}", "========================================".bold());
    }
    println!();
}

fn print_step(output: &StepOutput, args: &Args) {
    if args.json {
        match serde_json::to_string(output) {
            Ok(json) => println!("{}", json),
            Err(e) => tracing::warn!(error = %e, "failed to encode step"),
        }
        return;
    }
    if args.no_color {
        println!("{}", output.to_parseable_string());
    } else {
        println!("{}", output.to_terminal_string());
    }
    if args.verbose {
        if let Some(offset) = output.offset {
            println!("    move: yaw {:+.2} pitch {:+.2}", offset.yaw, offset.pitch);
        }
    }
}

fn print_outcome(outcome: &Result<SessionResult, SessionError>, args: &Args) -> Result<()> {
    if args.json {
        let json = match outcome {
            Ok(result) => serde_json::to_string(result)?,
            Err(err) => serde_json::to_string(&serde_json::json!({ "failed": err }))?,
        };
        println!("{}", json);
        return Ok(());
    }

    println!();
    let line = match outcome {
        Ok(result) => {
            let score = result
                .recognition_score
                .map(|s| format!(" | score={:.3}", s))
                .unwrap_or_default();
            format!(
                "RESULT {:?} | captures={} | controls={}{}",
                result.verdict,
                result.captures.len(),
                result.control_captures.len(),
                score
            )
        }
        Err(err) => format!("FAILED {} ({})", err, err.reason().code()),
    };
    if args.no_color {
        println!("{}", line);
    } else if matches!(outcome, Ok(result) if result.passed()) {
        println!("{}", line.green().bold());
    } else {
        println!("{}", line.red().bold());
    }
    Ok(())
}
