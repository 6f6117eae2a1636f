//! facelock — manage the enrollment registry and replay observation streams
//! through a lock-tracking session.
//!
//! The `replay` command is the injected-collaborator seam exercised end to
//! end: detection and recognition run elsewhere and their per-frame output
//! arrives here as JSON lines, one `FrameObservation` per line.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use facelock_core::history::format_elapsed;
use facelock_core::{FaceLockTracker, FrameObservation, LockState, TrackerConfig};
use facelock_registry::SqliteRegistry;

mod config;

#[derive(Parser)]
#[command(name = "facelock", about = "Single-subject lock tracking over face observation streams")]
struct Cli {
    /// Registry database path (default: $FACELOCK_DB_PATH).
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Enroll an identity name in the registry.
    Enroll {
        #[arg(long)]
        name: String,
    },
    /// Remove an enrolled identity.
    Remove {
        #[arg(long)]
        name: String,
    },
    /// List enrolled identities.
    Identities {
        /// Emit the list as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Replay a JSON-lines observation stream through a lock session.
    Replay {
        /// Identity to lock onto (must be enrolled).
        #[arg(long)]
        target: String,
        /// Observation stream, one JSON FrameObservation per line ("-" for stdin).
        #[arg(long)]
        input: PathBuf,
        /// Directory for the session history file (default: $FACELOCK_HISTORY_DIR).
        #[arg(long)]
        history_dir: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let settings = config::Settings::from_env();
    let db_path = cli.db.unwrap_or(settings.db_path);
    let registry = SqliteRegistry::open(&db_path)
        .with_context(|| format!("opening registry at {}", db_path.display()))?;

    match cli.command {
        Command::Enroll { name } => {
            let id = registry.enroll(&name)?;
            println!("enrolled '{name}' ({id})");
        }
        Command::Remove { name } => {
            if registry.remove(&name)? {
                println!("removed '{name}'");
            } else {
                bail!("identity '{name}' is not enrolled");
            }
        }
        Command::Identities { json } => {
            let identities = registry.identities()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&identities)?);
            } else if identities.is_empty() {
                println!("no identities enrolled");
            } else {
                for info in identities {
                    println!("{}  (enrolled {})", info.name, info.created_at);
                }
            }
        }
        Command::Replay {
            target,
            input,
            history_dir,
        } => {
            let mut tracker_config = settings.tracker;
            if let Some(dir) = history_dir {
                tracker_config.history_dir = dir;
            }
            run_replay(registry, tracker_config, &target, &input)?;
        }
    }

    Ok(())
}

fn run_replay(
    registry: SqliteRegistry,
    config: TrackerConfig,
    target: &str,
    input: &Path,
) -> Result<()> {
    let reader: Box<dyn BufRead> = if input == Path::new("-") {
        Box::new(BufReader::new(io::stdin()))
    } else {
        Box::new(BufReader::new(File::open(input).with_context(|| {
            format!("opening observation stream {}", input.display())
        })?))
    };

    let mut tracker = FaceLockTracker::new(config, registry)?;
    tracing::info!(target, input = %input.display(), "replay starting");
    if !tracker.select_target(target)? {
        bail!("identity '{target}' is not enrolled — run `facelock enroll --name '{target}'` first");
    }

    let mut last_state = LockState::Searching;
    let mut frames = 0u64;
    let mut total_actions = 0u64;

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let observation: FrameObservation = serde_json::from_str(&line)
            .with_context(|| format!("parsing observation on line {}", index + 1))?;

        let result = tracker.process_frame(&observation)?;
        frames += 1;

        if result.state != last_state {
            println!("frame {frames}: {last_state} -> {}", result.state);
            last_state = result.state;
        }
        for action in &result.actions {
            total_actions += 1;
            println!(
                "[{}] {} | {} | conf={:.2} | val={:.4}",
                format_elapsed(action.elapsed),
                action.kind,
                action.description,
                action.confidence,
                action.value
            );
        }
    }

    let path = tracker.finalize_session()?;
    println!("{frames} frames, {total_actions} actions — history written to {}", path.display());
    Ok(())
}
