//! Stemdeck Player - synchronized multi-stem playback in the terminal
//!
//! This is the entry point of the player. It:
//! 1. Loads the stem set named on the command line from the archive root,
//!    either a `<id>.zip` bundle or an `<id>/` folder
//! 2. Binds every decoded stem to a mixer voice and starts the audio output
//! 3. Drives the session from stdin commands and the periodic position tick
//! 4. Redraws the progress line and one scrolling waveform per stem
//!
//! ## Usage
//!
//! ```text
//! stemdeck-player <stem-set-id> [--root DIR] [--config FILE]
//! ```
//!
//! Set RUST_LOG=debug for verbose output.

mod commands;
mod config;

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{mpsc, watch};

use stemdeck_core::config::{load_config, save_config};
use stemdeck_core::engine::PlaybackSnapshot;
use stemdeck_core::loader::{DirectoryArchive, StemArchive, StemLoader, SymphoniaDecoder, ZipArchive};
use stemdeck_core::output::{AudioOutput, SharedMixer, VoiceHandle};
use stemdeck_core::types::{StemKind, REFERENCE_TRACK};
use stemdeck_core::SessionController;
use stemdeck_widgets::{status_line, TextSurface, WaveformView, STEM_NAMES_SHORT};

use commands::Command;
use config::{DisplayConfig, PlayerConfig};

/// Mixer rate used when no stem decoded to tell us better
const FALLBACK_SAMPLE_RATE: u32 = 44_100;

/// Progress bar width in the status line
const STATUS_BAR_WIDTH: usize = 40;

/// Command line arguments
#[derive(Debug, Clone, PartialEq)]
struct Args {
    id: String,
    root: Option<PathBuf>,
    config: Option<PathBuf>,
}

fn parse_args<I>(args: I) -> Result<Args>
where
    I: IntoIterator<Item = String>,
{
    let mut id = None;
    let mut root = None;
    let mut config = None;

    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--root" => root = Some(PathBuf::from(args.next().context("--root needs a directory")?)),
            "--config" => config = Some(PathBuf::from(args.next().context("--config needs a file")?)),
            flag if flag.starts_with("--") => bail!("unknown flag {}", flag),
            _ if id.is_none() => id = Some(arg.clone()),
            _ => bail!("unexpected argument {}", arg),
        }
    }

    let Some(id) = id else {
        bail!("usage: stemdeck-player <stem-set-id> [--root DIR] [--config FILE]");
    };
    Ok(Args { id, root, config })
}

fn main() -> Result<()> {
    // Initialize logger - set RUST_LOG=debug for verbose output
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let args = parse_args(std::env::args().skip(1))?;
    log::info!("stemdeck-player starting up");

    let config_path = args.config.clone().unwrap_or_else(config::default_config_path);
    let first_run = !config_path.exists();
    let mut config: PlayerConfig = load_config(&config_path);
    if first_run {
        // Leave an editable file behind; failing to is not fatal
        if let Err(e) = save_config(&config, &config_path) {
            log::warn!("Could not write default config: {:#}", e);
        }
    }
    if let Some(root) = args.root.clone() {
        config.archive_root = root;
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .thread_name("stemdeck-rt")
        .enable_all()
        .build()
        .context("Failed to build tokio runtime")?;

    runtime.block_on(run(config, args.id))
}

async fn run(config: PlayerConfig, id: String) -> Result<()> {
    log::info!("Archive root: {:?}", config.archive_root);

    // A bundle wins over a folder of the same name
    let bundles = ZipArchive::new(&config.archive_root);
    if bundles.bundle_path(&id).is_ok_and(|path| path.is_file()) {
        play(StemLoader::new(bundles, SymphoniaDecoder), config, id).await
    } else {
        let folders = DirectoryArchive::new(&config.archive_root);
        play(StemLoader::new(folders, SymphoniaDecoder), config, id).await
    }
}

async fn play<A: StemArchive>(
    loader: StemLoader<A, SymphoniaDecoder>,
    config: PlayerConfig,
    id: String,
) -> Result<()> {
    let ticket = loader.begin();
    let prepared = loader
        .load(&ticket, &id)
        .await
        .with_context(|| format!("Failed to load stem set '{}'", id))?;

    // The mixer runs at the reference stem's rate; other rates play off-speed
    let sample_rate = prepared
        .get(StemKind::Drums)
        .map(|s| s.buffer.sample_rate())
        .unwrap_or(FALLBACK_SAMPLE_RATE);
    let mut mixer = SharedMixer::new(sample_rate);

    let mut session: SessionController<VoiceHandle> = SessionController::new(config.playback.clone());
    session
        .install(&ticket, &id, prepared, &mut mixer)
        .with_context(|| format!("Stem set '{}' is not playable", id))?;

    let output = AudioOutput::start(mixer.clone(), cfg!(feature = "cpal-backend"))
        .context("Failed to start audio output")?;
    log::info!("Audio output: {} @ {} Hz", output.name(), output.sample_rate());

    let visible = session.config().visible_duration;
    let views: Vec<WaveformView> = session
        .tracks()
        .iter()
        .map(|track| WaveformView::from_track(track, visible))
        .collect();

    println!("Loaded '{}' ({} stem(s)). {}", id, views.len(), commands::HELP);

    let display = tokio::spawn(display_loop(session.subscribe(), views, config.display.clone()));

    let (command_tx, mut command_rx) = mpsc::channel::<String>(16);
    tokio::spawn(read_stdin(command_tx));

    let mut ticker = tokio::time::interval(session.config().tick_interval());
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                session.tick();
            }
            line = command_rx.recv() => {
                let Some(line) = line else {
                    log::info!("stdin closed");
                    break;
                };
                match commands::parse(&line) {
                    Ok(Some(Command::Quit)) => break,
                    Ok(Some(command)) => apply(&mut session, command),
                    Ok(None) => {}
                    Err(e) => println!("{:#}", e),
                }
            }
        }
    }

    // Stop sound before the output goes away
    session.unload();
    drop(output);
    display.abort();
    log::info!("stemdeck-player exiting");
    Ok(())
}

fn apply(session: &mut SessionController<VoiceHandle>, command: Command) {
    match command {
        Command::TogglePlay => {
            if let Err(e) = session.toggle_play() {
                println!("Cannot play: {}", e);
            }
        }
        Command::Stop => session.stop(),
        Command::Seek(seconds) => {
            let target = session.seek(seconds);
            log::debug!("Seek requested {:.3}s, applied {:.3}s", seconds, target);
        }
        Command::Jump(fraction) => {
            session.seek_fraction(fraction);
        }
        Command::Volume(volume) => session.set_volume(volume),
        Command::ToggleMute(track) => match session.toggle_mute(track) {
            Ok(muted) => println!(
                "{} {}",
                StemKind::from_index(track).map_or("track", |s| s.label()),
                if muted { "muted" } else { "unmuted" }
            ),
            Err(e) => println!("{}", e),
        },
        Command::Status => println!("{}", status_line(&session.snapshot(), STATUS_BAR_WIDTH)),
        Command::Help => println!("{}", commands::HELP),
        Command::Quit => {}
    }
}

/// Forward stdin lines to the control loop
async fn read_stdin(tx: mpsc::Sender<String>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                if tx.send(line).await.is_err() {
                    break;
                }
            }
            Ok(None) => break,
            Err(e) => {
                log::error!("Failed to read stdin: {}", e);
                break;
            }
        }
    }
}

/// Redraw whenever the published snapshot changes
///
/// Only reads the observable state; every mutation goes through the session.
async fn display_loop(
    mut snapshots: watch::Receiver<PlaybackSnapshot>,
    views: Vec<WaveformView>,
    display: DisplayConfig,
) {
    let mut surface = TextSurface::new(display.waveform_columns, display.waveform_rows);
    let mut last: Option<PlaybackSnapshot> = None;

    while snapshots.changed().await.is_ok() {
        let snapshot = snapshots.borrow_and_update().clone();
        if last.as_ref() == Some(&snapshot) {
            continue;
        }

        println!("{}", status_line(&snapshot, STATUS_BAR_WIDTH));
        let progress = snapshot.progress();
        for view in &views {
            let slot = view.stem().index();
            let muted = snapshot.muted.get(slot).copied().unwrap_or(false);
            view.draw(&mut surface, progress, muted);

            let marker = if slot == REFERENCE_TRACK { "*" } else { " " };
            println!("{}{}{}", STEM_NAMES_SHORT[slot], marker, if muted { " (muted)" } else { "" });
            println!("{}", surface);
        }
        last = Some(snapshot);
    }
}
