// src/main.rs

//! Agent entry-point: replay a recorded request stream against a mounted
//! in-memory volume.
//!
//! 1. Parse arguments and configuration, set up structured logging
//! 2. Mount a `MemoryFs` instance with the configured options
//! 3. Start the dispatch workers, feed them every framed request
//! 4. Drain, flush the framed responses and report
//!
// ───── std / 3rd-party imports ──────────────────────────────────────────────
use anyhow::{Context, Result};
use clap::Parser;
use log::Level;
use std::{
    fs::File,
    io::{BufReader, BufWriter},
    path::{Path, PathBuf},
    sync::Arc,
    time::{Duration, Instant},
};

// ───── local imports ────────────────────────────────────────────────────────
use agent::bridge_log;
use agent::comms::{EventSink, FrameReader, FrameWriter, RequestRouter};
use agent::config::{self, Config};
use agent::fs::{Instance, MemoryFs};
use agent::logging::setup_logging;
use shared::events::EventContext;

#[derive(Debug, Parser)]
#[command(name = "agent", about = "Dispatch framed create requests against an in-memory volume")]
struct Args {
    /// Configuration file (defaults to `default.toml` next to the executable).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Framed `EventContext` requests to replay.
    requests: PathBuf,

    /// Where framed `EventInformation` responses are written.
    responses: PathBuf,
}

// ───── helpers ──────────────────────────────────────────────────────────────

/// Directory that contains the running executable.
fn exe_dir() -> Result<PathBuf> {
    let exe = std::env::current_exe().context("cannot determine exe path")?;
    Ok(exe.parent().map(Path::to_path_buf).unwrap_or_default())
}

/// Explicit `--config`, else `default.toml` beside the binary, else defaults.
fn load_config(args: &Args, exe_dir: &Path) -> Result<Config> {
    if let Some(path) = &args.config {
        return config::load(path).with_context(|| format!("loading {}", path.display()));
    }
    let default = exe_dir.join("default.toml");
    if default.exists() {
        return config::load(&default).with_context(|| format!("loading {}", default.display()));
    }
    Ok(config::load_from_str("")?)
}

fn main() -> Result<()> {
    let args = Args::parse();

    // 1 ─ Context & logging
    let exe_dir = exe_dir()?;
    let cfg = load_config(&args, &exe_dir)?;
    setup_logging(&exe_dir, &cfg.logging).context("logging setup failed")?;
    bridge_log!(Level::Info, "main", "mounting {} (version {})", cfg.mount.mount_point, cfg.mount.version);

    // 2 ─ Volume
    let volume = MemoryFs::new();
    let instance = Instance::new(cfg.mount.clone(), volume.operations());

    // 3 ─ Workers
    let out = File::create(&args.responses)
        .with_context(|| format!("creating {}", args.responses.display()))?;
    let writer = Arc::new(FrameWriter::new(BufWriter::new(out)));
    let sink: Arc<dyn EventSink> = writer.clone();
    let router = RequestRouter::spawn(Arc::clone(&instance), sink);

    let started = Instant::now();
    let input = File::open(&args.requests)
        .with_context(|| format!("opening {}", args.requests.display()))?;
    let mut submitted = 0usize;
    for request in FrameReader::<_, EventContext>::new(BufReader::new(input)) {
        let request = request.context("reading request frame")?;
        if !router.submit(request) {
            break;
        }
        submitted += 1;
    }

    // 4 ─ Drain
    let dispatched = router.shutdown();
    writer.flush().context("flushing responses")?;
    let elapsed = Duration::from_millis(started.elapsed().as_millis() as u64);
    bridge_log!(
        Level::Info,
        "main",
        "{} request(s) read, {} create(s) dispatched, {} handle(s) open, took {}",
        submitted,
        dispatched,
        instance.open_handles(),
        humantime::format_duration(elapsed)
    );
    Ok(())
}
