//! dsud - standalone DSU motion telemetry daemon
//!
//! Runs the DSU server on loopback and, unless disabled in the config,
//! feeds slot 0 with a generated sine-wave motion signal so the daemon is
//! usable end-to-end without a host application attached.

use dsud::{AppConfig, DsuServer, Error, MotionSnapshot, Result};
use std::env;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Parse config path from command line arguments.
///
/// Supports:
/// - `dsud <path>` (positional)
/// - `dsud --config <path>` (flag-based)
/// - `dsud -c <path>` (short flag)
///
/// Returns `None` when no path was given; defaults apply.
fn parse_config_path() -> Option<String> {
    let args: Vec<String> = env::args().collect();

    // Look for --config or -c flag
    for i in 1..args.len() {
        if (args[i] == "--config" || args[i] == "-c") && i + 1 < args.len() {
            return Some(args[i + 1].clone());
        }
    }

    // Fall back to first positional argument (if it doesn't start with -)
    if args.len() > 1 && !args[1].starts_with('-') {
        return Some(args[1].clone());
    }

    None
}

fn main() -> Result<()> {
    let config = match parse_config_path() {
        Some(path) => AppConfig::load(&path)?,
        None => AppConfig::default(),
    };

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.logging.level.clone()),
    )
    .init();

    log::info!("dsud starting...");

    let mut server = DsuServer::new();
    server.on_status(|status| log::info!("[status] {}", status));

    if !server.start(config.server.port) {
        return Err(Error::Other(format!(
            "could not start DSU server on port {}",
            config.server.port
        )));
    }

    // Shutdown signal handler
    let running = Arc::new(AtomicBool::new(true));
    let r = Arc::clone(&running);
    ctrlc::set_handler(move || {
        log::info!("Received shutdown signal");
        r.store(false, Ordering::Relaxed);
    })
    .map_err(|e| Error::Other(format!("Error setting Ctrl-C handler: {}", e)))?;

    log::info!("dsud running. Press Ctrl-C to stop.");

    if config.demo.enabled {
        run_demo_feeder(&server, &running, config.demo.rate_hz);
    } else {
        while running.load(Ordering::Relaxed) {
            thread::sleep(Duration::from_millis(100));
        }
    }

    server.stop();
    log::info!("dsud stopped");
    Ok(())
}

/// Feed slot 0 with a synthetic motion signal until shutdown.
///
/// A slow sine sweep across all six axes: recognizable in client-side
/// plots and cheap to generate.
fn run_demo_feeder(server: &DsuServer, running: &AtomicBool, rate_hz: u32) {
    let rate_hz = rate_hz.max(1);
    let period = Duration::from_secs(1) / rate_hz;
    let start = Instant::now();

    log::info!("Demo motion feeder running at {} Hz on slot 0", rate_hz);

    while running.load(Ordering::Relaxed) {
        let elapsed = start.elapsed();
        let t = elapsed.as_secs_f32();

        let snapshot = MotionSnapshot::new(
            [
                (t * 0.8).sin() * 0.5,
                (t * 0.6).cos() * 0.5,
                1.0, // resting gravity on Z
            ],
            [(t * 1.1).sin() * 45.0, (t * 0.9).cos() * 45.0, (t * 0.7).sin() * 45.0],
            elapsed.as_micros() as i64,
        );

        server.broadcast_motion(0, &snapshot, true);
        thread::sleep(period);
    }
}
