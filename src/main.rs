// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/seizure-sentinel

//! Seizure Sentinel - headless monitor
//!
//! Drives one monitoring session from a synthetic scenario or a recorded
//! measurement file and reports alert events as they are raised.

use anyhow::{bail, Result};
use clap::Parser;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;
use std::path::PathBuf;
use std::time::Duration;

use seizure_sentinel::sensors::{ReplaySource, Scenario, ScenarioSimulator};
use seizure_sentinel::{build_info, Config, MeasurementSource, Monitor, NAME, VERSION};

/// Seizure Sentinel - real-time convulsion and fall alerting
#[derive(Parser, Debug)]
#[command(name = "seizure-sentinel")]
#[command(version = VERSION)]
#[command(about = "Real-time convulsion and fall alerting from camera measurements")]
struct Args {
    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Enable trace-level logging
    #[arg(long)]
    trace: bool,

    /// Run a synthetic scenario (calm, convulsion, fall, mixed)
    #[arg(long, value_name = "SCENARIO", conflicts_with = "replay")]
    demo: Option<Scenario>,

    /// Replay recorded measurements (JSON lines)
    #[arg(long, value_name = "FILE")]
    replay: Option<PathBuf>,

    /// Stop after this many frames
    #[arg(long)]
    frames: Option<u64>,

    /// Pace frames at the source frame rate instead of running flat out
    #[arg(long)]
    realtime: bool,

    /// Print alert events to stdout as JSON lines
    #[arg(long)]
    json: bool,

    /// Session identifier
    #[arg(long, default_value = "camera-0")]
    session: String,
}

/// Synthetic runs default to 20 s of video
const DEFAULT_DEMO_FRAMES: u64 = 600;

fn main() -> Result<()> {
    let args = Args::parse();

    // Load or create configuration
    let config_path = args.config.clone().unwrap_or_else(Config::default_path);
    let config = Config::load_or_create(&config_path)?;

    // Initialize logging
    let log_level = if args.trace {
        Level::TRACE
    } else if args.debug {
        Level::DEBUG
    } else {
        config.log_level.parse().unwrap_or(Level::INFO)
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_file(args.debug)
        .with_line_number(args.debug)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let build = build_info();
    info!("{} v{} ({}/{})", NAME, VERSION, build.os, build.target);
    info!("Configuration loaded from {:?}", config_path);

    let source: Box<dyn MeasurementSource> = match (&args.demo, &args.replay) {
        (Some(scenario), _) => {
            let frames = args.frames.unwrap_or(DEFAULT_DEMO_FRAMES);
            Box::new(ScenarioSimulator::new(*scenario, config.demo.clone()).with_limit(frames))
        }
        (None, Some(path)) => Box::new(ReplaySource::open(path)?),
        (None, None) => bail!("nothing to monitor: pass --demo <SCENARIO> or --replay <FILE>"),
    };

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(run_headless(config, source, args))
}

/// Feed every frame of `source` through one session
async fn run_headless(config: Config, mut source: Box<dyn MeasurementSource>, args: Args) -> Result<()> {
    let frame_interval = source
        .frame_rate()
        .filter(|fps| *fps > 0.0)
        .map(|fps| Duration::from_secs_f64(1.0 / fps));
    let limit = if args.replay.is_some() { args.frames } else { None };

    let monitor = Monitor::new(config)?;
    let handle = monitor.open_session(&args.session).await;

    let mut alerts = monitor.event_bus().subscribe_alerts();
    let json = args.json;
    let listener = tokio::spawn(async move {
        loop {
            match alerts.recv().await {
                Ok(alert) if json => match serde_json::to_string(&alert) {
                    Ok(line) => println!("{}", line),
                    Err(e) => warn!("Failed to encode alert: {}", e),
                },
                Ok(alert) => info!(
                    "🚨 [{}] alert {} at t={:.2}s score={:.2} posture={:?} symptoms={:?}",
                    alert.session_id,
                    alert.id,
                    alert.timestamp,
                    alert.fused_score,
                    alert.posture_state,
                    alert.contributing_symptoms
                ),
                Err(RecvError::Lagged(missed)) => warn!("Alert listener lagged, {} alerts missed", missed),
                Err(RecvError::Closed) => break,
            }
        }
    });

    info!("Monitoring '{}' from {}", args.session, source.name());

    let mut processed = 0u64;
    while let Some(frame) = source.next_frame() {
        if limit.map_or(false, |limit| processed >= limit) {
            break;
        }

        let frame = frame?;
        if handle.process(&frame).is_ok() {
            processed += 1;
        }

        if let (true, Some(interval)) = (args.realtime, frame_interval) {
            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                _ = tokio::signal::ctrl_c() => {
                    info!("Shutdown signal received");
                    break;
                }
            }
        }
    }

    let status = monitor.close_session(&args.session).await?;
    info!(
        "Processed {} frames, {} alerts, final state {:?}",
        status.frames_processed, status.alerts_emitted, status.state
    );

    // Dropping the last bus reference ends the listener
    drop(handle);
    drop(monitor);
    listener.await?;

    Ok(())
}
