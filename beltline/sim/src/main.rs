//! Beltline Simulator
//!
//! Standalone tick driver for the conveyor inspection line. Loads the line
//! configuration, builds a demo surface pool, and advances the line at a
//! fixed cadence until interrupted (or until a requested number of passes
//! completes).
//!
//! # Usage
//!
//! ```bash
//! # Run against the default endpoint at the default 60 Hz
//! beltline-sim
//!
//! # Custom endpoint and slower tick rate
//! beltline-sim --endpoint http://inspector.local:5000/inspect --tick-hz 30
//!
//! # Stop after five full passes, with verbose logging
//! RUST_LOG=debug beltline-sim --passes 5
//! ```
//!
//! # Environment Variables
//!
//! - `BELTLINE_ENDPOINT`: classification service URL override
//! - `RUST_LOG`: log level (trace, debug, info, warn, error)

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio::signal;
use tracing::{info, warn};

use beltline_core::{
    load_config, load_config_from_path, Bitmap, DefectClassifier, HttpClassifier, LineConfig,
    ProductLine, Surface, TexturePool,
};

/// Conveyor inspection line simulator
#[derive(Debug, Parser)]
#[command(name = "beltline-sim", version, about)]
struct Args {
    /// Path to a line configuration TOML file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Classification service endpoint URL (overrides config)
    #[arg(long, env = "BELTLINE_ENDPOINT")]
    endpoint: Option<String>,

    /// Tick rate in Hz
    #[arg(long, default_value_t = 60.0)]
    tick_hz: f64,

    /// Stop after this many completed passes (runs forever when omitted)
    #[arg(long)]
    passes: Option<u64>,
}

/// Build the demo surface pool
///
/// Stands in for the excluded asset-loading subsystem: a few generated
/// bitmaps with enough visual variety to exercise the classifier.
fn demo_surfaces() -> Vec<Surface> {
    vec![
        Surface::Bitmap(Bitmap::checkerboard(
            64,
            64,
            8,
            [220, 220, 220, 255],
            [30, 30, 30, 255],
        )),
        Surface::Bitmap(Bitmap::checkerboard(
            64,
            64,
            4,
            [180, 60, 60, 255],
            [240, 240, 240, 255],
        )),
        Surface::Bitmap(Bitmap::solid(64, 64, [90, 140, 210, 255])),
        Surface::Bitmap(Bitmap::solid(64, 64, [200, 170, 90, 255])),
    ]
}

fn load_line_config(args: &Args) -> anyhow::Result<LineConfig> {
    let mut config = match &args.config {
        Some(path) => load_config_from_path(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => load_config().context("loading default config")?,
    };
    if let Some(endpoint) = &args.endpoint {
        config.endpoint.clone_from(endpoint);
    }
    config.validate().context("validating config")?;
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("beltline_sim=info".parse()?)
                .add_directive("beltline_core=info".parse()?),
        )
        .with_target(true)
        .init();

    let args = Args::parse();
    anyhow::ensure!(args.tick_hz > 0.0, "tick rate must be positive");

    let config = load_line_config(&args)?;
    info!(endpoint = %config.endpoint, speed = config.speed, "starting beltline simulator");

    let classifier = Arc::new(HttpClassifier::from_config(&config));
    if !classifier.health_check().await {
        warn!(endpoint = %config.endpoint, "classification service unreachable at startup");
    }

    let pool = Arc::new(TexturePool::new(demo_surfaces()));
    let mut line = ProductLine::new(config, pool, classifier);

    let dt = Duration::from_secs_f64(1.0 / args.tick_hz);
    let mut ticker = tokio::time::interval(dt);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    let mut completed_passes = 0u64;
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let report = line.advance(dt);
                if let Some(branch) = report.diverted {
                    info!(?branch, "item diverted");
                }
                if report.reset {
                    completed_passes += 1;
                    info!(completed_passes, "pass complete");
                    if args.passes.is_some_and(|limit| completed_passes >= limit) {
                        break;
                    }
                }
            }
            _ = signal::ctrl_c() => {
                info!("shutdown signal received");
                break;
            }
        }
    }

    info!(completed_passes, "simulator stopped");
    Ok(())
}
