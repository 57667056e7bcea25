mod config;
mod control;
mod metrics;
mod pieces;
mod sim;

use std::path::PathBuf;

use clap::Parser;
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::ServerConfig;
use crate::sim::{Command, Simulation};

/// Authoritative simulation server for a multiplayer brick world.
#[derive(Parser, Debug)]
#[command(name = "brickworld-server")]
struct Args {
    /// Piece catalog JSON path, overriding BRICKWORLD_CATALOG.
    #[arg(long)]
    catalog: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let mut config = ServerConfig::from_env()?;
    if args.catalog.is_some() {
        config.catalog_path = args.catalog;
    }

    let pieces = match &config.catalog_path {
        Some(path) => {
            info!(path = %path.display(), "loading piece catalog");
            piece::load_catalog(path)?
        }
        None => pieces::builtin_library()?,
    };
    info!(pieces = pieces.len(), "piece library ready");

    let mut sim = Simulation::new(pieces, config.clone());
    sim.seed_ground();

    let (commands_tx, commands_rx) = mpsc::channel(256);
    tokio::spawn(metrics::start_metrics_reporter(
        sim.metrics(),
        config.metrics_interval_secs,
    ));
    tokio::spawn(control::run_console(commands_tx));

    run(&mut sim, commands_rx, &config).await;
    Ok(())
}

/// Fixed-rate tick loop interleaved with command handling. Ticks and
/// commands run on one task, so queries always see a consistent world.
async fn run(sim: &mut Simulation, mut commands: mpsc::Receiver<Command>, config: &ServerConfig) {
    let dt = config.tick_duration().as_secs_f32();
    let mut ticker = tokio::time::interval(config.tick_duration());
    info!(tick_rate = config.tick_rate, "simulation running");
    loop {
        tokio::select! {
            _ = ticker.tick() => sim.step(dt),
            command = commands.recv() => match command {
                Some(Command::Shutdown) | None => break,
                Some(command) => {
                    let result = sim.apply_command(command);
                    tracing::debug!(?result, "command applied");
                }
            },
            _ = tokio::signal::ctrl_c() => break,
        }
    }
    info!("simulation stopped");
}
