use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Counters for the simulation loop.
#[derive(Debug, Default)]
pub struct SimMetrics {
    pub ticks: AtomicU64,
    pub commands: AtomicU64,
    pub connected_players: AtomicU64,
    pub bricks_placed: AtomicU64,
    pub placements_blocked: AtomicU64,
    pub bricks_removed: AtomicU64,
}

impl SimMetrics {
    /// Print metrics to console
    pub fn print_stats(&self) {
        tracing::info!(
            "Ticks: {} | Players: {} | Commands: {} | Placed: {} | Blocked: {} | Removed: {}",
            self.ticks.load(Ordering::Relaxed),
            self.connected_players.load(Ordering::Relaxed),
            self.commands.load(Ordering::Relaxed),
            self.bricks_placed.load(Ordering::Relaxed),
            self.placements_blocked.load(Ordering::Relaxed),
            self.bricks_removed.load(Ordering::Relaxed),
        );
    }
}

/// Start metrics reporting task
pub async fn start_metrics_reporter(metrics: Arc<SimMetrics>, interval_secs: u64) {
    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs.max(1)));
    loop {
        interval.tick().await;
        metrics.print_stats();
    }
}
