use std::env;
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::ensure;
use glam::Vec3;

/// Runtime configuration for the simulation server, read from
/// `BRICKWORLD_*` environment variables with sane defaults.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Simulation ticks per second.
    pub tick_rate: u32,
    /// Maximum simultaneous players.
    pub max_players: usize,
    /// Downward acceleration applied to players, units per second squared.
    pub gravity: f32,
    /// Horizontal movement speed, units per second.
    pub move_speed: f32,
    /// Vertical takeoff speed of a jump, units per second.
    pub jump_speed: f32,
    /// Height above the origin where new players spawn.
    pub spawn_height: f32,
    /// Piece catalog JSON path. The builtin piece set loads when unset.
    pub catalog_path: Option<PathBuf>,
    /// Seconds between metrics reports.
    pub metrics_interval_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            tick_rate: 60,
            max_players: 16,
            gravity: 320.0,
            move_speed: 90.0,
            jump_speed: 140.0,
            spawn_height: 40.0,
            catalog_path: None,
            metrics_interval_secs: 30,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Self::default();
        let config = Self {
            tick_rate: parse_var("BRICKWORLD_TICK_RATE", defaults.tick_rate)?,
            max_players: parse_var("BRICKWORLD_MAX_PLAYERS", defaults.max_players)?,
            gravity: parse_var("BRICKWORLD_GRAVITY", defaults.gravity)?,
            move_speed: parse_var("BRICKWORLD_MOVE_SPEED", defaults.move_speed)?,
            jump_speed: parse_var("BRICKWORLD_JUMP_SPEED", defaults.jump_speed)?,
            spawn_height: parse_var("BRICKWORLD_SPAWN_HEIGHT", defaults.spawn_height)?,
            catalog_path: env::var("BRICKWORLD_CATALOG").ok().map(PathBuf::from),
            metrics_interval_secs: parse_var(
                "BRICKWORLD_METRICS_INTERVAL",
                defaults.metrics_interval_secs,
            )?,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        ensure!(self.tick_rate > 0, "tick rate must be positive");
        ensure!(self.max_players > 0, "max players must be positive");
        ensure!(
            self.gravity.is_finite() && self.gravity >= 0.0,
            "gravity must be finite and non-negative"
        );
        ensure!(
            self.move_speed.is_finite() && self.move_speed >= 0.0,
            "move speed must be finite and non-negative"
        );
        ensure!(
            self.jump_speed.is_finite() && self.jump_speed >= 0.0,
            "jump speed must be finite and non-negative"
        );
        ensure!(self.spawn_height.is_finite(), "spawn height must be finite");
        Ok(())
    }

    /// Where new players appear.
    pub fn spawn_position(&self) -> Vec3 {
        Vec3::new(0.0, self.spawn_height, 0.0)
    }

    /// Duration of one simulation tick.
    pub fn tick_duration(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.tick_rate))
    }
}

fn parse_var<T>(name: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|err| anyhow::anyhow!("{name}={raw}: {err}")),
        Err(_) => Ok(default),
    }
}
