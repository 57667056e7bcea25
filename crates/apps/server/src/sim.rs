use std::collections::HashMap;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use brickworld_collision::{CollisionWorld, GhostCandidate};
use brickworld_world::{BrickId, BrickKind, Player, WorldState};
use glam::{Quat, Vec3};
use piece::{PieceId, PieceLibrary};
use tracing::{debug, info, warn};

use crate::config::ServerConfig;
use crate::metrics::SimMetrics;
use crate::pieces;

/// Movement intent a player holds until the next input arrives. The jump
/// flag is consumed by the first tick that sees it.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PlayerInput {
    pub move_x: f32,
    pub move_z: f32,
    pub jump: bool,
}

impl PlayerInput {
    fn is_finite(&self) -> bool {
        self.move_x.is_finite() && self.move_z.is_finite()
    }
}

/// One request against the authoritative world.
#[derive(Debug, Clone)]
pub enum Command {
    Join {
        name: String,
    },
    Leave {
        name: String,
    },
    SetInput {
        name: String,
        input: PlayerInput,
    },
    PlaceBrick {
        piece: PieceId,
        position: Vec3,
        rotation: Quat,
        color: u8,
    },
    RemoveBrick {
        brick: BrickId,
    },
    Shutdown,
}

/// Acknowledgement for one command.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CommandResult {
    Ok,
    Joined { spawn: Vec3 },
    Placed { brick: BrickId },
    Blocked,
    Refused,
}

/// The authoritative simulation: piece library, world state, collision
/// engine and per-player inputs, advanced by a fixed-rate tick loop.
///
/// Everything runs on the loop task. Transports validate nothing; every
/// placement and removal goes through [`Simulation::apply_command`] so the
/// collision engine has the final say.
pub struct Simulation {
    pieces: PieceLibrary,
    world: WorldState,
    collision: CollisionWorld,
    inputs: HashMap<String, PlayerInput>,
    config: ServerConfig,
    metrics: Arc<SimMetrics>,
}

impl Simulation {
    pub fn new(pieces: PieceLibrary, config: ServerConfig) -> Self {
        let collision = CollisionWorld::new(&pieces);
        Self {
            pieces,
            world: WorldState::new(),
            collision,
            inputs: HashMap::new(),
            config,
            metrics: Arc::new(SimMetrics::default()),
        }
    }

    pub fn metrics(&self) -> Arc<SimMetrics> {
        Arc::clone(&self.metrics)
    }

    pub fn world(&self) -> &WorldState {
        &self.world
    }

    /// Seeds the protected baseplate so its top face sits at y = 0.
    pub fn seed_ground(&mut self) {
        if self.pieces.get(pieces::BASEPLATE).is_none() {
            warn!("piece library has no baseplate, world starts empty");
            return;
        }
        self.world.insert_brick(
            pieces::BASEPLATE,
            Vec3::new(0.0, -4.0, 0.0),
            Quat::IDENTITY,
            0,
            BrickKind::Ground,
        );
        self.collision.rebuild(&self.pieces, &self.world);
        info!(bricks = self.world.brick_count(), "ground seeded");
    }

    pub fn apply_command(&mut self, command: Command) -> CommandResult {
        self.metrics.commands.fetch_add(1, Ordering::Relaxed);
        match command {
            Command::Join { name } => {
                if self.world.player(&name).is_some() {
                    warn!(%name, "join refused: name already connected");
                    return CommandResult::Refused;
                }
                if self.world.player_count() >= self.config.max_players {
                    warn!(%name, "join refused: server full");
                    return CommandResult::Refused;
                }
                let spawn = self.config.spawn_position();
                self.world.insert_player(name.clone(), Player::at(spawn));
                info!(%name, "player joined");
                self.inputs.insert(name, PlayerInput::default());
                self.sync_player_count();
                CommandResult::Joined { spawn }
            }
            Command::Leave { name } => {
                self.inputs.remove(&name);
                match self.world.remove_player(&name) {
                    Some(_) => {
                        info!(%name, "player left");
                        self.sync_player_count();
                        CommandResult::Ok
                    }
                    None => {
                        warn!(%name, "leave for unknown player");
                        CommandResult::Refused
                    }
                }
            }
            Command::SetInput { name, input } => {
                if !input.is_finite() {
                    warn!(%name, "input refused: non-finite");
                    return CommandResult::Refused;
                }
                match self.inputs.get_mut(&name) {
                    Some(slot) => {
                        *slot = input;
                        CommandResult::Ok
                    }
                    None => CommandResult::Refused,
                }
            }
            Command::PlaceBrick {
                piece,
                position,
                rotation,
                color,
            } => {
                // A zero-length rotation normalizes to NaN and the ghost
                // test then refuses the candidate.
                let candidate = GhostCandidate {
                    piece,
                    position,
                    rotation: rotation.normalize(),
                };
                if self.collision.test_ghost(&self.pieces, &self.world, &candidate) {
                    self.metrics.placements_blocked.fetch_add(1, Ordering::Relaxed);
                    debug!(%piece, ?position, "placement blocked");
                    return CommandResult::Blocked;
                }
                let brick = self.world.insert_brick(
                    piece,
                    candidate.position,
                    candidate.rotation,
                    color,
                    BrickKind::Normal,
                );
                self.collision.rebuild(&self.pieces, &self.world);
                self.metrics.bricks_placed.fetch_add(1, Ordering::Relaxed);
                info!(%piece, brick = brick.0, "brick placed");
                CommandResult::Placed { brick }
            }
            Command::RemoveBrick { brick } => match self.world.remove_brick(brick) {
                Ok(removed) => {
                    self.collision.rebuild(&self.pieces, &self.world);
                    self.metrics.bricks_removed.fetch_add(1, Ordering::Relaxed);
                    info!(brick = removed.id.0, "brick removed");
                    CommandResult::Ok
                }
                Err(err) => {
                    warn!(%err, "remove refused");
                    CommandResult::Refused
                }
            },
            Command::Shutdown => CommandResult::Ok,
        }
    }

    /// Advances every player by one tick: apply input, integrate gravity,
    /// then push the capsule out of the world.
    pub fn step(&mut self, dt: f32) {
        for (name, player) in self.world.players_mut() {
            let Some(input) = self.inputs.get_mut(name) else {
                continue;
            };
            let wish = Vec3::new(input.move_x, 0.0, input.move_z).clamp_length_max(1.0)
                * self.config.move_speed;
            player.velocity.x = wish.x;
            player.velocity.z = wish.z;
            if std::mem::take(&mut input.jump) && player.grounded {
                player.velocity.y = self.config.jump_speed;
            }
            player.velocity.y -= self.config.gravity * dt;
            player.position += player.velocity * dt;
            // Grounded is re-derived from contacts every tick.
            player.grounded = false;
            self.collision.resolve_player(player);
        }
        self.metrics.ticks.fetch_add(1, Ordering::Relaxed);
    }

    fn sync_player_count(&self) {
        self.metrics
            .connected_players
            .store(self.world.player_count() as u64, Ordering::Relaxed);
    }
}
