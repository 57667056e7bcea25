//! Line-oriented control console on stdin, standing in for a network
//! transport. Each line parses into one simulation command:
//!
//! ```text
//! join <name>
//! leave <name>
//! move <name> <dx> <dz>
//! jump <name>
//! place <piece> <x> <y> <z> [yaw-degrees] [color]
//! remove <brick>
//! quit
//! ```

use brickworld_world::BrickId;
use glam::{Quat, Vec3};
use piece::PieceId;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::warn;

use crate::sim::{Command, PlayerInput};

/// Feeds stdin lines into the command channel until EOF or `quit`.
pub async fn run_console(commands: mpsc::Sender<Command>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        match parse_line(&line) {
            Ok(Some(command)) => {
                let quitting = matches!(command, Command::Shutdown);
                if commands.send(command).await.is_err() || quitting {
                    return;
                }
            }
            Ok(None) => {}
            Err(message) => warn!(%line, "{message}"),
        }
    }
    let _ = commands.send(Command::Shutdown).await;
}

fn parse_line(line: &str) -> Result<Option<Command>, String> {
    let mut parts = line.split_whitespace();
    let Some(verb) = parts.next() else {
        return Ok(None);
    };
    let rest: Vec<&str> = parts.collect();
    let command = match verb {
        "join" => Command::Join {
            name: arg(&rest, 0)?.to_string(),
        },
        "leave" => Command::Leave {
            name: arg(&rest, 0)?.to_string(),
        },
        "move" => Command::SetInput {
            name: arg(&rest, 0)?.to_string(),
            input: PlayerInput {
                move_x: num(&rest, 1)?,
                move_z: num(&rest, 2)?,
                jump: false,
            },
        },
        "jump" => Command::SetInput {
            name: arg(&rest, 0)?.to_string(),
            input: PlayerInput {
                move_x: 0.0,
                move_z: 0.0,
                jump: true,
            },
        },
        "place" => {
            let yaw_degrees: f32 = match rest.get(4) {
                Some(_) => num(&rest, 4)?,
                None => 0.0,
            };
            let color = match rest.get(5) {
                Some(_) => num(&rest, 5)?,
                None => 0,
            };
            Command::PlaceBrick {
                piece: PieceId(num(&rest, 0)?),
                position: Vec3::new(num(&rest, 1)?, num(&rest, 2)?, num(&rest, 3)?),
                rotation: Quat::from_rotation_y(yaw_degrees.to_radians()),
                color,
            }
        }
        "remove" => Command::RemoveBrick {
            brick: BrickId(num(&rest, 0)?),
        },
        "quit" | "exit" => Command::Shutdown,
        _ => return Err(format!("unknown command: {verb}")),
    };
    Ok(Some(command))
}

fn arg<'a>(rest: &[&'a str], index: usize) -> Result<&'a str, String> {
    rest.get(index)
        .copied()
        .ok_or_else(|| format!("missing argument {}", index + 1))
}

fn num<T: std::str::FromStr>(rest: &[&str], index: usize) -> Result<T, String> {
    arg(rest, index)?
        .parse()
        .map_err(|_| format!("bad number in argument {}", index + 1))
}
