//! Cabinet - a small arcade machine built on an incremental ECS
//!
//! Headless entry point: runs a scripted session of the selected game and
//! logs its progress. Pass `breakout` (default) or `snake`.

use anyhow::{bail, Context, Result};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use cabinet_games::{breakout, snake};

/// Wall-clock seconds of simulated play.
const SESSION_SECONDS: f32 = 30.0;
/// Demo slices time in chunks, like a browser animation callback would.
const CHUNK_SECONDS: f32 = 1.0 / 50.0;

/// Reads a game config from a JSON file, falling back to defaults.
fn load_config<T: serde::de::DeserializeOwned + Default>(path: Option<&str>) -> Result<T> {
    match path {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {path}"))?;
            serde_json::from_str(&text).with_context(|| format!("Failed to parse {path}"))
        }
        None => Ok(T::default()),
    }
}

fn run_breakout(seed: u64, config: Option<&str>) -> Result<()> {
    let mut game = breakout::new_game(load_config(config)?, seed);

    let mut elapsed = 0.0;
    while elapsed < SESSION_SECONDS {
        // Scripted input: chase the ball with the paddle.
        let axis = {
            let world = game.world();
            let state = world
                .resource::<breakout::BreakoutState>()
                .ok_or_else(|| anyhow::anyhow!("breakout state missing"))?;
            if state.over {
                break;
            }
            let paddle_x = world
                .entities()
                .find_map(|e| {
                    world.get::<breakout::Paddle>(e)?;
                    Some(world.get::<breakout::Position>(e)?.0.x)
                })
                .unwrap_or(state.config.width / 2.0);
            let ball_x = world
                .entities()
                .find_map(|e| {
                    world.get::<breakout::Ball>(e)?;
                    Some(world.get::<breakout::Position>(e)?.0.x)
                })
                .unwrap_or(paddle_x);
            (ball_x - paddle_x).clamp(-1.0, 1.0)
        };
        if let Some(state) = game.world_mut().resource_mut::<breakout::BreakoutState>() {
            state.input.axis = axis;
        }

        game.advance(CHUNK_SECONDS);
        elapsed += CHUNK_SECONDS;
    }

    let state = game
        .world()
        .resource::<breakout::BreakoutState>()
        .ok_or_else(|| anyhow::anyhow!("breakout state missing"))?;
    info!(
        score = state.score,
        lives = state.lives,
        over = state.over,
        "breakout session finished"
    );
    Ok(())
}

fn run_snake(seed: u64, config: Option<&str>) -> Result<()> {
    let mut game = snake::new_game(load_config(config)?, seed);
    let turns = [
        snake::Dir::Down,
        snake::Dir::Left,
        snake::Dir::Up,
        snake::Dir::Right,
    ];

    let mut elapsed = 0.0;
    let mut turn = 0;
    while elapsed < SESSION_SECONDS {
        {
            let world = game.world_mut();
            let Some(state) = world.resource_mut::<snake::SnakeState>() else {
                bail!("snake state missing");
            };
            if state.over {
                break;
            }
            // Scripted input: patrol the board clockwise.
            if state.head.x <= 2
                || state.head.y <= 2
                || state.head.x >= state.config.cols - 3
                || state.head.y >= state.config.rows - 3
            {
                state.pending_dir = turns[turn % turns.len()];
                turn += 1;
            }
        }

        game.advance(CHUNK_SECONDS);
        elapsed += CHUNK_SECONDS;
    }

    let state = game
        .world()
        .resource::<snake::SnakeState>()
        .ok_or_else(|| anyhow::anyhow!("snake state missing"))?;
    info!(
        score = state.score,
        len = state.len,
        over = state.over,
        "snake session finished"
    );
    Ok(())
}

fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("Failed to set subscriber");

    let game = std::env::args().nth(1).unwrap_or_else(|| "breakout".into());
    let seed = std::env::args()
        .nth(2)
        .map(|s| s.parse::<u64>())
        .transpose()?
        .unwrap_or(0xCAB);
    let config = std::env::args().nth(3);

    info!(game, seed, "starting cabinet");
    match game.as_str() {
        "breakout" => run_breakout(seed, config.as_deref()),
        "snake" => run_snake(seed, config.as_deref()),
        other => bail!("unknown game '{other}', expected breakout or snake"),
    }
}
