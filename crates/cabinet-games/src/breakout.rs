//! Breakout
//!
//! Paddle, falling ball, brick wall. The module is laid out the way every
//! Cabinet game is: component types, a config + resource pair, system
//! builders that register their views once, and `new_world` wiring entities
//! and event handlers together.

use cabinet_core::{Countdown, FrameClock, Rect, Vec2};
use cabinet_ecs::{Entity, EventError, Schedule, System, ViewDesc, World};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::runner::GameLoop;

/// Event emitted with a `u32` payload when bricks are destroyed.
pub const SCORE: &str = "score";
/// Event emitted when a ball leaves the bottom edge.
pub const BALL_LOST: &str = "ball-lost";
/// Event emitted when the last life is gone.
pub const GAME_OVER: &str = "gameover";

const BRICK_POINTS: u32 = 50;
/// Horizontal velocity added per unit of paddle-hit offset.
const SPIN_KICK: f32 = 60.0;

// ---- Components ----

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position(pub Vec2);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Velocity(pub Vec2);

/// Half-size of the entity's collision box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extent(pub Vec2);

#[derive(Debug, Clone, Copy)]
pub struct Paddle;

#[derive(Debug, Clone, Copy)]
pub struct Ball;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Brick {
    /// Remaining hits before the brick breaks.
    pub hits: u32,
}

/// Derived component: english picked up from paddle hits. Materialized
/// lazily from the world template on first access.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Spin {
    pub amount: f32,
}

// ---- Config & resource ----

/// Playfield and tuning constants. Screen coordinates: y grows downward.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreakoutConfig {
    pub width: f32,
    pub height: f32,
    /// Paddle speed in units per second
    pub paddle_speed: f32,
    pub paddle_half: Vec2,
    /// Ball speed in units per second
    pub ball_speed: f32,
    pub ball_half: Vec2,
    pub brick_rows: u32,
    pub brick_cols: u32,
    pub brick_half: Vec2,
    pub lives: u32,
    /// Delay in seconds before a served ball starts moving
    pub serve_delay: f32,
}

impl Default for BreakoutConfig {
    fn default() -> Self {
        Self {
            width: 320.0,
            height: 240.0,
            paddle_speed: 220.0,
            paddle_half: Vec2::new(24.0, 4.0),
            ball_speed: 150.0,
            ball_half: Vec2::splat(3.0),
            brick_rows: 4,
            brick_cols: 8,
            brick_half: Vec2::new(18.0, 6.0),
            lives: 3,
            serve_delay: 1.0,
        }
    }
}

/// Horizontal input axis in -1.0..=1.0, fed by the host each frame.
#[derive(Debug, Clone, Copy, Default)]
pub struct PaddleInput {
    pub axis: f32,
}

/// Global game state. Directly mutable, never deferred.
pub struct BreakoutState {
    pub config: BreakoutConfig,
    pub score: u32,
    pub lives: u32,
    pub serve: Countdown,
    pub input: PaddleInput,
    pub over: bool,
    rng: StdRng,
}

impl BreakoutState {
    pub fn new(config: BreakoutConfig, seed: u64) -> Self {
        Self {
            lives: config.lives,
            serve: Countdown::new(config.serve_delay),
            score: 0,
            over: false,
            input: PaddleInput::default(),
            rng: StdRng::seed_from_u64(seed),
            config,
        }
    }
}

// ---- World construction ----

fn serve_angle(rng: &mut StdRng) -> f32 {
    rng.gen_range(-0.6..0.6)
}

fn seed_ball(world: &mut World, entity: Entity, config: &BreakoutConfig, angle: f32) {
    // Served upward-ish from the middle of the field.
    let dir = Vec2::new(angle.sin(), -angle.cos());
    world.insert(entity, Position(Vec2::new(config.width * 0.5, config.height * 0.6)));
    world.insert(entity, Velocity(dir * config.ball_speed));
    world.insert(entity, Extent(config.ball_half));
    world.insert(entity, Ball);
}

fn brick_center(config: &BreakoutConfig, row: u32, col: u32) -> Vec2 {
    let cell = config.brick_half * 2.0 + Vec2::splat(2.0);
    let grid_width = cell.x * config.brick_cols as f32;
    let origin = Vec2::new((config.width - grid_width) * 0.5, 20.0);
    origin + Vec2::new(col as f32 + 0.5, row as f32 + 0.5) * cell
}

/// Build a fresh breakout world: paddle, brick grid, first ball, resource,
/// and the score/lives event handlers.
pub fn new_world(config: BreakoutConfig, seed: u64) -> World {
    let mut world = World::new();
    world.register_derived(Spin::default());
    let mut state = BreakoutState::new(config.clone(), seed);

    world.spawn_with(|w, e| {
        w.insert(
            e,
            Position(Vec2::new(config.width * 0.5, config.height - 16.0)),
        );
        w.insert(e, Extent(config.paddle_half));
        w.insert(e, Paddle);
    });

    for row in 0..config.brick_rows {
        for col in 0..config.brick_cols {
            let center = brick_center(&config, row, col);
            // Rows closer to the top take more hits.
            let hits = 1 + (config.brick_rows - 1 - row) / 2;
            world.spawn_with(|w, e| {
                w.insert(e, Position(center));
                w.insert(e, Extent(config.brick_half));
                w.insert(e, Brick { hits });
            });
        }
    }

    let angle = serve_angle(&mut state.rng);
    world.spawn_with(|w, e| seed_ball(w, e, &config, angle));
    world.insert_resource(state);

    world.on(SCORE, |w, payload| {
        let points = payload
            .downcast_ref::<u32>()
            .copied()
            .ok_or_else(|| EventError::new("score payload must be u32"))?;
        if let Some(state) = w.resource_mut::<BreakoutState>() {
            state.score += points;
        }
        Ok(())
    });
    world.on(BALL_LOST, |w, _| {
        let mut ended = false;
        if let Some(state) = w.resource_mut::<BreakoutState>() {
            state.lives = state.lives.saturating_sub(1);
            if state.lives == 0 && !state.over {
                state.over = true;
                ended = true;
            }
        }
        if ended {
            w.emit(GAME_OVER, &());
        }
        Ok(())
    });
    world.on(GAME_OVER, |_, _| {
        tracing::info!(game = "breakout", "game over");
        Ok(())
    });

    world
}

// ---- Systems ----

/// Ticks the serve countdown; ball motion is gated on it.
pub fn serve_system(_world: &mut World, dt: f32) -> impl System {
    move |world: &mut World| {
        if let Some(state) = world.resource_mut::<BreakoutState>() {
            state.serve.tick(dt);
        }
    }
}

/// Moves the paddle from the input axis, clamped to the playfield.
pub fn paddle_system(world: &mut World, dt: f32) -> impl System {
    let paddles = world.view(ViewDesc::new().with::<Paddle>().with::<Position>());
    move |world: &mut World| {
        let Some(state) = world.resource::<BreakoutState>() else {
            return;
        };
        let axis = state.input.axis.clamp(-1.0, 1.0);
        if axis == 0.0 || state.over {
            return;
        }
        let step = axis * state.config.paddle_speed * dt;
        let min_x = state.config.paddle_half.x;
        let max_x = state.config.width - state.config.paddle_half.x;
        for entity in world.view_iter(paddles) {
            world.defer_update::<Position>(entity, move |p| {
                p.0.x = (p.0.x + step).clamp(min_x, max_x);
            });
        }
    }
}

/// Integrates ball positions while the serve countdown is done.
pub fn motion_system(world: &mut World, dt: f32) -> impl System {
    let balls = world.view(
        ViewDesc::new()
            .with::<Ball>()
            .with::<Position>()
            .with::<Velocity>(),
    );
    move |world: &mut World| {
        let gated = world
            .resource::<BreakoutState>()
            .map_or(true, |s| !s.serve.is_done() || s.over);
        if gated {
            return;
        }
        for entity in world.view_iter(balls) {
            let Some(vel) = world.get::<Velocity>(entity).copied() else {
                continue;
            };
            world.defer_update::<Position>(entity, move |p| p.0 += vel.0 * dt);
        }
    }
}

/// Reflects balls off the side and top walls. Every ball is checked every
/// frame, so simultaneous wall hits on different balls all resolve in the
/// same frame.
pub fn wall_system(world: &mut World) -> impl System {
    let balls = world.view(
        ViewDesc::new()
            .with::<Ball>()
            .with::<Position>()
            .with::<Velocity>()
            .with::<Extent>(),
    );
    move |world: &mut World| {
        let Some(width) = world.resource::<BreakoutState>().map(|s| s.config.width) else {
            return;
        };
        for entity in world.view_iter(balls) {
            let (Some(pos), Some(vel), Some(ext)) = (
                world.get::<Position>(entity),
                world.get::<Velocity>(entity),
                world.get::<Extent>(entity),
            ) else {
                continue;
            };
            let mut p = pos.0;
            let mut v = vel.0;
            let mut bounced = false;
            if p.x - ext.0.x < 0.0 && v.x < 0.0 {
                v.x = -v.x;
                p.x = ext.0.x;
                bounced = true;
            }
            if p.x + ext.0.x > width && v.x > 0.0 {
                v.x = -v.x;
                p.x = width - ext.0.x;
                bounced = true;
            }
            if p.y - ext.0.y < 0.0 && v.y < 0.0 {
                v.y = -v.y;
                p.y = ext.0.y;
                bounced = true;
            }
            if bounced {
                world.defer_update::<Position>(entity, move |pp| pp.0 = p);
                world.defer_update::<Velocity>(entity, move |vv| vv.0 = v);
            }
        }
    }
}

/// Bounces balls off the paddle, recording english on the derived `Spin`.
pub fn paddle_bounce_system(world: &mut World) -> impl System {
    let balls = world.view(
        ViewDesc::new()
            .with::<Ball>()
            .with::<Position>()
            .with::<Velocity>()
            .with::<Extent>(),
    );
    let paddles = world.view(
        ViewDesc::new()
            .with::<Paddle>()
            .with::<Position>()
            .with::<Extent>(),
    );
    move |world: &mut World| {
        let mut hits: Vec<(Entity, f32)> = Vec::new();
        for ball in world.view_iter(balls) {
            let (Some(bp), Some(bv), Some(be)) = (
                world.get::<Position>(ball),
                world.get::<Velocity>(ball),
                world.get::<Extent>(ball),
            ) else {
                continue;
            };
            if bv.0.y <= 0.0 {
                // Only balls on their way down can hit the paddle.
                continue;
            }
            let ball_rect = Rect::new(bp.0, be.0);
            for paddle in world.view_iter(paddles) {
                let (Some(pp), Some(pe)) = (
                    world.get::<Position>(paddle),
                    world.get::<Extent>(paddle),
                ) else {
                    continue;
                };
                if ball_rect.intersects(&Rect::new(pp.0, pe.0)) {
                    let offset = ((bp.0.x - pp.0.x) / pe.0.x).clamp(-1.0, 1.0);
                    hits.push((ball, offset));
                    break;
                }
            }
        }
        for (ball, offset) in hits {
            world.defer_with(ball, move |w, e| {
                if let Some(spin) = w.derived::<Spin>(e) {
                    spin.amount = offset;
                }
                if let Some(vel) = w.get_mut::<Velocity>(e) {
                    vel.0.y = -vel.0.y.abs();
                    vel.0.x += offset * SPIN_KICK;
                }
            });
        }
    }
}

/// Ball/brick collisions: damage or destroy the brick, send the ball back
/// down, and report points through the event bus.
pub fn brick_system(world: &mut World) -> impl System {
    let balls = world.view(
        ViewDesc::new()
            .with::<Ball>()
            .with::<Position>()
            .with::<Extent>(),
    );
    let bricks = world.view(
        ViewDesc::new()
            .with::<Brick>()
            .with::<Position>()
            .with::<Extent>(),
    );
    move |world: &mut World| {
        let mut collisions: Vec<(Entity, Entity)> = Vec::new();
        for brick in world.view_iter(bricks) {
            let (Some(pos), Some(ext)) = (
                world.get::<Position>(brick),
                world.get::<Extent>(brick),
            ) else {
                continue;
            };
            let brick_rect = Rect::new(pos.0, ext.0);
            for ball in world.view_iter(balls) {
                let (Some(bp), Some(be)) = (
                    world.get::<Position>(ball),
                    world.get::<Extent>(ball),
                ) else {
                    continue;
                };
                if brick_rect.intersects(&Rect::new(bp.0, be.0)) {
                    collisions.push((brick, ball));
                    break;
                }
            }
        }
        let mut points = 0u32;
        for (brick, ball) in collisions {
            // Absolute set keeps a double hit in the same frame from
            // cancelling itself out.
            world.defer_update::<Velocity>(ball, |v| v.0.y = v.0.y.abs());
            let destroyed = world.get::<Brick>(brick).map_or(false, |b| b.hits <= 1);
            if destroyed {
                world.defer_despawn(brick);
                points += BRICK_POINTS;
            } else {
                world.defer_update::<Brick>(brick, |b| b.hits -= 1);
            }
        }
        if points > 0 {
            world.emit(SCORE, &points);
        }
    }
}

/// Despawns balls past the bottom edge, burns a life, and either serves a
/// fresh ball or lets the gameover handler end the session.
pub fn bottom_system(world: &mut World) -> impl System {
    let balls = world.view(ViewDesc::new().with::<Ball>().with::<Position>());
    move |world: &mut World| {
        let Some(height) = world.resource::<BreakoutState>().map(|s| s.config.height) else {
            return;
        };
        let lost: Vec<Entity> = world
            .view_iter(balls)
            .filter(|&e| world.get::<Position>(e).map_or(false, |p| p.0.y > height))
            .collect();
        for entity in lost {
            world.defer_despawn(entity);
            world.emit(BALL_LOST, &());
            let over = world.resource::<BreakoutState>().map_or(true, |s| s.over);
            if over {
                continue;
            }
            let Some(state) = world.resource_mut::<BreakoutState>() else {
                continue;
            };
            state.serve = Countdown::new(state.config.serve_delay);
            let config = state.config.clone();
            let angle = serve_angle(&mut state.rng);
            world.defer_spawn(move |w, e| seed_ball(w, e, &config, angle));
        }
    }
}

/// Render phase: the headless build draws to the log.
pub fn render_system(world: &mut World) -> impl System {
    let balls = world.view(ViewDesc::new().with::<Ball>());
    let bricks = world.view(ViewDesc::new().with::<Brick>());
    move |world: &mut World| {
        let Some(state) = world.resource::<BreakoutState>() else {
            return;
        };
        tracing::debug!(
            score = state.score,
            lives = state.lives,
            balls = world.view_len(balls),
            bricks = world.view_len(bricks),
            "breakout frame"
        );
    }
}

/// Logic systems in their fixed per-frame order, then the render phase.
pub fn schedule(world: &mut World, dt: f32) -> Schedule {
    let mut sched = Schedule::new();
    sched.add_logic(serve_system(world, dt));
    sched.add_logic(paddle_system(world, dt));
    sched.add_logic(motion_system(world, dt));
    sched.add_logic(wall_system(world));
    sched.add_logic(paddle_bounce_system(world));
    sched.add_logic(brick_system(world));
    sched.add_logic(bottom_system(world));
    sched.add_render(render_system(world));
    sched
}

/// A ready-to-run breakout session.
pub fn new_game(config: BreakoutConfig, seed: u64) -> GameLoop {
    let mut world = new_world(config, seed);
    let clock = FrameClock::default();
    let dt = clock.timestep();
    let sched = schedule(&mut world, dt);
    GameLoop::new(world, sched, clock)
}
