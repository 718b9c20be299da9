//! Snake
//!
//! Grid-based snake on the shared ECS. The snake body is one entity per
//! segment, ordered from the head; every move is a deferred spawn of a new
//! head plus a deferred trim of the tail, so the whole body update lands
//! atomically at the frame's sync point.

use cabinet_core::FrameClock;
use cabinet_ecs::{Entity, EventError, Schedule, System, ViewDesc, World};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::runner::GameLoop;

/// Event emitted with a `u32` payload when food is eaten.
pub const SCORE: &str = "score";
/// Event emitted on wall or self collision.
pub const GAME_OVER: &str = "gameover";

const FOOD_POINTS: u32 = 10;

// ---- Components ----

/// Grid position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell {
    pub x: i32,
    pub y: i32,
}

impl Cell {
    fn step(self, dir: Dir) -> Cell {
        let (dx, dy) = dir.delta();
        Cell {
            x: self.x + dx,
            y: self.y + dy,
        }
    }
}

/// Body segment, ordered from the head (`order == 0`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub order: u32,
}

#[derive(Debug, Clone, Copy)]
pub struct Food;

// ---- Config & resource ----

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Dir {
    Up,
    Down,
    Left,
    Right,
}

impl Dir {
    pub fn opposite(self) -> Dir {
        match self {
            Dir::Up => Dir::Down,
            Dir::Down => Dir::Up,
            Dir::Left => Dir::Right,
            Dir::Right => Dir::Left,
        }
    }

    fn delta(self) -> (i32, i32) {
        match self {
            Dir::Up => (0, -1),
            Dir::Down => (0, 1),
            Dir::Left => (-1, 0),
            Dir::Right => (1, 0),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnakeConfig {
    pub cols: i32,
    pub rows: i32,
    /// Seconds between moves
    pub step: f32,
    pub start_len: u32,
}

impl Default for SnakeConfig {
    fn default() -> Self {
        Self {
            cols: 24,
            rows: 18,
            step: 0.12,
            start_len: 3,
        }
    }
}

/// Global game state. Directly mutable, never deferred.
pub struct SnakeState {
    pub config: SnakeConfig,
    pub score: u32,
    /// Direction applied on the next move.
    pub pending_dir: Dir,
    pub dir: Dir,
    pub len: u32,
    pub head: Cell,
    pub over: bool,
    accumulator: f32,
    rng: StdRng,
}

impl SnakeState {
    pub fn new(config: SnakeConfig, seed: u64) -> Self {
        let head = Cell {
            x: config.cols / 2,
            y: config.rows / 2,
        };
        Self {
            score: 0,
            pending_dir: Dir::Right,
            dir: Dir::Right,
            len: config.start_len,
            head,
            over: false,
            accumulator: 0.0,
            rng: StdRng::seed_from_u64(seed),
            config,
        }
    }
}

fn random_free_cell(rng: &mut StdRng, config: &SnakeConfig, occupied: &[Cell]) -> Cell {
    for _ in 0..1000 {
        let cell = Cell {
            x: rng.gen_range(0..config.cols),
            y: rng.gen_range(0..config.rows),
        };
        if !occupied.contains(&cell) {
            return cell;
        }
    }
    // Board effectively full; anywhere will do.
    Cell {
        x: rng.gen_range(0..config.cols),
        y: rng.gen_range(0..config.rows),
    }
}

/// Build a fresh snake world: body segments, one food pellet, resource, and
/// the score/gameover handlers.
pub fn new_world(config: SnakeConfig, seed: u64) -> World {
    let mut world = World::new();
    let mut state = SnakeState::new(config.clone(), seed);

    let mut occupied = Vec::new();
    for order in 0..config.start_len {
        let cell = Cell {
            x: state.head.x - order as i32,
            y: state.head.y,
        };
        occupied.push(cell);
        world.spawn_with(|w, e| {
            w.insert(e, cell);
            w.insert(e, Segment { order });
        });
    }

    let food_cell = random_free_cell(&mut state.rng, &config, &occupied);
    world.spawn_with(|w, e| {
        w.insert(e, food_cell);
        w.insert(e, Food);
    });
    world.insert_resource(state);

    world.on(SCORE, |w, payload| {
        let points = payload
            .downcast_ref::<u32>()
            .copied()
            .ok_or_else(|| EventError::new("score payload must be u32"))?;
        if let Some(state) = w.resource_mut::<SnakeState>() {
            state.score += points;
        }
        Ok(())
    });
    world.on(GAME_OVER, |_, _| {
        tracing::info!(game = "snake", "game over");
        Ok(())
    });

    world
}

// ---- Systems ----

/// Applies the buffered steering input, rejecting direct reversals.
pub fn steer_system(_world: &mut World) -> impl System {
    move |world: &mut World| {
        if let Some(state) = world.resource_mut::<SnakeState>() {
            if state.pending_dir != state.dir.opposite() {
                state.dir = state.pending_dir;
            }
        }
    }
}

/// Advances the snake one cell per elapsed step interval: collision checks
/// against the pre-move body, then a deferred head spawn and tail trim.
/// At most one move per frame so every move reads a fully synced body.
pub fn advance_system(world: &mut World, dt: f32) -> impl System {
    let segments_view = world.view(ViewDesc::new().with::<Segment>().with::<Cell>());
    let foods_view = world.view(ViewDesc::new().with::<Food>().with::<Cell>().without::<Segment>());
    move |world: &mut World| {
        let ready = {
            let Some(state) = world.resource_mut::<SnakeState>() else {
                return;
            };
            if state.over {
                return;
            }
            state.accumulator += dt;
            if state.accumulator >= state.config.step {
                state.accumulator -= state.config.step;
                true
            } else {
                false
            }
        };
        if !ready {
            return;
        }

        let (dir, head, old_len, config) = {
            let Some(state) = world.resource::<SnakeState>() else {
                return;
            };
            (state.dir, state.head, state.len, state.config.clone())
        };
        let new_head = head.step(dir);

        // Snapshot of the pre-move body.
        let segments: Vec<(Entity, u32, Cell)> = world
            .view_iter(segments_view)
            .filter_map(|e| {
                Some((e, world.get::<Segment>(e)?.order, *world.get::<Cell>(e)?))
            })
            .collect();

        let eaten = world
            .view_iter(foods_view)
            .find(|&f| world.get::<Cell>(f) == Some(&new_head));
        let len = if eaten.is_some() { old_len + 1 } else { old_len };

        let hit_wall = new_head.x < 0
            || new_head.y < 0
            || new_head.x >= config.cols
            || new_head.y >= config.rows;
        // The tail cell is vacated by this same move, so stepping onto it is
        // legal unless the snake is growing (then no segment is excluded,
        // because len already accounts for the growth).
        let hit_self = segments
            .iter()
            .any(|&(_, order, cell)| cell == new_head && order != len - 1);

        if hit_wall || hit_self {
            if let Some(state) = world.resource_mut::<SnakeState>() {
                state.over = true;
            }
            world.emit(GAME_OVER, &());
            return;
        }

        for &(entity, order, _) in &segments {
            world.defer_update::<Segment>(entity, |s| s.order += 1);
            if order + 1 >= len {
                world.defer_despawn(entity);
            }
        }
        world.defer_spawn(move |w, e| {
            w.insert(e, new_head);
            w.insert(e, Segment { order: 0 });
        });

        if let Some(food) = eaten {
            let occupied: Vec<Cell> = segments
                .iter()
                .map(|&(_, _, cell)| cell)
                .chain([new_head])
                .collect();
            let relocated = {
                let Some(state) = world.resource_mut::<SnakeState>() else {
                    return;
                };
                random_free_cell(&mut state.rng, &config, &occupied)
            };
            world.defer_update::<Cell>(food, move |c| *c = relocated);
            world.emit(SCORE, &FOOD_POINTS);
        }

        if let Some(state) = world.resource_mut::<SnakeState>() {
            state.head = new_head;
            state.len = len;
        }
    }
}

/// Render phase: the headless build draws to the log.
pub fn render_system(world: &mut World) -> impl System {
    let segments_view = world.view(ViewDesc::new().with::<Segment>());
    move |world: &mut World| {
        let Some(state) = world.resource::<SnakeState>() else {
            return;
        };
        tracing::debug!(
            score = state.score,
            len = world.view_len(segments_view),
            head_x = state.head.x,
            head_y = state.head.y,
            "snake frame"
        );
    }
}

/// Logic systems in their fixed per-frame order, then the render phase.
pub fn schedule(world: &mut World, dt: f32) -> Schedule {
    let mut sched = Schedule::new();
    sched.add_logic(steer_system(world));
    sched.add_logic(advance_system(world, dt));
    sched.add_render(render_system(world));
    sched
}

/// A ready-to-run snake session.
pub fn new_game(config: SnakeConfig, seed: u64) -> GameLoop {
    let mut world = new_world(config, seed);
    let clock = FrameClock::default();
    let dt = clock.timestep();
    let sched = schedule(&mut world, dt);
    GameLoop::new(world, sched, clock)
}
