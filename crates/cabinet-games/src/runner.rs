//! Frame-loop driver
//!
//! Owns a world and its schedule and converts wall-clock deltas into fixed
//! logic frames. Each frame is one `Schedule::tick`: logic systems in
//! declared order, exactly one sync, then render systems over the synced
//! state.

use cabinet_core::FrameClock;
use cabinet_ecs::{Schedule, World};

pub struct GameLoop {
    world: World,
    schedule: Schedule,
    clock: FrameClock,
}

impl GameLoop {
    pub fn new(world: World, schedule: Schedule, clock: FrameClock) -> Self {
        Self {
            world,
            schedule,
            clock,
        }
    }

    /// Feed a wall-clock delta; runs as many fixed frames as it covers and
    /// returns how many ran.
    pub fn advance(&mut self, delta: f32) -> u32 {
        let frames = self.clock.advance(delta);
        for _ in 0..frames {
            self.schedule.tick(&mut self.world);
        }
        frames
    }

    /// Run exactly one fixed frame, ignoring the clock. Useful for tests and
    /// scripted demos.
    pub fn step(&mut self) {
        self.schedule.tick(&mut self.world);
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn clock(&self) -> &FrameClock {
        &self.clock
    }
}
