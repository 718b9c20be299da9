//! Systems and the two-phase frame schedule
//!
//! A system is a per-frame callable built once per world. The usual shape is
//! a builder function that registers its views against the world up front and
//! returns a closure capturing the `ViewId`s, so registration cost is paid
//! once and the per-frame call is cheap.

use crate::world::World;

/// A system that operates on the world each frame.
pub trait System {
    fn run(&mut self, world: &mut World);
}

/// Blanket implementation so closures can be used as systems.
impl<F: FnMut(&mut World)> System for F {
    fn run(&mut self, world: &mut World) {
        (self)(world);
    }
}

/// Fixed-order frame schedule with a logic phase and a render phase.
///
/// `tick` runs logic systems in registration order, synchronizes the world
/// exactly once, then runs render systems. Render systems therefore always
/// observe a fully-synced, self-consistent world, and logic systems only see
/// state as of the previous sync.
pub struct Schedule {
    logic: Vec<Box<dyn System>>,
    render: Vec<Box<dyn System>>,
}

impl Schedule {
    pub fn new() -> Self {
        Self {
            logic: Vec::new(),
            render: Vec::new(),
        }
    }

    /// Append a logic system. Runs before the sync point.
    pub fn add_logic<S: System + 'static>(&mut self, system: S) -> &mut Self {
        self.logic.push(Box::new(system));
        self
    }

    /// Append a render system. Runs after the sync point.
    pub fn add_render<S: System + 'static>(&mut self, system: S) -> &mut Self {
        self.render.push(Box::new(system));
        self
    }

    /// Run one frame: logic phase, one `sync()`, render phase.
    pub fn tick(&mut self, world: &mut World) {
        for system in &mut self.logic {
            system.run(world);
        }
        world.sync();
        for system in &mut self.render {
            system.run(world);
        }
    }

    pub fn logic_len(&self) -> usize {
        self.logic.len()
    }

    pub fn render_len(&self) -> usize {
        self.render.len()
    }
}

impl Default for Schedule {
    fn default() -> Self {
        Self::new()
    }
}
