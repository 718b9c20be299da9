use std::fmt;

/// A generational entity handle: compact u32 slot index plus a generation
/// counter so a recycled slot never aliases a stale handle.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Entity {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

impl Entity {
    /// Create an entity from raw parts (mainly for testing).
    pub fn from_raw(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    /// The slot index of this entity.
    pub fn index(&self) -> u32 {
        self.index
    }

    /// The generation of this entity (incremented on slot reuse).
    pub fn generation(&self) -> u32 {
        self.generation
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Entity({}v{})", self.index, self.generation)
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index, self.generation)
    }
}

/// Allocates and recycles entity slots with generational tracking.
pub(crate) struct EntityAllocator {
    generations: Vec<u32>,
    alive: Vec<bool>,
    free_list: Vec<u32>,
    len: usize,
}

impl EntityAllocator {
    pub fn new() -> Self {
        Self {
            generations: Vec::new(),
            alive: Vec::new(),
            free_list: Vec::new(),
            len: 0,
        }
    }

    /// Allocate a new entity, reusing a freed slot if available.
    pub fn allocate(&mut self) -> Entity {
        self.len += 1;
        if let Some(index) = self.free_list.pop() {
            self.alive[index as usize] = true;
            Entity {
                index,
                generation: self.generations[index as usize],
            }
        } else {
            let index = self.generations.len() as u32;
            self.generations.push(0);
            self.alive.push(true);
            Entity {
                index,
                generation: 0,
            }
        }
    }

    /// Deallocate an entity. Returns `false` for stale or double frees.
    pub fn deallocate(&mut self, entity: Entity) -> bool {
        let idx = entity.index as usize;
        if idx >= self.alive.len() {
            return false;
        }
        if !self.alive[idx] || self.generations[idx] != entity.generation {
            return false;
        }
        self.alive[idx] = false;
        self.generations[idx] += 1;
        self.free_list.push(entity.index);
        self.len -= 1;
        true
    }

    /// Check if an entity handle is currently alive.
    pub fn is_alive(&self, entity: Entity) -> bool {
        let idx = entity.index as usize;
        idx < self.alive.len() && self.alive[idx] && self.generations[idx] == entity.generation
    }

    /// The live handle occupying a raw slot index, if any.
    pub fn handle_at(&self, index: u32) -> Option<Entity> {
        let idx = index as usize;
        if idx < self.alive.len() && self.alive[idx] {
            Some(Entity {
                index,
                generation: self.generations[idx],
            })
        } else {
            None
        }
    }

    /// Iterate over every live entity handle.
    pub fn iter(&self) -> impl Iterator<Item = Entity> + '_ {
        self.alive
            .iter()
            .enumerate()
            .filter(|(_, alive)| **alive)
            .map(|(idx, _)| Entity {
                index: idx as u32,
                generation: self.generations[idx],
            })
    }

    /// Number of currently alive entities.
    pub fn len(&self) -> usize {
        self.len
    }
}
