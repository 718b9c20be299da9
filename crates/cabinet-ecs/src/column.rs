//! Typed component storage
//!
//! Each component type gets its own sparse-set column; the world keys columns
//! by `TypeId`. This is the typed replacement for the open-ended per-entity
//! records of the original games: the component schema is the set of Rust
//! types a game defines, and "has component X" is a column membership test.

use std::any::{Any, TypeId};
use std::collections::HashMap;

/// Marker trait for types that can be stored as components.
pub trait Component: 'static {}

/// Blanket implementation: any `'static` type is a valid component. The world
/// is single-threaded by contract, so no `Send`/`Sync` bound is required.
impl<T: 'static> Component for T {}

/// Type-erased column interface, used for despawn sweeps and predicate checks.
pub(crate) trait AnyColumn: Any {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn remove(&mut self, index: u32) -> bool;
    fn has(&self, index: u32) -> bool;
}

/// Sparse-set storage for a single component type: O(1) insert/remove/lookup,
/// dense value array for iteration-friendly layout.
pub(crate) struct Column<T> {
    /// Maps entity slot index to dense index; `None` means no component.
    sparse: Vec<Option<usize>>,
    /// Packed component values.
    dense: Vec<T>,
    /// Entity slot index backing each dense slot.
    entities: Vec<u32>,
}

impl<T: Component> Column<T> {
    pub fn new() -> Self {
        Self {
            sparse: Vec::new(),
            dense: Vec::new(),
            entities: Vec::new(),
        }
    }

    /// Insert or replace the component for an entity slot. Returns `true`
    /// when the slot did not previously hold a value (membership change).
    pub fn insert(&mut self, index: u32, value: T) -> bool {
        let idx = index as usize;
        if idx >= self.sparse.len() {
            self.sparse.resize(idx + 1, None);
        }
        if let Some(dense_idx) = self.sparse[idx] {
            self.dense[dense_idx] = value;
            false
        } else {
            let dense_idx = self.dense.len();
            self.sparse[idx] = Some(dense_idx);
            self.dense.push(value);
            self.entities.push(index);
            true
        }
    }

    pub fn get(&self, index: u32) -> Option<&T> {
        let idx = index as usize;
        self.sparse
            .get(idx)
            .and_then(|s| s.map(|dense_idx| &self.dense[dense_idx]))
    }

    pub fn get_mut(&mut self, index: u32) -> Option<&mut T> {
        let idx = index as usize;
        self.sparse
            .get(idx)
            .and_then(|s| s.map(|dense_idx| &mut self.dense[dense_idx]))
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.dense.len()
    }
}

impl<T: Component> AnyColumn for Column<T> {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn remove(&mut self, index: u32) -> bool {
        let idx = index as usize;
        if idx >= self.sparse.len() {
            return false;
        }
        let Some(dense_idx) = self.sparse[idx] else {
            return false;
        };
        self.sparse[idx] = None;

        let last = self.dense.len() - 1;
        if dense_idx != last {
            // Swap-remove: move the last element into the vacated slot.
            self.dense.swap(dense_idx, last);
            self.entities.swap(dense_idx, last);
            let moved_entity = self.entities[dense_idx];
            self.sparse[moved_entity as usize] = Some(dense_idx);
        }
        self.dense.pop();
        self.entities.pop();
        true
    }

    fn has(&self, index: u32) -> bool {
        let idx = index as usize;
        idx < self.sparse.len() && self.sparse[idx].is_some()
    }
}

/// The full set of columns for a world, keyed by component `TypeId`.
pub(crate) struct Columns {
    map: HashMap<TypeId, Box<dyn AnyColumn>>,
}

impl Columns {
    pub fn new() -> Self {
        Self {
            map: HashMap::new(),
        }
    }

    pub fn column_mut<T: Component>(&mut self) -> &mut Column<T> {
        self.map
            .entry(TypeId::of::<T>())
            .or_insert_with(|| Box::new(Column::<T>::new()))
            .as_any_mut()
            .downcast_mut::<Column<T>>()
            .expect("component column type mismatch")
    }

    pub fn column<T: Component>(&self) -> Option<&Column<T>> {
        self.map
            .get(&TypeId::of::<T>())
            .and_then(|c| c.as_any().downcast_ref::<Column<T>>())
    }

    /// Membership test by type tag, used for view predicate evaluation.
    pub fn has_id(&self, type_id: TypeId, index: u32) -> bool {
        self.map.get(&type_id).map_or(false, |c| c.has(index))
    }

    /// Remove one component by type tag. Returns `true` if it was present.
    pub fn remove_id(&mut self, type_id: TypeId, index: u32) -> bool {
        self.map.get_mut(&type_id).map_or(false, |c| c.remove(index))
    }

    /// Strip every component from an entity slot (despawn sweep).
    pub fn remove_all(&mut self, index: u32) {
        for column in self.map.values_mut() {
            column.remove(index);
        }
    }
}
