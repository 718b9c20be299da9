//! Incrementally-maintained entity views
//!
//! A view is a live subset of entities matching a component predicate
//! (required types present, excluded types absent). Views are registered once
//! and then kept current by notifications from the world as components come
//! and go; nothing is rescanned per frame. A reverse index from component
//! type to interested views keeps each notification proportional to the
//! number of views that actually care about that component.

use std::any::TypeId;
use std::collections::HashMap;

use crate::column::{Columns, Component};
use crate::entity::Entity;

/// Handle to a registered view. Generational like `Entity`: a slot freed by
/// `remove_view` can be reused, but ids from before the reuse stay stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ViewId {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

/// Predicate builder for view registration.
///
/// An entity qualifies iff it has every `with` component and none of the
/// `without` components.
#[derive(Debug, Default, Clone)]
pub struct ViewDesc {
    pub(crate) required: Vec<TypeId>,
    pub(crate) excluded: Vec<TypeId>,
}

impl ViewDesc {
    pub fn new() -> Self {
        Self::default()
    }

    /// Require the component `T` to be present.
    pub fn with<T: Component>(mut self) -> Self {
        let tid = TypeId::of::<T>();
        if !self.required.contains(&tid) {
            self.required.push(tid);
        }
        self
    }

    /// Require the component `T` to be absent.
    pub fn without<T: Component>(mut self) -> Self {
        let tid = TypeId::of::<T>();
        if !self.excluded.contains(&tid) {
            self.excluded.push(tid);
        }
        self
    }
}

/// Sparse-set of live members. Same layout trick as component columns:
/// dense array for iteration, sparse slot map for O(1) add/remove.
struct MemberSet {
    sparse: Vec<Option<usize>>,
    dense: Vec<Entity>,
}

impl MemberSet {
    fn new() -> Self {
        Self {
            sparse: Vec::new(),
            dense: Vec::new(),
        }
    }

    /// Idempotent add. Returns `true` if the entity was newly added.
    fn try_add(&mut self, entity: Entity) -> bool {
        let idx = entity.index as usize;
        if idx >= self.sparse.len() {
            self.sparse.resize(idx + 1, None);
        }
        if self.sparse[idx].is_some() {
            return false;
        }
        self.sparse[idx] = Some(self.dense.len());
        self.dense.push(entity);
        true
    }

    /// Idempotent remove by entity slot index.
    fn remove(&mut self, index: u32) -> bool {
        let idx = index as usize;
        let Some(&Some(dense_idx)) = self.sparse.get(idx) else {
            return false;
        };
        self.sparse[idx] = None;
        let last = self.dense.len() - 1;
        if dense_idx != last {
            self.dense.swap(dense_idx, last);
            let moved = self.dense[dense_idx];
            self.sparse[moved.index as usize] = Some(dense_idx);
        }
        self.dense.pop();
        true
    }

    fn contains(&self, index: u32) -> bool {
        self.sparse
            .get(index as usize)
            .map_or(false, |s| s.is_some())
    }
}

struct ViewState {
    required: Vec<TypeId>,
    excluded: Vec<TypeId>,
    members: MemberSet,
}

impl ViewState {
    fn matches(&self, columns: &Columns, index: u32) -> bool {
        self.required.iter().all(|tid| columns.has_id(*tid, index))
            && !self.excluded.iter().any(|tid| columns.has_id(*tid, index))
    }
}

/// All registered views plus the reverse interest index.
pub(crate) struct ViewRegistry {
    views: Vec<Option<ViewState>>,
    /// Per-slot generation, bumped on removal so stale ids miss.
    generations: Vec<u32>,
    free_list: Vec<u32>,
    /// Component type -> views whose predicate mentions it.
    interest: HashMap<TypeId, Vec<u32>>,
    /// Views with no required components; these are the only views a bare
    /// (component-less) spawn can match.
    open: Vec<u32>,
}

impl ViewRegistry {
    pub fn new() -> Self {
        Self {
            views: Vec::new(),
            generations: Vec::new(),
            free_list: Vec::new(),
            interest: HashMap::new(),
            open: Vec::new(),
        }
    }

    fn state(&self, id: ViewId) -> Option<&ViewState> {
        let slot = id.index as usize;
        if *self.generations.get(slot)? != id.generation {
            return None;
        }
        self.views.get(slot)?.as_ref()
    }

    /// Register a view and back-fill it with one scan over the live entities.
    /// Subsequent maintenance is incremental.
    pub fn register(
        &mut self,
        desc: ViewDesc,
        columns: &Columns,
        live: impl Iterator<Item = Entity>,
    ) -> ViewId {
        let slot = match self.free_list.pop() {
            Some(slot) => slot,
            None => {
                self.views.push(None);
                self.generations.push(0);
                (self.views.len() - 1) as u32
            }
        };
        let mut state = ViewState {
            required: desc.required,
            excluded: desc.excluded,
            members: MemberSet::new(),
        };
        for entity in live {
            if state.matches(columns, entity.index) {
                state.members.try_add(entity);
            }
        }
        for tid in state.required.iter().chain(state.excluded.iter()) {
            self.interest.entry(*tid).or_default().push(slot);
        }
        if state.required.is_empty() {
            self.open.push(slot);
        }
        self.views[slot as usize] = Some(state);
        ViewId {
            index: slot,
            generation: self.generations[slot as usize],
        }
    }

    /// Unregister a view. Unlinking is O(number of components the predicate
    /// mentions). Stale ids are a no-op; the slot's generation is bumped so
    /// they stay stale across reuse.
    pub fn remove_view(&mut self, id: ViewId) -> bool {
        let slot = id.index as usize;
        if self.generations.get(slot) != Some(&id.generation) {
            return false;
        }
        let Some(state) = self.views.get_mut(slot).and_then(Option::take) else {
            return false;
        };
        for tid in state.required.iter().chain(state.excluded.iter()) {
            if let Some(list) = self.interest.get_mut(tid) {
                list.retain(|s| *s != id.index);
            }
        }
        self.open.retain(|s| *s != id.index);
        self.generations[slot] += 1;
        self.free_list.push(id.index);
        true
    }

    /// A component appeared on an entity: interested views re-evaluate.
    pub fn component_added(&mut self, type_id: TypeId, entity: Entity, columns: &Columns) {
        let Some(slots) = self.interest.get(&type_id) else {
            return;
        };
        for slot in slots {
            if let Some(state) = self.views[*slot as usize].as_mut() {
                if state.excluded.contains(&type_id) {
                    state.members.remove(entity.index);
                } else if state.matches(columns, entity.index) {
                    state.members.try_add(entity);
                }
            }
        }
    }

    /// A component disappeared from an entity: interested views re-evaluate.
    pub fn component_removed(&mut self, type_id: TypeId, entity: Entity, columns: &Columns) {
        let Some(slots) = self.interest.get(&type_id) else {
            return;
        };
        for slot in slots {
            if let Some(state) = self.views[*slot as usize].as_mut() {
                if state.excluded.contains(&type_id) {
                    if state.matches(columns, entity.index) {
                        state.members.try_add(entity);
                    }
                } else {
                    state.members.remove(entity.index);
                }
            }
        }
    }

    /// A bare entity was spawned; only views without required components can
    /// match it.
    pub fn entity_spawned(&mut self, entity: Entity, columns: &Columns) {
        for slot in &self.open {
            if let Some(state) = self.views[*slot as usize].as_mut() {
                if state.matches(columns, entity.index) {
                    state.members.try_add(entity);
                }
            }
        }
    }

    /// An entity was despawned; drop it from every view.
    pub fn entity_despawned(&mut self, index: u32) {
        for state in self.views.iter_mut().flatten() {
            state.members.remove(index);
        }
    }

    /// Live members of a view, in internal (stable-until-mutation) order.
    pub fn members(&self, id: ViewId) -> &[Entity] {
        self.state(id).map_or(&[], |state| &state.members.dense)
    }

    pub fn contains(&self, id: ViewId, entity: Entity) -> bool {
        self.state(id)
            .map_or(false, |state| state.members.contains(entity.index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ent(index: u32) -> Entity {
        Entity::from_raw(index, 0)
    }

    #[test]
    fn member_set_idempotent() {
        let mut set = MemberSet::new();
        assert!(set.try_add(ent(3)));
        assert!(!set.try_add(ent(3)));
        assert_eq!(set.dense.len(), 1);
        assert!(set.remove(3));
        assert!(!set.remove(3));
        assert!(set.dense.is_empty());
    }

    #[test]
    fn member_set_swap_remove_keeps_index() {
        let mut set = MemberSet::new();
        set.try_add(ent(0));
        set.try_add(ent(1));
        set.try_add(ent(2));
        set.remove(0);
        assert!(set.contains(1));
        assert!(set.contains(2));
        assert_eq!(set.dense.len(), 2);
    }

    #[test]
    fn backfill_on_register() {
        let mut columns = Columns::new();
        columns.column_mut::<i32>().insert(0, 1);
        columns.column_mut::<i32>().insert(1, 2);
        columns.column_mut::<bool>().insert(1, true);

        let mut registry = ViewRegistry::new();
        let live = vec![ent(0), ent(1)];
        let with_int = registry.register(
            ViewDesc::new().with::<i32>(),
            &columns,
            live.iter().copied(),
        );
        let int_no_flag = registry.register(
            ViewDesc::new().with::<i32>().without::<bool>(),
            &columns,
            live.iter().copied(),
        );
        assert_eq!(registry.members(with_int).len(), 2);
        assert_eq!(registry.members(int_no_flag), &[ent(0)]);
    }

    #[test]
    fn excluded_component_toggles_membership() {
        let mut columns = Columns::new();
        let mut registry = ViewRegistry::new();
        let view = registry.register(
            ViewDesc::new().with::<i32>().without::<bool>(),
            &columns,
            std::iter::empty(),
        );

        columns.column_mut::<i32>().insert(0, 5);
        registry.component_added(TypeId::of::<i32>(), ent(0), &columns);
        assert!(registry.contains(view, ent(0)));

        columns.column_mut::<bool>().insert(0, true);
        registry.component_added(TypeId::of::<bool>(), ent(0), &columns);
        assert!(!registry.contains(view, ent(0)));

        columns.remove_id(TypeId::of::<bool>(), 0);
        registry.component_removed(TypeId::of::<bool>(), ent(0), &columns);
        assert!(registry.contains(view, ent(0)));
    }

    #[test]
    fn remove_view_unlinks_interest() {
        let mut columns = Columns::new();
        let mut registry = ViewRegistry::new();
        let view = registry.register(
            ViewDesc::new().with::<i32>(),
            &columns,
            std::iter::empty(),
        );
        assert!(registry.remove_view(view));
        assert!(!registry.remove_view(view));

        // Notifications after removal must not touch the freed slot.
        columns.column_mut::<i32>().insert(0, 1);
        registry.component_added(TypeId::of::<i32>(), ent(0), &columns);
        assert!(registry.members(view).is_empty());
    }

    #[test]
    fn freed_slot_is_reused() {
        let mut registry = ViewRegistry::new();
        let columns = Columns::new();
        let a = registry.register(ViewDesc::new().with::<i32>(), &columns, std::iter::empty());
        registry.remove_view(a);
        let b = registry.register(ViewDesc::new().with::<bool>(), &columns, std::iter::empty());
        assert_eq!(a.index, b.index);
        assert_ne!(a, b);
        assert_eq!(registry.views.len(), 1);
    }

    #[test]
    fn stale_id_does_not_alias_reused_slot() {
        let mut columns = Columns::new();
        let mut registry = ViewRegistry::new();
        let a = registry.register(ViewDesc::new().with::<i32>(), &columns, std::iter::empty());
        registry.remove_view(a);
        let b = registry.register(ViewDesc::new().with::<bool>(), &columns, std::iter::empty());

        columns.column_mut::<bool>().insert(0, true);
        registry.component_added(TypeId::of::<bool>(), ent(0), &columns);
        assert!(registry.contains(b, ent(0)));

        // The old id lands on the same slot but an older generation.
        assert!(registry.members(a).is_empty());
        assert!(!registry.contains(a, ent(0)));
        assert!(!registry.remove_view(a));
        assert_eq!(registry.members(b).len(), 1);
    }
}
