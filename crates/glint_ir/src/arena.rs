//! Append-only storage for the entities a shader refers to by id.
//!
//! Variables, functions, and signatures live in one [`Arena`] each. The tree
//! itself only holds ids, so a dereference is an integer the cache can write
//! as-is and resolve again after loading.

use std::fmt;
use std::marker::PhantomData;
use std::ops::{Index, IndexMut};

/// An id newtype usable as an arena key.
pub trait ArenaId: Copy {
    /// Wraps a slot number.
    fn from_raw(index: u32) -> Self;

    /// The slot number.
    fn as_raw(self) -> u32;
}

/// Entities of one kind, keyed by `I`.
///
/// Nothing is ever removed, so an id stays valid for the arena's lifetime.
/// Indexing with an id from another arena panics; decoders use
/// [`Arena::try_get`] instead.
#[derive(Clone)]
pub struct Arena<I: ArenaId, T> {
    slots: Vec<T>,
    _id: PhantomData<I>,
}

impl<I: ArenaId, T> Default for Arena<I, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I: ArenaId, T: fmt::Debug> fmt::Debug for Arena<I, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.slots.iter().enumerate())
            .finish()
    }
}

impl<I: ArenaId, T> Arena<I, T> {
    /// An empty arena.
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            _id: PhantomData,
        }
    }

    /// Stores `item` in the next slot.
    pub fn alloc(&mut self, item: T) -> I {
        let id = I::from_raw(self.slots.len() as u32);
        self.slots.push(item);
        id
    }

    /// The entity behind `id`, if `id` names a slot of this arena.
    pub fn try_get(&self, id: I) -> Option<&T> {
        self.slots.get(id.as_raw() as usize)
    }

    /// Returns `true` if `id` names a slot of this arena.
    pub fn contains(&self, id: I) -> bool {
        self.try_get(id).is_some()
    }

    /// Number of entities.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns `true` if nothing has been allocated.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// `(id, entity)` pairs in allocation order.
    pub fn iter(&self) -> impl Iterator<Item = (I, &T)> {
        (0u32..)
            .zip(&self.slots)
            .map(|(raw, item)| (I::from_raw(raw), item))
    }
}

impl<I: ArenaId, T> Index<I> for Arena<I, T> {
    type Output = T;

    fn index(&self, id: I) -> &T {
        &self.slots[id.as_raw() as usize]
    }
}

impl<I: ArenaId, T> IndexMut<I> for Arena<I, T> {
    fn index_mut(&mut self, id: I) -> &mut T {
        &mut self.slots[id.as_raw() as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::{FunctionId, VariableId};

    #[test]
    fn ids_follow_allocation_order() {
        let mut arena: Arena<FunctionId, &str> = Arena::new();
        let main = arena.alloc("main");
        let helper = arena.alloc("helper");
        assert_eq!((main.as_raw(), helper.as_raw()), (0, 1));
        assert_eq!(arena[helper], "helper");
        let names: Vec<_> = arena.iter().map(|(_, name)| *name).collect();
        assert_eq!(names, ["main", "helper"]);
    }

    #[test]
    fn index_mut_updates_in_place() {
        let mut arena: Arena<VariableId, String> = Arena::new();
        let id = arena.alloc("color".to_string());
        arena[id].push_str("_out");
        assert_eq!(arena[id], "color_out");
    }

    #[test]
    fn foreign_ids_are_not_contained() {
        let mut arena: Arena<VariableId, u8> = Arena::default();
        assert!(arena.is_empty());
        let id = arena.alloc(1);
        assert_eq!(arena.try_get(id), Some(&1));
        assert_eq!(arena.try_get(VariableId::from_raw(7)), None);
        assert!(!arena.contains(VariableId::from_raw(1)));
        assert_eq!(arena.len(), 1);
    }
}
