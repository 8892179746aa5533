//! Node allocator implementations.

use super::{NodeId, SyntaxNode, SyntaxNodeAllocator, SyntaxNodeData};
use std::collections::HashSet;

enum Slot<'src> {
    Occupied(SyntaxNode<'src>),
    Vacant,
}

/// The default arena backed allocator. Keeps an allocation count and expects the count to
/// return to zero before teardown; a tree that is still alive when the arena drops is a
/// leak in the caller.
pub struct HostArena<'src> {
    slots: Vec<Slot<'src>>,
    free: Vec<u32>,
    live: u32,
}

impl<'src> HostArena<'src> {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            live: 0,
        }
    }
}

impl<'src> Default for HostArena<'src> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'src> SyntaxNodeAllocator<'src> for HostArena<'src> {
    fn create(&mut self, data: SyntaxNodeData<'src>) -> NodeId {
        self.live += 1;
        let node = SyntaxNode::new(data);
        match self.free.pop() {
            Some(index) => {
                self.slots[index as usize] = Slot::Occupied(node);
                NodeId(index)
            }
            None => {
                self.slots.push(Slot::Occupied(node));
                NodeId((self.slots.len() - 1) as u32)
            }
        }
    }

    fn destroy(&mut self, id: NodeId) {
        let slot = &mut self.slots[id.0 as usize];
        debug_assert!(
            matches!(slot, Slot::Occupied(_)),
            "node {:?} destroyed twice",
            id
        );
        *slot = Slot::Vacant;
        self.free.push(id.0);
        self.live -= 1;
    }

    fn node(&self, id: NodeId) -> &SyntaxNode<'src> {
        match &self.slots[id.0 as usize] {
            Slot::Occupied(node) => node,
            Slot::Vacant => panic!("stale node handle {:?}", id),
        }
    }

    fn node_mut(&mut self, id: NodeId) -> &mut SyntaxNode<'src> {
        match &mut self.slots[id.0 as usize] {
            Slot::Occupied(node) => node,
            Slot::Vacant => panic!("stale node handle {:?}", id),
        }
    }

    fn live_count(&self) -> u32 {
        self.live
    }
}

impl Drop for HostArena<'_> {
    fn drop(&mut self) {
        debug_assert!(
            self.live == 0 || std::thread::panicking(),
            "{} nodes leaked at arena teardown",
            self.live
        );
    }
}

/// An allocator that records every live node it created and releases the whole batch at
/// teardown. Used by the script container, which owns its tree for its entire lifetime.
pub struct TrackingArena<'src, A: SyntaxNodeAllocator<'src>> {
    parent: A,
    tracked: HashSet<NodeId>,
    _marker: std::marker::PhantomData<&'src ()>,
}

impl<'src, A: SyntaxNodeAllocator<'src>> TrackingArena<'src, A> {
    pub fn new(parent: A) -> Self {
        Self {
            parent,
            tracked: HashSet::new(),
            _marker: std::marker::PhantomData,
        }
    }
}

impl<'src, A: SyntaxNodeAllocator<'src>> SyntaxNodeAllocator<'src> for TrackingArena<'src, A> {
    fn create(&mut self, data: SyntaxNodeData<'src>) -> NodeId {
        let id = self.parent.create(data);
        self.tracked.insert(id);
        id
    }

    fn destroy(&mut self, id: NodeId) {
        self.tracked.remove(&id);
        self.parent.destroy(id);
    }

    fn node(&self, id: NodeId) -> &SyntaxNode<'src> {
        self.parent.node(id)
    }

    fn node_mut(&mut self, id: NodeId) -> &mut SyntaxNode<'src> {
        self.parent.node_mut(id)
    }

    fn live_count(&self) -> u32 {
        self.parent.live_count()
    }
}

impl<'src, A: SyntaxNodeAllocator<'src>> Drop for TrackingArena<'src, A> {
    fn drop(&mut self) {
        for id in self.tracked.drain() {
            self.parent.destroy(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::{append_child, destroy_subtree, SyntaxEntity};

    #[test]
    fn create_initializes_links_and_entity() {
        let mut arena = HostArena::new();
        let id = arena.create(SyntaxNodeData::empty(SyntaxEntity::DefFunction));
        let node = arena.node(id);
        assert_eq!(node.entity(), SyntaxEntity::DefFunction);
        assert!(node.child.is_none());
        assert!(node.sibling.is_none());
        assert!(node.annotation.is_none());
        arena.destroy(id);
    }

    #[test]
    fn allocations_round_trip_to_zero() {
        let mut arena = HostArena::new();
        let root = arena.create(SyntaxNodeData::Root);
        let a = arena.create(SyntaxNodeData::empty(SyntaxEntity::DefVariable));
        let b = arena.create(SyntaxNodeData::empty(SyntaxEntity::ExpExpression));
        append_child(&mut arena, root, a);
        append_child(&mut arena, root, b);
        assert_eq!(arena.live_count(), 3);

        destroy_subtree(&mut arena, root);
        assert_eq!(arena.live_count(), 0);
    }

    #[test]
    fn vacant_slots_are_reused() {
        let mut arena = HostArena::new();
        let a = arena.create(SyntaxNodeData::Root);
        arena.destroy(a);
        let b = arena.create(SyntaxNodeData::Root);
        assert_eq!(a, b);
        arena.destroy(b);
    }

    #[test]
    fn tracking_arena_releases_leftovers() {
        let host = HostArena::new();
        let mut tracker = TrackingArena::new(host);
        let root = tracker.create(SyntaxNodeData::Root);
        let child = tracker.create(SyntaxNodeData::empty(SyntaxEntity::DefStruct));
        append_child(&mut tracker, root, child);
        assert_eq!(tracker.live_count(), 2);
        // Dropping the tracker frees both nodes; the host arena would assert otherwise.
    }
}
