//! Node storage for backends.
//!
//! Backends keep their tree in a [`NodeArena`] and hand out handles holding a
//! [`NodeId`]. Ids are never reused, so a handle whose node was removed can
//! never alias a newer node: "id missing from the arena" is exactly "object
//! invalid".

use std::collections::HashMap;

/// Identifier of a node in a [`NodeArena`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl NodeId {
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug)]
pub struct NodeArena<T> {
    nodes: HashMap<NodeId, T>,
    next: u64,
}

impl<T> NodeArena<T> {
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
            next: 0,
        }
    }

    pub fn insert(&mut self, node: T) -> NodeId {
        let id = NodeId(self.next);
        self.next += 1;
        self.nodes.insert(id, node);
        id
    }

    /// Insert a node that needs to know its own id.
    pub fn insert_with(&mut self, make: impl FnOnce(NodeId) -> T) -> NodeId {
        let id = NodeId(self.next);
        self.next += 1;
        self.nodes.insert(id, make(id));
        id
    }

    pub fn get(&self, id: NodeId) -> Option<&T> {
        self.nodes.get(&id)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut T> {
        self.nodes.get_mut(&id)
    }

    pub fn remove(&mut self, id: NodeId) -> Option<T> {
        self.nodes.remove(&id)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Drop every node. Ids keep counting up.
    pub fn clear(&mut self) {
        self.nodes.clear();
    }

    pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.keys().copied()
    }
}

impl<T> Default for NodeArena<T> {
    fn default() -> Self {
        Self::new()
    }
}
