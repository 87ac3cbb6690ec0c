//! Packed radix tree nodes and the pool that owns them.
//!
//! A node is either *branching* (an ascending set of single-byte edge
//! labels, one child per label) or *compressed* (a multi-byte run standing
//! for a collapsed chain of single-child nodes, with exactly one child).
//! Nodes reference their children through [`NodeId`] handles into a
//! [`NodePool`], so dropping the pool never recurses through long chains,
//! and backtracking is done with an explicit stack instead of parent
//! pointers.

use crate::error::RadixError;

/// Maximum length of a compressed run (29 bits, as in the packed on-wire
/// layout this representation descends from). Longer suffixes are chunked
/// into a chain of runs.
pub const MAX_RUN_LEN: usize = (1 << 29) - 1;

/// Handle to a node slot inside a [`NodePool`].
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub(crate) struct NodeId(u32);

impl NodeId {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// A single tree node.
///
/// Invariants:
/// - `is_compressed` implies `edges.len() >= 2` and `children.len() == 1`
///   (a one-byte single-child node is canonically a branching node);
/// - otherwise `edges` is strictly ascending and parallel to `children`;
/// - `value` is `Some` only when `is_key` (a key may also be present with
///   an absent value: `is_key && value.is_none()`);
/// - every childless node except the empty root is a key node.
#[derive(Debug)]
pub(crate) struct Node<V> {
    /// The path arriving at this node spells a stored key.
    pub is_key: bool,
    /// Edge data is a collapsed run rather than branch labels.
    pub is_compressed: bool,
    /// Branch labels (ascending) or the compressed run.
    pub edges: Vec<u8>,
    /// Child handles, parallel to `edges` (length 1 when compressed).
    pub children: Vec<NodeId>,
    /// Value slot, populated only for key nodes with a stored value.
    pub value: Option<V>,
}

impl<V> Node<V> {
    /// A node with no edges, no key, no value.
    pub(crate) fn empty() -> Self {
        Self {
            is_key: false,
            is_compressed: false,
            edges: Vec::new(),
            children: Vec::new(),
            value: None,
        }
    }

    /// A childless key node holding `value`.
    pub(crate) fn leaf(value: Option<V>) -> Self {
        Self {
            is_key: true,
            is_compressed: false,
            edges: Vec::new(),
            children: Vec::new(),
            value,
        }
    }

    /// Index of the edge labeled `byte`, if present. Branching nodes only.
    pub(crate) fn find_edge(&self, byte: u8) -> Option<usize> {
        debug_assert!(!self.is_compressed);
        self.edges.binary_search(&byte).ok()
    }
}

/// Slot arena owning every node of one tree.
///
/// Slot 0 is always the root and exists from construction, so building a
/// pool is infallible; freed slots are recycled through a free list. Ids
/// stay stable for the lifetime of their slot, which lets a structural
/// rewrite replace a node in place without touching the parent's link.
#[derive(Debug)]
pub(crate) struct NodePool<V> {
    slots: Vec<Option<Node<V>>>,
    free: Vec<NodeId>,
}

impl<V> NodePool<V> {
    /// Creates a pool holding a single empty root node.
    pub(crate) fn new() -> Self {
        Self {
            slots: vec![Some(Node::empty())],
            free: Vec::new(),
        }
    }

    /// The root node's id (valid for every pool).
    pub(crate) fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Stores `node` in a fresh or recycled slot.
    pub(crate) fn alloc(&mut self, node: Node<V>) -> Result<NodeId, RadixError> {
        if let Some(id) = self.free.pop() {
            self.slots[id.index()] = Some(node);
            return Ok(id);
        }
        if self.slots.len() >= u32::MAX as usize {
            return Err(RadixError::OutOfMemory);
        }
        self.slots.try_reserve(1)?;
        let id = NodeId(self.slots.len() as u32);
        self.slots.push(Some(node));
        Ok(id)
    }

    /// Vacates a slot and returns the node that occupied it. Only this
    /// node's storage is released; descendants are untouched.
    pub(crate) fn release(&mut self, id: NodeId) -> Node<V> {
        let node = self.slots[id.index()]
            .take()
            .expect("released a vacant node slot");
        self.free.push(id);
        node
    }

    pub(crate) fn get(&self, id: NodeId) -> &Node<V> {
        self.slots[id.index()].as_ref().expect("dangling node id")
    }

    pub(crate) fn get_mut(&mut self, id: NodeId) -> &mut Node<V> {
        self.slots[id.index()].as_mut().expect("dangling node id")
    }
}
