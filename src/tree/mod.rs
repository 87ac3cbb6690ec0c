//! Ordered, prefix-compressed index for byte-string keys.
//!
//! Keys are stored along the edges of a radix tree: common prefixes are
//! shared, and runs of single-child nodes are collapsed into compressed
//! runs. A node marked as a key terminates the key spelled by the path
//! arriving at it, so the interior of a compressed run never holds a key.
//!
//! Structural changes that need more than one node are fully staged before
//! they are linked into the tree. If an allocation fails mid-way the staged
//! nodes are released and [`RadixError::OutOfMemory`] is returned with the
//! tree unchanged.

mod debug;
mod node;

use log::trace;

use crate::error::RadixError;
use crate::iter::RadixIter;
use crate::stack::PathStack;

pub use node::MAX_RUN_LEN;
pub(crate) use node::{Node, NodeId, NodePool};

/// Result of an insertion attempt.
#[derive(Debug, PartialEq, Eq)]
pub enum InsertOutcome<V> {
    /// The key was not present and has been added.
    Added,
    /// The key was present; its previous binding is returned.
    Replaced(Option<V>),
    /// The key was present and `try_insert` left it untouched; the offered
    /// value is handed back.
    Rejected(Option<V>),
}

/// Where a prefix walk stopped.
///
/// `consumed` counts the key bytes matched so far; when the stop node is
/// compressed, `split` is the offset inside its run where matching ended
/// (0 when the walk stopped at the node boundary).
pub(crate) struct Walk {
    pub node: NodeId,
    pub consumed: usize,
    pub split: usize,
}

/// A radix tree mapping byte strings to optional values of type `V`.
///
/// A key's binding is an `Option<V>`: keys may be stored with no value
/// attached, and the two cases are distinguished everywhere (`get` returns
/// `Option<Option<&V>>`, the outer level meaning presence). The empty key
/// is a legal key.
pub struct RadixTree<V> {
    pool: NodePool<V>,
    num_elements: u64,
    num_nodes: u64,
    run_limit: usize,
}

impl<V> Default for RadixTree<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> RadixTree<V> {
    /// Creates an empty tree.
    pub fn new() -> Self {
        Self::with_run_limit(MAX_RUN_LEN)
    }

    /// Creates an empty tree whose compressed runs never exceed `limit`
    /// bytes. Longer suffixes are chunked into a chain of runs, and removal
    /// never merges nodes past the limit. The limit is clamped to
    /// `2..=MAX_RUN_LEN`.
    pub fn with_run_limit(limit: usize) -> Self {
        Self {
            pool: NodePool::new(),
            num_elements: 0,
            num_nodes: 1,
            run_limit: limit.clamp(2, MAX_RUN_LEN),
        }
    }

    /// Number of keys stored.
    pub fn len(&self) -> u64 {
        self.num_elements
    }

    pub fn is_empty(&self) -> bool {
        self.num_elements == 0
    }

    /// Number of nodes in the tree, the empty root included.
    pub fn node_count(&self) -> u64 {
        self.num_nodes
    }

    /// Looks up `key`. Returns `None` when the key is absent, and
    /// `Some(binding)` when present, where the binding itself may be `None`
    /// for keys stored without a value.
    pub fn get(&self, key: &[u8]) -> Option<Option<&V>> {
        let walk = self.walk_prefix(key, None);
        let node = self.pool.get(walk.node);
        if walk.consumed != key.len()
            || (node.is_compressed && walk.split != 0)
            || !node.is_key
        {
            return None;
        }
        Some(node.value.as_ref())
    }

    /// Inserts `key` with the given binding, replacing any existing one.
    ///
    /// Returns [`InsertOutcome::Added`] or [`InsertOutcome::Replaced`]. On
    /// [`RadixError::OutOfMemory`] the tree is unchanged and the offered
    /// value is dropped.
    pub fn insert(
        &mut self,
        key: &[u8],
        value: Option<V>,
    ) -> Result<InsertOutcome<V>, RadixError> {
        self.insert_impl(key, value, true)
    }

    /// Inserts `key` only if it is not already present. An existing key is
    /// left untouched and the offered value is handed back in
    /// [`InsertOutcome::Rejected`].
    pub fn try_insert(
        &mut self,
        key: &[u8],
        value: Option<V>,
    ) -> Result<InsertOutcome<V>, RadixError> {
        self.insert_impl(key, value, false)
    }

    /// Removes `key`, returning its binding, or `None` if it was absent.
    ///
    /// Nodes left without a purpose are pruned, and chains of single-child
    /// nodes re-compressed up to the run limit.
    pub fn remove(&mut self, key: &[u8]) -> Option<Option<V>> {
        let mut stack = PathStack::new();
        let walk = self.walk_prefix(key, Some(&mut stack));
        let found = {
            let node = self.pool.get(walk.node);
            walk.consumed == key.len()
                && !(node.is_compressed && walk.split != 0)
                && node.is_key
        };
        if !found {
            return None;
        }

        let target = walk.node;
        let old = {
            let node = self.pool.get_mut(target);
            node.is_key = false;
            node.value.take()
        };
        self.num_elements -= 1;
        trace!("removed key of {} bytes", key.len());

        // Pruning and re-compression need the full ancestor path; if the
        // stack could not record it, leave the structure as it is. Lookups
        // and iteration stay correct either way.
        if stack.oom() {
            return Some(old);
        }

        let root = self.pool.root();
        let mut h = target;
        let mut try_compress = false;
        if self.pool.get(target).children.is_empty() {
            // The key was a leaf: walk upward freeing the chain of nodes
            // that only existed to reach it.
            let mut dead = None;
            while h != root {
                let Some(parent) = stack.pop() else { break };
                self.free_node(h);
                dead = Some(h);
                h = parent;
                let hn = self.pool.get(h);
                if hn.is_key || (!hn.is_compressed && hn.children.len() != 1) {
                    break;
                }
            }
            if let Some(dead) = dead {
                trace!("pruned dangling chain below surviving node");
                let hn = self.pool.get_mut(h);
                if hn.is_compressed {
                    // A compressed survivor just lost its only child; it
                    // must be a key node, which now becomes a leaf.
                    hn.is_compressed = false;
                    hn.edges.clear();
                    hn.children.clear();
                } else if let Some(idx) =
                    hn.children.iter().position(|&c| c == dead)
                {
                    hn.edges.remove(idx);
                    hn.children.remove(idx);
                }
                let hn = self.pool.get(h);
                if hn.children.len() == 1 && !hn.is_key {
                    try_compress = true;
                }
            }
        } else if self.pool.get(target).children.len() == 1 {
            // An interior key vanished; the node may now merge with its
            // neighbors.
            try_compress = true;
        }

        if try_compress {
            self.compress_chain(h, &mut stack);
        }
        Some(old)
    }

    /// Merges the longest chain of single-child non-key nodes around `h`
    /// into one compressed node, bounded by the run limit. Skipped silently
    /// if the bookkeeping allocation fails; merging is only an optimization.
    fn compress_chain(&mut self, h: NodeId, stack: &mut PathStack<NodeId>) {
        // Climb to the highest single-child non-key ancestor.
        let mut start = h;
        while let Some(parent) = stack.pop() {
            let p = self.pool.get(parent);
            if p.is_key || (!p.is_compressed && p.children.len() != 1) {
                break;
            }
            start = parent;
        }

        // Scan downward collecting the chain that fits in one run.
        let mut chain = vec![start];
        let mut run_len = self.pool.get(start).edges.len();
        let mut cur = start;
        loop {
            let n = self.pool.get(cur);
            if n.children.is_empty() {
                break;
            }
            let next = n.children[0];
            let nx = self.pool.get(next);
            if nx.is_key || (!nx.is_compressed && nx.children.len() != 1) {
                break;
            }
            if run_len + nx.edges.len() > self.run_limit {
                break;
            }
            run_len += nx.edges.len();
            chain.push(next);
            cur = next;
        }
        if chain.len() < 2 {
            return;
        }

        let mut run = Vec::new();
        if run.try_reserve_exact(run_len).is_err() {
            return;
        }
        for &id in &chain {
            run.extend_from_slice(&self.pool.get(id).edges);
        }
        let tail_child = self.pool.get(chain[chain.len() - 1]).children[0];
        for &id in &chain[1..] {
            self.free_node(id);
        }
        trace!("merged {} nodes into a {} byte run", chain.len(), run_len);

        let head = self.pool.get_mut(start);
        head.edges = run;
        head.is_compressed = true;
        head.children.clear();
        head.children.push(tail_child);
    }

    fn insert_impl(
        &mut self,
        key: &[u8],
        value: Option<V>,
        overwrite: bool,
    ) -> Result<InsertOutcome<V>, RadixError> {
        let walk = self.walk_prefix(key, None);
        let h = walk.node;
        let i = walk.consumed;
        let j = walk.split;
        let (is_compressed, is_key_node) = {
            let node = self.pool.get(h);
            (node.is_compressed, node.is_key)
        };

        if i == key.len() && (!is_compressed || j == 0) {
            // The walk landed exactly on a node: the key either exists or
            // only needs the key mark set.
            if is_key_node {
                if !overwrite {
                    return Ok(InsertOutcome::Rejected(value));
                }
                let old =
                    std::mem::replace(&mut self.pool.get_mut(h).value, value);
                return Ok(InsertOutcome::Replaced(old));
            }
            let node = self.pool.get_mut(h);
            node.is_key = true;
            node.value = value;
            self.num_elements += 1;
            return Ok(InsertOutcome::Added);
        }

        if is_compressed && i != key.len() {
            // The key diverges inside a compressed run. Split the run at
            // the divergence point into an optional trimmed head, a fork
            // with two edges, an optional postfix for the rest of the run,
            // and a fresh chain for the key's remaining suffix.
            trace!("run split at offset {} for divergent byte", j);
            let run = try_copy(&self.pool.get(h).edges)?;
            let old_child = self.pool.get(h).children[0];

            let suffix = self.build_chain(&key[i + 1..], value)?;
            let rest = &run[j + 1..];
            let lower = if rest.is_empty() {
                old_child
            } else {
                match self.alloc_run_node(rest, old_child, false, None) {
                    Ok(id) => id,
                    Err(e) => {
                        self.free_chain(suffix);
                        return Err(e);
                    }
                }
            };
            let fork = match branch_pair((run[j], lower), (key[i], suffix)) {
                Ok(node) => node,
                Err(e) => {
                    if !rest.is_empty() {
                        self.free_node(lower);
                    }
                    self.free_chain(suffix);
                    return Err(e);
                }
            };

            if j == 0 {
                // Nothing of the run survives in front: the fork takes the
                // node's place, inheriting its key status.
                let node = self.pool.get_mut(h);
                let mut fork = fork;
                fork.is_key = node.is_key;
                fork.value = node.value.take();
                *node = fork;
            } else {
                let fork_id = match self.alloc_node(fork) {
                    Ok(id) => id,
                    Err(e) => {
                        if !rest.is_empty() {
                            self.free_node(lower);
                        }
                        self.free_chain(suffix);
                        return Err(e);
                    }
                };
                let node = self.pool.get_mut(h);
                node.edges.truncate(j);
                node.is_compressed = j >= 2;
                node.children[0] = fork_id;
            }
            self.num_elements += 1;
            return Ok(InsertOutcome::Added);
        }

        if is_compressed && i == key.len() {
            // The key ends inside a compressed run: split the run at the
            // boundary and mark the lower half as the new key's node.
            trace!("run boundary split at offset {}", j);
            let run = try_copy(&self.pool.get(h).edges)?;
            let old_child = self.pool.get(h).children[0];
            let postfix = self.alloc_run_node(&run[j..], old_child, true, value)?;
            let node = self.pool.get_mut(h);
            node.edges.truncate(j);
            node.is_compressed = j >= 2;
            node.children[0] = postfix;
            self.num_elements += 1;
            return Ok(InsertOutcome::Added);
        }

        // The walk stopped where no edge continues the key: attach the
        // remaining suffix as a (possibly chunked) compressed chain.
        trace!("attaching {} byte suffix", key.len() - i);
        if self.pool.get(h).children.is_empty() {
            // A childless node grows the chain in place, keeping its own
            // key status.
            let head = self.build_chain(&key[i..], value)?;
            let head_node = self.free_node(head);
            let node = self.pool.get_mut(h);
            node.edges = head_node.edges;
            node.children = head_node.children;
            node.is_compressed = head_node.is_compressed;
        } else {
            let head = self.build_chain(&key[i + 1..], value)?;
            let idx = match self.pool.get(h).edges.binary_search(&key[i]) {
                Ok(idx) | Err(idx) => idx,
            };
            let reserved = {
                let node = self.pool.get_mut(h);
                node.edges
                    .try_reserve(1)
                    .and_then(|_| node.children.try_reserve(1))
            };
            if reserved.is_err() {
                self.free_chain(head);
                return Err(RadixError::OutOfMemory);
            }
            let node = self.pool.get_mut(h);
            node.edges.insert(idx, key[i]);
            node.children.insert(idx, head);
        }
        self.num_elements += 1;
        Ok(InsertOutcome::Added)
    }

    /// Builds an unlinked chain spelling `bytes` and ending in a key leaf
    /// holding `value`. Suffixes longer than the run limit are chunked into
    /// consecutive runs. Frees everything it built on allocation failure.
    fn build_chain(
        &mut self,
        bytes: &[u8],
        value: Option<V>,
    ) -> Result<NodeId, RadixError> {
        let mut head = self.alloc_node(Node::leaf(value))?;
        for chunk in bytes.chunks(self.run_limit).rev() {
            head = match self.alloc_run_node(chunk, head, false, None) {
                Ok(id) => id,
                Err(e) => {
                    self.free_chain(head);
                    return Err(e);
                }
            };
        }
        Ok(head)
    }

    /// Allocates a node whose edges spell `run` and whose single child is
    /// `child`. A one-byte run yields a branching node with one edge, the
    /// canonical shape for single bytes.
    fn alloc_run_node(
        &mut self,
        run: &[u8],
        child: NodeId,
        is_key: bool,
        value: Option<V>,
    ) -> Result<NodeId, RadixError> {
        let edges = try_copy(run)?;
        let mut children = Vec::new();
        children.try_reserve_exact(1)?;
        children.push(child);
        self.alloc_node(Node {
            is_key,
            is_compressed: run.len() >= 2,
            edges,
            children,
            value,
        })
    }

    fn alloc_node(&mut self, node: Node<V>) -> Result<NodeId, RadixError> {
        let id = self.pool.alloc(node)?;
        self.num_nodes += 1;
        Ok(id)
    }

    fn free_node(&mut self, id: NodeId) -> Node<V> {
        self.num_nodes -= 1;
        self.pool.release(id)
    }

    /// Frees a staged single-child chain starting at `head`, following the
    /// first child of each node until a leaf.
    fn free_chain(&mut self, head: NodeId) {
        let mut id = head;
        loop {
            let node = self.free_node(id);
            match node.children.first() {
                Some(&child) => id = child,
                None => break,
            }
        }
    }

    /// Descends from the root matching `key`, stopping at the first node
    /// that cannot be advanced. When `stack` is given, every node left
    /// behind on the way down is recorded (the stop node excluded).
    pub(crate) fn walk_prefix(
        &self,
        key: &[u8],
        mut stack: Option<&mut PathStack<NodeId>>,
    ) -> Walk {
        let mut node_id = self.pool.root();
        let mut i = 0;
        let mut split = 0;
        loop {
            let node = self.pool.get(node_id);
            if node.children.is_empty() || i == key.len() {
                break;
            }
            let child_idx = if node.is_compressed {
                let run = &node.edges;
                let mut j = 0;
                while j < run.len() && i < key.len() && run[j] == key[i] {
                    j += 1;
                    i += 1;
                }
                if j != run.len() {
                    split = j;
                    break;
                }
                0
            } else {
                match node.find_edge(key[i]) {
                    Some(idx) => {
                        i += 1;
                        idx
                    }
                    None => break,
                }
            };
            if let Some(stack) = stack.as_deref_mut() {
                stack.push(node_id);
            }
            node_id = node.children[child_idx];
        }
        Walk {
            node: node_id,
            consumed: i,
            split,
        }
    }

    pub(crate) fn node(&self, id: NodeId) -> &Node<V> {
        self.pool.get(id)
    }

    pub(crate) fn root_id(&self) -> NodeId {
        self.pool.root()
    }

    /// Removes every key, invoking `release` once per stored value.
    /// Teardown is iterative and the tree is reusable afterwards.
    pub fn clear_with(&mut self, mut release: impl FnMut(V)) {
        let mut pending = vec![self.pool.root()];
        while let Some(id) = pending.pop() {
            let node = self.pool.get_mut(id);
            pending.append(&mut node.children);
            if let Some(value) = node.value.take() {
                release(value);
            }
        }
        self.pool = NodePool::new();
        self.num_elements = 0;
        self.num_nodes = 1;
    }

    /// Removes every key, dropping the stored values.
    pub fn clear(&mut self) {
        self.clear_with(|_| ());
    }

    /// Returns an iterator over the tree. A fresh iterator is at EOF until
    /// the first [`RadixIter::seek`].
    pub fn iter(&self) -> RadixIter<'_, V> {
        RadixIter::new(self)
    }

    /// Recounts the tree and panics if any structural invariant is broken.
    /// Test and fuzzing facility.
    #[doc(hidden)]
    pub fn assert_invariants(&self) {
        let root = self.pool.root();
        let mut keys = 0u64;
        let mut nodes = 0u64;
        let mut pending = vec![root];
        while let Some(id) = pending.pop() {
            let node = self.pool.get(id);
            nodes += 1;
            if node.is_key {
                keys += 1;
            }
            if node.is_compressed {
                assert!(node.edges.len() >= 2, "compressed run shorter than 2");
                assert!(
                    node.edges.len() <= self.run_limit,
                    "compressed run exceeds the run limit"
                );
                assert_eq!(node.children.len(), 1, "compressed node fan-out");
            } else {
                assert_eq!(
                    node.edges.len(),
                    node.children.len(),
                    "edge and child counts diverge"
                );
                assert!(
                    node.edges.windows(2).all(|w| w[0] < w[1]),
                    "branch edges not strictly ascending"
                );
            }
            if node.children.is_empty() && id != root {
                assert!(node.is_key, "non-root leaf without a key mark");
            }
            if node.value.is_some() {
                assert!(node.is_key, "value attached to a non-key node");
            }
            pending.extend(node.children.iter().copied());
        }
        assert_eq!(keys, self.num_elements, "key counter out of sync");
        assert_eq!(nodes, self.num_nodes, "node counter out of sync");
    }
}

/// Builds a branching node with exactly the two given edges, sorted.
fn branch_pair<V>(
    a: (u8, NodeId),
    b: (u8, NodeId),
) -> Result<Node<V>, RadixError> {
    debug_assert_ne!(a.0, b.0);
    let ((e0, c0), (e1, c1)) = if a.0 < b.0 { (a, b) } else { (b, a) };
    let mut edges = Vec::new();
    edges.try_reserve_exact(2)?;
    edges.extend_from_slice(&[e0, e1]);
    let mut children = Vec::new();
    children.try_reserve_exact(2)?;
    children.push(c0);
    children.push(c1);
    Ok(Node {
        is_key: false,
        is_compressed: false,
        edges,
        children,
        value: None,
    })
}

fn try_copy(bytes: &[u8]) -> Result<Vec<u8>, RadixError> {
    let mut copy = Vec::new();
    copy.try_reserve_exact(bytes.len())?;
    copy.extend_from_slice(bytes);
    Ok(copy)
}
