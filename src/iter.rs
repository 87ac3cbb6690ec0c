//! Ordered iteration over a [`RadixTree`].
//!
//! The iterator keeps the key of its current element in a small inline
//! buffer and the ancestor path in an explicit stack, since nodes carry no
//! parent pointers. Seeking positions the iterator with one of the
//! [`SeekOp`] conditions; `next` and `prev` then move in either direction.
//! Stepping past either end sets the EOF flag and restores the position
//! held before the failed step, so the iterator state stays coherent for a
//! later seek.

use std::str::FromStr;

use smallvec::SmallVec;

use crate::error::RadixError;
use crate::stack::PathStack;
use crate::tree::{NodeId, RadixTree};

/// Key bytes kept inline before the buffer spills to the heap.
const INLINE_KEY_LEN: usize = 128;

/// Seek condition for positioning an iterator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SeekOp {
    /// Exactly the given key.
    Eq,
    /// The smallest key greater than or equal to the given one.
    Ge,
    /// The smallest key strictly greater than the given one.
    Gt,
    /// The greatest key less than or equal to the given one.
    Le,
    /// The greatest key strictly less than the given one.
    Lt,
    /// The smallest key in the tree; the argument key is ignored.
    First,
    /// The greatest key in the tree; the argument key is ignored.
    Last,
}

impl SeekOp {
    /// (equal, less, greater) components of the condition.
    fn flags(self) -> (bool, bool, bool) {
        match self {
            SeekOp::Eq => (true, false, false),
            SeekOp::Ge => (true, false, true),
            SeekOp::Gt => (false, false, true),
            SeekOp::Le => (true, true, false),
            SeekOp::Lt => (false, true, false),
            SeekOp::First | SeekOp::Last => (false, false, false),
        }
    }
}

impl FromStr for SeekOp {
    type Err = RadixError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "==" | "=" => Ok(SeekOp::Eq),
            ">=" => Ok(SeekOp::Ge),
            ">" => Ok(SeekOp::Gt),
            "<=" => Ok(SeekOp::Le),
            "<" => Ok(SeekOp::Lt),
            "^" => Ok(SeekOp::First),
            "$" => Ok(SeekOp::Last),
            _ => Err(RadixError::InvalidOperator),
        }
    }
}

/// Cursor over the keys of a [`RadixTree`] in lexicographic byte order.
///
/// Obtained from [`RadixTree::iter`]; starts at EOF until the first seek.
/// After an error the position is unspecified and the iterator must be
/// re-seeked before further use.
pub struct RadixIter<'a, V> {
    tree: &'a RadixTree<V>,
    node: NodeId,
    key: SmallVec<[u8; INLINE_KEY_LEN]>,
    stack: PathStack<NodeId>,
    just_seeked: bool,
    at_eof: bool,
}

impl<'a, V> RadixIter<'a, V> {
    pub(crate) fn new(tree: &'a RadixTree<V>) -> Self {
        Self {
            tree,
            node: tree.root_id(),
            key: SmallVec::new(),
            stack: PathStack::new(),
            just_seeked: false,
            at_eof: true,
        }
    }

    /// Positions the iterator at the element selected by `op` and `key`.
    ///
    /// Returns whether an element satisfied the condition; on `false` the
    /// iterator is at EOF. `First` and `Last` ignore the key argument.
    pub fn seek(&mut self, op: SeekOp, key: &[u8]) -> Result<bool, RadixError> {
        let tree = self.tree;
        self.stack.clear();
        self.key.clear();
        self.just_seeked = true;
        self.at_eof = false;
        self.node = tree.root_id();

        match op {
            SeekOp::First => return self.seek(SeekOp::Ge, b""),
            SeekOp::Last => {
                if tree.is_empty() {
                    self.at_eof = true;
                    return Ok(false);
                }
                self.seek_greatest()?;
                return Ok(true);
            }
            _ => {}
        }
        let (eq, lt, gt) = op.flags();

        let walk = tree.walk_prefix(key, Some(&mut self.stack));
        if self.stack.oom() {
            return Err(RadixError::OutOfMemory);
        }
        self.node = walk.node;
        let node = tree.node(walk.node);
        let i = walk.consumed;
        let split = walk.split;

        if eq
            && i == key.len()
            && (!node.is_compressed || split == 0)
            && node.is_key
        {
            // Exact hit.
            self.add_bytes(key)?;
            return Ok(true);
        }
        if !(lt || gt) {
            self.at_eof = true;
            return Ok(false);
        }

        // Start from the key spelled by the path arriving at the stop node
        // and let a directional step find the nearest element.
        self.add_bytes(&key[..i - split])?;
        if i != key.len() && !node.is_compressed {
            // Mismatch at a branching node: record the missing byte so the
            // step can scan this node's edges around it directly.
            self.add_bytes(&key[i..i + 1])?;
            self.just_seeked = false;
            if lt {
                self.prev_step(true)?;
            }
            if gt {
                self.next_step(true)?;
            }
            self.just_seeked = true;
        } else if i != key.len() && node.is_compressed {
            // Mismatch inside a compressed run. The run byte at the
            // divergence decides on which side of the target this whole
            // subtree lies.
            let run_byte = node.edges[split];
            let key_byte = key[i];
            self.just_seeked = false;
            if gt {
                if run_byte > key_byte {
                    self.next_step(false)?;
                } else {
                    self.add_bytes(&node.edges)?;
                    self.next_step(true)?;
                }
            }
            if lt {
                if run_byte < key_byte {
                    // Everything below is smaller: the subtree maximum is
                    // the predecessor.
                    self.seek_greatest()?;
                } else {
                    self.add_bytes(&node.edges)?;
                    self.prev_step(true)?;
                }
            }
            self.just_seeked = true;
        } else {
            self.just_seeked = false;
            if node.is_compressed && node.is_key && split != 0 && lt {
                // The target ends inside this node's run with a full prefix
                // match, so the node's own key is already the greatest one
                // smaller than the target. No step needed.
            } else {
                if gt {
                    self.next_step(false)?;
                }
                if lt {
                    self.prev_step(false)?;
                }
            }
            self.just_seeked = true;
        }
        Ok(!self.at_eof)
    }

    /// Parses `op` with [`SeekOp::from_str`] and seeks.
    pub fn seek_str(&mut self, op: &str, key: &[u8]) -> Result<bool, RadixError> {
        self.seek(op.parse()?, key)
    }

    /// Advances to the next key in order. Returns `false` at EOF.
    pub fn next(&mut self) -> Result<bool, RadixError> {
        self.next_step(false)?;
        Ok(!self.at_eof)
    }

    /// Moves back to the previous key in order. Returns `false` at EOF.
    pub fn prev(&mut self) -> Result<bool, RadixError> {
        self.prev_step(false)?;
        Ok(!self.at_eof)
    }

    /// The current element's key, empty at EOF.
    pub fn key(&self) -> &[u8] {
        if self.at_eof {
            &[]
        } else {
            &self.key
        }
    }

    /// The current element's value, `None` at EOF or when the key is
    /// stored without a value.
    pub fn value(&self) -> Option<&'a V> {
        if self.at_eof {
            return None;
        }
        let node = self.tree.node(self.node);
        if !node.is_key {
            return None;
        }
        node.value.as_ref()
    }

    /// Whether the iterator has stepped past either end (or was never
    /// seeked).
    pub fn eof(&self) -> bool {
        self.at_eof
    }

    /// Compares the current key against `key` under `op`. Always `false`
    /// at EOF or for the `First`/`Last` operators.
    pub fn compare(&self, op: SeekOp, key: &[u8]) -> bool {
        if self.at_eof {
            return false;
        }
        let (eq, lt, gt) = op.flags();
        match self.key.as_slice().cmp(key) {
            std::cmp::Ordering::Equal => eq,
            std::cmp::Ordering::Less => lt,
            std::cmp::Ordering::Greater => gt,
        }
    }

    /// Takes up to `steps` uniformly random downward steps from the
    /// current position (the root when fresh or at EOF) and lands on a
    /// key. With `steps == 0` a budget logarithmic in the tree size is
    /// used. Returns `false` on an empty tree.
    pub fn random_walk(&mut self, steps: usize) -> Result<bool, RadixError> {
        use rand::Rng;

        let tree = self.tree;
        if tree.is_empty() {
            self.at_eof = true;
            return Ok(false);
        }
        if self.at_eof {
            self.key.clear();
            self.stack.clear();
            self.node = tree.root_id();
            self.at_eof = false;
        }
        self.just_seeked = false;

        let mut steps = if steps == 0 {
            (u64::BITS - tree.len().leading_zeros()) as usize
        } else {
            steps
        };

        let mut rng = rand::thread_rng();
        // Deepest key position seen, for rewinding if the walk overshoots
        // into a non-key node.
        let mut best = if tree.node(self.node).is_key {
            Some((self.key.len(), self.stack.len(), self.node))
        } else {
            None
        };
        while steps > 0 {
            let node = tree.node(self.node);
            if node.children.is_empty() {
                break;
            }
            let idx = if node.is_compressed {
                0
            } else {
                rng.gen_range(0..node.children.len())
            };
            self.descend(idx)?;
            if tree.node(self.node).is_key {
                best = Some((self.key.len(), self.stack.len(), self.node));
            }
            steps -= 1;
        }

        if !tree.node(self.node).is_key {
            match best {
                Some((key_len, stack_len, node)) => {
                    self.key.truncate(key_len);
                    self.stack.truncate(stack_len);
                    self.node = node;
                }
                None => {
                    // No key on the path yet: finish the descent along
                    // first children to the nearest one.
                    while !tree.node(self.node).is_key {
                        self.descend(0)?;
                    }
                }
            }
        }
        Ok(true)
    }

    /// Descends one edge, recording the traversed bytes and the parent.
    fn descend(&mut self, edge_idx: usize) -> Result<(), RadixError> {
        let tree = self.tree;
        let node = tree.node(self.node);
        if node.is_compressed {
            self.add_bytes(&node.edges)?;
        } else {
            self.add_bytes(&node.edges[edge_idx..edge_idx + 1])?;
        }
        if !self.stack.push(self.node) {
            return Err(RadixError::OutOfMemory);
        }
        self.node = node.children[if node.is_compressed { 0 } else { edge_idx }];
        Ok(())
    }

    /// Descends to the greatest key of the current node's subtree,
    /// following last children.
    fn seek_greatest(&mut self) -> Result<(), RadixError> {
        let tree = self.tree;
        loop {
            let node = tree.node(self.node);
            if node.children.is_empty() {
                return Ok(());
            }
            if node.is_compressed {
                self.add_bytes(&node.edges)?;
            } else {
                self.add_bytes(&node.edges[node.edges.len() - 1..])?;
            }
            if !self.stack.push(self.node) {
                return Err(RadixError::OutOfMemory);
            }
            self.node = node.children[node.children.len() - 1];
        }
    }

    /// One forward step. With `noup` the current node is treated as a
    /// parent just returned to, picking up from the last key byte; a seek
    /// uses this after a mismatch.
    fn next_step(&mut self, mut noup: bool) -> Result<(), RadixError> {
        if self.at_eof {
            return Ok(());
        }
        if self.just_seeked {
            self.just_seeked = false;
            return Ok(());
        }
        let tree = self.tree;
        let orig_key_len = self.key.len();
        let orig_stack_len = self.stack.len();
        let orig_node = self.node;

        loop {
            let node = tree.node(self.node);
            if !noup && !node.children.is_empty() {
                // Go deeper: the smallest key of this subtree lies along
                // the first children.
                if !self.stack.push(self.node) {
                    return Err(RadixError::OutOfMemory);
                }
                if node.is_compressed {
                    self.add_bytes(&node.edges)?;
                } else {
                    self.add_bytes(&node.edges[..1])?;
                }
                self.node = node.children[0];
                if tree.node(self.node).is_key {
                    return Ok(());
                }
            } else {
                // This subtree is exhausted: climb until a parent offers a
                // next sibling edge.
                loop {
                    let old_noup = noup;
                    if !noup && self.node == tree.root_id() {
                        self.at_eof = true;
                        self.stack.truncate(orig_stack_len);
                        self.key.truncate(orig_key_len);
                        self.node = orig_node;
                        return Ok(());
                    }
                    let prev_byte = self.key[self.key.len() - 1];
                    if !noup {
                        match self.stack.pop() {
                            Some(parent) => self.node = parent,
                            None => {
                                self.at_eof = true;
                                self.stack.truncate(orig_stack_len);
                                self.key.truncate(orig_key_len);
                                self.node = orig_node;
                                return Ok(());
                            }
                        }
                    } else {
                        noup = false;
                    }
                    // Trim the key back to this node's arrival path.
                    let node = tree.node(self.node);
                    let todel = if node.is_compressed {
                        node.edges.len()
                    } else {
                        1
                    };
                    let key_len = self.key.len();
                    self.key.truncate(key_len - todel);

                    let min_edges = if old_noup { 0 } else { 1 };
                    if !node.is_compressed && node.edges.len() > min_edges {
                        if let Some(idx) =
                            node.edges.iter().position(|&b| b > prev_byte)
                        {
                            self.add_bytes(&node.edges[idx..idx + 1])?;
                            if !self.stack.push(self.node) {
                                return Err(RadixError::OutOfMemory);
                            }
                            self.node = node.children[idx];
                            if tree.node(self.node).is_key {
                                return Ok(());
                            }
                            // Non-key sibling: dive into its subtree.
                            break;
                        }
                    }
                }
            }
        }
    }

    /// One backward step; mirror of [`Self::next_step`].
    fn prev_step(&mut self, mut noup: bool) -> Result<(), RadixError> {
        if self.at_eof {
            return Ok(());
        }
        if self.just_seeked {
            self.just_seeked = false;
            return Ok(());
        }
        let tree = self.tree;
        let orig_key_len = self.key.len();
        let orig_stack_len = self.stack.len();
        let orig_node = self.node;

        loop {
            let old_noup = noup;
            if !noup && self.node == tree.root_id() {
                self.at_eof = true;
                self.stack.truncate(orig_stack_len);
                self.key.truncate(orig_key_len);
                self.node = orig_node;
                return Ok(());
            }
            let prev_byte = self.key[self.key.len() - 1];
            if !noup {
                match self.stack.pop() {
                    Some(parent) => self.node = parent,
                    None => {
                        self.at_eof = true;
                        self.stack.truncate(orig_stack_len);
                        self.key.truncate(orig_key_len);
                        self.node = orig_node;
                        return Ok(());
                    }
                }
            } else {
                noup = false;
            }
            let node = tree.node(self.node);
            let todel = if node.is_compressed {
                node.edges.len()
            } else {
                1
            };
            let key_len = self.key.len();
            self.key.truncate(key_len - todel);

            let min_edges = if old_noup { 0 } else { 1 };
            if !node.is_compressed && node.edges.len() > min_edges {
                // Rightmost sibling smaller than the byte we came from;
                // its subtree maximum is the previous key.
                if let Some(idx) =
                    node.edges.iter().rposition(|&b| b < prev_byte)
                {
                    self.add_bytes(&node.edges[idx..idx + 1])?;
                    if !self.stack.push(self.node) {
                        return Err(RadixError::OutOfMemory);
                    }
                    self.node = node.children[idx];
                    self.seek_greatest()?;
                }
            }
            // Either the subtree maximum found above, or the node itself:
            // a parent's key precedes all keys below it.
            if tree.node(self.node).is_key {
                return Ok(());
            }
        }
    }

    fn add_bytes(&mut self, bytes: &[u8]) -> Result<(), RadixError> {
        self.key.try_reserve(bytes.len())?;
        self.key.extend_from_slice(bytes);
        Ok(())
    }
}
