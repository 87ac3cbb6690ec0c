//! Small-buffer-optimized stack of traversal frames.
//!
//! Tree nodes carry no parent pointers, so walks that need to backtrack
//! (remove, ordered iteration) record the ancestor path in one of these
//! stacks. The first [`INLINE_FRAMES`] entries live inline; deeper paths
//! spill to the heap. A failed spill is recorded in a sticky out-of-memory
//! flag and never disturbs the frames already stored, so callers can
//! degrade gracefully (e.g. skip an optional compaction pass). Heap
//! storage, if any, is released on drop.

use smallvec::SmallVec;

/// Frames kept inline before spilling to the heap.
pub(crate) const INLINE_FRAMES: usize = 32;

/// A growable stack of path frames with an inline small buffer.
#[derive(Debug)]
pub(crate) struct PathStack<T> {
    frames: SmallVec<[T; INLINE_FRAMES]>,
    oom: bool,
}

impl<T> PathStack<T> {
    pub(crate) fn new() -> Self {
        Self {
            frames: SmallVec::new(),
            oom: false,
        }
    }

    /// Pushes a frame. Returns false (and sets the OOM flag) if the stack
    /// needed to grow and the allocation failed; prior contents are kept.
    pub(crate) fn push(&mut self, frame: T) -> bool {
        if self.frames.try_reserve(1).is_err() {
            self.oom = true;
            return false;
        }
        self.frames.push(frame);
        true
    }

    /// Removes and returns the top frame, or `None` if the stack is empty.
    pub(crate) fn pop(&mut self) -> Option<T> {
        self.frames.pop()
    }

    pub(crate) fn len(&self) -> usize {
        self.frames.len()
    }

    pub(crate) fn truncate(&mut self, len: usize) {
        self.frames.truncate(len);
    }

    /// Empties the stack and resets OOM tracking for a fresh traversal.
    pub(crate) fn clear(&mut self) {
        self.frames.clear();
        self.oom = false;
    }

    /// True if any push failed for lack of memory since the last clear.
    /// The recorded frames below the failure point are still valid.
    pub(crate) fn oom(&self) -> bool {
        self.oom
    }
}
