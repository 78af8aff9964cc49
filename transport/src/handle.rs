//! The `put`/`get_handle` + `test_local`/`wait` handle pair, and the pending-write bookkeeping
//! `flush` drains to make a non-blocking write visible to other units.

use ws_deque::Stack;

/// A handle to an in-flight (or already-resolved) one-sided operation.
///
/// `LocalTransport` has no network latency to hide, so every operation is physically complete by
/// the time the handle is constructed; `Handle` still carries the full state machine so call
/// sites exercise the same `test`/`wait` protocol a real network transport would require. Move-only:
/// draining the same handle twice would return the buffer once and panic the second time, which
/// matches the "assert and treat as fatal" discipline the rest of this crate follows.
pub struct Handle {
    payload: Option<Vec<u8>>,
    complete: bool,
}

impl Handle {
    pub(crate) fn ready(payload: Option<Vec<u8>>) -> Self {
        Handle {
            payload,
            complete: true,
        }
    }

    /// `test_local` — poll for completion without blocking.
    pub fn test_local(&self) -> bool {
        self.complete
    }

    /// `wait` — block until complete, then return the buffer (empty for a put).
    pub fn wait(mut self) -> Option<Vec<u8>> {
        self.complete = true;
        self.payload.take()
    }
}

/// One pending non-blocking write, buffered until `flush` establishes remote visibility.
pub(crate) struct PendingWrite {
    pub offset: usize,
    pub bytes: Vec<u8>,
}

/// Per-`(segment, target unit)` queue of writes issued through `GlobalAsyncRef` but not yet
/// flushed. Grounded on the teacher's `ws-deque::Stack` segmented-buffer idiom (there used to hold
/// LIFO work packets); order does not matter for disjoint-offset writes, so LIFO drain on flush is
/// fine and keeps the allocator-reuse behavior the teacher's `Stack` provides.
#[derive(Default)]
pub(crate) struct PendingQueue {
    writes: Stack<PendingWrite>,
}

impl PendingQueue {
    pub fn push(&mut self, write: PendingWrite) {
        self.writes.push(write);
    }

    pub fn drain(&mut self) -> Vec<PendingWrite> {
        self.writes.drain()
    }

    pub fn len(&self) -> usize {
        self.writes.len()
    }
}
