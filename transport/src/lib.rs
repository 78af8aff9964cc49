//! One-sided transport interface consumed by the rest of the workspace, plus an in-process
//! thread-per-unit reference backend (`LocalTransport`).
//!
//! This crate does not define *the* PGAS transport; it defines the narrow surface the runtime
//! needs from one, and ships a collaborator that implements it without a real network. A
//! production backend (verbs, libfabric, a vendor SHMEM library) would implement the same trait
//! and be substitutable without touching anything above this crate.

mod addr;
mod error;
mod handle;
mod local;
mod reduce;

pub use addr::{DataType, RawGlobalPtr, SegmentId, UnitId};
pub use error::TransportError;
pub use handle::Handle;
pub use local::{run_spmd, LocalTransport};
pub use reduce::{combine_bytes, op_create, op_destroy, type_create_custom, type_destroy, ReduceOp};

/// The one-sided operations a PGAS runtime needs from its transport layer. Every method here is
/// collective-safe to call concurrently from every unit's own thread of control; none of them
/// take `&mut self` because a real transport's state lives off in the network fabric, not in this
/// process, and `LocalTransport` mirrors that by keeping all of its mutable state behind interior
/// synchronization.
pub trait Transport: Send + Sync {
    /// Team size. Fixed for the lifetime of the transport.
    fn nunits(&self) -> usize;

    /// This unit's own id within the team, in `0..nunits()`.
    fn myid(&self) -> UnitId;

    /// Collective: every unit supplies its own local byte count; returns a pointer to the start
    /// of the new segment (unit 0, offset 0). Every unit must call this the same number of times,
    /// in the same order, matching the "collective operations execute in program order" rule the
    /// rest of the runtime relies on.
    fn team_memalloc_aligned(&self, bytes: usize, align: usize) -> RawGlobalPtr;

    /// Collective: release a segment returned by `team_memalloc_aligned`.
    fn team_memfree(&self, seg: SegmentId);

    /// Blocking put: returns once `src` has been consumed and may be reused by the caller. Remote
    /// visibility is only guaranteed after a `flush` on this segment/target or a team `barrier`.
    fn put_blocking_local(&self, dst: RawGlobalPtr, src: &[u8]);

    /// Blocking get: returns once `dst` has been filled with the current contents at `src`.
    fn get_blocking(&self, dst: &mut [u8], src: RawGlobalPtr);

    /// Non-blocking put, returning a handle. Same visibility contract as `put_blocking_local`.
    fn put(&self, dst: RawGlobalPtr, src: &[u8]) -> Handle;

    /// Non-blocking get, returning a handle whose payload is the fetched bytes.
    fn get_handle(&self, src: RawGlobalPtr, nbytes: usize) -> Handle;

    /// Poll a handle for completion without blocking.
    fn test_local(&self, handle: &Handle) -> bool;

    /// Block until a handle completes and return its payload (`None` for a put).
    fn wait(&self, handle: Handle) -> Option<Vec<u8>>;

    /// Drain and apply every outstanding non-blocking write queued against `target`'s copy of
    /// `seg`, establishing remote visibility for them.
    fn flush(&self, seg: SegmentId, target: UnitId);

    /// Collective: every unit rendezvouses here; as a side effect every unit's outstanding
    /// non-blocking writes become visible, not just the ones it issued itself.
    fn barrier(&self);

    /// Collective: combine `send` across every unit with `op`, returning the identical result to
    /// every unit.
    fn allreduce(&self, send: &[u8], dtype: DataType, op: ReduceOp) -> Vec<u8>;
}
