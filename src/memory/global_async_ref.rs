//! `GlobalAsyncRef<T>`: write-only, non-blocking global reference, and `Future<T>`, the
//! handle-based non-blocking read.

use std::marker::PhantomData;

use pgas_transport::Handle;

use crate::memory::{from_bytes, to_bytes, GlobalPointer};
use crate::team::Team;

/// A non-blocking, write-only reference to one element of global memory. Assignment issues a
/// non-blocking put; nothing is guaranteed visible to any other unit (including, unspecified, the
/// same unit reading back before its own write is applied) until [`GlobalAsyncRef::flush`] or a
/// team barrier.
pub struct GlobalAsyncRef<T: Copy> {
    ptr: GlobalPointer<T>,
    team: Team,
    _marker: PhantomData<T>,
}

impl<T: Copy> Clone for GlobalAsyncRef<T> {
    fn clone(&self) -> Self {
        GlobalAsyncRef {
            ptr: self.ptr,
            team: self.team.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T: Copy> GlobalAsyncRef<T> {
    pub(crate) fn new(ptr: GlobalPointer<T>, team: Team) -> Self {
        GlobalAsyncRef { ptr, team, _marker: PhantomData }
    }

    pub fn pointer(&self) -> GlobalPointer<T> {
        self.ptr
    }

    /// Non-blocking write. The call returns once the source buffer can be reused; remote
    /// visibility requires `flush` or `barrier`.
    pub fn set(&self, value: T) {
        debug_assert!(!self.ptr.is_null(), "writing through a null GlobalAsyncRef");
        let bytes = to_bytes(&value);
        let _handle = self.team.transport().put(self.ptr.raw(), &bytes);
    }

    /// Drain all outstanding writes queued against this reference's segment at its target unit,
    /// establishing remote visibility for them.
    pub fn flush(&self) {
        self.team.transport().flush(self.ptr.segment(), self.ptr.unit());
    }

    /// Issue a non-blocking read, returning a future that resolves to the value once the
    /// underlying handle completes.
    pub fn future(&self) -> Future<T> {
        Future::from_async_ref(self)
    }
}

/// A non-blocking read in flight: a transport handle plus the element type it will resolve to.
/// Move-only (no `Clone`/`Copy`); an incomplete future is drained on drop rather than leaking its
/// handle.
pub struct Future<T: Copy> {
    handle: Option<Handle>,
    team: Team,
    _marker: PhantomData<T>,
}

impl<T: Copy> Future<T> {
    pub(crate) fn from_ref_raw(ptr: GlobalPointer<T>, team: Team) -> Self {
        let handle = team.transport().get_handle(ptr.raw(), std::mem::size_of::<T>());
        Future { handle: Some(handle), team, _marker: PhantomData }
    }

    fn from_async_ref(r: &GlobalAsyncRef<T>) -> Self {
        Self::from_ref_raw(r.ptr, r.team.clone())
    }

    /// Poll for completion without blocking.
    pub fn test(&self) -> bool {
        match &self.handle {
            Some(h) => self.team.transport().test_local(h),
            None => true,
        }
    }

    /// Block until complete and return the fetched value.
    pub fn wait(mut self) -> T {
        let handle = self.handle.take().expect("future polled after completion");
        let bytes = self
            .team
            .transport()
            .wait(handle)
            .expect("a get handle always carries a payload");
        from_bytes(&bytes)
    }

    /// `wait()` by another name, matching the data model's `get()` terminology.
    pub fn get(self) -> T {
        self.wait()
    }
}

impl<T: Copy> Drop for Future<T> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = self.team.transport().wait(handle);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::GlobalPointer;
    use crate::team::Team;
    use pgas_transport::run_spmd;
    use std::sync::Arc;

    #[test]
    fn future_round_trip_matches_get() {
        let results = run_spmd(2, |t| {
            let team = Team::new(Arc::new(t), "test");
            let gptr = team.transport().team_memalloc_aligned(8, 8);
            let async_ref = GlobalAsyncRef::<i64>::new(GlobalPointer::from_raw(gptr), team.clone());
            if team.myid() == 0 {
                async_ref.set(7);
                async_ref.flush();
            }
            team.barrier();
            let fut = async_ref.future();
            fut.get()
        })
        .unwrap();
        assert_eq!(results, vec![7, 7]);
    }

    #[test]
    fn incomplete_future_drains_on_drop() {
        run_spmd(1, |t| {
            let team = Team::new(Arc::new(t), "test");
            let gptr = team.transport().team_memalloc_aligned(8, 8);
            let async_ref = GlobalAsyncRef::<i64>::new(GlobalPointer::from_raw(gptr), team.clone());
            async_ref.set(1);
            async_ref.flush();
            let fut = async_ref.future();
            drop(fut);
        })
        .unwrap();
    }
}
