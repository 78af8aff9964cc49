//! `GlobalRef<T>`: a global pointer plus synchronous load/store semantics.

use std::marker::PhantomData;

use crate::memory::{from_bytes, to_bytes, Future, GlobalPointer};
use crate::team::Team;

/// A value-like reference to one element of global memory. Cheap to copy (it is a pointer plus a
/// team handle, not the owning container); copying a `GlobalRef` never copies the container it
/// points into.
pub struct GlobalRef<T: Copy> {
    ptr: GlobalPointer<T>,
    team: Team,
    _marker: PhantomData<T>,
}

impl<T: Copy> Clone for GlobalRef<T> {
    fn clone(&self) -> Self {
        GlobalRef {
            ptr: self.ptr,
            team: self.team.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T: Copy> GlobalRef<T> {
    pub(crate) fn new(ptr: GlobalPointer<T>, team: Team) -> Self {
        GlobalRef { ptr, team, _marker: PhantomData }
    }

    pub fn pointer(&self) -> GlobalPointer<T> {
        self.ptr
    }

    pub fn is_local(&self) -> bool {
        self.ptr.is_local(self.team.myid())
    }

    /// Read the current value. If local, this is a direct load on the owning unit's own shard of
    /// its segment; otherwise it is a blocking get through the transport.
    pub fn get(&self) -> T {
        debug_assert!(!self.ptr.is_null(), "dereferencing a null GlobalRef");
        let mut bytes = vec![0u8; std::mem::size_of::<T>()];
        self.team.transport().get_blocking(&mut bytes, self.ptr.raw());
        from_bytes(&bytes)
    }

    /// Write `value`. Locally blocking: the call returns once the source buffer (here, the
    /// temporary byte copy of `value`) can be reused, but remote visibility is only guaranteed
    /// after a `flush` of the target segment/unit or a team `barrier`.
    pub fn set(&self, value: T) {
        debug_assert!(!self.ptr.is_null(), "writing through a null GlobalRef");
        let bytes = to_bytes(&value);
        self.team.transport().put_blocking_local(self.ptr.raw(), &bytes);
    }

    /// Rebind to a struct member at a fixed byte offset, producing a reference of the member's
    /// type.
    pub fn member<M: Copy>(&self, offset: usize) -> GlobalRef<M> {
        GlobalRef::new(GlobalPointer::from_raw(self.ptr.raw().gptr_incaddr(offset)), self.team.clone())
    }

    /// Swap the values referenced by `a` and `b` through a temporary of the value type.
    pub fn swap(a: &GlobalRef<T>, b: &GlobalRef<T>) {
        let tmp = a.get();
        a.set(b.get());
        b.set(tmp);
    }

    /// Issue a non-blocking read against this reference's address, returning a future that
    /// resolves to the value once the underlying handle completes. A synchronous `GlobalRef` can
    /// still yield a non-blocking read this way, same as `GlobalAsyncRef::future`.
    pub fn future(&self) -> Future<T> {
        Future::from_ref_raw(self.ptr, self.team.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pgas_transport::run_spmd;
    use std::sync::Arc;

    #[test]
    fn write_then_barrier_is_visible_on_every_unit() {
        let results = run_spmd(3, |t| {
            let team = Team::new(Arc::new(t), "test");
            let gptr = team.transport().team_memalloc_aligned(8, 8);
            let r = GlobalRef::<i64>::new(GlobalPointer::from_raw(gptr), team.clone());
            if team.myid() == 0 {
                r.set(99);
            }
            team.barrier();
            r.get()
        })
        .unwrap();
        assert_eq!(results, vec![99, 99, 99]);
    }

    #[test]
    fn swap_exchanges_values() {
        let results = run_spmd(2, |t| {
            let team = Team::new(Arc::new(t), "test");
            let base = team.transport().team_memalloc_aligned(8, 8);
            let a = GlobalRef::<i64>::new(GlobalPointer::from_raw(base), team.clone());
            let b = GlobalRef::<i64>::new(GlobalPointer::from_raw(base.gptr_setunit(1)), team.clone());
            if team.myid() == 0 {
                a.set(1);
                b.set(2);
            }
            team.barrier();
            if team.myid() == 0 {
                GlobalRef::swap(&a, &b);
            }
            team.barrier();
            (a.get(), b.get())
        })
        .unwrap();
        assert_eq!(results, vec![(2, 1), (2, 1)]);
    }
}
