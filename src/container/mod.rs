//! Distributed containers: own a pattern, a team, and a global memory segment sized to the
//! pattern; expose indexed `GlobalRef`/`GlobalAsyncRef` access and canonical/local iteration.
//!
//! `Array<T>` and `Matrix<T, R>` are both the same underlying `Container<T, R>` engine (rank 1 vs
//! rank `R`) — the spec's two container names are a usability distinction, not a structural one,
//! so this avoids duplicating the (non-trivial) collective-construction and iteration logic.

use std::marker::PhantomData;

use pgas_transport::SegmentId;

use crate::memory::{GlobalAsyncRef, GlobalPointer, GlobalRef};
use crate::pattern::{Coord, Distribution, Pattern, PatternMetrics, SizeSpec, TeamLayout};
use crate::team::Team;

/// The shared engine behind [`Array`] and [`Matrix`]. Construction is collective: every unit in
/// `team` must call `new` with identical `extents`/`dist`/`team_layout`.
pub struct Container<T: Copy, const R: usize> {
    pattern: Pattern<R>,
    team: Team,
    segment: SegmentId,
    _marker: PhantomData<T>,
}

pub type Array<T> = Container<T, 1>;
pub type Matrix<T, const R: usize> = Container<T, R>;

impl<T: Copy, const R: usize> Container<T, R> {
    /// Collective constructor. `team_layout`'s product must equal `team.nunits()`.
    pub fn new(extents: SizeSpec<R>, dist: [Distribution; R], team_layout: TeamLayout<R>, team: Team) -> Self {
        let pattern = Pattern::new(extents, dist, team_layout, team.nunits());
        let local_elems = pattern.local_size(team.myid());
        let local_bytes = local_elems * std::mem::size_of::<T>();
        let gptr = team
            .transport()
            .team_memalloc_aligned(local_bytes, std::mem::align_of::<T>());
        log::debug!(
            "container constructed: extents={:?} segment={} local_elems={local_elems}",
            pattern.extents(),
            gptr.segment
        );
        Container {
            pattern,
            team,
            segment: gptr.segment,
            _marker: PhantomData,
        }
    }

    pub fn extents(&self) -> SizeSpec<R> {
        self.pattern.extents()
    }

    pub fn extent(&self, d: usize) -> usize {
        self.pattern.extent(d)
    }

    pub fn size(&self) -> usize {
        self.pattern.size()
    }

    pub fn local_size(&self) -> usize {
        self.pattern.local_size(self.team.myid())
    }

    pub fn pattern(&self) -> &Pattern<R> {
        &self.pattern
    }

    pub fn metrics(&self) -> PatternMetrics {
        self.pattern.metrics()
    }

    pub fn team(&self) -> &Team {
        &self.team
    }

    /// Collective: rendezvous every unit of the owning team.
    pub fn barrier(&self) {
        self.team.barrier();
    }

    fn pointer_at(&self, coords: Coord<R>) -> GlobalPointer<T> {
        let unit = self.pattern.unit_at(coords);
        let local_offset = self.pattern.local_at(coords) * std::mem::size_of::<T>();
        GlobalPointer::new(self.segment, unit, local_offset)
    }

    /// Indexed access, yielding a synchronous `GlobalRef<T>`.
    pub fn at(&self, coords: Coord<R>) -> GlobalRef<T> {
        GlobalRef::new(self.pointer_at(coords), self.team.clone())
    }

    /// Indexed access yielding a non-blocking `GlobalAsyncRef<T>`. Named `nonblocking` rather
    /// than the data model's `async` accessor — `async` is a reserved keyword in Rust.
    pub fn nonblocking(&self, coords: Coord<R>) -> GlobalAsyncRef<T> {
        GlobalAsyncRef::new(self.pointer_at(coords), self.team.clone())
    }

    /// Canonical global iterator, in row-major order, yielding `GlobalRef<T>` for every element.
    pub fn iter(&self) -> impl Iterator<Item = GlobalRef<T>> + '_ {
        CanonicalIter::new(self.pattern.extents()).map(move |coords| self.at(coords))
    }

    /// Number of elements in this unit's local portion. `lend() - lbegin()` in the data model;
    /// since this crate's memory lives behind the `Transport` abstraction rather than raw
    /// process-local pointers, the pointer-range API is replaced by `local_size`/`local_iter`.
    pub fn local_len(&self) -> usize {
        self.pattern.local_size(self.team.myid())
    }

    /// Iterate this unit's own local elements in local linear order, via direct (always-local)
    /// `GlobalRef`s.
    pub fn local_iter(&self) -> impl Iterator<Item = GlobalRef<T>> + '_ {
        let myid = self.team.myid();
        let elem = std::mem::size_of::<T>();
        (0..self.local_len()).map(move |local_offset| {
            GlobalRef::new(GlobalPointer::new(self.segment, myid, local_offset * elem), self.team.clone())
        })
    }

    pub(crate) fn segment(&self) -> SegmentId {
        self.segment
    }
}

impl<T: Copy> Container<T, 1> {
    /// `Array<T>(N)`: a rank-1 container blocked evenly across every unit of `team`.
    pub fn array(n: usize, team: Team) -> Self {
        let nunits = team.nunits();
        Container::new([n], [Distribution::Blocked], [nunits], team)
    }

    pub fn at_index(&self, i: usize) -> GlobalRef<T> {
        self.at([i])
    }

    pub fn nonblocking_index(&self, i: usize) -> GlobalAsyncRef<T> {
        self.nonblocking([i])
    }
}

impl<T: Copy, const R: usize> Drop for Container<T, R> {
    fn drop(&mut self) {
        self.team.transport().team_memfree(self.segment);
    }
}

pub(crate) struct CanonicalIter<const R: usize> {
    extents: SizeSpec<R>,
    next: Option<Coord<R>>,
}

impl<const R: usize> CanonicalIter<R> {
    pub(crate) fn new(extents: SizeSpec<R>) -> Self {
        let start = if extents.iter().all(|&e| e > 0) {
            Some([0usize; R])
        } else {
            None
        };
        CanonicalIter { extents, next: start }
    }
}

impl<const R: usize> Iterator for CanonicalIter<R> {
    type Item = Coord<R>;

    fn next(&mut self) -> Option<Coord<R>> {
        let current = self.next?;
        let mut advanced = current;
        let mut d = R;
        let mut overflowed = true;
        while d > 0 {
            d -= 1;
            advanced[d] += 1;
            if advanced[d] < self.extents[d] {
                overflowed = false;
                break;
            }
            advanced[d] = 0;
        }
        self.next = if overflowed { None } else { Some(advanced) };
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pgas_transport::run_spmd;
    use std::sync::Arc;

    #[test]
    fn canonical_iter_visits_every_coord_once_in_row_major_order() {
        let mut seen = vec![];
        for coords in (CanonicalIter::<2>::new([2, 3])) {
            seen.push(coords);
        }
        assert_eq!(
            seen,
            vec![[0, 0], [0, 1], [0, 2], [1, 0], [1, 1], [1, 2]]
        );
    }

    #[test]
    fn array_write_then_barrier_then_read_everywhere() {
        let results = run_spmd(3, |t| {
            let team = Team::new(Arc::new(t), "test");
            let arr: Array<i64> = Container::array(9, team.clone());
            if arr.at_index(4).is_local() {
                arr.at_index(4).set(42);
            }
            arr.barrier();
            arr.at_index(4).get()
        })
        .unwrap();
        assert_eq!(results, vec![42, 42, 42]);
    }

    #[test]
    fn local_len_matches_pattern_local_size() {
        run_spmd(4, |t| {
            let team = Team::new(Arc::new(t), "test");
            let arr: Array<i64> = Container::array(17, team.clone());
            assert_eq!(arr.local_len(), arr.pattern().local_size(team.myid()));
            assert_eq!(arr.local_iter().count(), arr.local_len());
        })
        .unwrap();
    }
}
