//! View algebra: lazy, composable `sub`/`local`/`index` view expressions over a container origin.
//!
//! A view is a tagged (offsets, extents, local-filter) triple rather than the source's deep
//! expression-template hierarchy — the design notes call out that hierarchy as a compile-time
//! erasure trick not worth reproducing for clarity. `index`/`iter` evaluate lazily through a
//! plain iterator chain; no element data is ever copied, and the origin is only borrowed, never
//! owned.

use crate::container::{CanonicalIter, Container};
use crate::memory::GlobalRef;
use crate::pattern::Coord;

/// A non-owning, lazily-composed view over a container's index-set.
pub struct View<'a, T: Copy, const R: usize> {
    origin: &'a Container<T, R>,
    offsets: [usize; R],
    extents: [usize; R],
    local_only: bool,
}

impl<'a, T: Copy, const R: usize> View<'a, T, R> {
    /// The full view over `origin`: every global index, in canonical order.
    pub fn new(origin: &'a Container<T, R>) -> Self {
        View {
            origin,
            offsets: [0usize; R],
            extents: origin.extents(),
            local_only: false,
        }
    }

    /// Narrow dimension `d` to `[a, b)`. Requires `a <= b <= extent(d)`.
    pub fn sub(mut self, d: usize, a: usize, b: usize) -> Self {
        debug_assert!(
            a <= b && b <= self.extents[d],
            "sub<{d}>({a},{b}) out of range for extent {}",
            self.extents[d]
        );
        self.offsets[d] += a;
        self.extents[d] = b - a;
        self
    }

    /// Restrict the index-set to indices owned by the calling unit. Composition order with `sub`
    /// does not matter for rectangular ranges: `local(sub(V))` and `sub(local(V))` visit the same
    /// index-set, since both simply intersect the same rectangle with the same ownership test.
    pub fn local(mut self) -> Self {
        self.local_only = true;
        self
    }

    pub(crate) fn origin_team(&self) -> &'a crate::team::Team {
        self.origin.team()
    }

    /// Same index-set, with the local-ownership filter applied regardless of its current state.
    pub(crate) fn as_local(&self) -> View<'a, T, R> {
        View {
            origin: self.origin,
            offsets: self.offsets,
            extents: self.extents,
            local_only: true,
        }
    }

    pub fn ndim(&self) -> usize {
        R
    }

    pub fn offsets(&self) -> [usize; R] {
        self.offsets
    }

    /// Per-dimension extents. For a non-local view this is exact. For a `local()` view this is
    /// the bounding box of the owned indices — exact for `BLOCKED`/`TILE`/`NONE` patterns, where
    /// a unit's owned indices in a rectangle are themselves a rectangle; for `CYCLIC`/
    /// `BLOCKCYCLIC` patterns the owned indices are scattered and this reports their bounding box
    /// rather than a true shape. Use [`View::size`] for the exact element count in all cases.
    pub fn extents(&self) -> [usize; R] {
        if !self.local_only {
            return self.extents;
        }
        let mut min = [usize::MAX; R];
        let mut max = [0usize; R];
        let mut any = false;
        for coords in self.index() {
            any = true;
            for d in 0..R {
                min[d] = min[d].min(coords[d]);
                max[d] = max[d].max(coords[d]);
            }
        }
        if !any {
            return [0usize; R];
        }
        let mut extents = [0usize; R];
        for d in 0..R {
            extents[d] = max[d] - min[d] + 1;
        }
        extents
    }

    pub fn extent(&self, d: usize) -> usize {
        self.extents()[d]
    }

    /// Exact number of elements the index-set names.
    pub fn size(&self) -> usize {
        self.index().count()
    }

    /// The underlying index-set: global coordinates in canonical order, filtered to locally-owned
    /// indices if `local()` was applied.
    pub fn index(&self) -> Box<dyn Iterator<Item = Coord<R>> + 'a> {
        let offsets = self.offsets;
        let rect = CanonicalIter::new(self.extents).map(move |rel| {
            let mut abs = [0usize; R];
            for d in 0..R {
                abs[d] = rel[d] + offsets[d];
            }
            abs
        });
        if self.local_only {
            let pattern = self.origin.pattern().clone();
            let myid = self.origin.team().myid();
            Box::new(rect.filter(move |&coords| pattern.unit_at(coords) == myid))
        } else {
            Box::new(rect)
        }
    }

    /// Iterate the view's index-set, yielding the origin's `GlobalRef` at each index.
    pub fn iter(&self) -> impl Iterator<Item = GlobalRef<T>> + 'a {
        let origin = self.origin;
        self.index().map(move |coords| origin.at(coords))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::team::Team;
    use pgas_transport::run_spmd;
    use std::sync::Arc;

    #[test]
    fn sub_composition_is_order_independent() {
        run_spmd(2, |t| {
            let team = Team::new(Arc::new(t), "test");
            let mat: Container<i64, 2> = Container::new(
                [8, 6],
                [crate::pattern::Distribution::None, crate::pattern::Distribution::Blocked],
                [1, 2],
                team,
            );
            let a = View::new(&mat).sub(1, 2, 5).sub(0, 1, 3).extents();
            let b = View::new(&mat).sub(0, 1, 3).sub(1, 2, 5).extents();
            assert_eq!(a, b);
            assert_eq!(a, [2, 3]);
        })
        .unwrap();
    }

    #[test]
    fn sub_extents_match_scenario_s2() {
        run_spmd(2, |t| {
            let team = Team::new(Arc::new(t), "test");
            let mat: Container<i64, 2> = Container::new(
                [8, 6],
                [crate::pattern::Distribution::None, crate::pattern::Distribution::Blocked],
                [1, 2],
                team,
            );
            assert_eq!(View::new(&mat).sub(0, 1, 3).extents(), [2, 6]);
            assert_eq!(View::new(&mat).sub(1, 2, 5).extents(), [8, 3]);
        })
        .unwrap();
    }

    #[test]
    fn local_view_size_matches_local_block() {
        run_spmd(2, |t| {
            let team = Team::new(Arc::new(t), "test");
            let mat: Container<i64, 2> = Container::new(
                [8, 6],
                [crate::pattern::Distribution::None, crate::pattern::Distribution::Blocked],
                [1, 2],
                team,
            );
            let local = View::new(&mat).sub(0, 0, 8).local();
            assert_eq!(local.size(), 8 * 3);
        })
        .unwrap();
    }
}
