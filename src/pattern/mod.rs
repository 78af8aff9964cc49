//! Distribution patterns: the bijective mapping from global N-D coordinates to (unit, local
//! linear offset), plus its inverse and local-block enumeration.
//!
//! Grounded on the "patterns as variants, not virtuals" design note: distributions are a small,
//! closed per-dimension enum dispatched by `match`, never a trait object, so the hot coordinate
//! mapping never allocates or indirects. Rank is a const generic (`Pattern<R>`) rather than the
//! teacher's `adt_const_params`-gated const-generic-enum tricks — this crate targets stable Rust.

mod metrics;

pub use metrics::PatternMetrics;

/// A global coordinate in an `R`-dimensional pattern.
pub type Coord<const R: usize> = [usize; R];

/// Per-dimension distribution tag. `Cyclic` is `BlockCyclic(1)`; the two are kept as distinct
/// variants purely for call-site readability; every algorithm below treats them identically.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Distribution {
    None,
    Blocked,
    Tile(usize),
    Cyclic,
    BlockCyclic(usize),
}

impl Distribution {
    fn block_size(self, fallback_extent: usize) -> usize {
        match self {
            Distribution::None => fallback_extent.max(1),
            Distribution::Blocked => fallback_extent.max(1),
            Distribution::Tile(k) | Distribution::BlockCyclic(k) => k.max(1),
            Distribution::Cyclic => 1,
        }
    }

    fn is_tiled(self) -> bool {
        matches!(
            self,
            Distribution::Tile(_) | Distribution::BlockCyclic(_) | Distribution::Cyclic
        )
    }
}

/// Global extents of a pattern, one entry per dimension.
pub type SizeSpec<const R: usize> = [usize; R];

/// Team layout: how the team's units are arranged as an `R`-dimensional grid. The product of all
/// entries must equal the team's unit count.
pub type TeamLayout<const R: usize> = [usize; R];

/// One global block in a single dimension: `[offset, offset + extent)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DimBlock {
    pub offset: usize,
    pub extent: usize,
}

/// A bounding box in global coordinates: per-dimension offsets and extents.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Block<const R: usize> {
    pub offsets: [usize; R],
    pub extents: [usize; R],
}

impl<const R: usize> Block<R> {
    pub fn size(&self) -> usize {
        self.extents.iter().product()
    }
}

/// A deterministic total function from global coordinates to (owning unit, local linear offset),
/// and its supporting queries. Pure: no field here ever changes after construction, and every
/// method is a function of that fixed state — no transport calls, no I/O.
#[derive(Clone, Debug)]
pub struct Pattern<const R: usize> {
    extents: SizeSpec<R>,
    dist: [Distribution; R],
    team_layout: TeamLayout<R>,
    nunits: usize,
}

impl<const R: usize> Pattern<R> {
    /// Construct a pattern. `team_layout`'s product must equal `nunits`; every `Distribution::None`
    /// dimension must have a team-layout extent of 1 (it is never split).
    pub fn new(
        extents: SizeSpec<R>,
        dist: [Distribution; R],
        team_layout: TeamLayout<R>,
        nunits: usize,
    ) -> Self {
        let grid_size: usize = team_layout.iter().product();
        debug_assert_eq!(
            grid_size, nunits,
            "team layout {team_layout:?} does not cover {nunits} units"
        );
        for d in 0..R {
            debug_assert!(
                dist[d] != Distribution::None || team_layout[d] == 1,
                "dimension {d} is NONE but team layout assigns it {} units",
                team_layout[d]
            );
        }
        log::debug!(
            "pattern constructed: extents={extents:?} dist={dist:?} team_layout={team_layout:?}"
        );
        Pattern {
            extents,
            dist,
            team_layout,
            nunits,
        }
    }

    pub fn extents(&self) -> SizeSpec<R> {
        self.extents
    }

    pub fn extent(&self, d: usize) -> usize {
        self.extents[d]
    }

    pub fn size(&self) -> usize {
        self.extents.iter().product()
    }

    pub fn ndim(&self) -> usize {
        R
    }

    pub fn nunits(&self) -> usize {
        self.nunits
    }

    fn block_size(&self, d: usize) -> usize {
        self.dist[d].block_size(self.ceil_div(self.extents[d], self.team_layout[d]))
    }

    fn ceil_div(&self, a: usize, b: usize) -> usize {
        (a + b - 1) / b.max(1)
    }

    /// Local-layout parameters for a `TILE`/`BLOCKCYCLIC` unit in dimension `d`: `(l, s)` where
    /// `l` is the number of local tiles (cycles) that team-grid coordinate `block_coord` owns,
    /// and `s` is the in-tile column at which the *last* of those tiles stops being full-size —
    /// `s == k` unless `block_coord` owns the dimension's trailing short tile (only possible when
    /// `extents[d]` is not a multiple of `k`), in which case `s` is that short tile's extent.
    /// Exactly one team-grid coordinate per dimension can own the short tile, so every other
    /// coordinate's tiles are all full-size and this degenerates to `s == k`.
    fn tile_local_layout(&self, d: usize, block_coord: usize, k: usize) -> (usize, usize) {
        let e_d = self.extents[d];
        let u_d = self.team_layout[d];
        let total_blocks = self.ceil_div(e_d, k);
        let l = if total_blocks > block_coord {
            (total_blocks - block_coord - 1) / u_d + 1
        } else {
            0
        };
        let last_tile_size = e_d - total_blocks.saturating_sub(1) * k;
        let owns_short_tile =
            total_blocks > 0 && last_tile_size < k && block_coord == (total_blocks - 1) % u_d;
        let s = if owns_short_tile { last_tile_size } else { k };
        (l, s)
    }

    /// Per-dimension `(block_coord, local_coord)` for global index `i_d` in dimension `d`.
    fn dim_coords(&self, d: usize, i_d: usize) -> (usize, usize) {
        debug_assert!(i_d < self.extents[d], "coordinate {i_d} out of bounds in dimension {d}");
        let u_d = self.team_layout[d];
        match self.dist[d] {
            Distribution::None => (0, i_d),
            Distribution::Blocked => {
                let block = self.block_size(d);
                (i_d / block, i_d % block)
            }
            Distribution::Tile(k) => {
                let k = k.max(1);
                let block_index = i_d / k;
                let block_coord = block_index % u_d;
                let in_block = i_d % k;
                let cycle_number = block_index / u_d;
                // Contiguous per tile: a tile's (up to) k elements occupy one contiguous run of
                // local offsets, tiles ordered by cycle.
                (block_coord, cycle_number * k + in_block)
            }
            Distribution::BlockCyclic(k) => {
                let k = k.max(1);
                let block_index = i_d / k;
                let block_coord = block_index % u_d;
                let in_block = i_d % k;
                let cycle_number = block_index / u_d;
                let (l, s) = self.tile_local_layout(d, block_coord, k);
                // Column-major: every cycle's element at a given in-tile position is grouped
                // together, so — unlike TILE — a single tile's own elements are scattered across
                // local storage rather than contiguous.
                let local = if in_block < s {
                    in_block * l + cycle_number
                } else {
                    s * l + (in_block - s) * (l - 1) + cycle_number
                };
                (block_coord, local)
            }
            Distribution::Cyclic => {
                let block_index = i_d;
                let block_coord = block_index % u_d;
                let cycle_number = block_index / u_d;
                (block_coord, cycle_number)
            }
        }
    }

    /// Number of global indices in dimension `d` owned by team-grid coordinate `u_d`.
    fn dim_local_count(&self, d: usize, u_d: usize) -> usize {
        let e_d = self.extents[d];
        if e_d == 0 {
            return 0;
        }
        match self.dist[d] {
            Distribution::None => {
                if u_d == 0 {
                    e_d
                } else {
                    0
                }
            }
            Distribution::Blocked => {
                let block = self.block_size(d);
                let start = u_d * block;
                if start >= e_d {
                    0
                } else {
                    (e_d - start).min(block)
                }
            }
            // TILE and BLOCKCYCLIC own the same set of global blocks per unit — they differ only
            // in how those blocks' elements are linearized into local offsets (see `dim_coords`),
            // not in how many elements land on each unit.
            Distribution::Tile(k) | Distribution::BlockCyclic(k) | Distribution::Cyclic => {
                let k = if matches!(self.dist[d], Distribution::Cyclic) {
                    1
                } else {
                    self.dist[d].block_size(0)
                };
                let u = self.team_layout[d];
                let total_blocks = self.ceil_div(e_d, k);
                let mut count = 0usize;
                let mut block_index = u_d;
                while block_index < total_blocks {
                    let start = block_index * k;
                    let end = (start + k).min(e_d);
                    count += end - start;
                    block_index += u;
                }
                count
            }
        }
    }

    /// Team-grid coordinate owning the given unit linear id, per dimension.
    fn unit_to_grid(&self, unit: usize) -> [usize; R] {
        let mut rem = unit;
        let mut grid = [0usize; R];
        // row-major: dimension 0 varies slowest.
        for d in (0..R).rev() {
            grid[d] = rem % self.team_layout[d];
            rem /= self.team_layout[d];
        }
        grid
    }

    fn grid_to_unit(&self, grid: [usize; R]) -> usize {
        let mut unit = 0usize;
        for d in 0..R {
            unit = unit * self.team_layout[d] + grid[d];
        }
        unit
    }

    /// Which unit owns the element at `coords`.
    pub fn unit_at(&self, coords: Coord<R>) -> usize {
        let mut grid = [0usize; R];
        for d in 0..R {
            grid[d] = self.dim_coords(d, coords[d]).0;
        }
        self.grid_to_unit(grid)
    }

    /// Row-major linear offset of `coords` within its owning unit's local storage.
    pub fn local_at(&self, coords: Coord<R>) -> usize {
        let unit = self.unit_at(coords);
        let local_extents = self.local_extents(unit);
        let mut local_coords = [0usize; R];
        for d in 0..R {
            local_coords[d] = self.dim_coords(d, coords[d]).1;
        }
        linearize(local_coords, local_extents)
    }

    /// Inverse of `(unit_at, local_at)`: reconstruct the global coordinate.
    pub fn global_at(&self, unit: usize, local_offset: usize) -> Coord<R> {
        let local_extents = self.local_extents(unit);
        let local_coords = delinearize(local_offset, local_extents);
        let grid = self.unit_to_grid(unit);
        let mut coords = [0usize; R];
        for d in 0..R {
            coords[d] = self.dim_inverse(d, grid[d], local_coords[d]);
        }
        coords
    }

    fn dim_inverse(&self, d: usize, block_coord: usize, local_coord: usize) -> usize {
        let u_d = self.team_layout[d];
        match self.dist[d] {
            Distribution::None => local_coord,
            Distribution::Blocked => block_coord * self.block_size(d) + local_coord,
            Distribution::Tile(k) => {
                let k = k.max(1);
                let cycle_number = local_coord / k;
                let in_block = local_coord % k;
                (cycle_number * u_d + block_coord) * k + in_block
            }
            Distribution::BlockCyclic(k) => {
                let k = k.max(1);
                let (l, s) = self.tile_local_layout(d, block_coord, k);
                let threshold = s * l;
                let (in_block, cycle_number) = if local_coord < threshold {
                    (local_coord / l, local_coord % l)
                } else {
                    let rem = local_coord - threshold;
                    // `l > 1` here: `threshold == s * l` only equals `dim_local_count` when
                    // `l <= 1`, so this branch is only reachable for valid `local_coord` when
                    // `l >= 2`, making `l - 1` safe.
                    (s + rem / (l - 1), rem % (l - 1))
                };
                (cycle_number * u_d + block_coord) * k + in_block
            }
            Distribution::Cyclic => local_coord * u_d + block_coord,
        }
    }

    /// Per-dimension local extents for a given unit (the local bounding box, valid whenever the
    /// unit's local block set is itself rectangular — true for `NONE`/`BLOCKED`/`TILE`/`CYCLIC`
    /// in isolation per dimension, which is the only case `local_extents` is meaningful for).
    pub fn local_extents(&self, unit: usize) -> [usize; R] {
        let grid = self.unit_to_grid(unit);
        let mut extents = [0usize; R];
        for d in 0..R {
            extents[d] = self.dim_local_count(d, grid[d]);
        }
        extents
    }

    pub fn local_size(&self, unit: usize) -> usize {
        self.local_extents(unit).iter().product()
    }

    /// Number of blocks per dimension, globally. TILE and BLOCKCYCLIC carve the dimension into the
    /// same set of blocks — they only disagree on how a block's elements land in local storage.
    pub fn blockspec(&self) -> [usize; R] {
        let mut spec = [0usize; R];
        for d in 0..R {
            spec[d] = match self.dist[d] {
                Distribution::None => 1,
                Distribution::Blocked => self.team_layout[d],
                Distribution::Tile(_) | Distribution::BlockCyclic(_) | Distribution::Cyclic => {
                    let k = self.block_size(d);
                    self.ceil_div(self.extents[d], k)
                }
            };
        }
        spec
    }

    pub fn blocksize(&self, d: usize) -> usize {
        self.block_size(d)
    }

    /// Offsets and extents, in global coordinates, of global block `bi` (one index per dimension,
    /// `bi[d] < blockspec()[d]`).
    pub fn block(&self, bi: [usize; R]) -> Block<R> {
        let mut offsets = [0usize; R];
        let mut extents = [0usize; R];
        for d in 0..R {
            let k = self.block_size(d);
            let start = bi[d] * k;
            let end = (start + k).min(self.extents[d]);
            offsets[d] = start;
            extents[d] = end.saturating_sub(start);
        }
        Block { offsets, extents }
    }

    /// Number of local blocks per dimension owned by `unit`. Block ownership is identical between
    /// TILE and BLOCKCYCLIC; only `dim_coords`/`dim_inverse`'s local-offset linearization diverges.
    pub fn local_blockspec(&self, unit: usize) -> [usize; R] {
        let grid = self.unit_to_grid(unit);
        let mut spec = [0usize; R];
        for d in 0..R {
            spec[d] = match self.dist[d] {
                Distribution::None | Distribution::Blocked => 1,
                Distribution::Tile(_) | Distribution::BlockCyclic(_) | Distribution::Cyclic => {
                    let k = self.block_size(d);
                    let u = self.team_layout[d];
                    let total_blocks = self.ceil_div(self.extents[d], k);
                    if total_blocks > grid[d] {
                        (total_blocks - grid[d] - 1) / u + 1
                    } else {
                        0
                    }
                }
            };
        }
        spec
    }

    /// The `lbi`-th local block of `unit`, in global coordinates. Block enumeration (which global
    /// blocks a unit owns) is shared between TILE and BLOCKCYCLIC; their element layout inside
    /// each returned block's local storage is not (see `dim_coords`).
    pub fn local_block(&self, unit: usize, lbi: [usize; R]) -> Block<R> {
        let grid = self.unit_to_grid(unit);
        let mut bi = [0usize; R];
        for d in 0..R {
            bi[d] = match self.dist[d] {
                Distribution::None | Distribution::Blocked => {
                    debug_assert_eq!(lbi[d], 0);
                    grid[d]
                }
                Distribution::Tile(_) | Distribution::BlockCyclic(_) | Distribution::Cyclic => {
                    lbi[d] * self.team_layout[d] + grid[d]
                }
            };
        }
        self.block(bi)
    }

    /// Per-dimension metrics sidecar: min/max local element count across units in dimension `d`.
    pub fn metrics(&self) -> PatternMetrics {
        PatternMetrics::compute(self)
    }

    pub(crate) fn dist(&self) -> [Distribution; R] {
        self.dist
    }

    pub(crate) fn is_rectangular_locally(&self) -> bool {
        self.dist.iter().all(|d| !d.is_tiled()) || self.nunits == 1
    }
}

fn linearize<const R: usize>(coords: [usize; R], extents: [usize; R]) -> usize {
    let mut offset = 0usize;
    for d in 0..R {
        offset = offset * extents[d].max(1) + coords[d];
    }
    offset
}

fn delinearize<const R: usize>(mut offset: usize, extents: [usize; R]) -> [usize; R] {
    let mut coords = [0usize; R];
    for d in (0..R).rev() {
        let e = extents[d].max(1);
        coords[d] = offset % e;
        offset /= e;
    }
    coords
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocked_columns_roundtrip() {
        let pattern = Pattern::<2>::new([8, 6], [Distribution::None, Distribution::Blocked], [1, 2], 2);
        assert_eq!(pattern.unit_at([2, 4]), 1);
        for row in 0..8 {
            for col in 0..6 {
                let unit = pattern.unit_at([row, col]);
                let local = pattern.local_at([row, col]);
                assert_eq!(pattern.global_at(unit, local), [row, col]);
            }
        }
    }

    #[test]
    fn local_sizes_sum_to_total() {
        let pattern = Pattern::<2>::new([8, 6], [Distribution::None, Distribution::Blocked], [1, 2], 2);
        let total: usize = (0..2).map(|u| pattern.local_size(u)).sum();
        assert_eq!(total, 48);
    }

    #[test]
    fn tile_non_divisible_trailing_block_is_short() {
        // extent 10, block size 4, 2 units: blocks are [0,4) unit0, [4,8) unit1, [8,10) unit0.
        let pattern = Pattern::<1>::new([10], [Distribution::Tile(4)], [2], 2);
        assert_eq!(pattern.local_size(0), 6);
        assert_eq!(pattern.local_size(1), 4);
        for i in 0..10 {
            let unit = pattern.unit_at([i]);
            let local = pattern.local_at([i]);
            assert_eq!(pattern.global_at(unit, local), [i]);
        }
    }

    #[test]
    fn cyclic_distributes_round_robin() {
        let pattern = Pattern::<1>::new([7], [Distribution::Cyclic], [3], 3);
        assert_eq!(pattern.unit_at([0]), 0);
        assert_eq!(pattern.unit_at([1]), 1);
        assert_eq!(pattern.unit_at([3]), 0);
        assert_eq!(pattern.local_size(0), 3);
        assert_eq!(pattern.local_size(1), 2);
        assert_eq!(pattern.local_size(2), 2);
    }

    #[test]
    fn blockspec_matches_team_layout_for_blocked() {
        let pattern = Pattern::<2>::new([8, 6], [Distribution::None, Distribution::Blocked], [1, 2], 2);
        assert_eq!(pattern.blockspec(), [1, 2]);
    }

    #[test]
    fn tile_and_blockcyclic_diverge_on_local_offset() {
        // extent 10, block size 4, 2 units: same block ownership as
        // `tile_non_divisible_trailing_block_is_short` (unit 0 owns the short trailing block), but
        // TILE keeps each tile contiguous while BLOCKCYCLIC interleaves column-major.
        let tile = Pattern::<1>::new([10], [Distribution::Tile(4)], [2], 2);
        let blockcyclic = Pattern::<1>::new([10], [Distribution::BlockCyclic(4)], [2], 2);

        // both distributions agree on ownership...
        for i in 0..10 {
            assert_eq!(tile.unit_at([i]), blockcyclic.unit_at([i]));
        }

        // ...but disagree on local offset for the same global coordinate.
        assert_eq!(tile.unit_at([2]), 0);
        assert_ne!(tile.local_at([2]), blockcyclic.local_at([2]));
        assert_eq!(tile.local_at([2]), 2);
        assert_eq!(blockcyclic.local_at([2]), 4);

        assert_eq!(tile.unit_at([9]), 0);
        assert_ne!(tile.local_at([9]), blockcyclic.local_at([9]));
        assert_eq!(tile.local_at([9]), 5);
        assert_eq!(blockcyclic.local_at([9]), 3);

        // each distribution independently stays bijective despite the short trailing tile.
        for pattern in [&tile, &blockcyclic] {
            for i in 0..10 {
                let unit = pattern.unit_at([i]);
                let local = pattern.local_at([i]);
                assert_eq!(pattern.global_at(unit, local), [i]);
            }
        }
    }
}
