//! End-to-end integration tests implementing the testable scenarios (S1-S6): the full stack —
//! `Team` + `LocalTransport` + `Pattern` + `Array`/`Matrix` + views — exercised together rather
//! than unit-by-unit as the colocated `#[cfg(test)]` modules do.

use std::sync::Arc;

use anyhow::Result;

use pgas::{accumulate_container, run_spmd, Container, Distribution, ReduceOp, Team, View};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// S1 — BLOCKED rows. `Matrix<i64,2>(nunits*4, nunits*3, NONE, BLOCKED)` with 2 units: unit 0
/// owns cols [0,3), unit 1 owns cols [3,6). A write by either unit, after a barrier, is read
/// identically by every unit.
#[test]
fn s1_blocked_rows_write_then_barrier_is_visible_everywhere() -> Result<()> {
    init_logging();
    let results = run_spmd(2, |t| {
        let team = Team::new(Arc::new(t), "s1");
        let mat: Container<i64, 2> =
            Container::new([8, 6], [Distribution::None, Distribution::Blocked], [1, 2], team.clone());
        assert_eq!(mat.extents(), [8, 6]);

        let target = mat.at([2, 4]);
        if target.is_local() {
            target.set(77);
        }
        mat.barrier();
        mat.at([2, 4]).get()
    })
    .unwrap();
    assert_eq!(results, vec![77, 77]);
    Ok(())
}

/// S2 — View equivalence: `sub` composition commutes and narrows extents as the scenario
/// prescribes.
#[test]
fn s2_view_sub_composition_matches_scenario_extents() -> Result<()> {
    init_logging();
    run_spmd(2, |t| {
        let team = Team::new(Arc::new(t), "s2");
        let mat: Container<i64, 2> =
            Container::new([8, 6], [Distribution::None, Distribution::Blocked], [1, 2], team);

        assert_eq!(View::new(&mat).sub(0, 1, 3).extents(), [2, 6]);
        assert_eq!(View::new(&mat).sub(1, 2, 5).extents(), [8, 3]);

        let a = View::new(&mat).sub(1, 2, 5).sub(0, 1, 3).extents();
        let b = View::new(&mat).sub(0, 1, 3).sub(1, 2, 5).extents();
        assert_eq!(a, b);
        assert_eq!(a, [2, 3]);
    })
    .unwrap();
    Ok(())
}

/// S3 — Local view: for `(NONE, BLOCKED)` with `M` divisible by the unit count, `local(sub(0, 0,
/// N, mat)).size() == N * (M / U)` on every unit.
#[test]
fn s3_local_view_size_matches_local_block() -> Result<()> {
    init_logging();
    let nunits = 4;
    let results = run_spmd(nunits, |t| {
        let team = Team::new(Arc::new(t), "s3");
        let mat: Container<i64, 2> = Container::new(
            [8, 12],
            [Distribution::None, Distribution::Blocked],
            [1, nunits],
            team,
        );
        View::new(&mat).sub(0, 0, 8).local().size()
    })
    .unwrap();
    let expected = 8 * (12 / nunits);
    assert!(results.iter().all(|&s| s == expected));
    Ok(())
}

/// S4 — Accumulate with init: summing `1..=N` with `+` and a non-zero `init` returns
/// `init + N(N+1)/2`, regardless of how many units the array is spread across.
#[test]
fn s4_accumulate_with_init_matches_gauss_sum_plus_init() -> Result<()> {
    init_logging();
    for nunits in [1usize, 2, 3, 5] {
        let results = run_spmd(nunits, |t| {
            let team = Team::new(Arc::new(t), "s4");
            let arr: Container<i64, 1> = Container::array(19, team.clone());
            for i in 0..19i64 {
                let r = arr.at_index(i as usize);
                if r.is_local() {
                    r.set(i + 1);
                }
            }
            arr.barrier();
            accumulate_container(&arr, 10, ReduceOp::Sum)
        })
        .unwrap();
        assert!(results.iter().all(|&s| s == 200), "nunits={nunits} results={results:?}");
    }
    Ok(())
}

/// S5 — Future round-trip: `Future::get` on any index returns the same value a direct `get()`
/// would, regardless of which unit owns the index.
#[test]
fn s5_future_round_trip_matches_direct_get() -> Result<()> {
    init_logging();
    let results = run_spmd(3, |t| {
        let team = Team::new(Arc::new(t), "s5");
        let arr: Container<i64, 1> = Container::array(9, team.clone());
        for i in 0..9i64 {
            let r = arr.at_index(i as usize);
            if r.is_local() {
                r.set(i * 10);
            }
        }
        arr.barrier();

        let mut ok = true;
        for i in 0..9usize {
            let fut = arr.nonblocking_index(i).future();
            let via_future = fut.get();
            let via_direct = arr.at_index(i).get();
            ok &= via_future == via_direct;
        }
        ok
    })
    .unwrap();
    assert!(results.iter().all(|&ok| ok));
    Ok(())
}

/// S6 — Async visibility: an `async` write followed by `flush` is visible to a remote reader
/// after a barrier.
#[test]
fn s6_async_write_then_flush_is_visible_to_remote_reader() -> Result<()> {
    init_logging();
    let results = run_spmd(2, |t| {
        let team = Team::new(Arc::new(t), "s6");
        let arr: Container<i64, 1> = Container::array(4, team.clone());
        let target_unit = arr.pattern().unit_at([1]);
        if team.myid() == target_unit {
            let r = arr.nonblocking_index(1);
            r.set(55);
            r.flush();
        }
        arr.barrier();
        arr.at_index(1).get()
    })
    .unwrap();
    assert_eq!(results, vec![55, 55]);
    Ok(())
}

/// Invariant 1 & 2 (§8): for a handful of pattern shapes, `global_at` inverts `(unit_at,
/// local_at)` everywhere, and local sizes partition the total element count exactly.
#[test]
fn pattern_invariants_hold_across_distributions() -> Result<()> {
    use pgas::Pattern;

    let cases: Vec<(Pattern<2>, usize)> = vec![
        (
            Pattern::new([8, 6], [Distribution::None, Distribution::Blocked], [1, 2], 2),
            2,
        ),
        (
            Pattern::new([10, 7], [Distribution::Tile(3), Distribution::Cyclic], [2, 3], 6),
            6,
        ),
        (
            Pattern::new(
                [9, 9],
                [Distribution::BlockCyclic(2), Distribution::Blocked],
                [3, 3],
                9,
            ),
            9,
        ),
    ];

    for (pattern, nunits) in cases {
        let mut total = 0usize;
        for u in 0..nunits {
            total += pattern.local_size(u);
        }
        assert_eq!(total, pattern.size());

        for i in 0..pattern.extent(0) {
            for j in 0..pattern.extent(1) {
                let unit = pattern.unit_at([i, j]);
                let local = pattern.local_at([i, j]);
                assert_eq!(pattern.global_at(unit, local), [i, j]);
            }
        }
    }
    Ok(())
}
