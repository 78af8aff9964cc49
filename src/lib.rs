//! A Partitioned Global Address Space (PGAS) runtime and distributed container library: a fixed
//! collective team of units cooperatively allocates logically-single arrays and matrices whose
//! elements are physically partitioned across units, exposed through a view algebra and a
//! distribution-pattern abstraction.
//!
//! The one-sided transport itself lives in [`pgas_transport`]; this crate is the runtime built on
//! top of it — patterns, global references, containers, views, and collective reductions.

#[macro_use]
extern crate log;

pub mod config;
pub mod container;
pub mod error;
pub mod memory;
pub mod pattern;
pub mod reduce;
pub mod team;
pub mod view;

pub use config::Config;
pub use container::{Array, Container, Matrix};
pub use error::{PgasError, Result};
pub use memory::{Future, GlobalAsyncRef, GlobalPointer, GlobalRef};
pub use pattern::{Block, Coord, Distribution, Pattern, PatternMetrics, SizeSpec, TeamLayout};
pub use reduce::{accumulate, accumulate_container, accumulate_custom, accumulate_view, Accumulable};
pub use team::Team;
pub use view::View;

pub use pgas_transport::{run_spmd, LocalTransport, ReduceOp, Transport};

/// Build the root team: spawn `nunits` simulated units, each backed by its own
/// [`pgas_transport::LocalTransport`] handle, and return one [`Team`] per unit in unit order.
///
/// This is the one place this crate constructs a transport directly; everything above it takes a
/// `Team` it is handed. Mirrors the teacher's own pattern of a single `WorkerGroup::new` call at
/// the top of a driver, below which nothing else touches thread or transport setup directly.
pub fn bootstrap_team(nunits: usize, label: impl Into<String>) -> Result<Vec<Team>> {
    let label: String = label.into();
    let teams = run_spmd(nunits, move |transport| {
        Team::new(std::sync::Arc::new(transport), label.clone())
    })?;
    Ok(teams)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bootstrap_team_returns_one_team_per_unit() {
        let teams = bootstrap_team(4, "root").unwrap();
        assert_eq!(teams.len(), 4);
        let mut ids: Vec<_> = teams.iter().map(Team::myid).collect();
        ids.sort_unstable();
        assert_eq!(ids, vec![0, 1, 2, 3]);
    }
}
