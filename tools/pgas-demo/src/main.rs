use std::sync::Arc;

use anyhow::Result;
use clap::Parser;

use pgas::{accumulate_container, run_spmd, Config, Container, Distribution, ReduceOp, Team};

#[derive(Parser, Debug)]
#[command(author, version, about = "Distribute an array across a simulated PGAS team and sum it", long_about = None)]
struct Args {
    #[command(flatten)]
    config: Config,

    /// Number of elements in the demo array.
    #[arg(short = 'n', long, default_value_t = 100)]
    size: usize,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    let dist = args.config.distribution.into_distribution(args.config.block_size);
    let requested_nunits = args.config.nunits.max(1);
    let size = args.size;
    // A NONE dimension is never split across the team (its team-layout extent must stay 1), and
    // `Pattern::new` also requires the team layout's product to cover every unit in the team — so
    // a rank-1 NONE array only has one owning unit, and the rest of the requested team would have
    // nothing to do. Run with a team of 1 in that case rather than violate either precondition.
    let (nunits, team_layout) = if dist == Distribution::None {
        if requested_nunits != 1 {
            log::warn!(
                "distribution NONE does not split across units; ignoring --nunits={requested_nunits} and running with 1 unit"
            );
        }
        (1, [1])
    } else {
        (requested_nunits, [requested_nunits])
    };

    let results = run_spmd(nunits, move |transport| {
        let team = Team::new(Arc::new(transport), "pgas-demo");
        let arr: Container<i64, 1> = Container::new([size], [dist], team_layout, team.clone());

        for i in 0..size {
            let r = arr.at_index(i);
            if r.is_local() {
                r.set(i as i64);
            }
        }
        arr.barrier();

        let sum = accumulate_container(&arr, 0, ReduceOp::Sum);
        (team.myid(), arr.local_len(), sum)
    })?;

    let expected: i64 = (0..size as i64).sum();
    println!("distribution={:?} nunits={nunits} size={size} expected_sum={expected}", dist);
    for (unit, local_len, sum) in results {
        println!("  unit {unit}: local_len={local_len} reduced_sum={sum}");
    }
    Ok(())
}
