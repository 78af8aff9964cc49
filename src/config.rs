//! Runtime-wide configuration: team size, default distribution, default block size. Consumed by
//! the demo binary and by integration tests that want to vary `nunits` without recompiling.

use clap::Parser;

use crate::pattern::Distribution;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// Number of units in the root team.
    #[arg(short, long, default_value_t = num_cpus::get())]
    pub nunits: usize,

    /// Default per-dimension block size for `TILE(k)` / `BLOCKCYCLIC(k)` when not given
    /// explicitly to a container constructor.
    #[arg(short, long, default_value_t = 1)]
    pub block_size: usize,

    /// Default distribution applied to newly-constructed containers that do not specify one.
    #[arg(short, long, value_enum, default_value_t = DefaultDistribution::Blocked)]
    pub distribution: DefaultDistribution,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, clap::ValueEnum)]
pub enum DefaultDistribution {
    None,
    Blocked,
    Cyclic,
}

impl DefaultDistribution {
    pub fn into_distribution(self, block_size: usize) -> Distribution {
        match self {
            DefaultDistribution::None => Distribution::None,
            DefaultDistribution::Blocked => Distribution::Blocked,
            DefaultDistribution::Cyclic => Distribution::BlockCyclic(block_size.max(1)),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            nunits: num_cpus::get(),
            block_size: 1,
            distribution: DefaultDistribution::Blocked,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_blocked() {
        let cfg = Config::default();
        assert_eq!(cfg.distribution.into_distribution(4), Distribution::Blocked);
    }

    #[test]
    fn cyclic_carries_block_size() {
        assert_eq!(
            DefaultDistribution::Cyclic.into_distribution(8),
            Distribution::BlockCyclic(8)
        );
    }
}
