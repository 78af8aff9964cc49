use thiserror::Error;

/// Transport-layer precondition violations are asserted and treated as fatal once a collective is
/// underway. The one place a `Result` is appropriate is cluster *construction*, before any unit
/// has made a collective promise to any other — an ordinary environment failure (not enough
/// threads, a bad `nunits`), not a precondition violation.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("team of {requested} units cannot be constructed: {reason}")]
    ClusterSetup { requested: usize, reason: String },
}
