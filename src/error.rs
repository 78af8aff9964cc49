//! The two error kinds the runtime returns a `Result` for. Everything else (precondition
//! violations, transport errors mid-collective, collective mismatches) is an assertion, never a
//! `Result` — see `docs` on [`crate::reduce::accumulate`] and the `debug_assert!`s scattered
//! through `pattern` and `memory` for that half of the policy.

use thiserror::Error;

pub use pgas_transport::TransportError;

#[derive(Debug, Error)]
pub enum PgasError {
    #[error(transparent)]
    Transport(#[from] TransportError),
}

pub type Result<T> = std::result::Result<T, PgasError>;
