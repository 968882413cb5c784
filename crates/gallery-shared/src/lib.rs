//! Pieces every gallery binary shares: the error envelope, API response
//! types, bearer-token extractors, telemetry setup and the Postgres pool.

pub mod clients;
pub mod errors;
pub mod middleware;
pub mod types;

pub use errors::{AppError, AppResult, ErrorCode};
pub use types::*;
