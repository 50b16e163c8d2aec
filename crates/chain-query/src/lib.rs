//! Query-service adaptor: batched alert/log retrieval against the
//! external search backend (spec.md §6), with a fixture-backed mock for
//! tests and offline replays.

pub mod client;
pub mod error;
mod http;
pub mod mock;

pub use client::{QueryClient, QueryServiceConfig};
pub use error::{QueryError, Result};
pub use mock::MockStore;
