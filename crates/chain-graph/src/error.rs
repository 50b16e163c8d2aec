//! Errors surfaced internally during graph construction.
//!
//! Per spec.md §7, none of these propagate out of the public engine
//! API — `GraphBuilder`/`Pruner` log and degrade in place. The type
//! exists so internal stages can use `?` and so tests can assert on the
//! specific failure that was swallowed.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum GraphError {
    #[error("node {0} not found")]
    NodeNotFound(String),

    #[error("edge ({0}, {1}) would create a self-loop")]
    SelfLoop(String, String),

    #[error("edge ({0}, {1}) would introduce a cycle (reverse edge already present)")]
    CycleRejected(String, String),

    #[error("pruning failed: {0}")]
    PruneFailure(String),
}

pub type Result<T> = std::result::Result<T, GraphError>;
