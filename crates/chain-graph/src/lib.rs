//! Graph construction, analysis, pruning, and bridging engine.
//!
//! Implements spec.md §4's pipeline over the wire types defined in
//! `chain_core`, fed by `chain_query`'s backend client.

pub mod analyzer;
pub mod bridge;
pub mod builder;
pub mod convert;
pub mod diagnostics;
pub mod elector;
pub mod engine;
pub mod entity_filter;
pub mod error;
pub mod explore;
pub mod extractor;
pub mod graph;
pub mod pruner;

pub use diagnostics::{BuildDiagnostics, GraphStats};
pub use engine::{IncidentChainEngine, NetworkBridgeInput};
pub use error::{GraphError, Result};
pub use graph::{Graph, GraphEdge, GraphNode};
