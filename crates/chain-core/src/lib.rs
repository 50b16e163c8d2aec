//! Shared domain types, configuration, and error kinds for the incident
//! process chain platform.

pub mod chain;
pub mod config;
pub mod error;
pub mod types;

pub use chain::{
    AlarmNodeInfo, ChainNodeInfo, EdgeLabel, EntityPayload, IncidentEdge, IncidentNode,
    IncidentProcessChain, NodeKind, ProcessEntity, StoryNodeInfo,
};
pub use config::ChainConfig;
pub use error::{ChainError, Result};
pub use types::{EventPayload, IpMappingRelation, LogType, RawAlarm, RawLog, Severity};
