//! dtda-common — Shared types, errors, and the HTTP client used across all DTDA crates.

pub mod error;
pub mod entities;
pub mod statements;
pub mod sandbox;

// Re-export commonly used types
pub use entities::{Agent, AminoAcidChange, DrugRef, LookupKey, MutationEffect, MutationType, Namespace};
pub use error::{DtdaError, Result};
pub use statements::{
    ActiveFormAssertion, AgentState, Evidence, ModCondition, MutCondition, RelationStatement,
    StatementType,
};
