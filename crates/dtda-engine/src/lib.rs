//! dtda-engine — Query resolution and caching for the disease/target/drug agent.
//!
//! - `terms`: alternate lookup keys for an entity
//! - `relations`: memoised drug ↔ target resolution
//! - `mutation_effect`: does a substitution activate or deactivate a protein
//! - `statistics`: most-mutated gene of a disease and its typical effect
//! - `mechanisms`: modification activity and immediate relations
//!
//! `Dtda` wires them over one statement source and one study source.

pub mod cache;
pub mod terms;
pub mod gene_panel;
pub mod relations;
pub mod mutation_effect;
pub mod statistics;
pub mod mechanisms;
pub mod engine;

pub use cache::{build_cache, LruResultCache, MemoryCache, ResultCache};
pub use engine::{Dtda, EngineConfig};
pub use mechanisms::{MechanismFinder, Polarity};
pub use mutation_effect::MutationMatcher;
pub use relations::RelationResolver;
pub use statistics::{
    DiseaseMutationAggregator, EffectDistribution, EffectTally, GeneMutationStats,
    MutationStatistics, TopMutation,
};
pub use terms::extract_terms;
