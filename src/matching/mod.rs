//! Candidate finding and automatic matching

pub mod candidates;
pub mod engine;

pub use candidates::{find_candidates, MatchingConfig};
pub use engine::{ItemMatchResult, ItemOutcome, MatchingEngine, MatchingReport};
