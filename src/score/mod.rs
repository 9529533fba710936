//! Best-practice scoring.
//!
//! `rules` holds the immutable rule table built once at startup; `factory`
//! turns raw rows into typed, dependency-attached, scored records.

pub mod factory;
pub mod rules;

pub use factory::RecordFactory;
pub use rules::{RuleSet, ScoreRule};
