//! # Core Module
//!
//! Stateless building blocks shared by the engine and workflows.
//!
//! - **Molecular Representation** ([`models`]) - Molecular graphs and the reaction-class taxonomy
//! - **Connectivity** ([`topology`]) - Hydrogen handling, rings and resonance structures
//! - **Math and Lookup Tables** ([`utils`]) - Signed volumes, distance matrices, finite
//!   differences, element valences and permutation parity
//!
//! Nothing in this layer holds state between calls.

pub mod models;
pub mod topology;
pub mod utils;
