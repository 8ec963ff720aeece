//! # Workflows Module
//!
//! High-level entry points that validate their inputs, wire the engine
//! together and log progress.
//!
//! - **Cleanup Workflow** ([`cleanup`]) - Refinement of embedded coordinates
//!   against distance bounds and chirality/planarity constraints, including the
//!   mirror-image check on the starting structure.

pub mod cleanup;
