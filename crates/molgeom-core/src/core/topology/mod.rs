//! # Topology Module
//!
//! Connectivity queries over [`MolecularGraph`](crate::core::models::graph::MolecularGraph)
//! values that the stereo engine builds on.
//!
//! - [`hydrogens`] - Conversion between implicit and explicit hydrogens, and the
//!   backbone / explicit-hydrogen partition of a graph
//! - [`rings`] - Smallest rings through each ring bond
//! - [`resonance`] - Resonance dominant bond orders and atom hybridizations
//!
//! All queries are pure: they read a graph and return new values.

pub mod hydrogens;
pub mod resonance;
pub mod rings;
