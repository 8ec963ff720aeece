//! # molgeom
//!
//! Geometry cleanup and graph stereochemistry for molecular structures.
//!
//! ## Architectural Philosophy
//!
//! The library follows a three-layer layout:
//!
//! - **[`core`]: The Foundation.** Stateless data models (`MolecularGraph`,
//!   `ReactionClass`), graph topology queries (hydrogens, rings, resonance) and
//!   geometric utilities.
//!
//! - **[`engine`]: The Logic Core.** The distance-geometry error function, the
//!   line search and conjugate-gradient minimizer, and the stereo priority and
//!   assignment algorithms.
//!
//! - **[`workflows`]: The Public API.** Complete procedures such as coordinate
//!   cleanup, with configuration validation, logging and progress reporting.

pub mod core;
pub mod engine;
pub mod workflows;
