//! # Engine Module
//!
//! The numerical and combinatorial machinery behind the workflows.
//!
//! ## Architecture
//!
//! - **Configuration** ([`config`]) - Cleanup parameters, error-function weights and TOML loading
//! - **Error Handling** ([`error`]) - Engine-specific error types
//! - **Error Function** ([`error_function`]) - Distance-geometry penalty and its gradient
//! - **Line Search** ([`line_search`]) - Bracketing and Brent minimization along a direction
//! - **Minimizer** ([`minimizer`]) - Conjugate-gradient descent with pluggable convergence tests
//! - **Progress Monitoring** ([`progress`]) - Observer callbacks for long-running minimizations
//! - **Stereochemistry** ([`stereo`]) - Branch priorities, stereogenic centers and parity conventions

pub mod config;
pub mod error;
pub mod error_function;
pub mod line_search;
pub mod minimizer;
pub mod progress;
pub mod stereo;
