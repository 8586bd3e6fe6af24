//! # Workflows Module
//!
//! High-level entry points that drive complete refinements.
//!
//! ## Overview
//!
//! A workflow owns the phase model and the global corrections for one
//! observed pattern, runs refinement stages through a [`crate::engine::solver::Solver`]
//! and answers queries (background, cell parameters, phase fractions,
//! predicted profile) from the refined state, refining on demand.
//!
//! ## Architecture
//!
//! - **Staged Refinement** ([`refinement`]) - Stage sequencing, memoised
//!   accessors and interpolation of the solver's calculated profile.

pub mod refinement;
