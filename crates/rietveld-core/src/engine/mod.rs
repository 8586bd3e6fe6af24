//! # Engine Module
//!
//! The machinery behind a single refinement stage: snapshotting the phase
//! model into a [`context::RefinementContext`], freeing parameters for a
//! [`stages::Stage`], rendering the input deck, running the solver and
//! tracking which stages have converged.
//!
//! ## Architecture
//!
//! - **Configuration** ([`config`]) - File root, cleanup policy, solver timeout and initial corrections
//! - **Context** ([`context`]) - Typed deck values and sequentially allocated codewords
//! - **Stages** ([`stages`]) - Which parameters each refinement stage frees
//! - **Deck** ([`deck`]) - Rendering of the FullProf control file
//! - **Solver** ([`solver`]) - The [`solver::Solver`] seam and the FullProf process runner
//! - **Workspace** ([`workspace`]) - Paths of every file belonging to one refinement
//! - **State Tracking** ([`state`]) - Per-stage status and the last chi-squared
//! - **Progress Monitoring** ([`progress`]) - Events for user-facing progress displays
//! - **Error Handling** ([`error`]) - The refinement error taxonomy

pub mod config;
pub mod context;
pub mod deck;
pub mod error;
pub mod progress;
pub mod solver;
pub mod stages;
pub mod state;
pub mod workspace;
