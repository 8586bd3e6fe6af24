//! # Rietveld Core Library
//!
//! Orchestration of Rietveld refinements performed by the external FullProf
//! least-squares solver.
//!
//! ## Architectural Philosophy
//!
//! The library keeps the same three-layer split throughout:
//!
//! - **[`core`]: The Foundation.** Stateless data models (`Phase`, `UnitCell`,
//!   `PhaseModel`, global corrections), the file formats exchanged with the
//!   solver (reflection lists, observed data, summary and profile outputs) and
//!   numeric utilities such as cubic-spline resampling.
//!
//! - **[`engine`]: The Logic Core.** Per-invocation refinement contexts and
//!   their codewords, the input deck, the solver abstraction, the file-root
//!   handle, stage bookkeeping and the error taxonomy.
//!
//! - **[`workflows`]: The Public API.** The [`workflows::refinement::Refinement`]
//!   stage sequencer, which lazily runs the minimal refinement stage needed to
//!   answer a query and folds refined values back into the phase model.

pub mod core;
pub mod engine;
pub mod workflows;
