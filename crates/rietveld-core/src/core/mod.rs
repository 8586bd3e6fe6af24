//! # Core Module
//!
//! Fundamental building blocks for describing a refinement problem and for
//! talking to the FullProf solver through its files.
//!
//! ## Architecture
//!
//! - **Crystalline Phases** ([`models`]) - Phases, unit cells, reflections and the ordered phase model
//! - **Solver Files** ([`io`]) - Reflection lists, observed data, summary and profile outputs
//! - **Numerics** ([`utils`]) - Cubic-spline interpolation and small statistics helpers

pub mod io;
pub mod models;
pub mod utils;
