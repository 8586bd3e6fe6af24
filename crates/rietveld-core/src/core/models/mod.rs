//! # Core Models Module
//!
//! Data structures describing the crystalline phases being refined.
//!
//! ## Key Components
//!
//! - [`cell`] - Unit-cell value object with metric-tensor helpers
//! - [`corrections`] - Pattern-wide background and instrument corrections
//! - [`phase`] - A refinable phase with its profile parameters and reflections
//! - [`model`] - The ordered collection of phases owned by a refinement
//! - [`ids`] - Opaque phase identifiers
//!
//! ## Usage
//!
//! ```ignore
//! use rietveld::core::models::{cell::UnitCell, model::PhaseModel, phase::Phase};
//!
//! let mut model = PhaseModel::new();
//! let spinel = Phase::new("LiMn2O4", "F d -3 m", UnitCell::cubic(8.24));
//! let id = model.add_phase(spinel);
//! model.phase_mut(id).unwrap().scale_factor = 2.0;
//! ```

pub mod cell;
pub mod corrections;
pub mod ids;
pub mod model;
pub mod phase;
