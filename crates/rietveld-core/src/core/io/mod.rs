//! Provides the file formats exchanged with the FullProf solver.
//!
//! Input files (observed data, reflection lists) share the [`traits::InputFile`]
//! interface. Output files are read by dedicated parsers: the refinement
//! summary is scanned into typed sections, and the tab-separated profile file
//! becomes the calculated diffractogram used for resampling.

pub mod hkl;
pub mod pattern;
pub mod prf;
pub mod summary;
pub mod traits;
