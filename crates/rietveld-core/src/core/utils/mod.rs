pub mod spline;
pub mod stats;
