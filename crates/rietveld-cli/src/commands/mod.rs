pub mod inspect;
pub mod refine;
