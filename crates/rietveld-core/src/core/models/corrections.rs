use serde::Deserialize;

/// Number of terms in FullProf's polynomial background.
pub const BACKGROUND_TERMS: usize = 6;

/// Sixth-degree polynomial background shared by all phases of a pattern.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Background {
    pub coeffs: [f64; BACKGROUND_TERMS],
}

/// Instrument-level corrections applied to the whole pattern.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields, default)]
pub struct Instrument {
    /// Zero-point shift of the 2θ axis.
    pub zero: f64,
    /// Sample displacement, the cos θ dependent shift (`SyCos`).
    pub displacement: f64,
    /// Sample transparency, the sin θ dependent shift (`SySin`).
    pub transparency: f64,
    pub wavelength_1: f64,
    pub wavelength_2: f64,
    /// Intensity ratio of the second wavelength to the first.
    pub wavelength_ratio: f64,
}

impl Default for Instrument {
    fn default() -> Self {
        Self {
            zero: 0.0,
            displacement: 0.00032,
            transparency: -0.00810,
            wavelength_1: 1.540560,
            wavelength_2: 1.544330,
            wavelength_ratio: 0.5,
        }
    }
}
