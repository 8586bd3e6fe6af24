use super::cell::UnitCell;
use serde::Deserialize;
use std::fmt;

/// Miller indices of a reflection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
pub struct Hkl {
    pub h: i32,
    pub k: i32,
    pub l: i32,
}

impl Hkl {
    pub fn new(h: i32, k: i32, l: i32) -> Self {
        Self { h, k, l }
    }
}

impl From<[i32; 3]> for Hkl {
    fn from([h, k, l]: [i32; 3]) -> Self {
        Self { h, k, l }
    }
}

/// A single entry of a phase's reflection list.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Reflection {
    #[serde(with = "hkl_triplet")]
    pub hkl: Hkl,
    pub multiplicity: u32,
    #[serde(default)]
    pub intensity: f64,
}

impl Reflection {
    pub fn new(hkl: impl Into<Hkl>, multiplicity: u32, intensity: f64) -> Self {
        Self {
            hkl: hkl.into(),
            multiplicity,
            intensity,
        }
    }
}

mod hkl_triplet {
    use super::Hkl;
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Hkl, D::Error> {
        <[i32; 3]>::deserialize(deserializer).map(Hkl::from)
    }
}

/// A refinable crystalline component of a diffraction pattern.
///
/// Phases are long-lived: they are created once per sample and their values are
/// overwritten in place after every successful refinement stage. Profile
/// parameters follow FullProf's pseudo-Voigt conventions, where `u`, `v` and
/// `w` are the Caglioti half-width terms and `eta`/`x` control the shape.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct Phase {
    /// Human-readable name, written as the first line of the phase block.
    pub name: String,
    /// Space-group symbol in FullProf notation (e.g. `F d -3 m`).
    pub space_group: String,
    pub unit_cell: UnitCell,
    #[serde(default = "defaults::scale_factor")]
    pub scale_factor: f64,
    /// Estimated standard deviation of the scale factor from the last refinement.
    #[serde(default)]
    pub scale_error: f64,
    /// Overall isotropic temperature factor (`Bov`).
    #[serde(default)]
    pub isotropic_temp: f64,
    #[serde(default = "defaults::u")]
    pub u: f64,
    #[serde(default = "defaults::v")]
    pub v: f64,
    #[serde(default = "defaults::w")]
    pub w: f64,
    /// Isotropic Gaussian size broadening (`I_g`).
    #[serde(default)]
    pub i_g: f64,
    #[serde(default = "defaults::eta")]
    pub eta: f64,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub reflections: Vec<Reflection>,
}

mod defaults {
    pub fn scale_factor() -> f64 {
        1.0
    }
    pub fn u() -> f64 {
        0.008
    }
    pub fn v() -> f64 {
        -0.004
    }
    pub fn w() -> f64 {
        0.003
    }
    pub fn eta() -> f64 {
        0.5
    }
}

impl Phase {
    /// Creates a phase with default profile parameters and no reflections.
    ///
    /// # Arguments
    ///
    /// * `name` - Display name of the phase.
    /// * `space_group` - FullProf space-group symbol.
    /// * `unit_cell` - Starting lattice parameters.
    pub fn new(name: impl Into<String>, space_group: impl Into<String>, unit_cell: UnitCell) -> Self {
        Self {
            name: name.into(),
            space_group: space_group.into(),
            unit_cell,
            scale_factor: defaults::scale_factor(),
            scale_error: 0.0,
            isotropic_temp: 0.0,
            u: defaults::u(),
            v: defaults::v(),
            w: defaults::w(),
            i_g: 0.0,
            eta: defaults::eta(),
            x: 0.0,
            reflections: Vec::new(),
        }
    }

    pub fn with_reflections(mut self, reflections: Vec<Reflection>) -> Self {
        self.reflections = reflections;
        self
    }

    /// Expected full width at half maximum at the diffraction angle `two_theta`.
    ///
    /// Uses the cached width parameters: `FWHM² = (u + v)·tan²(2θ) + w`, with
    /// the tangent taken of `two_theta` itself.
    /// A negative `FWHM²` yields zero width.
    ///
    /// # Arguments
    ///
    /// * `two_theta` - Diffraction angle 2θ in degrees.
    pub fn fwhm(&self, two_theta: f64) -> f64 {
        let tan_squared = two_theta.to_radians().tan().powi(2);
        let width_squared = self.u * tan_squared + self.v * tan_squared + self.w;
        if width_squared >= 0.0 {
            width_squared.sqrt()
        } else {
            0.0
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}
