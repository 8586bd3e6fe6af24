use nalgebra::{Matrix3, Vector3};
use serde::Deserialize;

const RIGHT_ANGLE: f64 = 90.0;

fn right_angle() -> f64 {
    RIGHT_ANGLE
}

/// The six lattice parameters of a crystallographic unit cell.
///
/// Lengths are in ångström and angles in degrees. The cell is a plain value
/// object: refinement overwrites all six parameters at once, and the helpers
/// here only derive quantities from the current values.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct UnitCell {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    #[serde(default = "right_angle")]
    pub alpha: f64,
    #[serde(default = "right_angle")]
    pub beta: f64,
    #[serde(default = "right_angle")]
    pub gamma: f64,
}

impl UnitCell {
    /// Creates a unit cell from all six lattice parameters.
    pub fn new(a: f64, b: f64, c: f64, alpha: f64, beta: f64, gamma: f64) -> Self {
        Self {
            a,
            b,
            c,
            alpha,
            beta,
            gamma,
        }
    }

    /// Creates a cubic cell with edge length `a`.
    pub fn cubic(a: f64) -> Self {
        Self::new(a, a, a, RIGHT_ANGLE, RIGHT_ANGLE, RIGHT_ANGLE)
    }

    /// Creates a hexagonal cell (`gamma` = 120°).
    pub fn hexagonal(a: f64, c: f64) -> Self {
        Self::new(a, a, c, RIGHT_ANGLE, RIGHT_ANGLE, 120.0)
    }

    /// Creates a tetragonal cell.
    pub fn tetragonal(a: f64, c: f64) -> Self {
        Self::new(a, a, c, RIGHT_ANGLE, RIGHT_ANGLE, RIGHT_ANGLE)
    }

    /// Returns the parameters in deck order: `[a, b, c, alpha, beta, gamma]`.
    pub fn as_array(&self) -> [f64; 6] {
        [self.a, self.b, self.c, self.alpha, self.beta, self.gamma]
    }

    /// Overwrites all six parameters from deck order.
    pub fn set_from_array(&mut self, params: [f64; 6]) {
        let [a, b, c, alpha, beta, gamma] = params;
        *self = Self::new(a, b, c, alpha, beta, gamma);
    }

    /// Computes the real-space metric tensor `G`.
    ///
    /// # Return
    ///
    /// The symmetric 3×3 matrix of basis-vector dot products.
    pub fn metric_tensor(&self) -> Matrix3<f64> {
        let (ca, cb, cg) = (
            self.alpha.to_radians().cos(),
            self.beta.to_radians().cos(),
            self.gamma.to_radians().cos(),
        );
        let ab = self.a * self.b * cg;
        let ac = self.a * self.c * cb;
        let bc = self.b * self.c * ca;
        Matrix3::new(
            self.a * self.a,
            ab,
            ac,
            ab,
            self.b * self.b,
            bc,
            ac,
            bc,
            self.c * self.c,
        )
    }

    /// Computes the cell volume in Å³ as `sqrt(det G)`.
    pub fn volume(&self) -> f64 {
        self.metric_tensor().determinant().max(0.0).sqrt()
    }

    /// Computes the interplanar spacing for the reflection `(h, k, l)`.
    ///
    /// # Arguments
    ///
    /// * `h`, `k`, `l` - Miller indices of the lattice plane.
    ///
    /// # Return
    ///
    /// Returns `None` for a degenerate cell or for `(0, 0, 0)`.
    pub fn d_spacing(&self, h: i32, k: i32, l: i32) -> Option<f64> {
        let reciprocal = self.metric_tensor().try_inverse()?;
        let hkl = Vector3::new(h as f64, k as f64, l as f64);
        let inv_d_squared = hkl.dot(&(reciprocal * hkl));
        if inv_d_squared > 0.0 {
            Some(1.0 / inv_d_squared.sqrt())
        } else {
            None
        }
    }
}
