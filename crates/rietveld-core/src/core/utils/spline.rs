use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum SplineError {
    #[error("At least two knots are required, got {0}")]
    TooFewPoints(usize),
    #[error("Knot abscissae and ordinates differ in length ({x} vs {y})")]
    LengthMismatch { x: usize, y: usize },
    #[error("Knot abscissae must be strictly increasing (violated at index {index})")]
    NotIncreasing { index: usize },
    #[error("Knot values must be finite (violated at index {index})")]
    NonFinite { index: usize },
}

/// Piecewise-cubic interpolant with not-a-knot end conditions.
///
/// The third derivative is continuous across the second and the second-to-last
/// knot, so any cubic polynomial is reproduced exactly. Two knots degrade to a
/// straight line and three knots to the parabola through them. Queries outside
/// the knot range are extrapolated with the first or last segment.
#[derive(Debug, Clone)]
pub struct CubicSpline {
    x: Vec<f64>,
    y: Vec<f64>,
    /// Second derivative of the interpolant at each knot.
    m: Vec<f64>,
}

impl CubicSpline {
    /// Fits a spline through the knots `(x[i], y[i])`.
    ///
    /// # Errors
    ///
    /// Returns [`SplineError`] for fewer than two knots, mismatched lengths,
    /// non-finite values, or abscissae that are not strictly increasing.
    pub fn new(x: &[f64], y: &[f64]) -> Result<Self, SplineError> {
        if x.len() != y.len() {
            return Err(SplineError::LengthMismatch {
                x: x.len(),
                y: y.len(),
            });
        }
        if x.len() < 2 {
            return Err(SplineError::TooFewPoints(x.len()));
        }
        if let Some(index) = x
            .iter()
            .zip(y)
            .position(|(xi, yi)| !xi.is_finite() || !yi.is_finite())
        {
            return Err(SplineError::NonFinite { index });
        }
        if let Some(index) = x.windows(2).position(|w| w[1] <= w[0]) {
            return Err(SplineError::NotIncreasing { index: index + 1 });
        }

        let m = second_derivatives(x, y);
        Ok(Self {
            x: x.to_vec(),
            y: y.to_vec(),
            m,
        })
    }

    /// Evaluates the spline at `t`. Knot abscissae return the knot value exactly.
    pub fn evaluate(&self, t: f64) -> f64 {
        let n = self.x.len();
        let upper = self.x.partition_point(|&xi| xi <= t);
        if upper > 0 && self.x[upper - 1] == t {
            return self.y[upper - 1];
        }
        let i = upper.saturating_sub(1).min(n - 2);

        let h = self.x[i + 1] - self.x[i];
        let a = self.x[i + 1] - t;
        let b = t - self.x[i];
        self.m[i] * a.powi(3) / (6.0 * h)
            + self.m[i + 1] * b.powi(3) / (6.0 * h)
            + (self.y[i] / h - self.m[i] * h / 6.0) * a
            + (self.y[i + 1] / h - self.m[i + 1] * h / 6.0) * b
    }

    /// Evaluates the spline at every abscissa in `new_x`.
    pub fn evaluate_all(&self, new_x: &[f64]) -> Vec<f64> {
        new_x.iter().map(|&t| self.evaluate(t)).collect()
    }
}

/// Takes a set of xy data and re-samples it at new abscissae.
///
/// Used when the solver's output grid does not match the caller's grid.
pub fn respline(x: &[f64], y: &[f64], new_x: &[f64]) -> Result<Vec<f64>, SplineError> {
    Ok(CubicSpline::new(x, y)?.evaluate_all(new_x))
}

fn second_derivatives(x: &[f64], y: &[f64]) -> Vec<f64> {
    let n = x.len();
    let h: Vec<f64> = x.windows(2).map(|w| w[1] - w[0]).collect();
    let d: Vec<f64> = (0..n - 1).map(|i| (y[i + 1] - y[i]) / h[i]).collect();

    match n {
        2 => return vec![0.0; 2],
        3 => return vec![2.0 * (d[1] - d[0]) / (x[2] - x[0]); 3],
        _ => {}
    }

    // Interior rows i = 1..n-2, with M[0] and M[n-1] eliminated through the
    // not-a-knot conditions so the remaining system stays tridiagonal.
    let size = n - 2;
    let mut sub: Vec<f64> = (1..n - 1).map(|i| h[i - 1]).collect();
    let mut diag: Vec<f64> = (1..n - 1).map(|i| 2.0 * (h[i - 1] + h[i])).collect();
    let mut sup: Vec<f64> = (1..n - 1).map(|i| h[i]).collect();
    let mut rhs: Vec<f64> = (1..n - 1).map(|i| 6.0 * (d[i] - d[i - 1])).collect();

    let (h0, h1) = (h[0], h[1]);
    diag[0] += h0 * (h0 + h1) / h1;
    sup[0] -= h0 * h0 / h1;

    let (ha, hb) = (h[n - 3], h[n - 2]);
    sub[size - 1] -= hb * hb / ha;
    diag[size - 1] += hb * (ha + hb) / ha;

    for k in 1..size {
        let w = sub[k] / diag[k - 1];
        diag[k] -= w * sup[k - 1];
        rhs[k] -= w * rhs[k - 1];
    }
    let mut interior = vec![0.0; size];
    interior[size - 1] = rhs[size - 1] / diag[size - 1];
    for k in (0..size - 1).rev() {
        interior[k] = (rhs[k] - sup[k] * interior[k + 1]) / diag[k];
    }

    let first = ((h0 + h1) * interior[0] - h0 * interior[1]) / h1;
    let last = ((ha + hb) * interior[size - 1] - hb * interior[size - 2]) / ha;

    let mut m = Vec::with_capacity(n);
    m.push(first);
    m.extend(interior);
    m.push(last);
    m
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cubic(t: f64) -> f64 {
        t.powi(3) - 2.0 * t + 1.0
    }

    #[test]
    fn reproduces_knot_values_exactly() {
        let x = [10.0, 10.02, 10.04, 10.06, 10.08, 10.10];
        let y = [120.0, 133.5, 180.25, 141.0, 119.75, 118.0];
        let resampled = respline(&x, &y, &x).unwrap();
        assert_eq!(resampled, y.to_vec());
    }

    #[test]
    fn reproduces_cubic_polynomials_on_irregular_grid() {
        let x = [0.0, 0.5, 1.7, 2.0, 3.1, 4.0];
        let y: Vec<f64> = x.iter().map(|&t| cubic(t)).collect();
        let spline = CubicSpline::new(&x, &y).unwrap();
        for t in [0.3, 1.1, 2.5, 3.9] {
            assert!((spline.evaluate(t) - cubic(t)).abs() < 1e-9);
        }
    }

    #[test]
    fn extrapolates_with_end_segments() {
        let x = [0.0, 1.0, 2.0, 3.0, 4.0];
        let y: Vec<f64> = x.iter().map(|&t| cubic(t)).collect();
        let spline = CubicSpline::new(&x, &y).unwrap();
        assert!((spline.evaluate(-1.0) - cubic(-1.0)).abs() < 1e-9);
        assert!((spline.evaluate(5.0) - cubic(5.0)).abs() < 1e-9);
    }

    #[test]
    fn two_knots_interpolate_linearly() {
        let spline = CubicSpline::new(&[0.0, 2.0], &[1.0, 5.0]).unwrap();
        assert!((spline.evaluate(0.5) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn three_knots_follow_the_parabola() {
        let x = [0.0, 1.0, 3.0];
        let y: Vec<f64> = x.iter().map(|&t| t * t).collect();
        let spline = CubicSpline::new(&x, &y).unwrap();
        assert!((spline.evaluate(2.0) - 4.0).abs() < 1e-12);
    }

    #[test]
    fn rejects_invalid_knots() {
        assert_eq!(
            CubicSpline::new(&[1.0], &[1.0]).unwrap_err(),
            SplineError::TooFewPoints(1)
        );
        assert_eq!(
            CubicSpline::new(&[1.0, 2.0], &[1.0]).unwrap_err(),
            SplineError::LengthMismatch { x: 2, y: 1 }
        );
        assert_eq!(
            CubicSpline::new(&[1.0, 3.0, 2.0], &[0.0, 0.0, 0.0]).unwrap_err(),
            SplineError::NotIncreasing { index: 2 }
        );
        assert_eq!(
            CubicSpline::new(&[1.0, 2.0], &[0.0, f64::NAN]).unwrap_err(),
            SplineError::NonFinite { index: 1 }
        );
    }
}
