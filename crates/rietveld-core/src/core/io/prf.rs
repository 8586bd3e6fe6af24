use crate::core::utils::spline::{SplineError, respline};
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use thiserror::Error;

/// Number of preamble lines preceding the column header.
const HEADER_SKIP_ROWS: usize = 3;

#[derive(Debug, Error)]
pub enum PrfError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Result file is missing the '{0}' column")]
    MissingColumn(&'static str),
    #[error("Result file contains no profile rows")]
    Empty,
}

/// Columns of the calculated profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    TwoTheta,
    Observed,
    Calculated,
    Residual,
    Background,
}

impl Column {
    const ALL: [Column; 5] = [
        Column::TwoTheta,
        Column::Observed,
        Column::Calculated,
        Column::Residual,
        Column::Background,
    ];

    /// Header label as written by FullProf (surrounding whitespace trimmed).
    pub fn header(self) -> &'static str {
        match self {
            Column::TwoTheta => "2Theta",
            Column::Observed => "Yobs",
            Column::Calculated => "Ycal",
            Column::Residual => "Yobs-Ycal",
            Column::Background => "Backg",
        }
    }
}

/// The solver's calculated diffractogram on its native angle grid.
#[derive(Debug, Clone, PartialEq)]
pub struct CalculatedDiffractogram {
    pub two_theta: Vec<f64>,
    pub observed: Vec<f64>,
    pub calculated: Vec<f64>,
    pub residual: Vec<f64>,
    pub background: Vec<f64>,
}

impl CalculatedDiffractogram {
    /// Reads a tab-separated profile file.
    ///
    /// The first three lines are skipped, the fourth holds column names, and
    /// the profile block ends at the first row whose five columns do not all
    /// parse as numbers (FullProf appends reflection markers after it).
    ///
    /// # Errors
    ///
    /// Returns [`PrfError`] if reading fails, a required column is absent, or
    /// no profile row is found.
    pub fn read_from(reader: &mut impl BufRead) -> Result<Self, PrfError> {
        let mut skipped = String::new();
        for _ in 0..HEADER_SKIP_ROWS {
            skipped.clear();
            reader.read_line(&mut skipped)?;
        }

        let mut csv_reader = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = csv_reader.headers()?.clone();
        let mut indices = [0usize; 5];
        for (slot, column) in indices.iter_mut().zip(Column::ALL) {
            *slot = headers
                .iter()
                .position(|h| h == column.header())
                .ok_or(PrfError::MissingColumn(column.header()))?;
        }

        let mut diffractogram = Self {
            two_theta: Vec::new(),
            observed: Vec::new(),
            calculated: Vec::new(),
            residual: Vec::new(),
            background: Vec::new(),
        };
        for record in csv_reader.records() {
            let record = record?;
            let row: Option<Vec<f64>> = indices
                .iter()
                .map(|&i| record.get(i).and_then(|field| field.parse().ok()))
                .collect();
            let Some(row) = row else {
                break;
            };
            diffractogram.two_theta.push(row[0]);
            diffractogram.observed.push(row[1]);
            diffractogram.calculated.push(row[2]);
            diffractogram.residual.push(row[3]);
            diffractogram.background.push(row[4]);
        }

        if diffractogram.two_theta.is_empty() {
            return Err(PrfError::Empty);
        }
        Ok(diffractogram)
    }

    pub fn read_from_path<P: AsRef<Path>>(path: P) -> Result<Self, PrfError> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        Self::read_from(&mut reader)
    }

    pub fn column(&self, column: Column) -> &[f64] {
        match column {
            Column::TwoTheta => &self.two_theta,
            Column::Observed => &self.observed,
            Column::Calculated => &self.calculated,
            Column::Residual => &self.residual,
            Column::Background => &self.background,
        }
    }

    pub fn len(&self) -> usize {
        self.two_theta.len()
    }

    pub fn is_empty(&self) -> bool {
        self.two_theta.is_empty()
    }

    /// Interpolates `column` onto the caller's angle grid with a cubic spline
    /// through the native grid.
    pub fn resample(&self, column: Column, two_theta: &[f64]) -> Result<Vec<f64>, SplineError> {
        respline(&self.two_theta, self.column(column), two_theta)
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    /// Formats a profile file in FullProf's tab-separated layout.
    ///
    /// Rows are `(2θ, Yobs, Ycal, Backg)`; the residual column is derived.
    pub fn prf_text(rows: &[(f64, f64, f64, f64)]) -> String {
        let mut text = String::from(
            "sample refinement\n  1  2000  1.54056  1.54439  0.00000  0.00000  0.00000    0\n\
             2 reflections\n \t2Theta\tYobs\tYcal\tYobs-Ycal\tBackg\tPosr\t(hkl)\tK\n",
        );
        for (two_theta, obs, calc, bg) in rows {
            text.push_str(&format!(
                " \t{}\t{}\t{}\t{}\t{}\n",
                two_theta,
                obs,
                calc,
                obs - calc,
                bg
            ));
        }
        text.push_str(" \t\t\t\t\t\t18.6621\t(  1  1  1)\t1\n");
        text
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::prf_text;
    use super::*;
    use std::io::Cursor;

    fn rows() -> Vec<(f64, f64, f64, f64)> {
        (0..8)
            .map(|i| {
                let t = 18.0 + 0.25 * i as f64;
                (t, 100.0 + i as f64, 98.0 + 1.5 * i as f64, 20.0 - 0.5 * i as f64)
            })
            .collect()
    }

    #[test]
    fn reads_profile_block_and_stops_at_reflection_markers() {
        let text = prf_text(&rows());
        let diffractogram = CalculatedDiffractogram::read_from(&mut Cursor::new(text)).unwrap();
        assert_eq!(diffractogram.len(), 8);
        assert_eq!(diffractogram.two_theta[1], 18.25);
        assert_eq!(diffractogram.calculated[2], 101.0);
        assert_eq!(diffractogram.background[7], 16.5);
        assert_eq!(diffractogram.residual[0], 2.0);
    }

    #[test]
    fn resampling_onto_native_grid_is_exact() {
        let text = prf_text(&rows());
        let diffractogram = CalculatedDiffractogram::read_from(&mut Cursor::new(text)).unwrap();
        let grid = diffractogram.two_theta.clone();
        assert_eq!(
            diffractogram.resample(Column::Calculated, &grid).unwrap(),
            diffractogram.calculated
        );
        assert_eq!(
            diffractogram.resample(Column::Background, &grid).unwrap(),
            diffractogram.background
        );
    }

    #[test]
    fn resampling_linear_background_between_knots() {
        let text = prf_text(&rows());
        let diffractogram = CalculatedDiffractogram::read_from(&mut Cursor::new(text)).unwrap();
        let resampled = diffractogram.resample(Column::Background, &[18.125]).unwrap();
        assert!((resampled[0] - 19.75).abs() < 1e-9);
    }

    #[test]
    fn missing_column_is_reported() {
        let text = "a\nb\nc\n2Theta\tYobs\tYcal\tBackg\n1\t2\t3\t4\n";
        assert!(matches!(
            CalculatedDiffractogram::read_from(&mut Cursor::new(text)),
            Err(PrfError::MissingColumn("Yobs-Ycal"))
        ));
    }

    #[test]
    fn header_only_file_is_empty() {
        let text = prf_text(&[]);
        assert!(matches!(
            CalculatedDiffractogram::read_from(&mut Cursor::new(text)),
            Err(PrfError::Empty)
        ));
    }
}
