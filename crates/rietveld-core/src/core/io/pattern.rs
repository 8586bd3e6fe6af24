use super::traits::InputFile;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PatternError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Angle and intensity arrays differ in length ({two_theta} vs {intensities})")]
    LengthMismatch { two_theta: usize, intensities: usize },
    #[error("Observed pattern contains no points")]
    Empty,
    #[error("Observed pattern contains a non-finite value at index {0}")]
    NonFinite(usize),
    #[error("Parse error on line {line}: expected two numeric columns, found '{content}'")]
    Parse { line: usize, content: String },
}

/// A measured diffraction pattern: intensities at 2θ angles in degrees.
#[derive(Debug, Clone, PartialEq)]
pub struct ObservedPattern {
    two_theta: Vec<f64>,
    intensities: Vec<f64>,
}

impl ObservedPattern {
    /// Creates a pattern from matching angle and intensity arrays.
    ///
    /// # Errors
    ///
    /// Returns [`PatternError`] for mismatched lengths, an empty pattern, or
    /// non-finite values.
    pub fn new(two_theta: Vec<f64>, intensities: Vec<f64>) -> Result<Self, PatternError> {
        if two_theta.len() != intensities.len() {
            return Err(PatternError::LengthMismatch {
                two_theta: two_theta.len(),
                intensities: intensities.len(),
            });
        }
        if two_theta.is_empty() {
            return Err(PatternError::Empty);
        }
        if let Some(index) = two_theta
            .iter()
            .zip(&intensities)
            .position(|(t, i)| !t.is_finite() || !i.is_finite())
        {
            return Err(PatternError::NonFinite(index));
        }
        Ok(Self {
            two_theta,
            intensities,
        })
    }

    pub fn two_theta(&self) -> &[f64] {
        &self.two_theta
    }

    pub fn intensities(&self) -> &[f64] {
        &self.intensities
    }

    pub fn len(&self) -> usize {
        self.two_theta.len()
    }

    pub fn is_empty(&self) -> bool {
        self.two_theta.is_empty()
    }

    /// Returns `(angle, intensity)` pairs sorted by angle.
    pub fn sorted_points(&self) -> Vec<(f64, f64)> {
        let mut points: Vec<(f64, f64)> = self
            .two_theta
            .iter()
            .copied()
            .zip(self.intensities.iter().copied())
            .collect();
        points.sort_by(|a, b| a.0.total_cmp(&b.0));
        points
    }

    /// Reads a two-column `angle intensity` text pattern.
    ///
    /// Columns may be separated by any whitespace or commas. Blank lines and
    /// lines starting with `#` or `!` are skipped; extra columns are ignored.
    pub fn read_from(reader: &mut impl BufRead) -> Result<Self, PatternError> {
        let mut two_theta = Vec::new();
        let mut intensities = Vec::new();
        for (line_num, line_res) in reader.lines().enumerate() {
            let line = line_res?;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with('!') {
                continue;
            }
            let mut fields = trimmed
                .split(|c: char| c.is_whitespace() || c == ',')
                .filter(|f| !f.is_empty());
            let parsed = match (fields.next(), fields.next()) {
                (Some(a), Some(b)) => a.parse::<f64>().ok().zip(b.parse::<f64>().ok()),
                _ => None,
            };
            let (angle, intensity) = parsed.ok_or_else(|| PatternError::Parse {
                line: line_num + 1,
                content: trimmed.to_string(),
            })?;
            two_theta.push(angle);
            intensities.push(intensity);
        }
        Self::new(two_theta, intensities)
    }

    pub fn read_from_path<P: AsRef<Path>>(path: P) -> Result<Self, PatternError> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        Self::read_from(&mut reader)
    }
}

/// The observed-data file handed to the solver.
///
/// One `angle intensity` row per point, separated by a single space, sorted by
/// angle, without a header.
pub struct DataFile;

impl InputFile for DataFile {
    type Source = ObservedPattern;
    type Error = PatternError;

    fn write_to(source: &ObservedPattern, writer: &mut impl Write) -> Result<(), PatternError> {
        let mut csv_writer = csv::WriterBuilder::new()
            .delimiter(b' ')
            .has_headers(false)
            .from_writer(writer);
        for point in source.sorted_points() {
            csv_writer.serialize(point)?;
        }
        csv_writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tempfile::tempdir;

    #[test]
    fn new_rejects_mismatched_lengths() {
        let result = ObservedPattern::new(vec![1.0, 2.0], vec![1.0]);
        assert!(matches!(
            result,
            Err(PatternError::LengthMismatch {
                two_theta: 2,
                intensities: 1
            })
        ));
    }

    #[test]
    fn new_rejects_empty_and_non_finite_patterns() {
        assert!(matches!(
            ObservedPattern::new(vec![], vec![]),
            Err(PatternError::Empty)
        ));
        assert!(matches!(
            ObservedPattern::new(vec![1.0, f64::INFINITY], vec![1.0, 2.0]),
            Err(PatternError::NonFinite(1))
        ));
    }

    #[test]
    fn data_file_is_sorted_space_separated_without_header() {
        let pattern = ObservedPattern::new(vec![20.5, 10.0, 15.25], vec![3.0, 1.0, 2.5]).unwrap();
        let mut buffer = Vec::new();
        DataFile::write_to(&pattern, &mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines, vec!["10.0 1.0", "15.25 2.5", "20.5 3.0"]);
    }

    #[test]
    fn read_from_skips_comments_and_accepts_commas() {
        let input = "# exported pattern\n\n10.0 100\n10.02,  105.5\n! trailing\n10.04\t99 extra\n";
        let pattern = ObservedPattern::read_from(&mut Cursor::new(input)).unwrap();
        assert_eq!(pattern.two_theta(), &[10.0, 10.02, 10.04]);
        assert_eq!(pattern.intensities(), &[100.0, 105.5, 99.0]);
    }

    #[test]
    fn read_from_reports_offending_line() {
        let input = "10.0 1.0\nnot numbers\n";
        let result = ObservedPattern::read_from(&mut Cursor::new(input));
        assert!(matches!(result, Err(PatternError::Parse { line: 2, .. })));
    }

    #[test]
    fn written_data_file_reads_back() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sample.dat");
        let pattern = ObservedPattern::new(vec![30.0, 31.0], vec![12.0, 14.5]).unwrap();
        DataFile::write_to_path(&pattern, &path).unwrap();
        assert_eq!(ObservedPattern::read_from_path(&path).unwrap(), pattern);
    }
}
