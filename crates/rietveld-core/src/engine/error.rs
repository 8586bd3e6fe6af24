use std::io;
use std::time::Duration;
use thiserror::Error;

use crate::core::io::pattern::PatternError;
use crate::core::io::prf::PrfError;
use crate::core::io::summary::{LogDiagnosis, SummaryError};
use crate::core::utils::spline::SplineError;

#[derive(Debug, Error)]
pub enum RefinementError {
    #[error(
        "FullProf binary not found: {reason}. Set the FULLPROF environment variable to the FullProf installation directory"
    )]
    MissingBinary { reason: String },

    #[error("Refinement has no free parameters")]
    EmptyRefinement,

    #[error("Malformed refinement context: {0}")]
    MalformedContext(String),

    #[error("Scale factors need at least two phases, found {count}")]
    InsufficientPhases { count: usize },

    #[error("Refinement requires at least one phase")]
    NoPhases,

    #[error("Singular matrix while refining parameter '{param}'")]
    SingularMatrix { param: String },

    #[error("Refinement diverged")]
    Divergence,

    #[error("No usable reflections: chi-squared reported as '{value}'")]
    NoReflections { value: String },

    #[error("Malformed solver output: {0}")]
    MalformedOutput(String),

    #[error("Refinement failed: {0}")]
    Failed(String),

    #[error("Solver did not finish within {} s", .0.as_secs_f64())]
    Timeout(Duration),

    #[error("Invalid observed pattern: {source}")]
    InvalidPattern {
        #[from]
        source: PatternError,
    },

    #[error("Could not read the calculated diffractogram: {source}")]
    ResultFile {
        #[from]
        source: PrfError,
    },

    #[error("Interpolation failed: {source}")]
    Interpolation {
        #[from]
        source: SplineError,
    },

    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl From<SummaryError> for RefinementError {
    fn from(error: SummaryError) -> Self {
        match error {
            SummaryError::Io(source) => Self::Io { source },
            SummaryError::NoReflections { value } => Self::NoReflections { value },
            SummaryError::TooFewBlocks { .. } | SummaryError::Unsuccessful => {
                Self::Failed(error.to_string())
            }
            SummaryError::MissingSection(_) | SummaryError::Malformed { .. } => {
                Self::MalformedOutput(error.to_string())
            }
        }
    }
}

impl From<LogDiagnosis> for RefinementError {
    fn from(diagnosis: LogDiagnosis) -> Self {
        match diagnosis {
            LogDiagnosis::SingularMatrix { param } => Self::SingularMatrix { param },
            LogDiagnosis::Divergence => Self::Divergence,
            LogDiagnosis::Unknown => {
                Self::Failed("solver did not report success and its log names no known cause".to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::io::summary::Section;

    #[test]
    fn summary_errors_map_onto_refinement_taxonomy() {
        let too_few = SummaryError::TooFewBlocks {
            section: Section::CellParameters,
            found: 1,
            expected: 2,
        };
        assert!(matches!(RefinementError::from(too_few), RefinementError::Failed(_)));

        let missing = SummaryError::MissingSection(Section::Background);
        assert!(matches!(
            RefinementError::from(missing),
            RefinementError::MalformedOutput(_)
        ));

        let nan = SummaryError::NoReflections {
            value: "NaN".to_string(),
        };
        match RefinementError::from(nan) {
            RefinementError::NoReflections { value } => assert_eq!(value, "NaN"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn log_diagnoses_map_onto_refinement_taxonomy() {
        let singular = LogDiagnosis::SingularMatrix {
            param: "Cell_A_ph1".to_string(),
        };
        match RefinementError::from(singular) {
            RefinementError::SingularMatrix { param } => assert_eq!(param, "Cell_A_ph1"),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(matches!(
            RefinementError::from(LogDiagnosis::Divergence),
            RefinementError::Divergence
        ));
        assert!(matches!(
            RefinementError::from(LogDiagnosis::Unknown),
            RefinementError::Failed(_)
        ));
    }

    #[test]
    fn timeout_message_reports_seconds() {
        let error = RefinementError::Timeout(Duration::from_millis(1500));
        assert_eq!(error.to_string(), "Solver did not finish within 1.5 s");
    }
}
