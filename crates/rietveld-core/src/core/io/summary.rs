//! Parser for FullProf refinement summaries (`.sum`) and run logs (`.log`).
//!
//! The summary is scanned for a fixed set of section markers. Every marker hit
//! becomes a [`SectionHit`] carrying the tokens that follow it, and the hits
//! are then validated against the expected phase count to build a
//! [`SummaryReport`]. Per-phase sections are matched to phases by position:
//! the n-th scale, half-width and cell block belongs to the n-th phase of the
//! input deck.

use phf::phf_map;
use std::io;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

const SINGULAR_MATRIX_MARKER: &str = "==> Singular matrix!!, problem with";
const DIVERGENCE_MARKER: &str = "=>  Unrecoverable divergence!!";

const BACKGROUND_TERMS: usize = 6;
const WIDTH_TERMS: usize = 3;
const CELL_TERMS: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Section {
    Success,
    ChiSquared,
    Background,
    Displacement,
    ScaleFactor,
    HalfWidths,
    CellParameters,
}

static SECTION_MARKERS: phf::Map<&'static str, Section> = phf_map! {
    "==> RESULTS OF REFINEMENT:" => Section::Success,
    "Chi2:" => Section::ChiSquared,
    "Background Polynomial Parameters ==>" => Section::Background,
    "Cos( theta)-shift parameter :" => Section::Displacement,
    "=> overall scale factor :" => Section::ScaleFactor,
    "=> Halfwidth parameters" => Section::HalfWidths,
    "=> Cell parameters" => Section::CellParameters,
};

impl Section {
    pub fn name(self) -> &'static str {
        match self {
            Section::Success => "success marker",
            Section::ChiSquared => "chi-squared",
            Section::Background => "background polynomial",
            Section::Displacement => "displacement",
            Section::ScaleFactor => "scale factor",
            Section::HalfWidths => "half-width parameters",
            Section::CellParameters => "cell parameters",
        }
    }

    fn tokens(self, rest: &str) -> Vec<&str> {
        match self {
            Section::Success => Vec::new(),
            // Kept raw: a failed fit prints `NaN` here.
            Section::ChiSquared => rest.split_whitespace().take(1).collect(),
            Section::Displacement => numeric_run(rest).take(1).collect(),
            Section::ScaleFactor => numeric_run(rest).take(2).collect(),
            Section::Background | Section::HalfWidths | Section::CellParameters => {
                numeric_run(rest).collect()
            }
        }
    }
}

fn is_numeric_token(token: &str) -> bool {
    !token.is_empty()
        && token
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '-' | '+' | '.' | 'E' | 'e'))
}

/// Consecutive numeric tokens after an optional `:` separator. The run may
/// continue across line breaks.
fn numeric_run(rest: &str) -> impl Iterator<Item = &str> {
    rest.split_whitespace()
        .skip_while(|t| *t == ":")
        .take_while(|t| is_numeric_token(t))
}

#[derive(Debug, Clone, PartialEq)]
pub struct SectionHit<'a> {
    pub section: Section,
    pub offset: usize,
    pub tokens: Vec<&'a str>,
}

/// Scans `text` for every known section marker.
///
/// # Return
///
/// All hits ordered by their byte offset in `text`.
pub fn scan(text: &str) -> Vec<SectionHit<'_>> {
    let mut hits: Vec<SectionHit<'_>> = SECTION_MARKERS
        .entries()
        .flat_map(|(marker, section)| {
            let section = *section;
            text.match_indices(*marker).map(move |(offset, m)| SectionHit {
                section,
                offset,
                tokens: section.tokens(&text[offset + m.len()..]),
            })
        })
        .collect();
    hits.sort_by_key(|hit| hit.offset);
    hits
}

#[derive(Debug, Error)]
pub enum SummaryError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Summary does not report a successful refinement")]
    Unsuccessful,
    #[error("No usable reflections: chi-squared reported as '{value}'")]
    NoReflections { value: String },
    #[error("Summary is missing the {} section", .0.name())]
    MissingSection(Section),
    #[error("Expected {expected} {} block(s), found {found}", .section.name())]
    TooFewBlocks {
        section: Section,
        found: usize,
        expected: usize,
    },
    #[error("Could not read {} for block {block}: {detail}", .section.name())]
    Malformed {
        section: Section,
        block: usize,
        detail: String,
    },
}

/// Refined values reported for one phase.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhaseResult {
    pub scale_factor: f64,
    pub scale_error: f64,
    /// Caglioti half-width parameters `[u, v, w]`.
    pub widths: [f64; WIDTH_TERMS],
    /// `[a, b, c, alpha, beta, gamma]`.
    pub cell: [f64; CELL_TERMS],
}

/// Everything a successful refinement summary reports, validated against the
/// number of phases in the deck.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryReport {
    pub chi_squared: f64,
    pub background: [f64; BACKGROUND_TERMS],
    pub displacement: f64,
    pub phases: Vec<PhaseResult>,
}

impl SummaryReport {
    /// Parses a summary produced for a deck with `num_phases` phases.
    ///
    /// # Errors
    ///
    /// * [`SummaryError::Unsuccessful`] when the success marker is absent.
    /// * [`SummaryError::NoReflections`] when chi-squared is not a number.
    /// * [`SummaryError::TooFewBlocks`] when a per-phase section occurs fewer
    ///   times than there are phases.
    /// * [`SummaryError::Malformed`] / [`SummaryError::MissingSection`] for
    ///   blocks without enough numeric tokens or absent global sections.
    pub fn parse(text: &str, num_phases: usize) -> Result<Self, SummaryError> {
        let hits = scan(text);
        let of = |section: Section| hits.iter().filter(move |hit| hit.section == section);

        if of(Section::Success).next().is_none() {
            return Err(SummaryError::Unsuccessful);
        }

        let chi_token = of(Section::ChiSquared)
            .next()
            .ok_or(SummaryError::MissingSection(Section::ChiSquared))?
            .tokens
            .first()
            .copied()
            .unwrap_or("");
        let chi_squared = match chi_token.parse::<f64>() {
            Ok(value) if value.is_finite() => value,
            _ => {
                return Err(SummaryError::NoReflections {
                    value: chi_token.to_string(),
                });
            }
        };

        let background_hit = of(Section::Background)
            .next()
            .ok_or(SummaryError::MissingSection(Section::Background))?;
        let background = value_terms::<BACKGROUND_TERMS>(background_hit, 0)?;

        let displacement_hit = of(Section::Displacement)
            .next()
            .ok_or(SummaryError::MissingSection(Section::Displacement))?;
        let displacement = parse_token(displacement_hit, 0, 0)?;

        let scale_hits = per_phase(of(Section::ScaleFactor).collect(), Section::ScaleFactor, num_phases)?;
        let width_hits = per_phase(of(Section::HalfWidths).collect(), Section::HalfWidths, num_phases)?;
        let cell_hits = per_phase(
            of(Section::CellParameters).collect(),
            Section::CellParameters,
            num_phases,
        )?;

        let mut phases = Vec::with_capacity(num_phases);
        for block in 0..num_phases {
            let scale_hit = scale_hits[block];
            phases.push(PhaseResult {
                scale_factor: parse_token(scale_hit, 0, block)?,
                scale_error: parse_token(scale_hit, 1, block)?,
                widths: value_terms::<WIDTH_TERMS>(width_hits[block], block)?,
                cell: value_terms::<CELL_TERMS>(cell_hits[block], block)?,
            });
        }

        debug!(chi_squared, displacement, phases = phases.len(), "Parsed refinement summary.");
        Ok(Self {
            chi_squared,
            background,
            displacement,
            phases,
        })
    }

    /// Reads and parses the summary file at `path`.
    pub fn read_from_path<P: AsRef<Path>>(path: P, num_phases: usize) -> Result<Self, SummaryError> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text, num_phases)
    }
}

fn per_phase<'h, 'a>(
    hits: Vec<&'h SectionHit<'a>>,
    section: Section,
    num_phases: usize,
) -> Result<Vec<&'h SectionHit<'a>>, SummaryError> {
    if hits.len() < num_phases {
        return Err(SummaryError::TooFewBlocks {
            section,
            found: hits.len(),
            expected: num_phases,
        });
    }
    Ok(hits)
}

fn parse_token(hit: &SectionHit<'_>, index: usize, block: usize) -> Result<f64, SummaryError> {
    let token = hit.tokens.get(index).ok_or_else(|| SummaryError::Malformed {
        section: hit.section,
        block,
        detail: format!("expected at least {} value(s), found {}", index + 1, hit.tokens.len()),
    })?;
    token.parse().map_err(|_| SummaryError::Malformed {
        section: hit.section,
        block,
        detail: format!("'{}' is not a number", token),
    })
}

/// Takes the first `N` values from a block of alternating value / standard
/// deviation tokens (even positions are values).
fn value_terms<const N: usize>(hit: &SectionHit<'_>, block: usize) -> Result<[f64; N], SummaryError> {
    let values: Vec<&str> = hit.tokens.iter().step_by(2).copied().collect();
    if values.len() < N {
        return Err(SummaryError::Malformed {
            section: hit.section,
            block,
            detail: format!("expected {} values, found {}", N, values.len()),
        });
    }
    let mut terms = [0.0; N];
    for (term, token) in terms.iter_mut().zip(values) {
        *term = token.parse().map_err(|_| SummaryError::Malformed {
            section: hit.section,
            block,
            detail: format!("'{}' is not a number", token),
        })?;
    }
    Ok(terms)
}

/// What the run log says about a refinement that did not report success.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogDiagnosis {
    /// The normal matrix became singular; names the offending parameter.
    SingularMatrix { param: String },
    /// The solver could not find a minimum.
    Divergence,
    /// Neither known marker was found.
    Unknown,
}

/// Scans a run log for the known failure markers. A singular matrix takes
/// precedence over divergence.
pub fn diagnose_log(log: &str) -> LogDiagnosis {
    let singular_param = log.match_indices(SINGULAR_MATRIX_MARKER).find_map(|(offset, m)| {
        log[offset + m.len()..]
            .split_whitespace()
            .next()
            .map(str::to_string)
    });
    if let Some(param) = singular_param {
        LogDiagnosis::SingularMatrix { param }
    } else if log.contains(DIVERGENCE_MARKER) {
        LogDiagnosis::Divergence
    } else {
        LogDiagnosis::Unknown
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    /// Formats a summary in FullProf's layout with one block per phase.
    ///
    /// Each phase is `(scale, scale_error, [u, v, w], [a, b, c, alpha, beta, gamma])`.
    pub fn summary_text(chi: &str, phases: &[(f64, f64, [f64; 3], [f64; 6])]) -> String {
        let mut text = String::from(
            " ** PROGRAM FULLPROF.2k (Version 5.30 - Mar2012-ILL JRC) **\n\n\
             ==> RESULTS OF REFINEMENT:\n\n",
        );
        for (i, (scale, error, widths, cell)) in phases.iter().enumerate() {
            text.push_str(&format!("\n => Phase  No. {}   phase-{}\n", i + 1, i + 1));
            text.push_str(&format!(
                " => overall scale factor :   {:.6}   {:.6}\n",
                scale, error
            ));
            text.push_str(&format!(
                " => Halfwidth parameters  :      {:.6}  0.000100  {:.6}  0.000200  {:.6}  0.000300\n",
                widths[0], widths[1], widths[2]
            ));
            text.push_str(" => Cell parameters      :");
            for value in cell {
                text.push_str(&format!("  {:.6}  0.000010", value));
            }
            text.push_str("\n => Preferred orientation:  0.00000  0.00000\n");
        }
        text.push_str(&format!(
            "\n => Global user-weigthed Chi2 (Bragg contrib.):   1.23\n\
             Cos( theta)-shift parameter :   0.000420   0.000050\n\
             Background Polynomial Parameters ==>   12.5  0.1  -3.25  0.2  0.75  0.01  0.0  0.0  0.0  0.0  0.0  0.0\n\
             \n  Chi2:  {}\n",
            chi
        ));
        text
    }
}
