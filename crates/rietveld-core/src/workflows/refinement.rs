use crate::core::io::hkl::HklFile;
use crate::core::io::pattern::{DataFile, ObservedPattern, PatternError};
use crate::core::io::prf::{CalculatedDiffractogram, Column};
use crate::core::io::summary::{SummaryError, SummaryReport, diagnose_log};
use crate::core::io::traits::InputFile;
use crate::core::models::cell::UnitCell;
use crate::core::models::corrections::{Background, Instrument};
use crate::core::models::model::PhaseModel;
use crate::core::utils::stats::median;
use crate::engine::config::RefinementConfig;
use crate::engine::context::RefinementContext;
use crate::engine::deck::DeckFile;
use crate::engine::error::RefinementError;
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::solver::Solver;
use crate::engine::stages::Stage;
use crate::engine::state::RefinementState;
use std::fs;
use std::io;
use tracing::{debug, info, instrument, warn};

/// Stage order used by [`Refinement::refine_all`].
const REFINE_ALL_ORDER: [Stage; 5] = [
    Stage::Background,
    Stage::ScaleFactors,
    Stage::Displacement,
    Stage::UnitCells,
    Stage::PeakWidths,
];

/// A staged Rietveld refinement of one phase model against observed patterns.
///
/// Each stage frees one parameter group, renders the input files, runs the
/// solver and, once the whole summary has validated, writes every refined
/// value back into the model. Accessors refine their stage on first use and
/// reuse the result afterwards. Prerequisite stages are never run implicitly.
pub struct Refinement<'a, S: Solver> {
    phases: PhaseModel,
    background: Background,
    instrument: Instrument,
    state: RefinementState,
    config: RefinementConfig,
    solver: S,
    reporter: ProgressReporter<'a>,
}

impl<'a, S: Solver> Refinement<'a, S> {
    pub fn new(phases: PhaseModel, config: RefinementConfig, solver: S) -> Self {
        Self {
            phases,
            background: config.background,
            instrument: config.instrument,
            state: RefinementState::new(),
            config,
            solver,
            reporter: ProgressReporter::new(),
        }
    }

    pub fn with_reporter(mut self, reporter: ProgressReporter<'a>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn phases(&self) -> &PhaseModel {
        &self.phases
    }

    pub fn background_coefficients(&self) -> &Background {
        &self.background
    }

    pub fn instrument(&self) -> &Instrument {
        &self.instrument
    }

    pub fn state(&self) -> &RefinementState {
        &self.state
    }

    pub fn config(&self) -> &RefinementConfig {
        &self.config
    }

    pub fn solver(&self) -> &S {
        &self.solver
    }

    /// Runs one stage against `pattern`.
    ///
    /// # Return
    ///
    /// The chi-squared reported by the solver.
    ///
    /// # Errors
    ///
    /// Any [`RefinementError`]. The stage is then recorded as failed (unless
    /// it had already succeeded once), the model is left untouched and the
    /// generated files stay on disk for inspection.
    #[instrument(skip_all, fields(stage = %stage))]
    pub fn refine(&mut self, stage: Stage, pattern: &ObservedPattern) -> Result<f64, RefinementError> {
        self.reporter.report(Progress::StageStart { stage });
        info!("Refining {}.", stage);

        match self.run_stage(stage, pattern) {
            Ok(chi_squared) => {
                self.state.mark_refined(stage, chi_squared);
                self.reporter.report(Progress::StageFinish { chi_squared });
                info!(chi_squared, "Refinement of {} converged.", stage);
                Ok(chi_squared)
            }
            Err(e) => {
                warn!(error = %e, "Refinement of {} failed.", stage);
                self.state.mark_failed(stage, e.to_string());
                self.reporter.report(Progress::StageFailed {
                    reason: e.to_string(),
                });
                Err(e)
            }
        }
    }

    pub fn refine_background(&mut self, pattern: &ObservedPattern) -> Result<f64, RefinementError> {
        self.refine(Stage::Background, pattern)
    }

    pub fn refine_displacement(&mut self, pattern: &ObservedPattern) -> Result<f64, RefinementError> {
        self.refine(Stage::Displacement, pattern)
    }

    pub fn refine_peak_widths(&mut self, pattern: &ObservedPattern) -> Result<f64, RefinementError> {
        self.refine(Stage::PeakWidths, pattern)
    }

    pub fn refine_unit_cells(&mut self, pattern: &ObservedPattern) -> Result<f64, RefinementError> {
        self.refine(Stage::UnitCells, pattern)
    }

    /// Fails with [`RefinementError::InsufficientPhases`] before writing any
    /// file when the model has fewer than two phases.
    pub fn refine_scale_factors(&mut self, pattern: &ObservedPattern) -> Result<f64, RefinementError> {
        self.refine(Stage::ScaleFactors, pattern)
    }

    /// Runs every applicable stage in turn, stopping at the first failure.
    ///
    /// Scale factors are skipped for single-phase models.
    ///
    /// # Return
    ///
    /// The chi-squared of the last stage.
    pub fn refine_all(&mut self, pattern: &ObservedPattern) -> Result<f64, RefinementError> {
        let mut chi_squared = f64::INFINITY;
        for stage in REFINE_ALL_ORDER {
            if stage == Stage::ScaleFactors && self.phases.len() < 2 {
                debug!("Skipping scale factors for a single-phase model.");
                continue;
            }
            chi_squared = self.refine(stage, pattern)?;
        }
        Ok(chi_squared)
    }

    fn ensure_refined(&mut self, stage: Stage, pattern: &ObservedPattern) -> Result<(), RefinementError> {
        if !self.state.is_refined(stage) {
            self.refine(stage, pattern)?;
        }
        Ok(())
    }

    /// The refined background evaluated at the pattern's angles.
    pub fn background(&mut self, pattern: &ObservedPattern) -> Result<Vec<f64>, RefinementError> {
        self.ensure_refined(Stage::Background, pattern)?;
        self.resample(Column::Background, pattern.two_theta())
    }

    /// Refined unit cells in phase order.
    pub fn cell_params(&mut self, pattern: &ObservedPattern) -> Result<Vec<UnitCell>, RefinementError> {
        self.ensure_refined(Stage::UnitCells, pattern)?;
        Ok(self.phases.iter().map(|phase| phase.unit_cell).collect())
    }

    /// Each phase's scale factor as a fraction of their sum.
    pub fn phase_fractions(&mut self, pattern: &ObservedPattern) -> Result<Vec<f64>, RefinementError> {
        self.ensure_refined(Stage::ScaleFactors, pattern)?;
        let total: f64 = self.phases.iter().map(|phase| phase.scale_factor).sum();
        Ok(self
            .phases
            .iter()
            .map(|phase| phase.scale_factor / total)
            .collect())
    }

    /// Sum of all phase scale factors.
    pub fn scale_factor(&mut self, pattern: &ObservedPattern) -> Result<f64, RefinementError> {
        self.ensure_refined(Stage::ScaleFactors, pattern)?;
        Ok(self.phases.iter().map(|phase| phase.scale_factor).sum())
    }

    /// Full width at half maximum of each phase at the pattern's median angle.
    ///
    /// Computed from the current width parameters without running the solver.
    pub fn broadenings(&self, pattern: &ObservedPattern) -> Result<Vec<f64>, RefinementError> {
        let angle = median(pattern.two_theta()).ok_or(PatternError::Empty)?;
        Ok(self.phases.iter().map(|phase| phase.fwhm(angle)).collect())
    }

    /// The calculated profile interpolated onto `two_theta`.
    ///
    /// Reads the result file of the last successful stage; the caller's grid
    /// should lie within the refined range.
    pub fn predict(&self, two_theta: &[f64]) -> Result<Vec<f64>, RefinementError> {
        self.resample(Column::Calculated, two_theta)
    }

    /// Chi-squared of the most recent successful stage, or infinity.
    pub fn goodness_of_fit(&self) -> f64 {
        self.state.chi_squared().unwrap_or(f64::INFINITY)
    }

    pub fn details(&self) -> String {
        format!("Χ²: {}", self.goodness_of_fit())
    }

    pub fn calculated_diffractogram(&self) -> Result<CalculatedDiffractogram, RefinementError> {
        Ok(CalculatedDiffractogram::read_from_path(
            self.config.file_root.result_path(),
        )?)
    }

    fn resample(&self, column: Column, two_theta: &[f64]) -> Result<Vec<f64>, RefinementError> {
        Ok(self.calculated_diffractogram()?.resample(column, two_theta)?)
    }

    fn run_stage(&mut self, stage: Stage, pattern: &ObservedPattern) -> Result<f64, RefinementError> {
        let mut context = RefinementContext::build(&self.phases, &self.background, &self.instrument)?
            .with_title(self.config.title.as_str());
        stage.configure(&mut context)?;
        context.validate()?;

        let report = self.run_solver(&context, pattern)?;
        self.apply(&report);
        Ok(report.chi_squared)
    }

    fn run_solver(
        &self,
        context: &RefinementContext,
        pattern: &ObservedPattern,
    ) -> Result<SummaryReport, RefinementError> {
        let root = &self.config.file_root;
        root.ensure_dir()?;

        if context.mode.uses_reflection_files() {
            for (index, phase) in self.phases.iter().enumerate() {
                let path = root.reflections_path(index);
                debug!(path = %path.display(), phase = %phase, "Writing reflection list.");
                HklFile::write_to_path(phase, &path)?;
            }
        }
        debug!(path = %root.deck_path().display(), "Writing input deck.");
        DeckFile::write_to_path(context, root.deck_path())?;
        DataFile::write_to_path(pattern, root.data_path())?;

        self.reporter.report(Progress::SolverStart {
            num_params: context.num_params(),
        });
        self.solver.execute(root, self.config.solver_timeout)?;
        self.reporter.report(Progress::SolverFinish);

        let report = self.read_report(context.num_phases())?;

        if !self.config.keep_temp_files {
            root.cleanup(context.num_phases())?;
        }
        Ok(report)
    }

    fn read_report(&self, num_phases: usize) -> Result<SummaryReport, RefinementError> {
        let path = self.config.file_root.summary_path();
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                warn!(path = %path.display(), "Solver left no summary.");
                self.reporter.report(Progress::Message(format!(
                    "No summary at '{}', diagnosing from the log",
                    path.display()
                )));
                String::new()
            }
            Err(e) => return Err(e.into()),
        };
        match SummaryReport::parse(&text, num_phases) {
            Ok(report) => Ok(report),
            Err(SummaryError::Unsuccessful) => Err(self.diagnose_failure()),
            Err(e) => Err(e.into()),
        }
    }

    fn diagnose_failure(&self) -> RefinementError {
        let log_path = self.config.file_root.log_path();
        let log = fs::read_to_string(&log_path).unwrap_or_default();
        let diagnosis = diagnose_log(&log);
        debug!(log = %log_path.display(), ?diagnosis, "Diagnosed unsuccessful run.");
        diagnosis.into()
    }

    /// Writes a validated report back into the model.
    fn apply(&mut self, report: &SummaryReport) {
        self.background.coeffs = report.background;
        self.instrument.displacement = report.displacement;
        for (phase, result) in self.phases.iter_mut().zip(&report.phases) {
            phase.scale_factor = result.scale_factor;
            phase.scale_error = result.scale_error;
            [phase.u, phase.v, phase.w] = result.widths;
            phase.unit_cell.set_from_array(result.cell);
        }
        debug!(
            chi_squared = report.chi_squared,
            phases = report.phases.len(),
            "Applied refined values."
        );
    }
}
