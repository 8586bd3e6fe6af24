use super::stages::Stage;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Default)]
pub enum StageStatus {
    #[default]
    Unrefined,
    Refined,
    Failed(String),
}

/// Per-stage refinement status plus the most recent chi-squared.
#[derive(Debug, Clone, Default)]
pub struct RefinementState {
    stages: HashMap<Stage, StageStatus>,
    chi_squared: Option<f64>,
}

impl RefinementState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self, stage: Stage) -> &StageStatus {
        static UNREFINED: StageStatus = StageStatus::Unrefined;
        self.stages.get(&stage).unwrap_or(&UNREFINED)
    }

    /// A failed stage counts as not refined so that accessors retry it.
    pub fn is_refined(&self, stage: Stage) -> bool {
        matches!(self.status(stage), StageStatus::Refined)
    }

    pub fn mark_refined(&mut self, stage: Stage, chi_squared: f64) {
        self.stages.insert(stage, StageStatus::Refined);
        self.chi_squared = Some(chi_squared);
    }

    /// Records a failure unless the stage already succeeded once.
    pub fn mark_failed(&mut self, stage: Stage, reason: impl Into<String>) {
        if !self.is_refined(stage) {
            self.stages.insert(stage, StageStatus::Failed(reason.into()));
        }
    }

    pub fn chi_squared(&self) -> Option<f64> {
        self.chi_squared
    }
}
