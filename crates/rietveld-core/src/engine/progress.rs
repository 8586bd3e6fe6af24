use super::stages::Stage;

#[derive(Debug, Clone)]
pub enum Progress {
    StageStart { stage: Stage },
    SolverStart { num_params: usize },
    SolverFinish,
    StageFinish { chi_squared: f64 },
    StageFailed { reason: String },
    /// A notable event inside a stage that is not an error by itself.
    Message(String),
}

pub type ProgressCallback<'a> = Box<dyn Fn(Progress) + Send + Sync + 'a>;

#[derive(Default)]
pub struct ProgressReporter<'a> {
    callback: Option<ProgressCallback<'a>>,
}

impl<'a> ProgressReporter<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_callback(callback: ProgressCallback<'a>) -> Self {
        Self {
            callback: Some(callback),
        }
    }

    #[inline]
    pub fn report(&self, event: Progress) {
        if let Some(cb) = &self.callback {
            cb(event);
        }
    }
}
