use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use rietveld::engine::progress::{Progress, ProgressCallback};
use rietveld::engine::stages::Stage;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::warn;

const SPINNER_TICK_MS: u64 = 80;

struct SpinnerState {
    pb: ProgressBar,
    stage: Option<Stage>,
}

/// Shows one spinner line per refinement stage on stderr.
#[derive(Clone)]
pub struct CliProgressHandler {
    state: Arc<Mutex<SpinnerState>>,
}

impl CliProgressHandler {
    pub fn new() -> Self {
        Self::with_draw_target(ProgressDrawTarget::stderr())
    }

    fn with_draw_target(target: ProgressDrawTarget) -> Self {
        let pb = ProgressBar::new_spinner().with_style(Self::spinner_style());
        pb.set_draw_target(target);
        pb.finish_and_clear();

        Self {
            state: Arc::new(Mutex::new(SpinnerState { pb, stage: None })),
        }
    }

    pub fn get_callback(&self) -> ProgressCallback<'static> {
        let state = Arc::clone(&self.state);

        Box::new(move |progress: Progress| {
            let Ok(mut guard) = state.lock() else {
                warn!("Progress spinner mutex was poisoned. Cannot update progress.");
                return;
            };
            let stage_name = guard.stage.map(Stage::name).unwrap_or("refinement");

            match progress {
                Progress::StageStart { stage } => {
                    guard.stage = Some(stage);
                    guard.pb.reset();
                    guard
                        .pb
                        .enable_steady_tick(Duration::from_millis(SPINNER_TICK_MS));
                    guard.pb.set_message(format!("Refining {}...", stage));
                }
                Progress::SolverStart { num_params } => {
                    guard.pb.set_message(format!(
                        "Refining {} ({} free parameter(s), FullProf running)...",
                        stage_name, num_params
                    ));
                }
                Progress::SolverFinish => {
                    guard
                        .pb
                        .set_message(format!("Refining {} (reading results)...", stage_name));
                }
                Progress::StageFinish { chi_squared } => {
                    guard.pb.disable_steady_tick();
                    guard
                        .pb
                        .finish_with_message(format!("✓ {} (Χ² = {:.4})", stage_name, chi_squared));
                }
                Progress::StageFailed { reason } => {
                    guard.pb.disable_steady_tick();
                    guard
                        .pb
                        .abandon_with_message(format!("✗ {}: {}", stage_name, reason));
                }
                Progress::Message(msg) => {
                    if !guard.pb.is_finished() {
                        guard.pb.println(format!("  {}", msg));
                    } else {
                        guard.pb.set_message(msg);
                    }
                }
            }
        })
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::with_template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
    }
}

impl Default for CliProgressHandler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn hidden() -> CliProgressHandler {
        CliProgressHandler::with_draw_target(ProgressDrawTarget::hidden())
    }

    #[test]
    fn handler_initializes_in_a_clean_state() {
        let handler = hidden();
        let state = handler.state.lock().unwrap();
        assert!(state.pb.is_finished());
        assert_eq!(state.stage, None);
    }

    #[test]
    fn callback_tracks_stage_lifecycle() {
        let handler = hidden();
        let callback = handler.get_callback();

        callback(Progress::StageStart {
            stage: Stage::UnitCells,
        });
        {
            let state = handler.state.lock().unwrap();
            assert_eq!(state.pb.message(), "Refining unit cells...");
            assert!(!state.pb.is_finished());
        }

        callback(Progress::SolverStart { num_params: 6 });
        {
            let state = handler.state.lock().unwrap();
            assert!(state.pb.message().contains("6 free parameter(s)"));
        }

        callback(Progress::SolverFinish);
        callback(Progress::StageFinish { chi_squared: 1.5 });
        {
            let state = handler.state.lock().unwrap();
            assert!(state.pb.is_finished());
            assert_eq!(state.pb.message(), "✓ unit cells (Χ² = 1.5000)");
        }
    }

    #[test]
    fn failure_abandons_spinner_with_reason() {
        let handler = hidden();
        let callback = handler.get_callback();

        callback(Progress::StageStart {
            stage: Stage::Background,
        });
        callback(Progress::StageFailed {
            reason: "Refinement diverged".to_string(),
        });

        let state = handler.state.lock().unwrap();
        assert!(state.pb.is_finished());
        assert_eq!(state.pb.message(), "✗ background: Refinement diverged");
    }

    #[test]
    fn messages_print_above_a_running_spinner() {
        let handler = hidden();
        let callback = handler.get_callback();

        callback(Progress::StageStart {
            stage: Stage::Background,
        });
        callback(Progress::Message("No summary at 'run.sum'".to_string()));
        {
            let state = handler.state.lock().unwrap();
            assert_eq!(state.pb.message(), "Refining background...");
        }

        callback(Progress::StageFailed {
            reason: "Refinement diverged".to_string(),
        });
        callback(Progress::Message("see run.log".to_string()));
        let state = handler.state.lock().unwrap();
        assert_eq!(state.pb.message(), "see run.log");
    }

    #[test]
    fn callback_is_thread_safe() {
        let handler = hidden();
        let callback = handler.get_callback();

        thread::spawn(move || {
            callback(Progress::StageStart {
                stage: Stage::Displacement,
            });
            callback(Progress::StageFinish { chi_squared: 2.0 });
        })
        .join()
        .unwrap();

        let state = handler.state.lock().unwrap();
        assert!(state.pb.is_finished());
        assert_eq!(state.stage, Some(Stage::Displacement));
    }
}
