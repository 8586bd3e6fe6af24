use crate::cli::RefineArgs;
use crate::config::{PartialRefineConfig, RefineSettings};
use crate::error::{CliError, Result};
use crate::utils::progress::CliProgressHandler;
use rietveld::core::io::pattern::ObservedPattern;
use rietveld::core::models::model::PhaseModel;
use rietveld::engine::progress::ProgressReporter;
use rietveld::engine::solver::{FullprofSolver, Solver};
use rietveld::engine::stages::Stage;
use rietveld::workflows::refinement::Refinement;
use tracing::info;

pub fn run(args: RefineArgs) -> Result<()> {
    let partial_config = PartialRefineConfig::from_file(&args.config)?;
    info!("Merging configuration from file and CLI arguments...");
    let settings = partial_config.merge_with_cli(&args)?;

    let phases = load_phases(&settings)?;
    info!(
        "Loaded {} phase(s) from {:?}",
        phases.len(),
        &settings.phases_path
    );

    info!("Loading observed pattern from {:?}", &args.input);
    let pattern =
        ObservedPattern::read_from_path(&args.input).map_err(|e| CliError::FileParsing {
            path: args.input.clone(),
            source: e.into(),
        })?;

    let solver = match &settings.solver_dir {
        Some(dir) => FullprofSolver::locate(dir)?,
        None => FullprofSolver::from_env()?,
    };
    info!(
        "Using FullProf at {:?} (timeout: {:?})",
        solver.binary(),
        settings.config.solver_timeout
    );

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());
    let mut refinement = Refinement::new(phases, settings.config, solver).with_reporter(reporter);

    match args.stage.stage() {
        Some(stage) => {
            println!("Refining {} against {} points...", stage, pattern.len());
            refinement.refine(stage, &pattern)?;
        }
        None => {
            println!("Running all refinement stages against {} points...", pattern.len());
            refinement.refine_all(&pattern)?;
        }
    }

    print_report(&refinement);
    Ok(())
}

fn load_phases(settings: &RefineSettings) -> Result<PhaseModel> {
    PhaseModel::load(&settings.phases_path).map_err(|e| CliError::FileParsing {
        path: settings.phases_path.clone(),
        source: e.into(),
    })
}

fn print_report<S: Solver>(refinement: &Refinement<'_, S>) {
    println!("{}", refinement.details());

    let background = refinement.background_coefficients();
    println!(
        "Background: {}",
        background
            .coeffs
            .iter()
            .map(|c| format!("{:.4}", c))
            .collect::<Vec<_>>()
            .join(" ")
    );
    println!(
        "Displacement: {:.6}",
        refinement.instrument().displacement
    );

    for phase in refinement.phases().iter() {
        let cell = phase.unit_cell;
        println!(
            "  {:<20} scale {:.6} (±{:.6})  a={:.5} b={:.5} c={:.5} α={:.3} β={:.3} γ={:.3}  u={:.5} v={:.5} w={:.5}",
            phase.name,
            phase.scale_factor,
            phase.scale_error,
            cell.a,
            cell.b,
            cell.c,
            cell.alpha,
            cell.beta,
            cell.gamma,
            phase.u,
            phase.v,
            phase.w,
        );
    }

    for stage in Stage::ALL {
        if refinement.state().is_refined(stage) {
            info!("Stage '{}' refined.", stage);
        }
    }
    println!(
        "Calculated profile written to: {}",
        refinement.config().file_root.result_path().display()
    );
}
