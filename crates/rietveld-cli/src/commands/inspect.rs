use crate::cli::InspectArgs;
use crate::error::Result;
use rietveld::core::io::summary::{SummaryError, SummaryReport, diagnose_log};
use rietveld::engine::error::RefinementError;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

pub fn run(args: InspectArgs) -> Result<()> {
    info!(
        "Parsing summary {:?} for {} phase(s)",
        &args.summary, args.num_phases
    );
    let text = fs::read_to_string(&args.summary)?;

    match SummaryReport::parse(&text, args.num_phases) {
        Ok(report) => {
            print_summary(&report);
            Ok(())
        }
        Err(SummaryError::Unsuccessful) => {
            warn!("Summary does not report a successful refinement.");
            Err(diagnose(args.log.as_deref())?.into())
        }
        Err(e) => Err(RefinementError::from(e).into()),
    }
}

/// Turns the run log into the matching refinement error.
fn diagnose(log: Option<&Path>) -> Result<RefinementError> {
    let Some(path) = log else {
        return Ok(RefinementError::Failed(
            "solver did not report success (pass --log to diagnose)".to_string(),
        ));
    };
    let log = fs::read_to_string(path)?;
    Ok(diagnose_log(&log).into())
}

fn print_summary(report: &SummaryReport) {
    println!("Χ²: {}", report.chi_squared);
    println!("Displacement: {:.6}", report.displacement);
    println!(
        "Background: {}",
        report
            .background
            .iter()
            .map(|c| format!("{:.4}", c))
            .collect::<Vec<_>>()
            .join(" ")
    );
    for (index, phase) in report.phases.iter().enumerate() {
        let [a, b, c, alpha, beta, gamma] = phase.cell;
        let [u, v, w] = phase.widths;
        println!(
            "  Phase {}: scale {:.6} (±{:.6})  a={:.5} b={:.5} c={:.5} α={:.3} β={:.3} γ={:.3}  u={:.5} v={:.5} w={:.5}",
            index + 1,
            phase.scale_factor,
            phase.scale_error,
            a,
            b,
            c,
            alpha,
            beta,
            gamma,
            u,
            v,
            w,
        );
    }
}
