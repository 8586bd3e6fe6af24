use super::context::{Mode, Param, PhaseParam, RefinementContext};
use super::error::RefinementError;
use std::fmt;

/// Number of background terms released by the background stage.
const BACKGROUND_FREE_TERMS: usize = 3;

/// One independently refinable parameter group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Background,
    Displacement,
    PeakWidths,
    UnitCells,
    ScaleFactors,
}

impl Stage {
    pub const ALL: [Stage; 5] = [
        Stage::Background,
        Stage::Displacement,
        Stage::PeakWidths,
        Stage::UnitCells,
        Stage::ScaleFactors,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Stage::Background => "background",
            Stage::Displacement => "displacement",
            Stage::PeakWidths => "peak widths",
            Stage::UnitCells => "unit cells",
            Stage::ScaleFactors => "scale factors",
        }
    }

    /// Frees this stage's parameters in a fresh context.
    ///
    /// # Errors
    ///
    /// Returns [`RefinementError::InsufficientPhases`] for scale factors with
    /// fewer than two phases, and propagates allocation errors.
    pub fn configure(self, context: &mut RefinementContext) -> Result<(), RefinementError> {
        let num_phases = context.num_phases();
        let each_phase = |param: PhaseParam| (0..num_phases).map(move |index| Param::Phase { index, param });

        match self {
            Stage::Background => {
                for term in 0..BACKGROUND_FREE_TERMS {
                    context.refine(Param::Background(term))?;
                }
                // Letting the scales float alongside the background helps the fit.
                if context.mode != Mode::ConstantScale {
                    for param in each_phase(PhaseParam::Scale) {
                        context.refine(param)?;
                    }
                }
            }
            Stage::Displacement => {
                context.refine(Param::Displacement)?;
            }
            Stage::PeakWidths => {
                for param in each_phase(PhaseParam::W) {
                    context.refine(param)?;
                }
            }
            Stage::UnitCells => {
                for index in 0..num_phases {
                    for param in PhaseParam::CELL {
                        context.refine(Param::Phase { index, param })?;
                    }
                }
            }
            Stage::ScaleFactors => {
                if num_phases < 2 {
                    return Err(RefinementError::InsufficientPhases { count: num_phases });
                }
                for param in each_phase(PhaseParam::Scale) {
                    context.refine(param)?;
                }
            }
        }
        Ok(())
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::cell::UnitCell;
    use crate::core::models::corrections::{Background, Instrument};
    use crate::core::models::model::PhaseModel;
    use crate::core::models::phase::Phase;

    fn context(num_phases: usize) -> RefinementContext {
        let model: PhaseModel = (0..num_phases)
            .map(|i| Phase::new(format!("p{i}"), "P 1", UnitCell::cubic(3.0)))
            .collect();
        RefinementContext::build(&model, &Background::default(), &Instrument::default()).unwrap()
    }

    fn configured(stage: Stage, num_phases: usize) -> RefinementContext {
        let mut ctx = context(num_phases);
        stage.configure(&mut ctx).unwrap();
        ctx.validate().unwrap();
        ctx
    }

    #[test]
    fn every_stage_keeps_codewords_consistent() {
        for num_phases in 1..=3 {
            for stage in Stage::ALL {
                let mut ctx = context(num_phases);
                match stage.configure(&mut ctx) {
                    Ok(()) => ctx.validate().unwrap(),
                    Err(RefinementError::InsufficientPhases { count }) => {
                        assert_eq!(stage, Stage::ScaleFactors);
                        assert_eq!(count, 1);
                    }
                    Err(e) => panic!("{stage} with {num_phases} phase(s) failed: {e}"),
                }
            }
        }
    }

    #[test]
    fn background_frees_three_terms_and_scales_of_multiphase_models() {
        let single = configured(Stage::Background, 1);
        assert_eq!(single.num_params(), 3);
        let codes: Vec<u32> = single.background.iter().map(|r| r.codeword.value()).collect();
        assert_eq!(codes, vec![11, 21, 31, 0, 0, 0]);
        assert!(single.phases[0].scale.codeword.is_fixed());

        let double = configured(Stage::Background, 2);
        assert_eq!(double.num_params(), 5);
        assert_eq!(double.phases[0].scale.codeword.value(), 41);
        assert_eq!(double.phases[1].scale.codeword.value(), 51);
    }

    #[test]
    fn displacement_frees_only_displacement() {
        let ctx = configured(Stage::Displacement, 2);
        assert_eq!(ctx.num_params(), 1);
        assert_eq!(ctx.displacement.codeword.value(), 11);
    }

    #[test]
    fn unit_cells_are_allocated_phase_by_phase() {
        let ctx = configured(Stage::UnitCells, 2);
        assert_eq!(ctx.num_params(), 12);
        let first: Vec<u32> = ctx.phases[0].cell.iter().map(|r| r.codeword.value()).collect();
        let second: Vec<u32> = ctx.phases[1].cell.iter().map(|r| r.codeword.value()).collect();
        assert_eq!(first, vec![11, 21, 31, 41, 51, 61]);
        assert_eq!(second, vec![71, 81, 91, 101, 111, 121]);
    }

    #[test]
    fn peak_widths_free_w_per_phase() {
        let ctx = configured(Stage::PeakWidths, 3);
        assert_eq!(ctx.num_params(), 3);
        assert!(ctx.phases.iter().all(|p| !p.w.codeword.is_fixed()));
        assert!(ctx.phases.iter().all(|p| p.u.codeword.is_fixed()));
    }

    #[test]
    fn scale_factors_need_two_phases() {
        let mut ctx = context(1);
        assert!(matches!(
            Stage::ScaleFactors.configure(&mut ctx),
            Err(RefinementError::InsufficientPhases { count: 1 })
        ));
        assert_eq!(configured(Stage::ScaleFactors, 2).num_params(), 2);
    }
}
