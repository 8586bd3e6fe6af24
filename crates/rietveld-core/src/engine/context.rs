use super::error::RefinementError;
use crate::core::models::corrections::{BACKGROUND_TERMS, Background, Instrument};
use crate::core::models::model::PhaseModel;
use crate::core::models::phase::Phase;
use std::collections::HashSet;
use std::fmt;

/// FullProf's pattern calculation mode (`Jbt`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Rietveld,
    Magnetic,
    ConstantScale,
    ConstantIntensities,
}

impl Mode {
    /// A single phase is fit with constant scale; several phases keep their
    /// supplied intensities so that scales stay comparable.
    pub fn for_phase_count(num_phases: usize) -> Self {
        if num_phases == 1 {
            Mode::ConstantScale
        } else {
            Mode::ConstantIntensities
        }
    }

    pub fn code(self) -> u8 {
        match self {
            Mode::Rietveld => 0,
            Mode::Magnetic => 1,
            Mode::ConstantScale => 2,
            Mode::ConstantIntensities => 3,
        }
    }

    /// Whether the solver reads reflections from `.hkl` files (`Irf = 2`)
    /// instead of generating them from the space group (`Irf = 0`).
    pub fn uses_reflection_files(self) -> bool {
        self != Mode::ConstantScale
    }

    pub fn irf(self) -> u8 {
        if self.uses_reflection_files() { 2 } else { 0 }
    }
}

const REFINE_FLAG: u32 = 1;

/// A FullProf refinement code: `0` keeps a parameter fixed, `ordinal * 10 + 1`
/// refines it as the `ordinal`-th free parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Codeword(u32);

impl Codeword {
    pub const FIXED: Codeword = Codeword(0);

    pub fn refine(ordinal: u32) -> Self {
        Codeword(ordinal * 10 + REFINE_FLAG)
    }

    pub fn value(self) -> u32 {
        self.0
    }

    pub fn is_fixed(self) -> bool {
        self.0 == 0
    }

    /// The ordinal of a well-formed free codeword.
    pub fn ordinal(self) -> Option<u32> {
        (self.0 % 10 == REFINE_FLAG && self.0 >= 10).then_some(self.0 / 10)
    }
}

impl fmt::Display for Codeword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", f64::from(self.0))
    }
}

/// A deck value together with its refinement code.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Refinable {
    pub value: f64,
    pub codeword: Codeword,
}

impl Refinable {
    pub const fn fixed(value: f64) -> Self {
        Self {
            value,
            codeword: Codeword::FIXED,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PhaseParam {
    Scale,
    Eta,
    Bov,
    U,
    V,
    W,
    X,
    Ig,
    A,
    B,
    C,
    Alpha,
    Beta,
    Gamma,
}

impl PhaseParam {
    pub const CELL: [PhaseParam; 6] = [
        PhaseParam::A,
        PhaseParam::B,
        PhaseParam::C,
        PhaseParam::Alpha,
        PhaseParam::Beta,
        PhaseParam::Gamma,
    ];
}

/// Addresses one refinable slot of a [`RefinementContext`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Param {
    Zero,
    Displacement,
    Transparency,
    Background(usize),
    Phase { index: usize, param: PhaseParam },
}

/// Deck values for one phase.
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseBlock {
    pub name: String,
    pub space_group: String,
    pub scale: Refinable,
    pub eta: Refinable,
    pub bov: Refinable,
    pub u: Refinable,
    pub v: Refinable,
    pub w: Refinable,
    pub x: Refinable,
    pub i_g: Refinable,
    /// `[a, b, c, alpha, beta, gamma]`.
    pub cell: [Refinable; 6],
}

impl PhaseBlock {
    fn from_phase(phase: &Phase) -> Self {
        Self {
            name: phase.name.clone(),
            space_group: phase.space_group.clone(),
            scale: Refinable::fixed(phase.scale_factor),
            eta: Refinable::fixed(phase.eta),
            bov: Refinable::fixed(phase.isotropic_temp),
            u: Refinable::fixed(phase.u),
            v: Refinable::fixed(phase.v),
            w: Refinable::fixed(phase.w),
            x: Refinable::fixed(phase.x),
            i_g: Refinable::fixed(phase.i_g),
            cell: phase.unit_cell.as_array().map(Refinable::fixed),
        }
    }

    fn slot_mut(&mut self, param: PhaseParam) -> &mut Refinable {
        match param {
            PhaseParam::Scale => &mut self.scale,
            PhaseParam::Eta => &mut self.eta,
            PhaseParam::Bov => &mut self.bov,
            PhaseParam::U => &mut self.u,
            PhaseParam::V => &mut self.v,
            PhaseParam::W => &mut self.w,
            PhaseParam::X => &mut self.x,
            PhaseParam::Ig => &mut self.i_g,
            PhaseParam::A => &mut self.cell[0],
            PhaseParam::B => &mut self.cell[1],
            PhaseParam::C => &mut self.cell[2],
            PhaseParam::Alpha => &mut self.cell[3],
            PhaseParam::Beta => &mut self.cell[4],
            PhaseParam::Gamma => &mut self.cell[5],
        }
    }

    fn refinables(&self) -> impl Iterator<Item = &Refinable> {
        [
            &self.scale,
            &self.eta,
            &self.bov,
            &self.u,
            &self.v,
            &self.w,
            &self.x,
            &self.i_g,
        ]
        .into_iter()
        .chain(self.cell.iter())
    }
}

/// A transient snapshot of the model rendered into one input deck.
///
/// Every codeword starts fixed. Parameters are freed with
/// [`RefinementContext::refine`], which hands out ordinals sequentially so the
/// number of free codewords always equals [`RefinementContext::num_params`].
#[derive(Debug, Clone, PartialEq)]
pub struct RefinementContext {
    pub title: String,
    pub mode: Mode,
    pub wavelengths: (f64, f64),
    pub wavelength_ratio: f64,
    pub zero: Refinable,
    pub displacement: Refinable,
    pub transparency: Refinable,
    pub background: [Refinable; BACKGROUND_TERMS],
    pub phases: Vec<PhaseBlock>,
    num_params: usize,
}

impl RefinementContext {
    /// Snapshots the phases and global corrections with every parameter fixed.
    ///
    /// # Errors
    ///
    /// Returns [`RefinementError::NoPhases`] for an empty model.
    pub fn build(
        model: &PhaseModel,
        background: &Background,
        instrument: &Instrument,
    ) -> Result<Self, RefinementError> {
        if model.is_empty() {
            return Err(RefinementError::NoPhases);
        }
        Ok(Self {
            title: String::new(),
            mode: Mode::for_phase_count(model.len()),
            wavelengths: (instrument.wavelength_1, instrument.wavelength_2),
            wavelength_ratio: instrument.wavelength_ratio,
            zero: Refinable::fixed(instrument.zero),
            displacement: Refinable::fixed(instrument.displacement),
            transparency: Refinable::fixed(instrument.transparency),
            background: background.coeffs.map(Refinable::fixed),
            phases: model.iter().map(PhaseBlock::from_phase).collect(),
            num_params: 0,
        })
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn num_phases(&self) -> usize {
        self.phases.len()
    }

    pub fn num_params(&self) -> usize {
        self.num_params
    }

    fn slot_mut(&mut self, param: Param) -> Option<&mut Refinable> {
        match param {
            Param::Zero => Some(&mut self.zero),
            Param::Displacement => Some(&mut self.displacement),
            Param::Transparency => Some(&mut self.transparency),
            Param::Background(term) => self.background.get_mut(term),
            Param::Phase { index, param } => {
                self.phases.get_mut(index).map(|phase| phase.slot_mut(param))
            }
        }
    }

    /// Frees `param` under the next ordinal.
    ///
    /// # Errors
    ///
    /// Returns [`RefinementError::MalformedContext`] if `param` does not exist
    /// or is already free.
    pub fn refine(&mut self, param: Param) -> Result<Codeword, RefinementError> {
        let ordinal = u32::try_from(self.num_params + 1)
            .map_err(|_| RefinementError::MalformedContext("too many free parameters".into()))?;
        let slot = self
            .slot_mut(param)
            .ok_or_else(|| RefinementError::MalformedContext(format!("no such parameter: {param:?}")))?;
        if !slot.codeword.is_fixed() {
            return Err(RefinementError::MalformedContext(format!(
                "{param:?} is already free"
            )));
        }
        let codeword = Codeword::refine(ordinal);
        slot.codeword = codeword;
        self.num_params += 1;
        Ok(codeword)
    }

    /// Every refinable slot in deck order.
    pub fn refinables(&self) -> impl Iterator<Item = &Refinable> {
        [&self.zero, &self.displacement, &self.transparency]
            .into_iter()
            .chain(self.background.iter())
            .chain(self.phases.iter().flat_map(|phase| phase.refinables()))
    }

    /// Checks that free codewords carry unique, well-formed ordinals whose
    /// count matches `num_params`, and that at least one parameter is free.
    ///
    /// # Errors
    ///
    /// * [`RefinementError::MalformedContext`] when the codewords disagree
    ///   with `num_params` or repeat an ordinal.
    /// * [`RefinementError::EmptyRefinement`] when nothing is free.
    pub fn validate(&self) -> Result<(), RefinementError> {
        let mut seen = HashSet::new();
        let mut free = 0usize;
        for refinable in self.refinables() {
            let codeword = refinable.codeword;
            if codeword.is_fixed() {
                continue;
            }
            free += 1;
            let ordinal = codeword.ordinal().ok_or_else(|| {
                RefinementError::MalformedContext(format!("codeword {codeword} has no refine flag"))
            })?;
            if !seen.insert(ordinal) {
                return Err(RefinementError::MalformedContext(format!(
                    "ordinal {ordinal} is assigned twice"
                )));
            }
        }
        if free != self.num_params {
            return Err(RefinementError::MalformedContext(format!(
                "{free} free codeword(s) but {} refined parameter(s) declared",
                self.num_params
            )));
        }
        if self.num_params == 0 {
            return Err(RefinementError::EmptyRefinement);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::cell::UnitCell;

    fn model(num_phases: usize) -> PhaseModel {
        (0..num_phases)
            .map(|i| Phase::new(format!("phase-{i}"), "P m -3 m", UnitCell::cubic(4.0 + i as f64)))
            .collect()
    }

    fn context(num_phases: usize) -> RefinementContext {
        RefinementContext::build(&model(num_phases), &Background::default(), &Instrument::default())
            .unwrap()
    }

    #[test]
    fn mode_follows_phase_count() {
        assert_eq!(context(1).mode, Mode::ConstantScale);
        assert_eq!(context(1).mode.irf(), 0);
        assert_eq!(context(3).mode, Mode::ConstantIntensities);
        assert_eq!(context(3).mode.irf(), 2);
        assert_eq!(Mode::ConstantIntensities.code(), 3);
    }

    #[test]
    fn build_starts_with_everything_fixed() {
        let ctx = context(2);
        assert_eq!(ctx.num_params(), 0);
        assert!(ctx.refinables().all(|r| r.codeword.is_fixed()));
        assert_eq!(ctx.phases[1].cell[0].value, 5.0);
        assert!(matches!(ctx.validate(), Err(RefinementError::EmptyRefinement)));
    }

    #[test]
    fn build_rejects_empty_model() {
        let result =
            RefinementContext::build(&PhaseModel::new(), &Background::default(), &Instrument::default());
        assert!(matches!(result, Err(RefinementError::NoPhases)));
    }

    #[test]
    fn refine_allocates_sequential_ordinals() {
        let mut ctx = context(2);
        assert_eq!(ctx.refine(Param::Background(0)).unwrap(), Codeword::refine(1));
        assert_eq!(ctx.refine(Param::Background(1)).unwrap().value(), 21);
        let scale = Param::Phase {
            index: 1,
            param: PhaseParam::Scale,
        };
        assert_eq!(ctx.refine(scale).unwrap().value(), 31);
        assert_eq!(ctx.num_params(), 3);
        assert_eq!(ctx.phases[1].scale.codeword.ordinal(), Some(3));
        ctx.validate().unwrap();
    }

    #[test]
    fn refine_rejects_duplicates_and_unknown_slots() {
        let mut ctx = context(1);
        ctx.refine(Param::Displacement).unwrap();
        assert!(matches!(
            ctx.refine(Param::Displacement),
            Err(RefinementError::MalformedContext(_))
        ));
        assert!(matches!(
            ctx.refine(Param::Background(6)),
            Err(RefinementError::MalformedContext(_))
        ));
        assert!(matches!(
            ctx.refine(Param::Phase {
                index: 1,
                param: PhaseParam::W
            }),
            Err(RefinementError::MalformedContext(_))
        ));
        assert_eq!(ctx.num_params(), 1);
    }

    #[test]
    fn validate_catches_hand_edited_codewords() {
        let mut ctx = context(1);
        ctx.refine(Param::Displacement).unwrap();
        ctx.zero.codeword = Codeword::refine(1);
        assert!(matches!(ctx.validate(), Err(RefinementError::MalformedContext(_))));

        let mut ctx = context(1);
        ctx.zero.codeword = Codeword::refine(1);
        assert!(matches!(ctx.validate(), Err(RefinementError::MalformedContext(_))));
    }

    #[test]
    fn codeword_formatting_and_ordinals() {
        assert_eq!(Codeword::refine(1).to_string(), "11.00");
        assert_eq!(Codeword::refine(12).to_string(), "121.00");
        assert_eq!(Codeword::FIXED.to_string(), "0.00");
        assert_eq!(Codeword::FIXED.ordinal(), None);
        assert_eq!(Codeword::refine(7).ordinal(), Some(7));
    }
}
