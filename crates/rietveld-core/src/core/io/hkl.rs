use super::traits::InputFile;
use crate::core::models::phase::Phase;
use std::io::{self, Write};

/// Trial symmetry code written ahead of the space group in reflection files.
const TRIAL_SYMMETRY_CODE: &str = "30 0 0.00";

/// A per-phase reflection list read by FullProf when reflections are supplied
/// externally (`Irf = 2`).
///
/// Layout: the phase name, then `30 0 0.00 SPGr: <space group>`, then one
/// ` h k l multiplicity intensity` row per reflection in list order.
pub struct HklFile;

impl InputFile for HklFile {
    type Source = Phase;
    type Error = io::Error;

    fn write_to(phase: &Phase, writer: &mut impl Write) -> io::Result<()> {
        writeln!(writer, "{}", phase)?;
        writeln!(writer, "{} SPGr: {}", TRIAL_SYMMETRY_CODE, phase.space_group)?;
        for reflection in &phase.reflections {
            let hkl = reflection.hkl;
            writeln!(
                writer,
                " {} {} {} {} {}",
                hkl.h, hkl.k, hkl.l, reflection.multiplicity, reflection.intensity
            )?;
        }
        Ok(())
    }
}
