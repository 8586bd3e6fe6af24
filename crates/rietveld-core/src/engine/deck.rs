use super::context::{Refinable, RefinementContext};
use super::error::RefinementError;
use crate::core::io::traits::InputFile;
use std::io::Write;

const SEPARATOR: &str =
    "!-------------------------------------------------------------------------------";

/// Refinement cycles and convergence threshold written to every deck.
const CYCLES: u32 = 20;
const EPSILON: f64 = 0.1;

/// The FullProf control file (`.pcr`) for one solver run.
///
/// The layout is fixed; only values and codewords vary. The context is
/// validated before anything is written.
pub struct DeckFile;

impl InputFile for DeckFile {
    type Source = RefinementContext;
    type Error = RefinementError;

    fn write_to(ctx: &RefinementContext, writer: &mut impl Write) -> Result<(), RefinementError> {
        ctx.validate()?;

        writeln!(writer, "COMM {}", ctx.title)?;
        writeln!(
            writer,
            "!Job Npr Nph Nba Nex Nsc Nor Dum Iwg Ilo Ias Res Ste Nre Cry Uni Cor Opt Aut"
        )?;
        writeln!(
            writer,
            "   0   7 {:>3}   0   0   0   0   0   0   0   0   0   0   0   0   0   0   0   1",
            ctx.num_phases()
        )?;
        writeln!(writer, "!")?;
        writeln!(
            writer,
            "!Ipr Ppl Ioc Mat Pcr Ls1 Ls2 Ls3 NLI Prf Ins Rpa Sym Hkl Fou Sho Ana"
        )?;
        writeln!(
            writer,
            "   0   0   1   0   1   0   4   0   0   3  10   0   0   0   0   0   0"
        )?;
        writeln!(writer, "!")?;
        writeln!(
            writer,
            "! lambda1 Lambda2    Ratio    Bkpos    Wdt    Cthm     muR   AsyLim   Rpolarz  2nd-muR"
        )?;
        writeln!(
            writer,
            " {:.6} {:.6} {:>8.5}   40.000  8.0000  0.0000  0.0000   30.00    0.0000  0.0000",
            ctx.wavelengths.0, ctx.wavelengths.1, ctx.wavelength_ratio
        )?;
        writeln!(writer, "!NCY  Eps  R_at  R_an  R_pr  R_gl")?;
        writeln!(writer, " {CYCLES:>3}  {EPSILON:.2}  1.00  1.00  1.00  1.00")?;
        writeln!(writer, "!")?;
        writeln!(writer, "{:>8}    !Number of refined parameters", ctx.num_params())?;
        writeln!(writer, "!")?;
        writeln!(writer, "!  Zero    Code    SyCos    Code   SySin    Code")?;
        write_refinables(writer, &[ctx.zero, ctx.displacement, ctx.transparency])?;
        writeln!(writer, "!   Background coefficients/codes (polynomial of 6th degree)")?;
        write_values(writer, &ctx.background)?;
        write_codewords(writer, &ctx.background)?;

        for (index, phase) in ctx.phases.iter().enumerate() {
            writeln!(writer, "{SEPARATOR}")?;
            writeln!(writer, "!  Data for PHASE number: {:>3}", index + 1)?;
            writeln!(writer, "{SEPARATOR}")?;
            writeln!(writer, "{}", phase.name)?;
            writeln!(writer, "!")?;
            writeln!(
                writer,
                "!Nat Dis Ang Pr1 Pr2 Pr3 Jbt Irf Isy Str Furth       ATZ    Nvk Npr More"
            )?;
            writeln!(
                writer,
                "   0   0   0 0.0 0.0 1.0 {:>3} {:>3}   0   0   0        0.000   0   7   0",
                ctx.mode.code(),
                ctx.mode.irf()
            )?;
            writeln!(writer, "!")?;
            writeln!(writer, "{:<22}<--Space group symbol", phase.space_group)?;
            writeln!(writer, "!     Scale        Shape1       Bov")?;
            write_refinables(writer, &[phase.scale, phase.eta, phase.bov])?;
            writeln!(writer, "!       U            V            W            X            Iy")?;
            write_refinables(writer, &[phase.u, phase.v, phase.w, phase.x, phase.i_g])?;
            writeln!(writer, "!     a            b            c         alpha        beta       gamma")?;
            write_refinables(writer, &phase.cell)?;
        }
        Ok(())
    }
}

fn write_values(writer: &mut impl Write, refinables: &[Refinable]) -> std::io::Result<()> {
    for refinable in refinables {
        write!(writer, " {:>12.6}", refinable.value)?;
    }
    writeln!(writer)
}

fn write_codewords(writer: &mut impl Write, refinables: &[Refinable]) -> std::io::Result<()> {
    for refinable in refinables {
        write!(writer, " {:>12}", refinable.codeword.to_string())?;
    }
    writeln!(writer)
}

/// A value row followed by its codeword row.
fn write_refinables(writer: &mut impl Write, refinables: &[Refinable]) -> std::io::Result<()> {
    write_values(writer, refinables)?;
    write_codewords(writer, refinables)
}
