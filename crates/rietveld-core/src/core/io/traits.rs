use std::error::Error;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// Defines the interface for rendering a solver input file.
///
/// Each implementor owns one file layout and renders it from a typed source
/// value, so the layout is fixed at compile time rather than filled in from
/// a keyed template.
pub trait InputFile {
    /// The value rendered into the file.
    type Source: ?Sized;

    /// The error type for rendering operations.
    type Error: Error + From<io::Error>;

    /// Renders `source` into `writer`.
    ///
    /// # Arguments
    ///
    /// * `source` - The value to render.
    /// * `writer` - The writer to output to.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails or the source cannot be rendered.
    fn write_to(source: &Self::Source, writer: &mut impl Write) -> Result<(), Self::Error>;

    /// Renders `source` into a newly created file at `path`.
    ///
    /// # Arguments
    ///
    /// * `source` - The value to render.
    /// * `path` - The path of the file to create or truncate.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created or writing fails.
    fn write_to_path<P: AsRef<Path>>(source: &Self::Source, path: P) -> Result<(), Self::Error> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        Self::write_to(source, &mut writer)?;
        writer.flush()?;
        Ok(())
    }
}
