use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// The directory and file stem shared by every file of one refinement.
///
/// FullProf derives all of its file names from the deck's stem, so a root of
/// `runs/sample` means `runs/sample.pcr`, `runs/sample.dat`,
/// `runs/sample1.hkl`, `runs/sample.sum` and so on. Concurrent refinements
/// must use distinct roots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRoot {
    dir: PathBuf,
    stem: String,
}

impl FileRoot {
    /// Creates a root from an explicit directory and stem.
    ///
    /// An empty directory means the current working directory.
    pub fn new(dir: impl Into<PathBuf>, stem: impl Into<String>) -> Self {
        let dir = dir.into();
        let dir = if dir.as_os_str().is_empty() {
            PathBuf::from(".")
        } else {
            dir
        };
        Self {
            dir,
            stem: stem.into(),
        }
    }

    /// Splits a path such as `runs/sample` into directory and stem.
    ///
    /// Returns `None` when the path has no final component to use as a stem.
    pub fn from_path(path: impl AsRef<Path>) -> Option<Self> {
        let path = path.as_ref();
        let stem = path.file_name()?.to_str()?.to_string();
        let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        Some(Self::new(dir, stem))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn stem(&self) -> &str {
        &self.stem
    }

    fn with_extension(&self, extension: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", self.stem, extension))
    }

    pub fn deck_path(&self) -> PathBuf {
        self.with_extension("pcr")
    }

    pub fn data_path(&self) -> PathBuf {
        self.with_extension("dat")
    }

    /// Reflection list of the phase at zero-based `index` (`<stem><index+1>.hkl`).
    pub fn reflections_path(&self, index: usize) -> PathBuf {
        self.dir.join(format!("{}{}.hkl", self.stem, index + 1))
    }

    pub fn log_path(&self) -> PathBuf {
        self.with_extension("log")
    }

    pub fn summary_path(&self) -> PathBuf {
        self.with_extension("sum")
    }

    pub fn output_path(&self) -> PathBuf {
        self.with_extension("out")
    }

    /// The calculated diffractogram. It outlives cleanup.
    pub fn result_path(&self) -> PathBuf {
        self.with_extension("prf")
    }

    pub fn ensure_dir(&self) -> io::Result<()> {
        fs::create_dir_all(&self.dir)
    }

    /// Every temporary file a run with `num_phases` phases may leave behind.
    pub fn temp_files(&self, num_phases: usize) -> Vec<PathBuf> {
        let mut files = vec![
            self.log_path(),
            self.summary_path(),
            self.output_path(),
            self.data_path(),
        ];
        files.extend((0..num_phases).map(|index| self.reflections_path(index)));
        files.push(self.deck_path());
        files
    }

    /// Removes the temporary files of a run, keeping the result file.
    ///
    /// Files that were never written are skipped.
    pub fn cleanup(&self, num_phases: usize) -> io::Result<()> {
        for path in self.temp_files(num_phases) {
            match fs::remove_file(&path) {
                Ok(()) => debug!(path = %path.display(), "Removed temporary file."),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn from_path_splits_directory_and_stem() {
        let root = FileRoot::from_path("runs/sample").unwrap();
        assert_eq!(root.dir(), Path::new("runs"));
        assert_eq!(root.stem(), "sample");
        assert_eq!(root.deck_path(), PathBuf::from("runs/sample.pcr"));
        assert_eq!(root.reflections_path(0), PathBuf::from("runs/sample1.hkl"));
        assert_eq!(root.reflections_path(1), PathBuf::from("runs/sample2.hkl"));
    }

    #[test]
    fn bare_stem_uses_current_directory() {
        let root = FileRoot::from_path("sample").unwrap();
        assert_eq!(root.dir(), Path::new("."));
        assert_eq!(root.summary_path(), PathBuf::from("./sample.sum"));
    }

    #[test]
    fn from_path_without_file_name_is_none() {
        assert!(FileRoot::from_path("/").is_none());
    }

    #[test]
    fn cleanup_keeps_result_file_and_ignores_missing_files() {
        let dir = tempdir().unwrap();
        let root = FileRoot::new(dir.path(), "refinement");
        for path in [
            root.deck_path(),
            root.data_path(),
            root.log_path(),
            root.summary_path(),
            root.reflections_path(0),
            root.result_path(),
        ] {
            fs::write(&path, "x").unwrap();
        }

        root.cleanup(2).unwrap();

        for path in root.temp_files(2) {
            assert!(!path.exists(), "{} should be removed", path.display());
        }
        assert!(root.result_path().exists());
    }
}
