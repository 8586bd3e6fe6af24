use super::workspace::FileRoot;
use crate::core::models::corrections::{Background, Instrument};
use std::time::Duration;
use thiserror::Error;

/// Upper bound on a single solver run unless configured otherwise.
pub const DEFAULT_SOLVER_TIMEOUT: Duration = Duration::from_secs(600);

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RefinementConfig {
    pub file_root: FileRoot,
    pub title: String,
    pub keep_temp_files: bool,
    /// `None` waits for the solver indefinitely.
    pub solver_timeout: Option<Duration>,
    pub instrument: Instrument,
    pub background: Background,
}

#[derive(Default)]
pub struct RefinementConfigBuilder {
    file_root: Option<FileRoot>,
    title: Option<String>,
    keep_temp_files: Option<bool>,
    solver_timeout: Option<Option<Duration>>,
    instrument: Option<Instrument>,
    background: Option<Background>,
}

impl RefinementConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn file_root(mut self, root: FileRoot) -> Self {
        self.file_root = Some(root);
        self
    }
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
    pub fn keep_temp_files(mut self, keep: bool) -> Self {
        self.keep_temp_files = Some(keep);
        self
    }
    pub fn solver_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.solver_timeout = Some(timeout);
        self
    }
    pub fn instrument(mut self, instrument: Instrument) -> Self {
        self.instrument = Some(instrument);
        self
    }
    pub fn background(mut self, background: Background) -> Self {
        self.background = Some(background);
        self
    }

    /// Builds the configuration. Only the file root is required.
    pub fn build(self) -> Result<RefinementConfig, ConfigError> {
        let file_root = self
            .file_root
            .ok_or(ConfigError::MissingParameter("file_root"))?;
        Ok(RefinementConfig {
            title: self.title.unwrap_or_else(|| file_root.stem().to_string()),
            file_root,
            keep_temp_files: self.keep_temp_files.unwrap_or(false),
            solver_timeout: self.solver_timeout.unwrap_or(Some(DEFAULT_SOLVER_TIMEOUT)),
            instrument: self.instrument.unwrap_or_default(),
            background: self.background.unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_without_file_root_fails() {
        let result = RefinementConfigBuilder::new().keep_temp_files(true).build();
        assert_eq!(result, Err(ConfigError::MissingParameter("file_root")));
    }

    #[test]
    fn build_applies_defaults() {
        let config = RefinementConfigBuilder::new()
            .file_root(FileRoot::new("runs", "corundum"))
            .build()
            .unwrap();
        assert_eq!(config.title, "corundum");
        assert!(!config.keep_temp_files);
        assert_eq!(config.solver_timeout, Some(DEFAULT_SOLVER_TIMEOUT));
        assert_eq!(config.instrument, Instrument::default());
        assert_eq!(config.background.coeffs, [0.0; 6]);
    }

    #[test]
    fn explicit_values_override_defaults() {
        let config = RefinementConfigBuilder::new()
            .file_root(FileRoot::new("runs", "corundum"))
            .title("Al2O3 standard")
            .keep_temp_files(true)
            .solver_timeout(None)
            .build()
            .unwrap();
        assert_eq!(config.title, "Al2O3 standard");
        assert!(config.keep_temp_files);
        assert_eq!(config.solver_timeout, None);
    }
}
