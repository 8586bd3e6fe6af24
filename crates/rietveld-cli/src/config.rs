use crate::cli::RefineArgs;
use crate::error::{CliError, Result};
use rietveld::core::models::corrections::{Background, Instrument};
use rietveld::engine::config::{RefinementConfig, RefinementConfigBuilder};
use rietveld::engine::workspace::FileRoot;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

const DEFAULT_FILE_ROOT: &str = "refinement";

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct PartialRefinementSection {
    phases: Option<PathBuf>,
    file_root: Option<PathBuf>,
    title: Option<String>,
    keep_temp_files: Option<bool>,
    timeout_seconds: Option<u64>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct PartialSolverSection {
    directory: Option<PathBuf>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
struct PartialBackgroundSection {
    coefficients: Option<[f64; 6]>,
}

/// The refinement config file. Every section is optional.
#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
pub struct PartialRefineConfig {
    refinement: Option<PartialRefinementSection>,
    solver: Option<PartialSolverSection>,
    instrument: Option<Instrument>,
    background: Option<PartialBackgroundSection>,
}

/// Everything the `refine` command needs once file and CLI are merged.
#[derive(Debug)]
pub struct RefineSettings {
    pub config: RefinementConfig,
    pub phases_path: PathBuf,
    /// `None` falls back to the `FULLPROF` environment variable.
    pub solver_dir: Option<PathBuf>,
}

impl PartialRefineConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading configuration from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })?;
        if let Some(base) = path.parent() {
            config.resolve_relative_paths(base);
        }
        Ok(config)
    }

    /// Paths in the file are relative to the file itself.
    fn resolve_relative_paths(&mut self, base: &Path) {
        let resolve = |path: &mut Option<PathBuf>| {
            if let Some(path) = path.as_mut().filter(|p| p.is_relative()) {
                *path = base.join(&*path);
            }
        };
        if let Some(section) = self.refinement.as_mut() {
            resolve(&mut section.phases);
            resolve(&mut section.file_root);
        }
        if let Some(section) = self.solver.as_mut() {
            resolve(&mut section.directory);
        }
    }

    pub fn merge_with_cli(mut self, args: &RefineArgs) -> Result<RefineSettings> {
        self.apply_set_values(&args.set_values)?;

        let refinement = self.refinement.take().unwrap_or_default();
        let solver = self.solver.take().unwrap_or_default();

        let phases_path = args
            .phases
            .clone()
            .or(refinement.phases)
            .ok_or_else(|| {
                CliError::Config(
                    "A phase file is required either as `refinement.phases` or via --phases."
                        .to_string(),
                )
            })?;

        let root_path = args
            .file_root
            .clone()
            .or(refinement.file_root)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_FILE_ROOT));
        let file_root = FileRoot::from_path(&root_path).ok_or_else(|| {
            CliError::Config(format!(
                "File root '{}' has no file stem.",
                root_path.display()
            ))
        })?;

        let timeout_seconds = args.timeout.or(refinement.timeout_seconds);
        let mut builder = RefinementConfigBuilder::new()
            .file_root(file_root)
            .keep_temp_files(args.keep_temp_files || refinement.keep_temp_files.unwrap_or(false))
            .instrument(self.instrument.unwrap_or_default());
        if let Some(seconds) = timeout_seconds {
            builder = builder.solver_timeout((seconds > 0).then(|| Duration::from_secs(seconds)));
        }
        if let Some(title) = refinement.title {
            builder = builder.title(title);
        }
        if let Some(coeffs) = self.background.and_then(|b| b.coefficients) {
            builder = builder.background(Background { coeffs });
        }

        let config = builder.build().map_err(|e| CliError::Config(e.to_string()))?;
        Ok(RefineSettings {
            config,
            phases_path,
            solver_dir: args.solver_dir.clone().or(solver.directory),
        })
    }

    fn apply_set_values(&mut self, set_values: &[String]) -> Result<()> {
        for kv_pair in set_values {
            let (key, value_str) = kv_pair.split_once('=').ok_or_else(|| {
                CliError::Config(format!(
                    "Invalid --set format: '{}'. Expected KEY=VALUE.",
                    kv_pair
                ))
            })?;

            match key {
                "refinement.title" => {
                    self.refinement.get_or_insert_with(Default::default).title =
                        Some(value_str.to_string());
                }
                "refinement.keep-temp-files" => {
                    self.refinement
                        .get_or_insert_with(Default::default)
                        .keep_temp_files = Some(parse_value(key, value_str)?);
                }
                "refinement.timeout-seconds" => {
                    self.refinement
                        .get_or_insert_with(Default::default)
                        .timeout_seconds = Some(parse_value(key, value_str)?);
                }
                "instrument.zero" => {
                    self.instrument.get_or_insert_with(Default::default).zero =
                        parse_value(key, value_str)?;
                }
                "instrument.displacement" => {
                    self.instrument
                        .get_or_insert_with(Default::default)
                        .displacement = parse_value(key, value_str)?;
                }
                "instrument.transparency" => {
                    self.instrument
                        .get_or_insert_with(Default::default)
                        .transparency = parse_value(key, value_str)?;
                }
                _ => {
                    return Err(CliError::Config(format!(
                        "Unsupported configuration key for --set: '{}'",
                        key
                    )));
                }
            }
        }
        Ok(())
    }
}

fn parse_value<T: FromStr>(key: &str, value_str: &str) -> Result<T> {
    value_str
        .parse()
        .map_err(|_| CliError::Config(format!("Invalid value for {}: {}", key, value_str)))
}
