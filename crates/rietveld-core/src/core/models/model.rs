use super::ids::PhaseId;
use super::phase::Phase;
use serde::Deserialize;
use slotmap::SlotMap;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PhaseLoadError {
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("TOML parsing error for '{path}': {source}")]
    Toml {
        path: String,
        source: toml::de::Error,
    },
    #[error("Phase file '{path}' does not define any [[phase]] tables")]
    Empty { path: String },
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PhaseFile {
    #[serde(default)]
    phase: Vec<Phase>,
}

/// The ordered set of phases refined together against one pattern.
///
/// Phases are stored in a slot map for stable identifiers, while a separate
/// list records insertion order. That order is significant: the input deck
/// lists phases in it, and the solver reports per-phase results in the same
/// sequence, so parsed values are assigned back positionally.
#[derive(Debug, Clone, Default)]
pub struct PhaseModel {
    /// Primary storage for phases.
    phases: SlotMap<PhaseId, Phase>,
    /// Phase identifiers in deck order.
    order: Vec<PhaseId>,
}

impl PhaseModel {
    /// Creates an empty phase model.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a phase model from a TOML file of `[[phase]]` tables.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the phase definition file.
    ///
    /// # Errors
    ///
    /// Returns [`PhaseLoadError`] if the file cannot be read, is not valid
    /// TOML, or defines no phases.
    pub fn load(path: &Path) -> Result<Self, PhaseLoadError> {
        let path_str = path.to_string_lossy().to_string();
        let content = std::fs::read_to_string(path).map_err(|e| PhaseLoadError::Io {
            path: path_str.clone(),
            source: e,
        })?;
        let file: PhaseFile = toml::from_str(&content).map_err(|e| PhaseLoadError::Toml {
            path: path_str.clone(),
            source: e,
        })?;
        if file.phase.is_empty() {
            return Err(PhaseLoadError::Empty { path: path_str });
        }
        Ok(file.phase.into_iter().collect())
    }

    /// Appends a phase at the end of the deck order.
    ///
    /// # Return
    ///
    /// The identifier assigned to the new phase.
    pub fn add_phase(&mut self, phase: Phase) -> PhaseId {
        let id = self.phases.insert(phase);
        self.order.push(id);
        id
    }

    pub fn phase(&self, id: PhaseId) -> Option<&Phase> {
        self.phases.get(id)
    }

    pub fn phase_mut(&mut self, id: PhaseId) -> Option<&mut Phase> {
        self.phases.get_mut(id)
    }

    /// Returns the number of phases in the model.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Returns an iterator over phases in deck order.
    pub fn iter(&self) -> impl Iterator<Item = &Phase> {
        self.order.iter().map(|id| &self.phases[*id])
    }

    /// Returns an iterator over `(PhaseId, &Phase)` pairs in deck order.
    pub fn iter_with_ids(&self) -> impl Iterator<Item = (PhaseId, &Phase)> {
        self.order.iter().map(|id| (*id, &self.phases[*id]))
    }

    /// Returns a mutable iterator over phases in deck order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Phase> {
        // Phases are never removed, so slot order is insertion order.
        self.phases.values_mut()
    }

    /// Returns the phase identifiers in deck order.
    pub fn ids(&self) -> &[PhaseId] {
        &self.order
    }
}

impl PartialEq for PhaseModel {
    /// Two models are equal when they hold equal phases in the same order.
    fn eq(&self, other: &Self) -> bool {
        self.iter().eq(other.iter())
    }
}

impl FromIterator<Phase> for PhaseModel {
    fn from_iter<I: IntoIterator<Item = Phase>>(iter: I) -> Self {
        let mut model = Self::new();
        for phase in iter {
            model.add_phase(phase);
        }
        model
    }
}
