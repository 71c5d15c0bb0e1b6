use crate::error::{CliError, Result};
use serde::Deserialize;
use std::path::Path;
use tracing::debug;

/// Raw, partial experiment configuration as read from a TOML file. Every
/// field is optional; anything absent falls back to the built-in defaults,
/// and CLI flags override both.
#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileConfig {
    pub base_cell: Option<FileBaseCell>,
    pub soap: Option<FileSoapSection>,
    pub derivatives: Option<FileDerivativesSection>,
    pub cm: Option<FileCmSection>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileBaseCell {
    /// The two species of the body-centered base cell.
    pub species: Option<Vec<String>>,
    /// Cubic lattice constant in Angstroms.
    pub lattice_constant: Option<f64>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileSoapSection {
    pub rcut: Option<f64>,
    pub nmax: Option<usize>,
    pub lmax: Option<usize>,
    pub crossover: Option<bool>,
    pub min_cells: Option<usize>,
    pub max_cells: Option<usize>,
    /// Radial basis variants to sweep, e.g. ["gto", "polynomial"].
    pub rbfs: Option<Vec<String>>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileDerivativesSection {
    pub rcut: Option<f64>,
    pub nmax: Option<usize>,
    pub lmax: Option<usize>,
    pub crossover: Option<bool>,
    pub min_cells: Option<usize>,
    pub max_cells: Option<usize>,
    /// Radial basis used for every method, e.g. "gto".
    pub rbf: Option<String>,
    /// Derivative methods to sweep, e.g. ["numerical", "analytical"].
    pub methods: Option<Vec<String>>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileCmSection {
    pub min_cells: Option<usize>,
    pub max_cells: Option<usize>,
    /// Permutation options to sweep, e.g. ["none", "sorted_l2"].
    pub permutations: Option<Vec<String>>,
}

impl FileConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Reading configuration file from {:?}", path);
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })
    }
}
