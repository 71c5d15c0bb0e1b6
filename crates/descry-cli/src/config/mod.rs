pub mod defaults;
pub mod file;

use crate::cli::ExperimentArgs;
use crate::error::{CliError, Result};
use defaults::DefaultsConfig;
use descry::core::basis::RadialBasisKind;
use descry::core::models::structure::Structure;
use descry::engine::coulomb::Permutation;
use descry::engine::soap::DerivativeMethod;
use descry::workflows::scaling::{
    CoulombScalingConfig, CoulombScalingConfigBuilder, DerivativeScalingConfig,
    DerivativeScalingConfigBuilder, SoapScalingConfig, SoapScalingConfigBuilder,
};
use file::FileConfig;
use std::str::FromStr;
use tracing::info;

/// Resolves the SOAP scaling experiment configuration: built-in defaults,
/// overridden by the TOML file, overridden by CLI flags.
pub fn resolve_soap(args: &ExperimentArgs) -> Result<SoapScalingConfig> {
    let defaults = DefaultsConfig::default();
    let file = load_file(args)?;
    let section = file.soap.clone().unwrap_or_default();
    let (structure, species) = base_cell(&file, &defaults)?;

    let variants = match &section.rbfs {
        Some(names) => parse_names::<RadialBasisKind>(names, "radial basis")?,
        None => defaults.rbfs,
    };

    SoapScalingConfigBuilder::new()
        .base_structure(structure)
        .sweep(
            args.min_cells
                .or(section.min_cells)
                .unwrap_or(defaults.soap_sweep.0),
            args.max_cells
                .or(section.max_cells)
                .unwrap_or(defaults.soap_sweep.1),
        )
        .variants(variants)
        .rcut(args.rcut.or(section.rcut).unwrap_or(defaults.rcut))
        .nmax(args.nmax.or(section.nmax).unwrap_or(defaults.nmax))
        .lmax(args.lmax.or(section.lmax).unwrap_or(defaults.lmax))
        .species(species)
        .crossover(section.crossover.unwrap_or(defaults.crossover))
        .periodic(defaults.periodic)
        .build()
        .map_err(|e| CliError::Config(e.to_string()))
}

/// Resolves the derivative scaling experiment configuration with the same
/// precedence rules as [`resolve_soap`].
pub fn resolve_derivatives(args: &ExperimentArgs) -> Result<DerivativeScalingConfig> {
    let defaults = DefaultsConfig::default();
    let file = load_file(args)?;
    let section = file.derivatives.clone().unwrap_or_default();
    let (structure, species) = base_cell(&file, &defaults)?;

    let variants = match &section.methods {
        Some(names) => parse_names::<DerivativeMethod>(names, "derivative method")?,
        None => defaults.methods,
    };
    let rbf = match &section.rbf {
        Some(name) => parse_name::<RadialBasisKind>(name, "radial basis")?,
        None => RadialBasisKind::Gto,
    };

    DerivativeScalingConfigBuilder::new()
        .base_structure(structure)
        .sweep(
            args.min_cells
                .or(section.min_cells)
                .unwrap_or(defaults.derivative_sweep.0),
            args.max_cells
                .or(section.max_cells)
                .unwrap_or(defaults.derivative_sweep.1),
        )
        .variants(variants)
        .rbf(rbf)
        .rcut(args.rcut.or(section.rcut).unwrap_or(defaults.rcut))
        .nmax(args.nmax.or(section.nmax).unwrap_or(defaults.nmax))
        .lmax(args.lmax.or(section.lmax).unwrap_or(defaults.lmax))
        .species(species)
        .crossover(section.crossover.unwrap_or(defaults.crossover))
        .periodic(defaults.periodic)
        .build()
        .map_err(|e| CliError::Config(e.to_string()))
}

/// Resolves the Coulomb-matrix scaling experiment configuration.
pub fn resolve_cm(args: &ExperimentArgs) -> Result<CoulombScalingConfig> {
    let defaults = DefaultsConfig::default();
    let file = load_file(args)?;
    let section = file.cm.clone().unwrap_or_default();
    let (structure, _) = base_cell(&file, &defaults)?;

    let variants = match &section.permutations {
        Some(names) => parse_names::<Permutation>(names, "permutation")?,
        None => defaults.permutations,
    };

    CoulombScalingConfigBuilder::new()
        .base_structure(structure)
        .sweep(
            args.min_cells
                .or(section.min_cells)
                .unwrap_or(defaults.cm_sweep.0),
            args.max_cells
                .or(section.max_cells)
                .unwrap_or(defaults.cm_sweep.1),
        )
        .variants(variants)
        .build()
        .map_err(|e| CliError::Config(e.to_string()))
}

fn load_file(args: &ExperimentArgs) -> Result<FileConfig> {
    match &args.config {
        Some(path) => {
            info!("Merging configuration from {:?} and CLI arguments.", path);
            FileConfig::from_file(path)
        }
        None => Ok(FileConfig::default()),
    }
}

fn base_cell(
    file: &FileConfig,
    defaults: &DefaultsConfig,
) -> Result<(Structure, Vec<String>)> {
    let section = file.base_cell.clone().unwrap_or_default();
    let species = section.species.unwrap_or_else(|| defaults.species.clone());
    if species.len() != 2 {
        return Err(CliError::Config(format!(
            "base cell needs exactly two species, got {}",
            species.len()
        )));
    }
    let lattice_constant = section
        .lattice_constant
        .unwrap_or(defaults.lattice_constant);
    if lattice_constant <= 0.0 {
        return Err(CliError::Config(format!(
            "lattice constant must be positive, got {lattice_constant}"
        )));
    }

    let structure = Structure::body_centered(&species[0], &species[1], lattice_constant)?;
    Ok((structure, species))
}

fn parse_name<T: FromStr>(name: &str, what: &str) -> Result<T> {
    name.parse::<T>()
        .map_err(|_| CliError::Config(format!("Unknown {what} '{name}'")))
}

fn parse_names<T: FromStr>(names: &[String], what: &str) -> Result<Vec<T>> {
    names.iter().map(|name| parse_name(name, what)).collect()
}
