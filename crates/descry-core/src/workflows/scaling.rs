use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info, instrument};

use crate::core::basis::RadialBasisKind;
use crate::core::io::samples::{TimingSample, VariantSeries};
use crate::core::models::structure::{Structure, StructureError};
use crate::engine::coulomb::{CoulombMatrix, Permutation};
use crate::engine::error::DescriptorError;
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::soap::{DerivativeMethod, Soap, SoapParameters};

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),

    #[error("Sweep range must be ascending and start at 1 or above, got {start}..{end}")]
    InvalidSweep { start: usize, end: usize },
}

#[derive(Debug, Error)]
pub enum ExperimentError {
    #[error(transparent)]
    Descriptor(#[from] DescriptorError),

    #[error(transparent)]
    Structure(#[from] StructureError),
}

/// A contiguous, ascending half-open range of replication counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepRange {
    pub start: usize,
    pub end: usize,
}

impl SweepRange {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    pub fn counts(&self) -> std::ops::Range<usize> {
        self.start..self.end
    }

    fn validate(self) -> Result<Self, ConfigError> {
        if self.start == 0 || self.end <= self.start {
            return Err(ConfigError::InvalidSweep {
                start: self.start,
                end: self.end,
            });
        }
        Ok(self)
    }
}

/// Descriptor settings shared by every variant of a sweep.
#[derive(Debug, Clone, PartialEq)]
pub struct SoapHyperparameters {
    pub rcut: f64,
    pub nmax: usize,
    pub lmax: usize,
    pub species: Vec<String>,
    pub crossover: bool,
    pub periodic: bool,
}

impl SoapHyperparameters {
    fn to_parameters(&self, rbf: RadialBasisKind) -> SoapParameters {
        SoapParameters {
            rcut: self.rcut,
            nmax: self.nmax,
            lmax: self.lmax,
            species: self.species.clone(),
            rbf,
            crossover: self.crossover,
            periodic: self.periodic,
        }
    }
}

/// The timing curves produced by one scaling experiment, one series per
/// configuration variant, each in sweep order.
#[derive(Debug, Clone, PartialEq)]
pub struct ScalingReport {
    pub series: Vec<VariantSeries>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SoapScalingConfig {
    pub base_structure: Structure,
    pub sweep: SweepRange,
    pub variants: Vec<RadialBasisKind>,
    pub hyperparameters: SoapHyperparameters,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DerivativeScalingConfig {
    pub base_structure: Structure,
    pub sweep: SweepRange,
    pub variants: Vec<DerivativeMethod>,
    pub rbf: RadialBasisKind,
    pub hyperparameters: SoapHyperparameters,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CoulombScalingConfig {
    pub base_structure: Structure,
    pub sweep: SweepRange,
    pub variants: Vec<Permutation>,
}

#[derive(Default)]
pub struct SoapScalingConfigBuilder {
    base_structure: Option<Structure>,
    sweep: Option<SweepRange>,
    variants: Option<Vec<RadialBasisKind>>,
    rcut: Option<f64>,
    nmax: Option<usize>,
    lmax: Option<usize>,
    species: Option<Vec<String>>,
    crossover: Option<bool>,
    periodic: Option<bool>,
}

impl SoapScalingConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn base_structure(mut self, structure: Structure) -> Self {
        self.base_structure = Some(structure);
        self
    }
    pub fn sweep(mut self, start: usize, end: usize) -> Self {
        self.sweep = Some(SweepRange { start, end });
        self
    }
    pub fn variants(mut self, variants: Vec<RadialBasisKind>) -> Self {
        self.variants = Some(variants);
        self
    }
    pub fn rcut(mut self, rcut: f64) -> Self {
        self.rcut = Some(rcut);
        self
    }
    pub fn nmax(mut self, nmax: usize) -> Self {
        self.nmax = Some(nmax);
        self
    }
    pub fn lmax(mut self, lmax: usize) -> Self {
        self.lmax = Some(lmax);
        self
    }
    pub fn species(mut self, species: Vec<String>) -> Self {
        self.species = Some(species);
        self
    }
    pub fn crossover(mut self, crossover: bool) -> Self {
        self.crossover = Some(crossover);
        self
    }
    pub fn periodic(mut self, periodic: bool) -> Self {
        self.periodic = Some(periodic);
        self
    }

    pub fn build(self) -> Result<SoapScalingConfig, ConfigError> {
        Ok(SoapScalingConfig {
            base_structure: self
                .base_structure
                .ok_or(ConfigError::MissingParameter("base_structure"))?,
            sweep: self
                .sweep
                .ok_or(ConfigError::MissingParameter("sweep"))?
                .validate()?,
            variants: self
                .variants
                .ok_or(ConfigError::MissingParameter("variants"))?,
            hyperparameters: SoapHyperparameters {
                rcut: self.rcut.ok_or(ConfigError::MissingParameter("rcut"))?,
                nmax: self.nmax.ok_or(ConfigError::MissingParameter("nmax"))?,
                lmax: self.lmax.ok_or(ConfigError::MissingParameter("lmax"))?,
                species: self
                    .species
                    .ok_or(ConfigError::MissingParameter("species"))?,
                crossover: self
                    .crossover
                    .ok_or(ConfigError::MissingParameter("crossover"))?,
                periodic: self
                    .periodic
                    .ok_or(ConfigError::MissingParameter("periodic"))?,
            },
        })
    }
}

#[derive(Default)]
pub struct DerivativeScalingConfigBuilder {
    base_structure: Option<Structure>,
    sweep: Option<SweepRange>,
    variants: Option<Vec<DerivativeMethod>>,
    rbf: Option<RadialBasisKind>,
    rcut: Option<f64>,
    nmax: Option<usize>,
    lmax: Option<usize>,
    species: Option<Vec<String>>,
    crossover: Option<bool>,
    periodic: Option<bool>,
}

impl DerivativeScalingConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn base_structure(mut self, structure: Structure) -> Self {
        self.base_structure = Some(structure);
        self
    }
    pub fn sweep(mut self, start: usize, end: usize) -> Self {
        self.sweep = Some(SweepRange { start, end });
        self
    }
    pub fn variants(mut self, variants: Vec<DerivativeMethod>) -> Self {
        self.variants = Some(variants);
        self
    }
    /// Radial basis used for every derivative variant. Defaults to GTO.
    pub fn rbf(mut self, rbf: RadialBasisKind) -> Self {
        self.rbf = Some(rbf);
        self
    }
    pub fn rcut(mut self, rcut: f64) -> Self {
        self.rcut = Some(rcut);
        self
    }
    pub fn nmax(mut self, nmax: usize) -> Self {
        self.nmax = Some(nmax);
        self
    }
    pub fn lmax(mut self, lmax: usize) -> Self {
        self.lmax = Some(lmax);
        self
    }
    pub fn species(mut self, species: Vec<String>) -> Self {
        self.species = Some(species);
        self
    }
    pub fn crossover(mut self, crossover: bool) -> Self {
        self.crossover = Some(crossover);
        self
    }
    pub fn periodic(mut self, periodic: bool) -> Self {
        self.periodic = Some(periodic);
        self
    }

    pub fn build(self) -> Result<DerivativeScalingConfig, ConfigError> {
        Ok(DerivativeScalingConfig {
            base_structure: self
                .base_structure
                .ok_or(ConfigError::MissingParameter("base_structure"))?,
            sweep: self
                .sweep
                .ok_or(ConfigError::MissingParameter("sweep"))?
                .validate()?,
            variants: self
                .variants
                .ok_or(ConfigError::MissingParameter("variants"))?,
            rbf: self.rbf.unwrap_or(RadialBasisKind::Gto),
            hyperparameters: SoapHyperparameters {
                rcut: self.rcut.ok_or(ConfigError::MissingParameter("rcut"))?,
                nmax: self.nmax.ok_or(ConfigError::MissingParameter("nmax"))?,
                lmax: self.lmax.ok_or(ConfigError::MissingParameter("lmax"))?,
                species: self
                    .species
                    .ok_or(ConfigError::MissingParameter("species"))?,
                crossover: self
                    .crossover
                    .ok_or(ConfigError::MissingParameter("crossover"))?,
                periodic: self
                    .periodic
                    .ok_or(ConfigError::MissingParameter("periodic"))?,
            },
        })
    }
}

#[derive(Default)]
pub struct CoulombScalingConfigBuilder {
    base_structure: Option<Structure>,
    sweep: Option<SweepRange>,
    variants: Option<Vec<Permutation>>,
}

impl CoulombScalingConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn base_structure(mut self, structure: Structure) -> Self {
        self.base_structure = Some(structure);
        self
    }
    pub fn sweep(mut self, start: usize, end: usize) -> Self {
        self.sweep = Some(SweepRange { start, end });
        self
    }
    pub fn variants(mut self, variants: Vec<Permutation>) -> Self {
        self.variants = Some(variants);
        self
    }

    pub fn build(self) -> Result<CoulombScalingConfig, ConfigError> {
        Ok(CoulombScalingConfig {
            base_structure: self
                .base_structure
                .ok_or(ConfigError::MissingParameter("base_structure"))?,
            sweep: self
                .sweep
                .ok_or(ConfigError::MissingParameter("sweep"))?
                .validate()?,
            variants: self
                .variants
                .ok_or(ConfigError::MissingParameter("variants"))?,
        })
    }
}

/// Times SOAP descriptor generation over increasing system sizes.
///
/// For each radial basis variant, each replication count in the sweep range
/// (ascending, no skipping) gets a freshly configured engine and a fresh
/// uniformly tiled copy of the base structure; the wall-clock time of one
/// `create` call becomes one sample. The first failing step aborts the
/// whole sweep.
#[instrument(skip_all, name = "soap_scaling")]
pub fn run_soap_scaling(
    config: &SoapScalingConfig,
    reporter: &ProgressReporter,
) -> Result<ScalingReport, ExperimentError> {
    info!(
        variants = config.variants.len(),
        points = config.sweep.len(),
        "Starting SOAP scaling sweep."
    );
    reporter.report(Progress::PhaseStart {
        name: "SOAP scaling",
    });

    let mut series = Vec::with_capacity(config.variants.len());
    for &rbf in &config.variants {
        reporter.report(Progress::Message(format!("rbf={rbf}")));
        reporter.report(Progress::SweepStart {
            total_points: config.sweep.len() as u64,
        });

        let mut samples = Vec::with_capacity(config.sweep.len());
        for count in config.sweep.counts() {
            let soap = Soap::new(config.hyperparameters.to_parameters(rbf))?;
            let tiled = config.base_structure.repeat_uniform(count)?;

            let started = Instant::now();
            soap.create(&tiled)?;
            let seconds = started.elapsed().as_secs_f64();

            debug!(rbf = %rbf, n_atoms = tiled.len(), seconds, "Timed descriptor generation.");
            reporter.report(Progress::PointComplete {
                n_atoms: tiled.len(),
                seconds,
            });
            samples.push(TimingSample {
                n_atoms: tiled.len(),
                seconds,
            });
        }
        series.push(VariantSeries {
            label: rbf.to_string(),
            samples,
        });
    }

    reporter.report(Progress::PhaseFinish);
    info!("SOAP scaling sweep complete.");
    Ok(ScalingReport { series })
}

/// Times SOAP derivative generation over increasing system sizes.
///
/// Tiling here runs along the first two cell axes only; the third axis
/// stays at one repeat. The derivative tensor grows with the square of the
/// site count, and the two-axis sweep keeps it within reach while the
/// curves stay comparable with earlier runs of this experiment.
#[instrument(skip_all, name = "derivative_scaling")]
pub fn run_derivative_scaling(
    config: &DerivativeScalingConfig,
    reporter: &ProgressReporter,
) -> Result<ScalingReport, ExperimentError> {
    info!(
        variants = config.variants.len(),
        points = config.sweep.len(),
        "Starting derivative scaling sweep."
    );
    reporter.report(Progress::PhaseStart {
        name: "SOAP derivative scaling",
    });

    let mut series = Vec::with_capacity(config.variants.len());
    for &method in &config.variants {
        reporter.report(Progress::Message(format!("method={method}")));
        reporter.report(Progress::SweepStart {
            total_points: config.sweep.len() as u64,
        });

        let mut samples = Vec::with_capacity(config.sweep.len());
        for count in config.sweep.counts() {
            let soap = Soap::new(config.hyperparameters.to_parameters(config.rbf))?;
            let tiled = config.base_structure.repeat([count, count, 1])?;

            let started = Instant::now();
            soap.derivatives(&tiled, method)?;
            let seconds = started.elapsed().as_secs_f64();

            debug!(method = %method, n_atoms = tiled.len(), seconds, "Timed derivative generation.");
            reporter.report(Progress::PointComplete {
                n_atoms: tiled.len(),
                seconds,
            });
            samples.push(TimingSample {
                n_atoms: tiled.len(),
                seconds,
            });
        }
        series.push(VariantSeries {
            label: method.to_string(),
            samples,
        });
    }

    reporter.report(Progress::PhaseFinish);
    info!("Derivative scaling sweep complete.");
    Ok(ScalingReport { series })
}

/// Times Coulomb-matrix generation over increasing system sizes, one curve
/// per permutation option. The engine is sized to the tiled structure at
/// every point, so padding never dominates the measurement.
#[instrument(skip_all, name = "coulomb_scaling")]
pub fn run_coulomb_scaling(
    config: &CoulombScalingConfig,
    reporter: &ProgressReporter,
) -> Result<ScalingReport, ExperimentError> {
    info!(
        variants = config.variants.len(),
        points = config.sweep.len(),
        "Starting Coulomb-matrix scaling sweep."
    );
    reporter.report(Progress::PhaseStart {
        name: "Coulomb-matrix scaling",
    });

    let mut series = Vec::with_capacity(config.variants.len());
    for &permutation in &config.variants {
        reporter.report(Progress::Message(format!("permutation={permutation}")));
        reporter.report(Progress::SweepStart {
            total_points: config.sweep.len() as u64,
        });

        let mut samples = Vec::with_capacity(config.sweep.len());
        for count in config.sweep.counts() {
            let tiled = config.base_structure.repeat_uniform(count)?;
            let engine = CoulombMatrix::new(tiled.len(), permutation)?;

            let started = Instant::now();
            engine.create(&tiled)?;
            let seconds = started.elapsed().as_secs_f64();

            debug!(permutation = %permutation, n_atoms = tiled.len(), seconds, "Timed Coulomb matrix.");
            reporter.report(Progress::PointComplete {
                n_atoms: tiled.len(),
                seconds,
            });
            samples.push(TimingSample {
                n_atoms: tiled.len(),
                seconds,
            });
        }
        series.push(VariantSeries {
            label: permutation.to_string(),
            samples,
        });
    }

    reporter.report(Progress::PhaseFinish);
    info!("Coulomb-matrix scaling sweep complete.");
    Ok(ScalingReport { series })
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::{Matrix3, Point3, Vector3};
    use std::sync::Mutex;

    fn niti_cell() -> Structure {
        let a = 2.993;
        Structure::periodic(
            vec!["Ni".to_string(), "Ti".to_string()],
            vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(a / 2.0, a / 2.0, a / 2.0),
            ],
            Matrix3::from_diagonal(&Vector3::new(a, a, a)),
        )
        .unwrap()
    }

    fn soap_config(variants: Vec<RadialBasisKind>) -> SoapScalingConfig {
        SoapScalingConfigBuilder::new()
            .base_structure(niti_cell())
            .sweep(1, 3)
            .variants(variants)
            .rcut(3.0)
            .nmax(2)
            .lmax(1)
            .species(vec!["Ni".to_string(), "Ti".to_string()])
            .crossover(true)
            .periodic(true)
            .build()
            .unwrap()
    }

    #[test]
    fn soap_sweep_produces_one_series_per_variant_with_full_length() {
        let config = soap_config(vec![RadialBasisKind::Gto, RadialBasisKind::Polynomial]);
        let report = run_soap_scaling(&config, &ProgressReporter::new()).unwrap();

        assert_eq!(report.series.len(), 2);
        assert_eq!(report.series[0].label, "gto");
        assert_eq!(report.series[1].label, "polynomial");
        for series in &report.series {
            assert_eq!(series.samples.len(), 2);
        }
    }

    #[test]
    fn soap_sweep_site_counts_grow_cubically_and_strictly() {
        let config = soap_config(vec![RadialBasisKind::Gto]);
        let report = run_soap_scaling(&config, &ProgressReporter::new()).unwrap();

        let samples = &report.series[0].samples;
        assert_eq!(samples[0].n_atoms, 2);
        assert_eq!(samples[1].n_atoms, 16);
        for pair in samples.windows(2) {
            assert!(pair[1].n_atoms > pair[0].n_atoms);
        }
        assert!(samples.iter().all(|s| s.seconds >= 0.0));
    }

    #[test]
    fn derivative_sweep_tiles_along_two_axes_only() {
        let config = DerivativeScalingConfigBuilder::new()
            .base_structure(niti_cell())
            .sweep(1, 3)
            .variants(vec![
                DerivativeMethod::Numerical,
                DerivativeMethod::Analytical,
            ])
            .rcut(3.0)
            .nmax(2)
            .lmax(1)
            .species(vec!["Ni".to_string(), "Ti".to_string()])
            .crossover(true)
            .periodic(true)
            .build()
            .unwrap();
        let report = run_derivative_scaling(&config, &ProgressReporter::new()).unwrap();

        assert_eq!(report.series.len(), 2);
        for series in &report.series {
            let counts: Vec<usize> = series.samples.iter().map(|s| s.n_atoms).collect();
            assert_eq!(counts, vec![2, 8]);
            assert!(series.samples.iter().all(|s| s.seconds >= 0.0));
        }
    }

    #[test]
    fn coulomb_sweep_covers_every_permutation_variant() {
        let config = CoulombScalingConfigBuilder::new()
            .base_structure(niti_cell())
            .sweep(1, 4)
            .variants(vec![Permutation::SortedL2, Permutation::Eigenspectrum])
            .build()
            .unwrap();
        let report = run_coulomb_scaling(&config, &ProgressReporter::new()).unwrap();

        assert_eq!(report.series.len(), 2);
        for series in &report.series {
            let counts: Vec<usize> = series.samples.iter().map(|s| s.n_atoms).collect();
            assert_eq!(counts, vec![2, 16, 54]);
        }
    }

    #[test]
    fn sweep_reports_progress_for_every_point() {
        let events: Mutex<(usize, usize, usize)> = Mutex::new((0, 0, 0));
        let reporter = ProgressReporter::with_callback(Box::new(|event| match event {
            Progress::PhaseStart { .. } | Progress::PhaseFinish => {
                events.lock().unwrap().0 += 1
            }
            Progress::SweepStart { .. } => events.lock().unwrap().1 += 1,
            Progress::PointComplete { .. } => events.lock().unwrap().2 += 1,
            _ => {}
        }));

        let config = soap_config(vec![RadialBasisKind::Gto, RadialBasisKind::Polynomial]);
        run_soap_scaling(&config, &reporter).unwrap();
        drop(reporter);

        let (phases, sweeps, points) = events.into_inner().unwrap();
        assert_eq!(phases, 2);
        assert_eq!(sweeps, 2);
        assert_eq!(points, 4);
    }

    #[test]
    fn unconfigured_species_abort_the_whole_sweep() {
        let mut config = soap_config(vec![RadialBasisKind::Gto]);
        config.hyperparameters.species = vec!["Ni".to_string()];
        assert!(matches!(
            run_soap_scaling(&config, &ProgressReporter::new()),
            Err(ExperimentError::Descriptor(
                DescriptorError::UnconfiguredSpecies { .. }
            ))
        ));
    }

    #[test]
    fn builders_reject_missing_parameters() {
        let result = SoapScalingConfigBuilder::new()
            .sweep(1, 3)
            .variants(vec![RadialBasisKind::Gto])
            .build();
        assert_eq!(
            result.unwrap_err(),
            ConfigError::MissingParameter("base_structure")
        );

        let result = CoulombScalingConfigBuilder::new()
            .base_structure(niti_cell())
            .sweep(2, 5)
            .build();
        assert_eq!(result.unwrap_err(), ConfigError::MissingParameter("variants"));
    }

    #[test]
    fn builders_reject_degenerate_sweeps() {
        let zero_start = SoapScalingConfigBuilder::new()
            .base_structure(niti_cell())
            .sweep(0, 3)
            .variants(vec![RadialBasisKind::Gto])
            .rcut(3.0)
            .nmax(2)
            .lmax(1)
            .species(vec!["Ni".to_string(), "Ti".to_string()])
            .crossover(true)
            .periodic(true)
            .build();
        assert_eq!(
            zero_start.unwrap_err(),
            ConfigError::InvalidSweep { start: 0, end: 3 }
        );

        let backwards = CoulombScalingConfigBuilder::new()
            .base_structure(niti_cell())
            .sweep(5, 5)
            .variants(vec![Permutation::None])
            .build();
        assert_eq!(
            backwards.unwrap_err(),
            ConfigError::InvalidSweep { start: 5, end: 5 }
        );
    }
}
