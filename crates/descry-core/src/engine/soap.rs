use nalgebra::{DMatrix, Point3, Vector3};
use std::collections::HashMap;
use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

use super::error::DescriptorError;
use crate::core::basis::{RadialBasisKind, RadialBasisSet};
use crate::core::harmonics::RealSphericalHarmonics;
use crate::core::models::structure::Structure;
use crate::core::neighbors::{CellList, ExtendedEnvironment, extend_periodic};

const CENTRAL_SITE_EPS: f64 = 1e-10;
const FINITE_DIFFERENCE_STEP: f64 = 1e-4;
const MAX_LMAX: usize = 20;
const Y00: f64 = 0.28209479177387814;

/// How SOAP derivatives are computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DerivativeMethod {
    /// Central finite differences over site displacements.
    Numerical,
    /// Chain rule through the radial basis and spherical-harmonic
    /// gradients.
    Analytical,
}

impl fmt::Display for DerivativeMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DerivativeMethod::Numerical => write!(f, "numerical"),
            DerivativeMethod::Analytical => write!(f, "analytical"),
        }
    }
}

impl FromStr for DerivativeMethod {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "numerical" => Ok(DerivativeMethod::Numerical),
            "analytical" => Ok(DerivativeMethod::Analytical),
            _ => Err(()),
        }
    }
}

/// Configuration of a [`Soap`] engine.
#[derive(Debug, Clone, PartialEq)]
pub struct SoapParameters {
    /// Cutoff radius of the local environment, in Angstroms.
    pub rcut: f64,
    /// Number of radial basis functions.
    pub nmax: usize,
    /// Maximum degree of the spherical harmonics.
    pub lmax: usize,
    /// Chemical species the descriptor is sized for. Structures may only
    /// contain species from this list.
    pub species: Vec<String>,
    /// Radial basis variant.
    pub rbf: RadialBasisKind,
    /// Whether cross-species power-spectrum blocks are included.
    pub crossover: bool,
    /// Whether neighbor environments wrap around periodic boundaries.
    pub periodic: bool,
}

/// The SOAP descriptor: a rotation-invariant power spectrum of the local
/// neighbor density around each site, expanded in an orthonormal radial
/// basis times real spherical harmonics under a smooth cosine cutoff.
pub struct Soap {
    params: SoapParameters,
    basis: RadialBasisSet,
    harmonics: RealSphericalHarmonics,
    species_index: HashMap<String, usize>,
}

/// Derivatives of every SOAP feature with respect to every site position.
///
/// Indexed as `(center, site, axis)`, each slice holding `n_features`
/// values: the derivative of center `center`'s features with respect to the
/// Cartesian `axis` component of site `site`.
pub struct SoapDerivatives {
    n_sites: usize,
    n_features: usize,
    data: Vec<f64>,
}

impl SoapDerivatives {
    pub fn n_sites(&self) -> usize {
        self.n_sites
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn get(&self, center: usize, site: usize, axis: usize) -> &[f64] {
        let start = self.offset(center, site, axis);
        &self.data[start..start + self.n_features]
    }

    fn offset(&self, center: usize, site: usize, axis: usize) -> usize {
        debug_assert!(center < self.n_sites && site < self.n_sites && axis < 3);
        ((center * self.n_sites + site) * 3 + axis) * self.n_features
    }
}

impl Soap {
    /// Builds a SOAP engine, validating the configuration and precomputing
    /// the orthonormal radial basis.
    pub fn new(params: SoapParameters) -> Result<Self, DescriptorError> {
        if !params.rcut.is_finite() || params.rcut <= 0.0 {
            return Err(DescriptorError::InvalidParameter(format!(
                "cutoff radius must be positive and finite, got {}",
                params.rcut
            )));
        }
        if params.nmax == 0 {
            return Err(DescriptorError::InvalidParameter(
                "nmax must be at least 1".to_string(),
            ));
        }
        if params.lmax > MAX_LMAX {
            return Err(DescriptorError::InvalidParameter(format!(
                "lmax must be at most {MAX_LMAX}, got {}",
                params.lmax
            )));
        }
        if params.species.is_empty() {
            return Err(DescriptorError::InvalidParameter(
                "species list must not be empty".to_string(),
            ));
        }
        let mut species_index = HashMap::new();
        for (channel, symbol) in params.species.iter().enumerate() {
            if species_index.insert(symbol.clone(), channel).is_some() {
                return Err(DescriptorError::InvalidParameter(format!(
                    "species list contains '{symbol}' more than once"
                )));
            }
        }

        let basis = RadialBasisSet::new(params.rbf, params.rcut, params.nmax, params.lmax)?;
        let harmonics = RealSphericalHarmonics::new(params.lmax);
        Ok(Self {
            params,
            basis,
            harmonics,
            species_index,
        })
    }

    pub fn params(&self) -> &SoapParameters {
        &self.params
    }

    /// Length of the per-site feature vector.
    ///
    /// Same-species blocks keep only `n' >= n` radial pairs; cross-species
    /// blocks (present with `crossover`) keep all of them. Features are
    /// ordered by species pair, then degree `l`, then `(n, n')`.
    pub fn n_features(&self) -> usize {
        let n_species = self.params.species.len();
        let nmax = self.params.nmax;
        let degrees = self.params.lmax + 1;
        let per_same = degrees * nmax * (nmax + 1) / 2;
        let per_cross = degrees * nmax * nmax;
        let cross_pairs = if self.params.crossover {
            n_species * (n_species - 1) / 2
        } else {
            0
        };
        n_species * per_same + cross_pairs * per_cross
    }

    /// Computes the descriptor for every site of `structure`, one row per
    /// site.
    pub fn create(&self, structure: &Structure) -> Result<DMatrix<f64>, DescriptorError> {
        let channels = self.site_channels(structure)?;
        let environment = self.environment(structure)?;
        let list = CellList::new(&environment.positions, self.params.rcut);

        let n_features = self.n_features();
        let mut output = DMatrix::zeros(structure.len(), n_features);
        for (center, position) in structure.positions().iter().enumerate() {
            let coefficients = self.expand(position, &environment, &channels, &list);
            let row = self.power_spectrum(&coefficients);
            for (feature, value) in row.into_iter().enumerate() {
                output[(center, feature)] = value;
            }
        }
        Ok(output)
    }

    /// Computes the derivative of every feature of every center with
    /// respect to every site position.
    pub fn derivatives(
        &self,
        structure: &Structure,
        method: DerivativeMethod,
    ) -> Result<SoapDerivatives, DescriptorError> {
        match method {
            DerivativeMethod::Numerical => self.numerical_derivatives(structure),
            DerivativeMethod::Analytical => self.analytical_derivatives(structure),
        }
    }

    fn site_channels(&self, structure: &Structure) -> Result<Vec<usize>, DescriptorError> {
        structure
            .species()
            .iter()
            .map(|symbol| {
                self.species_index.get(symbol).copied().ok_or_else(|| {
                    DescriptorError::UnconfiguredSpecies {
                        symbol: symbol.clone(),
                    }
                })
            })
            .collect()
    }

    fn environment(
        &self,
        structure: &Structure,
    ) -> Result<ExtendedEnvironment, DescriptorError> {
        if self.params.periodic {
            if !structure.pbc().iter().any(|&p| p) {
                return Err(DescriptorError::NonPeriodicStructure);
            }
            Ok(extend_periodic(structure, self.params.rcut)?)
        } else {
            Ok(ExtendedEnvironment {
                positions: structure.positions().to_vec(),
                source: (0..structure.len()).collect(),
            })
        }
    }

    fn coefficient_len(&self) -> usize {
        let lm_count = (self.params.lmax + 1) * (self.params.lmax + 1);
        self.params.species.len() * self.params.nmax * lm_count
    }

    fn coefficient_index(&self, channel: usize, n: usize, lm: usize) -> usize {
        let lm_count = (self.params.lmax + 1) * (self.params.lmax + 1);
        (channel * self.params.nmax + n) * lm_count + lm
    }

    /// Expands the neighbor density around one center into per-species
    /// radial x angular coefficients.
    fn expand(
        &self,
        center: &Point3<f64>,
        environment: &ExtendedEnvironment,
        channels: &[usize],
        list: &CellList,
    ) -> Vec<f64> {
        let mut coefficients = vec![0.0; self.coefficient_len()];
        for neighbor in list.neighbors_for_position(center) {
            let channel = channels[environment.source[neighbor.index]];
            let r = neighbor.distance;

            if r < CENTRAL_SITE_EPS {
                // The center itself only contributes isotropically.
                let radial = self.basis.evaluate(0, 0.0);
                for (n, value) in radial.iter().enumerate() {
                    coefficients[self.coefficient_index(channel, n, 0)] += value * Y00;
                }
                continue;
            }

            let weight = cutoff_weight(r, self.params.rcut);
            let direction = (environment.positions[neighbor.index] - center) / r;
            let angular = self.harmonics.evaluate(&direction);
            for l in 0..=self.params.lmax {
                let radial = self.basis.evaluate(l, r);
                for m in 0..(2 * l + 1) {
                    let lm = l * l + m;
                    let angular_term = weight * angular[lm];
                    for (n, value) in radial.iter().enumerate() {
                        coefficients[self.coefficient_index(channel, n, lm)] +=
                            value * angular_term;
                    }
                }
            }
        }
        coefficients
    }

    /// Expands one center's density and the gradient of every coefficient
    /// with respect to the sites that contribute to it.
    fn expand_with_gradients(
        &self,
        center_site: usize,
        center: &Point3<f64>,
        environment: &ExtendedEnvironment,
        channels: &[usize],
        list: &CellList,
    ) -> (Vec<f64>, HashMap<usize, Vec<Vector3<f64>>>) {
        let coeff_len = self.coefficient_len();
        let mut coefficients = vec![0.0; coeff_len];
        let mut gradients: HashMap<usize, Vec<Vector3<f64>>> = HashMap::new();

        for neighbor in list.neighbors_for_position(center) {
            let source = environment.source[neighbor.index];
            let channel = channels[source];
            let r = neighbor.distance;

            if r < CENTRAL_SITE_EPS {
                let radial = self.basis.evaluate(0, 0.0);
                for (n, value) in radial.iter().enumerate() {
                    coefficients[self.coefficient_index(channel, n, 0)] += value * Y00;
                }
                continue;
            }

            let weight = cutoff_weight(r, self.params.rcut);
            let weight_deriv = cutoff_weight_derivative(r, self.params.rcut);
            let direction = (environment.positions[neighbor.index] - center) / r;
            let (angular, angular_grads) = self.harmonics.evaluate_with_gradients(&direction);

            let source_grad = gradients
                .entry(source)
                .or_insert_with(|| vec![Vector3::zeros(); coeff_len]);
            let mut local = vec![Vector3::zeros(); coeff_len];
            for l in 0..=self.params.lmax {
                let (radial, radial_deriv) = self.basis.evaluate_with_derivative(l, r);
                for m in 0..(2 * l + 1) {
                    let lm = l * l + m;
                    for n in 0..self.params.nmax {
                        let index = self.coefficient_index(channel, n, lm);
                        coefficients[index] += weight * radial[n] * angular[lm];
                        // d/dr term along the bond plus the angular surface
                        // gradient scaled back to Cartesian space.
                        let gradient = direction
                            * ((weight_deriv * radial[n] + weight * radial_deriv[n])
                                * angular[lm])
                            + angular_grads[lm] * (weight * radial[n] / r);
                        local[index] += gradient;
                    }
                }
            }
            for (index, gradient) in local.iter().enumerate() {
                source_grad[index] += gradient;
            }
            // Moving the center shifts every neighbor the opposite way.
            let center_grad = gradients
                .entry(center_site)
                .or_insert_with(|| vec![Vector3::zeros(); coeff_len]);
            for (index, gradient) in local.iter().enumerate() {
                center_grad[index] -= gradient;
            }
        }
        (coefficients, gradients)
    }

    /// Visits every feature slot in output order with its scaling factor.
    fn for_each_feature<F: FnMut(usize, usize, usize, usize, usize, f64)>(&self, mut visit: F) {
        let n_species = self.params.species.len();
        let nmax = self.params.nmax;
        for s1 in 0..n_species {
            for s2 in s1..n_species {
                if s1 != s2 && !self.params.crossover {
                    continue;
                }
                for l in 0..=self.params.lmax {
                    let prefactor = PI * (8.0 / (2 * l + 1) as f64).sqrt();
                    if s1 == s2 {
                        for n in 0..nmax {
                            for np in n..nmax {
                                let scale = if np > n {
                                    prefactor * std::f64::consts::SQRT_2
                                } else {
                                    prefactor
                                };
                                visit(s1, s2, l, n, np, scale);
                            }
                        }
                    } else {
                        for n in 0..nmax {
                            for np in 0..nmax {
                                visit(s1, s2, l, n, np, prefactor);
                            }
                        }
                    }
                }
            }
        }
    }

    fn power_spectrum(&self, coefficients: &[f64]) -> Vec<f64> {
        let mut features = Vec::with_capacity(self.n_features());
        self.for_each_feature(|s1, s2, l, n, np, scale| {
            let mut sum = 0.0;
            for m in 0..(2 * l + 1) {
                let lm = l * l + m;
                sum += coefficients[self.coefficient_index(s1, n, lm)]
                    * coefficients[self.coefficient_index(s2, np, lm)];
            }
            features.push(scale * sum);
        });
        features
    }

    fn power_spectrum_gradient(
        &self,
        coefficients: &[f64],
        coefficient_grads: &[Vector3<f64>],
    ) -> Vec<Vector3<f64>> {
        let mut features = Vec::with_capacity(self.n_features());
        self.for_each_feature(|s1, s2, l, n, np, scale| {
            let mut sum = Vector3::zeros();
            for m in 0..(2 * l + 1) {
                let lm = l * l + m;
                let a = self.coefficient_index(s1, n, lm);
                let b = self.coefficient_index(s2, np, lm);
                sum += coefficient_grads[a] * coefficients[b]
                    + coefficient_grads[b] * coefficients[a];
            }
            features.push(sum * scale);
        });
        features
    }

    fn numerical_derivatives(
        &self,
        structure: &Structure,
    ) -> Result<SoapDerivatives, DescriptorError> {
        let n_sites = structure.len();
        let n_features = self.n_features();
        let mut result = SoapDerivatives {
            n_sites,
            n_features,
            data: vec![0.0; n_sites * n_sites * 3 * n_features],
        };

        let h = FINITE_DIFFERENCE_STEP;
        for site in 0..n_sites {
            for axis in 0..3 {
                let mut step = Vector3::zeros();
                step[axis] = h;
                let plus = self.create(&structure.with_displaced_site(site, step))?;
                let minus = self.create(&structure.with_displaced_site(site, -step))?;
                for center in 0..n_sites {
                    let offset = result.offset(center, site, axis);
                    for feature in 0..n_features {
                        result.data[offset + feature] =
                            (plus[(center, feature)] - minus[(center, feature)]) / (2.0 * h);
                    }
                }
            }
        }
        Ok(result)
    }

    fn analytical_derivatives(
        &self,
        structure: &Structure,
    ) -> Result<SoapDerivatives, DescriptorError> {
        let channels = self.site_channels(structure)?;
        let environment = self.environment(structure)?;
        let list = CellList::new(&environment.positions, self.params.rcut);

        let n_sites = structure.len();
        let n_features = self.n_features();
        let mut result = SoapDerivatives {
            n_sites,
            n_features,
            data: vec![0.0; n_sites * n_sites * 3 * n_features],
        };

        for (center, position) in structure.positions().iter().enumerate() {
            let (coefficients, gradients) =
                self.expand_with_gradients(center, position, &environment, &channels, &list);
            for (site, coefficient_grads) in gradients {
                let feature_grads =
                    self.power_spectrum_gradient(&coefficients, coefficient_grads.as_slice());
                for axis in 0..3 {
                    let offset = result.offset(center, site, axis);
                    for (feature, gradient) in feature_grads.iter().enumerate() {
                        result.data[offset + feature] = gradient[axis];
                    }
                }
            }
        }
        Ok(result)
    }
}

/// Smooth cosine cutoff: one at the center, zero at and beyond `rcut`.
#[inline]
fn cutoff_weight(r: f64, rcut: f64) -> f64 {
    if r >= rcut {
        0.0
    } else {
        0.5 * ((PI * r / rcut).cos() + 1.0)
    }
}

#[inline]
fn cutoff_weight_derivative(r: f64, rcut: f64) -> f64 {
    if r >= rcut {
        0.0
    } else {
        -0.5 * PI / rcut * (PI * r / rcut).sin()
    }
}
