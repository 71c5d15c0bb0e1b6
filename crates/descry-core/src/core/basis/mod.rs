mod gto;
mod polynomial;

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum BasisError {
    #[error("Overlap matrix for the {kind} basis with nmax={nmax} is not positive definite")]
    IllConditioned { kind: RadialBasisKind, nmax: usize },
}

/// The radial basis used to expand neighbor densities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RadialBasisKind {
    /// Gaussian-type orbitals `r^l exp(-alpha_n r^2)` with widths spread
    /// over the cutoff radius.
    Gto,
    /// Polynomials `(r - rcut)^(n+2)`, smooth and exactly zero at the
    /// cutoff.
    Polynomial,
}

impl fmt::Display for RadialBasisKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RadialBasisKind::Gto => write!(f, "gto"),
            RadialBasisKind::Polynomial => write!(f, "polynomial"),
        }
    }
}

impl FromStr for RadialBasisKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "gto" => Ok(RadialBasisKind::Gto),
            "polynomial" | "poly" => Ok(RadialBasisKind::Polynomial),
            _ => Err(()),
        }
    }
}

/// An orthonormal set of `nmax` radial functions on `[0, rcut]`, usable for
/// every angular channel up to `lmax`.
///
/// Both supported bases start from analytically known primitives and are
/// Lowdin-orthonormalized against their exact overlap matrices, so the
/// expansion coefficients of different radial channels stay comparable in
/// magnitude.
pub struct RadialBasisSet {
    kind: RadialBasisKind,
    rcut: f64,
    nmax: usize,
    // GTO primitives depend on l, so there is one weight matrix per angular
    // channel; the polynomial basis shares a single matrix.
    weights: Vec<DMatrix<f64>>,
    alphas: Vec<f64>,
}

impl RadialBasisSet {
    pub fn new(
        kind: RadialBasisKind,
        rcut: f64,
        nmax: usize,
        lmax: usize,
    ) -> Result<Self, BasisError> {
        debug_assert!(rcut > 0.0 && nmax >= 1);
        match kind {
            RadialBasisKind::Gto => {
                let alphas = gto::alphas(rcut, nmax);
                let mut weights = Vec::with_capacity(lmax + 1);
                for l in 0..=lmax {
                    let overlap = gto::overlap(l, &alphas);
                    weights.push(lowdin(&overlap).ok_or(BasisError::IllConditioned {
                        kind,
                        nmax,
                    })?);
                }
                Ok(Self {
                    kind,
                    rcut,
                    nmax,
                    weights,
                    alphas,
                })
            }
            RadialBasisKind::Polynomial => {
                let overlap = polynomial::overlap(rcut, nmax);
                let weights =
                    vec![lowdin(&overlap).ok_or(BasisError::IllConditioned { kind, nmax })?];
                Ok(Self {
                    kind,
                    rcut,
                    nmax,
                    weights,
                    alphas: Vec::new(),
                })
            }
        }
    }

    pub fn kind(&self) -> RadialBasisKind {
        self.kind
    }

    pub fn nmax(&self) -> usize {
        self.nmax
    }

    /// Values of all `nmax` orthonormal functions at radius `r` for angular
    /// channel `l`.
    pub fn evaluate(&self, l: usize, r: f64) -> Vec<f64> {
        let (primitives, _) = self.primitives(l, r);
        self.combine(l, &primitives)
    }

    /// Values and radial derivatives of all `nmax` orthonormal functions at
    /// radius `r` for angular channel `l`.
    pub fn evaluate_with_derivative(&self, l: usize, r: f64) -> (Vec<f64>, Vec<f64>) {
        let (primitives, primitive_derivs) = self.primitives(l, r);
        (self.combine(l, &primitives), self.combine(l, &primitive_derivs))
    }

    fn primitives(&self, l: usize, r: f64) -> (Vec<f64>, Vec<f64>) {
        match self.kind {
            RadialBasisKind::Gto => gto::primitives(l, r, &self.alphas),
            RadialBasisKind::Polynomial => polynomial::primitives(self.rcut, self.nmax, r),
        }
    }

    fn combine(&self, l: usize, primitives: &[f64]) -> Vec<f64> {
        let weights = match self.kind {
            RadialBasisKind::Gto => &self.weights[l],
            RadialBasisKind::Polynomial => &self.weights[0],
        };
        (0..self.nmax)
            .map(|n| {
                (0..self.nmax)
                    .map(|m| weights[(n, m)] * primitives[m])
                    .sum()
            })
            .collect()
    }
}

/// Lowdin symmetric orthonormalization: the inverse square root of a
/// positive-definite overlap matrix. Returns `None` when the matrix has a
/// non-positive eigenvalue.
fn lowdin(overlap: &DMatrix<f64>) -> Option<DMatrix<f64>> {
    let eigen = overlap.clone().symmetric_eigen();
    if eigen.eigenvalues.iter().any(|&v| v <= 0.0) {
        return None;
    }
    let inv_sqrt = DMatrix::from_diagonal(&eigen.eigenvalues.map(|v| 1.0 / v.sqrt()));
    Some(&eigen.eigenvectors * inv_sqrt * eigen.eigenvectors.transpose())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn orthonormality_residual(basis: &RadialBasisSet, l: usize, r_upper: f64) -> f64 {
        // Numeric quadrature of \int phi_n phi_m r^2 dr against identity.
        let steps = 20_000;
        let dr = r_upper / steps as f64;
        let nmax = basis.nmax();
        let mut gram = vec![vec![0.0; nmax]; nmax];
        for step in 0..steps {
            let r = (step as f64 + 0.5) * dr;
            let values = basis.evaluate(l, r);
            for n in 0..nmax {
                for m in 0..nmax {
                    gram[n][m] += values[n] * values[m] * r * r * dr;
                }
            }
        }
        let mut residual: f64 = 0.0;
        for n in 0..nmax {
            for m in 0..nmax {
                let expected = if n == m { 1.0 } else { 0.0 };
                residual = residual.max((gram[n][m] - expected).abs());
            }
        }
        residual
    }

    #[test]
    fn gto_basis_is_orthonormal_per_angular_channel() {
        let basis = RadialBasisSet::new(RadialBasisKind::Gto, 3.0, 4, 2).unwrap();
        for l in 0..=2 {
            assert!(
                orthonormality_residual(&basis, l, 15.0) < 1e-4,
                "gto channel l={l} not orthonormal"
            );
        }
    }

    #[test]
    fn polynomial_basis_is_orthonormal() {
        let basis = RadialBasisSet::new(RadialBasisKind::Polynomial, 3.0, 4, 4).unwrap();
        assert!(orthonormality_residual(&basis, 0, 3.0) < 1e-4);
    }

    #[test]
    fn polynomial_basis_vanishes_at_the_cutoff() {
        let basis = RadialBasisSet::new(RadialBasisKind::Polynomial, 3.0, 4, 0).unwrap();
        for value in basis.evaluate(0, 3.0) {
            assert!(value.abs() < 1e-12);
        }
        for value in basis.evaluate(0, 4.5) {
            assert_eq!(value, 0.0);
        }
    }

    #[test]
    fn radial_derivatives_match_finite_differences() {
        for kind in [RadialBasisKind::Gto, RadialBasisKind::Polynomial] {
            let basis = RadialBasisSet::new(kind, 3.0, 4, 3).unwrap();
            let h = 1e-6;
            for l in [0usize, 2] {
                for r in [0.4, 1.3, 2.7] {
                    let (_, derivs) = basis.evaluate_with_derivative(l, r);
                    let plus = basis.evaluate(l, r + h);
                    let minus = basis.evaluate(l, r - h);
                    for n in 0..basis.nmax() {
                        let numeric = (plus[n] - minus[n]) / (2.0 * h);
                        assert!(
                            (numeric - derivs[n]).abs() < 1e-4,
                            "{kind} l={l} r={r} n={n}: {numeric} vs {}",
                            derivs[n]
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn kind_parses_from_known_names() {
        assert_eq!("gto".parse::<RadialBasisKind>(), Ok(RadialBasisKind::Gto));
        assert_eq!(
            "polynomial".parse::<RadialBasisKind>(),
            Ok(RadialBasisKind::Polynomial)
        );
        assert_eq!("GTO".parse::<RadialBasisKind>(), Ok(RadialBasisKind::Gto));
        assert!("bessel".parse::<RadialBasisKind>().is_err());
    }
}
