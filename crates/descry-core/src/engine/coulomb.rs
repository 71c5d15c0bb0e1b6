use nalgebra::{DMatrix, DVector};
use std::fmt;
use std::str::FromStr;

use super::error::DescriptorError;
use crate::core::models::element;
use crate::core::models::structure::Structure;

/// How the rows and columns of the Coulomb matrix are made comparable
/// across structures with different atom orderings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permutation {
    /// Keep the input atom order.
    None,
    /// Order rows and columns by descending Euclidean row norm.
    SortedL2,
    /// Replace the matrix by its eigenvalues, sorted by descending
    /// absolute value.
    Eigenspectrum,
}

impl fmt::Display for Permutation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Permutation::None => write!(f, "none"),
            Permutation::SortedL2 => write!(f, "sorted_l2"),
            Permutation::Eigenspectrum => write!(f, "eigenspectrum"),
        }
    }
}

impl FromStr for Permutation {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(Permutation::None),
            "sorted_l2" | "sorted-l2" => Ok(Permutation::SortedL2),
            "eigenspectrum" => Ok(Permutation::Eigenspectrum),
            _ => Err(()),
        }
    }
}

/// The Coulomb matrix descriptor: pairwise nuclear repulsion terms
/// `Z_i Z_j / |r_i - r_j|` with the self-interaction fit `0.5 Z_i^2.4` on
/// the diagonal, padded to a fixed maximum atom count so feature vectors
/// are comparable across structures.
pub struct CoulombMatrix {
    n_atoms_max: usize,
    permutation: Permutation,
}

impl CoulombMatrix {
    pub fn new(n_atoms_max: usize, permutation: Permutation) -> Result<Self, DescriptorError> {
        if n_atoms_max == 0 {
            return Err(DescriptorError::InvalidParameter(
                "n_atoms_max must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            n_atoms_max,
            permutation,
        })
    }

    pub fn n_features(&self) -> usize {
        match self.permutation {
            Permutation::Eigenspectrum => self.n_atoms_max,
            _ => self.n_atoms_max * self.n_atoms_max,
        }
    }

    /// Computes the flattened, padded descriptor for a structure.
    pub fn create(&self, structure: &Structure) -> Result<DVector<f64>, DescriptorError> {
        let n_atoms = structure.len();
        if n_atoms > self.n_atoms_max {
            return Err(DescriptorError::TooManySites {
                n_sites: n_atoms,
                n_max: self.n_atoms_max,
            });
        }

        let numbers = structure
            .species()
            .iter()
            .map(|symbol| {
                element::atomic_number(symbol)
                    .map(f64::from)
                    .ok_or_else(|| DescriptorError::UnknownElement {
                        symbol: symbol.clone(),
                    })
            })
            .collect::<Result<Vec<f64>, _>>()?;

        let positions = structure.positions();
        let mut matrix = DMatrix::zeros(n_atoms, n_atoms);
        for i in 0..n_atoms {
            matrix[(i, i)] = 0.5 * numbers[i].powf(2.4);
            for j in (i + 1)..n_atoms {
                let value = numbers[i] * numbers[j] / (positions[i] - positions[j]).norm();
                matrix[(i, j)] = value;
                matrix[(j, i)] = value;
            }
        }

        match self.permutation {
            Permutation::Eigenspectrum => Ok(self.eigenspectrum(&matrix)),
            Permutation::SortedL2 => {
                let sorted = sort_by_row_norm(&matrix);
                Ok(self.flatten_padded(&sorted))
            }
            Permutation::None => Ok(self.flatten_padded(&matrix)),
        }
    }

    fn eigenspectrum(&self, matrix: &DMatrix<f64>) -> DVector<f64> {
        let mut eigenvalues: Vec<f64> = matrix
            .clone()
            .symmetric_eigen()
            .eigenvalues
            .iter()
            .copied()
            .collect();
        eigenvalues.sort_by(|a, b| {
            b.abs()
                .partial_cmp(&a.abs())
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let mut output = DVector::zeros(self.n_atoms_max);
        for (i, value) in eigenvalues.into_iter().enumerate() {
            output[i] = value;
        }
        output
    }

    fn flatten_padded(&self, matrix: &DMatrix<f64>) -> DVector<f64> {
        let n_atoms = matrix.nrows();
        let mut output = DVector::zeros(self.n_atoms_max * self.n_atoms_max);
        for i in 0..n_atoms {
            for j in 0..n_atoms {
                output[i * self.n_atoms_max + j] = matrix[(i, j)];
            }
        }
        output
    }
}

fn sort_by_row_norm(matrix: &DMatrix<f64>) -> DMatrix<f64> {
    let n_atoms = matrix.nrows();
    let mut order: Vec<usize> = (0..n_atoms).collect();
    order.sort_by(|&a, &b| {
        let norm_a = matrix.row(a).norm();
        let norm_b = matrix.row(b).norm();
        norm_b
            .partial_cmp(&norm_a)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    DMatrix::from_fn(n_atoms, n_atoms, |i, j| matrix[(order[i], order[j])])
}
