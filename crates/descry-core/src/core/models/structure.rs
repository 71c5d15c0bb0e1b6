use nalgebra::{Matrix3, Point3, Vector3};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum StructureError {
    #[error("Species count ({species}) does not match position count ({positions})")]
    MismatchedSites { species: usize, positions: usize },

    #[error("Periodic axes declared on a structure without a repeat cell")]
    PeriodicWithoutCell,

    #[error("Cannot tile a structure that has no repeat cell")]
    RepeatWithoutCell,

    #[error("Repeat counts must be at least 1, got {counts:?}")]
    ZeroRepeat { counts: [usize; 3] },

    #[error("Repeat cell is degenerate (volume {volume:.3e} A^3)")]
    DegenerateCell { volume: f64 },
}

/// An atomic structure: a set of sites with species labels and Cartesian
/// positions, optionally living in a periodic repeat cell.
///
/// The cell is a 3x3 matrix whose *rows* are the lattice vectors in
/// Angstroms. Periodicity is tracked per axis, so slabs and wires are
/// expressible alongside bulk crystals. Structures are immutable snapshots:
/// every derived structure (see [`Structure::repeat`]) is a fresh value and
/// no operation mutates a structure in place after creation.
#[derive(Debug, Clone, PartialEq)]
pub struct Structure {
    species: Vec<String>,
    positions: Vec<Point3<f64>>,
    cell: Option<Matrix3<f64>>,
    pbc: [bool; 3],
}

impl Structure {
    /// Creates a structure from species labels, positions, and an optional
    /// periodic cell.
    ///
    /// # Arguments
    ///
    /// * `species` - One chemical symbol per site (e.g. "Ni").
    /// * `positions` - Cartesian site positions in Angstroms.
    /// * `cell` - Repeat cell with lattice vectors as rows, if periodic.
    /// * `pbc` - Periodicity flag per cell axis.
    ///
    /// # Errors
    ///
    /// Returns an error if the species and position counts differ, or if any
    /// axis is flagged periodic while no cell is given.
    pub fn new(
        species: Vec<String>,
        positions: Vec<Point3<f64>>,
        cell: Option<Matrix3<f64>>,
        pbc: [bool; 3],
    ) -> Result<Self, StructureError> {
        if species.len() != positions.len() {
            return Err(StructureError::MismatchedSites {
                species: species.len(),
                positions: positions.len(),
            });
        }
        if cell.is_none() && pbc.iter().any(|&p| p) {
            return Err(StructureError::PeriodicWithoutCell);
        }
        Ok(Self {
            species,
            positions,
            cell,
            pbc,
        })
    }

    /// Creates a fully periodic structure from a cell and its contents.
    pub fn periodic(
        species: Vec<String>,
        positions: Vec<Point3<f64>>,
        cell: Matrix3<f64>,
    ) -> Result<Self, StructureError> {
        Self::new(species, positions, Some(cell), [true; 3])
    }

    /// Creates a two-site body-centered cubic cell (CsCl arrangement): the
    /// first species at the corner, the second at the cell center, fully
    /// periodic with lattice constant `a`.
    pub fn body_centered(
        corner_species: &str,
        center_species: &str,
        a: f64,
    ) -> Result<Self, StructureError> {
        Self::periodic(
            vec![corner_species.to_string(), center_species.to_string()],
            vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(a / 2.0, a / 2.0, a / 2.0),
            ],
            Matrix3::from_diagonal(&Vector3::new(a, a, a)),
        )
    }

    /// The number of sites in the structure.
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Whether the structure contains no sites.
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Species label of each site, in site order.
    pub fn species(&self) -> &[String] {
        &self.species
    }

    /// Cartesian position of each site, in site order.
    pub fn positions(&self) -> &[Point3<f64>] {
        &self.positions
    }

    /// The repeat cell, if the structure has one.
    pub fn cell(&self) -> Option<&Matrix3<f64>> {
        self.cell.as_ref()
    }

    /// Per-axis periodicity flags.
    pub fn pbc(&self) -> [bool; 3] {
        self.pbc
    }

    /// The lattice vector for a cell axis (0, 1, or 2).
    ///
    /// Returns `None` when the structure has no cell.
    pub fn cell_vector(&self, axis: usize) -> Option<Vector3<f64>> {
        self.cell.map(|c| c.row(axis).transpose())
    }

    /// Tiles the structure by integer counts along its three cell axes,
    /// returning a new structure with `len() * na * nb * nc` sites and a
    /// correspondingly scaled cell.
    ///
    /// Image order is lexicographic in `(ia, ib, ic)` with the original
    /// sites repeated inside each image, so site `k` of image zero is site
    /// `k` of the source structure.
    ///
    /// # Errors
    ///
    /// Returns an error if any count is zero or the structure has no cell.
    pub fn repeat(&self, counts: [usize; 3]) -> Result<Structure, StructureError> {
        let cell = self.cell.ok_or(StructureError::RepeatWithoutCell)?;
        if counts.iter().any(|&c| c == 0) {
            return Err(StructureError::ZeroRepeat { counts });
        }

        let [na, nb, nc] = counts;
        let (a, b, c) = (
            cell.row(0).transpose(),
            cell.row(1).transpose(),
            cell.row(2).transpose(),
        );

        let n_images = na * nb * nc;
        let mut species = Vec::with_capacity(self.len() * n_images);
        let mut positions = Vec::with_capacity(self.len() * n_images);
        for ia in 0..na {
            for ib in 0..nb {
                for ic in 0..nc {
                    let shift = a * ia as f64 + b * ib as f64 + c * ic as f64;
                    for (symbol, position) in self.species.iter().zip(&self.positions) {
                        species.push(symbol.clone());
                        positions.push(position + shift);
                    }
                }
            }
        }

        let mut tiled_cell = Matrix3::zeros();
        tiled_cell.set_row(0, &(cell.row(0) * na as f64));
        tiled_cell.set_row(1, &(cell.row(1) * nb as f64));
        tiled_cell.set_row(2, &(cell.row(2) * nc as f64));

        Ok(Structure {
            species,
            positions,
            cell: Some(tiled_cell),
            pbc: self.pbc,
        })
    }

    /// Tiles the structure by the same count along all three axes.
    pub fn repeat_uniform(&self, count: usize) -> Result<Structure, StructureError> {
        self.repeat([count; 3])
    }

    /// Returns a copy of the structure with one site displaced by `delta`.
    ///
    /// Used by finite-difference derivative paths; the source structure is
    /// left untouched.
    pub fn with_displaced_site(&self, site: usize, delta: Vector3<f64>) -> Structure {
        let mut displaced = self.clone();
        displaced.positions[site] += delta;
        displaced
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_site_cubic_cell(a: f64) -> Structure {
        Structure::body_centered("Ni", "Ti", a).unwrap()
    }

    #[test]
    fn body_centered_cell_places_the_center_site_at_half_diagonal() {
        let base = Structure::body_centered("Ni", "Ti", 2.993).unwrap();
        assert_eq!(base.len(), 2);
        assert_eq!(base.species(), &["Ni".to_string(), "Ti".to_string()]);
        assert_eq!(base.pbc(), [true; 3]);
        assert_eq!(
            base.positions()[1],
            Point3::new(2.993 / 2.0, 2.993 / 2.0, 2.993 / 2.0)
        );
        assert_eq!(base.cell_vector(2).unwrap(), Vector3::new(0.0, 0.0, 2.993));
    }

    #[test]
    fn mismatched_species_and_positions_are_rejected() {
        let result = Structure::new(
            vec!["Ni".to_string()],
            vec![Point3::origin(), Point3::new(1.0, 0.0, 0.0)],
            None,
            [false; 3],
        );
        assert_eq!(
            result.unwrap_err(),
            StructureError::MismatchedSites {
                species: 1,
                positions: 2
            }
        );
    }

    #[test]
    fn periodic_flags_without_cell_are_rejected() {
        let result = Structure::new(
            vec!["Ni".to_string()],
            vec![Point3::origin()],
            None,
            [true, false, false],
        );
        assert_eq!(result.unwrap_err(), StructureError::PeriodicWithoutCell);
    }

    #[test]
    fn uniform_repeat_of_two_site_cell_gives_two_k_cubed_sites() {
        let base = two_site_cubic_cell(2.993);
        let tiled = base.repeat_uniform(5).unwrap();
        assert_eq!(tiled.len(), 2 * 125);
    }

    #[test]
    fn two_axis_repeat_of_two_site_cell_gives_two_k_squared_sites() {
        let base = two_site_cubic_cell(2.993);
        let tiled = base.repeat([2, 2, 1]).unwrap();
        assert_eq!(tiled.len(), 2 * 4);
    }

    #[test]
    fn repeat_scales_the_cell_per_axis() {
        let base = two_site_cubic_cell(3.0);
        let tiled = base.repeat([2, 3, 1]).unwrap();
        let cell = tiled.cell().unwrap();
        assert_eq!(cell.row(0).transpose(), Vector3::new(6.0, 0.0, 0.0));
        assert_eq!(cell.row(1).transpose(), Vector3::new(0.0, 9.0, 0.0));
        assert_eq!(cell.row(2).transpose(), Vector3::new(0.0, 0.0, 3.0));
    }

    #[test]
    fn repeat_leaves_the_source_structure_untouched() {
        let base = two_site_cubic_cell(3.0);
        let before = base.clone();
        let _ = base.repeat_uniform(3).unwrap();
        assert_eq!(base, before);
    }

    #[test]
    fn first_image_preserves_site_order_and_positions() {
        let base = two_site_cubic_cell(3.0);
        let tiled = base.repeat_uniform(2).unwrap();
        assert_eq!(&tiled.species()[..2], base.species());
        assert_eq!(tiled.positions()[1], base.positions()[1]);
    }

    #[test]
    fn displacing_a_site_copies_instead_of_mutating() {
        let base = two_site_cubic_cell(3.0);
        let displaced = base.with_displaced_site(1, Vector3::new(0.1, 0.0, -0.2));
        assert_eq!(base.positions()[1], Point3::new(1.5, 1.5, 1.5));
        assert_eq!(displaced.positions()[1], Point3::new(1.6, 1.5, 1.3));
        assert_eq!(displaced.positions()[0], base.positions()[0]);
    }

    #[test]
    fn zero_repeat_count_is_rejected() {
        let base = two_site_cubic_cell(3.0);
        assert_eq!(
            base.repeat([2, 0, 1]).unwrap_err(),
            StructureError::ZeroRepeat { counts: [2, 0, 1] }
        );
    }

    #[test]
    fn repeat_without_cell_is_rejected() {
        let cluster = Structure::new(
            vec!["Ni".to_string()],
            vec![Point3::origin()],
            None,
            [false; 3],
        )
        .unwrap();
        assert_eq!(
            cluster.repeat_uniform(2).unwrap_err(),
            StructureError::RepeatWithoutCell
        );
    }
}
