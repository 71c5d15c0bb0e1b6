use super::models::structure::{Structure, StructureError};
use nalgebra::Point3;

const BIN_PADDING: f64 = 0.0001;
const MIN_CELL_VOLUME: f64 = 1e-9;

/// A neighbor hit returned by [`CellList`] queries.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub index: usize,
    pub distance: f64,
    pub distance_squared: f64,
}

/// Binned neighbor search over a fixed set of positions with a finite
/// cutoff.
///
/// Positions are sorted into bins at least `cutoff` wide, so a query only
/// has to inspect the 3x3x3 block of bins around the query position and
/// filter by squared distance.
pub struct CellList {
    positions: Vec<Point3<f64>>,
    cutoff_squared: f64,
    origin: [f64; 3],
    bin_size: [f64; 3],
    bin_count: [usize; 3],
    bins: Vec<Vec<usize>>,
}

impl CellList {
    /// Builds a cell list for `positions` with the given cutoff radius.
    ///
    /// The cutoff must be positive and finite; queries return every stored
    /// position within `cutoff` of the query point.
    pub fn new(positions: &[Point3<f64>], cutoff: f64) -> Self {
        debug_assert!(cutoff > 0.0 && cutoff.is_finite());

        // Bounding box, padded to keep boundary sites off the bin edges.
        let mut min = [f64::INFINITY; 3];
        let mut max = [f64::NEG_INFINITY; 3];
        for p in positions {
            for axis in 0..3 {
                min[axis] = min[axis].min(p[axis]);
                max[axis] = max[axis].max(p[axis]);
            }
        }
        if positions.is_empty() {
            min = [0.0; 3];
            max = [0.0; 3];
        }
        for axis in 0..3 {
            min[axis] -= BIN_PADDING;
            max[axis] += BIN_PADDING;
        }

        // Bins are of equal size, never narrower than the cutoff.
        let mut bin_count = [0usize; 3];
        let mut bin_size = [0f64; 3];
        for axis in 0..3 {
            let extent = max[axis] - min[axis];
            bin_count[axis] = ((extent / cutoff) as usize).max(1);
            bin_size[axis] = (extent / bin_count[axis] as f64).max(cutoff);
        }

        let mut bins = vec![Vec::new(); bin_count[0] * bin_count[1] * bin_count[2]];
        let flat =
            |i: usize, j: usize, k: usize| (i * bin_count[1] + j) * bin_count[2] + k;
        for (idx, p) in positions.iter().enumerate() {
            let i = ((p.x - min[0]) / bin_size[0]) as usize;
            let j = ((p.y - min[1]) / bin_size[1]) as usize;
            let k = ((p.z - min[2]) / bin_size[2]) as usize;
            bins[flat(i, j, k)].push(idx);
        }

        Self {
            positions: positions.to_vec(),
            cutoff_squared: cutoff * cutoff,
            origin: min,
            bin_size,
            bin_count,
            bins,
        }
    }

    /// Returns all stored positions within the cutoff of `point`.
    pub fn neighbors_for_position(&self, point: &Point3<f64>) -> Vec<Neighbor> {
        let mut result = Vec::new();

        let mut start = [0usize; 3];
        let mut end = [0usize; 3];
        for axis in 0..3 {
            let bin = ((point[axis] - self.origin[axis]) / self.bin_size[axis]).floor() as i64;
            start[axis] = (bin - 1).clamp(0, self.bin_count[axis] as i64 - 1) as usize;
            end[axis] = (bin + 1).clamp(0, self.bin_count[axis] as i64 - 1) as usize;
        }

        for i in start[0]..=end[0] {
            for j in start[1]..=end[1] {
                for k in start[2]..=end[2] {
                    let flat = (i * self.bin_count[1] + j) * self.bin_count[2] + k;
                    for &idx in &self.bins[flat] {
                        let delta = point - self.positions[idx];
                        let distance_squared = delta.norm_squared();
                        if distance_squared <= self.cutoff_squared {
                            result.push(Neighbor {
                                index: idx,
                                distance: distance_squared.sqrt(),
                                distance_squared,
                            });
                        }
                    }
                }
            }
        }
        result
    }

    /// Returns all stored positions within the cutoff of the stored position
    /// at `index`, excluding the position itself.
    pub fn neighbors_for_index(&self, index: usize) -> Vec<Neighbor> {
        let mut result = self.neighbors_for_position(&self.positions[index]);
        result.retain(|n| n.index != index);
        result
    }
}

/// Positions of a structure together with the periodic images needed so that
/// every site inside the original cell sees all neighbors within a cutoff.
///
/// `source[i]` is the index of the original site that extended position `i`
/// is an image of; the first `structure.len()` entries are the original
/// sites themselves.
#[derive(Debug, Clone)]
pub struct ExtendedEnvironment {
    pub positions: Vec<Point3<f64>>,
    pub source: Vec<usize>,
}

/// Replicates periodic images of every site of `structure` that can fall
/// within `cutoff` of the original cell.
///
/// The image count along each periodic axis derives from the perpendicular
/// cell height along that axis; non-periodic axes are not replicated.
///
/// # Errors
///
/// Returns an error when a periodic structure's cell is degenerate (near-zero
/// volume), since image counts would diverge.
pub fn extend_periodic(
    structure: &Structure,
    cutoff: f64,
) -> Result<ExtendedEnvironment, StructureError> {
    let n_sites = structure.len();
    let mut positions: Vec<Point3<f64>> = structure.positions().to_vec();
    let mut source: Vec<usize> = (0..n_sites).collect();

    let pbc = structure.pbc();
    let cell = match structure.cell() {
        Some(cell) if pbc.iter().any(|&p| p) => *cell,
        _ => return Ok(ExtendedEnvironment { positions, source }),
    };

    let volume = cell.determinant().abs();
    if volume < MIN_CELL_VOLUME {
        return Err(StructureError::DegenerateCell { volume });
    }

    // Images needed along an axis: cutoff divided by the perpendicular
    // height of the cell along that axis.
    let mut reach = [0i64; 3];
    for axis in 0..3 {
        if !pbc[axis] {
            continue;
        }
        let u = cell.row((axis + 1) % 3).transpose();
        let v = cell.row((axis + 2) % 3).transpose();
        let height = volume / u.cross(&v).norm();
        reach[axis] = (cutoff / height).ceil() as i64;
    }

    let (a, b, c) = (
        cell.row(0).transpose(),
        cell.row(1).transpose(),
        cell.row(2).transpose(),
    );
    for ia in -reach[0]..=reach[0] {
        for ib in -reach[1]..=reach[1] {
            for ic in -reach[2]..=reach[2] {
                if ia == 0 && ib == 0 && ic == 0 {
                    continue;
                }
                let shift = a * ia as f64 + b * ib as f64 + c * ic as f64;
                for (site, position) in structure.positions().iter().enumerate() {
                    positions.push(position + shift);
                    source.push(site);
                }
            }
        }
    }

    Ok(ExtendedEnvironment { positions, source })
}
