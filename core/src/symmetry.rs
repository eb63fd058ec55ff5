//! Symmetry analysis: which of the 24 cube rotations leave the
//! stationary-loaded puzzle self-identical, and the cell-index permutation
//! each one induces.

use ahash::AHashSet;

use crate::geometry::{Point, Rotation};
use crate::grid::{Grid, GridPointId};

/// A rotation the puzzle is symmetric under, with the permutation it induces
/// on grid-point ids: `permutation[i]` is the id of the grid point that
/// rotates into position `i`.
#[derive(Debug)]
pub struct SymmetricRotation {
    pub rotation: Rotation,
    pub permutation: Vec<GridPointId>,
}

pub struct SymmetryAnalysis {
    pub symmetric_rotations: Vec<SymmetricRotation>,
    /// `true` if some rotation's stationary footprint does not close onto
    /// itself — i.e. achieving that symmetry would require placing mobile
    /// pieces into the gap. Such rotations are not recorded in
    /// `symmetric_rotations`.
    pub redundancy_complex: bool,
}

/// `stationary_cells` are the cells claimed by stationary pieces (their
/// mobility-identity is not needed: the analysis only asks whether the
/// *set* closes under rotation).
///
/// `allow_mirrored_pieces` gates non-z-axis rotations: on a one-sided board,
/// such a rotation physically flips the board over, so every mobile piece it
/// maps would need to land on its mirror-image shape. The caller sets this
/// to `true` only when every mobile shape actually has a mirror partner
/// among the puzzle's pieces; otherwise those rotations are skipped here
/// regardless of whether the stationary footprint would close under them.
pub fn analyze(
    grid: &Grid,
    dims: (i32, i32, i32),
    stationary_cells: &AHashSet<Point>,
    candidate_rotations: &[Rotation],
    allow_mirrored_pieces: bool,
) -> SymmetryAnalysis {
    let mut symmetric_rotations = Vec::new();
    let mut redundancy_complex = false;

    for &rotation in candidate_rotations {
        if !rotation.is_z_axis() && !allow_mirrored_pieces {
            continue;
        }
        if rotation.is_identity() {
            let permutation: Vec<GridPointId> = grid.points.iter().map(|p| p.id).collect();
            symmetric_rotations.push(SymmetricRotation {
                rotation,
                permutation,
            });
            continue;
        }

        let Some(rotated_dims) = rotate_dims(rotation, dims) else {
            continue;
        };
        if rotated_dims != dims {
            continue;
        }

        let mut closed = true;
        for &s in stationary_cells {
            let Some(rotated) = rotate_about_center(s, rotation, dims) else {
                closed = false;
                break;
            };
            if !stationary_cells.contains(&rotated) {
                closed = false;
                break;
            }
        }
        if !closed {
            redundancy_complex = true;
            continue;
        }

        let mut permutation = vec![GridPointId(0); grid.len()];
        let mut ok = true;
        for gp in &grid.points {
            let Some(rotated) = rotate_about_center(gp.point, rotation, dims) else {
                ok = false;
                break;
            };
            let Some(target_id) = grid.get_id(rotated) else {
                ok = false;
                break;
            };
            permutation[target_id.index()] = gp.id;
        }
        if ok {
            symmetric_rotations.push(SymmetricRotation {
                rotation,
                permutation,
            });
        }
    }

    SymmetryAnalysis {
        symmetric_rotations,
        redundancy_complex,
    }
}

/// The lengths of the box along each output axis after applying `rotation`,
/// exploiting that every rotation matrix is a signed permutation matrix:
/// applying it to the dims vector yields `±dims[permuted axis]` per row.
fn rotate_dims(rotation: Rotation, dims: (i32, i32, i32)) -> Option<(i32, i32, i32)> {
    let raw = rotation.apply(Point::new(dims.0, dims.1, dims.2));
    Some((raw.x.abs(), raw.y.abs(), raw.z.abs()))
}

fn rotate_about_center(p: Point, rotation: Rotation, dims: (i32, i32, i32)) -> Option<Point> {
    let doubled = Point::new(
        2 * p.x - (dims.0 - 1),
        2 * p.y - (dims.1 - 1),
        2 * p.z - (dims.2 - 1),
    );
    let rotated = rotation.apply(doubled);
    let x = rotated.x + (dims.0 - 1);
    let y = rotated.y + (dims.1 - 1);
    let z = rotated.z + (dims.2 - 1);
    if x % 2 != 0 || y % 2 != 0 || z % 2 != 0 {
        return None;
    }
    Some(Point::new(x / 2, y / 2, z / 2))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Grid;

    #[test]
    fn empty_cube_is_symmetric_under_all_24_rotations() {
        let grid = Grid::new(2, 2, 2, |_| false);
        let stationary = AHashSet::default();
        let all: Vec<_> = Rotation::all().collect();
        let analysis = analyze(&grid, (2, 2, 2), &stationary, &all, true);
        assert_eq!(analysis.symmetric_rotations.len(), 24);
        assert!(!analysis.redundancy_complex);
    }

    #[test]
    fn non_cube_box_only_admits_z_axis_rotations_that_fix_shape() {
        let grid = Grid::new(2, 3, 1, |_| false);
        let stationary = AHashSet::default();
        let all: Vec<_> = Rotation::all().collect();
        let analysis = analyze(&grid, (2, 3, 1), &stationary, &all, true);
        // A 2x3x1 slab is not square in the xy plane, so only the identity
        // (and the 180-degree rotation, which preserves both axis lengths)
        // can possibly be admitted among z-axis rotations; 90-degree swaps
        // require xDim == yDim and are rejected by the dims check.
        for sr in &analysis.symmetric_rotations {
            let rotated_dims = rotate_dims(sr.rotation, (2, 3, 1)).unwrap();
            assert_eq!(rotated_dims, (2, 3, 1));
        }
    }

    #[test]
    fn permutation_is_involution_for_180_degree_rotation() {
        let grid = Grid::new(2, 2, 1, |_| false);
        let stationary = AHashSet::default();
        let z_rotations = Rotation::z_axis_subgroup();
        let analysis = analyze(&grid, (2, 2, 1), &stationary, &z_rotations, false);
        let one_eighty = analysis
            .symmetric_rotations
            .iter()
            .find(|sr| !sr.rotation.is_identity() && sr.rotation.then(sr.rotation).is_identity());
        assert!(one_eighty.is_some());
    }

    #[test]
    fn non_z_axis_rotations_are_excluded_without_mirror_pieces() {
        // A 2x2x2 cube is symmetric under all 24 rotations geometrically,
        // but on a one-sided puzzle with no mirror-image pieces available,
        // only the 4 z-axis rotations are legal to report.
        let grid = Grid::new(2, 2, 2, |_| false);
        let stationary = AHashSet::default();
        let all: Vec<_> = Rotation::all().collect();
        let analysis = analyze(&grid, (2, 2, 2), &stationary, &all, false);
        assert_eq!(analysis.symmetric_rotations.len(), 4);
        assert!(analysis.symmetric_rotations.iter().all(|sr| sr.rotation.is_z_axis()));
    }

    #[test]
    fn mismatched_stationary_footprint_flags_redundancy_complex() {
        // One stationary cell in a corner: rotating 90 degrees about z moves
        // it to a different corner that is NOT stationary, so this rotation
        // cannot close without a mobile piece filling the gap.
        let grid = Grid::new(2, 2, 1, |p| p == Point::new(0, 0, 0));
        let mut stationary = AHashSet::default();
        stationary.insert(Point::new(0, 0, 0));
        let z_rotations = Rotation::z_axis_subgroup();
        let analysis = analyze(&grid, (2, 2, 1), &stationary, &z_rotations, false);
        assert!(analysis.redundancy_complex);
    }
}
