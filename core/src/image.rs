//! Images: specific legal placements of a shape, and the generator that
//! enumerates them.

use ahash::AHashSet;
use smallvec::SmallVec;

use crate::grid::Grid;
use crate::piece::{Piece, Shape, ShapeId};

/// Dense identifier for an [`Image`].
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct ImageId(pub u32);

/// A specific `(rotation, translation)` placement of a shape that fits in
/// the grid. Carries no owning-piece identity: which specific named copy an
/// image represents is resolved only at output time.
#[derive(Debug)]
pub struct Image {
    pub id: ImageId,
    pub shape_id: ShapeId,
    /// Cells covered by this placement, sorted lexicographically — matches
    /// the order [`crate::grid::GridPointId`]s are allocated in.
    pub cells: SmallVec<[crate::grid::GridPointId; 24]>,
    pub parity: i32,
}

impl Image {
    pub fn size(&self) -> usize {
        self.cells.len()
    }

    /// The lexicographically first cell this image covers (its anchor for
    /// the de Bruijn driver).
    pub fn anchor(&self) -> crate::grid::GridPointId {
        self.cells[0]
    }
}

/// Selects which shape's image list the redundancy filter thins out
/// ("Redundancy-filter piece selection"). `Named` carries the user-facing
/// piece name as written in the puzzle definition or `redundancyFilter=`
/// option; resolving it to a [`ShapeId`] is `Puzzle::build`'s job, since
/// that's the first point in the pipeline that has shapes to resolve against.
#[derive(Clone)]
pub enum RedundancyFilterChoice {
    Off,
    Auto,
    Named(String),
}

/// Per-shape images, split by mobility of the piece they would belong to —
/// images are generated once for the shape, independent of which specific
/// copy eventually claims one.
pub struct ImageGenerator;

impl ImageGenerator {
    /// Enumerate every legal placement of `shape` in `grid`, optionally
    /// thinning the list by rotational redundancy.
    ///
    /// `symmetric_rotations` is the puzzle's symmetry group; an empty slice
    /// (or passing `filter = false`) disables filtering.
    pub fn generate(
        grid: &Grid,
        shape: &Shape,
        next_id: &mut u32,
        filter: bool,
        symmetric_rotations: &[crate::geometry::Rotation],
        permutations: &[Vec<crate::grid::GridPointId>],
    ) -> Vec<Image> {
        let mut images = Vec::new();
        let mut seen_orbits: AHashSet<Vec<u32>> = AHashSet::new();

        for &rotation in &shape.distinct_rotations {
            let rotated: Piece = shape.representative.rotated(rotation);
            let anchor_cell = rotated.lex_min();

            for gp in &grid.points {
                // Translate so the rotated shape's lex-first cell lands on `gp`.
                let offset = gp.point.sub(anchor_cell);
                let translated = rotated.translated(offset);

                let mut cells: SmallVec<[crate::grid::GridPointId; 24]> = SmallVec::new();
                let mut ok = true;
                for &cell in translated.cells() {
                    match grid.get_id(cell) {
                        Some(id) if grid.get(id).is_unoccupied() => cells.push(id),
                        _ => {
                            ok = false;
                            break;
                        }
                    }
                }
                if !ok {
                    continue;
                }
                cells.sort_unstable_by_key(|id| id.index());

                if filter && !symmetric_rotations.is_empty() {
                    let mut state: Vec<u32> = cells.iter().map(|id| id.index() as u32).collect();
                    state.sort_unstable();
                    if seen_orbits.contains(&state) {
                        continue;
                    }
                    // Record every rotated image of this placement under the
                    // puzzle's symmetric-rotation group so later duplicates
                    // are skipped too.
                    for perm in permutations {
                        let mut orbit: Vec<u32> = state.iter().map(|&i| perm[i as usize].index() as u32).collect();
                        orbit.sort_unstable();
                        seen_orbits.insert(orbit);
                    }
                    seen_orbits.insert(state);
                }

                let parity = cells
                    .iter()
                    .map(|id| grid.get(*id).point.parity())
                    .sum();

                let id = ImageId(*next_id);
                *next_id += 1;
                images.push(Image {
                    id,
                    shape_id: shape.id,
                    cells,
                    parity,
                });
            }
        }

        images
    }
}

/// Image-list statistics used by `redundancyFilter=auto`.
pub struct FilterStats {
    pub shape_id: ShapeId,
    pub unfiltered_count: usize,
    pub filtered_count: usize,
}

impl FilterStats {
    pub fn ratio(&self) -> f64 {
        if self.filtered_count == 0 {
            f64::INFINITY
        } else {
            self.unfiltered_count as f64 / self.filtered_count as f64
        }
    }
}

/// Pick the AUTO redundancy-filter shape: highest
/// `unfiltered / filtered` ratio, tiebreak on smallest filtered count.
pub fn pick_auto_filter_shape(stats: &[FilterStats]) -> Option<ShapeId> {
    stats
        .iter()
        .min_by(|a, b| {
            b.ratio()
                .partial_cmp(&a.ratio())
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.filtered_count.cmp(&b.filtered_count))
        })
        .map(|s| s.shape_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Grid;
    use crate::piece::{Mobility, Shape, ShapeId};

    fn domino_shape() -> Shape {
        let piece = Piece::new([Point::new(0, 0, 0), Point::new(1, 0, 0)], Mobility::Mobile);
        let all: Vec<_> = crate::geometry::Rotation::all().collect();
        let distinct = Shape::compute_distinct_rotations(&piece, &all);
        Shape {
            id: ShapeId(0),
            representative: piece,
            copies: Vec::new(),
            distinct_rotations: distinct,
            mirror_id: None,
            remaining_copies: 1,
        }
    }

    #[test]
    fn domino_in_2x1_has_one_image() {
        let grid = Grid::new(2, 1, 1, |_| false);
        let shape = domino_shape();
        let mut next_id = 0;
        let images = ImageGenerator::generate(&grid, &shape, &mut next_id, false, &[], &[]);
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].size(), 2);
    }

    #[test]
    fn domino_in_2x2_has_four_images() {
        let grid = Grid::new(2, 2, 1, |_| false);
        let shape = domino_shape();
        let mut next_id = 0;
        let images = ImageGenerator::generate(&grid, &shape, &mut next_id, false, &[], &[]);
        // Two horizontal placements (one per row) and two vertical (one per
        // column), since the domino has exactly 2 distinct orientations.
        assert_eq!(images.len(), 4);
    }

    #[test]
    fn image_cells_are_sorted() {
        let grid = Grid::new(2, 2, 1, |_| false);
        let shape = domino_shape();
        let mut next_id = 0;
        let images = ImageGenerator::generate(&grid, &shape, &mut next_id, false, &[], &[]);
        for image in &images {
            let mut sorted = image.cells.clone();
            sorted.sort_unstable_by_key(|id| id.index());
            assert_eq!(image.cells, sorted);
        }
    }
}
