//! Column-ordering heuristics and the piecewise threshold table that
//! selects among them as the search depth changes.

use crate::dlx::{ColumnTag, DlxMatrix, NodeIdx};
use crate::grid::Grid;

/// A score is compared by minimum-wins. Rather than encode the NO_FIT /
/// ONE_FIT / PIECE special ranks as magic floats, give them their own
/// variants and let a hand-written `Ord` rank the tiers before comparing
/// within a tier.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Score {
    NoFit,
    OneFit,
    Geometric(f64),
    Piece,
}

impl Score {
    fn rank(self) -> (u8, f64) {
        match self {
            Score::NoFit => (0, 0.0),
            Score::OneFit => (1, 0.0),
            Score::Geometric(v) => (2, v),
            Score::Piece => (3, 0.0),
        }
    }
}

impl Eq for Score {}

impl PartialOrd for Score {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Score {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        let (sr, sv) = self.rank();
        let (or, ov) = other.rank();
        sr.cmp(&or).then_with(|| sv.total_cmp(&ov))
    }
}

/// One of the four column-ordering scoring functions.
#[derive(Clone, Copy, Debug)]
pub enum Heuristic {
    Fit,
    Linear { a: f64, b: f64, c: f64 },
    Angular { theta0: f64, xc: f64, yc: f64, reverse: bool },
    Radial { xc: f64, yc: f64, zc: f64 },
}

impl Heuristic {
    /// Score the column headed by `header`. `num_row == 0`/`1` override the
    /// geometric formula regardless of which heuristic is active; a shape
    /// column always scores `Piece` regardless of row count.
    pub fn score(self, matrix: &DlxMatrix, grid: &Grid, header: NodeIdx) -> Score {
        let num_row = matrix.column_num_row(header);
        let tag = matrix.column_tag(header);
        let ColumnTag::GridPoint(gp) = tag else {
            return if num_row == 0 {
                Score::NoFit
            } else {
                Score::Piece
            };
        };
        if num_row == 0 {
            return Score::NoFit;
        }
        if num_row == 1 {
            return Score::OneFit;
        }
        let point = grid.get(gp).point;
        let (x, y, z) = (point.x as f64, point.y as f64, point.z as f64);
        let value = match self {
            Heuristic::Fit => return Score::Geometric(num_row as f64),
            Heuristic::Linear { a, b, c } => a * x + b * y + c * z,
            Heuristic::Angular { theta0, xc, yc, reverse } => {
                let raw = (y - yc).atan2(x - xc) - theta0;
                let wrapped = raw.rem_euclid(std::f64::consts::TAU);
                if reverse {
                    -wrapped
                } else {
                    wrapped
                }
            }
            Heuristic::Radial { xc, yc, zc } => {
                -((x - xc).powi(2) + (y - yc).powi(2) + (z - zc).powi(2))
            }
        };
        Score::Geometric(value)
    }

    /// Pick the column with the minimum score, or `None` if there are no
    /// live columns (the matrix is fully covered: a complete placement).
    pub fn select(self, matrix: &DlxMatrix, grid: &Grid) -> Option<NodeIdx> {
        matrix
            .columns()
            .map(|header| (header, self.score(matrix, grid, header)))
            .min_by_key(|&(_, score)| score)
            .map(|(header, _)| header)
    }
}

/// Maps a "remaining mobile pieces" count `k` to the heuristic active at
/// that depth, by largest-threshold-not-exceeding-`k` lookup.
/// Entries are sorted ascending by threshold at construction.
#[derive(Clone)]
pub struct HeuristicTable {
    entries: Vec<(u32, Heuristic)>,
}

impl HeuristicTable {
    pub fn new(mut entries: Vec<(u32, Heuristic)>) -> HeuristicTable {
        entries.sort_by_key(|(threshold, _)| *threshold);
        HeuristicTable { entries }
    }

    pub fn uniform(h: Heuristic) -> HeuristicTable {
        HeuristicTable {
            entries: vec![(0, h)],
        }
    }

    pub fn default_table() -> HeuristicTable {
        HeuristicTable::uniform(Heuristic::Fit)
    }

    /// The heuristic active when `k` mobile pieces remain.
    pub fn active(&self, k: u32) -> Heuristic {
        self.entries
            .iter()
            .rev()
            .find(|(threshold, _)| *threshold <= k)
            .map(|(_, h)| *h)
            .unwrap_or(Heuristic::Fit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Point, Rotation};
    use crate::image::ImageGenerator;
    use crate::piece::{Mobility, Piece, Shape, ShapeId};

    fn small_matrix() -> (Grid, DlxMatrix) {
        let grid = Grid::new(3, 1, 1, |_| false);
        let piece = Piece::new([Point::new(0, 0, 0)], Mobility::Mobile);
        let all: Vec<_> = Rotation::all().collect();
        let distinct = Shape::compute_distinct_rotations(&piece, &all);
        let shape = Shape {
            id: ShapeId(0),
            representative: piece,
            copies: Vec::new(),
            distinct_rotations: distinct,
            mirror_id: None,
            remaining_copies: 3,
        };
        let mut next_id = 0;
        let images = ImageGenerator::generate(&grid, &shape, &mut next_id, false, &[], &[]);
        let grid_ids: Vec<_> = grid.points.iter().map(|p| p.id).collect();
        let matrix = DlxMatrix::build(&grid_ids, &[(shape.id, 3)], &images);
        (grid, matrix)
    }

    #[test]
    fn one_row_beats_any_geometric_score() {
        let (grid, matrix) = small_matrix();
        // Every cell column here has exactly one candidate row (a single
        // monomino image), so `fit` must rank all of them as OneFit.
        for header in matrix.columns() {
            if let ColumnTag::GridPoint(_) = matrix.column_tag(header) {
                assert_eq!(Heuristic::Fit.score(&matrix, &grid, header), Score::OneFit);
            }
        }
    }

    #[test]
    fn piece_columns_always_rank_last() {
        let (grid, matrix) = small_matrix();
        let piece_header = matrix
            .columns()
            .find(|&h| matches!(matrix.column_tag(h), ColumnTag::Shape(_)))
            .unwrap();
        let cell_header = matrix
            .columns()
            .find(|&h| matches!(matrix.column_tag(h), ColumnTag::GridPoint(_)))
            .unwrap();
        assert!(
            Heuristic::Fit.score(&matrix, &grid, piece_header)
                > Heuristic::Fit.score(&matrix, &grid, cell_header)
        );
    }

    #[test]
    fn table_lookup_uses_largest_threshold_not_exceeding_k() {
        let table = HeuristicTable::new(vec![
            (0, Heuristic::Fit),
            (10, Heuristic::Radial { xc: 0.0, yc: 0.0, zc: 0.0 }),
        ]);
        assert!(matches!(table.active(5), Heuristic::Fit));
        assert!(matches!(table.active(10), Heuristic::Radial { .. }));
        assert!(matches!(table.active(100), Heuristic::Radial { .. }));
    }

    #[test]
    fn select_returns_none_on_empty_matrix() {
        let grid = Grid::new(1, 1, 1, |_| false);
        let matrix = DlxMatrix::build(&[], &[], &[]);
        assert!(Heuristic::Fit.select(&matrix, &grid).is_none());
    }
}
