//! Pieces (named copies of cell-sets), and shapes (rotation-equivalence
//! classes of pieces).

use smallvec::SmallVec;

use crate::geometry::{Point, Rotation};

/// Whether a piece's cells are permanently fixed in the grid or are placed
/// by the solver.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Mobility {
    Mobile,
    Stationary,
}

/// A connected set of unit cells, with no fixed location until it is
/// translated into a grid.
#[derive(Clone, Debug)]
pub struct Piece {
    cells: SmallVec<[Point; 24]>,
    mobility: Mobility,
    parity: i32,
}

impl Piece {
    pub fn new(cells: impl IntoIterator<Item = Point>, mobility: Mobility) -> Piece {
        let cells: SmallVec<[Point; 24]> = cells.into_iter().collect();
        let parity = cells.iter().map(|p| p.parity()).sum();
        Piece {
            cells,
            mobility,
            parity,
        }
    }

    pub fn cells(&self) -> &[Point] {
        &self.cells
    }

    pub fn size(&self) -> usize {
        self.cells.len()
    }

    pub fn mobility(&self) -> Mobility {
        self.mobility
    }

    /// Sum of this piece's cells' signed parities.
    pub fn parity(&self) -> i32 {
        self.parity
    }

    /// Translate every cell by `by`.
    pub fn translated(&self, by: Point) -> Piece {
        Piece::new(self.cells.iter().map(|&c| c.translate(by)), self.mobility)
    }

    /// Apply a rotation about the origin to every cell, without translating.
    pub fn rotated(&self, r: Rotation) -> Piece {
        Piece::new(self.cells.iter().map(|&c| r.apply(c)), self.mobility)
    }

    /// Reflect across the x axis (negates `x`). Used for one-sided mirror
    /// detection; this is not a member of the 24-element rotation group.
    pub fn mirrored(&self) -> Piece {
        Piece::new(
            self.cells
                .iter()
                .map(|&c| Point::new(-c.x, c.y, c.z)),
            self.mobility,
        )
    }

    /// Canonical form used to test pure-translation congruence: cells
    /// translated so the bounding box's minimum corner is the origin, then
    /// sorted lexicographically.
    fn normalized_sorted(&self) -> SmallVec<[Point; 24]> {
        let min_x = self.cells.iter().map(|p| p.x).min().unwrap_or(0);
        let min_y = self.cells.iter().map(|p| p.y).min().unwrap_or(0);
        let min_z = self.cells.iter().map(|p| p.z).min().unwrap_or(0);
        let origin = Point::new(min_x, min_y, min_z);
        let mut out: SmallVec<[Point; 24]> = self
            .cells
            .iter()
            .map(|&c| c.sub(origin))
            .collect();
        out.sort_unstable_by_key(|p| (p.x, p.y, p.z));
        out
    }

    /// Two pieces are congruent iff some translation maps one's sorted
    /// point list onto the other's.
    pub fn translation_congruent(&self, other: &Piece) -> bool {
        self.cells.len() == other.cells.len() && self.normalized_sorted() == other.normalized_sorted()
    }

    /// Smallest point in lexicographic (x, y, z) order; used to anchor
    /// images and as the de Bruijn driver's "first cell" test.
    pub fn lex_min(&self) -> Point {
        *self
            .cells
            .iter()
            .min_by_key(|p| (p.x, p.y, p.z))
            .expect("piece has at least one cell")
    }
}

/// Dense 1-based identifier for a distinct copy of a shape; `0` is reserved
/// to mean "empty cell" in state vectors.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct NamedPieceId(pub u32);

/// A piece plus its user-facing identity.
#[derive(Clone, Debug)]
pub struct NamedPiece {
    pub id: NamedPieceId,
    pub name: String,
    pub piece: Piece,
}

/// Dense identifier for a [`Shape`] (rotation-equivalence class of pieces).
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct ShapeId(pub u32);

/// An equivalence class of congruent-under-rotation pieces.
///
/// Carries the bookkeeping the solver needs at every recursive step
/// (`remaining_copies`) as well as the data computed once at construction
/// (distinct orientations, mirror shape, image lists — the latter two are
/// filled in by [`crate::image`] and [`crate::symmetry`] after all shapes
/// exist).
#[derive(Clone, Debug)]
pub struct Shape {
    pub id: ShapeId,
    /// One representative piece (any copy; used as the canonical cell set).
    pub representative: Piece,
    pub copies: Vec<NamedPiece>,
    /// The subset of the 24 rotations that yield geometrically distinct
    /// orientations of this shape (duplicates collapse for symmetric pieces).
    pub distinct_rotations: Vec<Rotation>,
    /// The shape congruent to this one's mirror image, if any (one-sided mode).
    pub mirror_id: Option<ShapeId>,
    /// Number of copies not yet placed. Used as DLX column multiplicity.
    pub remaining_copies: u32,
}

impl Shape {
    /// Every rotation that produces a point-set distinct (up to translation)
    /// from all rotations already recorded.
    pub fn compute_distinct_rotations(piece: &Piece, candidates: &[Rotation]) -> Vec<Rotation> {
        let mut distinct: Vec<Rotation> = Vec::new();
        let mut seen: Vec<SmallVec<[Point; 24]>> = Vec::new();
        for &r in candidates {
            let rotated = piece.rotated(r);
            let canon = rotated.normalized_sorted();
            if !seen.contains(&canon) {
                seen.push(canon);
                distinct.push(r);
            }
        }
        distinct
    }

    pub fn mobile_copies(&self) -> impl Iterator<Item = &NamedPiece> {
        self.copies
            .iter()
            .filter(|c| c.piece.mobility() == Mobility::Mobile)
    }

    pub fn stationary_copies(&self) -> impl Iterator<Item = &NamedPiece> {
        self.copies
            .iter()
            .filter(|c| c.piece.mobility() == Mobility::Stationary)
    }

    pub fn mobile_count(&self) -> u32 {
        self.mobile_copies().count() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn domino() -> Piece {
        Piece::new(
            [Point::new(0, 0, 0), Point::new(1, 0, 0)],
            Mobility::Mobile,
        )
    }

    #[test]
    fn translation_congruence_ignores_position() {
        let a = domino();
        let b = domino().translated(Point::new(5, -3, 0));
        assert!(a.translation_congruent(&b));
    }

    #[test]
    fn translation_congruence_rejects_different_shape() {
        let a = domino();
        let l = Piece::new(
            [
                Point::new(0, 0, 0),
                Point::new(1, 0, 0),
                Point::new(0, 1, 0),
            ],
            Mobility::Mobile,
        );
        assert!(!a.translation_congruent(&l));
    }

    #[test]
    fn distinct_rotations_of_domino_is_two() {
        let d = domino();
        let all: Vec<Rotation> = Rotation::all().collect();
        let distinct = Shape::compute_distinct_rotations(&d, &all);
        // A 1x2 domino has exactly 2 distinct orientations in 3-D (horizontal
        // along x, or rotated 90 about z to lie along y) once z-rotations and
        // axis swaps are accounted for — but many of the 24 rotations fix it,
        // so the orbit size divides 24.
        assert!(distinct.len() < 24);
        assert!(!distinct.is_empty());
    }

    #[test]
    fn cube_piece_has_one_distinct_rotation() {
        let cube = Piece::new([Point::new(0, 0, 0)], Mobility::Mobile);
        let all: Vec<Rotation> = Rotation::all().collect();
        let distinct = Shape::compute_distinct_rotations(&cube, &all);
        assert_eq!(distinct.len(), 1);
    }
}
