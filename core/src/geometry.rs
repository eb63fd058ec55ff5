//! Integer points, cell parity, and the 24-element cube rotation group.
//!
//! Rotations are generated once (the 24 orientation-preserving permutation
//! matrices with entries in `{-1, 0, 1}`) rather than hand-transcribed, and
//! the composition table is a transcript of matrix products keyed by index —
//! deriving a small closed table from first principles instead of
//! hard-coding it.

use std::sync::OnceLock;

/// An integer point in 3-space. `z` is always `0` for planar (2-D) puzzles.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Point {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32, z: i32) -> Point {
        Point { x, y, z }
    }

    /// `(x + y + z) mod 2`, mapped onto `{-1, +1}`.
    pub fn parity(self) -> i32 {
        if (self.x + self.y + self.z).rem_euclid(2) == 0 {
            1
        } else {
            -1
        }
    }

    pub fn translate(self, by: Point) -> Point {
        Point::new(self.x + by.x, self.y + by.y, self.z + by.z)
    }

    pub fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

/// One of the 24 orientation-preserving rotations of a cube, identified by a
/// dense index into the group table.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Rotation(pub u8);

type Matrix = [[i32; 3]; 3];

struct RotationGroup {
    matrices: Vec<Matrix>,
    /// `compose[a][b]` = index of the rotation equal to applying `a` then `b`.
    compose: Vec<Vec<u8>>,
    identity: u8,
    /// Indices of the 4 rotations about the z axis, in increasing-angle order.
    z_axis: [u8; 4],
}

fn mat_mul(a: Matrix, b: Matrix) -> Matrix {
    let mut out = [[0; 3]; 3];
    for r in 0..3 {
        for c in 0..3 {
            out[r][c] = (0..3).map(|k| a[r][k] * b[k][c]).sum();
        }
    }
    out
}

fn mat_det(m: Matrix) -> i32 {
    m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1])
        - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
        + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0])
}

fn mat_apply(m: Matrix, p: Point) -> Point {
    let v = [p.x, p.y, p.z];
    let out = [0, 1, 2].map(|r| (0..3).map(|c| m[r][c] * v[c]).sum());
    Point::new(out[0], out[1], out[2])
}

fn identity_matrix() -> Matrix {
    [[1, 0, 0], [0, 1, 0], [0, 0, 1]]
}

fn z_rotation(steps: i32) -> Matrix {
    // Rotation by `steps * 90` degrees about the z axis.
    match steps.rem_euclid(4) {
        0 => [[1, 0, 0], [0, 1, 0], [0, 0, 1]],
        1 => [[0, -1, 0], [1, 0, 0], [0, 0, 1]],
        2 => [[-1, 0, 0], [0, -1, 0], [0, 0, 1]],
        3 => [[0, 1, 0], [-1, 0, 0], [0, 0, 1]],
        _ => unreachable!(),
    }
}

fn build_group() -> RotationGroup {
    // Every signed permutation matrix with determinant +1 is an
    // orientation-preserving cube rotation; there are exactly 24.
    let mut matrices: Vec<Matrix> = Vec::new();
    let perms = [
        [0usize, 1, 2],
        [0, 2, 1],
        [1, 0, 2],
        [1, 2, 0],
        [2, 0, 1],
        [2, 1, 0],
    ];
    for perm in perms {
        for sx in [-1, 1] {
            for sy in [-1, 1] {
                for sz in [-1, 1] {
                    let signs = [sx, sy, sz];
                    let mut m = [[0; 3]; 3];
                    for row in 0..3 {
                        m[row][perm[row]] = signs[row];
                    }
                    if mat_det(m) == 1 {
                        matrices.push(m);
                    }
                }
            }
        }
    }
    debug_assert_eq!(matrices.len(), 24);

    let index_of = |m: Matrix| -> u8 {
        matrices
            .iter()
            .position(|&c| c == m)
            .expect("rotation group is closed under composition") as u8
    };

    let identity = index_of(identity_matrix());

    let mut compose = vec![vec![0u8; 24]; 24];
    for (a, &ma) in matrices.iter().enumerate() {
        for (b, &mb) in matrices.iter().enumerate() {
            compose[a][b] = index_of(mat_mul(ma, mb));
        }
    }

    let z_axis = [0, 1, 2, 3].map(|s| index_of(z_rotation(s)));

    RotationGroup {
        matrices,
        compose,
        identity,
        z_axis,
    }
}

fn group() -> &'static RotationGroup {
    static GROUP: OnceLock<RotationGroup> = OnceLock::new();
    GROUP.get_or_init(build_group)
}

impl Rotation {
    pub const COUNT: usize = 24;

    pub fn identity() -> Rotation {
        Rotation(group().identity)
    }

    /// The 4 rotations about the z axis, used for one-sided (2-D) mode.
    pub fn z_axis_subgroup() -> [Rotation; 4] {
        group().z_axis.map(Rotation)
    }

    pub fn all() -> impl Iterator<Item = Rotation> {
        (0..24).map(Rotation)
    }

    pub fn is_identity(self) -> bool {
        self == Rotation::identity()
    }

    /// `true` for the 4 rotations about the z axis (the ones that leave a
    /// flat, one-sided board's chirality unchanged).
    pub fn is_z_axis(self) -> bool {
        group().z_axis.contains(&self.0)
    }

    /// Apply this rotation, then `other`.
    pub fn then(self, other: Rotation) -> Rotation {
        Rotation(group().compose[self.0 as usize][other.0 as usize])
    }

    pub fn apply(self, p: Point) -> Point {
        mat_apply(group().matrices[self.0 as usize], p)
    }

    pub fn inverse(self) -> Rotation {
        // The group is finite; search for the matrix whose composition with
        // `self` yields the identity. Cheap: 24 entries, computed once per
        // call site that actually needs it (symmetry analysis only).
        let id = group().identity;
        (0..24)
            .map(Rotation)
            .find(|&r| self.then(r).0 == id)
            .expect("every rotation has an inverse")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_has_24_elements_and_closed_identity() {
        let g = group();
        assert_eq!(g.matrices.len(), 24);
        for a in 0..24u8 {
            assert_eq!(Rotation(a).then(Rotation(g.identity)), Rotation(a));
            assert_eq!(Rotation(g.identity).then(Rotation(a)), Rotation(a));
        }
    }

    #[test]
    fn inverse_round_trips() {
        for r in Rotation::all() {
            let inv = r.inverse();
            assert!(r.then(inv).is_identity());
            assert!(inv.then(r).is_identity());
        }
    }

    #[test]
    fn z_axis_subgroup_is_closed() {
        let z: std::collections::HashSet<_> = Rotation::z_axis_subgroup().into_iter().collect();
        for &a in &z {
            for &b in &z {
                assert!(z.contains(&a.then(b)));
            }
        }
    }

    #[test]
    fn parity_alternates() {
        assert_eq!(Point::new(0, 0, 0).parity(), 1);
        assert_eq!(Point::new(1, 0, 0).parity(), -1);
        assert_eq!(Point::new(1, 1, 0).parity(), 1);
        assert_eq!(Point::new(-1, 0, 0).parity(), -1);
    }

    #[test]
    fn rotation_preserves_point_set_cardinality() {
        let pts = [
            Point::new(0, 0, 0),
            Point::new(1, 0, 0),
            Point::new(0, 1, 0),
        ];
        for r in Rotation::all() {
            let rotated: std::collections::HashSet<_> = pts.iter().map(|&p| r.apply(p)).collect();
            assert_eq!(rotated.len(), pts.len());
        }
    }
}
