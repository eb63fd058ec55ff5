//! The 3-D cell grid, its neighbour graph, and the fill discipline used by
//! the volume monitor's flood fill.

use crate::geometry::Point;

/// Dense 0-based identifier for a [`GridPoint`], allocated in lexicographic
/// (x, y, z) order so that sub-arrays are automatically sorted.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct GridPointId(pub u32);

impl GridPointId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A cell not covered by a stationary piece.
///
/// The per-shape de Bruijn/MCH image lists live in
/// [`crate::solver::TilingContext`] instead of here: they are only valid for
/// the span of recursion during which the solver stays in tiling mode with a
/// fixed bit assignment, and a `GridPoint` is shared across many such spans
/// as the search backtracks in and out of tiling.
pub struct GridPoint {
    pub id: GridPointId,
    pub point: Point,
    /// Negative ⇒ unoccupied (the specific negative value flip-flops between
    /// `-1` and `-2` across volume checks, see [`Grid::check_volume`]).
    /// Non-negative ⇒ occupied; the value is this cell's position in the
    /// image stack at the moment it was filled.
    pub fill: i32,
    pub neighbours: Vec<GridPointId>,
}

impl GridPoint {
    pub fn is_unoccupied(&self) -> bool {
        self.fill < 0
    }
}

/// The puzzle's cuboid, restricted to cells not covered by a stationary
/// piece.
#[derive(Debug)]
pub struct Grid {
    x_dim: i32,
    y_dim: i32,
    z_dim: i32,
    /// `None` where a stationary piece occupies the cell.
    index: Vec<Option<GridPointId>>,
    pub points: Vec<GridPoint>,
    unoccupied_fill: i32,
}

fn flat_index(y_dim: i32, z_dim: i32, p: Point) -> usize {
    ((p.x * y_dim + p.y) * z_dim + p.z) as usize
}

impl Grid {
    /// `occupied` marks cells pre-claimed by stationary pieces; those cells
    /// become holes in the grid (no [`GridPoint`] is allocated for them).
    pub fn new(x_dim: i32, y_dim: i32, z_dim: i32, occupied: impl Fn(Point) -> bool) -> Grid {
        let mut index = vec![None; (x_dim * y_dim * z_dim) as usize];
        let mut points = Vec::new();

        // Allocate in (x, y, z) lex order per the GridPoint contract.
        for x in 0..x_dim {
            for y in 0..y_dim {
                for z in 0..z_dim {
                    let p = Point::new(x, y, z);
                    if occupied(p) {
                        continue;
                    }
                    let id = GridPointId(points.len() as u32);
                    index[flat_index(y_dim, z_dim, p)] = Some(id);
                    points.push(GridPoint {
                        id,
                        point: p,
                        fill: -1,
                        neighbours: Vec::new(),
                    });
                }
            }
        }

        let mut grid = Grid {
            x_dim,
            y_dim,
            z_dim,
            index,
            points,
            unoccupied_fill: -1,
        };
        grid.link_neighbours();
        grid
    }

    fn link_neighbours(&mut self) {
        const DIRS: [(i32, i32, i32); 6] = [
            (1, 0, 0),
            (-1, 0, 0),
            (0, 1, 0),
            (0, -1, 0),
            (0, 0, 1),
            (0, 0, -1),
        ];
        for i in 0..self.points.len() {
            let p = self.points[i].point;
            let mut neighbours = Vec::new();
            for (dx, dy, dz) in DIRS {
                let q = Point::new(p.x + dx, p.y + dy, p.z + dz);
                if let Some(id) = self.get_id(q) {
                    neighbours.push(id);
                }
            }
            self.points[i].neighbours = neighbours;
        }
    }

    pub fn dims(&self) -> (i32, i32, i32) {
        (self.x_dim, self.y_dim, self.z_dim)
    }

    pub fn in_bounds(&self, p: Point) -> bool {
        p.x >= 0
            && p.x < self.x_dim
            && p.y >= 0
            && p.y < self.y_dim
            && p.z >= 0
            && p.z < self.z_dim
    }

    pub fn get_id(&self, p: Point) -> Option<GridPointId> {
        if !self.in_bounds(p) {
            return None;
        }
        self.index[flat_index(self.y_dim, self.z_dim, p)]
    }

    pub fn get(&self, id: GridPointId) -> &GridPoint {
        &self.points[id.index()]
    }

    pub fn get_mut(&mut self, id: GridPointId) -> &mut GridPoint {
        &mut self.points[id.index()]
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn unoccupied_fill(&self) -> i32 {
        self.unoccupied_fill
    }

    /// Mark `id` occupied, recording `stamp` (the image stack depth or any
    /// non-negative sentinel) as its fill value.
    pub fn occupy(&mut self, id: GridPointId, stamp: i32) {
        debug_assert!(stamp >= 0);
        self.get_mut(id).fill = stamp;
    }

    /// Restore `id` to the current unoccupied sentinel.
    pub fn vacate(&mut self, id: GridPointId) {
        self.get_mut(id).fill = self.unoccupied_fill;
    }

    /// Flood-fill every connected unoccupied region and report, for each,
    /// its size. Always walks the whole grid (not just until a failure) so
    /// that the fill flip-flop invariant holds no matter what the caller
    /// does with the sizes. Toggles `unoccupied_fill` between
    /// `-1` and `-2` as a side effect.
    pub fn flood_fill_regions(&mut self) -> Vec<usize> {
        let new_fill = -3 - self.unoccupied_fill;
        let old_fill = self.unoccupied_fill;
        let mut regions = Vec::new();
        let mut stack = Vec::new();

        for i in 0..self.points.len() {
            if self.points[i].fill != old_fill {
                continue;
            }
            let start = self.points[i].id;
            stack.push(start);
            self.get_mut(start).fill = new_fill;
            let mut size = 0usize;
            while let Some(id) = stack.pop() {
                size += 1;
                let neighbours = self.get(id).neighbours.clone();
                for n in neighbours {
                    if self.get(n).fill == old_fill {
                        self.get_mut(n).fill = new_fill;
                        stack.push(n);
                    }
                }
            }
            regions.push(size);
        }

        self.unoccupied_fill = new_fill;
        regions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flood_fill_single_region() {
        let mut g = Grid::new(2, 2, 1, |_| false);
        assert_eq!(g.len(), 4);
        let regions = g.flood_fill_regions();
        assert_eq!(regions, vec![4]);
        assert_eq!(g.unoccupied_fill(), -2);
    }

    #[test]
    fn flood_fill_splits_on_occupied_wall() {
        let mut g = Grid::new(3, 1, 1, |_| false);
        let middle = g.get_id(Point::new(1, 0, 0)).unwrap();
        g.occupy(middle, 0);
        let mut regions = g.flood_fill_regions();
        regions.sort_unstable();
        assert_eq!(regions, vec![1, 1]);
    }

    #[test]
    fn occupied_cells_have_no_gridpoint() {
        let g = Grid::new(2, 2, 1, |p| p.x == 0 && p.y == 0);
        assert_eq!(g.len(), 3);
        assert!(g.get_id(Point::new(0, 0, 0)).is_none());
    }
}
