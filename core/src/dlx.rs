//! The dancing-links exact-cover matrix: a four-way circular doubly-linked
//! grid of nodes with column heads, represented as an index arena instead of
//! raw pointers.

use crate::grid::GridPointId;
use crate::image::{Image, ImageId};
use crate::piece::ShapeId;

pub type NodeIdx = u32;

const ROOT: NodeIdx = 0;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ColumnTag {
    Root,
    GridPoint(GridPointId),
    Shape(ShapeId),
}

struct Node {
    up: NodeIdx,
    down: NodeIdx,
    left: NodeIdx,
    right: NodeIdx,
    /// For cell nodes, the arena index of their column's header. For header
    /// nodes, their own index.
    header: NodeIdx,
    /// `u32::MAX` for header nodes.
    row: u32,
}

struct ColumnMeta {
    tag: ColumnTag,
    /// Number of rows currently linked into this column.
    num_row: u32,
    /// For shape columns, the number of copies remaining to place. Always
    /// `1` for grid-point columns (kept for uniform bookkeeping).
    count: u32,
}

/// Rows are keyed by the [`ImageId`] they represent; `row_nodes[row]` lists
/// that row's nodes in construction order (cell nodes first, the shape node
/// last) so `place`/`unplace` and `filter_row`/`unfilter_row` can replay
/// them in the exact reverse order needed for DLX's reversal property.
#[derive(Debug)]
pub struct DlxMatrix {
    nodes: Vec<Node>,
    columns: Vec<ColumnMeta>,
    row_nodes: Vec<Vec<NodeIdx>>,
    row_image: Vec<ImageId>,
    filter_stack: Vec<u32>,
}

/// Whether placing a row caused its shape column to be fully covered
/// (its last copy was used). Must be threaded back into [`DlxMatrix::unplace`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct PlaceOutcome {
    shape_covered: bool,
}

impl DlxMatrix {
    /// Build a fresh matrix: one column per currently-unfilled grid point,
    /// one column per shape with remaining mobile copies, and one row per
    /// image whose shape still has copies left.
    pub fn build(
        grid_point_ids: &[GridPointId],
        shapes: &[(ShapeId, u32)],
        images: &[Image],
    ) -> DlxMatrix {
        let mut nodes = Vec::new();
        let mut columns = Vec::new();

        // Root header (index 0).
        nodes.push(Node {
            up: ROOT,
            down: ROOT,
            left: ROOT,
            right: ROOT,
            header: ROOT,
            row: u32::MAX,
        });
        columns.push(ColumnMeta {
            tag: ColumnTag::Root,
            num_row: 0,
            count: 0,
        });

        let mut grid_header: std::collections::HashMap<GridPointId, NodeIdx> = Default::default();
        for &gp in grid_point_ids {
            let idx = push_header(&mut nodes, &mut columns, ColumnTag::GridPoint(gp), 1);
            link_header_before_root(&mut nodes, idx);
            grid_header.insert(gp, idx);
        }

        let mut shape_header: std::collections::HashMap<ShapeId, NodeIdx> = Default::default();
        for &(shape_id, remaining) in shapes {
            if remaining == 0 {
                continue;
            }
            let idx = push_header(&mut nodes, &mut columns, ColumnTag::Shape(shape_id), remaining);
            link_header_before_root(&mut nodes, idx);
            shape_header.insert(shape_id, idx);
        }

        let mut matrix = DlxMatrix {
            nodes,
            columns,
            row_nodes: Vec::new(),
            row_image: Vec::new(),
            filter_stack: Vec::new(),
        };

        for image in images {
            let Some(&shape_col) = shape_header.get(&image.shape_id) else {
                continue;
            };
            let mut row_id = matrix.row_nodes.len() as u32;
            let mut nodes_in_row = Vec::with_capacity(image.size() + 1);

            for &cell in &image.cells {
                let header = grid_header[&cell];
                let node = matrix.push_cell_node(header, row_id);
                nodes_in_row.push(node);
            }
            let shape_node = matrix.push_cell_node(shape_col, row_id);
            nodes_in_row.push(shape_node);

            matrix.link_row_horizontal(&nodes_in_row);
            row_id = matrix.row_nodes.len() as u32;
            debug_assert_eq!(row_id, matrix.row_image.len() as u32);
            matrix.row_nodes.push(nodes_in_row);
            matrix.row_image.push(image.id);
        }

        matrix
    }

    fn push_cell_node(&mut self, header: NodeIdx, row: u32) -> NodeIdx {
        let idx = self.nodes.len() as NodeIdx;
        self.nodes.push(Node {
            up: self.nodes[header as usize].up,
            down: header,
            left: idx,
            right: idx,
            header,
            row,
        });
        let up = self.nodes[header as usize].up;
        self.nodes[up as usize].down = idx;
        self.nodes[header as usize].up = idx;
        let ci = self.col_index(header);
        self.columns[ci].num_row += 1;
        idx
    }

    fn link_row_horizontal(&mut self, row: &[NodeIdx]) {
        for w in row.windows(2) {
            self.nodes[w[0] as usize].right = w[1];
            self.nodes[w[1] as usize].left = w[0];
        }
        if let (Some(&first), Some(&last)) = (row.first(), row.last()) {
            self.nodes[last as usize].right = first;
            self.nodes[first as usize].left = last;
        }
    }

    fn col_index(&self, header: NodeIdx) -> usize {
        header as usize
    }

    pub fn row_image(&self, row: u32) -> ImageId {
        self.row_image[row as usize]
    }

    pub fn row_count(&self) -> usize {
        self.row_nodes.len()
    }

    pub fn column_tag(&self, header: NodeIdx) -> ColumnTag {
        self.columns[self.col_index(header)].tag
    }

    pub fn column_num_row(&self, header: NodeIdx) -> u32 {
        self.columns[self.col_index(header)].num_row
    }

    pub fn column_count(&self, header: NodeIdx) -> u32 {
        self.columns[self.col_index(header)].count
    }

    /// Iterate the live (uncovered) columns in header order.
    pub fn columns(&self) -> impl Iterator<Item = NodeIdx> + '_ {
        let mut cur = self.nodes[ROOT as usize].right;
        std::iter::from_fn(move || {
            if cur == ROOT {
                None
            } else {
                let ret = cur;
                cur = self.nodes[cur as usize].right;
                Some(ret)
            }
        })
    }

    /// Rows currently linked into `header`, as row ids.
    pub fn rows_of(&self, header: NodeIdx) -> impl Iterator<Item = u32> + '_ {
        let start = header;
        let mut cur = self.nodes[header as usize].down;
        std::iter::from_fn(move || {
            if cur == start {
                None
            } else {
                let ret = self.nodes[cur as usize].row;
                cur = self.nodes[cur as usize].down;
                Some(ret)
            }
        })
    }

    fn unlink_vertical(&mut self, node: NodeIdx) {
        let (up, down) = (self.nodes[node as usize].up, self.nodes[node as usize].down);
        self.nodes[down as usize].up = up;
        self.nodes[up as usize].down = down;
        let header = self.nodes[node as usize].header;
        let ci = self.col_index(header);
        self.columns[ci].num_row -= 1;
    }

    fn relink_vertical(&mut self, node: NodeIdx) {
        let header = self.nodes[node as usize].header;
        let ci = self.col_index(header);
        self.columns[ci].num_row += 1;
        let (up, down) = (self.nodes[node as usize].up, self.nodes[node as usize].down);
        self.nodes[down as usize].up = node;
        self.nodes[up as usize].down = node;
    }

    /// Unlink `c` from the header chain, and for every row still in `c`,
    /// remove that row's other nodes from their columns.
    pub fn cover(&mut self, c: NodeIdx) {
        let (left, right) = (self.nodes[c as usize].left, self.nodes[c as usize].right);
        self.nodes[right as usize].left = left;
        self.nodes[left as usize].right = right;

        let mut r = self.nodes[c as usize].down;
        while r != c {
            let mut j = self.nodes[r as usize].right;
            while j != r {
                self.unlink_vertical(j);
                j = self.nodes[j as usize].right;
            }
            r = self.nodes[r as usize].down;
        }
    }

    /// Exact inverse of [`DlxMatrix::cover`]; restores the matrix bit for bit.
    pub fn uncover(&mut self, c: NodeIdx) {
        let mut r = self.nodes[c as usize].up;
        while r != c {
            let mut j = self.nodes[r as usize].left;
            while j != r {
                self.relink_vertical(j);
                j = self.nodes[j as usize].left;
            }
            r = self.nodes[r as usize].up;
        }

        let (left, right) = (self.nodes[c as usize].left, self.nodes[c as usize].right);
        self.nodes[right as usize].left = c;
        self.nodes[left as usize].right = c;
    }

    /// Place `row`: cover every grid-point column it spans; decrement its
    /// shape column's remaining-copies count, covering that column too only
    /// if the count reaches zero.
    pub fn place(&mut self, row: u32) -> PlaceOutcome {
        let nodes = self.row_nodes[row as usize].clone();
        let mut shape_covered = false;
        for node in nodes {
            let header = self.nodes[node as usize].header;
            match self.columns[self.col_index(header)].tag {
                ColumnTag::GridPoint(_) => self.cover(header),
                ColumnTag::Shape(_) => {
                    let ci = self.col_index(header);
                    self.columns[ci].count -= 1;
                    if self.columns[ci].count == 0 {
                        self.cover(header);
                        shape_covered = true;
                    } else {
                        self.unlink_vertical(node);
                    }
                }
                ColumnTag::Root => unreachable!("row node cannot belong to the root column"),
            }
        }
        PlaceOutcome { shape_covered }
    }

    /// Exact inverse of [`DlxMatrix::place`]. `outcome` must be the value
    /// returned by the matching `place` call.
    pub fn unplace(&mut self, row: u32, outcome: PlaceOutcome) {
        let nodes = self.row_nodes[row as usize].clone();
        for &node in nodes.iter().rev() {
            let header = self.nodes[node as usize].header;
            match self.columns[self.col_index(header)].tag {
                ColumnTag::GridPoint(_) => self.uncover(header),
                ColumnTag::Shape(_) => {
                    if outcome.shape_covered {
                        self.uncover(header);
                    } else {
                        self.relink_vertical(node);
                    }
                    let ci = self.col_index(header);
                    self.columns[ci].count += 1;
                }
                ColumnTag::Root => unreachable!("row node cannot belong to the root column"),
            }
        }
    }

    /// Hide `row` from every column it touches without altering any
    /// column's remaining-copies count. Stacked; must be released LIFO via
    /// [`DlxMatrix::unfilter_row`].
    pub fn filter_row(&mut self, row: u32) {
        let nodes = self.row_nodes[row as usize].clone();
        for node in nodes {
            self.unlink_vertical(node);
        }
        self.filter_stack.push(row);
    }

    /// Pop and relink the most recently filtered row.
    pub fn unfilter_row(&mut self) -> u32 {
        let row = self.filter_stack.pop().expect("unfilter without matching filter");
        let nodes = self.row_nodes[row as usize].clone();
        for &node in nodes.iter().rev() {
            self.relink_vertical(node);
        }
        row
    }

    pub fn filter_depth(&self) -> usize {
        self.filter_stack.len()
    }

    /// The column headers every node of `row` belongs to (cell columns and
    /// the trailing shape column).
    pub fn row_headers(&self, row: u32) -> Vec<NodeIdx> {
        self.row_nodes[row as usize]
            .iter()
            .map(|&n| self.nodes[n as usize].header)
            .collect()
    }

    /// Every row currently linked into at least one live column, deduplicated.
    /// Used by the lookahead filters, which must visit each candidate row
    /// exactly once regardless of how many columns it spans.
    pub fn live_rows(&self) -> Vec<u32> {
        let mut seen = std::collections::HashSet::new();
        for header in self.columns() {
            for row in self.rows_of(header) {
                seen.insert(row);
            }
        }
        let mut rows: Vec<u32> = seen.into_iter().collect();
        rows.sort_unstable();
        rows
    }

    /// Unfilter rows until the filter stack is back to `depth`. Used to
    /// unwind a whole batch of fit/parity/volume filters applied at one
    /// recursive step.
    pub fn unfilter_to(&mut self, depth: usize) {
        while self.filter_stack.len() > depth {
            self.unfilter_row();
        }
    }

    /// Produce a uniformly random permutation of each column's row nodes
    /// and rebuild the vertical chain accordingly.
    pub fn randomize(&mut self, rng: &mut crate::rng::SplitMix64) {
        let headers: Vec<NodeIdx> = (1..self.columns.len() as NodeIdx).collect();
        for header in headers {
            let mut members: Vec<NodeIdx> = Vec::new();
            let mut cur = self.nodes[header as usize].down;
            while cur != header {
                members.push(cur);
                cur = self.nodes[cur as usize].down;
            }
            for i in (1..members.len()).rev() {
                let j = rng.next_usize_below(i + 1);
                members.swap(i, j);
            }
            let mut prev = header;
            for &m in &members {
                self.nodes[prev as usize].down = m;
                self.nodes[m as usize].up = prev;
                prev = m;
            }
            self.nodes[prev as usize].down = header;
            self.nodes[header as usize].up = prev;
        }
    }
}

fn push_header(
    nodes: &mut Vec<Node>,
    columns: &mut Vec<ColumnMeta>,
    tag: ColumnTag,
    count: u32,
) -> NodeIdx {
    let idx = nodes.len() as NodeIdx;
    nodes.push(Node {
        up: idx,
        down: idx,
        left: idx,
        right: idx,
        header: idx,
        row: u32::MAX,
    });
    columns.push(ColumnMeta {
        tag,
        num_row: 0,
        count,
    });
    idx
}

fn link_header_before_root(nodes: &mut [Node], idx: NodeIdx) {
    let root_left = nodes[ROOT as usize].left;
    nodes[idx as usize].left = root_left;
    nodes[idx as usize].right = ROOT;
    nodes[root_left as usize].right = idx;
    nodes[ROOT as usize].left = idx;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Grid;
    use crate::image::ImageGenerator;
    use crate::piece::{Mobility, Piece, Shape, ShapeId};
    use smallvec::SmallVec;

    fn build_domino_matrix() -> (Grid, DlxMatrix) {
        let grid = Grid::new(2, 1, 1, |_| false);
        let piece = Piece::new(
            [crate::geometry::Point::new(0, 0, 0), crate::geometry::Point::new(1, 0, 0)],
            Mobility::Mobile,
        );
        let all: Vec<_> = crate::geometry::Rotation::all().collect();
        let distinct = Shape::compute_distinct_rotations(&piece, &all);
        let shape = Shape {
            id: ShapeId(0),
            representative: piece,
            copies: Vec::new(),
            distinct_rotations: distinct,
            mirror_id: None,
            remaining_copies: 1,
        };
        let mut next_id = 0;
        let images = ImageGenerator::generate(&grid, &shape, &mut next_id, false, &[], &[]);
        let grid_ids: Vec<_> = grid.points.iter().map(|p| p.id).collect();
        let matrix = DlxMatrix::build(&grid_ids, &[(shape.id, 1)], &images);
        (grid, matrix)
    }

    #[test]
    fn cover_uncover_is_bit_exact() {
        let (_grid, mut m) = build_domino_matrix();
        let columns_before: Vec<NodeIdx> = m.columns().collect();
        let c = columns_before[0];
        m.cover(c);
        m.uncover(c);
        let columns_after: Vec<NodeIdx> = m.columns().collect();
        assert_eq!(columns_before, columns_after);
    }

    #[test]
    fn place_unplace_restores_matrix() {
        let (_grid, mut m) = build_domino_matrix();
        assert_eq!(m.row_count(), 1);
        let columns_before: Vec<NodeIdx> = m.columns().collect();
        let outcome = m.place(0);
        assert!(outcome.shape_covered);
        assert_eq!(m.columns().count(), 0);
        m.unplace(0, outcome);
        let columns_after: Vec<NodeIdx> = m.columns().collect();
        assert_eq!(columns_before, columns_after);
    }

    #[test]
    fn filter_unfilter_row_is_lifo_balanced() {
        let (_grid, mut m) = build_domino_matrix();
        let before: SmallVec<[u32; 4]> = m.columns().map(|c| m.column_num_row(c)).collect();
        m.filter_row(0);
        assert_eq!(m.filter_depth(), 1);
        m.unfilter_row();
        let after: SmallVec<[u32; 4]> = m.columns().map(|c| m.column_num_row(c)).collect();
        assert_eq!(before, after);
    }
}
