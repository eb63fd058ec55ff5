//! Output formatter: brief/full/sub-puzzle solution rendering, layout vs.
//! coordinate piece output, and the `KEY=value` statistics stream. Consumes
//! a solved [`Puzzle`] and a state vector; never mutates either.

use std::collections::HashMap;
use std::fmt::Write as _;

use polycube_core::grid::Grid;
use polycube_core::piece::{Mobility, NamedPieceId, Shape};
use polycube_core::puzzle::Puzzle;
use polycube_core::solution::StateVector;
use polycube_core::stats::Stats;

/// Overall rendering mode (first character of `format=`).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum OverallFormat {
    /// Pretty grid of piece names; only placed cells shown.
    Brief,
    /// A complete re-emittable puzzle definition.
    Full,
    /// Like `Full`, but placed pieces are re-emitted as stationary.
    SubPuzzle,
}

/// Piece-output mode (second character of `format=`), orthogonal to
/// [`OverallFormat`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PieceFormat {
    Layout,
    Coordinate,
}

#[derive(Clone, Copy, Debug)]
pub struct OutputFormat {
    pub overall: OverallFormat,
    pub piece: PieceFormat,
}

impl Default for OutputFormat {
    fn default() -> OutputFormat {
        OutputFormat { overall: OverallFormat::Brief, piece: PieceFormat::Layout }
    }
}

fn piece_names(shapes: &[Shape]) -> HashMap<NamedPieceId, &str> {
    shapes
        .iter()
        .flat_map(|s| s.copies.iter())
        .map(|c| (c.id, c.name.as_str()))
        .collect()
}

/// Render one solution's state vector according to `format`.
pub fn render_solution(puzzle: &Puzzle, state: &StateVector, format: OutputFormat) -> String {
    let grid = puzzle.solver().grid();
    let names = piece_names(puzzle.solver().shapes());
    match format.overall {
        OverallFormat::Brief => render_brief(grid, state, &names),
        OverallFormat::Full | OverallFormat::SubPuzzle => {
            render_full(puzzle, grid, state, &names, format)
        }
    }
}

/// One y-row per line, top row (`y = yDim-1`) first, z-layers separated by
/// `, `. Unfilled/hole cells print as `.`.
fn render_brief(grid: &Grid, state: &StateVector, names: &HashMap<NamedPieceId, &str>) -> String {
    let (x_dim, y_dim, z_dim) = grid.dims();
    let mut out = String::new();
    for y in (0..y_dim).rev() {
        for z in 0..z_dim {
            if z > 0 {
                out.push_str(", ");
            }
            for x in 0..x_dim {
                if x > 0 {
                    out.push(' ');
                }
                let label = grid
                    .get_id(polycube_core::geometry::Point::new(x, y, z))
                    .and_then(|id| state[id.index()])
                    .and_then(|named| names.get(&named).copied())
                    .unwrap_or(".");
                out.push_str(label);
            }
        }
        out.push('\n');
    }
    out
}

/// A complete re-emittable `D ... ~D` block. For `SubPuzzle`, every piece
/// with a placed cell is re-emitted as `type=S`; everything else keeps its
/// original mobility.
fn render_full(
    puzzle: &Puzzle,
    grid: &Grid,
    state: &StateVector,
    names: &HashMap<NamedPieceId, &str>,
    format: OutputFormat,
) -> String {
    let (x_dim, y_dim, z_dim) = grid.dims();
    let mut out = String::new();
    let _ = writeln!(out, "D:xDim={x_dim}:yDim={y_dim}:zDim={z_dim}");

    let mut placed_cells: HashMap<NamedPieceId, Vec<polycube_core::geometry::Point>> = HashMap::new();
    for point in grid.points.iter() {
        if let Some(named) = state[point.id.index()] {
            placed_cells.entry(named).or_default().push(point.point);
        }
    }

    // Every stationary piece keeps its original cells (they never entered
    // `grid`/`state` at all); every mobile piece's cells come from where
    // this solution placed it.
    let mut pieces: Vec<(&str, &str, Vec<polycube_core::geometry::Point>)> = Vec::new();
    for shape in puzzle.solver().shapes() {
        for copy in &shape.copies {
            let was_stationary = copy.piece.mobility() == Mobility::Stationary;
            let cells = if was_stationary {
                copy.piece.cells().to_vec()
            } else if let Some(cells) = placed_cells.get(&copy.id) {
                cells.clone()
            } else {
                continue;
            };
            let stationary_now =
                was_stationary || (format.overall == OverallFormat::SubPuzzle && !cells.is_empty());
            let type_code = if stationary_now { "S" } else { "M" };
            let name = names.get(&copy.id).copied().unwrap_or(copy.name.as_str());
            pieces.push((name, type_code, cells));
        }
    }

    match format.piece {
        PieceFormat::Coordinate => {
            for (name, type_code, cells) in &pieces {
                let layout = cells
                    .iter()
                    .map(|p| format!("{} {} {}", p.x, p.y, p.z))
                    .collect::<Vec<_>>()
                    .join(", ");
                let _ = writeln!(out, "C:name={name}:type={type_code}:layout={layout}");
            }
        }
        PieceFormat::Layout => {
            let stationary_names: Vec<&str> = pieces
                .iter()
                .filter(|(_, type_code, _)| *type_code == "S")
                .map(|(name, _, _)| *name)
                .collect();
            if stationary_names.is_empty() {
                out.push_str("L\n");
            } else {
                let _ = writeln!(out, "L:stationary={}", stationary_names.join(" "));
            }

            let mut label_at: HashMap<polycube_core::geometry::Point, &str> = HashMap::new();
            for (name, _, cells) in &pieces {
                for &cell in cells {
                    label_at.insert(cell, name);
                }
            }
            for y in (0..y_dim).rev() {
                for z in 0..z_dim {
                    if z > 0 {
                        out.push_str(", ");
                    }
                    for x in 0..x_dim {
                        if x > 0 {
                            out.push(' ');
                        }
                        let label = label_at
                            .get(&polycube_core::geometry::Point::new(x, y, z))
                            .copied()
                            .unwrap_or(".");
                        out.push_str(label);
                    }
                }
                out.push('\n');
            }
            out.push_str("~L\n");
        }
    }
    out.push_str("~D\n");
    out
}

/// `KEY=value` lines, one per metric, including the per-remaining-piece-count
/// breakdowns.
pub fn render_stats(stats: &Stats) -> String {
    use std::sync::atomic::Ordering;

    let mut out = String::new();
    let _ = writeln!(out, "solutions={}", stats.solutions.load(Ordering::Relaxed));
    let _ = writeln!(
        out,
        "redundantSolutions={}",
        stats.redundant_solutions.load(Ordering::Relaxed)
    );
    let _ = writeln!(
        out,
        "monteCarloTrials={}",
        stats.monte_carlo_trials.load(Ordering::Relaxed)
    );
    for (remaining, row) in stats.rows() {
        let _ = writeln!(out, "attempts[{remaining}]={}", row.attempts.load(Ordering::Relaxed));
        let _ = writeln!(out, "fits[{remaining}]={}", row.fits.load(Ordering::Relaxed));
        let _ = writeln!(out, "filters[{remaining}]={}", row.filters.load(Ordering::Relaxed));
        let _ = writeln!(
            out,
            "parityBacktrackCount[{remaining}]={}",
            row.parity_backtracks.load(Ordering::Relaxed)
        );
        let _ = writeln!(
            out,
            "volumeBacktrackCount[{remaining}]={}",
            row.volume_backtracks.load(Ordering::Relaxed)
        );
    }
    out
}
