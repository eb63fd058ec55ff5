use criterion::{black_box, criterion_group, criterion_main, Criterion};

use polycube_core::dlx::DlxMatrix;
use polycube_core::geometry::{Point, Rotation};
use polycube_core::grid::Grid;
use polycube_core::heuristic::HeuristicTable;
use polycube_core::image::{ImageGenerator, RedundancyFilterChoice};
use polycube_core::piece::{Mobility, Piece, Shape, ShapeId};
use polycube_core::puzzle::{PieceSpec, Puzzle, PuzzleConfig};
use polycube_core::solver::SolverConfig;

fn domino_matrix() -> (Grid, DlxMatrix) {
    let grid = Grid::new(4, 4, 1, |_| false);
    let piece = Piece::new([Point::new(0, 0, 0), Point::new(1, 0, 0)], Mobility::Mobile);
    let rotations: Vec<_> = Rotation::all().collect();
    let distinct = Shape::compute_distinct_rotations(&piece, &rotations);
    let shape = Shape {
        id: ShapeId(0),
        representative: piece,
        copies: Vec::new(),
        distinct_rotations: distinct,
        mirror_id: None,
        remaining_copies: 8,
    };
    let mut next_id = 0;
    let images = ImageGenerator::generate(&grid, &shape, &mut next_id, false, &[], &[]);
    let grid_ids: Vec<_> = grid.points.iter().map(|p| p.id).collect();
    let matrix = DlxMatrix::build(&grid_ids, &[(shape.id, 8)], &images);
    (grid, matrix)
}

/// Repeated cover/uncover cycles over every live column, the innermost loop
/// of the recursive search.
fn bench_cover_uncover(c: &mut Criterion) {
    let (_, mut matrix) = domino_matrix();
    let headers: Vec<_> = matrix.columns().collect();
    c.bench_function("cover_uncover_all_columns", |b| {
        b.iter(|| {
            for h in &headers {
                matrix.cover(black_box(*h));
            }
            for h in headers.iter().rev() {
                matrix.uncover(black_box(*h));
            }
        });
    });
}

/// A full small solve, exercising row selection, placement, and recursion
/// together rather than the matrix operations in isolation.
fn bench_solve_eight_dominoes(c: &mut Criterion) {
    c.bench_function("solve_4x4_dominoes", |b| {
        b.iter(|| {
            let config = PuzzleConfig {
                x_dim: 4,
                y_dim: 4,
                z_dim: 1,
                one_sided: false,
                pieces: (0..8)
                    .map(|i| PieceSpec {
                        name: format!("d{i}"),
                        cells: vec![Point::new(0, 0, 0), Point::new(1, 0, 0)],
                        mobility: Mobility::Mobile,
                    })
                    .collect(),
            };
            let solver_config = SolverConfig::new(HeuristicTable::default_table());
            let mut puzzle =
                Puzzle::build(config, RedundancyFilterChoice::Off, false, solver_config).unwrap();
            puzzle.solver_mut().solve();
            black_box(puzzle.solver().solutions.len())
        });
    });
}

criterion_group!(benches, bench_cover_uncover, bench_solve_eight_dominoes);
criterion_main!(benches);
