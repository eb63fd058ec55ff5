//! Puzzle assembly: validates a parsed puzzle description, groups named
//! pieces into shapes, runs symmetry analysis and image generation, resolves
//! the redundancy-filter choice, and hands the result to a [`Solver`]. Also
//! keeps the piece-name table the output formatter needs to turn a finished
//! placement into a human-readable state vector (`getState` in the original;
//! kept as a lazy, output-time-only step here too).

use std::collections::HashMap;

use ahash::AHashSet;

use crate::error::{PuzzleDefError, PuzzleError, RedundancyError};
use crate::geometry::{Point, Rotation};
use crate::grid::{Grid, GridPointId};
use crate::image::{
    pick_auto_filter_shape, FilterStats, Image, ImageGenerator, ImageId, RedundancyFilterChoice,
};
use crate::piece::{Mobility, NamedPiece, NamedPieceId, Piece, Shape, ShapeId};
use crate::solution::{SolutionFilter, SolutionOutcome, StateVector};
use crate::solver::{Solver, SolverConfig};
use crate::symmetry::{self, SymmetricRotation};

/// One named piece, in the form the parser hands to [`Puzzle::build`]:
/// either a `C:` record's explicit coordinate list or cells collected from
/// an `L:`/`~L` layout block.
pub struct PieceSpec {
    pub name: String,
    pub cells: Vec<Point>,
    pub mobility: Mobility,
}

/// The parser's whole-puzzle product: box dimensions plus every piece's
/// cell layout and mobility, ready to validate and assemble into a
/// [`Puzzle`].
pub struct PuzzleConfig {
    pub x_dim: i32,
    pub y_dim: i32,
    pub z_dim: i32,
    pub one_sided: bool,
    pub pieces: Vec<PieceSpec>,
}

fn congruent_under_rotation(a: &Piece, b: &Piece, rotations: &[Rotation]) -> bool {
    rotations.iter().any(|&r| a.rotated(r).translation_congruent(b))
}

/// An assembled, solver-ready puzzle: owns the [`Solver`] plus the
/// bookkeeping (symmetric rotations, shape-to-name table) the solver itself
/// has no need of during the hot loop.
#[derive(Debug)]
pub struct Puzzle {
    solver: Solver,
    symmetric_rotations: Vec<SymmetricRotation>,
    redundancy_complex: bool,
}

impl Puzzle {
    /// Validate `config`, assemble grid/shapes/images, resolve the
    /// redundancy filter, and build the solver. `solver_config` carries the
    /// search-tuning options that are independent of the puzzle
    /// definition itself; `priority_shape` is overwritten here if
    /// `redundancy_filter_first` is set.
    pub fn build(
        config: PuzzleConfig,
        redundancy: RedundancyFilterChoice,
        redundancy_filter_first: bool,
        mut solver_config: SolverConfig,
    ) -> Result<Puzzle, PuzzleError> {
        if config.one_sided && config.z_dim != 1 {
            return Err(PuzzleDefError::OneSidedRequiresFlatBox { z_dim: config.z_dim }.into());
        }

        let mut stationary_claims: HashMap<Point, String> = HashMap::new();
        for spec in &config.pieces {
            if spec.mobility != Mobility::Stationary {
                continue;
            }
            for &cell in &spec.cells {
                if let Some(first) = stationary_claims.get(&cell) {
                    return Err(PuzzleDefError::StationaryOverlap {
                        first: first.clone(),
                        second: spec.name.clone(),
                    }
                    .into());
                }
                stationary_claims.insert(cell, spec.name.clone());
            }
        }

        let piece_volume: u64 = config.pieces.iter().map(|s| s.cells.len() as u64).sum();
        let box_volume =
            config.x_dim as u64 * config.y_dim as u64 * config.z_dim as u64;
        if piece_volume != box_volume {
            return Err(PuzzleDefError::VolumeMismatch { piece_volume, box_volume }.into());
        }

        let all_rotations: Vec<Rotation> = Rotation::all().collect();
        let mut shapes: Vec<Shape> = Vec::new();
        let mut next_named_id = 1u32;
        for spec in &config.pieces {
            let piece = Piece::new(spec.cells.iter().copied(), spec.mobility);
            let shape_idx = shapes
                .iter()
                .position(|s| congruent_under_rotation(&s.representative, &piece, &all_rotations));
            let shape_idx = match shape_idx {
                Some(idx) => idx,
                None => {
                    let id = ShapeId(shapes.len() as u32);
                    let distinct = Shape::compute_distinct_rotations(&piece, &all_rotations);
                    shapes.push(Shape {
                        id,
                        representative: piece.clone(),
                        copies: Vec::new(),
                        distinct_rotations: distinct,
                        mirror_id: None,
                        remaining_copies: 0,
                    });
                    shapes.len() - 1
                }
            };
            let named_id = NamedPieceId(next_named_id);
            next_named_id += 1;
            shapes[shape_idx].copies.push(NamedPiece {
                id: named_id,
                name: spec.name.clone(),
                piece,
            });
        }
        for shape in &mut shapes {
            shape.remaining_copies = shape.mobile_count();
        }

        let representatives: Vec<Piece> = shapes.iter().map(|s| s.representative.clone()).collect();
        for i in 0..shapes.len() {
            let mirrored = shapes[i].representative.mirrored();
            if let Some(j) = (0..representatives.len())
                .find(|&j| j != i && congruent_under_rotation(&mirrored, &representatives[j], &all_rotations))
            {
                shapes[i].mirror_id = Some(shapes[j].id);
            }
        }

        let stationary_cells: AHashSet<Point> = config
            .pieces
            .iter()
            .filter(|s| s.mobility == Mobility::Stationary)
            .flat_map(|s| s.cells.iter().copied())
            .collect();
        let grid = Grid::new(config.x_dim, config.y_dim, config.z_dim, |p| {
            stationary_cells.contains(&p)
        });

        let all_shapes_have_mirrors = shapes.iter().all(|s| s.mirror_id.is_some());
        let allow_mirrored_pieces = !config.one_sided || all_shapes_have_mirrors;
        let candidate_rotations: Vec<Rotation> = if config.one_sided && !all_shapes_have_mirrors {
            Rotation::z_axis_subgroup().to_vec()
        } else {
            all_rotations.clone()
        };
        let analysis = symmetry::analyze(
            &grid,
            (config.x_dim, config.y_dim, config.z_dim),
            &stationary_cells,
            &candidate_rotations,
            allow_mirrored_pieces,
        );
        let permutations: Vec<Vec<GridPointId>> = analysis
            .symmetric_rotations
            .iter()
            .map(|sr| sr.permutation.clone())
            .collect();
        let rotations_for_filter: Vec<Rotation> =
            analysis.symmetric_rotations.iter().map(|sr| sr.rotation).collect();

        let chosen_shape = match redundancy {
            RedundancyFilterChoice::Off => None,
            RedundancyFilterChoice::Named(name) => {
                let shape = shapes
                    .iter()
                    .find(|s| s.copies.iter().any(|c| c.name == name))
                    .ok_or_else(|| RedundancyError::UnknownPiece(name.clone()))?;
                if shape.remaining_copies != 1 {
                    return Err(RedundancyError::MultipleCopies(name).into());
                }
                Some(shape.id)
            }
            RedundancyFilterChoice::Auto => {
                let mut stats = Vec::new();
                for shape in shapes.iter().filter(|s| s.remaining_copies == 1) {
                    let mut scratch_unfiltered = 0u32;
                    let unfiltered =
                        ImageGenerator::generate(&grid, shape, &mut scratch_unfiltered, false, &[], &[])
                            .len();
                    let mut scratch_filtered = 0u32;
                    let filtered = ImageGenerator::generate(
                        &grid,
                        shape,
                        &mut scratch_filtered,
                        true,
                        &rotations_for_filter,
                        &permutations,
                    )
                    .len();
                    stats.push(FilterStats {
                        shape_id: shape.id,
                        unfiltered_count: unfiltered,
                        filtered_count: filtered,
                    });
                }
                match pick_auto_filter_shape(&stats) {
                    Some(id) => Some(id),
                    None => return Err(RedundancyError::NoUniqueShape.into()),
                }
            }
        };
        if chosen_shape.is_some() && analysis.redundancy_complex {
            return Err(RedundancyError::RedundancyComplex.into());
        }

        let mut next_image_id = 0u32;
        let mut images: Vec<Image> = Vec::new();
        for shape in &shapes {
            if shape.remaining_copies == 0 {
                continue;
            }
            let filter_this = chosen_shape == Some(shape.id);
            let generated = ImageGenerator::generate(
                &grid,
                shape,
                &mut next_image_id,
                filter_this,
                &rotations_for_filter,
                &permutations,
            );
            images.extend(generated);
        }

        if redundancy_filter_first {
            solver_config.priority_shape = chosen_shape;
        }

        let num_mobile: u32 = shapes.iter().map(|s| s.remaining_copies).sum();
        warn_if_filter_below_tiling("fitFilter", solver_config.fit_filter.control(num_mobile), solver_config.mch);
        warn_if_filter_below_tiling(
            "parityFilter",
            solver_config.parity_filter.control(num_mobile),
            solver_config.mch,
        );
        warn_if_filter_below_tiling(
            "volumeFilter",
            solver_config.volume_filter.control(num_mobile),
            solver_config.mch,
        );

        let grid_point_ids: Vec<GridPointId> = grid.points.iter().map(|p| p.id).collect();
        let solver = Solver::new(grid, shapes, images, grid_point_ids, solver_config);

        Ok(Puzzle {
            solver,
            symmetric_rotations: analysis.symmetric_rotations,
            redundancy_complex: analysis.redundancy_complex,
        })
    }

    pub fn solver(&self) -> &Solver {
        &self.solver
    }

    pub fn solver_mut(&mut self) -> &mut Solver {
        &mut self.solver
    }

    pub fn is_redundancy_complex(&self) -> bool {
        self.redundancy_complex
    }

    /// Bind each image in `placement` (in order) to the shape's next
    /// unclaimed named copy, per `getState` (SUPPLEMENT). Only ever called
    /// at output time, never from the hot recursive loop.
    pub fn state_vector(&self, placement: &[ImageId]) -> StateVector {
        let grid = self.solver.grid();
        let mut state: StateVector = vec![None; grid.len()];
        let mut next_copy: HashMap<ShapeId, usize> = HashMap::new();
        for &image_id in placement {
            let image = self.solver.image(image_id);
            let shape = &self.solver.shapes()[image.shape_id.0 as usize];
            let idx = next_copy.entry(image.shape_id).or_insert(0);
            let copy = shape
                .mobile_copies()
                .nth(*idx)
                .expect("more images placed for a shape than it has mobile copies");
            *idx += 1;
            for &cell in &image.cells {
                state[cell.index()] = Some(copy.id);
            }
        }
        state
    }

    /// Resolve `placement` to a state vector and check it against `filter`,
    /// recording a redundant-solution count on a repeat.
    pub fn accept_solution(
        &self,
        filter: &mut SolutionFilter,
        placement: &[ImageId],
    ) -> SolutionOutcome {
        let state = self.state_vector(placement);
        let outcome = filter.observe(&state, &self.symmetric_rotations);
        if matches!(outcome, SolutionOutcome::Redundant) {
            self.solver.stats.record_redundant_solution();
        }
        outcome
    }
}

fn warn_if_filter_below_tiling(name: &str, control: u32, mch: u32) {
    if control < mch {
        log::warn!(
            "{name} threshold ({control}) is below the tiling threshold mch={mch}; this filter only runs while DLX is active and has no effect once tiling begins"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heuristic::HeuristicTable;

    /// `copies` named dominoes, each declared as the same local cell pair —
    /// legal because shape grouping is by rotation/translation congruence,
    /// not by declared position.
    fn domino_config(x: i32, y: i32, copies: u32) -> PuzzleConfig {
        let pieces = (0..copies)
            .map(|i| PieceSpec {
                name: format!("d{i}"),
                cells: vec![Point::new(0, 0, 0), Point::new(1, 0, 0)],
                mobility: Mobility::Mobile,
            })
            .collect();
        PuzzleConfig {
            x_dim: x,
            y_dim: y,
            z_dim: 1,
            one_sided: false,
            pieces,
        }
    }

    fn base_solver_config() -> SolverConfig {
        SolverConfig::new(HeuristicTable::default_table())
    }

    #[test]
    fn two_by_three_domino_tiling_has_three_solutions() {
        let mut puzzle = Puzzle::build(
            domino_config(2, 3, 3),
            RedundancyFilterChoice::Off,
            false,
            base_solver_config(),
        )
        .unwrap();
        puzzle.solver_mut().solve();
        assert_eq!(puzzle.solver().solutions.len(), 3);
    }

    #[test]
    fn volume_mismatch_is_rejected() {
        let mut config = domino_config(2, 3, 3);
        config.pieces.truncate(2);
        let err = Puzzle::build(
            config,
            RedundancyFilterChoice::Off,
            false,
            base_solver_config(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("volume"));
    }

    #[test]
    fn overlapping_stationary_pieces_are_rejected() {
        let config = PuzzleConfig {
            x_dim: 2,
            y_dim: 1,
            z_dim: 1,
            one_sided: false,
            pieces: vec![
                PieceSpec {
                    name: "a".to_string(),
                    cells: vec![Point::new(0, 0, 0)],
                    mobility: Mobility::Stationary,
                },
                PieceSpec {
                    name: "b".to_string(),
                    cells: vec![Point::new(0, 0, 0), Point::new(1, 0, 0)],
                    mobility: Mobility::Stationary,
                },
            ],
        };
        let err = Puzzle::build(
            config,
            RedundancyFilterChoice::Off,
            false,
            base_solver_config(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("overlap"));
    }

    #[test]
    fn one_sided_requires_flat_box() {
        let mut config = domino_config(2, 1, 1);
        config.z_dim = 2;
        config.one_sided = true;
        let err = Puzzle::build(
            config,
            RedundancyFilterChoice::Off,
            false,
            base_solver_config(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("oneSide") || err.to_string().contains("zDim"));
    }

    #[test]
    fn redundancy_filter_on_shape_with_multiple_copies_is_rejected() {
        let config = PuzzleConfig {
            x_dim: 2,
            y_dim: 2,
            z_dim: 1,
            one_sided: false,
            pieces: vec![
                PieceSpec {
                    name: "a".to_string(),
                    cells: vec![Point::new(0, 0, 0)],
                    mobility: Mobility::Mobile,
                },
                PieceSpec {
                    name: "b".to_string(),
                    cells: vec![Point::new(0, 0, 0)],
                    mobility: Mobility::Mobile,
                },
                PieceSpec {
                    name: "c".to_string(),
                    cells: vec![Point::new(0, 0, 0)],
                    mobility: Mobility::Mobile,
                },
                PieceSpec {
                    name: "d".to_string(),
                    cells: vec![Point::new(0, 0, 0)],
                    mobility: Mobility::Mobile,
                },
            ],
            // four monominoes fill a 2x2 box; all four are one shape so
            // remaining_copies == 4, not 1.
        };
        let err = Puzzle::build(
            config,
            RedundancyFilterChoice::Named("a".to_string()),
            false,
            base_solver_config(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("more than one"));
    }
}
