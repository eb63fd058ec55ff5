//! The exact-cover engine: geometry, shapes, the grid, image generation,
//! the DLX matrix, the parity/volume monitors, symmetry analysis, ordering
//! heuristics, the solver driver, the solution filter, and puzzle assembly.

pub mod dlx;
pub mod error;
pub mod geometry;
pub mod grid;
pub mod heuristic;
pub mod image;
pub mod parity;
pub mod piece;
pub mod puzzle;
pub mod rng;
pub mod solution;
pub mod solver;
pub mod stats;
pub mod symmetry;
pub mod volume;

pub use error::{ConfigError, PuzzleDefError, PuzzleError, RedundancyError, Result, SizeLimitError};
pub use puzzle::{PieceSpec, Puzzle, PuzzleConfig};
pub use solver::{Solver, SolverConfig};
