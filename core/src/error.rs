//! Error kinds. The core surfaces these up the call stack and does no
//! local recovery: a failed puzzle's whole `Puzzle` object is discarded.

use thiserror::Error;

/// A configuration mistake: bad thresholds, an unknown heuristic name, or a
/// malformed option string.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("threshold {name} = {value} is inconsistent with {other_name} = {other_value}")]
    InconsistentThreshold {
        name: &'static str,
        value: i64,
        other_name: &'static str,
        other_value: i64,
    },
    #[error("unknown ordering heuristic `{0}`")]
    UnknownHeuristic(String),
    #[error("malformed option `{option}`: {reason}")]
    MalformedOption { option: String, reason: String },
}

/// A mistake in the puzzle-definition text.
#[derive(Debug, Error)]
pub enum PuzzleDefError {
    #[error("{file}:{line}: syntax error: {reason}")]
    Syntax {
        file: String,
        line: u32,
        reason: String,
    },
    #[error("{file}:{line}: unknown directive `{directive}`")]
    UnknownDirective {
        file: String,
        line: u32,
        directive: String,
    },
    #[error("{file}:{line}: duplicate field `{field}`")]
    DuplicateField {
        file: String,
        line: u32,
        field: String,
    },
    #[error("{file}:{line}: coordinate {x},{y},{z} is out of bounds for {x_dim}x{y_dim}x{z_dim}")]
    OutOfBounds {
        file: String,
        line: u32,
        x: i32,
        y: i32,
        z: i32,
        x_dim: i32,
        y_dim: i32,
        z_dim: i32,
    },
    #[error("{file}:{line}: duplicate piece name `{name}`")]
    DuplicatePieceName {
        file: String,
        line: u32,
        name: String,
    },
    #[error("total piece volume {piece_volume} does not match box volume {box_volume}")]
    VolumeMismatch { piece_volume: u64, box_volume: u64 },
    #[error("stationary pieces `{first}` and `{second}` overlap at a shared cell")]
    StationaryOverlap { first: String, second: String },
    #[error("oneSide requires zDim=1, got zDim={z_dim}")]
    OneSidedRequiresFlatBox { z_dim: i32 },
    #[error("{file}: unexpected end of input inside a layout block")]
    UnexpectedEof { file: String },
}

/// A mistake requesting the rotational-redundancy image filter.
#[derive(Debug, Error)]
pub enum RedundancyError {
    #[error("redundancy filter piece `{0}` has more than one mobile copy")]
    MultipleCopies(String),
    #[error("redundancyFilter=auto found no mobile piece with a unique shape")]
    NoUniqueShape,
    #[error("puzzle has redundancy complexity; a redundancy filter was requested anyway")]
    RedundancyComplex,
    #[error("redundancy filter requested piece `{0}`, which this puzzle does not declare")]
    UnknownPiece(String),
}

/// The piece-id width chosen at compile time cannot represent every piece
/// in this puzzle.
#[derive(Debug, Error)]
#[error("piece id {id} exceeds the compile-time piece-id width ({width_bits} bits, max {max})")]
pub struct SizeLimitError {
    pub id: u64,
    pub width_bits: u32,
    pub max: u64,
}

/// The union of everything that can terminate processing of one puzzle.
#[derive(Debug, Error)]
pub enum PuzzleError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Definition(#[from] PuzzleDefError),
    #[error(transparent)]
    Redundancy(#[from] RedundancyError),
    #[error(transparent)]
    SizeLimit(#[from] SizeLimitError),
}

pub type Result<T> = std::result::Result<T, PuzzleError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_kinds_convert_into_puzzle_error() {
        let e: PuzzleError = RedundancyError::NoUniqueShape.into();
        assert!(matches!(e, PuzzleError::Redundancy(_)));
        assert!(e.to_string().contains("no mobile piece"));
    }

    #[test]
    fn definition_error_messages_carry_file_and_line() {
        let e = PuzzleDefError::UnknownDirective {
            file: "puzzle.txt".into(),
            line: 7,
            directive: "X".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("puzzle.txt:7"));
        assert!(msg.contains('X'));
    }
}
