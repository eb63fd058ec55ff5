//! Text front-ends: the puzzle-definition parser (`puzzle`) and the
//! CLI/config option-string parser (`config`). Both are hand-written
//! recursive-descent line parsers with no dependency on the core beyond the
//! data types they produce.

pub mod config;
pub mod puzzle;

pub use config::{
    parse_config_file, parse_options, parse_options_with_file, parse_order_spec, FormatSpec, ParsedConfig,
    SampleSpec,
};
pub use puzzle::parse_puzzles;
