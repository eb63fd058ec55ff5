//! Composition root: argument handling, wiring the parser crate into the
//! core solver and out through the formatter, signal installation, and exit
//! codes.

use std::fs;
use std::io::{self, Read as _};
use std::path::PathBuf;

use anyhow::{Context, Result};

use polycube_core::puzzle::Puzzle;
use polycube_core::solution::SolutionFilter;
use polycube_core::stats;
use polycube_fmt::{render_solution, render_stats, OutputFormat, OverallFormat, PieceFormat};
use polycube_parse::{parse_options_with_file, parse_puzzles, ParsedConfig};

const BARE_FLAGS: &[&str] =
    &["parityBacktrack", "redundancyFilterFirst", "unique", "info", "quiet"];

fn is_option_token(token: &str) -> bool {
    token.contains('=') || BARE_FLAGS.contains(&token)
}

fn main() {
    env_logger::init();
    if let Err(err) = run() {
        eprintln!("Exception: {err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    install_signal_handlers();

    let mut option_tokens: Vec<String> = Vec::new();
    let mut input_files: Vec<PathBuf> = Vec::new();
    let mut conf_path: Option<PathBuf> = None;

    for arg in std::env::args().skip(1) {
        if let Some(path) = arg.strip_prefix("conf=") {
            conf_path = Some(PathBuf::from(path));
        } else if is_option_token(&arg) {
            option_tokens.push(arg);
        } else {
            input_files.push(PathBuf::from(arg));
        }
    }

    let conf_text = match &conf_path {
        Some(path) => Some(
            fs::read_to_string(path).with_context(|| format!("reading config file {}", path.display()))?,
        ),
        None => None,
    };
    let cli_tokens: Vec<&str> = option_tokens.iter().map(String::as_str).collect();
    let config = parse_options_with_file(conf_text.as_deref(), cli_tokens)
        .context("parsing configuration options")?;

    let format = format_from_spec(&config);

    if config.info {
        println!("# Solver configuration settings");
        println!("bruijn={}", config.solver.bruijn);
        println!("emch={}", config.solver.emch);
        println!("mch={}", config.solver.mch);
        println!("goal={}", config.solver.goal);
        println!("unique={}", config.unique);
    }

    if input_files.is_empty() {
        let mut text = String::new();
        io::stdin()
            .read_to_string(&mut text)
            .context("reading puzzle definitions from stdin")?;
        solve_stream("stdin", &text, &config, format)?;
    } else {
        for path in &input_files {
            if config.info {
                println!("\n# Puzzle file\nPUZZLE_FILE={}", path.display());
            }
            let text = fs::read_to_string(path)
                .with_context(|| format!("opening puzzle file {}", path.display()))?;
            solve_stream(&path.display().to_string(), &text, &config, format)?;
        }
    }

    Ok(())
}

fn format_from_spec(config: &ParsedConfig) -> OutputFormat {
    let overall = match config.format.overall {
        'b' => OverallFormat::Brief,
        'f' => OverallFormat::Full,
        's' => OverallFormat::SubPuzzle,
        _ => OverallFormat::Brief,
    };
    let piece = match config.format.piece {
        'l' => PieceFormat::Layout,
        'c' => PieceFormat::Coordinate,
        _ => PieceFormat::Layout,
    };
    OutputFormat { overall, piece }
}

fn solve_stream(file_name: &str, text: &str, config: &ParsedConfig, format: OutputFormat) -> Result<()> {
    let puzzle_configs = parse_puzzles(file_name, text).context("parsing puzzle definitions")?;

    for puzzle_config in puzzle_configs {
        let mut puzzle = Puzzle::build(
            puzzle_config,
            config.redundancy.clone(),
            config.redundancy_filter_first,
            config.solver.clone(),
        )
        .context("assembling puzzle")?;

        match config.sample {
            Some(sample) => puzzle.solver_mut().solve_monte_carlo(sample.trials, sample.range, sample.seed),
            None => puzzle.solver_mut().solve(),
        }

        let mut filter = SolutionFilter::new();
        let placements: Vec<_> = puzzle.solver().solutions.clone();
        for placement in &placements {
            let outcome = if config.unique {
                Some(puzzle.accept_solution(&mut filter, placement))
            } else {
                None
            };
            if matches!(outcome, Some(polycube_core::solution::SolutionOutcome::Redundant)) {
                continue;
            }
            let state = puzzle.state_vector(placement);
            print!("{}", render_solution(&puzzle, &state, format));
        }

        if !config.quiet {
            print!("{}", render_stats(&puzzle.solver().stats));
        }
    }

    Ok(())
}

#[cfg(unix)]
fn install_signal_handlers() {
    use signal_hook::consts::{SIGUSR1, SIGUSR2};

    let stats_result = unsafe {
        signal_hook::low_level::register(SIGUSR1, || {
            stats::PRINT_STATS_REQUESTED.store(true, std::sync::atomic::Ordering::Relaxed);
        })
    };
    let trace_result = unsafe {
        signal_hook::low_level::register(SIGUSR2, || {
            stats::PRINT_TRACE_REQUESTED.store(true, std::sync::atomic::Ordering::Relaxed);
        })
    };
    if stats_result.is_err() || trace_result.is_err() {
        log::warn!("failed to install signal handlers; running without them");
    }
}

#[cfg(not(unix))]
fn install_signal_handlers() {}
