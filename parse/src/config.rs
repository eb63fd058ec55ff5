//! CLI/config option-string parser: turns `key=value` tokens (from argv or
//! a config file) into a [`SolverConfig`] plus the handful of options that
//! live above the solver (redundancy filter choice, sampling, output
//! format, logging verbosity).

use polycube_core::error::ConfigError;
use polycube_core::heuristic::{Heuristic, HeuristicTable};
use polycube_core::image::RedundancyFilterChoice;
use polycube_core::solver::{FilterThreshold, SolverConfig};

/// `sample=T,R,S`.
#[derive(Clone, Copy, Debug)]
pub struct SampleSpec {
    pub trials: u32,
    pub range: u32,
    pub seed: u64,
}

/// The two independent single-character codes making up `format=`.
/// Left as raw characters here (not validated against a closed set of
/// renderer modes) since that validation is the output formatter's concern,
/// not the option parser's — `parse` has no dependency on `fmt`.
#[derive(Clone, Copy, Debug)]
pub struct FormatSpec {
    pub overall: char,
    pub piece: char,
}

#[derive(Clone)]
pub struct ParsedConfig {
    pub solver: SolverConfig,
    pub redundancy: RedundancyFilterChoice,
    pub redundancy_filter_first: bool,
    pub unique: bool,
    pub sample: Option<SampleSpec>,
    pub format: FormatSpec,
    pub info: bool,
    pub quiet: bool,
}

struct Builder {
    bruijn: u32,
    emch: u32,
    mch: u32,
    fit_filter: FilterThreshold,
    parity_filter: FilterThreshold,
    volume_filter: FilterThreshold,
    parity_backtrack: bool,
    volume_backtrack: u32,
    goal: u32,
    trace: i32,
    heuristics: Option<HeuristicTable>,
    redundancy: RedundancyFilterChoice,
    redundancy_filter_first: bool,
    unique: bool,
    sample: Option<SampleSpec>,
    format: FormatSpec,
    info: bool,
    quiet: bool,
}

impl Default for Builder {
    fn default() -> Builder {
        Builder {
            bruijn: 0,
            emch: 0,
            mch: 0,
            fit_filter: FilterThreshold::Off,
            parity_filter: FilterThreshold::Off,
            volume_filter: FilterThreshold::Off,
            parity_backtrack: false,
            volume_backtrack: 0,
            goal: 0,
            trace: 0,
            heuristics: None,
            redundancy: RedundancyFilterChoice::Off,
            redundancy_filter_first: false,
            unique: false,
            sample: None,
            format: FormatSpec { overall: 'b', piece: 'l' },
            info: false,
            quiet: false,
        }
    }
}

fn malformed(option: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::MalformedOption { option: option.to_string(), reason: reason.into() }
}

fn parse_u32(option: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse().map_err(|_| malformed(option, format!("expected a non-negative integer, got `{value}`")))
}

fn parse_i32(option: &str, value: &str) -> Result<i32, ConfigError> {
    value.parse().map_err(|_| malformed(option, format!("expected an integer, got `{value}`")))
}

fn parse_u64(option: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse().map_err(|_| malformed(option, format!("expected a non-negative integer, got `{value}`")))
}

fn parse_bool(option: &str, value: Option<&str>) -> Result<bool, ConfigError> {
    match value {
        None | Some("true") | Some("1") => Ok(true),
        Some("false") | Some("0") => Ok(false),
        Some(other) => Err(malformed(option, format!("expected a boolean, got `{other}`"))),
    }
}

fn parse_threshold(option: &str, value: &str) -> Result<FilterThreshold, ConfigError> {
    match value.parse::<i64>() {
        Ok(0) => Ok(FilterThreshold::Off),
        Ok(-1) => Ok(FilterThreshold::Once),
        Ok(n) if n > 0 => Ok(FilterThreshold::At(n as u32)),
        _ => Err(malformed(option, format!("expected N, -1, or 0, got `{value}`"))),
    }
}

fn apply_option(builder: &mut Builder, key: &str, value: Option<&str>) -> Result<(), ConfigError> {
    fn need<'a>(v: Option<&'a str>, key: &str) -> Result<&'a str, ConfigError> {
        v.ok_or_else(|| malformed(key, "this option requires a value"))
    }
    match key {
        "bruijn" => builder.bruijn = parse_u32(key, need(value, key)?)?,
        "emch" => builder.emch = parse_u32(key, need(value, key)?)?,
        "mch" => builder.mch = parse_u32(key, need(value, key)?)?,
        "fitFilter" => builder.fit_filter = parse_threshold(key, need(value, key)?)?,
        "parityFilter" => builder.parity_filter = parse_threshold(key, need(value, key)?)?,
        "volumeFilter" => builder.volume_filter = parse_threshold(key, need(value, key)?)?,
        "parityBacktrack" => builder.parity_backtrack = parse_bool(key, value)?,
        "volumeBacktrack" => builder.volume_backtrack = parse_u32(key, need(value, key)?)?,
        "goal" => builder.goal = parse_u32(key, need(value, key)?)?,
        "trace" => builder.trace = parse_i32(key, need(value, key)?)?,
        "redundancyFilter" => {
            let v = need(value, key)?;
            builder.redundancy = match v {
                "off" => RedundancyFilterChoice::Off,
                "auto" => RedundancyFilterChoice::Auto,
                name => RedundancyFilterChoice::Named(name.to_string()),
            };
        }
        "redundancyFilterFirst" => builder.redundancy_filter_first = parse_bool(key, value)?,
        "unique" => builder.unique = parse_bool(key, value)?,
        "info" => builder.info = parse_bool(key, value)?,
        "quiet" => builder.quiet = parse_bool(key, value)?,
        "sample" => builder.sample = Some(parse_sample(key, need(value, key)?)?),
        "order" => builder.heuristics = Some(parse_order_spec(need(value, key)?)?),
        "format" => builder.format = parse_format_spec(key, need(value, key)?)?,
        other => return Err(malformed(other, "unknown option")),
    }
    Ok(())
}

fn parse_sample(key: &str, value: &str) -> Result<SampleSpec, ConfigError> {
    let parts: Vec<&str> = value.split(',').collect();
    let [trials, range, seed] = parts.as_slice() else {
        return Err(malformed(key, "expected T,R,S"));
    };
    Ok(SampleSpec {
        trials: parse_u32(key, trials)?,
        range: parse_u32(key, range)?,
        seed: parse_u64(key, seed)?,
    })
}

fn parse_format_spec(key: &str, value: &str) -> Result<FormatSpec, ConfigError> {
    let chars: Vec<char> = value.chars().collect();
    match chars.as_slice() {
        [overall, piece] => Ok(FormatSpec { overall: *overall, piece: *piece }),
        _ => Err(malformed(key, "expected exactly two characters")),
    }
}

/// `"<threshold>:<heuristic>(args), <threshold>:<heuristic>(args), …"`,
/// heuristic names `fit` (no args), `linear(a,b,c)`,
/// `angular(theta0,xc,yc,reverse)`, `radial(xc,yc,zc)`. `fit` at threshold 0
/// is assumed if the caller's table doesn't already cover it.
pub fn parse_order_spec(spec: &str) -> Result<HeuristicTable, ConfigError> {
    let mut entries = Vec::new();
    for entry in spec.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let (threshold_str, rest) = entry
            .split_once(':')
            .ok_or_else(|| malformed("order", format!("missing `threshold:` in `{entry}`")))?;
        let threshold = parse_u32("order", threshold_str.trim())?;

        let rest = rest.trim();
        let (name, args_str) = match rest.split_once('(') {
            Some((name, rest)) => {
                let args_str = rest
                    .strip_suffix(')')
                    .ok_or_else(|| malformed("order", format!("unbalanced parentheses in `{entry}`")))?;
                (name.trim(), args_str)
            }
            None => (rest, ""),
        };
        let args: Vec<f64> = if args_str.trim().is_empty() {
            Vec::new()
        } else {
            args_str
                .split(',')
                .map(|a| {
                    a.trim()
                        .parse::<f64>()
                        .map_err(|_| malformed("order", format!("bad numeric argument `{a}`")))
                })
                .collect::<Result<_, _>>()?
        };

        let heuristic = match (name, args.as_slice()) {
            ("fit", []) => Heuristic::Fit,
            ("linear", &[a, b, c]) => Heuristic::Linear { a, b, c },
            ("angular", &[theta0, xc, yc]) => {
                Heuristic::Angular { theta0, xc, yc, reverse: false }
            }
            ("angular", &[theta0, xc, yc, reverse]) => {
                Heuristic::Angular { theta0, xc, yc, reverse: reverse != 0.0 }
            }
            ("radial", &[xc, yc, zc]) => Heuristic::Radial { xc, yc, zc },
            (other, _) => {
                return Err(malformed("order", format!("unknown heuristic `{other}` or wrong argument count")))
            }
        };
        entries.push((threshold, heuristic));
    }

    if entries.is_empty() {
        return Err(malformed("order", "empty order spec"));
    }
    if !entries.iter().any(|(t, _)| *t == 0) {
        entries.push((0, Heuristic::Fit));
    }
    Ok(HeuristicTable::new(entries))
}

fn finalize(builder: Builder) -> Result<ParsedConfig, ConfigError> {
    let emch = builder.emch.max(builder.bruijn);
    let mch = builder.mch.max(emch);

    let mut solver = SolverConfig::new(builder.heuristics.unwrap_or_else(HeuristicTable::default_table));
    solver.bruijn = builder.bruijn;
    solver.emch = emch;
    solver.mch = mch;
    solver.fit_filter = builder.fit_filter;
    solver.parity_filter = builder.parity_filter;
    solver.volume_filter = builder.volume_filter;
    solver.parity_backtrack = builder.parity_backtrack;
    solver.volume_backtrack = builder.volume_backtrack;
    solver.goal = builder.goal;
    solver.trace = builder.trace;

    Ok(ParsedConfig {
        solver,
        redundancy: builder.redundancy,
        redundancy_filter_first: builder.redundancy_filter_first,
        unique: builder.unique,
        sample: builder.sample,
        format: builder.format,
        info: builder.info,
        quiet: builder.quiet,
    })
}

fn apply_tokens<'a>(builder: &mut Builder, tokens: impl Iterator<Item = &'a str>) -> Result<(), ConfigError> {
    for token in tokens {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }
        let (key, value) = match token.split_once('=') {
            Some((k, v)) => (k, Some(v)),
            None => (token, None),
        };
        apply_option(builder, key, value)?;
    }
    Ok(())
}

/// Parse a slice of CLI-style tokens, each either `key=value` or a bare
/// boolean flag (`key`, meaning `key=true`).
pub fn parse_options<'a, I: IntoIterator<Item = &'a str>>(tokens: I) -> Result<ParsedConfig, ConfigError> {
    let mut builder = Builder::default();
    apply_tokens(&mut builder, tokens.into_iter())?;
    finalize(builder)
}

/// Split a config file's contents into the same token stream [`parse_options`]
/// consumes: `key=value` pairs separated by newlines or colons, blank lines
/// and `#`-comments stripped. Exposed so a caller (e.g. the CLI) can splice
/// file-sourced tokens and command-line tokens into one pass, with later
/// tokens overriding earlier ones — matching the original's rule that
/// command-line options take precedence over a `conf=` file.
pub fn tokenize_config_file(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    for raw_line in text.lines() {
        let line = match raw_line.find('#') {
            Some(idx) => &raw_line[..idx],
            None => raw_line,
        };
        for token in line.split(':') {
            let token = token.trim();
            if !token.is_empty() {
                tokens.push(token.to_string());
            }
        }
    }
    tokens
}

/// Parse a config file: `key=value` pairs separated by newlines or colons,
/// blank lines and `#`-comments ignored. Matches the original's `FileConfig`
/// (same grammar as the CLI tokens, read from a file instead of argv).
pub fn parse_config_file(text: &str) -> Result<ParsedConfig, ConfigError> {
    let mut builder = Builder::default();
    let tokens = tokenize_config_file(text);
    apply_tokens(&mut builder, tokens.iter().map(String::as_str))?;
    finalize(builder)
}

/// Parse file-sourced tokens followed by command-line tokens in one pass, so
/// a later (command-line) option overrides an earlier (file) one for the
/// same key.
pub fn parse_options_with_file<'a, I: IntoIterator<Item = &'a str>>(
    file_text: Option<&str>,
    cli_tokens: I,
) -> Result<ParsedConfig, ConfigError> {
    let mut builder = Builder::default();
    if let Some(text) = file_text {
        let tokens = tokenize_config_file(text);
        apply_tokens(&mut builder, tokens.iter().map(String::as_str))?;
    }
    apply_tokens(&mut builder, cli_tokens.into_iter())?;
    finalize(builder)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_flag_means_true() {
        let parsed = parse_options(["unique"]).unwrap();
        assert!(parsed.unique);
    }

    #[test]
    fn filter_threshold_maps_negative_one_to_once() {
        let parsed = parse_options(["fitFilter=-1"]).unwrap();
        assert!(matches!(parsed.solver.fit_filter, FilterThreshold::Once));
    }

    #[test]
    fn mch_is_clamped_above_emch_and_bruijn() {
        let parsed = parse_options(["bruijn=10", "mch=3"]).unwrap();
        assert_eq!(parsed.solver.bruijn, 10);
        assert_eq!(parsed.solver.emch, 10);
        assert_eq!(parsed.solver.mch, 10);
    }

    #[test]
    fn sample_spec_parses_three_fields() {
        let parsed = parse_options(["sample=10,30,42"]).unwrap();
        let sample = parsed.sample.unwrap();
        assert_eq!((sample.trials, sample.range, sample.seed), (10, 30, 42));
    }

    #[test]
    fn redundancy_filter_named_piece() {
        let parsed = parse_options(["redundancyFilter=cross"]).unwrap();
        assert!(matches!(parsed.redundancy, RedundancyFilterChoice::Named(n) if n == "cross"));
    }

    #[test]
    fn order_spec_builds_piecewise_table() {
        let table = parse_order_spec("0:fit, 10:radial(0,0,0)").unwrap();
        assert!(matches!(table.active(0), Heuristic::Fit));
        assert!(matches!(table.active(10), Heuristic::Radial { .. }));
    }

    #[test]
    fn order_spec_without_zero_gets_implicit_fit() {
        let table = parse_order_spec("5:radial(1,1,1)").unwrap();
        assert!(matches!(table.active(0), Heuristic::Fit));
        assert!(matches!(table.active(5), Heuristic::Radial { .. }));
    }

    #[test]
    fn format_spec_requires_two_characters() {
        let err = parse_options(["format=xyz"]).unwrap_err();
        assert!(matches!(err, ConfigError::MalformedOption { .. }));
    }

    #[test]
    fn config_file_accepts_colon_separated_fields() {
        let parsed = parse_config_file("goal=2:unique=true\n# comment\nquiet\n").unwrap();
        assert_eq!(parsed.solver.goal, 2);
        assert!(parsed.unique);
        assert!(parsed.quiet);
    }

    #[test]
    fn unknown_option_is_rejected() {
        let err = parse_options(["notAnOption=1"]).unwrap_err();
        assert!(matches!(err, ConfigError::MalformedOption { .. }));
    }
}
