//! Puzzle-definition text parser: `D`/`C`/`L`/`~L`/`~D` records, one logical
//! line per record, `#` introduces a line comment.

use std::collections::{HashMap, HashSet};

use polycube_core::error::PuzzleDefError;
use polycube_core::geometry::Point;
use polycube_core::piece::Mobility;
use polycube_core::puzzle::{PieceSpec, PuzzleConfig};

struct InProgress {
    x_dim: i32,
    y_dim: i32,
    z_dim: i32,
    one_sided: bool,
    cells_by_name: HashMap<String, (Vec<Point>, Mobility)>,
    order: Vec<String>,
}

/// Parse every `D ... ~D` block in `text`, in order. `file` is used only for
/// error messages.
pub fn parse_puzzles(file: &str, text: &str) -> Result<Vec<PuzzleConfig>, PuzzleDefError> {
    let mut puzzles = Vec::new();
    let mut current: Option<InProgress> = None;
    let mut layout_stationary: Option<HashSet<String>> = None;
    let mut in_layout = false;
    let mut layout_rows: Vec<String> = Vec::new();

    for (zero_based, raw) in text.lines().enumerate() {
        let line_no = zero_based as u32 + 1;

        if in_layout {
            if raw.trim_start().starts_with("~L") {
                in_layout = false;
                let puzzle = current
                    .as_mut()
                    .expect("in_layout is only set while a D block is open");
                apply_layout(puzzle, &layout_rows, layout_stationary.take().unwrap(), file, line_no)?;
                layout_rows.clear();
                continue;
            }
            layout_rows.push(raw.to_string());
            continue;
        }

        let line = strip_comment(raw).trim();
        if line.is_empty() {
            continue;
        }

        if let Some(rest) = line.strip_prefix("D:") {
            if current.is_some() {
                return Err(syntax(file, line_no, "nested D record without a closing ~D"));
            }
            current = Some(parse_d_record(rest, file, line_no)?);
            continue;
        }
        if line == "~D" {
            match current.take() {
                Some(puzzle) => puzzles.push(finish_puzzle(puzzle)),
                None => return Err(syntax(file, line_no, "~D without a matching D")),
            }
            continue;
        }
        if let Some(rest) = line.strip_prefix("C:") {
            let puzzle = current
                .as_mut()
                .ok_or_else(|| syntax(file, line_no, "C record outside a D block"))?;
            parse_c_record(rest, puzzle, file, line_no)?;
            continue;
        }
        if line == "L" || line.starts_with("L:") {
            if current.is_none() {
                return Err(syntax(file, line_no, "L record outside a D block"));
            }
            layout_stationary = Some(parse_l_record(line, file, line_no)?);
            in_layout = true;
            continue;
        }

        let directive = line.split(':').next().unwrap_or(line).to_string();
        return Err(PuzzleDefError::UnknownDirective { file: file.to_string(), line: line_no, directive });
    }

    if in_layout || current.is_some() {
        return Err(PuzzleDefError::UnexpectedEof { file: file.to_string() });
    }

    Ok(puzzles)
}

fn syntax(file: &str, line: u32, reason: &str) -> PuzzleDefError {
    PuzzleDefError::Syntax { file: file.to_string(), line, reason: reason.to_string() }
}

fn strip_comment(line: &str) -> &str {
    match line.find('#') {
        Some(idx) => &line[..idx],
        None => line,
    }
}

fn split_kv(field: &str) -> (&str, Option<&str>) {
    match field.split_once('=') {
        Some((k, v)) => (k, Some(v)),
        None => (field, None),
    }
}

fn parse_int(token: &str, file: &str, line: u32) -> Result<i32, PuzzleDefError> {
    token
        .trim()
        .parse::<i32>()
        .map_err(|_| syntax(file, line, &format!("expected an integer, found `{token}`")))
}

fn parse_d_record(rest: &str, file: &str, line: u32) -> Result<InProgress, PuzzleDefError> {
    let mut x_dim = None;
    let mut y_dim = None;
    let mut z_dim = None;
    let mut one_sided = false;
    let mut seen = HashSet::new();

    for field in rest.split(':').filter(|f| !f.is_empty()) {
        let (key, value) = split_kv(field);
        if !seen.insert(key.to_string()) {
            return Err(PuzzleDefError::DuplicateField { file: file.to_string(), line, field: key.to_string() });
        }
        match key {
            "xDim" => x_dim = Some(parse_int(value.unwrap_or(""), file, line)?),
            "yDim" => y_dim = Some(parse_int(value.unwrap_or(""), file, line)?),
            "zDim" => z_dim = Some(parse_int(value.unwrap_or(""), file, line)?),
            "oneSide" => one_sided = value.map(|v| v != "false").unwrap_or(true),
            other => {
                return Err(PuzzleDefError::UnknownDirective {
                    file: file.to_string(),
                    line,
                    directive: other.to_string(),
                })
            }
        }
    }

    let x_dim = x_dim.ok_or_else(|| syntax(file, line, "D record is missing xDim"))?;
    let y_dim = y_dim.ok_or_else(|| syntax(file, line, "D record is missing yDim"))?;
    let z_dim = z_dim.ok_or_else(|| syntax(file, line, "D record is missing zDim"))?;
    if x_dim < 1 || y_dim < 1 || z_dim < 1 {
        return Err(syntax(file, line, "xDim, yDim and zDim must all be >= 1"));
    }

    Ok(InProgress {
        x_dim,
        y_dim,
        z_dim,
        one_sided,
        cells_by_name: HashMap::new(),
        order: Vec::new(),
    })
}

fn check_bounds(p: Point, puzzle: &InProgress, file: &str, line: u32) -> Result<(), PuzzleDefError> {
    if p.x < 0
        || p.x >= puzzle.x_dim
        || p.y < 0
        || p.y >= puzzle.y_dim
        || p.z < 0
        || p.z >= puzzle.z_dim
    {
        return Err(PuzzleDefError::OutOfBounds {
            file: file.to_string(),
            line,
            x: p.x,
            y: p.y,
            z: p.z,
            x_dim: puzzle.x_dim,
            y_dim: puzzle.y_dim,
            z_dim: puzzle.z_dim,
        });
    }
    Ok(())
}

fn parse_c_record(
    rest: &str,
    puzzle: &mut InProgress,
    file: &str,
    line: u32,
) -> Result<(), PuzzleDefError> {
    let mut name = None;
    let mut mobility_field = None;
    let mut layout_field = None;

    for field in rest.split(':').filter(|f| !f.is_empty()) {
        let (key, value) = split_kv(field);
        match key {
            "name" => name = value,
            "type" => mobility_field = value,
            "layout" => layout_field = value,
            other => {
                return Err(PuzzleDefError::UnknownDirective {
                    file: file.to_string(),
                    line,
                    directive: other.to_string(),
                })
            }
        }
    }

    let name = name.ok_or_else(|| syntax(file, line, "C record is missing name"))?;
    let mobility = match mobility_field {
        Some("M") => Mobility::Mobile,
        Some("S") => Mobility::Stationary,
        _ => return Err(syntax(file, line, "C record's type must be `M` or `S`")),
    };
    let layout_field = layout_field.ok_or_else(|| syntax(file, line, "C record is missing layout"))?;

    if puzzle.cells_by_name.contains_key(name) {
        return Err(PuzzleDefError::DuplicatePieceName {
            file: file.to_string(),
            line,
            name: name.to_string(),
        });
    }

    let mut cells = Vec::new();
    for triple in layout_field.split(',') {
        let coords: Vec<i32> = triple
            .split_whitespace()
            .map(|t| parse_int(t, file, line))
            .collect::<Result<_, _>>()?;
        if coords.len() != 3 {
            return Err(syntax(file, line, "each layout coordinate needs exactly 3 components"));
        }
        let p = Point::new(coords[0], coords[1], coords[2]);
        check_bounds(p, puzzle, file, line)?;
        cells.push(p);
    }

    puzzle.order.push(name.to_string());
    puzzle.cells_by_name.insert(name.to_string(), (cells, mobility));
    Ok(())
}

fn parse_l_record(line: &str, file: &str, line_no: u32) -> Result<HashSet<String>, PuzzleDefError> {
    let mut stationary = HashSet::new();
    if let Some(rest) = line.strip_prefix("L:") {
        for field in rest.split(':').filter(|f| !f.is_empty()) {
            let (key, value) = split_kv(field);
            match key {
                "stationary" => {
                    if let Some(v) = value {
                        stationary.extend(v.split_whitespace().map(|s| s.to_string()));
                    }
                }
                other => {
                    return Err(PuzzleDefError::UnknownDirective {
                        file: file.to_string(),
                        line: line_no,
                        directive: other.to_string(),
                    })
                }
            }
        }
    }
    Ok(stationary)
}

/// `rows` are the raw lines between `L` and `~L`, top row (y = yDim-1) first.
fn apply_layout(
    puzzle: &mut InProgress,
    rows: &[String],
    stationary: HashSet<String>,
    file: &str,
    end_line: u32,
) -> Result<(), PuzzleDefError> {
    if rows.len() as i32 != puzzle.y_dim {
        return Err(syntax(
            file,
            end_line,
            &format!("layout block has {} rows, expected yDim={}", rows.len(), puzzle.y_dim),
        ));
    }

    for (row_idx, raw_row) in rows.iter().enumerate() {
        let row = strip_comment(raw_row).trim();
        let y = puzzle.y_dim - 1 - row_idx as i32;
        let layers: Vec<&str> = row.split(',').collect();
        if layers.len() as i32 != puzzle.z_dim {
            return Err(syntax(
                file,
                end_line,
                &format!("layout row has {} z-layers, expected zDim={}", layers.len(), puzzle.z_dim),
            ));
        }
        for (z, layer) in layers.iter().enumerate() {
            let tokens: Vec<&str> = layer.split_whitespace().collect();
            if tokens.len() as i32 != puzzle.x_dim {
                return Err(syntax(
                    file,
                    end_line,
                    &format!("layout z-layer has {} cells, expected xDim={}", tokens.len(), puzzle.x_dim),
                ));
            }
            for (x, &token) in tokens.iter().enumerate() {
                if token == "." {
                    continue;
                }
                let p = Point::new(x as i32, y, z as i32);
                if !puzzle.cells_by_name.contains_key(token) {
                    let mobility = if stationary.contains(token) {
                        Mobility::Stationary
                    } else {
                        Mobility::Mobile
                    };
                    puzzle.cells_by_name.insert(token.to_string(), (Vec::new(), mobility));
                    puzzle.order.push(token.to_string());
                }
                puzzle.cells_by_name.get_mut(token).unwrap().0.push(p);
            }
        }
    }
    Ok(())
}

fn finish_puzzle(puzzle: InProgress) -> PuzzleConfig {
    let pieces = puzzle
        .order
        .iter()
        .map(|name| {
            let (cells, mobility) = puzzle.cells_by_name[name].clone();
            PieceSpec { name: name.clone(), cells, mobility }
        })
        .collect();
    PuzzleConfig {
        x_dim: puzzle.x_dim,
        y_dim: puzzle.y_dim,
        z_dim: puzzle.z_dim,
        one_sided: puzzle.one_sided,
        pieces,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_explicit_coordinate_pieces() {
        let text = "\
D:xDim=2:yDim=1:zDim=1
C:name=a:type=M:layout=0 0 0
C:name=b:type=M:layout=1 0 0
~D
";
        let puzzles = parse_puzzles("t.txt", text).unwrap();
        assert_eq!(puzzles.len(), 1);
        assert_eq!(puzzles[0].pieces.len(), 2);
        assert_eq!(puzzles[0].pieces[0].name, "a");
    }

    #[test]
    fn parses_visual_layout_block_top_row_first() {
        let text = "\
D:xDim=2:yDim=2:zDim=1
L
a a
b .
~L
~D
";
        let puzzles = parse_puzzles("t.txt", text).unwrap();
        let a = puzzles[0].pieces.iter().find(|p| p.name == "a").unwrap();
        let b = puzzles[0].pieces.iter().find(|p| p.name == "b").unwrap();
        // "a a" is the top row, i.e. y = yDim-1 = 1.
        assert_eq!(a.cells.len(), 2);
        assert!(a.cells.iter().all(|c| c.y == 1));
        assert_eq!(b.cells, vec![Point::new(0, 0, 0)]);
    }

    #[test]
    fn layout_stationary_list_marks_mobility() {
        let text = "\
D:xDim=2:yDim=1:zDim=1
L:stationary=wall
wall .
~L
~D
";
        let puzzles = parse_puzzles("t.txt", text).unwrap();
        let wall = puzzles[0].pieces.iter().find(|p| p.name == "wall").unwrap();
        assert_eq!(wall.mobility, Mobility::Stationary);
    }

    #[test]
    fn duplicate_piece_name_is_rejected() {
        let text = "\
D:xDim=2:yDim=1:zDim=1
C:name=a:type=M:layout=0 0 0
C:name=a:type=M:layout=1 0 0
~D
";
        let err = parse_puzzles("t.txt", text).unwrap_err();
        assert!(matches!(err, PuzzleDefError::DuplicatePieceName { .. }));
    }

    #[test]
    fn out_of_bounds_coordinate_is_rejected() {
        let text = "\
D:xDim=1:yDim=1:zDim=1
C:name=a:type=M:layout=5 0 0
~D
";
        let err = parse_puzzles("t.txt", text).unwrap_err();
        assert!(matches!(err, PuzzleDefError::OutOfBounds { .. }));
    }

    #[test]
    fn unterminated_layout_block_is_eof_error() {
        let text = "\
D:xDim=1:yDim=1:zDim=1
L
a
";
        let err = parse_puzzles("t.txt", text).unwrap_err();
        assert!(matches!(err, PuzzleDefError::UnexpectedEof { .. }));
    }

    #[test]
    fn comments_and_blank_lines_are_ignored() {
        let text = "\
# a comment
D:xDim=1:yDim=1:zDim=1  # trailing comment

C:name=a:type=M:layout=0 0 0
~D
";
        let puzzles = parse_puzzles("t.txt", text).unwrap();
        assert_eq!(puzzles.len(), 1);
    }
}
