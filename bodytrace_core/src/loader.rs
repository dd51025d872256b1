//! Point file loader.
//!
//! The format is plain text with one `x,y,z` record per line, no header.
//! Blank lines are skipped and fields past the third are ignored. Any
//! malformed line fails the whole load: a partial static trace is never
//! handed out.

use crate::error::{TraceError, TraceResult};
use nalgebra::Point3;
use std::path::Path;
use tracing::debug;

/// Reads a point file from disk.
///
/// # Returns
/// * `Ok(points)` - Every non-blank line parsed, in file order
/// * `Err(TraceError::NotFound)` - The file is missing or unreadable
/// * `Err(TraceError::Parse)` - A line has fewer than 3 fields or a non-numeric field
pub fn load_points(path: impl AsRef<Path>) -> TraceResult<Vec<Point3<f64>>> {
    let path = path.as_ref();
    let bytes = std::fs::read(path)
        .map_err(|e| TraceError::not_found(format!("{} ({})", path.display(), e)))?;

    let source_name = path.display().to_string();
    let text = decode_utf8(&bytes, &source_name)?;
    let points = parse_points(text, &source_name)?;
    debug!("Loaded {} trace points from {}", points.len(), path.display());
    Ok(points)
}

/// Decodes file contents. Bytes that are not UTF-8 are a parse error on the
/// line that holds them, not a missing file.
fn decode_utf8<'a>(bytes: &'a [u8], source_name: &str) -> TraceResult<&'a str> {
    std::str::from_utf8(bytes).map_err(|e| {
        let line = bytes[..e.valid_up_to()]
            .iter()
            .filter(|&&b| b == b'\n')
            .count()
            + 1;
        TraceError::parse(source_name, line, "not valid UTF-8")
    })
}

/// Parses point records from text. `source_name` only labels errors.
///
/// A leading byte order mark is skipped.
pub fn parse_points(text: &str, source_name: &str) -> TraceResult<Vec<Point3<f64>>> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(idx, line)| parse_record(line, source_name, idx + 1))
        .collect()
}

fn parse_record(line: &str, source_name: &str, line_no: usize) -> TraceResult<Point3<f64>> {
    let fields: Vec<&str> = line.trim().split(',').collect();
    if fields.len() < 3 {
        return Err(TraceError::parse(
            source_name,
            line_no,
            format!("expected 3 fields, found {}", fields.len()),
        ));
    }

    let mut coords = [0.0f64; 3];
    for (axis, field) in fields.iter().take(3).enumerate() {
        let field = field.trim();
        coords[axis] = field.parse::<f64>().map_err(|_| {
            TraceError::parse(source_name, line_no, format!("'{}' is not a number", field))
        })?;
    }

    Ok(Point3::new(coords[0], coords[1], coords[2]))
}
