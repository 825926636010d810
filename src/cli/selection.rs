//! Parsing of operator item selections like `1-3,5`.

use std::collections::BTreeSet;

use crate::error::{Error, Result};

/// Parse a selection into sorted, unique 1-based indices.
///
/// Accepts single numbers, inclusive ranges and comma-separated lists of
/// both. `all` selects everything; an empty input or `0` selects nothing.
pub fn parse_selection(input: &str, max: usize) -> Result<Vec<usize>> {
    let input = input.trim();
    if input.is_empty() || input == "0" {
        return Ok(Vec::new());
    }
    if input.eq_ignore_ascii_case("all") {
        return Ok((1..=max).collect());
    }

    let mut indices = BTreeSet::new();
    for part in input.split(',').map(str::trim) {
        if part.is_empty() {
            continue;
        }

        if let Some((start, end)) = part.split_once('-') {
            let start = parse_index(start)?;
            let end = parse_index(end)?;
            if start < 1 || start > end || end > max {
                return Err(Error::InvalidSelection(format!(
                    "Range {}-{} is invalid (1-{} available)",
                    start, end, max
                )));
            }
            indices.extend(start..=end);
        } else {
            let index = parse_index(part)?;
            if index < 1 || index > max {
                return Err(Error::InvalidSelection(format!(
                    "Index {} is out of range (1-{} available)",
                    index, max
                )));
            }
            indices.insert(index);
        }
    }

    Ok(indices.into_iter().collect())
}

fn parse_index(raw: &str) -> Result<usize> {
    let raw = raw.trim();
    raw.parse()
        .map_err(|_| Error::InvalidSelection(format!("'{}' is not a number", raw)))
}
