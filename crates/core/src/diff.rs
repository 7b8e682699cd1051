//! Reconstruct the updated file from the previous file and a [`ParsedDiff`].

use std::collections::BTreeSet;

use crate::error::{TokenizeError, TokenizeResult};
use crate::record::ParsedDiff;

/// Apply a single line-level edit to `previous_text`.
///
/// Lines are split on `\n` and rejoined with `\n`, so the updated text has
/// `previous - removed + inserted` lines. Any location outside the previous
/// file rejects the whole edit.
pub fn apply_diff(diff: &ParsedDiff, previous_text: &str) -> TokenizeResult<String> {
    let mut lines: Vec<&str> = previous_text.split('\n').collect();
    let line_count = lines.len();

    match diff {
        ParsedDiff::Add(add) => {
            let at = usize::try_from(add.previous_source_location)
                .ok()
                .filter(|at| *at <= line_count)
                .ok_or_else(|| {
                    out_of_range(format!(
                        "ADD after line {} in a file of {line_count} lines",
                        add.previous_source_location
                    ))
                })?;
            let target = clean_target_lines(add.target_lines.as_deref());
            lines.splice(at..at, target);
        }
        ParsedDiff::Remove(remove) => {
            let start = remove.source_location_start;
            let end = remove.source_location_end;
            if start < 1 || end < start || end as usize > line_count {
                return Err(out_of_range(format!(
                    "REMOVE {start}..={end} in a file of {line_count} lines"
                )));
            }
            lines.drain(start as usize - 1..end as usize);
        }
        ParsedDiff::Replace(replace) => {
            let positions = zero_based_positions(&replace.source_locations, line_count)?;
            let Some(&first) = positions.first() else {
                return Err(out_of_range("REPLACE without source locations"));
            };
            let mut index = 0;
            lines.retain(|_| {
                let keep = !positions.contains(&index);
                index += 1;
                keep
            });
            let target = clean_target_lines(replace.target_lines.as_deref());
            lines.splice(first..first, target);
        }
    }

    Ok(lines.join("\n"))
}

/// 1-based inclusive span of the inserted lines in the updated file.
///
/// `None` for REMOVE and for edits that insert nothing.
pub fn target_line_span(diff: &ParsedDiff) -> Option<(usize, usize)> {
    let (start, inserted) = match diff {
        ParsedDiff::Add(add) => {
            let after = usize::try_from(add.previous_source_location).ok()?;
            (after + 1, add.target_lines.as_ref().map_or(0, Vec::len))
        }
        ParsedDiff::Replace(replace) => {
            let first = replace.source_locations.iter().copied().min()?;
            (
                usize::try_from(first).ok()?,
                replace.target_lines.as_ref().map_or(0, Vec::len),
            )
        }
        ParsedDiff::Remove(_) => return None,
    };
    if inserted == 0 || start == 0 {
        return None;
    }
    Some((start, start + inserted - 1))
}

/// Sorted, deduplicated 0-based positions of `locations`.
fn zero_based_positions(locations: &[i64], line_count: usize) -> TokenizeResult<Vec<usize>> {
    let mut positions = BTreeSet::new();
    for &location in locations {
        if location < 1 || location as usize > line_count {
            return Err(out_of_range(format!(
                "REPLACE line {location} in a file of {line_count} lines"
            )));
        }
        positions.insert(location as usize - 1);
    }
    Ok(positions.into_iter().collect())
}

fn clean_target_lines(target: Option<&[String]>) -> Vec<&str> {
    target
        .unwrap_or_default()
        .iter()
        .map(|line| line.trim_end_matches(['\n', '\r']))
        .collect()
}

fn out_of_range(message: impl Into<String>) -> TokenizeError {
    TokenizeError::OutOfRangeEdit(message.into())
}
