//! Re-origin line fields onto the emitted window.

use crate::record::{DiagnosticOccurrence, ParsedDiff};

/// 1-based number of the window's first line, from its 0-based start.
///
/// A 1-based field equal to the anchor becomes 0 after renormalization.
pub fn window_anchor(first_line: usize) -> i64 {
    first_line as i64 + 1
}

/// Copy of `diff` with every location shifted by `-anchor`.
pub fn renormalize_diff(diff: &ParsedDiff, anchor: i64) -> ParsedDiff {
    let mut diff = diff.clone();
    match &mut diff {
        ParsedDiff::Add(add) => add.previous_source_location -= anchor,
        ParsedDiff::Remove(remove) => {
            remove.source_location_start -= anchor;
            remove.source_location_end -= anchor;
        }
        ParsedDiff::Replace(replace) => {
            for location in &mut replace.source_locations {
                *location -= anchor;
            }
        }
    }
    diff
}

/// Diagnostic lines may land before the window and turn negative.
pub fn renormalize_diagnostics(
    diagnostics: &[DiagnosticOccurrence],
    anchor: i64,
) -> Vec<DiagnosticOccurrence> {
    diagnostics
        .iter()
        .map(|d| DiagnosticOccurrence {
            line: d.line - anchor,
            ..d.clone()
        })
        .collect()
}

/// Every positional field of a diff, in field order.
pub fn diff_locations(diff: &ParsedDiff) -> Vec<i64> {
    match diff {
        ParsedDiff::Add(add) => vec![add.previous_source_location],
        ParsedDiff::Remove(remove) => {
            vec![remove.source_location_start, remove.source_location_end]
        }
        ParsedDiff::Replace(replace) => replace.source_locations.clone(),
    }
}
