//! Grow a core token range into a fixed-budget context window.

use crate::error::{TokenizeError, TokenizeResult};
use crate::span::TokenRange;

/// Extend `range` one token at a time until it holds `budget` tokens or both
/// ends reach the file boundary.
///
/// A core range that already fills the budget is rejected with
/// [`TokenizeError::WindowTooLarge`]. When the file runs out of tokens the
/// shorter window is returned as is.
pub fn pad_to_token_budget(
    range: TokenRange,
    token_count: usize,
    budget: usize,
) -> TokenizeResult<TokenRange> {
    let size = range.len();
    if size >= budget {
        return Err(TokenizeError::WindowTooLarge { size, budget });
    }

    let last = token_count.saturating_sub(1);
    let TokenRange { mut start, mut end } = range;
    let mut missing = budget - size;

    while missing > 0 {
        let left_saturated = start == 0;
        let right_saturated = end >= last;
        if left_saturated && right_saturated {
            break;
        }
        if !right_saturated && (left_saturated || missing % 2 == 1) {
            end += 1;
        } else {
            start -= 1;
        }
        missing -= 1;
    }

    Ok(TokenRange::new(start, end))
}
