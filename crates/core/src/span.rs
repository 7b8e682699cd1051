//! Map 1-based line ranges onto token index ranges of a [`SyntaxTree`].

use crate::error::{TokenizeError, TokenizeResult};
use crate::syntax::{SyntaxTree, Token, Trivia};

/// Inclusive range of positions into [`SyntaxTree::tokens`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenRange {
    pub start: usize,
    pub end: usize,
}

impl TokenRange {
    /// Range over positions `start..=end`.
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Number of tokens; a range always holds at least one.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.end - self.start + 1
    }

    /// Tokens of the range; panics if it lies outside `tokens`.
    pub fn slice<'a>(&self, tokens: &'a [Token]) -> &'a [Token] {
        &tokens[self.start..=self.end]
    }
}

/// Resolve the 1-based inclusive line range `[start_line, end_line]` to the
/// token range covering it.
///
/// The left boundary is the first token ending on the start line and the
/// right boundary is the last token starting on the end line. A boundary line
/// without tokens walks outward one line at a time; a walk that leaves the
/// file stops at the first or last token. Only a tree without tokens fails.
pub fn resolve_token_range(
    tree: &SyntaxTree,
    start_line: usize,
    end_line: usize,
) -> TokenizeResult<TokenRange> {
    let tokens = tree.tokens();
    let last = tokens.len().checked_sub(1).ok_or(TokenizeError::EmptySource)?;
    let last_start_line = tokens[last].span.start;
    let last_end_line = tokens[last].span.end;

    // nothing ends past the last token, so lines beyond it never match
    let mut line = start_line.saturating_sub(1).min(last_end_line);
    let left = loop {
        if let Some(index) = tokens.iter().position(|t| t.span.end == line) {
            break index;
        }
        if line == 0 {
            break 0;
        }
        line -= 1;
    };

    let mut line = end_line.saturating_sub(1);
    let right = loop {
        if let Some(index) = tokens.iter().rposition(|t| t.span.start == line) {
            break index;
        }
        if line >= last_start_line {
            break last;
        }
        line += 1;
    };

    Ok(TokenRange::new(left.min(right), left.max(right)))
}

/// Tokens whose line span overlaps the 1-based inclusive range.
pub fn tokens_in_line_span(tree: &SyntaxTree, start_line: usize, end_line: usize) -> &[Token] {
    let start = start_line.saturating_sub(1);
    let end = end_line.saturating_sub(1);
    let tokens = tree.tokens();
    let first = tokens.iter().position(|t| t.span.overlaps(start, end));
    let last = tokens.iter().rposition(|t| t.span.overlaps(start, end));
    match (first, last) {
        (Some(first), Some(last)) => &tokens[first..=last],
        _ => &[],
    }
}

/// Flattened trivia leaves starting inside the 1-based inclusive range.
///
/// Used when a span holds no tokens at all (blank or comment-only lines).
pub fn trivia_in_line_span(tree: &SyntaxTree, start_line: usize, end_line: usize) -> Vec<&Trivia> {
    let start = start_line.saturating_sub(1);
    let end = end_line.saturating_sub(1);
    let mut leaves = Vec::new();
    for item in tree.trivia() {
        item.flatten_into(&mut leaves);
    }
    leaves.retain(|t| (start..=end).contains(&t.span.start));
    leaves
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::csharp::CSharpParser;
    use crate::syntax::TriviaKind;
    use crate::SourceParser;

    const SOURCE: &str = "\
class A
{
    // note

    int x = 1;
    int y;
}
";

    fn tree(text: &str) -> SyntaxTree {
        CSharpParser.parse(text).unwrap()
    }

    fn texts(tokens: &[Token]) -> Vec<&str> {
        tokens.iter().map(|t| t.text.as_str()).collect()
    }

    #[test]
    fn test_exact_lines() {
        let tree = tree(SOURCE);
        let range = resolve_token_range(&tree, 5, 5).unwrap();
        assert_eq!(texts(range.slice(tree.tokens())), vec!["int", "x", "=", "1", ";"]);
    }

    #[test]
    fn test_blank_lines_walk_outward() {
        let tree = tree(SOURCE);
        // lines 3-4 hold only a comment and a blank line
        let range = resolve_token_range(&tree, 3, 4).unwrap();
        assert_eq!(texts(range.slice(tree.tokens())), vec!["{", "int", "x", "=", "1", ";"]);
    }

    #[test]
    fn test_walk_clamps_at_file_edges() {
        let tree = tree("\n\nint a;\n\n");
        let range = resolve_token_range(&tree, 1, 5).unwrap();
        assert_eq!(range, TokenRange::new(0, 2));
        let range = resolve_token_range(&tree, 40, 50).unwrap();
        assert_eq!(range, TokenRange::new(0, 2));
    }

    #[test]
    fn test_huge_start_line_clamps_without_scanning() {
        let tree = tree(SOURCE);
        let range = resolve_token_range(&tree, usize::MAX, usize::MAX).unwrap();
        assert_eq!(range, TokenRange::new(11, 11));
        assert_eq!(texts(range.slice(tree.tokens())), vec!["}"]);
    }

    #[test]
    fn test_resolve_is_pure() {
        let tree = tree(SOURCE);
        let first = resolve_token_range(&tree, 2, 6).unwrap();
        let second = resolve_token_range(&tree, 2, 6).unwrap();
        assert_eq!(first, second);
        assert_eq!(first, TokenRange::new(2, 10));
    }

    #[test]
    fn test_empty_tree_fails() {
        let tree = tree("// nothing here\n");
        assert!(matches!(
            resolve_token_range(&tree, 1, 1),
            Err(TokenizeError::EmptySource)
        ));
    }

    #[test]
    fn test_tokens_in_line_span_overlap() {
        let tree = tree("var s = @\"a\nb\";\nint z;\n");
        // the verbatim string spans lines 1-2
        assert_eq!(texts(tokens_in_line_span(&tree, 2, 2)), vec!["@\"a\nb\"", ";"]);
        assert_eq!(texts(tokens_in_line_span(&tree, 3, 3)), vec!["int", "z", ";"]);
        assert!(tokens_in_line_span(&tree, 9, 9).is_empty());
    }

    #[test]
    fn test_trivia_in_token_less_span() {
        let tree = tree(SOURCE);
        assert!(tokens_in_line_span(&tree, 3, 4).is_empty());
        let kinds: Vec<_> = trivia_in_line_span(&tree, 3, 4).iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TriviaKind::Whitespace,
                TriviaKind::SingleLineComment,
                TriviaKind::EndOfLine,
                TriviaKind::EndOfLine,
            ]
        );
    }
}
