//! Flatten canonical tokens and their trivia into a symbol sequence.

use crate::canonical::CanonicalToken;
use crate::syntax::{flatten_trivia, Trivia};

/// Symbol stream of a token slice.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Serialized {
    pub symbols: Vec<String>,
    /// Smallest 0-based start line of the serialized tokens.
    pub first_line: Option<usize>,
    /// Token symbols only, trivia excluded.
    pub token_count: usize,
}

/// Leading trivia kinds, token text, trailing trivia kinds, per token.
///
/// Structured trivia contributes its nested leaves. Line tracking reads the
/// span of the original token, never the renamed text.
pub fn serialize(tokens: &[CanonicalToken<'_>]) -> Serialized {
    let mut out = Serialized::default();
    for token in tokens {
        let original = token.original;
        push_trivia_kinds(&mut out.symbols, &original.leading);
        out.symbols.push(token.text.clone());
        push_trivia_kinds(&mut out.symbols, &original.trailing);

        out.token_count += 1;
        out.first_line = Some(match out.first_line {
            Some(line) => line.min(original.span.start),
            None => original.span.start,
        });
    }
    out
}

/// Kind names of already flattened trivia leaves, for spans without tokens.
pub fn serialize_trivia(leaves: &[&Trivia]) -> Vec<String> {
    leaves.iter().map(|t| t.kind.as_str().to_string()).collect()
}

fn push_trivia_kinds(symbols: &mut Vec<String>, trivia: &[Trivia]) {
    symbols.extend(
        flatten_trivia(trivia)
            .into_iter()
            .map(|t| t.kind.as_str().to_string()),
    );
}
