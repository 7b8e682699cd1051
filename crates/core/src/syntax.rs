//! Token and trivia model produced by a [`SourceParser`](crate::SourceParser).
//!
//! The shape follows the classic compiler-platform split: every token owns
//! the non-semantic text around it as ordered leading and trailing trivia,
//! and some trivia (documentation comments, preprocessor directives) carry a
//! nested structure of their own.

use std::fmt;

/// Inclusive 0-based line span of a token or trivia item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LineSpan {
    pub start: usize,
    pub end: usize,
}

impl LineSpan {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn single(line: usize) -> Self {
        Self { start: line, end: line }
    }

    /// True when the span shares at least one line with `[start, end]`.
    pub fn overlaps(&self, start: usize, end: usize) -> bool {
        self.end >= start && self.start <= end
    }
}

/// Syntactic category of a token. Only identifiers are canonicalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Identifier,
    Keyword,
    NumericLiteral,
    StringLiteral,
    CharacterLiteral,
    Punctuation,
}

/// A lexical token with the trivia attached to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub span: LineSpan,
    pub leading: Vec<Trivia>,
    pub trailing: Vec<Trivia>,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, span: LineSpan) -> Self {
        Self {
            kind,
            text: text.into(),
            span,
            leading: Vec::new(),
            trailing: Vec::new(),
        }
    }

    pub fn is_identifier(&self) -> bool {
        self.kind == TokenKind::Identifier
    }
}

/// Kind of a trivia item. [`TriviaKind::as_str`] gives the symbol emitted
/// by the serializer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TriviaKind {
    Whitespace,
    EndOfLine,
    SingleLineComment,
    MultiLineComment,
    SingleLineDocumentationComment,
    DocumentationCommentExterior,
    PreprocessingMessage,
    RegionDirective,
    EndRegionDirective,
    IfDirective,
    ElifDirective,
    ElseDirective,
    EndIfDirective,
    DefineDirective,
    UndefDirective,
    PragmaWarningDirective,
    NullableDirective,
    ErrorDirective,
    WarningDirective,
    LineDirective,
    BadDirective,
}

impl TriviaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TriviaKind::Whitespace => "WhitespaceTrivia",
            TriviaKind::EndOfLine => "EndOfLineTrivia",
            TriviaKind::SingleLineComment => "SingleLineCommentTrivia",
            TriviaKind::MultiLineComment => "MultiLineCommentTrivia",
            TriviaKind::SingleLineDocumentationComment => "SingleLineDocumentationCommentTrivia",
            TriviaKind::DocumentationCommentExterior => "DocumentationCommentExteriorTrivia",
            TriviaKind::PreprocessingMessage => "PreprocessingMessageTrivia",
            TriviaKind::RegionDirective => "RegionDirectiveTrivia",
            TriviaKind::EndRegionDirective => "EndRegionDirectiveTrivia",
            TriviaKind::IfDirective => "IfDirectiveTrivia",
            TriviaKind::ElifDirective => "ElifDirectiveTrivia",
            TriviaKind::ElseDirective => "ElseDirectiveTrivia",
            TriviaKind::EndIfDirective => "EndIfDirectiveTrivia",
            TriviaKind::DefineDirective => "DefineDirectiveTrivia",
            TriviaKind::UndefDirective => "UndefDirectiveTrivia",
            TriviaKind::PragmaWarningDirective => "PragmaWarningDirectiveTrivia",
            TriviaKind::NullableDirective => "NullableDirectiveTrivia",
            TriviaKind::ErrorDirective => "ErrorDirectiveTrivia",
            TriviaKind::WarningDirective => "WarningDirectiveTrivia",
            TriviaKind::LineDirective => "LineDirectiveTrivia",
            TriviaKind::BadDirective => "BadDirectiveTrivia",
        }
    }
}

impl fmt::Display for TriviaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whitespace, comment or directive text between tokens.
///
/// Structured trivia (doc comments, directives) carries its leaves in
/// `structure`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trivia {
    pub kind: TriviaKind,
    pub text: String,
    pub span: LineSpan,
    /// Nested trivia of a structured item; empty for leaves.
    pub structure: Vec<Trivia>,
}

impl Trivia {
    pub fn leaf(kind: TriviaKind, text: impl Into<String>, span: LineSpan) -> Self {
        Self {
            kind,
            text: text.into(),
            span,
            structure: Vec::new(),
        }
    }

    pub fn structured(
        kind: TriviaKind,
        text: impl Into<String>,
        span: LineSpan,
        structure: Vec<Trivia>,
    ) -> Self {
        Self {
            kind,
            text: text.into(),
            span,
            structure,
        }
    }

    pub fn is_structured(&self) -> bool {
        !self.structure.is_empty()
    }

    /// Push the leaf trivia of `self` onto `out`, depth first.
    ///
    /// A structured item contributes its nested leaves, never itself.
    pub fn flatten_into<'a>(&'a self, out: &mut Vec<&'a Trivia>) {
        if self.structure.is_empty() {
            out.push(self);
        } else {
            for nested in &self.structure {
                nested.flatten_into(out);
            }
        }
    }
}

/// Flatten a trivia list into its ordered leaves.
pub fn flatten_trivia(trivia: &[Trivia]) -> Vec<&Trivia> {
    let mut out = Vec::with_capacity(trivia.len());
    for item in trivia {
        item.flatten_into(&mut out);
    }
    out
}

/// A parsed source file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyntaxTree {
    tokens: Vec<Token>,
    /// Trivia following the last token (or the whole file if it has no tokens).
    end_of_file_trivia: Vec<Trivia>,
}

impl SyntaxTree {
    pub fn new(tokens: Vec<Token>, end_of_file_trivia: Vec<Trivia>) -> Self {
        Self {
            tokens,
            end_of_file_trivia,
        }
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn end_of_file_trivia(&self) -> &[Trivia] {
        &self.end_of_file_trivia
    }

    /// Every top-level trivia item in document order.
    pub fn trivia(&self) -> impl Iterator<Item = &Trivia> + '_ {
        self.tokens
            .iter()
            .flat_map(|t| t.leading.iter().chain(t.trailing.iter()))
            .chain(self.end_of_file_trivia.iter())
    }

    /// Number of lines covered by tokens and trivia.
    pub fn line_count(&self) -> usize {
        let token_max = self.tokens.iter().map(|t| t.span.end);
        let trivia_max = self.trivia().map(|t| t.span.end);
        token_max.chain(trivia_max).max().map_or(0, |l| l + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flatten_structured_trivia() {
        let doc = Trivia::structured(
            TriviaKind::SingleLineDocumentationComment,
            "/// a\n/// b\n",
            LineSpan::new(0, 1),
            vec![
                Trivia::leaf(TriviaKind::DocumentationCommentExterior, "///", LineSpan::single(0)),
                Trivia::leaf(TriviaKind::DocumentationCommentExterior, "///", LineSpan::single(1)),
            ],
        );
        let ws = Trivia::leaf(TriviaKind::Whitespace, "  ", LineSpan::single(2));
        let items = [doc, ws];
        let kinds: Vec<_> = flatten_trivia(&items).iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TriviaKind::DocumentationCommentExterior,
                TriviaKind::DocumentationCommentExterior,
                TriviaKind::Whitespace,
            ]
        );
    }

    #[test]
    fn test_line_span_overlap() {
        let span = LineSpan::new(2, 4);
        assert!(span.overlaps(4, 9));
        assert!(span.overlaps(0, 2));
        assert!(!span.overlaps(5, 6));
        assert!(!span.overlaps(0, 1));
    }
}
