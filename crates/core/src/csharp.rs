//! Trivia-preserving C# lexer.
//!
//! Produces the token/trivia shape of the .NET compiler platform: trailing
//! trivia of a token runs up to and including the first end-of-line, every
//! other trivia item leads the next token, and documentation comments and
//! preprocessor directives are structured trivia. It is a lexer, not a
//! parser: no syntax tree beyond the token stream is built, which is all the
//! revision pipeline consumes.

use std::mem;

use crate::error::ParseError;
use crate::syntax::{LineSpan, SyntaxTree, Token, TokenKind, Trivia, TriviaKind};
use crate::SourceParser;

const KEYWORDS: &[&str] = &[
    "abstract", "as", "base", "bool", "break", "byte", "case", "catch", "char", "checked",
    "class", "const", "continue", "decimal", "default", "delegate", "do", "double", "else",
    "enum", "event", "explicit", "extern", "false", "finally", "fixed", "float", "for",
    "foreach", "goto", "if", "implicit", "in", "int", "interface", "internal", "is", "lock",
    "long", "namespace", "new", "null", "object", "operator", "out", "override", "params",
    "private", "protected", "public", "readonly", "ref", "return", "sbyte", "sealed", "short",
    "sizeof", "stackalloc", "static", "string", "struct", "switch", "this", "throw", "true",
    "try", "typeof", "uint", "ulong", "unchecked", "unsafe", "ushort", "using", "virtual",
    "void", "volatile", "while",
];

// Longest match first.
const MULTI_CHAR_PUNCTUATION: &[&str] = &[
    "<<=", "??=", "->", "=>", "==", "!=", "<=", ">=", "&&", "||", "++", "--", "+=", "-=", "*=",
    "/=", "%=", "&=", "|=", "^=", "<<", "::", "??", "..",
];

/// [`SourceParser`] for C# source text.
#[derive(Debug, Clone, Copy, Default)]
pub struct CSharpParser;

impl SourceParser for CSharpParser {
    fn parse(&self, text: &str) -> Result<SyntaxTree, ParseError> {
        let pieces = Lexer::new(text).run()?;
        Ok(attach_trivia(pieces))
    }
}

enum Piece {
    Token(Token),
    Trivia(Trivia),
}

struct Lexer<'a> {
    src: &'a str,
    pos: usize,
    line: usize,
    /// Only whitespace seen since the last end-of-line.
    at_line_start: bool,
    pieces: Vec<Piece>,
}

impl<'a> Lexer<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            pos: 0,
            line: 0,
            at_line_start: true,
            pieces: Vec::new(),
        }
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.rest().chars().nth(offset)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        if c == '\n' {
            self.line += 1;
        }
        Some(c)
    }

    fn at_end_of_line(&self) -> bool {
        let rest = self.rest();
        rest.starts_with('\n') || rest.starts_with("\r\n")
    }

    /// Advance to just before the next end-of-line (or end of input).
    fn skip_to_end_of_line(&mut self) {
        while !self.rest().is_empty() && !self.at_end_of_line() {
            self.bump();
        }
    }

    /// Consume an end-of-line at the cursor and return its leaf trivia.
    fn end_of_line(&mut self) -> Option<Trivia> {
        let line = self.line;
        let text = if self.rest().starts_with("\r\n") {
            "\r\n"
        } else if self.rest().starts_with('\n') {
            "\n"
        } else {
            return None;
        };
        self.pos += text.len();
        self.line += 1;
        Some(Trivia::leaf(TriviaKind::EndOfLine, text, LineSpan::single(line)))
    }

    fn push_trivia(&mut self, trivia: Trivia) {
        self.pieces.push(Piece::Trivia(trivia));
    }

    fn run(mut self) -> Result<Vec<Piece>, ParseError> {
        while let Some(c) = self.peek() {
            if let Some(eol) = self.end_of_line() {
                self.push_trivia(eol);
                self.at_line_start = true;
            } else if is_inline_whitespace(c) {
                self.whitespace();
            } else if self.rest().starts_with("//") {
                if self.at_line_start && is_doc_comment_start(self.rest()) {
                    self.documentation_comment();
                } else {
                    self.single_line_comment();
                }
            } else if self.rest().starts_with("/*") {
                self.block_comment()?;
            } else if c == '#' && self.at_line_start {
                self.directive();
            } else {
                let token = self.token()?;
                self.pieces.push(Piece::Token(token));
                self.at_line_start = false;
            }
        }
        Ok(self.pieces)
    }

    fn whitespace(&mut self) {
        let start = self.pos;
        while self.peek().is_some_and(is_inline_whitespace) && !self.at_end_of_line() {
            self.bump();
        }
        let text = &self.src[start..self.pos];
        self.push_trivia(Trivia::leaf(
            TriviaKind::Whitespace,
            text,
            LineSpan::single(self.line),
        ));
    }

    fn single_line_comment(&mut self) {
        let start = self.pos;
        self.skip_to_end_of_line();
        let text = &self.src[start..self.pos];
        self.push_trivia(Trivia::leaf(
            TriviaKind::SingleLineComment,
            text,
            LineSpan::single(self.line),
        ));
        self.at_line_start = false;
    }

    fn block_comment(&mut self) -> Result<(), ParseError> {
        let start = self.pos;
        let start_line = self.line;
        let close = self.rest()[2..]
            .find("*/")
            .ok_or_else(|| ParseError::new(start_line, "unterminated block comment"))?;
        let end = self.pos + 2 + close + 2;
        while self.pos < end {
            self.bump();
        }
        let text = &self.src[start..end];
        self.push_trivia(Trivia::leaf(
            TriviaKind::MultiLineComment,
            text,
            LineSpan::new(start_line, self.line),
        ));
        self.at_line_start = false;
        Ok(())
    }

    /// Consecutive `///` lines become one structured trivia item with an
    /// exterior marker per line. The final end-of-line belongs to the item.
    fn documentation_comment(&mut self) {
        let start = self.pos;
        let start_line = self.line;
        let mut exteriors = Vec::new();

        let last_line = loop {
            let line = self.line;
            let exterior_start = self.pos;
            while self.peek().is_some_and(|c| c == ' ' || c == '\t') {
                self.bump();
            }
            self.pos += 3;
            exteriors.push(Trivia::leaf(
                TriviaKind::DocumentationCommentExterior,
                &self.src[exterior_start..self.pos],
                LineSpan::single(line),
            ));
            self.skip_to_end_of_line();
            if self.end_of_line().is_none() {
                break line;
            }
            let next = self.rest().trim_start_matches([' ', '\t']);
            if !is_doc_comment_start(next) {
                break line;
            }
        };

        self.push_trivia(Trivia::structured(
            TriviaKind::SingleLineDocumentationComment,
            &self.src[start..self.pos],
            LineSpan::new(start_line, last_line),
            exteriors,
        ));
        self.at_line_start = true;
    }

    fn directive(&mut self) {
        let start = self.pos;
        let line = self.line;
        self.bump();
        while self.peek().is_some_and(|c| c == ' ' || c == '\t') {
            self.bump();
        }
        let name_start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_alphabetic()) {
            self.bump();
        }
        let kind = directive_kind(&self.src[name_start..self.pos]);
        let message_start = self.pos;
        self.skip_to_end_of_line();
        let message = self.src[message_start..self.pos].trim();

        let mut structure = Vec::new();
        let carries_message = matches!(
            kind,
            TriviaKind::RegionDirective
                | TriviaKind::EndRegionDirective
                | TriviaKind::ErrorDirective
                | TriviaKind::WarningDirective
        );
        if carries_message && !message.is_empty() {
            structure.push(Trivia::leaf(
                TriviaKind::PreprocessingMessage,
                message,
                LineSpan::single(line),
            ));
        }
        if let Some(eol) = self.end_of_line() {
            structure.push(eol);
        }

        self.push_trivia(Trivia::structured(
            kind,
            &self.src[start..self.pos],
            LineSpan::single(line),
            structure,
        ));
        self.at_line_start = true;
    }

    fn token(&mut self) -> Result<Token, ParseError> {
        let start = self.pos;
        let start_line = self.line;
        let c = self.peek().unwrap_or_default();
        let next = self.peek_at(1);

        let kind = if is_string_start(self.rest()) {
            self.string_literal()?;
            TokenKind::StringLiteral
        } else if c == '\'' {
            self.character_literal()?;
            TokenKind::CharacterLiteral
        } else if c.is_ascii_digit() || (c == '.' && next.is_some_and(|n| n.is_ascii_digit())) {
            self.numeric_literal();
            TokenKind::NumericLiteral
        } else if is_identifier_start(c) || (c == '@' && next.is_some_and(is_identifier_start)) {
            self.bump();
            while self.peek().is_some_and(is_identifier_part) {
                self.bump();
            }
            let text = &self.src[start..self.pos];
            if KEYWORDS.contains(&text) {
                TokenKind::Keyword
            } else {
                TokenKind::Identifier
            }
        } else {
            match MULTI_CHAR_PUNCTUATION
                .iter()
                .find(|p| self.rest().starts_with(**p))
            {
                Some(p) => self.pos += p.len(),
                None => {
                    self.bump();
                }
            }
            TokenKind::Punctuation
        };

        Ok(Token::new(
            kind,
            &self.src[start..self.pos],
            LineSpan::new(start_line, self.line),
        ))
    }

    fn numeric_literal(&mut self) {
        let rest = self.rest();
        if rest.starts_with("0x") || rest.starts_with("0X") || rest.starts_with("0b") || rest.starts_with("0B") {
            self.pos += 2;
            while self.peek().is_some_and(|c| c.is_ascii_hexdigit() || c == '_') {
                self.bump();
            }
        } else {
            while self.peek().is_some_and(|c| c.is_ascii_digit() || c == '_') {
                self.bump();
            }
            if self.peek() == Some('.') && self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) {
                self.bump();
                while self.peek().is_some_and(|c| c.is_ascii_digit() || c == '_') {
                    self.bump();
                }
            }
            if matches!(self.peek(), Some('e' | 'E')) {
                let signed = matches!(self.peek_at(1), Some('+' | '-'));
                let digit_at = if signed { 2 } else { 1 };
                if self.peek_at(digit_at).is_some_and(|c| c.is_ascii_digit()) {
                    for _ in 0..digit_at {
                        self.bump();
                    }
                    while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                        self.bump();
                    }
                }
            }
        }
        while self
            .peek()
            .is_some_and(|c| matches!(c, 'u' | 'U' | 'l' | 'L' | 'f' | 'F' | 'd' | 'D' | 'm' | 'M'))
        {
            self.bump();
        }
    }

    fn character_literal(&mut self) -> Result<(), ParseError> {
        let line = self.line;
        self.bump();
        loop {
            match self.bump() {
                Some('\\') => {
                    self.bump();
                }
                Some('\'') => return Ok(()),
                Some('\n') | None => {
                    return Err(ParseError::new(line, "unterminated character literal"))
                }
                Some(_) => {}
            }
        }
    }

    /// Regular, verbatim, interpolated and raw string literals.
    fn string_literal(&mut self) -> Result<(), ParseError> {
        let line = self.line;
        let mut interpolated = false;
        let mut verbatim = false;
        while let Some(c) = self.peek() {
            match c {
                '$' => interpolated = true,
                '@' => verbatim = true,
                _ => break,
            }
            self.bump();
        }

        let quotes = self.rest().chars().take_while(|c| *c == '"').count();
        if quotes >= 3 {
            let delimiter = "\"".repeat(quotes);
            let close = self.rest()[quotes..]
                .find(&delimiter)
                .ok_or_else(|| ParseError::new(line, "unterminated raw string literal"))?;
            let end = self.pos + quotes + close + quotes;
            while self.pos < end {
                self.bump();
            }
            return Ok(());
        }

        self.bump();
        let mut depth = 0usize;
        loop {
            let c = self
                .bump()
                .ok_or_else(|| ParseError::new(line, "unterminated string literal"))?;
            match c {
                '"' if depth > 0 => self.nested_string(line)?,
                '"' if verbatim && self.peek() == Some('"') => {
                    self.bump();
                }
                '"' => return Ok(()),
                '\\' if !verbatim || depth > 0 => {
                    self.bump();
                }
                '{' if interpolated => {
                    if depth == 0 && self.peek() == Some('{') {
                        self.bump();
                    } else {
                        depth += 1;
                    }
                }
                '}' if interpolated && depth > 0 => depth -= 1,
                '\n' if !verbatim && depth == 0 => {
                    return Err(ParseError::new(line, "unterminated string literal"))
                }
                _ => {}
            }
        }
    }

    /// A plain string inside an interpolation hole; the opening quote is consumed.
    fn nested_string(&mut self, line: usize) -> Result<(), ParseError> {
        loop {
            match self.bump() {
                Some('\\') => {
                    self.bump();
                }
                Some('"') => return Ok(()),
                Some(_) => {}
                None => return Err(ParseError::new(line, "unterminated string literal")),
            }
        }
    }
}

fn attach_trivia(pieces: Vec<Piece>) -> SyntaxTree {
    let mut tokens = Vec::new();
    let mut pending = Vec::new();
    let mut iter = pieces.into_iter().peekable();

    while let Some(piece) = iter.next() {
        match piece {
            Piece::Trivia(trivia) => pending.push(trivia),
            Piece::Token(mut token) => {
                token.leading = mem::take(&mut pending);
                loop {
                    let kind = match iter.peek() {
                        Some(Piece::Trivia(next)) => next.kind,
                        _ => break,
                    };
                    let inline = matches!(
                        kind,
                        TriviaKind::Whitespace
                            | TriviaKind::SingleLineComment
                            | TriviaKind::MultiLineComment
                    );
                    if !inline && kind != TriviaKind::EndOfLine {
                        break;
                    }
                    if let Some(Piece::Trivia(trivia)) = iter.next() {
                        token.trailing.push(trivia);
                    }
                    if kind == TriviaKind::EndOfLine {
                        break;
                    }
                }
                tokens.push(token);
            }
        }
    }

    SyntaxTree::new(tokens, pending)
}

fn directive_kind(name: &str) -> TriviaKind {
    match name {
        "region" => TriviaKind::RegionDirective,
        "endregion" => TriviaKind::EndRegionDirective,
        "if" => TriviaKind::IfDirective,
        "elif" => TriviaKind::ElifDirective,
        "else" => TriviaKind::ElseDirective,
        "endif" => TriviaKind::EndIfDirective,
        "define" => TriviaKind::DefineDirective,
        "undef" => TriviaKind::UndefDirective,
        "pragma" => TriviaKind::PragmaWarningDirective,
        "nullable" => TriviaKind::NullableDirective,
        "error" => TriviaKind::ErrorDirective,
        "warning" => TriviaKind::WarningDirective,
        "line" => TriviaKind::LineDirective,
        _ => TriviaKind::BadDirective,
    }
}

fn is_inline_whitespace(c: char) -> bool {
    c.is_whitespace() && c != '\n'
}

fn is_doc_comment_start(text: &str) -> bool {
    text.starts_with("///") && !text.starts_with("////")
}

fn is_identifier_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_identifier_part(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn is_string_start(text: &str) -> bool {
    text.trim_start_matches(['$', '@']).starts_with('"')
}
