//! Core tokenization logic for source-code revision datasets.
//!
//! Turns a revision record (previous file, one line-level edit, diagnostic
//! messages) into a fixed-size, formatting-preserving token window with
//! identifiers renamed to `VARn` placeholders and every line field re-origined
//! onto the window. [`tokenize_revision`] handles one record,
//! [`process_directory`] a whole directory of them.

/// Trait for turning source text into tokens with attached trivia.
///
/// The pipeline only relies on token order, token kind, line spans and the
/// (possibly structured) trivia around each token.
pub trait SourceParser {
    fn parse(&self, text: &str) -> Result<SyntaxTree, ParseError>;
}

// Blanket implementation for references to parsers
impl<T: SourceParser + ?Sized> SourceParser for &T {
    fn parse(&self, text: &str) -> Result<SyntaxTree, ParseError> {
        (*self).parse(text)
    }
}

mod canonical;
mod csharp;
pub mod dataset;
mod diff;
mod error;
mod message;
mod offsets;
pub mod pipeline;
mod record;
mod revision;
mod serialize;
mod span;
pub mod syntax;
mod window;

pub use canonical::{is_placeholder, CanonicalToken, Canonicalizer, CanonicalizerConfig};
pub use csharp::CSharpParser;
pub use dataset::{finalize_dataset, flatten_source, flatten_target, DatasetConfig, DatasetSummary, Split};
pub use diff::{apply_diff, target_line_span};
pub use error::{ParseError, TokenizeError, TokenizeResult};
pub use message::{tokenize_message, TokenizedMessage, UNKNOWN_MARKER};
pub use offsets::{diff_locations, renormalize_diagnostics, renormalize_diff, window_anchor};
pub use pipeline::{
    discover_json_files, process_directory, process_file, BatchSummary, FileOutcome,
    PipelineConfig, DEFAULT_REPO_ROOT,
};
pub use record::{
    AddAction, DiagnosticOccurrence, ParsedDiff, RemoveAction, ReplaceAction, RevisionRecord,
};
pub use revision::{tokenize_revision, TokenizedRevision};
pub use serialize::{serialize, serialize_trivia, Serialized};
pub use span::{resolve_token_range, tokens_in_line_span, trivia_in_line_span, TokenRange};
pub use syntax::{LineSpan, SyntaxTree, Token, TokenKind, Trivia, TriviaKind};
pub use window::pad_to_token_budget;

/// Default number of tokens in the previous-file window
pub const DEFAULT_TOKEN_BUDGET: usize = 50;
