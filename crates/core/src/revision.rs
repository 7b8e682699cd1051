//! Per-record tokenization.
//!
//! [`tokenize_revision`] runs the stages in order: resolve the edit range,
//! pad it to the budget, rebuild the updated file, canonicalize target then
//! window tokens through one map, serialize, tokenize messages and re-origin
//! every line field. Each stage is a plain function over immutable inputs;
//! any error rejects the record.

use tracing::debug;

use crate::canonical::Canonicalizer;
use crate::diff::{apply_diff, target_line_span};
use crate::error::{TokenizeError, TokenizeResult};
use crate::message::tokenize_message;
use crate::offsets::{renormalize_diagnostics, renormalize_diff, window_anchor};
use crate::pipeline::PipelineConfig;
use crate::record::{DiagnosticOccurrence, ParsedDiff, RevisionRecord};
use crate::serialize::{serialize, serialize_trivia};
use crate::span::{resolve_token_range, tokens_in_line_span, trivia_in_line_span, TokenRange};
use crate::window::pad_to_token_budget;
use crate::SourceParser;

/// Derived fields of one record.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenizedRevision {
    pub file_context: Vec<String>,
    /// Anchor subtracted from every line field; 1-based first window line.
    pub file_context_start: i64,
    /// `None` for REMOVE.
    pub target_lines: Option<Vec<String>>,
    /// Renormalized copy of the record's diff.
    pub diff: ParsedDiff,
    /// Renormalized diagnostics carrying their tokenized messages.
    pub diagnostics: Vec<DiagnosticOccurrence>,
    pub window: TokenRange,
    pub window_token_count: usize,
    pub unresolved_identifiers: usize,
    pub placeholders: usize,
}

/// Tokenize one record against the text of its previous file.
///
/// Rejects the record with the first error any stage reports; nothing is
/// partially applied.
pub fn tokenize_revision<P: SourceParser>(
    record: &RevisionRecord,
    previous_text: &str,
    parser: &P,
    config: &PipelineConfig,
) -> TokenizeResult<TokenizedRevision> {
    let (start_line, end_line) = record.required_lines()?;
    let previous = parser.parse(previous_text)?;
    let line_count = previous.line_count();
    if end_line > line_count {
        return Err(TokenizeError::OutOfRangeEdit(format!(
            "required lines {start_line}..={end_line} exceed {line_count} lines"
        )));
    }

    let core = resolve_token_range(&previous, start_line, end_line)?;
    debug!(start_line, end_line, core_start = core.start, core_end = core.end, "range resolved");

    let window = pad_to_token_budget(core, previous.tokens().len(), config.token_budget)?;
    debug!(start = window.start, end = window.end, tokens = window.len(), "windowed");

    let updated_text = apply_diff(&record.parsed_diff, previous_text)?;
    let mut canon = Canonicalizer::new(&config.canonicalizer);

    let target_lines = match record.parsed_diff {
        ParsedDiff::Remove(_) => None,
        ParsedDiff::Add(_) | ParsedDiff::Replace(_) => {
            match target_line_span(&record.parsed_diff) {
                Some((start, end)) => {
                    let updated = parser.parse(&updated_text)?;
                    let tokens = tokens_in_line_span(&updated, start, end);
                    if tokens.is_empty() {
                        debug!(start, end, "target lines hold no tokens, serializing trivia");
                        Some(serialize_trivia(&trivia_in_line_span(&updated, start, end)))
                    } else {
                        Some(serialize(&canon.canonicalize(tokens)).symbols)
                    }
                }
                None => Some(Vec::new()),
            }
        }
    };

    let context = serialize(&canon.canonicalize(window.slice(previous.tokens())));
    let first_line = context.first_line.ok_or(TokenizeError::EmptySource)?;
    debug!(placeholders = canon.len(), first_line, "canonicalized and serialized");

    let anchor = window_anchor(first_line);
    let mut unresolved_identifiers = 0;
    let diagnostics = renormalize_diagnostics(&record.diagnostic_occurrences, anchor)
        .into_iter()
        .map(|mut diagnostic| {
            let tokenized = tokenize_message(&canon, diagnostic.message.as_deref().unwrap_or(""));
            unresolved_identifiers += tokenized.unresolved;
            diagnostic.tokenized_message = Some(tokenized.tokens);
            diagnostic
        })
        .collect();
    debug!(anchor, unresolved_identifiers, "renormalized");

    Ok(TokenizedRevision {
        file_context: context.symbols,
        file_context_start: anchor,
        target_lines,
        diff: renormalize_diff(&record.parsed_diff, anchor),
        diagnostics,
        window,
        window_token_count: context.token_count,
        unresolved_identifiers,
        placeholders: canon.len(),
    })
}

impl RevisionRecord {
    /// Terminal form: derived fields set, identity and raw text cleared.
    pub fn into_tokenized(self, derived: TokenizedRevision) -> RevisionRecord {
        let mut diff = derived.diff;
        match &mut diff {
            ParsedDiff::Add(add) => {
                add.target_lines = None;
                add.tokenized_target_lines = derived.target_lines;
            }
            ParsedDiff::Replace(replace) => {
                replace.target_lines = None;
                replace.tokenized_target_lines = derived.target_lines;
            }
            ParsedDiff::Remove(_) => {}
        }

        let diagnostic_occurrences = derived
            .diagnostics
            .into_iter()
            .map(|d| DiagnosticOccurrence { message: None, ..d })
            .collect();

        RevisionRecord {
            repo: None,
            repo_url: None,
            solution_file: None,
            file_path: None,
            commit: None,
            file_url: None,
            required_lines_start: None,
            required_lines_end: None,
            parsed_diff: diff,
            diagnostic_occurrences,
            tokenized_file_context: Some(derived.file_context),
            tokenized_file_context_start: Some(derived.file_context_start),
            extra: self.extra,
        }
    }
}
