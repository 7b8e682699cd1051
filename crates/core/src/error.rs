//! Error types for the revision tokenizer.

use std::path::PathBuf;

/// Error raised by the C# lexer or any other [`SourceParser`](crate::SourceParser).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("line {line}: {message}")]
pub struct ParseError {
    /// 0-based line where the offending construct starts.
    pub line: usize,
    pub message: String,
}

impl ParseError {
    pub fn new(line: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
        }
    }
}

/// Reasons a single record is rejected. None of these abort a batch.
#[derive(Debug, thiserror::Error)]
pub enum TokenizeError {
    #[error("Malformed record: {0}")]
    MalformedRecord(String),

    #[error("Edit out of range: {0}")]
    OutOfRangeEdit(String),

    #[error("Edit spans {size} tokens, budget is {budget}")]
    WindowTooLarge { size: usize, budget: usize },

    #[error("Source file has no tokens")]
    EmptySource,

    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

impl TokenizeError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        TokenizeError::Io {
            path: path.into(),
            source,
        }
    }

    /// Stable label used for logging and rejection counts.
    pub fn kind(&self) -> &'static str {
        match self {
            TokenizeError::MalformedRecord(_) => "malformed_record",
            TokenizeError::OutOfRangeEdit(_) => "out_of_range_edit",
            TokenizeError::WindowTooLarge { .. } => "window_too_large",
            TokenizeError::EmptySource => "empty_source",
            TokenizeError::Parse(_) => "parse_failure",
            TokenizeError::Io { .. } => "io",
            TokenizeError::Json(_) => "json",
            TokenizeError::ThreadPool(_) => "thread_pool",
        }
    }
}

/// Result type used throughout the crate.
pub type TokenizeResult<T> = Result<T, TokenizeError>;
