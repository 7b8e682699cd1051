//! JSON shape of one revision record.
//!
//! Keys are PascalCase. Fields this crate does not interpret (`DiagnosticID`,
//! `Severity`, analyzer metadata...) are kept in `extra` and written back
//! unchanged.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{TokenizeError, TokenizeResult};

/// One mined revision: previous file location, the edit and its diagnostics.
///
/// Keys this type does not model are kept in `extra` and written back out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RevisionRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo: Option<String>,
    #[serde(rename = "RepoURL", default, skip_serializing_if = "Option::is_none")]
    pub repo_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub solution_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit: Option<String>,
    #[serde(rename = "FileURL", default, skip_serializing_if = "Option::is_none")]
    pub file_url: Option<String>,
    /// 1-based inclusive edit range in the previous file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_lines_start: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_lines_end: Option<i64>,
    pub parsed_diff: ParsedDiff,
    #[serde(
        rename = "DiagnosticOccurances",
        alias = "DiagnosticOccurrences",
        default
    )]
    pub diagnostic_occurrences: Vec<DiagnosticOccurrence>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokenized_file_context: Option<Vec<String>>,
    /// 1-based line of the previous file the emitted window starts on.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokenized_file_context_start: Option<i64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A diagnostic reported on the previous file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DiagnosticOccurrence {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub line: i64,
    #[serde(default)]
    pub character: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokenized_message: Option<Vec<String>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The single line-level edit of a record, tagged by `ActionType`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "ActionType", content = "Action")]
pub enum ParsedDiff {
    #[serde(rename = "ADD")]
    Add(AddAction),
    #[serde(rename = "REMOVE")]
    Remove(RemoveAction),
    #[serde(rename = "REPLACE")]
    Replace(ReplaceAction),
}

/// Insert `target_lines` after 1-based line `previous_source_location`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AddAction {
    pub previous_source_location: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_lines: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokenized_target_lines: Option<Vec<String>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Delete the inclusive 1-based range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RemoveAction {
    pub source_location_start: i64,
    pub source_location_end: i64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Delete the named 1-based lines and insert `target_lines` at the first one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ReplaceAction {
    pub source_locations: Vec<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_lines: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokenized_target_lines: Option<Vec<String>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ParsedDiff {
    pub fn action_type(&self) -> &'static str {
        match self {
            ParsedDiff::Add(_) => "ADD",
            ParsedDiff::Remove(_) => "REMOVE",
            ParsedDiff::Replace(_) => "REPLACE",
        }
    }

    /// Raw inserted lines; `None` for REMOVE.
    pub fn target_lines(&self) -> Option<&[String]> {
        match self {
            ParsedDiff::Add(add) => Some(add.target_lines.as_deref().unwrap_or_default()),
            ParsedDiff::Replace(replace) => {
                Some(replace.target_lines.as_deref().unwrap_or_default())
            }
            ParsedDiff::Remove(_) => None,
        }
    }
}

impl RevisionRecord {
    /// Parse a record. Shape errors (unknown `ActionType`, missing required
    /// fields, wrong types) are reported as [`TokenizeError::MalformedRecord`].
    pub fn from_json(text: &str) -> TokenizeResult<Self> {
        serde_json::from_str(text).map_err(|e| TokenizeError::MalformedRecord(e.to_string()))
    }

    pub fn to_json_pretty(&self) -> TokenizeResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// A record carrying `TokenizedFileContext` has already been processed.
    pub fn is_tokenized(&self) -> bool {
        self.tokenized_file_context.is_some()
    }

    /// `{repo_root}/{Repo}/{FilePath}`.
    pub fn source_path(&self, repo_root: &Path) -> TokenizeResult<PathBuf> {
        let repo = self
            .repo
            .as_deref()
            .ok_or_else(|| TokenizeError::MalformedRecord("missing Repo".into()))?;
        let file_path = self
            .file_path
            .as_deref()
            .ok_or_else(|| TokenizeError::MalformedRecord("missing FilePath".into()))?;
        Ok(repo_root.join(repo).join(file_path))
    }

    /// Validated 1-based `(start, end)` of the edit in the previous file.
    pub fn required_lines(&self) -> TokenizeResult<(usize, usize)> {
        let (start, end) = match (self.required_lines_start, self.required_lines_end) {
            (Some(start), Some(end)) => (start, end),
            _ => {
                return Err(TokenizeError::MalformedRecord(
                    "missing RequiredLinesStart or RequiredLinesEnd".into(),
                ))
            }
        };
        if start < 1 || end < start {
            return Err(TokenizeError::MalformedRecord(format!(
                "invalid required line range {start}..={end}"
            )));
        }
        Ok((start as usize, end as usize))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REPLACE_RECORD: &str = r#"{
        "Repo": "acme",
        "RepoURL": "https://example.com/acme",
        "FilePath": "src/A.cs",
        "Commit": "abc",
        "DiagnosticID": "CA1822",
        "RequiredLinesStart": 3,
        "RequiredLinesEnd": 4,
        "ParsedDiff": {
            "ActionType": "REPLACE",
            "Action": { "SourceLocations": [3, 4], "TargetLines": ["x = 2;\n"], "TargetStartLocation": 3 }
        },
        "DiagnosticOccurances": [
            { "Message": "Rename 'foo'", "Line": 3, "Character": 5, "Severity": "Warning" }
        ]
    }"#;

    #[test]
    fn test_parse_replace_record() {
        let record = RevisionRecord::from_json(REPLACE_RECORD).unwrap();
        assert_eq!(record.repo.as_deref(), Some("acme"));
        assert_eq!(record.required_lines().unwrap(), (3, 4));
        assert!(!record.is_tokenized());
        match &record.parsed_diff {
            ParsedDiff::Replace(replace) => {
                assert_eq!(replace.source_locations, vec![3, 4]);
                assert_eq!(replace.extra["TargetStartLocation"], 3);
            }
            other => panic!("unexpected diff {other:?}"),
        }
        assert_eq!(record.extra["DiagnosticID"], "CA1822");
        assert_eq!(record.diagnostic_occurrences[0].extra["Severity"], "Warning");
        assert_eq!(
            record.source_path(Path::new("repos")).unwrap(),
            Path::new("repos").join("acme").join("src/A.cs")
        );
    }

    #[test]
    fn test_roundtrip_keeps_unknown_fields_and_spelling() {
        let record = RevisionRecord::from_json(REPLACE_RECORD).unwrap();
        let value: Value = serde_json::from_str(&record.to_json_pretty().unwrap()).unwrap();
        assert!(value.get("DiagnosticOccurances").is_some());
        assert_eq!(value["ParsedDiff"]["ActionType"], "REPLACE");
        assert_eq!(value["DiagnosticID"], "CA1822");
        assert!(value.get("TokenizedFileContext").is_none());
    }

    #[test]
    fn test_alias_spelling_accepted() {
        let text = r#"{
            "ParsedDiff": { "ActionType": "REMOVE", "Action": { "SourceLocationStart": 1, "SourceLocationEnd": 2 } },
            "DiagnosticOccurrences": [ { "Message": "m", "Line": 1, "Character": 0 } ]
        }"#;
        let record = RevisionRecord::from_json(text).unwrap();
        assert_eq!(record.diagnostic_occurrences.len(), 1);
        assert_eq!(record.parsed_diff.action_type(), "REMOVE");
        assert!(record.parsed_diff.target_lines().is_none());
    }

    #[test]
    fn test_unknown_action_type_is_malformed() {
        let text = r#"{ "ParsedDiff": { "ActionType": "MOVE", "Action": {} } }"#;
        let err = RevisionRecord::from_json(text).unwrap_err();
        assert_eq!(err.kind(), "malformed_record");
    }

    #[test]
    fn test_missing_required_field_is_malformed() {
        let text = r#"{ "ParsedDiff": { "ActionType": "ADD", "Action": { "TargetLines": [] } } }"#;
        assert!(matches!(
            RevisionRecord::from_json(text),
            Err(TokenizeError::MalformedRecord(_))
        ));
    }

    #[test]
    fn test_required_lines_validation() {
        let mut record = RevisionRecord::from_json(REPLACE_RECORD).unwrap();
        record.required_lines_end = Some(1);
        assert!(record.required_lines().is_err());
        record.required_lines_start = None;
        assert!(record.required_lines().is_err());
        record.repo = None;
        assert!(record.source_path(Path::new(".")).is_err());
    }
}
