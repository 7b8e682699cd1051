//! Flatten tokenized records into parallel source/target text files.
//!
//! Each record becomes one line in a `src-*.txt` file and one line in the
//! matching `target-*.txt` file. Records are shuffled deterministically and
//! assigned to train, test and validation splits by running ratio.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::Serialize;
use tracing::{info, warn};

use crate::error::{TokenizeError, TokenizeResult};
use crate::pipeline::discover_json_files;
use crate::record::{ParsedDiff, RevisionRecord};

/// Split ratios; validation takes the remainder.
#[derive(Debug, Clone, Copy)]
pub struct DatasetConfig {
    pub train_ratio: f64,
    pub test_ratio: f64,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            train_ratio: 0.6,
            test_ratio: 0.2,
        }
    }
}

/// One of the three output splits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Split {
    Train,
    Test,
    Validation,
}

impl Split {
    /// File name suffix, as in `src-train.txt`.
    pub fn suffix(&self) -> &'static str {
        match self {
            Split::Train => "train",
            Split::Test => "test",
            Split::Validation => "val",
        }
    }
}

/// Counts reported by [`finalize_dataset`].
#[derive(Debug, Default, Serialize)]
pub struct DatasetSummary {
    pub discovered: usize,
    pub train: usize,
    pub test: usize,
    pub validation: usize,
    /// Records whose flattened line would contain a raw newline.
    pub bad_newlines: usize,
    /// Records without `TokenizedFileContext`.
    pub not_tokenized: usize,
    pub unreadable: usize,
}

/// `LINE <n> MESSAGE <tokens>` per diagnostic, then `FILE_CONTENT <tokens>`.
pub fn flatten_source(record: &RevisionRecord) -> TokenizeResult<String> {
    let context = record
        .tokenized_file_context
        .as_ref()
        .ok_or_else(|| TokenizeError::MalformedRecord("missing TokenizedFileContext".into()))?;

    let mut parts = Vec::new();
    for diagnostic in &record.diagnostic_occurrences {
        parts.push("LINE".to_string());
        parts.push(diagnostic.line.to_string());
        parts.push("MESSAGE".to_string());
        parts.extend(diagnostic.tokenized_message.iter().flatten().cloned());
    }
    parts.push("FILE_CONTENT".to_string());
    parts.extend(context.iter().cloned());
    Ok(parts.join(" "))
}

/// The edit in keyword form, e.g. `REPLACE SOURCE_LOCATION 2 3 TARGET_LINES ...`.
pub fn flatten_target(record: &RevisionRecord) -> String {
    let mut parts: Vec<String> = Vec::new();
    match &record.parsed_diff {
        ParsedDiff::Add(add) => {
            parts.extend(["ADD", "PREVIOUS_SOURCE_LOCATION"].map(String::from));
            parts.push(add.previous_source_location.to_string());
            parts.push("TARGET_LINES".to_string());
            parts.extend(add.tokenized_target_lines.iter().flatten().cloned());
        }
        ParsedDiff::Replace(replace) => {
            parts.extend(["REPLACE", "SOURCE_LOCATION"].map(String::from));
            parts.extend(replace.source_locations.iter().map(|l| l.to_string()));
            parts.push("TARGET_LINES".to_string());
            parts.extend(replace.tokenized_target_lines.iter().flatten().cloned());
        }
        ParsedDiff::Remove(remove) => {
            parts.extend(["REMOVE", "SOURCE_LOCATION_START"].map(String::from));
            parts.push(remove.source_location_start.to_string());
            parts.push("SOURCE_LOCATION_END".to_string());
            parts.push(remove.source_location_end.to_string());
        }
    }
    parts.join(" ")
}

/// Split for the next record given how many each split already holds.
fn next_split(train: usize, test: usize, total: usize, config: &DatasetConfig) -> Split {
    let total = total.max(1) as f64;
    if (train as f64 / total) < config.train_ratio {
        Split::Train
    } else if (test as f64 / total) < config.test_ratio {
        Split::Test
    } else {
        Split::Validation
    }
}

struct SplitWriter {
    source: BufWriter<File>,
    target: BufWriter<File>,
}

impl SplitWriter {
    fn create(output_dir: &Path, split: Split) -> TokenizeResult<Self> {
        let open = |prefix: &str| {
            let path = output_dir.join(format!("{prefix}-{}.txt", split.suffix()));
            File::create(&path)
                .map(BufWriter::new)
                .map_err(|e| TokenizeError::io(path, e))
        };
        Ok(Self {
            source: open("src")?,
            target: open("target")?,
        })
    }

    fn write(&mut self, output_dir: &Path, source: &str, target: &str) -> TokenizeResult<()> {
        writeln!(self.source, "{source}")
            .and_then(|_| writeln!(self.target, "{target}"))
            .map_err(|e| TokenizeError::io(output_dir, e))
    }

    fn flush(&mut self, output_dir: &Path) -> TokenizeResult<()> {
        self.source
            .flush()
            .and_then(|_| self.target.flush())
            .map_err(|e| TokenizeError::io(output_dir, e))
    }
}

/// Write `src-{train,test,val}.txt` and `target-{train,test,val}.txt`.
pub fn finalize_dataset(
    tokenized_dir: &Path,
    output_dir: &Path,
    config: &DatasetConfig,
) -> TokenizeResult<DatasetSummary> {
    let files = discover_json_files(tokenized_dir)?;
    fs::create_dir_all(output_dir).map_err(|e| TokenizeError::io(output_dir, e))?;

    let mut summary = DatasetSummary {
        discovered: files.len(),
        ..Default::default()
    };

    let mut lines = Vec::new();
    for path in &files {
        let record = match fs::read_to_string(path)
            .map_err(|e| TokenizeError::io(path, e))
            .and_then(|text| RevisionRecord::from_json(&text))
        {
            Ok(record) => record,
            Err(e) => {
                warn!(file = ?path, error = %e, "unreadable record");
                summary.unreadable += 1;
                continue;
            }
        };
        let Ok(source) = flatten_source(&record) else {
            summary.not_tokenized += 1;
            continue;
        };
        let target = flatten_target(&record);
        if source.contains('\n') || target.contains('\n') {
            warn!(file = ?path, "raw newline in flattened record");
            summary.bad_newlines += 1;
            continue;
        }
        lines.push((path.file_name().map(|n| n.to_os_string()), source, target));
    }

    // Index-hash order, stable across runs
    let mut shuffled: Vec<_> = lines.into_iter().enumerate().collect();
    shuffled.sort_by(|(i, a), (j, b)| {
        let hash_a = (i * 2654435761) % 1000;
        let hash_b = (j * 2654435761) % 1000;
        hash_a.cmp(&hash_b).then_with(|| a.0.cmp(&b.0))
    });

    let mut writers = [
        SplitWriter::create(output_dir, Split::Train)?,
        SplitWriter::create(output_dir, Split::Test)?,
        SplitWriter::create(output_dir, Split::Validation)?,
    ];
    let total = shuffled.len();
    for (_, (_, source, target)) in shuffled {
        let (writer, count) = match next_split(summary.train, summary.test, total, config) {
            Split::Train => (&mut writers[0], &mut summary.train),
            Split::Test => (&mut writers[1], &mut summary.test),
            Split::Validation => (&mut writers[2], &mut summary.validation),
        };
        writer.write(output_dir, &source, &target)?;
        *count += 1;
    }
    for writer in &mut writers {
        writer.flush(output_dir)?;
    }

    info!(
        train = summary.train,
        test = summary.test,
        validation = summary.validation,
        bad_newlines = summary.bad_newlines,
        "dataset written"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn tokenized(action: &str, context: &str) -> String {
        format!(
            r#"{{
                "ParsedDiff": {action},
                "DiagnosticOccurances": [
                    {{ "Line": -1, "Character": 3, "TokenizedMessage": ["make", "VAR0", "static", "."] }}
                ],
                "TokenizedFileContext": {context},
                "TokenizedFileContextStart": 4
            }}"#
        )
    }

    const REPLACE: &str = r#"{ "ActionType": "REPLACE",
        "Action": { "SourceLocations": [2, 3], "TokenizedTargetLines": ["VAR0", ";"] } }"#;
    const REMOVE: &str = r#"{ "ActionType": "REMOVE",
        "Action": { "SourceLocationStart": 0, "SourceLocationEnd": 12 } }"#;
    const ADD: &str = r#"{ "ActionType": "ADD",
        "Action": { "PreviousSourceLocation": 1, "TokenizedTargetLines": ["VAR1"] } }"#;

    #[test]
    fn test_flatten_source_and_target() {
        let record =
            RevisionRecord::from_json(&tokenized(REPLACE, r#"["VAR0", ";", "EndOfLineTrivia"]"#))
                .unwrap();
        assert_eq!(
            flatten_source(&record).unwrap(),
            "LINE -1 MESSAGE make VAR0 static . FILE_CONTENT VAR0 ; EndOfLineTrivia"
        );
        assert_eq!(
            flatten_target(&record),
            "REPLACE SOURCE_LOCATION 2 3 TARGET_LINES VAR0 ;"
        );
    }

    #[test]
    fn test_flatten_remove_keeps_whole_numbers() {
        let record = RevisionRecord::from_json(&tokenized(REMOVE, r#"["x"]"#)).unwrap();
        assert_eq!(
            flatten_target(&record),
            "REMOVE SOURCE_LOCATION_START 0 SOURCE_LOCATION_END 12"
        );
        let record = RevisionRecord::from_json(&tokenized(ADD, r#"["x"]"#)).unwrap();
        assert_eq!(
            flatten_target(&record),
            "ADD PREVIOUS_SOURCE_LOCATION 1 TARGET_LINES VAR1"
        );
    }

    #[test]
    fn test_split_assignment_by_running_ratio() {
        let config = DatasetConfig::default();
        let mut counts = (0, 0, 0);
        for _ in 0..10 {
            match next_split(counts.0, counts.1, 10, &config) {
                Split::Train => counts.0 += 1,
                Split::Test => counts.1 += 1,
                Split::Validation => counts.2 += 1,
            }
        }
        assert_eq!(counts, (6, 2, 2));
    }

    #[test]
    fn test_finalize_writes_all_splits() {
        let temp = TempDir::new().unwrap();
        let input = temp.path().join("tokenized");
        fs::create_dir_all(&input).unwrap();
        for i in 0..10 {
            let action = [REPLACE, REMOVE, ADD][i % 3];
            fs::write(
                input.join(format!("r{i:02}.json")),
                tokenized(action, r#"["VAR0", ";"]"#),
            )
            .unwrap();
        }
        fs::write(
            input.join("multiline.json"),
            tokenized(ADD, r#"["@\"a\nb\""]"#),
        )
        .unwrap();
        fs::write(
            input.join("raw.json"),
            r#"{ "ParsedDiff": { "ActionType": "REMOVE", "Action": { "SourceLocationStart": 1, "SourceLocationEnd": 1 } } }"#,
        )
        .unwrap();
        fs::write(input.join("broken.json"), "{").unwrap();

        let output = temp.path().join("final");
        let summary = finalize_dataset(&input, &output, &DatasetConfig::default()).unwrap();
        assert_eq!(summary.discovered, 13);
        assert_eq!((summary.train, summary.test, summary.validation), (6, 2, 2));
        assert_eq!(summary.bad_newlines, 1);
        assert_eq!(summary.not_tokenized, 1);
        assert_eq!(summary.unreadable, 1);

        for (split, expected) in [("train", 6), ("test", 2), ("val", 2)] {
            let source = fs::read_to_string(output.join(format!("src-{split}.txt"))).unwrap();
            let target = fs::read_to_string(output.join(format!("target-{split}.txt"))).unwrap();
            assert_eq!(source.lines().count(), expected);
            assert_eq!(target.lines().count(), expected);
            assert!(source.lines().all(|l| l.starts_with("LINE -1 MESSAGE")));
        }
    }

    #[test]
    fn test_finalize_is_deterministic() {
        let temp = TempDir::new().unwrap();
        let input = temp.path().join("tokenized");
        fs::create_dir_all(&input).unwrap();
        for i in 0..7 {
            let context = format!(r#"["VAR{i}"]"#);
            fs::write(input.join(format!("r{i}.json")), tokenized(ADD, &context)).unwrap();
        }
        let first = temp.path().join("a");
        let second = temp.path().join("b");
        finalize_dataset(&input, &first, &DatasetConfig::default()).unwrap();
        finalize_dataset(&input, &second, &DatasetConfig::default()).unwrap();
        for name in ["src-train.txt", "src-test.txt", "src-val.txt"] {
            assert_eq!(
                fs::read_to_string(first.join(name)).unwrap(),
                fs::read_to_string(second.join(name)).unwrap()
            );
        }
    }
}
