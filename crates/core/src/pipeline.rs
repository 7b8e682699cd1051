//! Batch driver: tokenize every record of an input directory in parallel.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::canonical::CanonicalizerConfig;
use crate::error::{TokenizeError, TokenizeResult};
use crate::record::RevisionRecord;
use crate::revision::tokenize_revision;
use crate::{SourceParser, DEFAULT_TOKEN_BUDGET};

/// Directory holding one checkout per `Repo` value.
pub const DEFAULT_REPO_ROOT: &str = "submodule_repos_to_analyze";

/// Configuration for the tokenization pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub repo_root: PathBuf,
    /// Maximum number of tokens in the previous-file window.
    pub token_budget: usize,
    /// Worker threads; `None` uses one per core.
    pub threads: Option<usize>,
    /// Re-tokenize inputs whose output file already exists.
    pub overwrite: bool,
    pub canonicalizer: CanonicalizerConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            repo_root: PathBuf::from(DEFAULT_REPO_ROOT),
            token_budget: DEFAULT_TOKEN_BUDGET,
            threads: None,
            overwrite: false,
            canonicalizer: CanonicalizerConfig::default(),
        }
    }
}

/// What happened to one input file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOutcome {
    Written { unresolved_identifiers: usize },
    /// The input already carries `TokenizedFileContext`.
    SkippedTokenized,
    /// An output with the same name exists from an earlier run.
    SkippedExisting,
}

/// Totals for one batch run.
#[derive(Debug, Default, Serialize)]
pub struct BatchSummary {
    pub discovered: usize,
    pub written: usize,
    pub skipped_tokenized: usize,
    pub skipped_existing: usize,
    pub rejected: usize,
    pub rejected_by_kind: BTreeMap<String, usize>,
    pub unresolved_identifiers: usize,
}

impl BatchSummary {
    fn record(&mut self, outcome: &TokenizeResult<FileOutcome>) {
        match outcome {
            Ok(FileOutcome::Written {
                unresolved_identifiers,
            }) => {
                self.written += 1;
                self.unresolved_identifiers += unresolved_identifiers;
            }
            Ok(FileOutcome::SkippedTokenized) => self.skipped_tokenized += 1,
            Ok(FileOutcome::SkippedExisting) => self.skipped_existing += 1,
            Err(e) => {
                self.rejected += 1;
                *self.rejected_by_kind.entry(e.kind().to_string()).or_default() += 1;
            }
        }
    }
}

/// `*.json` files directly inside `dir`, sorted by name.
pub fn discover_json_files(dir: &Path) -> TokenizeResult<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|e| TokenizeError::io(dir, e.into()))?;
        let path = entry.path();
        if entry.file_type().is_file() && path.extension().is_some_and(|ext| ext == "json") {
            files.push(path.to_path_buf());
        }
    }
    Ok(files)
}

/// Tokenize one record file into `output_dir` under the same file name.
pub fn process_file<P: SourceParser>(
    input_path: &Path,
    output_dir: &Path,
    parser: &P,
    config: &PipelineConfig,
) -> TokenizeResult<FileOutcome> {
    let file_name = input_path
        .file_name()
        .ok_or_else(|| TokenizeError::MalformedRecord(format!("no file name in {input_path:?}")))?;
    let output_path = output_dir.join(file_name);
    if !config.overwrite && output_path.exists() {
        debug!(path = ?output_path, "output exists, skipping");
        return Ok(FileOutcome::SkippedExisting);
    }

    let text = fs::read_to_string(input_path).map_err(|e| TokenizeError::io(input_path, e))?;
    let record = RevisionRecord::from_json(&text)?;
    if record.is_tokenized() {
        debug!(path = ?input_path, "already tokenized, skipping");
        return Ok(FileOutcome::SkippedTokenized);
    }

    let source_path = record.source_path(&config.repo_root)?;
    let previous_text =
        fs::read_to_string(&source_path).map_err(|e| TokenizeError::io(&source_path, e))?;

    let derived = tokenize_revision(&record, &previous_text, parser, config)?;
    let unresolved_identifiers = derived.unresolved_identifiers;
    let tokenized = record.into_tokenized(derived);

    fs::write(&output_path, tokenized.to_json_pretty()?)
        .map_err(|e| TokenizeError::io(&output_path, e))?;
    info!(file = ?file_name, unresolved_identifiers, "written");

    Ok(FileOutcome::Written {
        unresolved_identifiers,
    })
}

/// Process every record of `input_dir` in parallel.
///
/// Per-record failures are logged and counted in the summary. Only a missing
/// input directory, an uncreatable output directory or a thread pool that
/// cannot start abort the run.
pub fn process_directory<P>(
    input_dir: &Path,
    output_dir: &Path,
    parser: &P,
    config: &PipelineConfig,
) -> TokenizeResult<BatchSummary>
where
    P: SourceParser + Sync,
{
    let files = discover_json_files(input_dir)?;
    fs::create_dir_all(output_dir).map_err(|e| TokenizeError::io(output_dir, e))?;

    let total_files = files.len();
    info!(total_files, input = ?input_dir, output = ?output_dir, "starting batch");

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.threads.unwrap_or(0))
        .build()?;
    let processed_count = AtomicUsize::new(0);

    let outcomes: Vec<TokenizeResult<FileOutcome>> = pool.install(|| {
        files
            .par_iter()
            .map(|path| {
                let outcome = process_file(path, output_dir, parser, config);
                let count = processed_count.fetch_add(1, Ordering::Relaxed) + 1;
                if let Err(e) = &outcome {
                    warn!(file = ?path, kind = e.kind(), error = %e, "record rejected");
                }
                if count % 100 == 0 || count == total_files {
                    info!("processed {count}/{total_files} records");
                }
                outcome
            })
            .collect()
    });

    let mut summary = BatchSummary {
        discovered: total_files,
        ..Default::default()
    };
    for outcome in &outcomes {
        summary.record(outcome);
    }
    info!(
        written = summary.written,
        rejected = summary.rejected,
        skipped = summary.skipped_tokenized + summary.skipped_existing,
        "batch finished"
    );

    Ok(summary)
}
