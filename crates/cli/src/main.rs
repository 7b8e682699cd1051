//! CLI tool for tokenizing mined revision records.
//!
//! `tokenize` turns a directory of revision records into window-relative,
//! canonicalized training examples; `finalize` flattens the tokenized records
//! into source/target text splits. Logs go to stderr, the JSON summary to
//! stdout.

use std::path::PathBuf;

use anyhow::{ensure, Context, Result};
use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use revision_tokenizer_core::{
    finalize_dataset, process_directory, CSharpParser, CanonicalizerConfig, DatasetConfig,
    PipelineConfig, DEFAULT_REPO_ROOT, DEFAULT_TOKEN_BUDGET,
};

/// Tokenize revision records into fixed-size training windows.
#[derive(Parser, Debug)]
#[command(name = "revision-tokenize")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Tokenize every `*.json` record of a directory
    Tokenize {
        /// Directory of revision records
        input_dir: PathBuf,

        /// Directory for tokenized records (created if absent)
        output_dir: PathBuf,

        /// Directory holding one checkout per record `Repo`
        #[arg(long, default_value = DEFAULT_REPO_ROOT)]
        repo_root: PathBuf,

        /// Number of tokens in the previous-file window
        #[arg(long, default_value_t = DEFAULT_TOKEN_BUDGET)]
        token_budget: usize,

        /// Worker threads (defaults to one per core)
        #[arg(long)]
        threads: Option<usize>,

        /// Re-tokenize records whose output already exists
        #[arg(long)]
        overwrite: bool,

        /// Extra identifier kept verbatim (repeatable)
        #[arg(long = "preserve", value_name = "IDENT")]
        preserve: Vec<String>,
    },

    /// Split tokenized records into src/target train, test and validation files
    Finalize {
        /// Directory of tokenized records
        tokenized_dir: PathBuf,

        /// Directory for the text splits
        output_dir: PathBuf,

        /// Fraction of records for training (0.0-1.0)
        #[arg(long, default_value = "0.6")]
        train_ratio: f64,

        /// Fraction of records for testing (0.0-1.0)
        #[arg(long, default_value = "0.2")]
        test_ratio: f64,
    },
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging();

    match args.command {
        Command::Tokenize {
            input_dir,
            output_dir,
            repo_root,
            token_budget,
            threads,
            overwrite,
            preserve,
        } => {
            ensure!(token_budget > 0, "--token-budget must be positive");
            let mut canonicalizer = CanonicalizerConfig::default();
            canonicalizer.preserved_identifiers.extend(preserve);

            let config = PipelineConfig {
                repo_root,
                token_budget,
                threads,
                overwrite,
                canonicalizer,
            };
            debug!(?config, "pipeline configuration");
            let summary = process_directory(&input_dir, &output_dir, &CSharpParser, &config)
                .with_context(|| format!("tokenizing records from {}", input_dir.display()))?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Command::Finalize {
            tokenized_dir,
            output_dir,
            train_ratio,
            test_ratio,
        } => {
            ensure!(
                (0.0..=1.0).contains(&train_ratio)
                    && (0.0..=1.0).contains(&test_ratio)
                    && train_ratio + test_ratio <= 1.0,
                "ratios must lie in [0, 1] and sum to at most 1"
            );
            let config = DatasetConfig {
                train_ratio,
                test_ratio,
            };
            debug!(?config, "dataset configuration");
            let summary = finalize_dataset(&tokenized_dir, &output_dir, &config)
                .with_context(|| format!("finalizing dataset from {}", tokenized_dir.display()))?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
    }

    Ok(())
}
