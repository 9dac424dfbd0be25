//! Command-line argument definitions using clap

use clap::Parser;
use std::path::PathBuf;

/// medsift - classify medical survey records and flag statistical outliers
#[derive(Parser, Debug)]
#[command(name = "medsift")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Input survey CSV file
    #[arg(short, long)]
    pub input: PathBuf,

    /// Column mapping JSON file: one source column per canonical field
    /// (case_id, age, sex, consent, weight, height, bmi, date, completed,
    /// test_flag, bmi_index)
    #[arg(short, long)]
    pub mapping: PathBuf,

    /// Output file path for the enriched CSV.
    /// Defaults to the input directory with an '_analyzed' suffix
    /// (e.g., cases.csv → cases_analyzed.csv).
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Optional JSON analysis report path
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// RNG seed for the isolation forest (fixed seed = reproducible runs)
    #[arg(long, default_value = "42")]
    pub seed: u64,

    /// Number of trees in the isolation forest
    #[arg(long, default_value = "100")]
    pub trees: usize,

    /// Number of rows to use for schema inference.
    /// Use 0 for a full table scan (slow for large files).
    #[arg(long, default_value = "10000")]
    pub infer_schema_length: usize,
}

impl Cli {
    /// Get the output path, deriving from input if not explicitly provided.
    pub fn output_path(&self) -> PathBuf {
        self.output.clone().unwrap_or_else(|| {
            let parent = self
                .input
                .parent()
                .unwrap_or_else(|| std::path::Path::new("."));
            let stem = self
                .input
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("output");
            parent.join(format!("{}_analyzed.csv", stem))
        })
    }
}
