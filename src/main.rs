//! medsift: Survey Data-Quality CLI
//!
//! Loads a survey CSV and an operator column mapping, runs the two-layer
//! quality pipeline and writes the enriched table plus an optional JSON
//! report.

use std::time::Instant;

use anyhow::Result;
use clap::Parser;
use console::style;

use medsift::cli::Cli;
use medsift::pipeline::{
    dataset_stats, load_survey, run_analysis, AnalysisConfig, ColumnMapping,
};
use medsift::report::{export_analysis, write_enriched_csv, ExportParams};
use medsift::utils::{
    create_spinner, finish_with_success, finish_with_warning, print_banner, print_completion,
    print_config, print_count, print_info, print_step_header, print_success, print_warning,
};

fn main() -> Result<()> {
    let cli = Cli::parse();
    let output_path = cli.output_path();

    print_banner(env!("CARGO_PKG_VERSION"));
    print_config(&cli.input, &cli.mapping, &output_path, cli.seed);

    // Step 1: Load dataset
    print_step_header(1, "Load Survey");
    let step_start = Instant::now();
    let spinner = create_spinner("Reading CSV...");
    let df = load_survey(&cli.input, cli.infer_schema_length)?;
    finish_with_success(&spinner, "Dataset loaded");

    let (rows, cols, memory_mb) = dataset_stats(&df);
    println!("\n    {} Dataset Statistics:", style("✧").cyan());
    println!("      Rows: {}", rows);
    println!("      Columns: {}", cols);
    println!("      Estimated memory: {:.2} MB", memory_mb);
    println!("      Loaded in {:.2?}", step_start.elapsed());

    // Step 2: Column mapping
    print_step_header(2, "Column Mapping");
    let mapping = ColumnMapping::from_json_file(&cli.mapping)?;
    print_success("Mapping loaded, all canonical fields present");

    // Step 3: Analysis
    print_step_header(3, "Quality Analysis");
    let step_start = Instant::now();
    let config = AnalysisConfig {
        seed: cli.seed,
        trees: cli.trees,
        ..AnalysisConfig::default()
    };
    let report = run_analysis(&df, &mapping, &config)?;

    if !report.coverage.is_complete() {
        let missing: Vec<String> = report
            .coverage
            .missing
            .iter()
            .map(|f| f.to_string())
            .collect();
        print_warning(&format!(
            "Columns not found for: {} (affected fields read as missing)",
            missing.join(", ")
        ));
    }

    print_count("record(s) analyzed", report.records.len(), None);
    print_count(
        "duplicate(s) within one hour",
        report.duplicates_flagged,
        None,
    );
    if report.outlier.skipped {
        print_info("Outlier model skipped: fewer than 2 complete Valid records");
    } else {
        print_count(
            "statistical outlier(s) demoted",
            report.outlier.demoted,
            Some(&format!("(contamination {:.2})", report.contamination)),
        );
    }
    println!("      Analyzed in {:.2?}", step_start.elapsed());

    // Step 4: Save results
    print_step_header(4, "Save Results");
    let spinner = create_spinner("Writing enriched CSV...");
    write_enriched_csv(&report.records, &output_path)?;
    finish_with_success(
        &spinner,
        &format!("Saved to {}", output_path.display()),
    );

    if let Some(report_path) = &cli.report {
        let spinner = create_spinner("Writing JSON report...");
        let input_file = cli.input.display().to_string();
        let params = ExportParams {
            input_file: &input_file,
            seed: cli.seed,
            trees: cli.trees,
        };
        match export_analysis(&report, report_path, &params) {
            Ok(()) => finish_with_success(
                &spinner,
                &format!("Report saved to {}", report_path.display()),
            ),
            Err(err) => {
                finish_with_warning(&spinner, &format!("Report not written: {}", err));
            }
        }
    }

    // Display summary
    report
        .summary
        .display(report.duplicates_flagged, report.outlier.demoted);

    print_completion();

    Ok(())
}
