//! Offline batch predictor
//!
//! Scores every row of a spreadsheet with the same pipeline the bulk endpoint
//! uses, prints a summary and writes the original columns plus
//! `predicted_revenue` to a new workbook.
//!
//! **Usage:**
//! ```bash
//! revpred-batch companies.xlsx [--model model/revenue_model.json] [--output out.xlsx]
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use revpred_api::features::{ColumnMap, InputField};
use revpred_api::model::load_model;
use revpred_api::predict::bulk::{predict_table, BulkPrediction};
use revpred_api::predict::PREDICTION_COLUMN;
use revpred_api::table::{is_spreadsheet_filename, read_spreadsheet, write_xlsx};
use revpred_common::config::DEFAULT_MODEL_PATH;
use tracing::info;

const DEFAULT_OUTPUT_NAME: &str = "predictions_output.xlsx";

/// Revenue prediction over a spreadsheet
#[derive(Parser, Debug)]
#[command(name = "revpred-batch")]
#[command(about = "Predict revenue for every row of an Excel file")]
#[command(version)]
struct Args {
    /// Input spreadsheet (.xlsx or .xls)
    input: PathBuf,

    /// Model artifact (JSON)
    #[arg(short, long, env = "REVPRED_MODEL_PATH", default_value = DEFAULT_MODEL_PATH)]
    model: PathBuf,

    /// Output workbook [default: predictions_output.xlsx next to the input]
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Number of predictions to print
    #[arg(long, default_value = "10")]
    preview: usize,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let name = args
        .input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    if !is_spreadsheet_filename(&name) {
        return Err(revpred_common::Error::InvalidInput(format!(
            "{} is not an Excel file (.xlsx or .xls)",
            args.input.display()
        ))
        .into());
    }

    let loaded = load_model(&args.model)?;

    info!("Loading data from {}...", args.input.display());
    let bytes = std::fs::read(&args.input)
        .with_context(|| format!("Failed to read {}", args.input.display()))?;
    let table = read_spreadsheet(&bytes)?;
    info!("Loaded {} records", table.len());

    let result = predict_table(loaded.predictor.as_ref(), &table)?;

    print_summary(&result);
    print_preview(&result, args.preview);

    let output = args
        .output
        .unwrap_or_else(|| default_output_path(&args.input));
    write_xlsx(&result.table, &output)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    println!("\n✓ Predictions saved to: {}", output.display());

    Ok(())
}

fn default_output_path(input: &Path) -> PathBuf {
    input
        .parent()
        .unwrap_or_else(|| Path::new(""))
        .join(DEFAULT_OUTPUT_NAME)
}

fn print_summary(result: &BulkPrediction) {
    let stats = &result.statistics;
    println!("{}", "=".repeat(50));
    println!("Prediction Results");
    println!("{}", "=".repeat(50));
    println!("\nTotal predictions: {}", stats.count);
    println!("Mean predicted revenue: {}", format_currency(stats.mean));
    println!("Median predicted revenue: {}", format_currency(stats.median));
    println!("Min predicted revenue: {}", format_currency(stats.min));
    println!("Max predicted revenue: {}", format_currency(stats.max));
}

/// Print the first `limit` rows, showing only the model's input columns
fn print_preview(result: &BulkPrediction, limit: usize) {
    if limit == 0 {
        return;
    }
    let table = &result.table;
    let map = ColumnMap::resolve(table.columns());

    let mut columns: Vec<usize> = InputField::ALL
        .iter()
        .filter_map(|field| map.get(*field))
        .collect();
    if let Some(predicted) = table.columns().iter().position(|c| c == PREDICTION_COLUMN) {
        columns.push(predicted);
    }

    let header: Vec<String> = columns.iter().map(|&c| table.columns()[c].clone()).collect();
    let body: Vec<Vec<String>> = table
        .rows()
        .iter()
        .take(limit)
        .map(|row| {
            columns
                .iter()
                .map(|&c| row[c].as_text().unwrap_or_default())
                .collect()
        })
        .collect();

    let widths: Vec<usize> = (0..header.len())
        .map(|i| {
            body.iter()
                .map(|r| r[i].chars().count())
                .chain(std::iter::once(header[i].chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    println!("\n{}", "-".repeat(50));
    println!("First {} Predictions:", body.len());
    println!("{}", "-".repeat(50));
    for line in std::iter::once(&header).chain(body.iter()) {
        let cells: Vec<String> = line
            .iter()
            .zip(&widths)
            .map(|(cell, width)| format!("{:>width$}", cell, width = width))
            .collect();
        println!("{}", cells.join("  "));
    }
}

/// `$1,234,567.89`
fn format_currency(value: f64) -> String {
    let formatted = format!("{:.2}", value.abs());
    let (whole, cents) = formatted.split_once('.').unwrap_or((formatted.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if value < 0.0 { "-" } else { "" };
    format!("{}${}.{}", sign, grouped, cents)
}
