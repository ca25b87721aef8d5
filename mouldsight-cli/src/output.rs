//! Rendering of comparison results for terminals and scripts.

use anyhow::{Context, Result};
use colored::{ColoredString, Colorize};
use mouldsight_core::{ComparisonResult, Severity};
use serde::Serialize;

use crate::OutputFormat;

/// One line of batch output.
#[derive(Serialize)]
pub struct BatchEntry<'a> {
    pub candidate: String,
    #[serde(flatten)]
    pub result: &'a ComparisonResult,
}

fn severity_banner(severity: Severity) -> ColoredString {
    match severity {
        Severity::None => "║                 PASS                   ║".green().bold(),
        Severity::Minor => "║            MINOR DIFFERENCES           ║".yellow().bold(),
        Severity::Moderate => "║          MODERATE DIFFERENCES          ║".yellow().bold(),
        Severity::Major => "║            MAJOR DIFFERENCES           ║".red().bold(),
    }
}

fn frame(severity: Severity, line: &str) -> ColoredString {
    match severity {
        Severity::None => line.green(),
        Severity::Minor | Severity::Moderate => line.yellow(),
        Severity::Major => line.red(),
    }
}

/// Print a single comparison result.
pub fn print_result(result: &ComparisonResult, format: OutputFormat, quiet: bool) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", result.to_json().context("Failed to serialize result")?);
        }
        OutputFormat::Text if quiet => {}
        OutputFormat::Text => print_text(result),
    }
    Ok(())
}

/// Print a batch of results labelled by candidate.
pub fn print_batch(entries: &[BatchEntry<'_>], format: OutputFormat, quiet: bool) -> Result<()> {
    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(entries).context("Failed to serialize results")?;
            println!("{json}");
        }
        OutputFormat::Text if quiet => {}
        OutputFormat::Text => {
            for entry in entries {
                let status = match entry.result.severity() {
                    Some(Severity::None) => format!("{:<10}", "PASS").green().bold(),
                    Some(severity) => format!("{:<10}", severity.label().to_uppercase())
                        .yellow()
                        .bold(),
                    None => format!("{:<10}", "ERROR").red().bold(),
                };
                let detail = match (entry.result.similarity_score(), entry.result.error()) {
                    (Some(score), _) => format!(
                        "{score:.2}%  {} defect area(s)",
                        entry.result.defect_count().unwrap_or_default()
                    ),
                    (None, Some(error)) => error.to_string(),
                    (None, None) => String::new(),
                };
                println!("{} {}  {}", status, entry.candidate, detail.dimmed());
            }
        }
    }
    Ok(())
}

fn print_text(result: &ComparisonResult) {
    let Some(inspection) = result.inspection() else {
        println!();
        println!("{}", "╔════════════════════════════════════════╗".red());
        println!("{}", "║           COMPARISON FAILED            ║".red().bold());
        println!("{}", "╚════════════════════════════════════════╝".red());
        println!();
        println!("   {} {}", "Error:".dimmed(), result.error().unwrap_or_default().red());
        return;
    };

    let severity = inspection.severity();
    println!();
    println!("{}", frame(severity, "╔════════════════════════════════════════╗"));
    println!("{}", severity_banner(severity));
    println!("{}", frame(severity, "╚════════════════════════════════════════╝"));
    println!();
    println!("   {} {:.2}%", "Similarity:".dimmed(), inspection.similarity_score());
    println!("   {} {}", "Severity:".dimmed(), severity);
    println!("   {} {}", "Defect areas:".dimmed(), inspection.defect_count());
    if let Some(sample) = result.master_sample() {
        println!(
            "   {} {} v{} ({})",
            "Master sample:".dimmed(),
            sample.key,
            sample.version,
            &sample.image_digest[..sample.image_digest.len().min(16)]
        );
    }

    for region in inspection.defect_regions() {
        println!(
            "     {} x={} y={} {}x{} area={}px²",
            "-".dimmed(),
            region.x,
            region.y,
            region.width,
            region.height,
            region.area
        );
    }

    println!();
    println!("{}", inspection.defect_description());
    if !inspection.fix_instructions().is_empty() {
        println!();
        println!("{}", "Fix instructions:".bold());
        println!("{}", inspection.fix_instructions());
    }
}
