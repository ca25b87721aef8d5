//! Catalog command implementation.

use anyhow::{Context, Result};
use colored::Colorize;
use mouldsight_core::{DefectCatalog, DefectCatalogEntry, InspectionError};

use crate::exit_codes::ExitCode;
use crate::OutputFormat;

/// Execute the catalog command.
pub fn execute(name: Option<String>, format: OutputFormat, quiet: bool) -> Result<ExitCode> {
    let catalog = DefectCatalog::standard();

    let Some(name) = name else {
        match format {
            OutputFormat::Json => {
                let json = serde_json::to_string_pretty(catalog.entries())
                    .context("Failed to serialize catalog")?;
                println!("{json}");
            }
            OutputFormat::Text if quiet => {}
            OutputFormat::Text => {
                for entry in catalog.entries() {
                    println!("{} {}", format!("{:<14}", entry.key).bold(), entry.name);
                }
            }
        }
        return Ok(ExitCode::success());
    };

    let entry = catalog
        .get(&name)
        .ok_or_else(|| InspectionError::Catalog(format!("no defect named '{name}'")))?;

    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(entry).context("Failed to serialize entry")?;
            println!("{json}");
        }
        OutputFormat::Text if quiet => {}
        OutputFormat::Text => print_entry(entry),
    }
    Ok(ExitCode::success())
}

fn print_entry(entry: &DefectCatalogEntry) {
    println!();
    println!("{} {}", entry.name.bold(), format!("({})", entry.key).dimmed());
    println!("{}", entry.description);

    let sections = [("Causes:", &entry.causes), ("Fix steps:", &entry.fix_steps)];
    for (title, items) in sections {
        if items.is_empty() {
            continue;
        }
        println!();
        println!("{}", title.bold());
        for (i, item) in items.iter().enumerate() {
            println!("  {}. {}", i + 1, item);
        }
    }

    if !entry.machine_adjustments.is_empty() {
        println!();
        println!("{}", "Machine adjustments:".bold());
        for adjustment in &entry.machine_adjustments {
            println!("  - {adjustment}");
        }
    }
}
