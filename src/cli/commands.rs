use crate::config::ProjectConfig;
use crate::core::formula::CompiledFormula;
use crate::core::orchestrator::{PivotReportWriter, ReportSettings};
use crate::core::pivot::PivotSet;
use crate::core::report::{process_formula, ReportResultTable, RowKind};
use crate::error::{FormulaErrorContext, PivotError, PivotResult};
use crate::excel::XlsxReportWriter;
use crate::parser;
use crate::resources::{Language, ResourceStrings, ResourceTable};
use crate::types::Dataset;
use colored::Colorize;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Format a number for display, removing unnecessary decimal places
pub fn format_number(n: f64) -> String {
    let rounded = (n * 1e6).round() / 1e6;
    format!("{:.6}", rounded)
        .trim_end_matches('0')
        .trim_end_matches('.')
        .to_string()
}

/// Load the project configuration, applying a language override
fn load_config(config: &Path, language: Option<String>) -> PivotResult<ProjectConfig> {
    let project = ProjectConfig::load(config)?;
    match language {
        Some(code) => Ok(project.with_language(code.parse::<Language>()?)),
        None => Ok(project),
    }
}

fn load_data(project: &ProjectConfig) -> PivotResult<Dataset> {
    let data_file = project.data_file()?;
    parser::load_dataset(&data_file)
}

/// Execute the export command
pub fn export(
    config: PathBuf,
    output: Option<PathBuf>,
    language: Option<String>,
    verbose: bool,
) -> PivotResult<()> {
    println!("{}", "📊 xlpivot - Pivot Report Export".bold().green());
    println!("   Config: {}", config.display());

    let project = load_config(&config, language)?;
    let output = output.unwrap_or_else(|| project.output_file(chrono::Local::now()));
    println!("   Language: {}", project.language.to_string().bright_yellow());
    println!("   Output: {}\n", output.display());

    if verbose {
        println!("{}", "📖 Loading dataset...".cyan());
    }
    let dataset = load_data(&project)?;
    if verbose {
        println!(
            "   Found {} records, {} report specs, {} resource strings\n",
            dataset.criteria.len(),
            dataset.reports.len(),
            dataset.resources.len()
        );
        println!("{}", "🧮 Building reports...".cyan());
    }

    let resources = ResourceTable::new(dataset.resources);
    let settings = ReportSettings {
        language: project.language,
    };
    let writer = PivotReportWriter::new(settings, &resources);
    let mut sink = XlsxReportWriter::new(&output);
    let summary = writer.export(&dataset.criteria, &dataset.reports, &mut sink)?;

    if verbose {
        for entry in &summary.index {
            println!(
                "   {} {} = {}",
                entry.sheet_prefix.bright_blue().bold(),
                format!("({})", entry.title).dimmed(),
                entry.formula
            );
        }
        println!();
    }

    println!("{}", "✅ Export Complete!".bold().green());
    println!("   Reports written: {}", summary.reports_written);
    if summary.reports_skipped > 0 {
        println!("   Skipped (no formula): {}", summary.reports_skipped);
    }
    for name in &summary.empty_reports {
        println!(
            "{}",
            format!("   ⚠️  Report '{}' has no columns after pruning", name).yellow()
        );
    }
    println!("   Excel file: {}\n", output.display());

    Ok(())
}

#[derive(Serialize)]
struct JsonRow<'a> {
    key: &'a str,
    label: String,
    kind: RowKind,
    cells: &'a [Option<f64>],
}

#[derive(Serialize)]
struct JsonReport<'a> {
    formula: &'a str,
    language: Language,
    columns: &'a [String],
    rows: Vec<JsonRow<'a>>,
}

/// Execute the evaluate command: one formula, printed as a table
pub fn evaluate(
    config: PathBuf,
    formula: String,
    language: Option<String>,
    json: bool,
) -> PivotResult<()> {
    let project = load_config(&config, language)?;
    let dataset = load_data(&project)?;
    let pivots = PivotSet::build(&dataset.criteria)?;
    let resources = ResourceTable::new(dataset.resources);
    let table = process_formula(&pivots, &formula);
    let label = |key: &str| {
        resources
            .lookup(key, project.language)
            .unwrap_or_else(|| key.to_string())
    };

    if json {
        let report = JsonReport {
            formula: &formula,
            language: project.language,
            columns: &table.columns,
            rows: table
                .rows
                .iter()
                .map(|row| JsonRow {
                    key: &row.key,
                    label: label(&row.key),
                    kind: row.kind,
                    cells: &row.cells,
                })
                .collect(),
        };
        let text = serde_json::to_string_pretty(&report)
            .map_err(|e| PivotError::Export(format!("Failed to serialize result: {}", e)))?;
        println!("{}", text);
        return Ok(());
    }

    println!("{}", "🧮 xlpivot - Evaluate".bold().green());
    println!("   Formula: {}\n", formula.bright_blue().bold());
    print_table(&table, label);
    Ok(())
}

fn print_table(table: &ReportResultTable, label: impl Fn(&str) -> String) {
    if table.is_empty() {
        println!("{}", "⚠️  No columns with values".yellow());
        return;
    }

    let labels: Vec<String> = table.rows.iter().map(|r| label(&r.key)).collect();
    let first_width = labels.iter().map(|l| l.chars().count()).max().unwrap_or(0).max(4);

    print!("   {:<width$}", "Name", width = first_width);
    for column in &table.columns {
        print!("  {}", format!("{:>12}", column).bold());
    }
    println!();

    for (row, label) in table.rows.iter().zip(&labels) {
        print!("   {}", format!("{:<width$}", label, width = first_width).cyan());
        for cell in &row.cells {
            let text = cell.map(format_number).unwrap_or_default();
            print!("  {:>12}", text);
        }
        println!();
    }
    println!();
}

/// Execute the validate command
pub fn validate(config: PathBuf) -> PivotResult<()> {
    println!("{}", "✅ Validating project".bold().green());
    println!("   Config: {}\n", config.display());

    let project = load_config(&config, None)?;
    let dataset = match load_data(&project) {
        Ok(d) => d,
        Err(e) => {
            println!("{}", format!("❌ Dataset check failed: {}", e).bold().red());
            return Err(e);
        }
    };
    let pivots = match PivotSet::build(&dataset.criteria) {
        Ok(p) => p,
        Err(e) => {
            println!("{}", format!("❌ Pivot check failed: {}", e).bold().red());
            return Err(e);
        }
    };

    println!(
        "   {} criteria, {} rows, {} columns",
        pivots.len(),
        pivots.rows().len(),
        pivots.columns().len()
    );

    let available = pivots.criteria().to_vec();
    let mut problems = Vec::new();
    for spec in &dataset.reports {
        let Some(formula) = spec.active_formula() else {
            println!(
                "   {}",
                format!("- {} (no formula, skipped)", spec.query_name).dimmed()
            );
            continue;
        };
        let location = format!("report '{}'", spec.query_name);

        let compiled = match CompiledFormula::compile(formula) {
            Ok(c) => c,
            Err(e) => {
                problems.push(FormulaErrorContext::new(formula, location, e.to_string()));
                continue;
            }
        };

        let unknown = compiled.unknown_criteria(&pivots);
        if unknown.is_empty() {
            println!("   {} {} = {}", "✓".green(), spec.query_name.bright_blue(), formula);
            continue;
        }
        for name in unknown {
            let mut ctx = FormulaErrorContext::new(
                formula,
                location.clone(),
                format!("Unknown criterion '{}'", name),
            )
            .with_available_criteria(available.clone());
            if let Some(hint) = ctx.find_similar(name) {
                ctx = ctx.with_suggestion(hint);
            }
            problems.push(ctx);
        }
    }

    println!();
    if problems.is_empty() {
        println!("{}", "✅ All report formulas are valid!".bold().green());
        Ok(())
    } else {
        println!(
            "{}",
            format!("❌ Found {} formula problems:", problems.len())
                .bold()
                .red()
        );
        for ctx in &problems {
            println!("   {}", ctx.to_string().red());
        }
        println!();
        Err(PivotError::Validation(format!(
            "{} formula problems found",
            problems.len()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(15.0), "15");
        assert_eq!(format_number(2.5), "2.5");
        assert_eq!(format_number(1.0 / 3.0), "0.333333");
        assert_eq!(format_number(-4.0), "-4");
    }
}
