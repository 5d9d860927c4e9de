use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use std::process::ExitCode;
use xlpivot::cli;
use xlpivot::error::PivotResult;
use xlpivot::logging;

#[derive(Parser)]
#[command(name = "xlpivot")]
#[command(about = "Criterion pivots and formula reports, written to Excel.")]
#[command(long_about = "xlpivot - Pivot and formula report engine

Reads a flat table of criterion observations (workbook or YAML), builds one
cross-tabulation per criterion, evaluates the formula of every configured
report over them and writes a formatted workbook: a data sheet and a line
chart per report, plus an Index sheet.

COMMANDS:
  export    - Build every report and write the workbook
  evaluate  - Print the result table of one formula
  validate  - Check the dataset and every report formula

EXAMPLES:
  xlpivot export project.yaml
  xlpivot export project.yaml -l DE -o reports/league.xlsx
  xlpivot evaluate project.yaml \"(C_2 + C_3) / C_1\"
  xlpivot evaluate project.yaml C_1 --json
  xlpivot validate project.yaml")]
#[command(version)]
struct Cli {
    /// Enable debug logging (RUST_LOG overrides)
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(long_about = "Build every report and write the workbook.

The output file defaults to
  {output dir}/{project name}_pivots_{LANG}_{YYYYMMDD_HHMMSS}.xlsx

Reports without a formula are skipped. Duplicate (criterion, row, column)
records abort the run before anything is written.")]
    /// Build every report and write the workbook
    Export {
        /// Path to the project configuration (YAML)
        config: PathBuf,

        /// Output workbook (.xlsx)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Report language (EN, DE, FR, IT); overrides the configuration
        #[arg(short, long, env = "XLPIVOT_LANGUAGE")]
        language: Option<String>,

        /// Show verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Print the result table of one formula
    Evaluate {
        /// Path to the project configuration (YAML)
        config: PathBuf,

        /// Formula over criterion keys, e.g. \"C_1 + C_2\"
        formula: String,

        /// Language for row labels (EN, DE, FR, IT)
        #[arg(short, long, env = "XLPIVOT_LANGUAGE")]
        language: Option<String>,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Check the dataset and every report formula
    Validate {
        /// Path to the project configuration (YAML)
        config: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.debug);

    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", "❌ Error:".bold().red(), e);
            ExitCode::FAILURE
        }
    }
}

fn run(command: Commands) -> PivotResult<()> {
    match command {
        Commands::Export {
            config,
            output,
            language,
            verbose,
        } => cli::export(config, output, language, verbose),

        Commands::Evaluate {
            config,
            formula,
            language,
            json,
        } => cli::evaluate(config, formula, language, json),

        Commands::Validate { config } => cli::validate(config),
    }
}
