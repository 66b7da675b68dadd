//! keydiff - Identifier-based diff for spreadsheet snapshots

use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use termcolor::NoColor;

use keydiff::config::{Config, OutputFormat};
use keydiff::diff::compare;
use keydiff::logging::init_logging;
use keydiff::output::{render_to_stdout, OutputFactory, OutputFormatter, Report};
use keydiff::parser::ParserFactory;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliOutputFormat {
    Terminal,
    Json,
    Html,
}

impl From<CliOutputFormat> for OutputFormat {
    fn from(f: CliOutputFormat) -> Self {
        match f {
            CliOutputFormat::Terminal => OutputFormat::Terminal,
            CliOutputFormat::Json => OutputFormat::Json,
            CliOutputFormat::Html => OutputFormat::Html,
        }
    }
}

/// Compare two spreadsheet snapshots record by record using an identifier column
#[derive(Parser, Debug)]
#[command(name = "keydiff")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Old/original file to compare
    old_file: PathBuf,

    /// New file to compare
    new_file: PathBuf,

    /// Identifier column: header name or column letter (A, B, AA)
    #[arg(short = 'c', long)]
    id_column: Option<String>,

    /// Match identifiers and compare text ignoring case
    #[arg(long)]
    case_insensitive: bool,

    /// Fail when the identifier column is not found instead of auto-detecting
    #[arg(long)]
    strict: bool,

    /// For Excel files: which sheet to compare
    #[arg(short, long)]
    sheet: Option<String>,

    /// Column(s) to ignore in comparison (comma-separated)
    #[arg(long, value_delimiter = ',')]
    ignore_column: Vec<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "terminal")]
    format: CliOutputFormat,

    /// Write the report to a file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Only show statistics, not detailed changes
    #[arg(long)]
    stats_only: bool,

    /// JSON file with comparison options; command-line flags take precedence
    #[arg(long)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

impl Cli {
    fn build_config(&self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::from_file(path)?,
            None => Config::new(),
        };

        if let Some(column) = &self.id_column {
            config = config.with_id_column(column.clone());
        }
        if self.case_insensitive {
            config = config.with_case_sensitive(false);
        }
        if self.strict {
            config = config.with_strict_key_resolution(true);
        }
        if let Some(sheet) = &self.sheet {
            config = config.with_sheet_name(sheet.clone());
        }
        if !self.ignore_column.is_empty() {
            config = config.with_ignore_columns(self.ignore_column.clone());
        }

        Ok(config)
    }
}

fn main() -> ExitCode {
    match run() {
        Ok(has_changes) => {
            if has_changes {
                ExitCode::from(1) // Differences found
            } else {
                ExitCode::SUCCESS // No differences
            }
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(2)
        }
    }
}

fn run() -> Result<bool> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet)?;

    let config = cli.build_config()?;
    tracing::debug!(?config, "comparison options");

    // Parse both files in parallel
    let factory = ParserFactory::new();
    let (old_table, new_table) = rayon::join(
        || {
            factory
                .parse(&cli.old_file, &config)
                .with_context(|| format!("Failed to parse old file: {}", cli.old_file.display()))
        },
        || {
            factory
                .parse(&cli.new_file, &config)
                .with_context(|| format!("Failed to parse new file: {}", cli.new_file.display()))
        },
    );
    let (old_table, new_table) = (old_table?, new_table?);

    let result = compare(&old_table, &new_table, &config)?;
    tracing::info!(
        added = result.counts.added,
        removed = result.counts.removed,
        modified = result.counts.modified,
        unchanged = result.counts.unchanged,
        "comparison finished"
    );

    let report = Report {
        result: &result,
        old_table: &old_table,
        new_table: &new_table,
        old_path: &cli.old_file,
        new_path: &cli.new_file,
        config: &config,
    };
    let format: OutputFormat = cli.format.into();

    match &cli.output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path.display()))?;
            let mut writer = NoColor::new(BufWriter::new(file));
            OutputFactory::create(format, cli.stats_only).render(&report, &mut writer)?;
            std::io::Write::flush(&mut writer)?;
            tracing::info!("report written to {}", path.display());
        }
        None => render_to_stdout(&report, format, cli.stats_only)?,
    }

    Ok(result.has_changes())
}
