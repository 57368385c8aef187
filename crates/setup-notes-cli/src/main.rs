//! `setup-notes` CLI — turn a booking CSV export into facility setup notes.
//!
//! ## Usage
//!
//! ```sh
//! # Notes for one export (stdin → stdout)
//! setup-notes generate < export.csv
//!
//! # Newest CSV in a directory, written to a file
//! setup-notes generate --input-dir input_csv -o output/internal_notes.txt
//!
//! # Re-emit the export with a Notes column
//! setup-notes generate -i export.csv --format csv -o annotated.csv
//!
//! # Parse and group only, report what would be generated
//! setup-notes check -i export.csv
//!
//! # Show the effective venue table
//! setup-notes venues --config venues.toml
//! ```

use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use setup_engine::{NotesConfig, NotesReport, RawRow, RuleProfile, RunOptions};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "setup-notes",
    version,
    about = "Facility setup/breakdown notes from venue-booking exports"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Raise log verbosity (-v info, -vv debug, -vvv trace); RUST_LOG overrides
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate notes for every booking flagged Process_Event = YES
    Generate {
        #[command(flatten)]
        source: Source,
        /// Output file (writes to stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Output format
        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
        #[command(flatten)]
        config: ConfigArgs,
        /// Fail on the first malformed row instead of skipping it
        #[arg(long)]
        strict: bool,
    },
    /// Parse and group an export, then report counts and data-quality warnings
    Check {
        #[command(flatten)]
        source: Source,
        #[command(flatten)]
        config: ConfigArgs,
    },
    /// Print the effective venue table and triads
    Venues {
        #[command(flatten)]
        config: ConfigArgs,
    },
}

#[derive(Args)]
struct Source {
    /// Input CSV file (reads from stdin if neither this nor --input-dir is given)
    #[arg(short, long)]
    input: Option<PathBuf>,
    /// Use the most recently modified *.csv in this directory
    #[arg(long, conflicts_with = "input")]
    input_dir: Option<PathBuf>,
}

#[derive(Args)]
struct ConfigArgs {
    /// TOML file with venue/triad entries and rule overrides
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Rule profile: standard or extended
    #[arg(long)]
    profile: Option<String>,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    /// Note blocks separated by blank lines
    Text,
    /// The input rows with an added Notes column
    Csv,
    /// Annotated bookings as a JSON array
    Json,
}

/// Header of the column added by `--format csv`.
const NOTES_COLUMN: &str = "Notes";

/// An export read into memory: header order plus rows.
struct Table {
    headers: Vec<String>,
    rows: Vec<RawRow>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Generate {
            source,
            output,
            format,
            config,
            strict,
        } => {
            let config = load_config(&config)?;
            let table = read_table(&source)?;
            let report = setup_engine::generate(&table.rows, &config, &RunOptions { strict })
                .context("Failed to generate notes")?;

            let rendered = match format {
                Format::Text => report.render(),
                Format::Csv => annotate_csv(&table, &report)?,
                Format::Json => {
                    let mut json = serde_json::to_string_pretty(&report.notes)?;
                    json.push('\n');
                    json
                }
            };
            write_output(output.as_deref(), &rendered)?;

            if !report.skipped.is_empty() {
                eprintln!("Skipped {} malformed row(s)", report.skipped.len());
            }
            for warning in &report.warnings {
                eprintln!("Warning: {warning}");
            }
        }
        Commands::Check { source, config } => {
            let config = load_config(&config)?;
            let table = read_table(&source)?;
            let prepared = setup_engine::prepare(&table.rows, &config, &RunOptions::default())?;
            let grouping = &prepared.grouping;

            println!("Rows read:          {}", prepared.rows_read);
            println!("Skipped rows:       {}", prepared.skipped.len());
            for skipped in &prepared.skipped {
                println!("  row {}: {}", skipped.row + 1, skipped.error);
            }
            println!("Setup/Teardown:     {}", grouping.markers_dropped);
            println!(
                "Notes to generate:  {} ({} merged)",
                grouping.bookings.len(),
                grouping.merged_count()
            );
            println!("Venue occupancy:    {}", grouping.occupancy.len());
            println!("Warnings:           {}", grouping.warnings.len());
            for warning in &grouping.warnings {
                println!("  {warning}");
            }
        }
        Commands::Venues { config } => {
            let config = load_config(&config)?;
            for venue in &config.venues {
                println!("{}\t{}\t{}", venue.code, venue.key, venue.label);
            }
            for triad in &config.triads {
                println!(
                    "{}\t{}\t{} = {}",
                    triad.code,
                    triad.name,
                    triad.label,
                    triad.members.join(" + ")
                );
            }
        }
    }

    Ok(())
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

fn load_config(args: &ConfigArgs) -> Result<NotesConfig> {
    let profile = args
        .profile
        .as_deref()
        .map(str::parse::<RuleProfile>)
        .transpose()?;
    match &args.config {
        Some(path) => NotesConfig::load_with_profile(path, profile)
            .with_context(|| format!("Failed to load config: {}", path.display())),
        None => Ok(NotesConfig::builtin(profile.unwrap_or_default())),
    }
}

fn read_table(source: &Source) -> Result<Table> {
    let path = match (&source.input, &source.input_dir) {
        (Some(path), _) => Some(path.clone()),
        (None, Some(dir)) => Some(newest_csv(dir)?),
        (None, None) => None,
    };
    let content = match &path {
        Some(path) => {
            tracing::info!(path = %path.display(), "reading export");
            std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read file: {}", path.display()))?
        }
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read from stdin")?;
            buf
        }
    };
    parse_table(&content)
}

/// Parse CSV text (a leading byte-order mark is ignored) into a [`Table`].
fn parse_table(content: &str) -> Result<Table> {
    let content = content.trim_start_matches('\u{feff}');
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(content.as_bytes());
    let headers: Vec<String> = reader
        .headers()
        .context("Failed to read CSV header")?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut rows: Vec<RawRow> = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("Failed to read CSV row {}", i + 1))?;
        rows.push(
            headers
                .iter()
                .zip(record.iter())
                .map(|(h, v)| (h.clone(), v.to_string()))
                .collect(),
        );
    }
    tracing::info!(rows = rows.len(), columns = headers.len(), "read export");
    Ok(Table { headers, rows })
}

/// Most recently modified `*.csv` in `dir`; ties go to the greater path.
fn newest_csv(dir: &Path) -> Result<PathBuf> {
    let mut newest: Option<(SystemTime, PathBuf)> = None;
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read directory: {}", dir.display()))?;
    for entry in entries {
        let entry = entry?;
        let path = entry.path();
        let is_csv = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
        if !is_csv || !path.is_file() {
            continue;
        }
        let modified = entry.metadata()?.modified()?;
        let newer = newest
            .as_ref()
            .is_none_or(|(t, p)| (modified, &path) > (*t, p));
        if newer {
            newest = Some((modified, path));
        }
    }
    newest
        .map(|(_, path)| path)
        .with_context(|| format!("No CSV files found in {}", dir.display()))
}

/// Re-emit the export with a trailing Notes column.
fn annotate_csv(table: &Table, report: &NotesReport) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    let mut header: Vec<&str> = table.headers.iter().map(String::as_str).collect();
    header.push(NOTES_COLUMN);
    writer.write_record(&header)?;

    for (i, row) in table.rows.iter().enumerate() {
        let fields = row.fields();
        let mut record: Vec<&str> = (0..table.headers.len())
            .map(|j| fields.get(j).map_or("", |(_, value)| value.as_str()))
            .collect();
        record.push(report.note_for_row(i).unwrap_or_default());
        writer.write_record(&record)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("Failed to flush CSV output: {}", e.error()))?;
    String::from_utf8(bytes).context("CSV output was not valid UTF-8")
}

fn write_output(path: Option<&Path>, content: &str) -> Result<()> {
    match path {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
            }
            std::fs::write(path, content)
                .with_context(|| format!("Failed to write file: {}", path.display()))?;
        }
        None => {
            print!("{}", content);
        }
    }
    Ok(())
}
