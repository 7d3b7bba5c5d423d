use anyhow::{Context, Result, bail};
use bizsheet_core::config::DEFAULT_PATHS_FILE;
use bizsheet_core::intake::{archive_for_record, find_in_workbooks, rate_everywhere};
use bizsheet_core::sweep::{run_sweep, sweep_by_id};
use bizsheet_core::{
    BizsheetError, PathConfig, Schema, UpdatePayload, archive, lookup, preview, rating,
    write_record,
};
use chrono::{Local, NaiveDate};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

mod formatter;

/// Document type used for archived rating certificates
const RATING_DOC_TYPE: &str = "신용평가";

#[derive(Parser)]
#[command(name = "bizsheet")]
#[command(about = "Locate, review and update business records in xlsx workbooks", long_about = None)]
#[command(version)]
struct Cli {
    /// Record layout (TOML); the built-in layout when omitted
    #[arg(long, global = true, value_name = "SCHEMA")]
    schema: Option<PathBuf>,

    /// Document type to workbook path configuration (JSON)
    #[arg(long, global = true, value_name = "PATHS", default_value = DEFAULT_PATHS_FILE)]
    paths: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct WorkbookArgs {
    /// Workbook to use instead of the configured one
    #[arg(short, long, value_name = "FILE")]
    workbook: Option<PathBuf>,

    /// Document type, e.g. "전기 경영상태"; selects the configured workbook
    #[arg(short, long, value_name = "TYPE")]
    doc_type: Option<String>,
}

#[derive(Args)]
struct ArchiveArgs {
    /// Source document to file away afterwards
    #[arg(long, value_name = "FILE", requires = "archive_root")]
    archive: Option<PathBuf>,

    /// Root folder of the archive
    #[arg(long, value_name = "DIR")]
    archive_root: Option<PathBuf>,

    /// Company name, required when the record is not in any workbook
    #[arg(long)]
    name: Option<String>,

    /// Region used for the archive folder
    #[arg(long)]
    region: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the record of a business number
    Lookup {
        /// Business number, hyphens optional
        id: String,

        #[command(flatten)]
        target: WorkbookArgs,

        /// Output format
        #[arg(short, long, value_enum, default_value = "human")]
        format: OutputFormat,
    },

    /// Write new field values and repaint the record
    Update {
        /// Business number, hyphens optional
        id: String,

        #[command(flatten)]
        target: WorkbookArgs,

        /// Field value in edit units, e.g. debt_ratio=45.1 (repeatable)
        #[arg(long = "set", value_name = "KEY=VALUE", value_parser = parse_assignment)]
        set: Vec<(String, String)>,

        /// Threshold ruleset; defaults to the workbook key of the document type
        #[arg(long)]
        ruleset: Option<String>,

        /// Show the before/after comparison without writing
        #[arg(long)]
        dry_run: bool,

        /// Update the workbook only, never archive
        #[arg(long)]
        data_only: bool,

        #[command(flatten)]
        archive: ArchiveArgs,
    },

    /// Write a credit rating into every configured workbook
    Rate {
        /// Business number, hyphens optional
        id: String,

        /// Rating grade, e.g. "A+"
        #[arg(long)]
        grade: String,

        /// First day of validity
        #[arg(long, value_parser = parse_date)]
        start: NaiveDate,

        /// Last day of validity; one year after the start by default
        #[arg(long, value_parser = parse_date)]
        end: Option<NaiveDate>,

        #[command(flatten)]
        archive: ArchiveArgs,
    },

    /// Recolour a whole workbook
    Sweep {
        /// Which sweep to run
        #[arg(value_parser = ["status", "ratings"])]
        sweep: String,

        #[command(flatten)]
        target: WorkbookArgs,

        /// Reference date for rating expiry; today by default
        #[arg(long, value_parser = parse_date)]
        today: Option<NaiveDate>,
    },

    /// File a document without touching any workbook
    Archive {
        /// Document to move
        source: PathBuf,

        /// Root folder of the archive
        #[arg(long)]
        root: PathBuf,

        /// Company name
        #[arg(long)]
        name: String,

        /// Document type used in the file name
        #[arg(long)]
        doc_type: String,

        /// Region used for the archive folder
        #[arg(long)]
        region: Option<String>,
    },

    /// Show or change the workbook path configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Print the record layout in use
    Schema,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// List the configured workbooks
    Show,
    /// Point a workbook key at a file
    SetPath { key: String, workbook: PathBuf },
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Human-readable colored output
    Human,
    /// JSON output
    Json,
}

fn parse_assignment(s: &str) -> std::result::Result<(String, String), String> {
    s.split_once('=')
        .map(|(k, v)| (k.trim().to_string(), v.to_string()))
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", s))
}

fn parse_date(s: &str) -> std::result::Result<NaiveDate, String> {
    rating::parse_date_input(s).ok_or_else(|| format!("not a date: '{}'", s))
}

/// Workbook key (if known) and path for a command
fn resolve_workbook(target: &WorkbookArgs, paths: &PathConfig) -> Result<(Option<String>, PathBuf)> {
    let key = target
        .doc_type
        .as_deref()
        .and_then(|t| paths.workbook_key_for(t))
        .map(str::to_string);

    if let Some(workbook) = &target.workbook {
        return Ok((key, workbook.clone()));
    }
    let Some(doc_type) = &target.doc_type else {
        bail!("Pass --workbook or --doc-type");
    };
    let Some(key) = key else {
        bail!("No workbook key matches document type '{}'", doc_type);
    };
    let path = paths.workbook(&key).with_context(|| {
        format!(
            "Workbook for '{}' is not configured; run `bizsheet config set-path {} <FILE>`",
            key, key
        )
    })?;
    Ok((Some(key), path))
}

fn run_lookup(
    id: &str,
    target: &WorkbookArgs,
    format: &OutputFormat,
    schema: &Schema,
    paths: &PathConfig,
) -> Result<()> {
    let found = if target.workbook.is_none() && target.doc_type.is_none() {
        find_in_workbooks(paths, schema, id).map(|f| (f.path, f.record))
    } else {
        let (_, path) = resolve_workbook(target, paths)?;
        lookup(&path, schema, id)?.map(|record| (path, record))
    };

    let Some((path, record)) = found else {
        formatter::print_failure(&format!("Business number '{}' not found", id));
        std::process::exit(1);
    };
    match format {
        OutputFormat::Human => formatter::print_record(&path, &record, schema),
        OutputFormat::Json => formatter::print_record_json(&path, &record)?,
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn run_update(
    id: &str,
    target: &WorkbookArgs,
    set: &[(String, String)],
    ruleset: Option<String>,
    dry_run: bool,
    data_only: bool,
    archive_args: &ArchiveArgs,
    schema: &Schema,
    paths: &PathConfig,
) -> Result<()> {
    let (key, path) = resolve_workbook(target, paths)?;

    let mut payload = UpdatePayload::new();
    for (field, value) in set {
        if schema.field(field).is_none() {
            bail!("Unknown field '{}'", field);
        }
        payload = payload.set(field.as_str(), value.as_str());
    }
    payload.ruleset = ruleset.or_else(|| key.clone());

    let record = lookup(&path, schema, id)?;
    if let Some(record) = &record {
        formatter::print_preview(&preview(record, schema, &payload));
    }
    if dry_run {
        println!("\n[DRY RUN] Nothing written to '{}'", path.display());
        return Ok(());
    }

    let doc_type = target.doc_type.clone().or(key);
    let archive_target = match (&archive_args.archive, &archive_args.archive_root) {
        (Some(source), Some(root)) if !data_only => Some((source.as_path(), root.as_path())),
        _ => None,
    };

    match record {
        Some(record) => {
            let updated = write_record(&path, schema, id, &payload)?;
            if updated.is_empty() {
                formatter::print_success("Record repainted, no values written");
            } else {
                formatter::print_success(&format!("Updated: {}", updated.join(", ")));
            }
            if let Some((source, root)) = archive_target {
                let doc_type = doc_type.context("--doc-type is needed to name the archive")?;
                let filed = match &archive_args.name {
                    Some(name) => archive::archive(
                        source,
                        root,
                        name,
                        &doc_type,
                        archive_args.region.as_deref(),
                    )?,
                    None => archive_for_record(&record, schema, source, root, &doc_type)?,
                };
                formatter::print_success(&format!("Archived to {}", filed.display()));
            }
        }
        None => {
            let (Some((source, root)), Some(name)) = (archive_target, &archive_args.name) else {
                return Err(BizsheetError::NotFound(id.to_string()).into());
            };
            let doc_type = doc_type.context("--doc-type is needed to name the archive")?;
            let filed = archive::archive(
                source,
                root,
                name,
                &doc_type,
                archive_args.region.as_deref(),
            )?;
            formatter::print_success(&format!(
                "New company, document archived to {}",
                filed.display()
            ));
        }
    }
    Ok(())
}

fn run_rate(
    id: &str,
    grade: &str,
    start: NaiveDate,
    end: Option<NaiveDate>,
    archive_args: &ArchiveArgs,
    schema: &Schema,
    paths: &PathConfig,
) -> Result<()> {
    let end = end.unwrap_or_else(|| rating::default_end(start));
    let text = rating::compose(grade, start, end)?;
    println!("Rating text: {}", text.replace('\n', " "));

    let found = find_in_workbooks(paths, schema, id);
    let outcome = rate_everywhere(paths, schema, id, &text)?;
    for key in &outcome.updated {
        formatter::print_success(&format!("{}: rating written", key));
    }
    for (key, message) in &outcome.failed {
        formatter::print_failure(&format!("{}: {}", key, message));
    }
    println!("{} of {} workbooks updated", outcome.updated.len(), paths.configured().len());

    if let (Some(source), Some(root)) = (&archive_args.archive, &archive_args.archive_root) {
        let filed = match (&archive_args.name, &found) {
            (Some(name), _) => archive::archive(
                source,
                root,
                name,
                RATING_DOC_TYPE,
                archive_args.region.as_deref(),
            )?,
            (None, Some(found)) => {
                archive_for_record(&found.record, schema, source, root, RATING_DOC_TYPE)?
            }
            (None, None) => bail!("Company not found; pass --name to archive the document"),
        };
        formatter::print_success(&format!("Archived to {}", filed.display()));
    }
    Ok(())
}

fn run_sweep_command(
    sweep: &str,
    target: &WorkbookArgs,
    today: Option<NaiveDate>,
    schema: &Schema,
    paths: &PathConfig,
) -> Result<()> {
    let (_, path) = resolve_workbook(target, paths)?;
    let today = today.unwrap_or_else(|| Local::now().date_naive());
    let sweep = sweep_by_id(sweep, today).with_context(|| format!("Unknown sweep '{}'", sweep))?;
    let changed = run_sweep(&path, sweep.as_ref(), &schema.rating_marker)?;
    formatter::print_success(&format!(
        "{}: {} cells recoloured in {}",
        sweep.name(),
        changed,
        path.display()
    ));
    Ok(())
}

fn run_config(action: ConfigAction, paths_file: &Path, mut paths: PathConfig) -> Result<()> {
    match action {
        ConfigAction::Show => {
            for (key, workbook) in &paths.workbooks {
                let shown = if workbook.trim().is_empty() {
                    "(not set)"
                } else {
                    workbook.as_str()
                };
                println!("  {:<8} {}", key, shown);
            }
        }
        ConfigAction::SetPath { key, workbook } => {
            paths.set_path(&key, &workbook);
            paths.save(paths_file)?;
            formatter::print_success(&format!("'{}' now points to {}", key, workbook.display()));
        }
    }
    Ok(())
}

/// `RUST_LOG` directives when set and valid, warnings otherwise
fn log_filter(directives: Option<String>) -> EnvFilter {
    directives
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new("warn"))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            log_filter(std::env::var(EnvFilter::DEFAULT_ENV).ok()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let schema = match &cli.schema {
        Some(path) => Schema::from_file(path)
            .with_context(|| format!("Failed to load schema from {}", path.display()))?,
        None => Schema::default(),
    };
    let paths = PathConfig::load(&cli.paths)
        .with_context(|| format!("Failed to load paths from {}", cli.paths.display()))?;

    match cli.command {
        Commands::Lookup { id, target, format } => run_lookup(&id, &target, &format, &schema, &paths),
        Commands::Update {
            id,
            target,
            set,
            ruleset,
            dry_run,
            data_only,
            archive,
        } => run_update(
            &id, &target, &set, ruleset, dry_run, data_only, &archive, &schema, &paths,
        ),
        Commands::Rate {
            id,
            grade,
            start,
            end,
            archive,
        } => run_rate(&id, &grade, start, end, &archive, &schema, &paths),
        Commands::Sweep {
            sweep,
            target,
            today,
        } => run_sweep_command(&sweep, &target, today, &schema, &paths),
        Commands::Archive {
            source,
            root,
            name,
            doc_type,
            region,
        } => {
            let filed = archive::archive(&source, &root, &name, &doc_type, region.as_deref())?;
            formatter::print_success(&format!("Archived to {}", filed.display()));
            Ok(())
        }
        Commands::Config { action } => run_config(action, &cli.paths, paths),
        Commands::Schema => {
            print!("{}", schema.to_toml()?);
            Ok(())
        }
    }
}
