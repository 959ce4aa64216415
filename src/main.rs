//! Astmon CLI
//!
//! Command-line interface for Astmon operations:
//! - Build the measurement store from a directory of instrument logs
//! - Query and classify stored measurements
//! - Classify a single reading file
//! - Generate a default config file

use anyhow::Context;
use astmon::config::{generate_default_config, Config, LoggingConfig, DEFAULT_DB_FILE};
use astmon::ingest::{ingest_directory, parse_readings};
use astmon::query::{parse_component, Query, QueryExecutor, SelectionRequest, TimeSelection};
use astmon::report::{ClassifiedTable, OutputFormat};
use astmon::storage::{MeasurementStore, INTERVAL_FORMAT};
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "astmon")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Sky-quality monitor: store, select and classify sky-brightness measurements")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (default: standard locations, then environment)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Show running and progress information (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create the measurement store from a directory of data files
    CreateDb {
        /// Directory holding the *.dat files
        data_dir: PathBuf,
        /// Directory for the store file (default: configured db_path)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
        /// Drop and rebuild an existing store
        #[arg(long)]
        overwrite: bool,
    },

    /// Select and classify stored measurements
    Query {
        /// Store file (default: configured db_path)
        #[arg(long)]
        db: Option<PathBuf>,
        /// Period start, "YYYY-MM-DD[ hh:mm:ss]" (overrides years/months/days)
        #[arg(long, requires = "end")]
        start: Option<String>,
        /// Period end, "YYYY-MM-DD[ hh:mm:ss]"
        #[arg(long, requires = "start")]
        end: Option<String>,
        /// Years, comma-separated
        #[arg(long, value_delimiter = ',')]
        years: Vec<i32>,
        /// Months paired with years, comma-separated (5 or 05)
        #[arg(long, value_delimiter = ',', value_parser = component_arg)]
        months: Vec<u32>,
        /// Days paired with years and months, comma-separated (1 or 01)
        #[arg(long, value_delimiter = ',', value_parser = component_arg)]
        days: Vec<u32>,
        /// Positions, comma-separated (empty = all)
        #[arg(long, value_delimiter = ',')]
        positions: Vec<i64>,
        /// Filter names, comma-separated (empty = all)
        #[arg(long, value_delimiter = ',')]
        filters: Vec<String>,
        /// Output format (table, csv, json)
        #[arg(short, long, default_value = "table", value_parser = format_arg)]
        format: OutputFormat,
        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Classify a single reading file
    Classify {
        /// Fixed-width reading file
        input_file: PathBuf,
        /// Output format (table, csv, json)
        #[arg(short, long, default_value = "table", value_parser = format_arg)]
        format: OutputFormat,
        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn component_arg(s: &str) -> Result<u32, String> {
    parse_component(s).map_err(|e| e.to_string())
}

fn format_arg(s: &str) -> Result<OutputFormat, String> {
    OutputFormat::from_str(s).ok_or_else(|| format!("unknown format '{s}' (table, csv, json)"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_with_env(path)?,
        None => Config::load_default(),
    };
    init_logging(&config.logging, cli.verbose);

    match cli.command {
        Commands::CreateDb {
            data_dir,
            output_dir,
            overwrite,
        } => {
            let db_path = match output_dir {
                Some(dir) => {
                    std::fs::create_dir_all(&dir)
                        .with_context(|| format!("couldn't create output directory {dir:?}"))?;
                    dir.join(DEFAULT_DB_FILE)
                }
                None => PathBuf::from(&config.store.db_path),
            };

            tracing::info!("Creating store {:?}", db_path);
            let mut store = MeasurementStore::create(&db_path, overwrite)?;
            let report = ingest_directory(&data_dir, &mut store, &config.ingest)?;

            println!(
                "{} rows from {} of {} files into {}",
                report.rows_inserted,
                report.files_ingested,
                report.files_seen,
                db_path.display()
            );
            for skipped in &report.files_skipped {
                println!("skipped {}", skipped.display());
            }

            let total = store.count()?;
            match store.time_bounds()? {
                Some((first, last)) => println!(
                    "store holds {} rows from {} to {}",
                    total,
                    format_epoch(first),
                    format_epoch(last)
                ),
                None => println!("store is empty"),
            }
        }

        Commands::Query {
            db,
            start,
            end,
            years,
            months,
            days,
            positions,
            filters,
            format,
            output,
        } => {
            let db_path = db.unwrap_or_else(|| PathBuf::from(&config.store.db_path));
            let request = SelectionRequest {
                start,
                end,
                years,
                months,
                days,
            };
            let selection = TimeSelection::try_from(request)?;
            let query = Query::new(selection).positions(positions).filters(filters);

            let executor = QueryExecutor::open(&db_path)?;
            let table = executor.execute_async(query).await?;
            if table.is_empty() {
                tracing::info!("No measurements match the selection");
            }

            let classified = ClassifiedTable::from_measurements(&table.rows)?;
            write_output(&classified, format, output.as_deref())?;
        }

        Commands::Classify {
            input_file,
            format,
            output,
        } => {
            let readings = parse_readings(&input_file)?;
            tracing::info!("{} readings in {:?}", readings.len(), input_file);

            let classified = ClassifiedTable::from_readings(&readings)?;
            write_output(&classified, format, output.as_deref())?;
        }

        Commands::Config { output } => {
            let content = generate_default_config();
            match output {
                Some(path) => {
                    std::fs::write(&path, content)?;
                    println!("Config written to {}", path.display());
                }
                None => print!("{content}"),
            }
        }
    }

    Ok(())
}

fn init_logging(logging: &LoggingConfig, verbose: u8) {
    let level = match verbose {
        0 => logging.level.as_str(),
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("astmon={level}")));

    let registry = tracing_subscriber::registry().with(filter);
    if logging.format == "json" {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn format_epoch(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format(INTERVAL_FORMAT).to_string())
        .unwrap_or_else(|| ts.to_string())
}

fn write_output(
    table: &ClassifiedTable,
    format: OutputFormat,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    let out: Box<dyn Write> = match output {
        Some(path) => Box::new(std::io::BufWriter::new(
            std::fs::File::create(path).with_context(|| format!("couldn't create {path:?}"))?,
        )),
        None => Box::new(std::io::stdout().lock()),
    };
    table.write(format, out)?;
    Ok(())
}
