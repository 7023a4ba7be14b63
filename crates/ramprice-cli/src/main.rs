use std::io::{self, Read};
use std::path::PathBuf;
use std::process;
use std::str::FromStr;

use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use log::LevelFilter;
use ramprice::history::HistoryKeyMode;
use ramprice::ingest::{IngestOutcome, IngestStatus, ingest_text};
use ramprice::parser::parse_listing;
use ramprice::report::{RamReport, trends};
use ramprice::scraper::WebScraper;
use ramprice::store::JsonFileStore;
use ramprice::utils::{SnapshotStats, TrendFilter};

#[derive(Parser)]
#[command(name = "ramprice")]
#[command(about = "A RAM resale price listing crawler and tracker", long_about = None)]
struct Cli {
    #[arg(
        short = 'l',
        long = "log-level",
        value_enum,
        default_value = "info",
        global = true,
        help = "Set the logging level"
    )]
    log_level: LogLevel,

    #[arg(
        long,
        env = "RAMPRICE_STORE",
        default_value = ramprice::DEFAULT_STORE_PATH,
        global = true,
        help = "Path of the persisted price document"
    )]
    store: PathBuf,

    #[arg(
        long,
        env = "RAMPRICE_KEY_MODE",
        default_value = "slot",
        value_parser = parse_key_mode,
        global = true,
        help = "History key granularity (slot or date)"
    )]
    key_mode: HistoryKeyMode,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => LevelFilter::Off,
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

#[derive(Debug, Clone, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the listing post, parse it and merge it into the store under the current time key
    Crawl {
        #[arg(long, env = "RAMPRICE_LISTING_URL", help = "URL of the listing post")]
        url: String,

        #[arg(
            long,
            env = "RAMPRICE_COOKIE",
            hide_env_values = true,
            help = "Cookie header of a logged-in session"
        )]
        cookie: Option<String>,
    },
    /// Merge listing text supplied by hand under an explicit date and time
    Ingest {
        #[arg(long, value_name = "YYYY-MM-DD", help = "Observation date")]
        date: String,

        #[arg(long, value_name = "HH:MM", help = "Observation time or slot")]
        time: String,

        #[arg(long, help = "File with the listing text (reads stdin when omitted)")]
        file: Option<PathBuf>,
    },
    /// Parse listing text without touching the store
    Parse {
        #[arg(long, help = "File with the listing text (reads stdin when omitted)")]
        file: Option<PathBuf>,

        #[arg(
            short = 'o',
            long = "output",
            value_enum,
            default_value = "text",
            help = "Output format"
        )]
        format: OutputFormat,
    },
    /// Show current prices and per-product price history from the store
    Trends {
        #[arg(long, help = "Only products whose name contains this text")]
        product: Option<String>,

        #[arg(
            long,
            value_name = "YYYY-MM-DD",
            help = "Observations from this date onwards",
            value_parser = |s: &str| NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| e.to_string()),
        )]
        start_date: Option<NaiveDate>,

        #[arg(
            long,
            value_name = "YYYY-MM-DD",
            help = "Observations up to this date",
            value_parser = |s: &str| NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| e.to_string()),
        )]
        end_date: Option<NaiveDate>,

        #[arg(
            short = 'o',
            long = "output",
            value_enum,
            default_value = "text",
            help = "Output format"
        )]
        format: OutputFormat,
    },
}

fn parse_key_mode(s: &str) -> Result<HistoryKeyMode, String> {
    HistoryKeyMode::from_str(s).map_err(|e| e.to_string())
}

fn serialize_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            log::error!("Error serializing to JSON: {}", e);
            process::exit(1);
        }
    }
}

fn read_text(file: Option<PathBuf>) -> String {
    let result = match file {
        Some(path) => std::fs::read_to_string(&path),
        None => {
            let mut text = String::new();
            io::stdin().read_to_string(&mut text).map(|_| text)
        }
    };
    result.unwrap_or_else(|e| {
        log::error!("Error reading listing text: {}", e);
        process::exit(1);
    })
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(cli.log_level.clone().into())
        .init();

    let store = JsonFileStore::new(&cli.store);

    match cli.command {
        Commands::Crawl { url, cookie } => {
            let scraper = WebScraper::new(cookie.as_deref()).unwrap_or_else(|e| {
                log::error!("Error creating scraper: {}", e);
                process::exit(1);
            });

            let text = scraper.fetch_listing_text(&url).await.unwrap_or_else(|e| {
                log::error!("Error fetching listing: {}", e);
                process::exit(1);
            });

            let key = cli.key_mode.key_now();
            match ingest_text(&store, &text, &key) {
                Ok(IngestOutcome::Merged(summary)) => {
                    log::info!("Crawl complete: {}", summary);
                }
                Ok(IngestOutcome::Empty) => {
                    log::error!("Parsing failed: no products recognized");
                    process::exit(1);
                }
                Err(e) => {
                    log::error!("Error saving store {}: {}", store.path().display(), e);
                    process::exit(1);
                }
            }
        }

        Commands::Ingest { date, time, file } => {
            let key = cli.key_mode.manual_key(&date, &time).unwrap_or_else(|e| {
                log::error!("Invalid args: {e}");
                process::exit(1);
            });
            let text = read_text(file);

            let status = match ingest_text(&store, &text, &key) {
                Ok(outcome) => IngestStatus::from(outcome),
                Err(e) => {
                    log::error!("Error saving store {}: {}", store.path().display(), e);
                    IngestStatus::error(e.to_string())
                }
            };

            serialize_json(&status);
            if matches!(status, IngestStatus::Error { .. }) {
                process::exit(1);
            }
        }

        Commands::Parse { file, format } => {
            let snapshot = parse_listing(&read_text(file));

            match format {
                OutputFormat::Json => serialize_json(&snapshot),
                OutputFormat::Text => {
                    if snapshot.is_empty() {
                        println!("No products recognized.");
                    } else {
                        for (category, records) in &snapshot {
                            println!("── {}", category);
                            for record in records {
                                println!("  {}", record);
                            }
                        }
                        print!("{}", SnapshotStats::from_snapshot(&snapshot));
                    }
                }
            }
        }

        Commands::Trends {
            product,
            start_date,
            end_date,
            format,
        } => {
            let filter = TrendFilter {
                contains: product,
                start_date,
                end_date,
            };

            let filter = filter.validate().unwrap_or_else(|e| {
                log::error!("Invalid args: {e}");
                process::exit(1);
            });

            let price_store = store.load();

            match format {
                OutputFormat::Json => {
                    let mut report = RamReport::from_store(&price_store);
                    report.trends = filter.apply(report.trends);
                    serialize_json(&report);
                }
                OutputFormat::Text => {
                    let series = filter.apply(trends(&price_store));
                    if series.is_empty() {
                        println!("No price history to display.");
                    } else {
                        print!("{}", RamReport::from_store(&price_store));
                        for (product, points) in &series {
                            println!("\n{}", product);
                            for point in points {
                                println!("  {:<17} {:>10}", point.date, point.price);
                            }
                        }
                    }
                }
            }
        }
    }
}
