pub mod history;
pub mod ingest;
pub mod parser;
pub mod report;
pub mod scraper;
pub mod store;
pub mod types;
pub mod utils;

pub use history::HistoryKeyMode;
pub use ingest::{IngestOutcome, IngestStatus, ingest_text};
pub use parser::parse_listing;
pub use scraper::{ScraperError, WebScraper};
pub use store::{JsonFileStore, MergeSummary, PriceStore, StoreError, StoredSnapshot};

/// Default location of the persisted price document.
pub const DEFAULT_STORE_PATH: &str = "ram_prices.json";
