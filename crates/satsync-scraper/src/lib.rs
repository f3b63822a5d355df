pub mod client;
pub mod error;
pub mod extract;
pub mod parse;
pub mod report;
pub mod retry;
pub mod runner;
pub mod search;

pub use client::SaturnClient;
pub use error::ScraperError;
pub use extract::Extractor;
pub use report::{read_report, write_report, ReportError};
pub use runner::{run_batch, BatchStats};
pub use search::find_product;
