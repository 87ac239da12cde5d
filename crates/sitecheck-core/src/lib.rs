//! Record store, querying, compliance statistics and export

mod config;
mod error;
pub mod export;
pub mod query;
mod store;
pub mod stats;

pub use config::{Config, DEFAULT_API_URL, DEFAULT_BASE_URL};
pub use error::{CoreError, CoreResult, ErrorClass};
pub use export::{Export, ExportFormat};
pub use query::{Page, Paged, Pagination, RecordFilter};
pub use stats::{Period, Statistics, StatisticsQuery};
pub use store::{RecordStore, DEFAULT_CAPACITY};
