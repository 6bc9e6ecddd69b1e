//! I/O services used by the pipeline

pub mod fetcher;

pub use fetcher::{FetchError, SourceFetcher, MAX_REDIRECTS};
