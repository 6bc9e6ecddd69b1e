//! epi-ingest library interface
//!
//! Fetches COVID-19 case and policy feeds, normalizes them into canonical
//! records and atomically replaces the `cases` and `interventions` tables.

pub mod assembler;
pub mod config;
pub mod db;
pub mod error;
pub mod guard;
pub mod models;
pub mod normalizers;
pub mod pipeline;
pub mod regions;
pub mod services;
pub mod sources;
pub mod utils;

pub use error::DatasetError;
pub use pipeline::{run, PipelineOptions, RunReport};
