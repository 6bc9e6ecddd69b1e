//! # epi-common
//!
//! Shared code for the epidemiological data loader:
//! - Error types
//! - Bootstrap configuration (TOML file, environment, compiled defaults)
//! - Database bootstrap and declarative table schemas for the live tables

pub mod config;
pub mod db;
pub mod error;

pub use error::{Error, Result};
