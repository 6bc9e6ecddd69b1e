//! Test Helper Utilities
//!
//! Shared utilities for testing epi-ingest

#![allow(dead_code)]

pub mod db_utils;
pub mod feed_server;

pub use db_utils::{count_rows, create_test_db, leftover_companions};
pub use feed_server::{spawn_router, FeedServer};
