//! TFT top-ladder match collection.
//!
//! Ingests ranked-ladder and match data from the rate-limited Riot API,
//! deduplicates it against previously collected records, and persists it
//! incrementally as JSONL. A small JSON API exposes the collected data and a
//! trigger for on-demand collection; a background scheduler runs collection
//! cycles on a fixed interval.

pub mod collector;
pub mod config;
pub mod error;
pub mod models;
pub mod riot;
pub mod scheduler;
pub mod server;
pub mod storage;

pub use error::{Error, Result};
