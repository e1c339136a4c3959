//! ringlog core: fixed-memory log queue for embedded targets
//!
//! This crate stores structured log records in a single caller-owned byte
//! region and hands them back as protobuf-encoded `LogEntry` messages, ready
//! to be streamed off-device. Nothing on the push or pop path allocates.
//!
//! - [`FramedRing`]: circular store of length-prefixed byte entries with
//!   oldest-first eviction
//! - [`LogQueue`]: encodes [`LogRecord`]s into the ring, tracks dropped
//!   records and drains single records or whole-record batches
//! - [`wire`]: the `LogEntry` / `LogEntries` codec
//!
//! # Features
//!
//! - `std` (default): rich error messages via `thiserror`
//! - `tracing`: log evictions and truncations through `tracing`
//! - `defmt`: same events through `defmt`, plus `defmt::Format` impls
//! - `serde`: `Serialize`/`Deserialize` for [`QueueCfg`] and [`DropStats`]

#![cfg_attr(not(feature = "std"), no_std)]

mod cfg;
mod error;
mod queue;
mod record;
pub mod ring;
pub mod wire;

pub use cfg::QueueCfg;
pub use error::{LogQueueError, LogQueueResult};
pub use queue::{Batch, DropStats, LogQueue, LogQueueWithEncodeBuffer};
pub use record::LogRecord;
pub use ring::{EntryView, FramedRing};
