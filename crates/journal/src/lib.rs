//! Checkpoint log for saga orchestration.
//!
//! Each saga instance appends a record for every orchestration decision it
//! makes before that decision becomes externally visible. A crashed or
//! suspended saga is re-derived by replaying its records in version order.
//!
//! In production the log would be backed by a durable-execution engine;
//! this crate defines the seam ([`CheckpointLog`]) and an in-memory
//! implementation used by tests and the demo API server.

pub mod error;
pub mod log;
pub mod memory;
pub mod record;

pub use common::OrderId;
pub use error::{JournalError, Result};
pub use log::{AppendOptions, CheckpointLog, CheckpointLogExt};
pub use memory::InMemoryCheckpointLog;
pub use record::{CheckpointRecord, RecordId, Version};
