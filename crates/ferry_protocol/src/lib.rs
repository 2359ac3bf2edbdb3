//! # Ferry Protocol
//!
//! In-memory shape of the data a sync session hands to its transport.
//!
//! This crate provides:
//! - `DeltaBatch`, the per-poll bundle of upserts, deletions and errors
//! - `ErrorWrapper` for user-visible diagnostics riding along with data
//! - `PropertyMap`, the flat snapshot of one entity
//!
//! This is a pure protocol crate with no I/O operations. Wire encoding is left
//! to the host: every type derives `serde::Serialize`/`Deserialize`.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod batch;
mod error;
mod error_wrapper;

pub use batch::{DeltaBatch, PropertyMap, ID_KEY, MODIFICATION_TIME_KEY};
pub use error::{ProtocolError, ProtocolResult};
pub use error_wrapper::ErrorWrapper;
