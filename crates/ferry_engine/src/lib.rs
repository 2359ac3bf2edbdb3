//! # Ferry Engine
//!
//! Keeps a remote client's view of server-owned entities consistent by
//! shipping per-entity deltas instead of full state dumps.
//!
//! This crate provides:
//! - `SyncSession`, the per-client conversation state
//! - Dependency closure resolution over entity passengers
//! - Staleness detection via modification times
//! - Deletion tracking and conversation timeout
//!
//! ## Architecture
//!
//! The host calls [`SyncSession::send`] whenever server-side state changes.
//! The session resolves the passengers of the entity, diffs every entity of
//! the closure against the version the client is known to hold and queues
//! stale ones in the pending [`DeltaBatch`]. Each client poll calls
//! [`SyncSession::pop_batch`], which swaps in a fresh batch.
//!
//! ## Key Invariants
//!
//! - A given entity version is delivered at most once per session
//! - An id is never both upserted and deleted in the same batch
//! - No send is lost or duplicated across a concurrent pop
//! - Entities are only read, never mutated

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod clock;
mod closure;
mod config;
mod entity;
mod error;
mod policy;
mod session;

pub use clock::{Clock, ManualClock, SystemClock};
pub use closure::DependencyClosure;
pub use config::{SessionConfig, DEFAULT_TIMEOUT};
pub use entity::{AssumeExists, EntityRef, ExistenceOracle, TransferableEntity};
pub use error::{SessionError, SessionResult};
pub use policy::{AllowAll, BatchFactory, KeepAll, PlainBatches, PropertyFilter, SessionListener, VisibilityPolicy};
pub use session::{LivenessState, SendReport, SyncSession};

pub use ferry_protocol::{DeltaBatch, ErrorWrapper, PropertyMap};
