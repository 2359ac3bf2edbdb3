//! # Ferry Testkit
//!
//! Test utilities for ferry sync sessions.
//!
//! This crate provides:
//! - Mutable test entities and a graph builder for passenger cycles/diamonds
//! - An in-memory existence store
//! - Property-based generators for entity graphs and session operations
//! - Concurrent send/pop stress helpers
//!
//! ## Usage
//!
//! ```rust,ignore
//! use ferry_testkit::prelude::*;
//!
//! let mut graph = EntityGraph::new();
//! graph.edge("order", "customer");
//! let session = test_session(1);
//! session.send(&AssumeExists, &*graph.entity("order"))?;
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod stress;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::stress::*;
    pub use ferry_engine::{AssumeExists, ExistenceOracle, SyncSession, TransferableEntity};
}

pub use fixtures::*;
pub use generators::*;
pub use stress::*;
