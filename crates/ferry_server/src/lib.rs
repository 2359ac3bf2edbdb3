//! # Ferry Server
//!
//! Host-side bookkeeping for ferry sync sessions.
//!
//! This crate provides:
//! - A registry numbering and storing the sessions of one host scope
//! - Least-recently-used ordering of sessions
//! - A timeout reaper that invalidates idle sessions
//! - Fan-out of updates to every session tracking an entity
//!
//! # Reaping
//!
//! ```rust,ignore
//! use ferry_server::{RegistryConfig, SessionRegistry, spawn_reaper};
//! use std::sync::Arc;
//!
//! let registry = Arc::new(SessionRegistry::new(RegistryConfig::default()));
//! let reaper = spawn_reaper(Arc::clone(&registry));
//! let session = registry.create_session();
//! // ... serve polls with registry.get_and_touch(number)
//! reaper.abort();
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
// Production code MUST NOT use panic!/unwrap()/expect()
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod config;
mod error;
mod reaper;
mod registry;

pub use config::RegistryConfig;
pub use error::{RegistryError, RegistryResult};
pub use reaper::spawn_reaper;
pub use registry::SessionRegistry;
