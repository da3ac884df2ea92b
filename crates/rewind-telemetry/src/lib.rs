#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]

//! Logging primitives shared across the rewind workspace.
//!
//! This crate centralises tracing subscriber installation so the hub, its
//! tests, and any embedding application adopt the same log shape.

pub mod error;
pub mod init;

pub use error::{Result, TelemetryError};
pub use init::{LoggingConfig, init_logging, is_initialised};
pub use rewind_config::{DEFAULT_LOG_LEVEL, LogFormat};
