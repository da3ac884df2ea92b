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

//! Construction-time configuration for the rewind hub and its logging.
//!
//! Layout: `model.rs` (typed settings), `validate.rs` (field parsing helpers),
//! `env.rs` (environment variable overrides), `error.rs` (error taxonomy).

pub mod env;
pub mod error;
pub mod model;
pub mod validate;

pub use env::{ENV_LOG_FORMAT, ENV_LOG_LEVEL, ENV_UNDO_CAPACITY};
pub use error::{ConfigError, ConfigResult};
pub use model::{DEFAULT_LOG_LEVEL, HubConfig, LogFormat, TelemetryConfig};
