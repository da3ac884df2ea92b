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

//! Shared test helpers used across integration suites.
//! Layout: recorder.rs (capturing handlers), counter.rs (numeric state handlers), logging.rs (test log bootstrap).

pub mod counter;
pub mod logging;
pub mod recorder;

pub use counter::Counter;
pub use logging::init_test_logging;
pub use recorder::{Recorded, Recorder};
