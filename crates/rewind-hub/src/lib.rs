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

//! In-process publish/subscribe hub with a linear undo/redo timeline.
//!
//! Every top-level [`Hub::publish`] records a message on a single global undo
//! stack shared by all topics. [`Hub::undo`] reverts the latest message by
//! calling each subscriber's inverse handler, or by re-applying the previous
//! message on the topic when no inverse was supplied. [`Hub::redo`] re-applies
//! it. Late subscribers catch up by replaying topic history.
//!
//! Handlers receive the hub in their [`Delivery`] and may publish from inside
//! a delivery; those nested messages are delivered once and never recorded.
//!
//! Layout: `hub.rs` (tables, stacks, dispatch), `message.rs`, `publisher.rs`,
//! `subscriber.rs`, `dispatch.rs` (delivery payload and re-entrancy state),
//! `snapshot.rs` (diagnostics), `error.rs`.

pub mod dispatch;
pub mod error;
pub mod hub;
pub mod message;
pub mod publisher;
pub mod snapshot;
pub mod subscriber;

pub use dispatch::{Delivery, Direction, DispatchState};
pub use error::{HubError, HubResult};
pub use hub::Hub;
pub use message::{Message, MessageId};
pub use publisher::PublisherView;
pub use rewind_config::HubConfig;
pub use snapshot::{HubSnapshot, TopicSnapshot};
pub use subscriber::{
    Handler, HandlerResult, Removal, ReplayMode, SubscribeOptions, SubscriberId, SubscriberView,
};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
