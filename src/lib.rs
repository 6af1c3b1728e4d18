//! A transport-agnostic request/response multiplexer for constrained
//! devices.
//!
//! A [`router::RouterHandle`] owns a set of pluggable, embedder-supplied
//! [`channel::Channel`] transports, correlates outgoing calls with their
//! replies, queues outbound frames when a destination channel is busy, and
//! dispatches incoming requests to handlers registered by method name. The
//! wire format is a single JSON envelope per frame (see [`envelope`]); how
//! that frame is delimited on the underlying byte stream is left to the
//! channel implementation.
//!
//! The whole router is designed to run on one cooperative event loop: every
//! public entry point takes `&self` and does its work synchronously behind
//! an internal `RefCell`, so there are no locks to contend for and no
//! `Send`/`Sync` bounds to satisfy.

#![cfg_attr(test, expect(clippy::str_to_string, reason = "test code"))]
#![cfg_attr(test, expect(clippy::unwrap_used, reason = "test code can panic"))]
#![cfg_attr(test, expect(clippy::expect_used, reason = "test code can panic"))]
#![cfg_attr(
    test,
    expect(clippy::indexing_slicing, reason = "test code with known bounds")
)]
#![cfg_attr(test, expect(clippy::shadow_reuse, reason = "test code shadowing"))]

pub mod channel;
pub mod channels;
pub mod config;
pub mod demo;
pub mod envelope;
pub mod error;
pub mod handler;
pub mod id;
pub mod introspection;
pub mod observer;
pub mod queue;
pub mod request_table;
pub mod router;

pub use channel::{Channel, ChannelId};
pub use config::RouterConfig;
pub use envelope::{Body, Envelope};
pub use error::{CodecError, RouterError};
pub use router::{CallOptions, RouterHandle};
