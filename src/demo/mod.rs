//! Support code for the `mrpc-demo-server` binary.
//!
//! Kept in the library, not the binary, so both the demo server and any
//! future binary share one configuration surface (the teacher repo follows
//! the same split for its own CLI).

pub mod cli;
pub mod tcp_channel;
