//! Concrete [`crate::channel::Channel`] implementations.

pub mod loopback;
