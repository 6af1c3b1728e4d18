//! Router-level configuration.
//!
//! This is the library boundary's configuration type (see the external
//! interfaces section of the design docs): a plain constructor argument,
//! not something layered through CLI flags or environment variables. The
//! demo binary's own configuration, which *is* layered that way, lives in
//! `demo::cli`.

/// Configuration supplied when constructing a [`crate::router::RouterHandle`].
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// This endpoint's identity, used as `src` in every emitted frame and
    /// validated against the `dst` of every received frame.
    pub id: String,
    /// Capacity of the bounded outbound queue shared by all channels.
    pub max_queue_size: usize,
}

impl RouterConfig {
    /// Build a new configuration.
    #[must_use]
    pub fn new(id: impl Into<String>, max_queue_size: usize) -> Self {
        Self { id: id.into(), max_queue_size }
    }
}
