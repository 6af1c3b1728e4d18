//! The in-flight request table: originated calls awaiting a reply.

use std::collections::HashMap;

use serde_json::Value;

use crate::handler::FrameInfo;

/// Outcome delivered to a reply callback.
#[derive(Debug)]
pub enum CallResult {
    /// The peer replied with success.
    Success(Option<Value>),
    /// The peer replied with an error.
    Error {
        /// Nonzero error code.
        code: i32,
        /// Error message, empty if the peer supplied none.
        message: String,
    },
}

/// A reply callback for an originated call.
pub type ReplyFn = Box<dyn FnMut(CallResult, FrameInfo)>;

struct SentRequest {
    callback: ReplyFn,
}

/// Tracks originated calls that registered a reply callback, keyed by
/// correlation id, until a matching reply arrives.
#[derive(Default)]
pub struct RequestTable {
    inflight: HashMap<i64, SentRequest>,
}

impl RequestTable {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Register a callback to be invoked when a reply with `id` arrives.
    pub fn insert(&mut self, id: i64, callback: ReplyFn) {
        self.inflight.insert(id, SentRequest { callback });
    }

    /// Remove and invoke the callback registered for `id`, if any. Returns
    /// `true` if a matching entry was found.
    pub fn complete(&mut self, id: i64, result: CallResult, info: FrameInfo) -> bool {
        let Some(mut sent) = self.inflight.remove(&id) else { return false };
        (sent.callback)(result, info);
        true
    }

    /// Number of calls currently awaiting a reply.
    #[must_use]
    pub fn len(&self) -> usize { self.inflight.len() }

    /// `true` if no calls are awaiting a reply.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.inflight.is_empty() }
}
