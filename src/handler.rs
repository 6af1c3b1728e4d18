//! Method dispatch: the method-keyed handler registry and the data a
//! handler invocation carries.

use indexmap::IndexMap;

use crate::{channel::ChannelId, error::RouterError, router::RouterHandle};

/// A handler callback. Receives a cloneable handle back into the router
/// (so it can eventually call `respond_success`/`respond_error`), the
/// [`RequestInfo`] for this call, a [`FrameInfo`] describing the channel
/// it arrived on, and the raw argument bytes.
pub type HandlerFn = Box<dyn FnMut(RouterHandle, RequestInfo, FrameInfo, &[u8])>;

/// Per-incoming-call context, valid for the lifetime of one handler
/// invocation. Consumed by `respond_success`/`respond_error`, which
/// enforces at the type level that a handler replies at most once.
pub struct RequestInfo {
    /// Correlation id from the originating request.
    pub id: i64,
    /// Identity of the requester, used as `dst` of the reply.
    pub src: String,
    /// Correlation tag, echoed back verbatim.
    pub tag: String,
    /// Channel the request arrived on, preferred for the reply.
    pub channel: ChannelId,
    /// The handler's declared argument-format hint.
    pub args_fmt: String,
}

/// Descriptor of the channel a call arrived on or completed on.
#[derive(Debug, Clone, Default)]
pub struct FrameInfo {
    /// Short channel-kind descriptor, e.g. `"tcp"` or `"loopback"`.
    pub channel_type: String,
    /// Whether the channel is marked trusted.
    pub channel_is_trusted: bool,
}

struct HandlerEntry {
    args_fmt: String,
    callback: HandlerFn,
}

/// Method name to handler mapping. Preserves registration order so
/// `RPC.List` can enumerate methods deterministically.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: IndexMap<String, HandlerEntry>,
}

impl HandlerRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Register a handler for `method`.
    ///
    /// # Errors
    /// Returns [`RouterError::DuplicateHandler`] if a handler is already
    /// registered for this method name.
    pub fn register(
        &mut self,
        method: impl Into<String>,
        args_fmt: impl Into<String>,
        callback: HandlerFn,
    ) -> Result<(), RouterError> {
        let method = method.into();
        if self.handlers.contains_key(&method) {
            return Err(RouterError::DuplicateHandler(method));
        }
        self.handlers.insert(method, HandlerEntry { args_fmt: args_fmt.into(), callback });
        Ok(())
    }

    /// All registered method names, in registration order.
    pub fn methods(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }

    /// The declared `args_fmt` for `method`, if registered.
    #[must_use]
    pub fn describe(&self, method: &str) -> Option<&str> {
        self.handlers.get(method).map(|h| h.args_fmt.as_str())
    }

    /// Temporarily take a handler's callback out of the registry so it can
    /// be invoked without holding a borrow across the call (a handler may
    /// itself call back into the router). Pair with [`Self::put_back`].
    pub(crate) fn take(&mut self, method: &str) -> Option<(String, HandlerFn)> {
        let entry = self.handlers.get_mut(method)?;
        let args_fmt = entry.args_fmt.clone();
        let callback = std::mem::replace(&mut entry.callback, Box::new(|_, _, _, _| {}));
        Some((args_fmt, callback))
    }

    /// Restore a callback previously removed by [`Self::take`].
    pub(crate) fn put_back(&mut self, method: &str, callback: HandlerFn) {
        if let Some(entry) = self.handlers.get_mut(method) {
            entry.callback = callback;
        }
    }
}
