//! The dispatcher: ties the channel registry, outbound queue, handler
//! registry, and request table together into the router's public API.
//!
//! The scheduling model is single-threaded cooperative (see the
//! concurrency design docs): no locks appear anywhere. [`Router`] is kept
//! behind an [`Rc<RefCell<_>>`] rather than the `Arc<Mutex<_>>` style the
//! rest of this crate's lineage favours for its async, multi-task server,
//! because this spec mandates exactly one cooperative executor driving
//! every channel event, handler invocation, and queue drain. [`RouterHandle`]
//! is the cheaply-cloneable handle embedders and handlers hold; handlers
//! receive one so they can call `respond_success`/`respond_error` from
//! wherever their own completion happens, synchronously or not, as long as
//! it happens on the same executor.
//!
//! `RPC.Hello` (named in the well-known method list) is not auto-registered
//! by [`RouterHandle::add_list_handler`]: the reference implementation this
//! spec distills reserves the name for peer liveness probes without wiring
//! a built-in handler for it, so an unanswered `RPC.Hello` is logged at
//! `debug` rather than `warn` and otherwise behaves like any other 404.
//! Embedders that want it to succeed register their own handler.

use std::{cell::RefCell, rc::Rc};

use serde_json::Value;
use tracing::{debug, warn};

use crate::{
    channel::{Channel, ChannelId, ChannelRegistry},
    config::RouterConfig,
    envelope::{Body, Envelope, VERSION},
    error::RouterError,
    handler::{FrameInfo, HandlerFn, HandlerRegistry, RequestInfo},
    id::IdGenerator,
    introspection::{self, RPC_DESCRIBE, RPC_HELLO, RPC_LIST},
    observer::{ChannelLifecycleEvent, ObserverFn, ObserverId, ObserverList},
    queue::{DrainAction, OutboundQueue},
    request_table::{CallResult, ReplyFn, RequestTable},
};

/// Options for an originated call (see `call` in the public operations
/// list).
#[derive(Debug, Clone, Default)]
pub struct CallOptions {
    /// Destination to send to; empty means the default route.
    pub dst: String,
    /// Correlation tag to attach, echoed back on the reply.
    pub tag: String,
}

struct Router {
    identity: String,
    channels: ChannelRegistry,
    queue: OutboundQueue,
    handlers: HandlerRegistry,
    requests: RequestTable,
    observers: ObserverList,
    ids: IdGenerator,
}

/// What to do after the initial (possibly reentrant-unsafe) phase of
/// handling a received frame.
enum Incoming {
    /// A handler must be invoked; its callback has been taken out of the
    /// registry and must be put back under `method` afterward.
    Invoke { method: String, callback: HandlerFn, req: RequestInfo, info: FrameInfo, args: Vec<u8> },
    /// Nothing further to do; the borrow may be released.
    Done,
}

impl Router {
    fn new(cfg: RouterConfig) -> Self {
        Self {
            identity: cfg.id,
            channels: ChannelRegistry::new(),
            queue: OutboundQueue::new(cfg.max_queue_size),
            handlers: HandlerRegistry::new(),
            requests: RequestTable::new(),
            observers: ObserverList::new(),
            ids: IdGenerator::new(),
        }
    }

    fn drain_queue(&mut self) {
        let channels = &mut self.channels;
        let queue = &mut self.queue;
        queue.drain_with(|dst, frame| {
            match channels.resolve(dst) {
                Some(id) if channels.try_send(id, frame) => DrainAction::Sent,
                _ => DrainAction::Skip,
            }
        });
    }

    /// Send directly if a channel resolves and is ready; otherwise enqueue.
    /// Returns `false` only if the queue is also full.
    fn dispatch_or_queue(&mut self, dst: &str, frame: Vec<u8>) -> bool {
        if let Some(id) = self.channels.resolve(dst) {
            if self.channels.try_send(id, &frame) {
                return true;
            }
        }
        self.queue.enqueue(dst.to_owned(), frame)
    }

    /// Send a reply, preferring the channel the request arrived on before
    /// falling back to default-route resolution by `dst`.
    fn dispatch_reply(&mut self, preferred: ChannelId, dst: &str, frame: Vec<u8>) {
        if self.channels.contains(preferred) && self.channels.try_send(preferred, &frame) {
            return;
        }
        let _ = self.dispatch_or_queue(dst, frame);
    }

    fn reply(&mut self, req: RequestInfo, body: Body) {
        let envelope = Envelope {
            version: VERSION,
            id: req.id,
            src: self.identity.clone(),
            dst: req.src.clone(),
            tag: req.tag.clone(),
            body,
        };
        match envelope.emit() {
            Ok(bytes) => self.dispatch_reply(req.channel, &req.src, bytes),
            Err(err) => warn!(%err, "failed to emit reply envelope"),
        }
    }

    fn maybe_close_non_persistent(&mut self, id: ChannelId) {
        if !self.channels.is_persistent(id) {
            self.close_channel(id);
        }
    }

    fn close_channel(&mut self, id: ChannelId) {
        self.channels.close(id);
        self.finish_close(id);
    }

    fn finish_close(&mut self, id: ChannelId) {
        let dst = self.channels.dst_of(id).map(str::to_owned);
        self.channels.mark_closed(id);
        if let Some(dst) = dst {
            self.observers.notify(&ChannelLifecycleEvent::Closed { dst });
        }
        if !self.channels.is_persistent(id) {
            self.channels.remove(id);
        }
    }

    fn prepare_incoming(&mut self, id: ChannelId, bytes: &[u8]) -> Incoming {
        if !self.channels.contains(id) {
            warn!("frame received on an unregistered channel");
            return Incoming::Done;
        }

        let envelope = match Envelope::parse(bytes) {
            Ok(env) => env,
            Err(err) => {
                warn!(%err, "malformed frame");
                self.maybe_close_non_persistent(id);
                return Incoming::Done;
            }
        };

        if !envelope.dst.is_empty() && envelope.dst != self.identity {
            warn!(dst = %envelope.dst, "frame addressed to a different identity, dropping");
            return Incoming::Done;
        }

        self.channels.learn_dst(id, &envelope.src);

        match envelope.body {
            Body::Request { method, args } => self.prepare_request(id, envelope.id, envelope.src, envelope.tag, method, args),
            Body::Success { result } => {
                self.complete_response(id, envelope.id, CallResult::Success(result));
                Incoming::Done
            }
            Body::Error { code, message } => {
                self.complete_response(id, envelope.id, CallResult::Error { code, message: message.unwrap_or_default() });
                Incoming::Done
            }
        }
    }

    fn prepare_request(
        &mut self,
        channel: ChannelId,
        id: i64,
        src: String,
        tag: String,
        method: String,
        args: Option<Value>,
    ) -> Incoming {
        let Some((args_fmt, callback)) = self.handlers.take(&method) else {
            if method == RPC_HELLO {
                debug!(%method, "no handler registered for liveness probe");
            } else {
                warn!(%method, "no handler registered");
            }
            let req = RequestInfo { id, src, tag, channel, args_fmt: String::new() };
            self.reply(req, Body::Error { code: 404, message: Some(format!("No handler for {method}")) });
            return Incoming::Done;
        };

        let info = FrameInfo {
            channel_type: self.channels.channel_type(channel),
            channel_is_trusted: self.channels.is_trusted(channel),
        };
        let req = RequestInfo { id, src, tag, channel, args_fmt };
        let args_bytes = args.map(|v| serde_json::to_vec(&v).unwrap_or_default()).unwrap_or_default();
        Incoming::Invoke { method, callback, req, info, args: args_bytes }
    }

    fn complete_response(&mut self, channel: ChannelId, id: i64, result: CallResult) {
        if id == 0 {
            warn!("response frame carries id 0, dropping");
            return;
        }
        let info = FrameInfo {
            channel_type: self.channels.channel_type(channel),
            channel_is_trusted: self.channels.is_trusted(channel),
        };
        if !self.requests.complete(id, result, info) {
            debug!(id, "no in-flight request for this id, ignoring response");
        }
    }
}

/// A cheaply-cloneable handle to a [`Router`]: the type embedders and
/// handlers actually hold.
#[derive(Clone)]
pub struct RouterHandle(Rc<RefCell<Router>>);

impl RouterHandle {
    /// Construct a new router.
    #[must_use]
    pub fn new(cfg: RouterConfig) -> Self { Self(Rc::new(RefCell::new(Router::new(cfg)))) }

    /// Register a channel. Returns a stable handle used to address it and
    /// to report its events back to the router.
    #[must_use]
    pub fn add_channel(&self, dst: impl Into<String>, trusted: bool, channel: Box<dyn Channel>) -> ChannelId {
        let dst = dst.into();
        let dst = if dst.is_empty() { None } else { Some(dst) };
        self.0.borrow_mut().channels.add(dst, trusted, channel)
    }

    /// Replace the transport backing `id`. See
    /// [`crate::channel::ChannelRegistry::replace`].
    pub fn replace_channel(&self, id: ChannelId, channel: Box<dyn Channel>) {
        self.0.borrow_mut().channels.replace(id, channel);
    }

    /// Attempt to open every registered channel.
    pub fn connect(&self) {
        let mut r = self.0.borrow_mut();
        let ids: Vec<ChannelId> = r.channels.ids().collect();
        for id in ids {
            r.channels.connect(id);
        }
    }

    /// Request close of every registered channel. Only requests the
    /// transport-level close; the matching `on_channel_closed` event (driven
    /// by whatever runs the channel's real I/O) is what notifies observers
    /// and evicts the registry entry, so that work happens exactly once.
    pub fn disconnect(&self) {
        let mut r = self.0.borrow_mut();
        let ids: Vec<ChannelId> = r.channels.ids().collect();
        for id in ids {
            r.channels.close(id);
        }
    }

    /// Register a handler for `method`.
    ///
    /// # Errors
    /// Returns [`RouterError::DuplicateHandler`] if `method` is already
    /// registered.
    pub fn add_handler(
        &self,
        method: impl Into<String>,
        args_fmt: impl Into<String>,
        callback: HandlerFn,
    ) -> Result<(), RouterError> {
        self.0.borrow_mut().handlers.register(method, args_fmt, callback)
    }

    /// Register the built-in `RPC.List`/`RPC.Describe` introspection
    /// handlers.
    ///
    /// # Errors
    /// Returns [`RouterError::DuplicateHandler`] if called more than once,
    /// or if an embedder already registered a handler under either name.
    pub fn add_list_handler(&self) -> Result<(), RouterError> {
        self.add_handler(RPC_LIST, "", introspection::list_handler())?;
        self.add_handler(RPC_DESCRIBE, "{name: %T}", introspection::describe_handler())?;
        Ok(())
    }

    /// Originate a call. Returns `false` if no channel could be resolved
    /// and the outbound queue was already full; in that case `reply`, if
    /// supplied, is dropped without being invoked.
    #[must_use]
    pub fn call(&self, method: impl Into<String>, opts: CallOptions, args: Option<Value>, reply: Option<ReplyFn>) -> bool {
        let mut r = self.0.borrow_mut();
        let id = r.ids.next_id();
        let envelope = Envelope {
            version: VERSION,
            id,
            src: r.identity.clone(),
            dst: opts.dst.clone(),
            tag: opts.tag,
            body: Body::Request { method: method.into(), args },
        };
        let Ok(bytes) = envelope.emit() else { return false };
        let dispatched = r.dispatch_or_queue(&opts.dst, bytes);
        if dispatched {
            if let Some(cb) = reply {
                r.requests.insert(id, cb);
            }
        }
        dispatched
    }

    /// Reply to `req` with success. Consumes `req`, so a handler can call
    /// this at most once for a given invocation.
    pub fn respond_success(&self, req: RequestInfo, payload: Option<Value>) {
        self.0.borrow_mut().reply(req, Body::Success { result: payload });
    }

    /// Reply to `req` with an error. Consumes `req`, so a handler can call
    /// this at most once for a given invocation.
    pub fn respond_error(&self, req: RequestInfo, code: i32, message: Option<String>) {
        self.0.borrow_mut().reply(req, Body::Error { code, message });
    }

    /// Release `req` without sending a reply. Exists for API parity with
    /// embedders that decide, after the fact, not to answer a call (for
    /// example during shutdown); `RequestInfo` owns no resources beyond
    /// plain `String`s, so this is just a drop.
    pub fn free_request_info(&self, _req: RequestInfo) {}

    /// `true` if at least one channel has completed its open handshake.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        let r = self.0.borrow();
        r.channels.ids().any(|id| {
            let state = r.channels.state_of(id);
            state.is_ready() || state.is_in_flight()
        })
    }

    /// `true` if at least one channel can accept a frame right now.
    #[must_use]
    pub fn can_send(&self) -> bool {
        let r = self.0.borrow();
        r.channels.ids().any(|id| r.channels.state_of(id).is_ready())
    }

    /// Register a lifecycle observer.
    #[must_use]
    pub fn add_observer(&self, observer: ObserverFn) -> ObserverId {
        self.0.borrow_mut().observers.add(observer)
    }

    /// Unregister a previously-added observer.
    pub fn remove_observer(&self, id: ObserverId) {
        self.0.borrow_mut().observers.remove(id);
    }

    /// Registration-order list of every registered method name.
    #[must_use]
    pub fn list_methods(&self) -> Vec<String> {
        self.0.borrow().handlers.methods().map(str::to_owned).collect()
    }

    /// The `args_fmt` declared for `method`, if registered.
    #[must_use]
    pub fn describe_method(&self, method: &str) -> Option<String> {
        self.0.borrow().handlers.describe(method).map(str::to_owned)
    }

    /// Report that channel `id` completed its open handshake.
    pub fn on_channel_open(&self, id: ChannelId) {
        let mut r = self.0.borrow_mut();
        r.channels.mark_open(id);
        if let Some(dst) = r.channels.dst_of(id).map(str::to_owned) {
            r.observers.notify(&ChannelLifecycleEvent::Open { dst });
        }
        r.drain_queue();
    }

    /// Report that channel `id` received a raw frame.
    pub fn on_frame_received(&self, id: ChannelId, bytes: &[u8]) {
        let outcome = self.0.borrow_mut().prepare_incoming(id, bytes);
        if let Incoming::Invoke { method, callback, req, info, args } = outcome {
            let mut callback = callback;
            callback(self.clone(), req, info, &args);
            self.0.borrow_mut().handlers.put_back(&method, callback);
        }
    }

    /// Report that channel `id` finished a send. `success` is informational
    /// only: the queue is drained whether or not the send succeeded.
    pub fn on_frame_sent(&self, id: ChannelId, success: bool) {
        debug!(success, "frame sent");
        let mut r = self.0.borrow_mut();
        r.channels.mark_not_busy(id);
        r.drain_queue();
    }

    /// Report that channel `id` closed.
    pub fn on_channel_closed(&self, id: ChannelId) {
        self.0.borrow_mut().finish_close(id);
    }
}
