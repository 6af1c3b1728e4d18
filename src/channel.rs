//! Channel registry and the per-channel open/busy state machine.
//!
//! A channel is any bidirectional byte-frame transport the embedder plugs
//! in (serial link, WebSocket, loopback, ...). The registry tracks one
//! slot per registered channel, indexed by a stable [`ChannelId`] handle
//! rather than a pointer, since channels and the router never share
//! ownership of each other.

use bitflags::bitflags;

/// The sentinel destination naming the default route.
pub const DEFAULT_ROUTE: &str = "*";

bitflags! {
    /// The two flags that determine a channel's state (see the state
    /// table in the component design docs).
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct ChannelState: u8 {
        /// The channel has completed its open handshake.
        const OPEN = 1 << 0;
        /// A send is in progress; a further `send_frame` must not be issued.
        const BUSY = 1 << 1;
    }
}

impl ChannelState {
    /// `true` if the channel may accept one frame immediately.
    #[must_use]
    pub const fn is_ready(self) -> bool { self.contains(Self::OPEN) && !self.contains(Self::BUSY) }

    /// `true` if a send is already in progress on this channel.
    #[must_use]
    pub const fn is_in_flight(self) -> bool { self.contains(Self::OPEN) && self.contains(Self::BUSY) }
}

/// A bidirectional byte-frame transport, as consumed by the router.
///
/// Implementations are expected to be driven by a single cooperative event
/// loop alongside the router: none of these methods block, and none of
/// them return a value describing eventual completion — that is instead
/// reported back to the router via its `on_channel_open`/`on_frame_sent`/
/// `on_channel_closed` entry points, called by whatever drives the
/// channel's real I/O.
pub trait Channel {
    /// Attempt to transition to the open state.
    fn connect(&mut self);

    /// Request the channel to close.
    fn close(&mut self);

    /// Attempt to transmit `frame`. Returns `true` if the channel accepted
    /// responsibility for the send (a `FrameSent` event will eventually
    /// follow); `false` means the caller must queue or drop the frame.
    fn send_frame(&mut self, frame: &[u8]) -> bool;

    /// A short descriptor used in logs and in [`crate::handler::FrameInfo`].
    fn channel_type(&self) -> &str;

    /// If `false`, the router evicts this channel's registry entry on
    /// close and on unrecoverable protocol errors.
    fn is_persistent(&self) -> bool;
}

/// Stable, non-owning handle to a registered channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChannelId(usize);

impl ChannelId {
    /// The handle's index into the registry's backing storage.
    #[must_use]
    pub const fn index(self) -> usize { self.0 }
}

struct ChannelSlot {
    dst: Option<String>,
    trusted: bool,
    state: ChannelState,
    channel: Box<dyn Channel>,
}

/// Tracks all registered channels, keyed by stable [`ChannelId`] handles.
#[derive(Default)]
pub struct ChannelRegistry {
    slots: Vec<Option<ChannelSlot>>,
}

impl ChannelRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Register a channel. `dst` may be empty, meaning it will be learned
    /// from the first frame received (see the dst-learning behaviour in
    /// the component design docs).
    pub fn add(&mut self, dst: Option<String>, trusted: bool, channel: Box<dyn Channel>) -> ChannelId {
        let slot = ChannelSlot { dst, trusted, state: ChannelState::empty(), channel };
        if let Some(idx) = self.slots.iter().position(Option::is_none) {
            self.slots[idx] = Some(slot);
            ChannelId(idx)
        } else {
            self.slots.push(Some(slot));
            ChannelId(self.slots.len() - 1)
        }
    }

    /// Replace the transport backing an already-registered slot, keeping
    /// its `dst`, trust flag, and state. Used when a channel's real
    /// implementation needs the [`ChannelId`] assigned to it before it can
    /// be constructed (for example, a socket task that reports events by
    /// id), so a placeholder is registered first and swapped out here.
    pub fn replace(&mut self, id: ChannelId, channel: Box<dyn Channel>) {
        if let Some(Some(slot)) = self.slots.get_mut(id.index()) {
            slot.channel = channel;
        }
    }

    /// Evict a channel's registry entry, freeing its learned `dst`.
    pub fn remove(&mut self, id: ChannelId) {
        if let Some(slot) = self.slots.get_mut(id.index()) {
            *slot = None;
        }
    }

    /// All currently-registered channel ids.
    pub fn ids(&self) -> impl Iterator<Item = ChannelId> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|_| ChannelId(i)))
    }

    /// Resolve a destination string to a channel id following the
    /// default-route rule: an exact `dst` match if `dst` is nonempty,
    /// otherwise the channel registered under [`DEFAULT_ROUTE`].
    #[must_use]
    pub fn resolve(&self, dst: &str) -> Option<ChannelId> {
        let target = if dst.is_empty() { DEFAULT_ROUTE } else { dst };
        self.find_by_dst(target)
    }

    fn find_by_dst(&self, dst: &str) -> Option<ChannelId> {
        self.slots.iter().enumerate().find_map(|(i, slot)| {
            slot.as_ref()
                .filter(|s| s.dst.as_deref() == Some(dst))
                .map(|_| ChannelId(i))
        })
    }

    /// The channel's learned or configured destination, if any.
    #[must_use]
    pub fn dst_of(&self, id: ChannelId) -> Option<&str> {
        self.slots.get(id.index())?.as_ref()?.dst.as_deref()
    }

    /// The channel's current open/busy state.
    #[must_use]
    pub fn state_of(&self, id: ChannelId) -> ChannelState {
        self.slots
            .get(id.index())
            .and_then(Option::as_ref)
            .map_or(ChannelState::empty(), |s| s.state)
    }

    /// Whether the slot identified by `id` is still registered.
    #[must_use]
    pub fn contains(&self, id: ChannelId) -> bool {
        matches!(self.slots.get(id.index()), Some(Some(_)))
    }

    pub(crate) fn learn_dst(&mut self, id: ChannelId, src: &str) {
        if let Some(Some(slot)) = self.slots.get_mut(id.index()) {
            if slot.dst.is_none() {
                slot.dst = Some(src.to_owned());
            }
        }
    }

    pub(crate) fn mark_open(&mut self, id: ChannelId) {
        if let Some(Some(slot)) = self.slots.get_mut(id.index()) {
            slot.state.insert(ChannelState::OPEN);
            slot.state.remove(ChannelState::BUSY);
        }
    }

    pub(crate) fn mark_closed(&mut self, id: ChannelId) {
        if let Some(Some(slot)) = self.slots.get_mut(id.index()) {
            slot.state = ChannelState::empty();
        }
    }

    pub(crate) fn mark_not_busy(&mut self, id: ChannelId) {
        if let Some(Some(slot)) = self.slots.get_mut(id.index()) {
            slot.state.remove(ChannelState::BUSY);
        }
    }

    pub(crate) fn is_persistent(&self, id: ChannelId) -> bool {
        self.slots
            .get(id.index())
            .and_then(Option::as_ref)
            .is_some_and(|s| s.channel.is_persistent())
    }

    pub(crate) fn is_trusted(&self, id: ChannelId) -> bool {
        self.slots
            .get(id.index())
            .and_then(Option::as_ref)
            .is_some_and(|s| s.trusted)
    }

    pub(crate) fn channel_type(&self, id: ChannelId) -> String {
        self.slots
            .get(id.index())
            .and_then(Option::as_ref)
            .map_or_else(String::new, |s| s.channel.channel_type().to_owned())
    }

    pub(crate) fn connect(&mut self, id: ChannelId) {
        if let Some(Some(slot)) = self.slots.get_mut(id.index()) {
            slot.channel.connect();
        }
    }

    pub(crate) fn close(&mut self, id: ChannelId) {
        if let Some(Some(slot)) = self.slots.get_mut(id.index()) {
            slot.channel.close();
        }
    }

    /// Attempt to send `frame` directly on `id` if it is currently ready.
    /// Returns `true` and flips the channel to in-flight on success.
    pub(crate) fn try_send(&mut self, id: ChannelId, frame: &[u8]) -> bool {
        let Some(Some(slot)) = self.slots.get_mut(id.index()) else { return false };
        if !slot.state.is_ready() {
            return false;
        }
        if slot.channel.send_frame(frame) {
            slot.state.insert(ChannelState::BUSY);
            true
        } else {
            false
        }
    }
}
