//! An in-memory [`Channel`] pair, used by this crate's own tests and
//! available to embedders for wiring two in-process routers together
//! without a real transport.

use std::{cell::RefCell, collections::VecDeque, rc::Rc};

use crate::channel::Channel;

#[derive(Default)]
struct Shared {
    sent: VecDeque<Vec<u8>>,
}

/// One end of a loopback pair, registered with a router as a normal
/// [`Channel`].
pub struct LoopbackChannel {
    shared: Rc<RefCell<Shared>>,
    persistent: bool,
}

/// The test/embedder-facing other end: inspects frames the router sent.
pub struct LoopbackPeer {
    shared: Rc<RefCell<Shared>>,
}

impl LoopbackChannel {
    /// Create a connected pair. The channel is marked persistent so tests
    /// exercising multiple exchanges are not surprised by eviction on a
    /// non-persistent close.
    #[must_use]
    pub fn pair() -> (Self, LoopbackPeer) {
        let shared = Rc::new(RefCell::new(Shared::default()));
        (Self { shared: Rc::clone(&shared), persistent: true }, LoopbackPeer { shared })
    }

    /// Create a connected pair whose channel reports as non-persistent,
    /// for exercising close-on-disconnect eviction.
    #[must_use]
    pub fn transient_pair() -> (Self, LoopbackPeer) {
        let shared = Rc::new(RefCell::new(Shared::default()));
        (Self { shared: Rc::clone(&shared), persistent: false }, LoopbackPeer { shared })
    }
}

impl Channel for LoopbackChannel {
    fn connect(&mut self) {}

    fn close(&mut self) {}

    fn send_frame(&mut self, frame: &[u8]) -> bool {
        self.shared.borrow_mut().sent.push_back(frame.to_vec());
        true
    }

    fn channel_type(&self) -> &str { "loopback" }

    fn is_persistent(&self) -> bool { self.persistent }
}

impl LoopbackPeer {
    /// Pop the oldest frame the router sent on this channel, if any.
    pub fn take_sent(&self) -> Option<Vec<u8>> {
        self.shared.borrow_mut().sent.pop_front()
    }

    /// Number of frames currently buffered for inspection.
    #[must_use]
    pub fn sent_len(&self) -> usize {
        self.shared.borrow().sent.len()
    }
}
