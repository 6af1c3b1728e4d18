//! Connection lifecycle notifications to embedders.

/// A channel open/close notification.
///
/// Only raised for channels that have an associated `dst`: a channel
/// registered with an empty destination that never learns one from a
/// received frame never reaches an observer.
pub enum ChannelLifecycleEvent {
    /// A channel finished its open handshake.
    Open {
        /// The channel's destination.
        dst: String,
    },
    /// A channel closed.
    Closed {
        /// The channel's destination.
        dst: String,
    },
}

/// An observer callback.
pub type ObserverFn = Box<dyn FnMut(&ChannelLifecycleEvent)>;

/// Stable handle to a registered observer, returned by `add_observer` and
/// consumed by `remove_observer`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(usize);

/// The set of registered lifecycle observers.
#[derive(Default)]
pub struct ObserverList {
    observers: Vec<Option<ObserverFn>>,
}

impl ObserverList {
    /// Create an empty observer list.
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Register an observer, returning a handle for later removal.
    pub fn add(&mut self, observer: ObserverFn) -> ObserverId {
        if let Some(idx) = self.observers.iter().position(Option::is_none) {
            self.observers[idx] = Some(observer);
            ObserverId(idx)
        } else {
            self.observers.push(Some(observer));
            ObserverId(self.observers.len() - 1)
        }
    }

    /// Unregister a previously-added observer. A no-op if already removed.
    pub fn remove(&mut self, id: ObserverId) {
        if let Some(slot) = self.observers.get_mut(id.0) {
            *slot = None;
        }
    }

    /// Notify every registered observer of `event`.
    pub fn notify(&mut self, event: &ChannelLifecycleEvent) {
        for observer in self.observers.iter_mut().flatten() {
            observer(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, rc::Rc};

    use rstest::rstest;

    use super::{ChannelLifecycleEvent, ObserverList};

    #[rstest]
    fn notify_reaches_all_observers() {
        let mut list = ObserverList::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen_a = Rc::clone(&seen);
        let seen_b = Rc::clone(&seen);
        list.add(Box::new(move |_event| seen_a.borrow_mut().push('a')));
        list.add(Box::new(move |_event| seen_b.borrow_mut().push('b')));

        list.notify(&ChannelLifecycleEvent::Open { dst: "peer".to_owned() });

        assert_eq!(*seen.borrow(), vec!['a', 'b']);
    }

    #[rstest]
    fn removed_observer_is_not_notified() {
        let mut list = ObserverList::new();
        let seen = Rc::new(RefCell::new(0));
        let seen_clone = Rc::clone(&seen);
        let id = list.add(Box::new(move |_event| *seen_clone.borrow_mut() += 1));
        list.remove(id);

        list.notify(&ChannelLifecycleEvent::Closed { dst: "peer".to_owned() });

        assert_eq!(*seen.borrow(), 0);
    }
}
