use crate::color::Palette;

/// Broadcast after every successful color-update cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorsUpdated(pub Palette);

type Subscriber<E> = Box<dyn FnMut(&E)>;

/// In-process publish/subscribe. Subscribers run synchronously, in the order
/// they subscribed.
pub struct EventBus<E> {
    subscribers: Vec<Subscriber<E>>,
}

impl<E> EventBus<E> {
    pub fn new() -> Self {
        Self {
            subscribers: Vec::new(),
        }
    }

    pub fn subscribe(&mut self, subscriber: impl FnMut(&E) + 'static) {
        self.subscribers.push(Box::new(subscriber));
    }

    pub fn publish(&mut self, event: &E) {
        for subscriber in &mut self.subscribers {
            subscriber(event);
        }
    }
}

impl<E> Default for EventBus<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> std::fmt::Debug for EventBus<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}
