use std::collections::VecDeque;

/// Default number of events retained for traceability.
pub const DEFAULT_HISTORY: usize = 256;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

/// An emitted event stamped with its 0-based emission sequence number.
#[derive(Debug, Clone, PartialEq)]
pub struct Recorded<E> {
    pub seq: u64,
    pub event: E,
}

type Listener<E> = Box<dyn FnMut(&E)>;

/// Single-threaded observer registry.
///
/// Listeners run synchronously, in subscription order, on the thread that
/// calls [`EventBus::emit`]. A bounded tail of emitted events is kept so
/// callers (and tests) can inspect what happened without subscribing.
pub struct EventBus<E> {
    next_id: u64,
    next_seq: u64,
    listeners: Vec<(SubscriptionId, Listener<E>)>,
    history: VecDeque<Recorded<E>>,
    history_limit: usize,
}

impl<E: Clone> EventBus<E> {
    pub fn new() -> Self {
        Self::with_history(DEFAULT_HISTORY)
    }

    pub fn with_history(history_limit: usize) -> Self {
        Self {
            next_id: 0,
            next_seq: 0,
            listeners: Vec::new(),
            history: VecDeque::with_capacity(history_limit.min(DEFAULT_HISTORY)),
            history_limit,
        }
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&E) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id = self.next_id.wrapping_add(1);
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Returns `false` if `id` was not (or is no longer) subscribed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(sid, _)| *sid != id);
        self.listeners.len() != before
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    pub fn emit(&mut self, event: E) {
        for (_, listener) in &mut self.listeners {
            listener(&event);
        }

        let seq = self.next_seq;
        self.next_seq = self.next_seq.wrapping_add(1);
        if self.history_limit == 0 {
            return;
        }
        if self.history.len() == self.history_limit {
            self.history.pop_front();
        }
        self.history.push_back(Recorded { seq, event });
    }

    pub fn events(&self) -> impl Iterator<Item = &Recorded<E>> {
        self.history.iter()
    }

    pub fn drain(&mut self) -> Vec<Recorded<E>> {
        self.history.drain(..).collect()
    }

    /// Drop every listener. Recorded history is kept.
    pub fn clear_listeners(&mut self) {
        if !self.listeners.is_empty() {
            tracing::debug!(count = self.listeners.len(), "dropping event listeners");
        }
        self.listeners.clear();
    }
}

impl<E: Clone> Default for EventBus<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> std::fmt::Debug for EventBus<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.listeners.len())
            .field("recorded", &self.history.len())
            .field("next_seq", &self.next_seq)
            .finish()
    }
}
