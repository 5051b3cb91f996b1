use std::fmt;

/// Callback invoked after the ledger changed. It carries no payload: listeners
/// read the state they care about through the resource manager handle.
pub type ResourcesChangedListener = Box<dyn FnMut() + Send + 'static>;

/// Ordered list of listeners, notified synchronously on the control loop.
///
/// A listener holds no reference into the resource manager, so it can only
/// come back through the command queue, after the current pass completed.
#[derive(Default)]
pub struct ListenerRegistry {
    listeners: Vec<ResourcesChangedListener>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        ListenerRegistry::default()
    }

    pub fn register(&mut self, listener: ResourcesChangedListener) {
        self.listeners.push(listener);
    }

    /// Invokes every listener once, in registration order.
    pub fn notify_all(&mut self) {
        for listener in self.listeners.iter_mut() {
            listener();
        }
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

impl fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
