//! Face requirement listeners
//!
//! Owned by the session and notified synchronously inside the frame step.

use crate::types::FaceRequirement;

/// Handle returned on registration, used to unregister
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerHandle(u64);

type Listener = Box<dyn FnMut(&FaceRequirement) + Send + Sync>;

/// Ordered list of requirement listeners
#[derive(Default)]
pub struct RequirementListeners {
    next_id: u64,
    listeners: Vec<(ListenerHandle, Listener)>,
}

impl std::fmt::Debug for RequirementListeners {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequirementListeners")
            .field("count", &self.listeners.len())
            .finish()
    }
}

impl RequirementListeners {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, listener: impl FnMut(&FaceRequirement) + Send + Sync + 'static) -> ListenerHandle {
        let handle = ListenerHandle(self.next_id);
        self.next_id += 1;
        self.listeners.push((handle, Box::new(listener)));
        handle
    }

    /// Returns false if the handle was not registered
    pub fn unregister(&mut self, handle: ListenerHandle) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(h, _)| *h != handle);
        self.listeners.len() != before
    }

    /// Notify a single listener, e.g. one registered mid-period
    pub fn notify_one(&mut self, handle: ListenerHandle, requirement: &FaceRequirement) {
        if let Some((_, listener)) = self.listeners.iter_mut().find(|(h, _)| *h == handle) {
            listener(requirement);
        }
    }

    pub fn notify_all(&mut self, requirement: &FaceRequirement) {
        for (_, listener) in self.listeners.iter_mut() {
            listener(requirement);
        }
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    pub fn clear(&mut self) {
        self.listeners.clear();
    }
}
