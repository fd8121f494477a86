//! Map focus store
//!
//! A single typed slot holding the facility the map should navigate to (for
//! example, a clinic picked from a chat answer), with change notification.
//! Owned by the presentation layer; not shared across threads.

use crate::adapter::{FacilityId, FacilityRecord};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener = Box<dyn FnMut(Option<&FacilityId>)>;

#[derive(Default)]
pub struct FocusStore {
    target: Option<FacilityId>,
    listeners: Vec<(SubscriptionId, Listener)>,
    next_id: u64,
}

impl fmt::Debug for FocusStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FocusStore")
            .field("target", &self.target)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl FocusStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn target(&self) -> Option<&FacilityId> {
        self.target.as_ref()
    }

    /// Set the target and notify subscribers. Re-setting the same id is a no-op.
    pub fn set_target(&mut self, id: FacilityId) {
        if self.target.as_ref() == Some(&id) {
            return;
        }
        self.target = Some(id);
        self.notify();
    }

    pub fn clear(&mut self) {
        if self.target.take().is_some() {
            self.notify();
        }
    }

    pub fn subscribe(&mut self, listener: impl FnMut(Option<&FacilityId>) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Returns false when the subscription was already gone
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(sid, _)| *sid != id);
        self.listeners.len() != before
    }

    /// Look the current target up in a facility snapshot
    pub fn resolve<'a>(&self, facilities: &'a [FacilityRecord]) -> Option<&'a FacilityRecord> {
        let target = self.target.as_ref()?;
        facilities.iter().find(|f| &f.id == target)
    }

    fn notify(&mut self) {
        let target = self.target.as_ref();
        for (_, listener) in self.listeners.iter_mut() {
            listener(target);
        }
    }
}
