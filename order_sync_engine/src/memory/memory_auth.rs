use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use log::*;

use super::lock;
use crate::{
    order_types::SubjectId,
    subscription::Subscription,
    tracker::TrackerError,
    traits::{IdentityProvider, IdentitySink},
};

#[derive(Default)]
struct IdentityInner {
    current: Option<SubjectId>,
    listeners: HashMap<u64, IdentitySink>,
    next_id: u64,
}

/// An identity provider whose sign-ins are driven by the test.
///
/// Clones share the same state. Dropping the last clone ends every observation: observers see their feed close,
/// which [`crate::session_watcher::SessionWatcher`] treats as a sign-out.
#[derive(Clone, Default)]
pub struct MemoryIdentityProvider {
    inner: Arc<Mutex<IdentityInner>>,
}

impl MemoryIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn signed_in(subject: impl Into<SubjectId>) -> Self {
        let provider = Self::default();
        provider.sign_in(subject);
        provider
    }

    pub fn current(&self) -> Option<SubjectId> {
        lock(&self.inner).current.clone()
    }

    pub fn listener_count(&self) -> usize {
        lock(&self.inner).listeners.len()
    }

    pub fn sign_in(&self, subject: impl Into<SubjectId>) {
        let subject = subject.into();
        debug!("👤️ [memory] Signing in {subject}");
        self.set(Some(subject));
    }

    pub fn sign_out(&self) {
        debug!("👤️ [memory] Signing out");
        self.set(None);
    }

    fn set(&self, subject: Option<SubjectId>) {
        let mut inner = lock(&self.inner);
        inner.current = subject.clone();
        inner.listeners.retain(|_, sink| sink.notify(subject.clone()));
    }
}

impl IdentityProvider for MemoryIdentityProvider {
    fn observe_identity(&self, sink: IdentitySink) -> Result<Subscription, TrackerError> {
        let mut inner = lock(&self.inner);
        if !sink.notify(inner.current.clone()) {
            return Err(TrackerError::IdentityUnavailable("the listener closed before it was registered".into()));
        }
        let id = inner.next_id;
        inner.next_id += 1;
        inner.listeners.insert(id, sink);
        let weak = Arc::downgrade(&self.inner);
        Ok(Subscription::new(format!("memory-identity-{id}"), move || {
            if let Some(inner) = weak.upgrade() {
                lock(&inner).listeners.remove(&id);
            }
        }))
    }
}
