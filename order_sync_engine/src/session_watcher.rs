//! Tracks who is signed in.
use std::future::pending;

use log::*;

use crate::{
    order_types::SubjectId,
    subscription::Subscription,
    tracker::TrackerError,
    traits::{IdentityFeed, IdentityProvider, IdentitySink},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionTransition {
    SignedIn(SubjectId),
    SignedOut { previous: SubjectId },
    /// A different subject signed in without an intervening sign-out.
    Switched { from: SubjectId, to: SubjectId },
}

impl SessionTransition {
    /// The subject that is current after this transition.
    pub fn current(&self) -> Option<&SubjectId> {
        match self {
            SessionTransition::SignedIn(s) => Some(s),
            SessionTransition::SignedOut { .. } => None,
            SessionTransition::Switched { to, .. } => Some(to),
        }
    }
}

/// Folds identity reports into [`SessionTransition`]s. Repeated reports of the same subject are not transitions.
#[derive(Debug, Default)]
pub struct SessionState {
    current: Option<SubjectId>,
}

impl SessionState {
    pub fn current(&self) -> Option<&SubjectId> {
        self.current.as_ref()
    }

    pub fn apply(&mut self, next: Option<SubjectId>) -> Option<SessionTransition> {
        let transition = match (self.current.take(), next.clone()) {
            (None, None) => None,
            (None, Some(to)) => Some(SessionTransition::SignedIn(to)),
            (Some(previous), None) => Some(SessionTransition::SignedOut { previous }),
            (Some(from), Some(to)) if from == to => None,
            (Some(from), Some(to)) => Some(SessionTransition::Switched { from, to }),
        };
        self.current = next;
        transition
    }
}

/// Observes an [`IdentityProvider`] for the lifetime of a tracker.
///
/// The provider's reports arrive through a channel with a single reader, so they are never handled concurrently. If
/// the provider goes away, the session is treated as signed out.
pub struct SessionWatcher {
    state: SessionState,
    feed: IdentityFeed,
    subscription: Option<Subscription>,
    feed_closed: bool,
}

impl SessionWatcher {
    pub fn observe<A: IdentityProvider>(auth: &A) -> Result<Self, TrackerError> {
        let (sink, feed) = IdentitySink::channel();
        let subscription = auth.observe_identity(sink)?;
        debug!("👤️ Observing identity via {}", subscription.label());
        Ok(Self { state: SessionState::default(), feed, subscription: Some(subscription), feed_closed: false })
    }

    pub fn current(&self) -> Option<&SubjectId> {
        self.state.current()
    }

    /// Waits for the next real transition. Never resolves once the provider has gone away and the resulting sign-out
    /// has been reported.
    pub async fn changed(&mut self) -> SessionTransition {
        loop {
            if self.feed_closed {
                return pending().await;
            }
            let next = match self.feed.recv().await {
                Some(next) => next,
                None => {
                    warn!("👤️ The identity provider has stopped reporting. Treating the session as signed out");
                    self.feed_closed = true;
                    None
                },
            };
            if let Some(transition) = self.apply(next) {
                return transition;
            }
        }
    }

    /// Handles every report that has already arrived, without waiting.
    pub fn drain(&mut self) -> Vec<SessionTransition> {
        let mut transitions = Vec::new();
        while !self.feed_closed {
            let next = match self.feed.try_recv() {
                Ok(next) => next,
                Err(tokio::sync::mpsc::error::TryRecvError::Empty) => break,
                Err(tokio::sync::mpsc::error::TryRecvError::Disconnected) => {
                    self.feed_closed = true;
                    None
                },
            };
            transitions.extend(self.apply(next));
        }
        transitions
    }

    /// Stops observing the provider.
    pub fn unsubscribe(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.unsubscribe();
        }
    }

    fn apply(&mut self, next: Option<SubjectId>) -> Option<SessionTransition> {
        let transition = self.state.apply(next);
        match &transition {
            Some(SessionTransition::SignedIn(s)) => info!("👤️ {s} signed in"),
            Some(SessionTransition::SignedOut { previous }) => info!("👤️ {previous} signed out"),
            Some(SessionTransition::Switched { from, to }) => info!("👤️ Session switched from {from} to {to}"),
            None => trace!("👤️ Identity report did not change the session"),
        }
        transition
    }
}
