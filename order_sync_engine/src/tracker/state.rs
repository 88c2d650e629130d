use log::*;

use crate::{
    events::{GateChangedEvent, StreamEvent, StreamStatusEvent, TrackerNotice},
    notification_gate::{GateTransition, NotificationGate},
    order_set::{OrderSetReducer, SnapshotRejection},
    order_stream::OrderStreamSubscriber,
    order_types::SubjectId,
    session_watcher::SessionTransition,
    tracker::{StreamStatus, TrackerView},
    traits::OrderStore,
};

/// The orders page state for one device.
///
/// `TrackerState` wires the order subscription, the reducer and the notification gate together. It never blocks and
/// never spawns: identity transitions, stream deliveries and customer commands are fed in one at a time, by
/// [`crate::OrderTracker`] or directly by the caller.
pub struct TrackerState<S> {
    stream: OrderStreamSubscriber<S>,
    reducer: OrderSetReducer,
    gate: NotificationGate,
    status: StreamStatus,
    notices: Vec<TrackerNotice>,
}

impl<S: OrderStore> TrackerState<S> {
    pub fn new(store: S) -> Self {
        Self {
            stream: OrderStreamSubscriber::new(store),
            reducer: OrderSetReducer::default(),
            gate: NotificationGate::default(),
            status: StreamStatus::Idle,
            notices: Vec::new(),
        }
    }

    pub fn subject(&self) -> Option<&SubjectId> {
        self.reducer.subject()
    }

    pub fn status(&self) -> &StreamStatus {
        &self.status
    }

    pub fn view(&self) -> TrackerView {
        TrackerView {
            subject: self.reducer.subject().cloned(),
            orders: self.reducer.active_orders().clone(),
            gate: self.gate.state(),
            stream: self.status.clone(),
        }
    }

    /// Notifications produced since the last call, oldest first.
    pub fn take_notices(&mut self) -> Vec<TrackerNotice> {
        std::mem::take(&mut self.notices)
    }

    pub fn on_session(&mut self, transition: SessionTransition) {
        match transition {
            SessionTransition::SignedIn(subject) => self.start_session(subject),
            SessionTransition::Switched { from, to } => {
                trace!("🛰️ Ending session for {from} before starting one for {to}");
                self.end_session();
                self.start_session(to);
            },
            SessionTransition::SignedOut { previous } => {
                trace!("🛰️ Ending session for {previous}");
                self.end_session();
            },
        }
    }

    pub fn on_stream_event(&mut self, event: StreamEvent) {
        match event {
            StreamEvent::Snapshot { subject, records, .. } => match self.reducer.apply(&subject, records) {
                Ok(summary) => {
                    if !summary.malformed.is_empty() {
                        debug!("🛰️ {} malformed records left out of the snapshot for {subject}", summary.malformed.len());
                    }
                    self.set_status(StreamStatus::Live);
                    let transition = self.gate.update(self.reducer.active_orders());
                    self.note_gate(transition);
                },
                Err(SnapshotRejection::IdentityRace { expected, received }) => {
                    debug!("🛰️ Discarding snapshot for {received}; the current subject is {expected:?}");
                },
            },
            StreamEvent::Failed { subject, reason, .. } => {
                if self.reducer.subject() == Some(&subject) {
                    self.stream_unavailable(reason);
                } else {
                    debug!("🛰️ Ignoring a stream failure for {subject}, who is no longer signed in");
                }
            },
        }
    }

    /// Handles every stream delivery that has already arrived. Returns how many were handled.
    pub fn process_pending(&mut self) -> usize {
        let mut handled = 0;
        while let Some(event) = self.stream.try_next_event() {
            self.on_stream_event(event);
            handled += 1;
        }
        handled
    }

    /// Waits for the next delivery from the open subscription.
    pub async fn next_stream_event(&mut self) -> StreamEvent {
        self.stream.next_event().await
    }

    /// The customer dismissed the payment-proof notification.
    pub fn acknowledge(&mut self) -> GateTransition {
        let transition = self.gate.acknowledge();
        self.note_gate(transition.clone());
        transition
    }

    /// Reopens the order subscription after a failure. Returns false if there was nothing to reconnect.
    pub fn reconnect(&mut self) -> bool {
        let Some(subject) = self.reducer.subject().cloned() else {
            debug!("🛰️ Reconnect ignored, nobody is signed in");
            return false;
        };
        if !matches!(self.status, StreamStatus::Unavailable(_)) {
            debug!("🛰️ Reconnect ignored, the stream for {subject} is {}", self.status);
            return false;
        }
        info!("🛰️ Reconnecting the order stream for {subject}");
        self.connect(&subject);
        true
    }

    /// Releases the order subscription. The state is left as it was.
    pub fn shutdown(&mut self) {
        self.stream.close();
    }

    fn start_session(&mut self, subject: SubjectId) {
        self.reducer.begin(subject.clone());
        self.connect(&subject);
    }

    fn end_session(&mut self) {
        self.stream.close();
        let transition = self.gate.reset();
        self.note_gate(transition);
        self.reducer.reset();
        self.set_status(StreamStatus::Idle);
    }

    fn connect(&mut self, subject: &SubjectId) {
        self.set_status(StreamStatus::Connecting);
        if let Err(e) = self.stream.open(subject) {
            self.stream_unavailable(e.to_string());
        }
    }

    fn stream_unavailable(&mut self, reason: String) {
        self.stream.close();
        self.reducer.clear();
        let transition = self.gate.suspend();
        self.note_gate(transition);
        self.set_status(StreamStatus::Unavailable(reason));
    }

    fn set_status(&mut self, status: StreamStatus) {
        if self.status == status {
            return;
        }
        let old_status = std::mem::replace(&mut self.status, status.clone());
        debug!("🛰️ Order stream status: {old_status} -> {status}");
        let event = StreamStatusEvent { subject: self.reducer.subject().cloned(), old_status, new_status: status };
        self.notices.push(TrackerNotice::StreamStatusChanged(event));
    }

    fn note_gate(&mut self, transition: GateTransition) {
        if transition.is_change() {
            let event = GateChangedEvent::new(self.reducer.subject().cloned(), transition);
            self.notices.push(TrackerNotice::GateChanged(event));
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        memory::{MemoryIdentityProvider, MemoryOrderStore},
        notification_gate::{GateCloseReason, GateStatus},
        order_types::{OrderId, OrderRecord, OrderStatusType::*},
        session_watcher::SessionWatcher,
    };

    const INVALID: &str = "Invalid Proof of Payment";

    fn signed_in(store: &MemoryOrderStore, subject: &str) -> TrackerState<MemoryOrderStore> {
        let mut state = TrackerState::new(store.clone());
        state.on_session(SessionTransition::SignedIn(subject.into()));
        state.process_pending();
        state
    }

    #[test]
    fn sign_in_subscribes_and_goes_live() {
        let store = MemoryOrderStore::default();
        store.upsert(OrderRecord::new("o1", "u1", Pending));
        let mut state = TrackerState::new(store.clone());
        assert_eq!(state.status(), &StreamStatus::Idle);
        state.on_session(SessionTransition::SignedIn("u1".into()));
        assert_eq!(state.status(), &StreamStatus::Connecting);
        assert_eq!(store.listener_count(), 1);
        assert_eq!(state.process_pending(), 1);
        let view = state.view();
        assert_eq!(view.stream, StreamStatus::Live);
        assert_eq!(view.orders.ids(), vec![OrderId::from("o1")]);
        assert_eq!(view.gate.status(), GateStatus::Closed);
    }

    #[test]
    fn sign_out_clears_everything() {
        let store = MemoryOrderStore::default();
        store.upsert(OrderRecord::new("o1", "u1", Pending).with_issue(INVALID));
        let mut state = signed_in(&store, "u1");
        assert!(state.view().gate.open);
        state.take_notices();

        state.on_session(SessionTransition::SignedOut { previous: "u1".into() });
        let view = state.view();
        assert_eq!(view, TrackerView::default());
        assert_eq!(store.listener_count(), 0);
        let notices = state.take_notices();
        assert!(notices.iter().any(|n| matches!(n,
            TrackerNotice::GateChanged(GateChangedEvent {
                transition: GateTransition::Closed { reason: GateCloseReason::SignedOut, .. },
                ..
            })
        )));
    }

    #[test]
    fn switching_subjects_never_mixes_orders() {
        let store = MemoryOrderStore::default();
        store.upsert(OrderRecord::new("a1", "u1", Pending).with_issue(INVALID));
        store.upsert(OrderRecord::new("b1", "u2", Prepared));
        let mut state = TrackerState::new(store.clone());
        state.on_session(SessionTransition::SignedIn("u1".into()));
        // Don't process u1's first snapshot before the switch
        state.on_session(SessionTransition::Switched { from: "u1".into(), to: "u2".into() });
        state.process_pending();
        let view = state.view();
        assert_eq!(view.subject, Some("u2".into()));
        assert_eq!(view.orders.ids(), vec![OrderId::from("b1")]);
        assert!(!view.gate.open);
        assert_eq!(store.listener_count(), 1);
    }

    #[test]
    fn subscription_failure_degrades_and_reconnect_recovers() {
        let store = MemoryOrderStore::default();
        store.upsert(OrderRecord::new("o1", "u1", Pending).with_issue(INVALID));
        let mut state = signed_in(&store, "u1");
        assert!(state.view().gate.open);

        store.revoke_access(&"u1".into());
        state.process_pending();
        let view = state.view();
        assert!(matches!(view.stream, StreamStatus::Unavailable(_)));
        assert!(view.orders.is_empty());
        assert!(!view.gate.open);
        assert_eq!(store.listener_count(), 0);

        // Still revoked: the subscribe call itself fails
        assert!(state.reconnect());
        assert!(matches!(state.status(), StreamStatus::Unavailable(_)));

        store.restore_access(&"u1".into());
        assert!(state.reconnect());
        state.process_pending();
        let view = state.view();
        assert_eq!(view.stream, StreamStatus::Live);
        assert!(view.gate.open);
        assert!(!state.reconnect());
    }

    #[test]
    fn acknowledgment_survives_a_reconnect() {
        let store = MemoryOrderStore::default();
        store.upsert(OrderRecord::new("o1", "u1", Pending).with_issue(INVALID));
        let mut state = signed_in(&store, "u1");
        state.acknowledge();
        store.revoke_access(&"u1".into());
        state.process_pending();
        store.restore_access(&"u1".into());
        state.reconnect();
        state.process_pending();
        assert_eq!(state.view().stream, StreamStatus::Live);
        assert!(!state.view().gate.open);
    }

    #[test]
    fn works_with_a_session_watcher() {
        let auth = MemoryIdentityProvider::signed_in("u1");
        let store = MemoryOrderStore::default();
        store.upsert(OrderRecord::new("o1", "u1", Delivery));
        let mut watcher = SessionWatcher::observe(&auth).unwrap();
        let mut state = TrackerState::new(store.clone());
        for transition in watcher.drain() {
            state.on_session(transition);
        }
        state.process_pending();
        assert_eq!(state.view().orders.len(), 1);
        auth.sign_out();
        for transition in watcher.drain() {
            state.on_session(transition);
        }
        assert!(state.view().orders.is_empty());
        assert_eq!(store.listener_count(), 0);
        drop(watcher);
        assert_eq!(auth.listener_count(), 0);
    }
}
