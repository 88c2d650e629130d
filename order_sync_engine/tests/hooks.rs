use std::sync::{
    atomic::{AtomicI32, Ordering},
    Arc,
    Mutex,
};

use futures_util::FutureExt;
use log::*;
use order_sync_engine::{
    events::{EventHooks, GateChangedEvent, StreamStatusEvent},
    memory::{MemoryIdentityProvider, MemoryOrderStore},
    order_types::OrderStatusType::*,
    test_utils::{active_order, pending_with_issue, prepare_test_env, wait_for_view, INVALID_PROOF},
    GateCloseReason,
    GateTransition,
    OrderTracker,
    StreamStatus,
    TrackerConfig,
};

#[derive(Default, Clone)]
struct HookCalled {
    called: Arc<AtomicI32>,
}

impl HookCalled {
    pub fn called(&self) {
        let _ = self.called.fetch_add(1, Ordering::Relaxed);
    }

    pub fn count(&self) -> i32 {
        self.called.load(Ordering::Relaxed)
    }
}

#[tokio::test]
async fn gate_hook_sees_every_change() {
    prepare_test_env();
    let auth = MemoryIdentityProvider::signed_in("u1");
    let store = MemoryOrderStore::with_records(vec![pending_with_issue("o1", "u1", INVALID_PROOF)]);
    let seen = Arc::new(Mutex::new(Vec::<GateChangedEvent>::new()));
    let seen_copy = seen.clone();
    let mut hooks = EventHooks::default();
    hooks.on_gate_changed(move |ev| {
        info!("🪝️ {ev:?}");
        seen_copy.lock().unwrap().push(ev);
        async {}.boxed()
    });
    let tracker = OrderTracker::new(auth.clone(), store.clone(), TrackerConfig::default()).with_hooks(hooks).start().unwrap();
    let mut view = tracker.watch();
    wait_for_view(&mut view, |v| v.gate.open).await;
    tracker.acknowledge().await.unwrap();
    store.upsert(pending_with_issue("o2", "u1", INVALID_PROOF));
    wait_for_view(&mut view, |v| v.gate.open).await;
    auth.sign_out();
    wait_for_view(&mut view, |v| v.subject.is_none()).await;
    tracker.shutdown().await.unwrap();

    let seen = seen.lock().unwrap();
    let transitions = seen.iter().map(|ev| &ev.transition).collect::<Vec<_>>();
    assert_eq!(transitions.len(), 4);
    assert!(matches!(transitions[0], GateTransition::Opened(s) if s.order_id().as_str() == "o1"));
    assert_eq!(transitions[1], &GateTransition::Closed { order_id: "o1".into(), reason: GateCloseReason::Acknowledged });
    assert!(matches!(transitions[2], GateTransition::Opened(s) if s.order_id().as_str() == "o2"));
    assert_eq!(transitions[3], &GateTransition::Closed { order_id: "o2".into(), reason: GateCloseReason::SignedOut });
    assert!(seen.iter().all(|ev| ev.subject == Some("u1".into())));
}

#[tokio::test]
async fn stream_status_hook_follows_the_connection() {
    prepare_test_env();
    let auth = MemoryIdentityProvider::new();
    let store = MemoryOrderStore::with_records(vec![active_order("o1", "u1", Prepared)]);
    let statuses = Arc::new(Mutex::new(Vec::<StreamStatusEvent>::new()));
    let statuses_copy = statuses.clone();
    let gate_calls = HookCalled::default();
    let gate_calls_copy = gate_calls.clone();
    let mut hooks = EventHooks::default();
    hooks
        .on_stream_status(move |ev| {
            statuses_copy.lock().unwrap().push(ev);
            async {}.boxed()
        })
        .on_gate_changed(move |_| {
            gate_calls_copy.called();
            async {}.boxed()
        });
    let tracker = OrderTracker::new(auth.clone(), store.clone(), TrackerConfig::default()).with_hooks(hooks).start().unwrap();
    let mut view = tracker.watch();
    auth.sign_in("u1");
    wait_for_view(&mut view, |v| v.stream == StreamStatus::Live).await;
    store.revoke_access(&"u1".into());
    wait_for_view(&mut view, |v| matches!(v.stream, StreamStatus::Unavailable(_))).await;
    tracker.shutdown().await.unwrap();

    let statuses = statuses.lock().unwrap();
    let new_statuses = statuses.iter().map(|ev| ev.new_status.clone()).collect::<Vec<_>>();
    assert_eq!(new_statuses, vec![
        StreamStatus::Connecting,
        StreamStatus::Live,
        StreamStatus::Unavailable("permission denied for u1".into())
    ]);
    assert_eq!(statuses[0].old_status, StreamStatus::Idle);
    // No payment issues, so the gate never moved
    assert_eq!(gate_calls.count(), 0);
}

#[tokio::test]
async fn a_panicking_hook_does_not_stop_the_tracker() {
    prepare_test_env();
    let auth = MemoryIdentityProvider::signed_in("u1");
    let store = MemoryOrderStore::new();
    let mut hooks = EventHooks::default();
    hooks.on_gate_changed(|_| async { panic!("hook exploded") }.boxed());
    let tracker = OrderTracker::new(auth, store.clone(), TrackerConfig::default()).with_hooks(hooks).start().unwrap();
    let mut view = tracker.watch();
    store.upsert(pending_with_issue("o1", "u1", INVALID_PROOF));
    wait_for_view(&mut view, |v| v.gate.open).await;
    store.upsert(active_order("o1", "u1", Confirmed));
    wait_for_view(&mut view, |v| !v.gate.open && v.orders.len() == 1).await;
    assert!(tracker.is_running());
    tracker.shutdown().await.unwrap();
}
