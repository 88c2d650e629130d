//! Simple stateless pub-sub for tracker notifications
//!
//! Presentation collaborators that prefer to be pushed changes, rather than watch the tracker view, register async
//! hooks. Each hook gets its own [`EventHandler`], which runs on its own task and receives events through a bounded
//! channel. Handlers only see the event itself, never the tracker's internal state.
use std::{future::Future, pin::Pin, sync::Arc};

use log::*;
use tokio::{sync::mpsc, task::JoinSet};

pub type Handler<E> = Arc<dyn Fn(E) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

pub struct EventHandler<E: Send + Sync + 'static> {
    listener: mpsc::Receiver<E>,
    sender: mpsc::Sender<E>,
    handler: Handler<E>,
}

impl<E: Send + Sync + 'static> EventHandler<E> {
    pub fn new(buffer_size: usize, handler: Handler<E>) -> Self {
        let (sender, receiver) = mpsc::channel(buffer_size.max(1));
        Self { listener: receiver, sender, handler }
    }

    pub fn subscribe(&self) -> EventProducer<E> {
        EventProducer::new(self.sender.clone())
    }

    /// Runs the handler for every published event until every producer has been dropped, then waits for the jobs
    /// still in flight before returning.
    pub async fn start_handler(mut self) {
        debug!("📬️ Starting event handler");
        // The internal sender must go, otherwise the channel never closes when the last producer is dropped.
        drop(self.sender);
        let mut jobs = JoinSet::new();
        while let Some(ev) = self.listener.recv().await {
            trace!("📬️ Handling event");
            let handler = Arc::clone(&self.handler);
            jobs.spawn(async move {
                (handler)(ev).await;
            });
            // Reap whatever has already finished so the set doesn't grow without bound.
            while let Some(done) = jobs.try_join_next() {
                log_job_result(done);
            }
        }
        if !jobs.is_empty() {
            debug!("📬️ Waiting for {} jobs to complete", jobs.len());
        }
        while let Some(done) = jobs.join_next().await {
            log_job_result(done);
        }
        debug!("📬️ Event handler has shut down");
    }
}

fn log_job_result(result: Result<(), tokio::task::JoinError>) {
    match result {
        Ok(()) => trace!("📬️ Event handled"),
        Err(e) => warn!("📬️ An event hook failed: {e}"),
    }
}

/// The publishing side of an [`EventHandler`]. Cheap to clone; the handler stops once every producer is gone.
#[derive(Clone)]
pub struct EventProducer<E: Send + Sync> {
    sender: mpsc::Sender<E>,
}

impl<E: Send + Sync> EventProducer<E> {
    pub fn new(sender: mpsc::Sender<E>) -> Self {
        Self { sender }
    }

    /// Queues `event` for the hook, waiting while its buffer is full. Returns false if the hook task has gone away, in
    /// which case the event is dropped.
    pub async fn publish_event(&self, event: E) -> bool {
        match self.sender.send(event).await {
            Ok(()) => true,
            Err(_) => {
                warn!("📬️ Hook task is no longer running. Notification dropped");
                false
            },
        }
    }
}

#[cfg(test)]
mod test {
    use std::sync::Mutex;

    use super::*;
    use crate::{events::GateChangedEvent, notification_gate::GateCloseReason, GateTransition};

    fn closed(id: &str) -> GateChangedEvent {
        let transition = GateTransition::Closed { order_id: id.into(), reason: GateCloseReason::Resolved };
        GateChangedEvent::new(Some("u1".into()), transition)
    }

    fn recorder() -> (Arc<Mutex<Vec<String>>>, Handler<GateChangedEvent>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_copy = seen.clone();
        let handler: Handler<GateChangedEvent> = Arc::new(move |ev: GateChangedEvent| {
            let seen = seen_copy.clone();
            Box::pin(async move {
                tokio::time::sleep(tokio::time::Duration::from_millis(5)).await;
                if let GateTransition::Closed { order_id, .. } = ev.transition {
                    seen.lock().unwrap().push(order_id.to_string());
                }
            }) as Pin<Box<dyn Future<Output = ()> + Send>>
        });
        (seen, handler)
    }

    #[tokio::test]
    async fn every_event_from_every_producer_is_handled() {
        let _ = env_logger::try_init();
        let (seen, handler) = recorder();
        let event_handler = EventHandler::new(1, handler);
        let tracker_a = event_handler.subscribe();
        let tracker_b = event_handler.subscribe();
        tokio::spawn(async move {
            for i in 0..5 {
                assert!(tracker_a.publish_event(closed(&format!("a{i}"))).await);
            }
        });
        tokio::spawn(async move {
            for i in 0..5 {
                assert!(tracker_b.publish_event(closed(&format!("b{i}"))).await);
            }
        });
        // Returns once both producers are dropped and the jobs have finished
        event_handler.start_handler().await;
        let mut seen = seen.lock().unwrap().clone();
        seen.sort();
        assert_eq!(seen, vec!["#a0", "#a1", "#a2", "#a3", "#a4", "#b0", "#b1", "#b2", "#b3", "#b4"]);
    }

    #[tokio::test]
    async fn a_panicking_hook_does_not_stop_the_handler() {
        let _ = env_logger::try_init();
        let handled = Arc::new(Mutex::new(0));
        let handled_copy = handled.clone();
        let handler: Handler<GateChangedEvent> = Arc::new(move |ev: GateChangedEvent| {
            let handled = handled_copy.clone();
            Box::pin(async move {
                if ev.transition == closed("bad").transition {
                    panic!("hook failure");
                }
                *handled.lock().unwrap() += 1;
            }) as Pin<Box<dyn Future<Output = ()> + Send>>
        });
        let event_handler = EventHandler::new(4, handler);
        let producer = event_handler.subscribe();
        tokio::spawn(async move {
            for id in ["o1", "bad", "o2"] {
                producer.publish_event(closed(id)).await;
            }
        });
        event_handler.start_handler().await;
        assert_eq!(*handled.lock().unwrap(), 2);
    }

    #[tokio::test]
    async fn publishing_after_the_handler_is_gone_reports_failure() {
        let (_, handler) = recorder();
        let event_handler = EventHandler::new(1, handler);
        let producer = event_handler.subscribe();
        drop(event_handler);
        assert!(!producer.publish_event(closed("o1")).await);
    }
}
