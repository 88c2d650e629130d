use std::{future::Future, pin::Pin, sync::Arc};

use log::*;

use crate::events::{EventHandler, EventProducer, GateChangedEvent, Handler, StreamStatusEvent, TrackerNotice};

#[derive(Default, Clone)]
pub struct EventProducers {
    pub gate_changed_producer: Vec<EventProducer<GateChangedEvent>>,
    pub stream_status_producer: Vec<EventProducer<StreamStatusEvent>>,
}

impl EventProducers {
    pub fn is_empty(&self) -> bool {
        self.gate_changed_producer.is_empty() && self.stream_status_producer.is_empty()
    }

    pub async fn publish(&self, notice: TrackerNotice) {
        match notice {
            TrackerNotice::GateChanged(ev) => {
                for producer in &self.gate_changed_producer {
                    trace!("📬️ Notifying gate hook subscribers");
                    producer.publish_event(ev.clone()).await;
                }
            },
            TrackerNotice::StreamStatusChanged(ev) => {
                for producer in &self.stream_status_producer {
                    trace!("📬️ Notifying stream status hook subscribers");
                    producer.publish_event(ev.clone()).await;
                }
            },
        }
    }
}

pub struct EventHandlers {
    pub on_gate_changed: Option<EventHandler<GateChangedEvent>>,
    pub on_stream_status: Option<EventHandler<StreamStatusEvent>>,
}

impl EventHandlers {
    pub fn new(buffer_size: usize, hooks: EventHooks) -> Self {
        let on_gate_changed = hooks.on_gate_changed.map(|f| EventHandler::new(buffer_size, f));
        let on_stream_status = hooks.on_stream_status.map(|f| EventHandler::new(buffer_size, f));
        Self { on_gate_changed, on_stream_status }
    }

    pub fn producers(&self) -> EventProducers {
        let mut result = EventProducers::default();
        if let Some(handler) = &self.on_gate_changed {
            result.gate_changed_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_stream_status {
            result.stream_status_producer.push(handler.subscribe());
        }
        result
    }

    /// Spawns a task per registered hook. Each task ends once every producer for it has been dropped and its
    /// outstanding jobs are done.
    pub fn start_handlers(self) -> Vec<tokio::task::JoinHandle<()>> {
        let mut tasks = Vec::new();
        if let Some(handler) = self.on_gate_changed {
            tasks.push(tokio::spawn(handler.start_handler()));
        }
        if let Some(handler) = self.on_stream_status {
            tasks.push(tokio::spawn(handler.start_handler()));
        }
        tasks
    }
}

#[derive(Default, Clone)]
pub struct EventHooks {
    pub on_gate_changed: Option<Handler<GateChangedEvent>>,
    pub on_stream_status: Option<Handler<StreamStatusEvent>>,
}

impl EventHooks {
    pub fn on_gate_changed<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(GateChangedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_gate_changed = Some(Arc::new(f));
        self
    }

    pub fn on_stream_status<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(StreamStatusEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_stream_status = Some(Arc::new(f));
        self
    }
}
