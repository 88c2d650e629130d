use log::*;
use tokio::{
    sync::{mpsc, oneshot, watch},
    task::JoinHandle,
};

use crate::{
    events::{EventHandlers, EventHooks, EventProducers},
    notification_gate::GateTransition,
    session_watcher::SessionWatcher,
    tracker::{TrackerConfig, TrackerError, TrackerState, TrackerView},
    traits::{IdentityProvider, OrderStore},
};

#[derive(Debug)]
enum TrackerCommand {
    Acknowledge(oneshot::Sender<GateTransition>),
    Reconnect(oneshot::Sender<bool>),
    Shutdown,
}

/// A command reply, held back until the view reflecting the command has been published.
enum Reply {
    Acknowledged(oneshot::Sender<GateTransition>, GateTransition),
    Reconnected(oneshot::Sender<bool>, bool),
}

impl Reply {
    fn send(self) {
        // The caller may have stopped waiting. That's fine.
        match self {
            Reply::Acknowledged(reply, transition) => {
                let _ = reply.send(transition);
            },
            Reply::Reconnected(reply, reconnected) => {
                let _ = reply.send(reconnected);
            },
        }
    }
}

/// Keeps a customer's orders page up to date.
///
/// `OrderTracker` follows the identity provider, keeps exactly one order subscription open for whoever is signed in,
/// and publishes a fresh [`TrackerView`] every time something visible changes. All inputs are handled one at a time
/// on a single task.
pub struct OrderTracker<A, S> {
    auth: A,
    store: S,
    config: TrackerConfig,
    hooks: EventHooks,
}

impl<A, S> OrderTracker<A, S>
where
    A: IdentityProvider + Send + 'static,
    S: OrderStore + Send + 'static,
{
    pub fn new(auth: A, store: S, config: TrackerConfig) -> Self {
        Self { auth, store, config, hooks: EventHooks::default() }
    }

    pub fn with_hooks(mut self, hooks: EventHooks) -> Self {
        self.hooks = hooks;
        self
    }

    /// Starts observing the identity provider and spawns the tracker task. Must be called from within a tokio
    /// runtime. The tracker task owns both collaborators until it stops.
    pub fn start(self) -> Result<TrackerHandle, TrackerError> {
        let session = SessionWatcher::observe(&self.auth)?;
        let handlers = EventHandlers::new(self.config.hook_buffer_size, self.hooks);
        let producers = handlers.producers();
        let hook_tasks = handlers.start_handlers();
        let (commands, command_rx) = mpsc::channel(self.config.command_buffer_size.max(1));
        let (view_tx, view) = watch::channel(TrackerView::default());
        let state = TrackerState::new(self.store);
        let task = tokio::spawn(run_tracker(self.auth, session, state, command_rx, view_tx, producers));
        Ok(TrackerHandle { commands, view, task, hook_tasks })
    }
}

async fn run_tracker<A, S: OrderStore>(
    auth: A,
    mut session: SessionWatcher,
    mut state: TrackerState<S>,
    mut commands: mpsc::Receiver<TrackerCommand>,
    view: watch::Sender<TrackerView>,
    producers: EventProducers,
) -> Result<(), TrackerError> {
    info!("🛰️ Order tracker started");
    loop {
        let mut reply = None;
        tokio::select! {
            biased;
            command = commands.recv() => match command {
                Some(TrackerCommand::Acknowledge(sender)) => {
                    reply = Some(Reply::Acknowledged(sender, state.acknowledge()));
                },
                Some(TrackerCommand::Reconnect(sender)) => {
                    reply = Some(Reply::Reconnected(sender, state.reconnect()));
                },
                Some(TrackerCommand::Shutdown) => {
                    debug!("🛰️ Shutdown requested");
                    break;
                },
                None => {
                    debug!("🛰️ Every tracker handle has been dropped");
                    break;
                },
            },
            transition = session.changed() => state.on_session(transition),
            event = state.next_stream_event() => state.on_stream_event(event),
        }
        for notice in state.take_notices() {
            producers.publish(notice).await;
        }
        view.send_if_modified(|current| {
            let next = state.view();
            if *current == next {
                false
            } else {
                trace!("🛰️ Publishing view: {} orders, gate {:?}, stream {}", next.orders.len(), next.gate.status(), next.stream);
                *current = next;
                true
            }
        });
        if let Some(reply) = reply {
            reply.send();
        }
    }
    state.shutdown();
    session.unsubscribe();
    // The provider must outlive the identity subscription.
    drop(auth);
    info!("🛰️ Order tracker stopped");
    Ok(())
}

/// The presentation layer's handle on a running [`OrderTracker`].
///
/// Dropping the handle stops the tracker and releases every upstream subscription.
pub struct TrackerHandle {
    commands: mpsc::Sender<TrackerCommand>,
    view: watch::Receiver<TrackerView>,
    task: JoinHandle<Result<(), TrackerError>>,
    hook_tasks: Vec<JoinHandle<()>>,
}

impl TrackerHandle {
    /// The latest view.
    pub fn view(&self) -> TrackerView {
        self.view.borrow().clone()
    }

    /// A receiver that is notified every time the view changes.
    pub fn watch(&self) -> watch::Receiver<TrackerView> {
        self.view.clone()
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    /// Dismisses the payment-proof notification, if it is open. The outcome is already visible in [`Self::view`] by the
    /// time this returns.
    pub async fn acknowledge(&self) -> Result<GateTransition, TrackerError> {
        let (reply, response) = oneshot::channel();
        self.send(TrackerCommand::Acknowledge(reply)).await?;
        response.await.map_err(|_| TrackerError::TrackerStopped)
    }

    /// Reopens the order stream after a failure. Returns false if the stream did not need reconnecting.
    pub async fn reconnect(&self) -> Result<bool, TrackerError> {
        let (reply, response) = oneshot::channel();
        self.send(TrackerCommand::Reconnect(reply)).await?;
        response.await.map_err(|_| TrackerError::TrackerStopped)
    }

    /// Stops the tracker and waits for it, and its hooks, to finish.
    pub async fn shutdown(self) -> Result<(), TrackerError> {
        // The tracker may already be gone, in which case there is nothing to tell it.
        let _ = self.commands.send(TrackerCommand::Shutdown).await;
        let result = self.task.await.map_err(|e| TrackerError::TaskFailed(e.to_string()))?;
        for hook in self.hook_tasks {
            if let Err(e) = hook.await {
                warn!("🛰️ A hook task failed during shutdown. {e}");
            }
        }
        result
    }

    async fn send(&self, command: TrackerCommand) -> Result<(), TrackerError> {
        self.commands.send(command).await.map_err(|_| TrackerError::TrackerStopped)
    }
}
