//! Scripted replays of what a customer and the order store do, for reproducing notification behaviour by hand.
use std::{fmt::Write, fs, path::Path};

use anyhow::{Context, Result};
use log::*;
use order_sync_engine::{
    memory::{MemoryIdentityProvider, MemoryOrderStore},
    order_types::{OrderRecord, SubjectId},
    session_watcher::SessionWatcher,
    TrackerState,
};
use serde::{Deserialize, Serialize};

use crate::formatting::{format_notice, format_transition, format_view};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    SignIn(SubjectId),
    SignOut,
    Upsert(OrderRecord),
    Remove(String),
    Acknowledge,
    Reconnect,
    Revoke(SubjectId),
    Restore(SubjectId),
}

impl Step {
    pub fn describe(&self) -> String {
        match self {
            Step::SignIn(subject) => format!("{subject} signs in"),
            Step::SignOut => "Sign out".to_string(),
            Step::Upsert(record) => {
                format!("Store writes order {}", record.order_id.as_deref().unwrap_or("<no id>"))
            },
            Step::Remove(id) => format!("Store deletes order {id}"),
            Step::Acknowledge => "Customer dismisses the notification".to_string(),
            Step::Reconnect => "Customer retries the connection".to_string(),
            Step::Revoke(subject) => format!("Store revokes access for {subject}"),
            Step::Restore(subject) => format!("Store restores access for {subject}"),
        }
    }
}

pub fn load_scenario(path: &Path) -> Result<Vec<Step>> {
    let data = fs::read_to_string(path).with_context(|| format!("Could not read scenario file {}", path.display()))?;
    let steps = serde_json::from_str(&data).with_context(|| format!("{} is not a valid scenario", path.display()))?;
    Ok(steps)
}

/// Drives a [`TrackerState`] step by step against in-memory services. Every step is fully settled, including any
/// snapshots it causes, before the next one runs.
pub struct ScenarioRunner {
    auth: MemoryIdentityProvider,
    store: MemoryOrderStore,
    session: SessionWatcher,
    state: TrackerState<MemoryOrderStore>,
}

impl ScenarioRunner {
    pub fn new() -> Result<Self> {
        let auth = MemoryIdentityProvider::new();
        let store = MemoryOrderStore::new();
        let session = SessionWatcher::observe(&auth)?;
        let state = TrackerState::new(store.clone());
        Ok(Self { auth, store, session, state })
    }

    pub fn state(&self) -> &TrackerState<MemoryOrderStore> {
        &self.state
    }

    /// Applies one step and returns a line for each command result and notification it produced.
    pub fn apply(&mut self, step: Step) -> Vec<String> {
        debug!("🛠️ {}", step.describe());
        let mut lines = Vec::new();
        match step {
            Step::SignIn(subject) => self.auth.sign_in(subject),
            Step::SignOut => self.auth.sign_out(),
            Step::Upsert(record) => self.store.upsert(record),
            Step::Remove(id) => {
                if !self.store.remove(&id) {
                    lines.push(format!("  * order {id} was not in the store"));
                }
            },
            Step::Acknowledge => {
                let transition = self.state.acknowledge();
                lines.push(format!("  > acknowledge: {}", format_transition(&transition)));
            },
            Step::Reconnect => {
                let reconnected = self.state.reconnect();
                lines.push(format!("  > reconnect: {}", if reconnected { "attempted" } else { "not needed" }));
            },
            Step::Revoke(subject) => self.store.revoke_access(&subject),
            Step::Restore(subject) => self.store.restore_access(&subject),
        }
        self.settle();
        lines.extend(self.state.take_notices().iter().map(format_notice));
        lines
    }

    fn settle(&mut self) {
        for transition in self.session.drain() {
            self.state.on_session(transition);
        }
        let handled = self.state.process_pending();
        trace!("🛠️ {handled} stream deliveries handled");
    }
}

impl Drop for ScenarioRunner {
    fn drop(&mut self) {
        self.state.shutdown();
        self.session.unsubscribe();
    }
}

pub fn replay(steps: Vec<Step>, verbose: bool) -> Result<String> {
    let mut runner = ScenarioRunner::new()?;
    let mut f = String::new();
    for (i, step) in steps.into_iter().enumerate() {
        writeln!(f, "## Step {}: {}", i + 1, step.describe())?;
        let lines = runner.apply(step);
        if verbose {
            for line in lines {
                writeln!(f, "{line}")?;
            }
        }
        writeln!(f, "{}\n", format_view(&runner.state().view())?)?;
    }
    Ok(f)
}

pub fn run_scenario(path: &Path, verbose: bool) -> Result<String> {
    let steps = load_scenario(path)?;
    info!("🛠️ Replaying {} steps from {}", steps.len(), path.display());
    replay(steps, verbose)
}
