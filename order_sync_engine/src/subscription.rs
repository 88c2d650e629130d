//! Unsubscribe handles for upstream listeners.
//!
//! Every listener registered with an upstream collaborator is paired with a [`Subscription`]. The listener is released
//! when the handle is dropped, or earlier via [`Subscription::unsubscribe`]. Either way, the release closure runs
//! exactly once.
use std::fmt::Debug;

use log::*;

type Release = Box<dyn FnOnce() + Send + 'static>;

pub struct Subscription {
    label: String,
    release: Option<Release>,
}

impl Subscription {
    pub fn new<F>(label: impl Into<String>, release: F) -> Self
    where F: FnOnce() + Send + 'static {
        Self { label: label.into(), release: Some(Box::new(release)) }
    }

    /// A handle with nothing to release. Useful for collaborators that push a single value and forget the listener.
    pub fn detached(label: impl Into<String>) -> Self {
        Self { label: label.into(), release: None }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn is_active(&self) -> bool {
        self.release.is_some()
    }

    pub fn unsubscribe(mut self) {
        self.release_now();
    }

    fn release_now(&mut self) {
        if let Some(release) = self.release.take() {
            trace!("🔌️ Releasing subscription {}", self.label);
            release();
        }
    }
}

impl Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Subscription({}, active: {})", self.label, self.is_active())
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release_now();
    }
}

#[cfg(test)]
mod test {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    use super::*;

    fn counting(label: &str) -> (Subscription, Arc<AtomicUsize>) {
        let count = Arc::new(AtomicUsize::new(0));
        let c2 = count.clone();
        let sub = Subscription::new(label, move || {
            c2.fetch_add(1, Ordering::SeqCst);
        });
        (sub, count)
    }

    #[test]
    fn released_once_on_unsubscribe() {
        let (sub, count) = counting("a");
        assert!(sub.is_active());
        sub.unsubscribe();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn released_on_drop() {
        let (sub, count) = counting("b");
        {
            let _held = sub;
        }
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn released_when_a_task_panics() {
        let (sub, count) = counting("c");
        let result = std::thread::spawn(move || {
            let _held = sub;
            panic!("boom");
        })
        .join();
        assert!(result.is_err());
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn detached_handles_do_nothing() {
        let sub = Subscription::detached("d");
        assert!(!sub.is_active());
        assert_eq!(sub.label(), "d");
        sub.unsubscribe();
    }
}
