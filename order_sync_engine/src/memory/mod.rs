//! In-memory collaborators.
//!
//! These stand in for the real authentication service and order store in tests and in `ordertools`. Identity and
//! snapshots are pushed immediately on subscription and after every change, and every listener is forgotten when its
//! [`crate::Subscription`] is released.
//!
//! Unlike a real service, a collaborator only lives as long as its handles. Once the last clone is dropped its
//! listeners go with it, and every open observation ends.
use std::sync::{Mutex, MutexGuard, PoisonError};

mod memory_auth;
mod memory_store;

pub use memory_auth::MemoryIdentityProvider;
pub use memory_store::MemoryOrderStore;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // Listener bookkeeping stays consistent even if a panic interrupted another holder.
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
