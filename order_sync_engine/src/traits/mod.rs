mod identity_provider;
mod order_store;

pub use identity_provider::{IdentityFeed, IdentityProvider, IdentitySink};
pub use order_store::{OrderStore, SnapshotSink};
