use log::*;
use tokio::sync::mpsc;

use crate::{order_types::SubjectId, subscription::Subscription, tracker::TrackerError};

/// The receiving end of an [`IdentitySink`].
pub type IdentityFeed = mpsc::UnboundedReceiver<Option<SubjectId>>;

/// Where an [`IdentityProvider`] reports the current subject. `None` means nobody is signed in.
///
/// The sink feeds a single consumer, so reports are always handled one at a time and in the order they were made.
#[derive(Clone, Debug)]
pub struct IdentitySink {
    sender: mpsc::UnboundedSender<Option<SubjectId>>,
}

impl IdentitySink {
    pub fn channel() -> (Self, IdentityFeed) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    /// Reports the current subject. Returns false if nobody is listening any more, in which case the provider should
    /// forget this sink.
    pub fn notify(&self, subject: Option<SubjectId>) -> bool {
        match self.sender.send(subject) {
            Ok(()) => true,
            Err(e) => {
                trace!("👤️ Identity listener has gone away. Dropped {:?}", e.0);
                false
            },
        }
    }
}

/// The authentication collaborator.
pub trait IdentityProvider {
    /// Starts observing identity transitions.
    ///
    /// Implementations must report the current subject (or its absence) to `sink` straight away, and again after every
    /// sign-in or sign-out. The returned handle stops the reports when it is released.
    fn observe_identity(&self, sink: IdentitySink) -> Result<Subscription, TrackerError>;
}
