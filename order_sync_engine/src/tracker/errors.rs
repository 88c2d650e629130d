use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TrackerError {
    #[error("Could not subscribe to the order stream. {0}")]
    SubscriptionFailed(String),
    #[error("The identity provider is unavailable. {0}")]
    IdentityUnavailable(String),
    #[error("The order tracker has stopped.")]
    TrackerStopped,
    #[error("The order tracker task failed. {0}")]
    TaskFailed(String),
}
