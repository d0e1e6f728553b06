use thiserror::Error;

/// Errors raised by the messaging core (broker, pubsub, queue, router,
/// connection manager, session handler).
#[derive(Error, Debug)]
pub enum BusError {
    #[error("transient broker error: {0}")]
    TransientBroker(String),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("authorization error: {0}")]
    Authorization(String),

    #[error("delivery failed: {0}")]
    DeliveryFailure(String),

    #[error("message exhausted its retry budget and was moved to the dead letter list")]
    PoisonMessage,

    #[error("session timed out")]
    SessionTimeout,

    #[error("broker unreachable at startup: {0}")]
    FatalStartup(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("other error: {0}")]
    Other(#[from] anyhow::Error),
}

impl BusError {
    pub fn is_transient(&self) -> bool {
        matches!(self, BusError::TransientBroker(_))
    }
}

pub type Result<T> = std::result::Result<T, BusError>;

/// Errors raised by the persistence/auth collaborators. Kept separate from
/// `BusError` so a storage failure never masquerades as a core delivery
/// failure in logs or API responses.
#[derive(Error, Debug)]
pub enum CollaboratorError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("other error: {0}")]
    Other(#[from] anyhow::Error),
}

pub type CollaboratorResult<T> = std::result::Result<T, CollaboratorError>;
