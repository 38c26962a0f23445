//! Domain-level error types.

use thiserror::Error;

/// Errors raised while constructing value objects
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueObjectError {
    #[error("connection id must not be empty")]
    EmptyConnectionId,

    #[error("connection id is too long ({0} chars, max {max})", max = super::value_object::CONNECTION_ID_MAX_LEN)]
    ConnectionIdTooLong(usize),

    #[error("event name must be between 1 and {max} characters (got {0})", max = super::value_object::EVENT_NAME_MAX_LEN)]
    InvalidEventName(usize),
}

/// Errors raised by the persistence collaborator
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepositoryError {
    #[error("event {0} not found")]
    EventNotFound(u64),

    #[error("storage error: {0}")]
    Storage(String),
}

/// Errors raised while pushing messages to connections
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MessagePushError {
    #[error("connection '{0}' not found")]
    ClientNotFound(String),

    #[error("failed to push message: {0}")]
    PushFailed(String),
}
