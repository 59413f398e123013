//! Error types surfaced by the lifecycle runtime.

use thiserror::Error;

use crate::types::StopReason;

/// Result type returned by lifecycle hooks.
pub type ActorResult<T> = Result<T, ActorError>;

/// Errors raised by hook logic or by the controller on behalf of a hook.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ActorError {
    /// A custom error message from a hook.
    #[error("actor logic error: {0}")]
    User(String),
    /// A hook or worker panicked during execution.
    #[error("actor panicked: {0}")]
    Panic(String),
    /// A request reached an actor with neither a `react` hook nor a live worker.
    #[error("no handler for request")]
    NoHandler,
}

impl ActorError {
    /// Creates a new user-defined error.
    pub fn user(message: impl Into<String>) -> Self {
        Self::User(message.into())
    }
}

impl From<CallError> for ActorError {
    fn from(value: CallError) -> Self {
        match value {
            CallError::Actor(err) => err,
            other => ActorError::User(other.to_string()),
        }
    }
}

/// Failures encountered while sending a message asynchronously.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SendError {
    /// The actor's mailbox is closed (actor stopped).
    #[error("mailbox closed")]
    Closed,
}

/// Failures encountered while sending without awaiting capacity.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TrySendError {
    /// The mailbox is full.
    #[error("mailbox full")]
    Full,
    /// The mailbox is closed (actor stopped).
    #[error("mailbox closed")]
    Closed,
}

/// Errors reported by [`ActorHandle::call`](crate::ActorHandle::call).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CallError {
    /// Failed to deliver the request.
    #[error(transparent)]
    Send(#[from] SendError),
    /// No reply arrived within the caller's bound. The request is not cancelled.
    #[error("call timed out")]
    Timeout,
    /// Every copy of the reply token was dropped without a reply.
    #[error("request dropped without reply")]
    NoReply,
    /// The actor answered with an error.
    #[error("actor returned error: {0}")]
    Actor(ActorError),
}

/// Errors reported while waiting for an actor to terminate.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StopError {
    /// The actor did not terminate within the caller's bound. It is not killed.
    #[error("stop timed out")]
    Timeout,
    /// The actor task vanished without publishing a final output.
    #[error("actor lost before publishing its final output")]
    Lost,
}

/// Failures encountered when starting an actor.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SpawnError {
    /// No Tokio runtime was found in the current context.
    #[error("tokio runtime handle not in scope")]
    MissingRuntime,
    /// The entry hook stopped the actor (or failed) before it started running.
    #[error("actor refused to start: {0}")]
    Refused(StopReason),
    /// The entry hook did not finish within the configured start timeout.
    #[error("actor start timed out")]
    Timeout,
    /// The actor task vanished before acknowledging its start.
    #[error("actor lost during start")]
    Lost,
}

/// Errors reported by [`ActorHandle::detach`](crate::ActorHandle::detach).
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DetachError {
    /// The actor (or its worker) is not ready to detach; retry later.
    #[error("actor not ready to detach")]
    NotReady,
    /// The `react` hook answered the detach request by stopping the actor.
    #[error("actor stopped while detaching: {0}")]
    Stopped(StopReason),
    /// No answer arrived within the caller's bound.
    #[error("detach timed out")]
    Timeout,
    /// Failed to deliver the detach request.
    #[error(transparent)]
    Send(#[from] SendError),
    /// The actor dropped the detach request without answering.
    #[error("detach request dropped")]
    Lost,
}
