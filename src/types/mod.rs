//! Shared type definitions used across the lifecycle runtime.

use std::fmt::{self, Debug, Display, Formatter};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::oneshot;

use crate::actor::{state::State, Actor};
use crate::error::{ActorError, ActorResult, DetachError};

/// Unique identifier assigned to each actor.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ActorId(Arc<str>);

impl ActorId {
    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Generates a process-unique `actor-<n>` identifier.
    pub fn generate() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(0);
        let n = NEXT.fetch_add(1, Ordering::Relaxed);
        Self::from(format!("actor-{n}"))
    }
}

impl<T> From<T> for ActorId
where
    T: Into<String>,
{
    fn from(value: T) -> Self {
        let owned: String = value.into();
        Self(Arc::from(owned.into_boxed_str()))
    }
}

impl Display for ActorId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of an async worker spawned by an actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WorkerId(u64);

impl Display for WorkerId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "worker-{}", self.0)
    }
}

/// Incrementing ID source for workers, one per actor.
#[derive(Default)]
pub(crate) struct WorkerIdGenerator {
    next: AtomicU64,
}

impl WorkerIdGenerator {
    pub fn next(&self) -> WorkerId {
        WorkerId(self.next.fetch_add(1, Ordering::Relaxed))
    }
}

/// Lifecycle status recorded on a state object.
///
/// Transitions are monotonic: `Undefined -> Running -> {Stopped, Exception, Failover}`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Status {
    /// Entry has not completed yet.
    #[default]
    Undefined,
    /// The actor is processing its mailbox.
    Running,
    /// The actor terminated normally.
    Stopped,
    /// A hook or worker failed.
    Exception,
    /// The actor handed its duties over to another unit.
    Failover,
}

impl Status {
    /// Returns true for `Stopped`, `Exception` and `Failover`.
    pub fn is_terminal(self) -> bool {
        matches!(self, Status::Stopped | Status::Exception | Status::Failover)
    }
}

/// Where the `do` hook runs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum WorkMode {
    /// Inline on the controller; blocks the mailbox until it returns.
    #[default]
    Sync,
    /// On a supervised worker task; the mailbox keeps flowing.
    Async,
}

/// Reason describing why an actor stopped processing messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// Requested stop with no special meaning.
    Normal,
    /// The `do` hook finished its work.
    Done,
    /// State was handed out through the detach protocol.
    Detach,
    /// The linked owner went away.
    Shutdown,
    /// Application-defined reason.
    Custom(Arc<str>),
    /// A hook or worker failed.
    Failure(ActorError),
}

impl StopReason {
    /// Creates an application-defined reason.
    pub fn custom(reason: impl Into<String>) -> Self {
        StopReason::Custom(Arc::from(reason.into().into_boxed_str()))
    }
}

impl Display for StopReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::Normal => write!(f, "normal"),
            StopReason::Done => write!(f, "done"),
            StopReason::Detach => write!(f, "detach"),
            StopReason::Shutdown => write!(f, "shutdown"),
            StopReason::Custom(reason) => write!(f, "{reason}"),
            StopReason::Failure(err) => write!(f, "failure: {err}"),
        }
    }
}

/// Terminal tag chosen by the exit hook and returned with the final state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sign {
    /// Generic stopped signal.
    Stopped,
    /// The actor left through the detach protocol.
    Detached,
    /// Generic exception signal.
    Exception,
    /// Application-defined tag.
    Custom(Arc<str>),
}

impl Sign {
    /// Creates an application-defined tag.
    pub fn custom(sign: impl Into<String>) -> Self {
        Sign::Custom(Arc::from(sign.into().into_boxed_str()))
    }
}

/// Result payload accumulated on a state object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Output<T> {
    /// A value produced by the `do` hook.
    Value(T),
    /// The worker was killed after ignoring a stop request.
    Abort,
}

impl<T> Output<T> {
    /// Returns the value unless the output is the abort sentinel.
    pub fn value(&self) -> Option<&T> {
        match self {
            Output::Value(value) => Some(value),
            Output::Abort => None,
        }
    }
}

type ReplySlot<R> = Arc<Mutex<Option<oneshot::Sender<ActorResult<R>>>>>;

/// Cloneable `from` token captured with a request.
///
/// At most one reply is delivered; later replies are ignored. When every
/// clone is dropped unanswered the caller sees [`CallError::NoReply`](crate::CallError::NoReply).
pub struct ReplyTo<R> {
    slot: ReplySlot<R>,
}

impl<R> Clone for ReplyTo<R> {
    fn clone(&self) -> Self {
        Self {
            slot: self.slot.clone(),
        }
    }
}

impl<R> Debug for ReplyTo<R> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReplyTo")
            .field("pending", &self.is_pending())
            .finish()
    }
}

impl<R> ReplyTo<R> {
    pub(crate) fn channel() -> (Self, oneshot::Receiver<ActorResult<R>>) {
        let (tx, rx) = oneshot::channel();
        let token = Self {
            slot: Arc::new(Mutex::new(Some(tx))),
        };
        (token, rx)
    }

    /// Delivers `value` to the caller. Returns false if a reply was already
    /// sent or the caller gave up.
    pub fn reply(&self, value: R) -> bool {
        self.deliver(Ok(value))
    }

    /// Answers the request with an error.
    pub fn fail(&self, error: ActorError) -> bool {
        self.deliver(Err(error))
    }

    /// Returns true while no reply has been sent.
    pub fn is_pending(&self) -> bool {
        self.slot
            .lock()
            .map(|slot| slot.is_some())
            .unwrap_or(false)
    }

    fn deliver(&self, result: ActorResult<R>) -> bool {
        let sender = match self.slot.lock() {
            Ok(mut slot) => slot.take(),
            Err(_) => None,
        };
        match sender {
            Some(tx) => tx.send(result).is_ok(),
            None => false,
        }
    }
}

/// Reply channel for a detach request.
pub(crate) type DetachReply<A> = oneshot::Sender<Result<State<A>, DetachError>>;

/// Items carried by an actor's mailbox.
pub(crate) enum Envelope<A: Actor> {
    /// A command expecting exactly one reply.
    Request {
        command: A::Command,
        from: ReplyTo<A::Reply>,
    },
    /// A fire-and-forget command.
    Notification(A::Command),
    /// Built-in stop; never reaches `react`.
    Stop(StopReason),
    /// Built-in advisory suspend hint.
    Hibernate,
    /// Built-in detach negotiation.
    Detach { from: DetachReply<A> },
}
