//! Handle-based communication API for actors.

use std::fmt::{self, Debug, Formatter};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, watch};

use crate::actor::{
    state::{State, Termination},
    Actor,
};
use crate::error::{CallError, DetachError, SendError, StopError, TrySendError};
use crate::types::{ActorId, Envelope, ReplyTo, StopReason};

/// Slot where the controller publishes the final output.
pub(crate) type Outcome<A> = Option<Arc<Termination<A>>>;

/// Cloneable handle that callers use to communicate with an actor.
pub struct ActorHandle<A: Actor> {
    id: ActorId,
    tx: mpsc::Sender<Envelope<A>>,
    mailbox_capacity: usize,
    done: watch::Receiver<Outcome<A>>,
}

impl<A: Actor> Clone for ActorHandle<A> {
    fn clone(&self) -> Self {
        Self {
            id: self.id.clone(),
            tx: self.tx.clone(),
            mailbox_capacity: self.mailbox_capacity,
            done: self.done.clone(),
        }
    }
}

impl<A: Actor> Debug for ActorHandle<A> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActorHandle")
            .field("id", &self.id)
            .field("mailbox_capacity", &self.mailbox_capacity)
            .field("alive", &self.is_alive())
            .finish()
    }
}

impl<A: Actor> PartialEq for ActorHandle<A> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<A: Actor> Eq for ActorHandle<A> {}

impl<A: Actor> std::hash::Hash for ActorHandle<A> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl<A: Actor> ActorHandle<A> {
    pub(crate) fn new(
        id: ActorId,
        tx: mpsc::Sender<Envelope<A>>,
        mailbox_capacity: usize,
        done: watch::Receiver<Outcome<A>>,
    ) -> Self {
        Self {
            id,
            tx,
            mailbox_capacity,
            done,
        }
    }

    /// Returns the unique identifier of the actor.
    pub fn id(&self) -> &ActorId {
        &self.id
    }

    /// Returns the total capacity of the actor's mailbox.
    pub fn mailbox_capacity(&self) -> usize {
        self.mailbox_capacity
    }

    /// Returns the current number of messages in the mailbox.
    pub fn mailbox_len(&self) -> usize {
        self.mailbox_capacity - self.tx.capacity()
    }

    /// Returns the number of available slots in the mailbox.
    pub fn mailbox_available(&self) -> usize {
        self.tx.capacity()
    }

    /// Returns true if the actor is still alive and processing messages.
    pub fn is_alive(&self) -> bool {
        !self.tx.is_closed()
    }

    /// Sends a request and waits for its reply.
    ///
    /// `timeout` bounds both mailbox admission and the reply; `None` waits
    /// forever. A timeout is a caller-side give-up: the actor may still handle
    /// the request, and its reply is discarded.
    ///
    /// # Errors
    /// - `CallError::Send(Closed)` if the actor is stopped.
    /// - `CallError::Timeout` if no reply arrived in time.
    /// - `CallError::NoReply` if the actor dropped the request unanswered.
    /// - `CallError::Actor(err)` if the actor answered with an error.
    pub async fn call(
        &self,
        command: A::Command,
        timeout: impl Into<Option<Duration>>,
    ) -> Result<A::Reply, CallError> {
        bounded(timeout.into(), self.exchange(command))
            .await
            .unwrap_or(Err(CallError::Timeout))
    }

    /// Sends a notification without waiting for anything but mailbox space.
    ///
    /// Delivery is best-effort: a send to a stopped actor is swallowed.
    pub async fn cast(&self, command: A::Command) {
        let _ = self.tx.send(Envelope::Notification(command)).await;
    }

    /// Attempts to send a notification without waiting for mailbox space.
    ///
    /// # Errors
    /// - `TrySendError::Full` if the mailbox is full.
    /// - `TrySendError::Closed` if the actor has stopped.
    pub fn try_cast(&self, command: A::Command) -> Result<(), TrySendError> {
        self.tx
            .try_send(Envelope::Notification(command))
            .map_err(|err| match err {
                mpsc::error::TrySendError::Full(_) => TrySendError::Full,
                mpsc::error::TrySendError::Closed(_) => TrySendError::Closed,
            })
    }

    /// Asks the actor to stop and waits for its final output.
    ///
    /// The stop command bypasses `react`. Once the actor has terminated, every
    /// call returns the same cached output. On timeout the actor is not killed.
    ///
    /// # Errors
    /// - `StopError::Timeout` if the actor did not terminate in time.
    /// - `StopError::Lost` if the actor task vanished without an output.
    pub async fn stop(
        &self,
        reason: StopReason,
        timeout: impl Into<Option<Duration>>,
    ) -> Result<Arc<Termination<A>>, StopError> {
        if let Some(done) = self.termination() {
            return Ok(done);
        }
        let wait = async {
            let _ = self.tx.send(Envelope::Stop(reason)).await;
            self.wait().await
        };
        bounded(timeout.into(), wait)
            .await
            .unwrap_or(Err(StopError::Timeout))
    }

    /// Waits, without asking, until the actor terminates.
    ///
    /// # Errors
    /// `StopError::Lost` if the actor task vanished without an output.
    pub async fn wait(&self) -> Result<Arc<Termination<A>>, StopError> {
        let mut done = self.done.clone();
        loop {
            let current = done.borrow_and_update().clone();
            if let Some(termination) = current {
                return Ok(termination);
            }
            done.changed().await.map_err(|_| StopError::Lost)?;
        }
    }

    /// Returns the final output if the actor already terminated.
    pub fn termination(&self) -> Option<Arc<Termination<A>>> {
        self.done.borrow().clone()
    }

    /// Asks the actor to hand out its state and terminate with reason `detach`.
    ///
    /// # Errors
    /// - `DetachError::NotReady` if the react hook or the worker declined.
    /// - `DetachError::Stopped` if the react hook stopped the actor instead.
    /// - `DetachError::Timeout` if no answer arrived in time.
    pub async fn detach(
        &self,
        timeout: impl Into<Option<Duration>>,
    ) -> Result<State<A>, DetachError> {
        bounded(timeout.into(), self.negotiate_detach())
            .await
            .unwrap_or(Err(DetachError::Timeout))
    }

    /// Sends the advisory suspend hint.
    pub async fn hibernate(&self) {
        let _ = self.tx.send(Envelope::Hibernate).await;
    }

    async fn exchange(&self, command: A::Command) -> Result<A::Reply, CallError> {
        let (from, rx) = ReplyTo::channel();
        self.tx
            .send(Envelope::Request { command, from })
            .await
            .map_err(|_| SendError::Closed)?;
        match rx.await.map_err(|_| CallError::NoReply)? {
            Ok(reply) => Ok(reply),
            Err(err) => Err(CallError::Actor(err)),
        }
    }

    async fn negotiate_detach(&self) -> Result<State<A>, DetachError> {
        let (from, rx) = oneshot::channel();
        self.tx
            .send(Envelope::Detach { from })
            .await
            .map_err(|_| SendError::Closed)?;
        rx.await.map_err(|_| DetachError::Lost)?
    }

    pub(crate) fn request_stop(&self, reason: StopReason) {
        let _ = self.tx.try_send(Envelope::Stop(reason));
    }
}

/// Runs `fut` to completion, or gives up after `limit`. Returns `None` on timeout.
pub(crate) async fn bounded<T>(limit: Option<Duration>, fut: impl Future<Output = T>) -> Option<T> {
    match limit {
        Some(limit) => tokio::time::timeout(limit, fut).await.ok(),
        None => Some(fut.await),
    }
}
