//! Execution context handed to the `do` hook and the handle the actor keeps
//! to its worker.

use std::fmt::{self, Debug, Formatter};

use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

use crate::actor::{handle::ActorHandle, Actor};
use crate::types::{ReplyTo, StopReason, WorkerId};

/// Answer a worker gives to a forwarded detach request.
pub enum Readiness<A: Actor> {
    /// Ready; the optional supplement is merged before the state is handed out.
    Ready(Option<A::Patch>),
    /// Not ready; the actor keeps running.
    NotReady,
}

/// Messages an async worker can find in its mailbox.
pub enum WorkerMessage<A: Actor> {
    /// A request the actor had no react hook for.
    Request {
        /// Application command.
        command: A::Command,
        /// Reply token of the original caller.
        from: ReplyTo<A::Reply>,
    },
    /// A notification the actor had no react hook for.
    Notification(A::Command),
    /// The actor is being detached; answer on `reply` before the actor's timeout.
    Detach {
        /// Where to send the answer.
        reply: oneshot::Sender<Readiness<A>>,
    },
    /// The actor is shutting down; return from the hook promptly.
    Stop(StopReason),
}

/// Context passed to the `do` hook.
///
/// In async mode it exposes the worker's own mailbox and stop token. In sync
/// mode the hook runs on the controller, so the mailbox is always empty and
/// the stop token never fires.
pub struct WorkerContext<A: Actor> {
    id: Option<WorkerId>,
    mailbox: Option<mpsc::UnboundedReceiver<WorkerMessage<A>>>,
    stop: CancellationToken,
    owner: Option<ActorHandle<A>>,
}

impl<A: Actor> Debug for WorkerContext<A> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerContext")
            .field("id", &self.id)
            .field("stopping", &self.is_stopping())
            .finish()
    }
}

impl<A: Actor> WorkerContext<A> {
    pub(crate) fn inline(owner: Option<ActorHandle<A>>) -> Self {
        Self {
            id: None,
            mailbox: None,
            stop: CancellationToken::new(),
            owner,
        }
    }

    pub(crate) fn spawned(
        id: WorkerId,
        mailbox: mpsc::UnboundedReceiver<WorkerMessage<A>>,
        stop: CancellationToken,
        owner: Option<ActorHandle<A>>,
    ) -> Self {
        Self {
            id: Some(id),
            mailbox: Some(mailbox),
            stop,
            owner,
        }
    }

    /// Returns the worker id, or `None` when running inline.
    pub fn worker_id(&self) -> Option<WorkerId> {
        self.id
    }

    /// Returns true when the hook runs on a spawned worker.
    pub fn is_async(&self) -> bool {
        self.mailbox.is_some()
    }

    /// Returns a handle to the owning actor.
    pub fn owner(&self) -> Option<&ActorHandle<A>> {
        self.owner.as_ref()
    }

    /// Receives the next forwarded message. Returns `None` in sync mode or once
    /// the owning actor has gone away.
    pub async fn recv(&mut self) -> Option<WorkerMessage<A>> {
        match self.mailbox.as_mut() {
            Some(mailbox) => mailbox.recv().await,
            None => None,
        }
    }

    /// Receives a forwarded message without waiting.
    pub fn try_recv(&mut self) -> Option<WorkerMessage<A>> {
        self.mailbox.as_mut().and_then(|mailbox| mailbox.try_recv().ok())
    }

    /// Returns true once the owner asked this worker to stop.
    pub fn is_stopping(&self) -> bool {
        self.stop.is_cancelled()
    }

    /// Resolves once the owner asked this worker to stop.
    pub async fn stopped(&self) {
        self.stop.cancelled().await
    }

    /// Returns a clone of the stop token, for use in nested tasks.
    pub fn stop_token(&self) -> CancellationToken {
        self.stop.clone()
    }
}

/// Handle to a live async worker, recorded on the state object.
pub struct WorkerHandle<A: Actor> {
    id: WorkerId,
    tx: mpsc::UnboundedSender<WorkerMessage<A>>,
    stop: CancellationToken,
}

impl<A: Actor> Clone for WorkerHandle<A> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            tx: self.tx.clone(),
            stop: self.stop.clone(),
        }
    }
}

impl<A: Actor> Debug for WorkerHandle<A> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerHandle")
            .field("id", &self.id)
            .field("alive", &self.is_alive())
            .finish()
    }
}

impl<A: Actor> WorkerHandle<A> {
    pub(crate) fn new(
        id: WorkerId,
        tx: mpsc::UnboundedSender<WorkerMessage<A>>,
        stop: CancellationToken,
    ) -> Self {
        Self { id, tx, stop }
    }

    /// Returns the worker id.
    pub fn id(&self) -> WorkerId {
        self.id
    }

    /// Returns true while the worker's mailbox is open.
    pub fn is_alive(&self) -> bool {
        !self.tx.is_closed()
    }

    /// Sends a message to the worker. Returns the message if the worker is gone.
    pub fn send(&self, msg: WorkerMessage<A>) -> Result<(), WorkerMessage<A>> {
        self.tx.send(msg).map_err(|err| err.0)
    }

    /// Delivers a stop request and trips the worker's stop token.
    pub(crate) fn request_stop(&self, reason: StopReason) {
        let _ = self.tx.send(WorkerMessage::Stop(reason));
        self.stop.cancel();
    }
}
