use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot, watch};
use tokio_util::sync::CancellationToken;

use crate::actor::{
    context::{Readiness, WorkerMessage},
    handle::{bounded, ActorHandle, Outcome},
    hooks::{guarded, Event, Reaction, Step},
    shutdown::shutdown,
    state::State,
    worker::{delegate_work, resolve, Worker, WorkerExit},
    Actor, IntoActorConfig,
};
use crate::error::{ActorError, DetachError, SpawnError};
use crate::types::{
    ActorId, DetachReply, Envelope, ReplyTo, Status, StopReason, WorkerIdGenerator,
};

/// Configuration for the actor's mailbox.
#[derive(Debug, Clone)]
pub struct MailboxConfig {
    /// The maximum number of messages the mailbox can hold.
    pub capacity: usize,
}

impl Default for MailboxConfig {
    fn default() -> Self {
        Self { capacity: 64 }
    }
}

impl MailboxConfig {
    /// Sets the mailbox capacity.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }
}

/// Options for starting an actor.
#[derive(Debug, Clone, Default)]
pub struct ActorConfig {
    /// Mailbox configuration.
    pub mailbox: MailboxConfig,
    /// Explicit identifier; generated when absent.
    pub name: Option<ActorId>,
    /// Bound on waiting for the entry hook. Unbounded by default.
    pub start_timeout: Option<Duration>,
    /// Link used by [`start`]: cancelling it stops the actor, and an actor
    /// ending in `Exception` cancels it.
    pub link: Option<CancellationToken>,
}

impl<'a> From<&'a ActorConfig> for ActorConfig {
    fn from(value: &'a ActorConfig) -> Self {
        value.clone()
    }
}

impl ActorConfig {
    /// Sets the mailbox capacity.
    pub fn with_mailbox_capacity(mut self, capacity: usize) -> Self {
        self.mailbox.capacity = capacity;
        self
    }

    /// Sets the complete mailbox configuration.
    pub fn with_mailbox(mut self, mailbox: MailboxConfig) -> Self {
        self.mailbox = mailbox;
        self
    }

    /// Sets the actor identifier.
    pub fn with_name(mut self, name: impl Into<ActorId>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Bounds the wait for the entry hook.
    pub fn with_start_timeout(mut self, timeout: Duration) -> Self {
        self.start_timeout = Some(timeout);
        self
    }

    /// Links the actor to `token`.
    pub fn with_link(mut self, token: CancellationToken) -> Self {
        self.link = Some(token);
        self
    }
}

/// Starts an actor linked to `config.link` and waits for its entry hook.
///
/// # Errors
/// - `SpawnError::MissingRuntime` outside a Tokio runtime.
/// - `SpawnError::Refused` if entry stopped or failed; the exit hook has run.
/// - `SpawnError::Timeout` if entry outlived `config.start_timeout`.
pub async fn start<A: Actor>(
    state: State<A>,
    config: impl IntoActorConfig,
) -> Result<ActorHandle<A>, SpawnError> {
    launch(state, config.into_config(), true).await
}

/// Starts an actor that is not linked to anything, even if `config.link` is set.
///
/// # Errors
/// Same as [`start`].
pub async fn start_detached<A: Actor>(
    state: State<A>,
    config: impl IntoActorConfig,
) -> Result<ActorHandle<A>, SpawnError> {
    launch(state, config.into_config(), false).await
}

async fn launch<A: Actor>(
    mut state: State<A>,
    config: ActorConfig,
    linked: bool,
) -> Result<ActorHandle<A>, SpawnError> {
    let runtime = Handle::try_current().map_err(|_| SpawnError::MissingRuntime)?;
    let id = config.name.unwrap_or_else(ActorId::generate);
    let mailbox_capacity = config.mailbox.capacity;
    let (tx, rx) = mpsc::channel(mailbox_capacity);
    let (done_tx, done_rx) = watch::channel(None);
    let actor_handle = ActorHandle::new(id.clone(), tx, mailbox_capacity, done_rx);
    state.set_pid(actor_handle.clone());

    let link = if linked { config.link } else { None };
    let (started_tx, started_rx) = oneshot::channel();
    let controller = Controller {
        id,
        state,
        mailbox: rx,
        worker: None,
        worker_ids: WorkerIdGenerator::default(),
        runtime: runtime.clone(),
        link,
    };
    runtime.spawn(run_actor(controller, started_tx, done_tx));

    match bounded(config.start_timeout, started_rx).await {
        Some(Ok(Ok(()))) => Ok(actor_handle),
        Some(Ok(Err(reason))) => Err(SpawnError::Refused(reason)),
        Some(Err(_)) => Err(SpawnError::Lost),
        None => {
            actor_handle.request_stop(StopReason::Shutdown);
            Err(SpawnError::Timeout)
        }
    }
}

/// Owns one state object and its mailbox for the actor's whole life.
struct Controller<A: Actor> {
    id: ActorId,
    state: State<A>,
    mailbox: mpsc::Receiver<Envelope<A>>,
    worker: Option<Worker<A>>,
    worker_ids: WorkerIdGenerator,
    runtime: Handle,
    link: Option<CancellationToken>,
}

/// One item of the controller's select loop.
enum Signal<A: Actor> {
    Mail(Envelope<A>),
    WorkerExit(WorkerExit<A>),
    Idle,
    LinkDown,
    Closed,
}

async fn run_actor<A: Actor>(
    mut ctl: Controller<A>,
    started: oneshot::Sender<Result<(), StopReason>>,
    done: watch::Sender<Outcome<A>>,
) {
    let (reason, refused) = match ctl.enter().await {
        ControlFlow::Continue(()) => {
            let _ = started.send(Ok(()));
            tracing::info!(actor_id = %ctl.id, "Actor started");
            let reason = match ctl.start_work().await {
                ControlFlow::Continue(()) => ctl.serve().await,
                ControlFlow::Break(reason) => reason,
            };
            (reason, None)
        }
        ControlFlow::Break(reason) => (reason.clone(), Some((started, reason))),
    };

    let Controller {
        id,
        state,
        mailbox,
        worker,
        link,
        ..
    } = ctl;
    // Requests still queued see their reply tokens dropped.
    drop(mailbox);

    let termination = shutdown(state, worker, reason).await;
    tracing::info!(
        actor_id = %id,
        reason = %termination.state.reason().cloned().unwrap_or(StopReason::Normal),
        sign = ?termination.sign,
        status = ?termination.state.status(),
        "Actor stopped"
    );
    if termination.state.status() == Status::Exception {
        if let Some(link) = link {
            link.cancel();
        }
    }
    done.send_replace(Some(Arc::new(termination)));

    if let Some((started, reason)) = refused {
        let _ = started.send(Err(reason));
    }
}

impl<A: Actor> Controller<A> {
    async fn enter(&mut self) -> ControlFlow<StopReason> {
        self.state.stamp_entry();
        let behavior = self.state.behavior().clone();
        match guarded(behavior.run_entry(self.state.clone())).await {
            Ok(Step::Continue(state)) => {
                self.state = state;
                if self.state.status().is_terminal() {
                    return ControlFlow::Break(self.recorded_reason());
                }
                self.state.set_status(Status::Running);
                ControlFlow::Continue(())
            }
            Ok(Step::Stop(reason, state)) => {
                self.state = state;
                ControlFlow::Break(reason)
            }
            Err(err) => self.fail("entry", err),
        }
    }

    /// The start-work signal: always handled before any queued mail.
    async fn start_work(&mut self) -> ControlFlow<StopReason> {
        let (worker, flow) = delegate_work(&mut self.state, &self.worker_ids, &self.runtime).await;
        self.worker = worker;
        flow?;
        self.check_terminal()
    }

    async fn serve(&mut self) -> StopReason {
        loop {
            let idle = self.state.hibernate();
            let signal = tokio::select! {
                exit = next_exit(&mut self.worker) => Signal::WorkerExit(exit),
                envelope = self.mailbox.recv() => match envelope {
                    Some(envelope) => Signal::Mail(envelope),
                    None => Signal::Closed,
                },
                _ = link_down(self.link.as_ref()) => Signal::LinkDown,
                _ = idle_for(idle) => Signal::Idle,
            };
            if let ControlFlow::Break(reason) = self.dispatch(signal).await {
                return reason;
            }
        }
    }

    async fn dispatch(&mut self, signal: Signal<A>) -> ControlFlow<StopReason> {
        match signal {
            Signal::Mail(Envelope::Stop(reason)) => ControlFlow::Break(reason),
            Signal::Mail(Envelope::Hibernate) | Signal::Idle => {
                tracing::trace!(actor_id = %self.id, "Hibernate hint");
                tokio::task::yield_now().await;
                ControlFlow::Continue(())
            }
            Signal::Mail(Envelope::Detach { from }) => self.detach(from).await,
            Signal::Mail(Envelope::Request { command, from }) => {
                self.deliver(Event::Request { command, from }).await
            }
            Signal::Mail(Envelope::Notification(command)) => {
                self.deliver(Event::Notification(command)).await
            }
            Signal::WorkerExit(exit) => {
                self.worker = None;
                self.state.set_worker(None);
                tracing::debug!(actor_id = %self.id, "Worker finished");
                match exit {
                    WorkerExit::Finished(result) => {
                        resolve(&mut self.state, result)?;
                        self.check_terminal()
                    }
                    WorkerExit::Killed => ControlFlow::Continue(()),
                }
            }
            Signal::LinkDown => ControlFlow::Break(StopReason::Shutdown),
            Signal::Closed => ControlFlow::Break(StopReason::Normal),
        }
    }

    /// Routes an application message to react, else to the worker, else
    /// answers "no handler".
    async fn deliver(&mut self, event: Event<A>) -> ControlFlow<StopReason> {
        if self.state.behavior().has_react() {
            let from = match &event {
                Event::Request { from, .. } => Some(from.clone()),
                _ => None,
            };
            let reaction = self.react(event, from.as_ref()).await?;
            return match reaction {
                Reaction::Reply(value, state) => {
                    self.state = state;
                    if let Some(from) = from {
                        from.reply(value);
                    }
                    self.check_terminal()
                }
                Reaction::Continue(state) | Reaction::Ready(state) | Reaction::NotReady(state) => {
                    self.state = state;
                    self.check_terminal()
                }
                Reaction::Stop(reason, state) => {
                    self.state = state;
                    ControlFlow::Break(reason)
                }
            };
        }

        let message = match event {
            Event::Request { command, from } => WorkerMessage::Request { command, from },
            Event::Notification(command) => WorkerMessage::Notification(command),
            Event::Detach => return ControlFlow::Continue(()),
        };
        let unrouted = match self.live_worker() {
            Some(worker) => worker.handle.send(message).err(),
            None => Some(message),
        };
        match unrouted {
            Some(WorkerMessage::Request { from, .. }) => {
                tracing::warn!(actor_id = %self.id, "No handler for request");
                from.fail(ActorError::NoHandler);
            }
            Some(_) => tracing::trace!(actor_id = %self.id, "Dropped notification"),
            None => {}
        }
        ControlFlow::Continue(())
    }

    /// Invokes react on a snapshot. A failure is answered on `from`, marks the
    /// state as an exception and stops the actor.
    async fn react(
        &mut self,
        event: Event<A>,
        from: Option<&ReplyTo<A::Reply>>,
    ) -> ControlFlow<StopReason, Reaction<A>> {
        let behavior = self.state.behavior().clone();
        match guarded(behavior.run_react(event, self.state.clone())).await {
            Ok(reaction) => ControlFlow::Continue(reaction),
            Err(err) => {
                if let Some(from) = from {
                    from.fail(err.clone());
                }
                self.fail("react", err)
            }
        }
    }

    async fn detach(&mut self, from: DetachReply<A>) -> ControlFlow<StopReason> {
        if self.state.behavior().has_react() {
            let reaction = match self.react(Event::Detach, None).await {
                ControlFlow::Continue(reaction) => reaction,
                ControlFlow::Break(reason) => {
                    let _ = from.send(Err(DetachError::Stopped(reason.clone())));
                    return ControlFlow::Break(reason);
                }
            };
            match reaction {
                Reaction::Continue(state) | Reaction::Ready(state) | Reaction::Reply(_, state) => {
                    self.state = state;
                }
                Reaction::NotReady(state) => {
                    self.state = state;
                    let _ = from.send(Err(DetachError::NotReady));
                    return ControlFlow::Continue(());
                }
                Reaction::Stop(reason, state) => {
                    self.state = state;
                    let _ = from.send(Err(DetachError::Stopped(reason.clone())));
                    return ControlFlow::Break(reason);
                }
            }
        }

        if let Some(worker) = self.live_worker() {
            let (reply, answer) = oneshot::channel();
            let _ = worker.handle.send(WorkerMessage::Detach { reply });
            match bounded(self.state.timeout(), answer).await {
                Some(Ok(Readiness::Ready(patch))) => {
                    if let Some(patch) = patch {
                        self.state.merge(patch);
                    }
                }
                _ => {
                    tracing::debug!(actor_id = %self.id, "Worker not ready to detach");
                    let _ = from.send(Err(DetachError::NotReady));
                    return ControlFlow::Continue(());
                }
            }
        }

        tracing::debug!(actor_id = %self.id, "Detaching");
        let _ = from.send(Ok(self.state.clone()));
        ControlFlow::Break(StopReason::Detach)
    }

    fn live_worker(&self) -> Option<&Worker<A>> {
        self.worker.as_ref().filter(|worker| worker.handle.is_alive())
    }

    fn fail<T>(&mut self, hook: &str, err: ActorError) -> ControlFlow<StopReason, T> {
        tracing::error!(actor_id = %self.id, hook, error = %err, "Hook failed");
        self.state.set_status(Status::Exception);
        ControlFlow::Break(StopReason::Failure(err))
    }

    /// Stops the actor if a hook left a terminal status behind.
    fn check_terminal(&self) -> ControlFlow<StopReason> {
        if self.state.status().is_terminal() {
            ControlFlow::Break(self.recorded_reason())
        } else {
            ControlFlow::Continue(())
        }
    }

    fn recorded_reason(&self) -> StopReason {
        self.state.reason().cloned().unwrap_or(StopReason::Normal)
    }
}

async fn next_exit<A: Actor>(worker: &mut Option<Worker<A>>) -> WorkerExit<A> {
    match worker {
        Some(worker) => WorkerExit::from_join((&mut worker.join).await),
        None => std::future::pending().await,
    }
}

async fn link_down(link: Option<&CancellationToken>) {
    match link {
        Some(link) => link.cancelled().await,
        None => std::future::pending().await,
    }
}

async fn idle_for(idle: Option<Duration>) {
    match idle {
        Some(idle) => tokio::time::sleep(idle).await,
        None => std::future::pending().await,
    }
}
