//! The four optional lifecycle hooks and the descriptor that carries them.

use std::any::Any;
use std::fmt::{self, Debug, Formatter};
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;

use crate::actor::{context::WorkerContext, state::State, Actor};
use crate::error::{ActorError, ActorResult};
use crate::types::{ReplyTo, Sign, Status, StopReason};

/// Result of the entry hook.
pub enum Step<A: Actor> {
    /// Proceed to `Running` with this state.
    Continue(State<A>),
    /// Stop before running; the exit hook still runs.
    Stop(StopReason, State<A>),
}

/// Result of the `do` hook, sync or async.
pub enum Completion<A: Actor> {
    /// Keep running, nothing to merge.
    Continue,
    /// Merge a structured supplement into the state's data.
    Merge(A::Patch),
    /// Store an opaque value under `output`.
    Output(A::Output),
    /// Merge a supplement, then stop with `reason` (default [`StopReason::Done`]).
    StopWith {
        /// Supplement merged before stopping.
        patch: A::Patch,
        /// Declared stop reason.
        reason: Option<StopReason>,
    },
    /// Stop immediately.
    Stop(StopReason),
}

/// Message handed to the react hook.
pub enum Event<A: Actor> {
    /// A command whose caller waits for a reply on `from`.
    Request {
        /// Application command.
        command: A::Command,
        /// Reply token; may be kept and answered later.
        from: ReplyTo<A::Reply>,
    },
    /// A fire-and-forget command.
    Notification(A::Command),
    /// Asks whether the actor can be detached right now.
    Detach,
}

/// Result of the react hook.
pub enum Reaction<A: Actor> {
    /// Keep running. For [`Event::Detach`] this means ready.
    Continue(State<A>),
    /// Keep running and answer the originating request.
    Reply(A::Reply, State<A>),
    /// Stop with a reason.
    Stop(StopReason, State<A>),
    /// Ready to detach, with the state to hand out.
    Ready(State<A>),
    /// Not ready to detach; the state is kept.
    NotReady(State<A>),
}

/// Initialisation hook.
#[async_trait]
pub trait EntryHook<A: Actor>: Send + Sync + 'static {
    /// Runs once before anything else.
    async fn entry(&self, state: State<A>) -> ActorResult<Step<A>>;
}

/// Background work hook.
#[async_trait]
pub trait DoHook<A: Actor>: Send + Sync + 'static {
    /// Runs once after a successful entry, inline or on a worker.
    async fn run(&self, state: State<A>, ctx: WorkerContext<A>) -> ActorResult<Completion<A>>;
}

/// Message handling hook.
#[async_trait]
pub trait ReactHook<A: Actor>: Send + Sync + 'static {
    /// Handles one mailbox message.
    async fn react(&self, event: Event<A>, state: State<A>) -> ActorResult<Reaction<A>>;
}

/// Finalisation hook.
#[async_trait]
pub trait ExitHook<A: Actor>: Send + Sync + 'static {
    /// Runs exactly once during shutdown and picks the terminal sign.
    async fn exit(&self, state: State<A>) -> ActorResult<(Sign, State<A>)>;
}

#[async_trait]
impl<A, F, Fut> EntryHook<A> for F
where
    A: Actor,
    F: Fn(State<A>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ActorResult<Step<A>>> + Send + 'static,
{
    async fn entry(&self, state: State<A>) -> ActorResult<Step<A>> {
        (self)(state).await
    }
}

#[async_trait]
impl<A, F, Fut> DoHook<A> for F
where
    A: Actor,
    F: Fn(State<A>, WorkerContext<A>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ActorResult<Completion<A>>> + Send + 'static,
{
    async fn run(&self, state: State<A>, ctx: WorkerContext<A>) -> ActorResult<Completion<A>> {
        (self)(state, ctx).await
    }
}

#[async_trait]
impl<A, F, Fut> ReactHook<A> for F
where
    A: Actor,
    F: Fn(Event<A>, State<A>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ActorResult<Reaction<A>>> + Send + 'static,
{
    async fn react(&self, event: Event<A>, state: State<A>) -> ActorResult<Reaction<A>> {
        (self)(event, state).await
    }
}

#[async_trait]
impl<A, F, Fut> ExitHook<A> for F
where
    A: Actor,
    F: Fn(State<A>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ActorResult<(Sign, State<A>)>> + Send + 'static,
{
    async fn exit(&self, state: State<A>) -> ActorResult<(Sign, State<A>)> {
        (self)(state).await
    }
}

/// Descriptor holding whichever of the four hooks an actor implements.
///
/// Absent hooks fall back to the defaults in the `run_*` methods: entry passes
/// the state through, do is skipped, react is replaced by worker forwarding or
/// "no handler" replies, and exit reports the recorded sign or status.
///
/// ```rust,no_run
/// # use tokio_lifecycle::{Actor, ActorResult, Behavior, State, Step};
/// # struct Probe;
/// # impl Actor for Probe {
/// #     type Data = u32; type Patch = u32; type Output = u32;
/// #     type Command = (); type Reply = ();
/// #     fn merge(data: &mut u32, patch: u32) { *data = patch; }
/// # }
/// async fn enter(state: State<Probe>) -> ActorResult<Step<Probe>> {
///     Ok(Step::Continue(state))
/// }
///
/// let behavior = Behavior::<Probe>::new().on_entry(enter);
/// assert!(behavior.has_entry());
/// ```
pub struct Behavior<A: Actor> {
    entry: Option<Arc<dyn EntryHook<A>>>,
    work: Option<Arc<dyn DoHook<A>>>,
    react: Option<Arc<dyn ReactHook<A>>>,
    exit: Option<Arc<dyn ExitHook<A>>>,
}

impl<A: Actor> Default for Behavior<A> {
    fn default() -> Self {
        Self {
            entry: None,
            work: None,
            react: None,
            exit: None,
        }
    }
}

impl<A: Actor> Clone for Behavior<A> {
    fn clone(&self) -> Self {
        Self {
            entry: self.entry.clone(),
            work: self.work.clone(),
            react: self.react.clone(),
            exit: self.exit.clone(),
        }
    }
}

impl<A: Actor> Debug for Behavior<A> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Behavior")
            .field("entry", &self.has_entry())
            .field("do", &self.has_do())
            .field("react", &self.has_react())
            .field("exit", &self.has_exit())
            .finish()
    }
}

impl<A: Actor> Behavior<A> {
    /// Creates a behavior with no hooks.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the entry hook from a closure or async fn.
    pub fn on_entry<F, Fut>(self, hook: F) -> Self
    where
        F: Fn(State<A>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ActorResult<Step<A>>> + Send + 'static,
    {
        self.with_entry(hook)
    }

    /// Sets the do hook from a closure or async fn.
    pub fn on_do<F, Fut>(self, hook: F) -> Self
    where
        F: Fn(State<A>, WorkerContext<A>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ActorResult<Completion<A>>> + Send + 'static,
    {
        self.with_do(hook)
    }

    /// Sets the react hook from a closure or async fn.
    pub fn on_react<F, Fut>(self, hook: F) -> Self
    where
        F: Fn(Event<A>, State<A>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ActorResult<Reaction<A>>> + Send + 'static,
    {
        self.with_react(hook)
    }

    /// Sets the exit hook from a closure or async fn.
    pub fn on_exit<F, Fut>(self, hook: F) -> Self
    where
        F: Fn(State<A>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ActorResult<(Sign, State<A>)>> + Send + 'static,
    {
        self.with_exit(hook)
    }

    /// Sets the entry hook from any implementation.
    pub fn with_entry(mut self, hook: impl EntryHook<A>) -> Self {
        self.entry = Some(Arc::new(hook));
        self
    }

    /// Sets the do hook from any implementation.
    pub fn with_do(mut self, hook: impl DoHook<A>) -> Self {
        self.work = Some(Arc::new(hook));
        self
    }

    /// Sets the react hook from any implementation.
    pub fn with_react(mut self, hook: impl ReactHook<A>) -> Self {
        self.react = Some(Arc::new(hook));
        self
    }

    /// Sets the exit hook from any implementation.
    pub fn with_exit(mut self, hook: impl ExitHook<A>) -> Self {
        self.exit = Some(Arc::new(hook));
        self
    }

    /// Returns true if an entry hook is present.
    pub fn has_entry(&self) -> bool {
        self.entry.is_some()
    }

    /// Returns true if a do hook is present.
    pub fn has_do(&self) -> bool {
        self.work.is_some()
    }

    /// Returns true if a react hook is present.
    pub fn has_react(&self) -> bool {
        self.react.is_some()
    }

    /// Returns true if an exit hook is present.
    pub fn has_exit(&self) -> bool {
        self.exit.is_some()
    }

    pub(crate) fn work_hook(&self) -> Option<Arc<dyn DoHook<A>>> {
        self.work.clone()
    }

    pub(crate) async fn run_entry(&self, state: State<A>) -> ActorResult<Step<A>> {
        match &self.entry {
            Some(hook) => hook.entry(state).await,
            None => Ok(Step::Continue(state)),
        }
    }

    /// Callers check [`has_react`](Self::has_react) first; the absent case
    /// keeps the state untouched.
    pub(crate) async fn run_react(
        &self,
        event: Event<A>,
        state: State<A>,
    ) -> ActorResult<Reaction<A>> {
        match &self.react {
            Some(hook) => hook.react(event, state).await,
            None => Ok(Reaction::Continue(state)),
        }
    }

    pub(crate) async fn run_exit(&self, state: State<A>) -> ActorResult<(Sign, State<A>)> {
        match &self.exit {
            Some(hook) => hook.exit(state).await,
            None => Ok((default_sign(&state), state)),
        }
    }
}

/// Sign reported when no exit hook is present. An exception status wins over
/// any recorded sign.
fn default_sign<A: Actor>(state: &State<A>) -> Sign {
    if state.status() == Status::Exception {
        return Sign::Exception;
    }
    if let Some(sign) = state.sign() {
        return sign.clone();
    }
    match state.reason() {
        Some(StopReason::Detach) => Sign::Detached,
        _ => Sign::Stopped,
    }
}

/// Awaits a hook, converting a panic into [`ActorError::Panic`].
pub(crate) async fn guarded<T, F>(hook: F) -> ActorResult<T>
where
    F: Future<Output = ActorResult<T>>,
{
    match AssertUnwindSafe(hook).catch_unwind().await {
        Ok(result) => result,
        Err(payload) => Err(ActorError::Panic(panic_message(payload.as_ref()))),
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
