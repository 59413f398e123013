//! The state object: application data, hooks and lifecycle metadata.

use std::fmt::{self, Debug, Formatter};
use std::time::Duration;

use tokio::time::Instant;

use crate::actor::{
    context::WorkerHandle, handle::ActorHandle, hooks::Behavior, runtime, Actor, IntoActorConfig,
};
use crate::error::SpawnError;
use crate::types::{Output, Sign, Status, StopReason, WorkMode};

/// Single-owner record threaded through one actor's lifecycle.
///
/// Hooks receive the state by value and hand back a new version. Only
/// `data` is freely mutable; lifecycle metadata is stamped by the runtime,
/// and hooks may record a `sign`, an `output` or a terminal `status`.
pub struct State<A: Actor> {
    /// Application payload.
    pub data: A::Data,
    behavior: Behavior<A>,
    status: Status,
    entry_time: Option<Instant>,
    exit_time: Option<Instant>,
    reason: Option<StopReason>,
    sign: Option<Sign>,
    output: Option<Output<A::Output>>,
    work_mode: WorkMode,
    timeout: Option<Duration>,
    hibernate: Option<Duration>,
    pid: Option<ActorHandle<A>>,
    worker: Option<WorkerHandle<A>>,
}

impl<A: Actor> Clone for State<A> {
    fn clone(&self) -> Self {
        Self {
            data: self.data.clone(),
            behavior: self.behavior.clone(),
            status: self.status,
            entry_time: self.entry_time,
            exit_time: self.exit_time,
            reason: self.reason.clone(),
            sign: self.sign.clone(),
            output: self.output.clone(),
            work_mode: self.work_mode,
            timeout: self.timeout,
            hibernate: self.hibernate,
            pid: self.pid.clone(),
            worker: self.worker.clone(),
        }
    }
}

impl<A: Actor> Debug for State<A>
where
    A::Data: Debug,
    A::Output: Debug,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("State")
            .field("data", &self.data)
            .field("behavior", &self.behavior)
            .field("status", &self.status)
            .field("reason", &self.reason)
            .field("sign", &self.sign)
            .field("output", &self.output)
            .field("work_mode", &self.work_mode)
            .field("pid", &self.pid.as_ref().map(|pid| pid.id().clone()))
            .finish_non_exhaustive()
    }
}

impl<A: Actor> State<A> {
    /// Creates a state object with no hooks and default execution settings.
    pub fn new(data: A::Data) -> Self {
        Self {
            data,
            behavior: Behavior::default(),
            status: Status::Undefined,
            entry_time: None,
            exit_time: None,
            reason: None,
            sign: None,
            output: None,
            work_mode: WorkMode::default(),
            timeout: None,
            hibernate: None,
            pid: None,
            worker: None,
        }
    }

    /// Installs the hooks.
    pub fn with_behavior(mut self, behavior: Behavior<A>) -> Self {
        self.behavior = behavior;
        self
    }

    /// Sets where the `do` hook runs.
    pub fn with_work_mode(mut self, mode: WorkMode) -> Self {
        self.work_mode = mode;
        self
    }

    /// Bounds worker stop and detach-forwarding waits. Unbounded by default.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the idle period after which a suspend hint is issued.
    pub fn with_hibernate(mut self, idle: Duration) -> Self {
        self.hibernate = Some(idle);
        self
    }

    /// Starts the actor linked to `config.link`, waiting for its entry hook.
    pub async fn start(self, config: impl IntoActorConfig) -> Result<ActorHandle<A>, SpawnError> {
        runtime::start(self, config).await
    }

    /// Starts the actor without linking it to anything.
    pub async fn start_detached(
        self,
        config: impl IntoActorConfig,
    ) -> Result<ActorHandle<A>, SpawnError> {
        runtime::start_detached(self, config).await
    }

    /// Returns the installed hooks.
    pub fn behavior(&self) -> &Behavior<A> {
        &self.behavior
    }

    /// Returns the lifecycle status.
    pub fn status(&self) -> Status {
        self.status
    }

    /// Records a status. The controller stops the actor as soon as a hook
    /// leaves a terminal status behind.
    pub fn set_status(&mut self, status: Status) {
        self.status = status;
    }

    /// When the entry hook was invoked.
    pub fn entry_time(&self) -> Option<Instant> {
        self.entry_time
    }

    /// When shutdown finished. Set exactly once.
    pub fn exit_time(&self) -> Option<Instant> {
        self.exit_time
    }

    /// Last stop cause.
    pub fn reason(&self) -> Option<&StopReason> {
        self.reason.as_ref()
    }

    /// Returns true if the actor is leaving through the detach protocol.
    pub fn is_detaching(&self) -> bool {
        matches!(self.reason, Some(StopReason::Detach))
    }

    /// Terminal tag recorded by a hook.
    pub fn sign(&self) -> Option<&Sign> {
        self.sign.as_ref()
    }

    /// Records the terminal tag reported when no exit hook overrides it.
    pub fn set_sign(&mut self, sign: Sign) {
        self.sign = Some(sign);
    }

    /// Accumulated result payload.
    pub fn output(&self) -> Option<&Output<A::Output>> {
        self.output.as_ref()
    }

    /// Stores a result value.
    pub fn set_output(&mut self, value: A::Output) {
        self.output = Some(Output::Value(value));
    }

    /// Where the `do` hook runs.
    pub fn work_mode(&self) -> WorkMode {
        self.work_mode
    }

    /// Bound on worker waits, `None` if unbounded.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Idle period before a suspend hint, `None` if never.
    pub fn hibernate(&self) -> Option<Duration> {
        self.hibernate
    }

    /// Handle to the actor owning this state; set before entry runs.
    pub fn pid(&self) -> Option<&ActorHandle<A>> {
        self.pid.as_ref()
    }

    /// Handle to the live async worker, if any.
    pub fn worker(&self) -> Option<&WorkerHandle<A>> {
        self.worker.as_ref()
    }

    /// Merges a supplement into `data`.
    pub fn merge(&mut self, patch: A::Patch) {
        A::merge(&mut self.data, patch);
    }

    pub(crate) fn abort_output(&mut self) {
        self.output = Some(Output::Abort);
    }

    pub(crate) fn set_pid(&mut self, pid: ActorHandle<A>) {
        self.pid = Some(pid);
    }

    pub(crate) fn set_worker(&mut self, worker: Option<WorkerHandle<A>>) {
        self.worker = worker;
    }

    pub(crate) fn set_reason(&mut self, reason: StopReason) {
        self.reason = Some(reason);
    }

    pub(crate) fn stamp_entry(&mut self) {
        self.entry_time = Some(Instant::now());
    }

    pub(crate) fn stamp_exit(&mut self) {
        if self.exit_time.is_none() {
            self.exit_time = Some(Instant::now());
        }
    }
}

/// Externally observable result of a terminated actor.
pub struct Termination<A: Actor> {
    /// Terminal signal chosen by the exit hook (or its default).
    pub sign: Sign,
    /// Final state.
    pub state: State<A>,
}

impl<A: Actor> Debug for Termination<A>
where
    A::Data: Debug,
    A::Output: Debug,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Termination")
            .field("sign", &self.sign)
            .field("state", &self.state)
            .finish()
    }
}
