//! Runs the `do` hook inline or on a supervised worker task, and folds its
//! completion back into the state.

use std::ops::ControlFlow;
use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle};
use tokio_util::sync::CancellationToken;

use crate::actor::{
    context::{WorkerContext, WorkerHandle},
    hooks::{guarded, panic_message, Completion, DoHook},
    state::State,
    Actor,
};
use crate::error::{ActorError, ActorResult};
use crate::types::{Status, StopReason, WorkMode, WorkerIdGenerator};

/// A spawned worker: its mailbox handle plus the receive-once completion slot.
pub(crate) struct Worker<A: Actor> {
    pub handle: WorkerHandle<A>,
    pub join: JoinHandle<ActorResult<Completion<A>>>,
}

/// How a worker task ended.
pub(crate) enum WorkerExit<A: Actor> {
    /// The hook returned, failed or panicked.
    Finished(ActorResult<Completion<A>>),
    /// The task was aborted.
    Killed,
}

impl<A: Actor> WorkerExit<A> {
    pub fn from_join(joined: Result<ActorResult<Completion<A>>, JoinError>) -> Self {
        match joined {
            Ok(result) => WorkerExit::Finished(result),
            Err(err) if err.is_panic() => {
                let message = panic_message(err.into_panic().as_ref());
                WorkerExit::Finished(Err(ActorError::Panic(message)))
            }
            Err(_) => WorkerExit::Killed,
        }
    }
}

/// Invokes the `do` hook once, right after entry.
///
/// Sync mode awaits the hook on the caller's task and resolves it immediately.
/// Async mode spawns a worker and returns it; its completion is resolved later.
pub(crate) async fn delegate_work<A: Actor>(
    state: &mut State<A>,
    ids: &WorkerIdGenerator,
    runtime: &Handle,
) -> (Option<Worker<A>>, ControlFlow<StopReason>) {
    let Some(hook) = state.behavior().work_hook() else {
        return (None, ControlFlow::Continue(()));
    };
    match state.work_mode() {
        WorkMode::Sync => {
            let ctx = WorkerContext::inline(state.pid().cloned());
            let outcome = guarded(hook.run(state.clone(), ctx)).await;
            (None, resolve(state, outcome))
        }
        WorkMode::Async => {
            let worker = spawn(hook, state.clone(), ids, runtime);
            state.set_worker(Some(worker.handle.clone()));
            tracing::debug!(
                actor_id = ?state.pid().map(|pid| pid.id().clone()),
                worker = %worker.handle.id(),
                "Worker spawned"
            );
            (Some(worker), ControlFlow::Continue(()))
        }
    }
}

fn spawn<A: Actor>(
    hook: Arc<dyn DoHook<A>>,
    state: State<A>,
    ids: &WorkerIdGenerator,
    runtime: &Handle,
) -> Worker<A> {
    let id = ids.next();
    let (tx, rx) = mpsc::unbounded_channel();
    let stop = CancellationToken::new();
    let ctx = WorkerContext::spawned(id, rx, stop.clone(), state.pid().cloned());
    let join = runtime.spawn(async move { hook.run(state, ctx).await });
    Worker {
        handle: WorkerHandle::new(id, tx, stop),
        join,
    }
}

/// Folds a `do` completion into the state.
///
/// Anything that is not a recognised completion marks the state as an
/// exception and stops with the failure as reason.
pub(crate) fn resolve<A: Actor>(
    state: &mut State<A>,
    outcome: ActorResult<Completion<A>>,
) -> ControlFlow<StopReason> {
    match outcome {
        Ok(Completion::Continue) => ControlFlow::Continue(()),
        Ok(Completion::Merge(patch)) => {
            state.merge(patch);
            ControlFlow::Continue(())
        }
        Ok(Completion::Output(value)) => {
            state.set_output(value);
            ControlFlow::Continue(())
        }
        Ok(Completion::StopWith { patch, reason }) => {
            state.merge(patch);
            ControlFlow::Break(reason.unwrap_or(StopReason::Done))
        }
        Ok(Completion::Stop(reason)) => ControlFlow::Break(reason),
        Err(err) => {
            state.set_status(Status::Exception);
            ControlFlow::Break(StopReason::Failure(err))
        }
    }
}

/// Asks a worker to stop and waits up to the state's timeout.
///
/// A clean exit is folded in with [`resolve`]; a worker that outlives the
/// timeout is aborted and the output becomes the abort sentinel. Returns the
/// failure when the worker's result was an error.
pub(crate) async fn stop_worker<A: Actor>(
    worker: Worker<A>,
    state: &mut State<A>,
    reason: &StopReason,
) -> Option<StopReason> {
    let Worker { handle, mut join } = worker;
    state.set_worker(None);
    handle.request_stop(reason.clone());

    let joined = match state.timeout() {
        Some(limit) => tokio::time::timeout(limit, &mut join).await.ok(),
        None => Some((&mut join).await),
    };
    let Some(joined) = joined else {
        join.abort();
        state.abort_output();
        tracing::warn!(
            worker = %handle.id(),
            "Worker ignored stop request; killed"
        );
        return None;
    };
    match WorkerExit::from_join(joined) {
        WorkerExit::Finished(result) => match resolve(state, result) {
            ControlFlow::Break(failure @ StopReason::Failure(_)) => Some(failure),
            _ => None,
        },
        WorkerExit::Killed => None,
    }
}
