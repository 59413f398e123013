//! Two-phase termination: stop the worker, then run the exit hook.

use crate::actor::{
    hooks::guarded,
    state::{State, Termination},
    worker::{stop_worker, Worker},
    Actor,
};
use crate::types::{Sign, Status, StopReason};

/// Drives a state object to its final `(sign, state)` pair. Runs once per
/// actor and never fails.
pub(crate) async fn shutdown<A: Actor>(
    mut state: State<A>,
    worker: Option<Worker<A>>,
    reason: StopReason,
) -> Termination<A> {
    state.set_reason(reason.clone());

    if let Some(worker) = worker {
        if let Some(failure) = stop_worker(worker, &mut state, &reason).await {
            state.set_reason(failure);
        }
    }

    let behavior = state.behavior().clone();
    let (sign, mut state) = match guarded(behavior.run_exit(state.clone())).await {
        Ok(finished) => finished,
        Err(err) => {
            tracing::error!(error = %err, "Exit hook failed");
            state.set_status(Status::Exception);
            (Sign::Exception, state)
        }
    };

    state.stamp_exit();
    if matches!(state.status(), Status::Undefined | Status::Running) {
        state.set_status(Status::Stopped);
    }
    Termination { sign, state }
}
