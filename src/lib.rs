#![warn(missing_docs)]
//! Tokio Lifecycle turns four optional callbacks (entry, do, react, exit) plus
//! a data payload into a supervised, message-driven actor running on Tokio.
//!
//! # Overview
//! - Each actor owns a [`State`] and runs as an exclusive task that drains a
//!   bounded mailbox one message at a time.
//! - `entry` runs first; `do` runs once afterwards, either inline (blocking the
//!   mailbox) or on a supervised worker task; `react` handles every other
//!   message; `exit` runs exactly once during shutdown.
//! - Hook failures and panics never escape: they mark the state as an
//!   exception and route through the normal shutdown, whose `(sign, state)`
//!   result is cached for anyone awaiting the actor.
//! - See `demos/counter.rs` for a runnable end-to-end example.
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use tokio_lifecycle::{
//!     Actor, ActorConfig, ActorResult, Behavior, Completion, Event, Reaction, State,
//!     StopReason, WorkerContext,
//! };
//!
//! struct Counter;
//!
//! impl Actor for Counter {
//!     type Data = u64;
//!     type Patch = u64;
//!     type Output = ();
//!     type Command = ();
//!     type Reply = u64;
//!
//!     fn merge(data: &mut u64, patch: u64) {
//!         *data = patch;
//!     }
//! }
//!
//! async fn reset(_state: State<Counter>, _ctx: WorkerContext<Counter>) -> ActorResult<Completion<Counter>> {
//!     Ok(Completion::Merge(0))
//! }
//!
//! async fn bump(event: Event<Counter>, mut state: State<Counter>) -> ActorResult<Reaction<Counter>> {
//!     match event {
//!         Event::Request { .. } => {
//!             state.data += 1;
//!             Ok(Reaction::Reply(state.data, state))
//!         }
//!         _ => Ok(Reaction::Continue(state)),
//!     }
//! }
//!
//! #[tokio::main(flavor = "multi_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let behavior = Behavior::new().on_do(reset).on_react(bump);
//!     let handle = State::<Counter>::new(7)
//!         .with_behavior(behavior)
//!         .start(ActorConfig::default())
//!         .await?;
//!     let count = handle.call((), Duration::from_secs(1)).await?;
//!     assert_eq!(count, 1);
//!     let done = handle.stop(StopReason::Normal, Duration::from_secs(1)).await?;
//!     assert_eq!(done.state.data, 1);
//!     Ok(())
//! }
//! ```

pub mod actor;
pub mod error;
pub mod types;

pub use actor::{
    context::{Readiness, WorkerContext, WorkerHandle, WorkerMessage},
    handle::ActorHandle,
    hooks::{Behavior, Completion, DoHook, EntryHook, Event, ExitHook, ReactHook, Reaction, Step},
    runtime::{start, start_detached, ActorConfig, MailboxConfig},
    state::{State, Termination},
    Actor, IntoActorConfig,
};
pub use error::{
    ActorError, ActorResult, CallError, DetachError, SendError, SpawnError, StopError,
    TrySendError,
};
pub use types::{ActorId, Output, ReplyTo, Sign, Status, StopReason, WorkMode, WorkerId};
