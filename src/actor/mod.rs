//! Core actor traits and lifecycle machinery.

/// Worker execution context handed to the `do` hook.
pub mod context;
/// Actor handle for external communication.
pub mod handle;
/// Lifecycle hook contract and the behavior descriptor.
pub mod hooks;
/// Runtime configuration, spawning and the controller loop.
pub mod runtime;
/// The state object threaded through an actor's lifecycle.
pub mod state;

mod shutdown;
mod worker;

use runtime::ActorConfig;

/// Type family describing one kind of state object.
///
/// Implement this on a marker type; the runtime is generic over it. Hooks are
/// not part of the trait: they live in a [`Behavior`](hooks::Behavior) carried
/// by the [`State`](state::State) itself, so each hook can be present or absent
/// independently.
pub trait Actor: Sized + Send + Sync + 'static {
    /// Application payload carried by the state object.
    type Data: Clone + Send + Sync + 'static;

    /// Structured supplement merged into `Data` when a `do` hook completes.
    type Patch: Send + 'static;

    /// Opaque result value stored under the state's `output`.
    type Output: Clone + Send + Sync + 'static;

    /// Application commands carried by requests and notifications.
    type Command: Send + 'static;

    /// Answer type for requests.
    ///
    /// Use `()` if the actor never replies with a value.
    type Reply: Send + 'static;

    /// Merges a supplement into the payload, field by field.
    fn merge(data: &mut Self::Data, patch: Self::Patch);
}

/// Helper trait for flexible ActorConfig parameter.
///
/// This allows passing `()`, `None`, `ActorConfig::default()`, or `&config` to `start`.
pub trait IntoActorConfig {
    /// Converts the value into an `ActorConfig`.
    fn into_config(self) -> ActorConfig;
}

impl IntoActorConfig for ActorConfig {
    fn into_config(self) -> ActorConfig {
        self
    }
}

impl IntoActorConfig for &ActorConfig {
    fn into_config(self) -> ActorConfig {
        self.clone()
    }
}

impl IntoActorConfig for Option<ActorConfig> {
    fn into_config(self) -> ActorConfig {
        self.unwrap_or_default()
    }
}

impl IntoActorConfig for () {
    fn into_config(self) -> ActorConfig {
        ActorConfig::default()
    }
}
