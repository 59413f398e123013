use std::time::Duration;

use tokio::time::sleep;
use tokio_lifecycle::{
    start, start_detached, Actor, ActorConfig, ActorError, ActorResult, Behavior, Completion,
    SpawnError, State, Status, Step, StopReason, WorkMode, WorkerContext,
};
use tokio_util::sync::CancellationToken;

const BOUND: Duration = Duration::from_secs(1);

struct Node;

impl Actor for Node {
    type Data = u8;
    type Patch = u8;
    type Output = ();
    type Command = ();
    type Reply = ();

    fn merge(data: &mut u8, patch: u8) {
        *data = patch;
    }
}

async fn crash(_state: State<Node>, _ctx: WorkerContext<Node>) -> ActorResult<Completion<Node>> {
    sleep(Duration::from_millis(20)).await;
    Err(ActorError::user("link test crash"))
}

async fn slow_entry(state: State<Node>) -> ActorResult<Step<Node>> {
    sleep(Duration::from_millis(300)).await;
    Ok(Step::Continue(state))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn cancelled_link_shuts_the_actor_down() {
    let link = CancellationToken::new();
    let config = ActorConfig::default().with_link(link.clone());
    let handle = start(State::<Node>::new(0), config).await.unwrap();

    link.cancel();
    let done = tokio::time::timeout(BOUND, handle.wait())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(done.state.reason(), Some(&StopReason::Shutdown));
    assert_eq!(done.state.status(), Status::Stopped);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn crashing_actor_cancels_its_link() {
    let link = CancellationToken::new();
    let state = State::new(0)
        .with_work_mode(WorkMode::Async)
        .with_behavior(Behavior::new().on_do(crash));
    let handle = state
        .start(ActorConfig::default().with_link(link.clone()))
        .await
        .unwrap();

    tokio::time::timeout(BOUND, link.cancelled()).await.unwrap();
    let done = handle.wait().await.unwrap();
    assert_eq!(done.state.status(), Status::Exception);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn normal_stop_leaves_the_link_alone() {
    let link = CancellationToken::new();
    let handle = State::<Node>::new(0)
        .start(ActorConfig::default().with_link(link.clone()))
        .await
        .unwrap();

    handle.stop(StopReason::Normal, BOUND).await.unwrap();
    assert!(!link.is_cancelled());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn detached_start_ignores_the_link() {
    let link = CancellationToken::new();
    let config = ActorConfig::default().with_link(link.clone());
    let handle = start_detached(State::<Node>::new(0), config).await.unwrap();

    link.cancel();
    sleep(Duration::from_millis(30)).await;
    assert!(handle.is_alive());

    let crashing = State::new(0)
        .with_work_mode(WorkMode::Async)
        .with_behavior(Behavior::new().on_do(crash));
    let other = CancellationToken::new();
    let crashed = crashing
        .start_detached(ActorConfig::default().with_link(other.clone()))
        .await
        .unwrap();
    crashed.wait().await.unwrap();
    assert!(!other.is_cancelled());

    handle.stop(StopReason::Normal, BOUND).await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn slow_entry_times_out_and_the_actor_stops() {
    let state = State::<Node>::new(0).with_behavior(Behavior::new().on_entry(slow_entry));
    let config = ActorConfig::default()
        .with_name("sluggish")
        .with_start_timeout(Duration::from_millis(20));

    let err = start(state, config).await.unwrap_err();
    assert_eq!(err, SpawnError::Timeout);
}
