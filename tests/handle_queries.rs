use std::time::Duration;

use tokio_lifecycle::{Actor, ActorConfig, ActorHandle, State, StopReason};

struct Idle;

impl Actor for Idle {
    type Data = ();
    type Patch = ();
    type Output = ();
    type Command = ();
    type Reply = ();

    fn merge(_data: &mut (), _patch: ()) {}
}

async fn spawn_idle(config: ActorConfig) -> ActorHandle<Idle> {
    State::<Idle>::new(()).start(config).await.unwrap()
}

#[tokio::test]
async fn is_alive_returns_true_when_actor_running() {
    let actor = spawn_idle(ActorConfig::default()).await;
    assert!(actor.is_alive(), "Actor should be alive after starting");
    assert!(actor.termination().is_none());
}

#[tokio::test]
async fn is_alive_returns_false_after_stop() {
    let actor = spawn_idle(ActorConfig::default()).await;
    actor
        .stop(StopReason::Normal, Duration::from_secs(1))
        .await
        .unwrap();
    assert!(!actor.is_alive(), "Actor should not be alive after stopping");
    assert!(actor.termination().is_some());
}

#[tokio::test]
async fn mailbox_queries_show_correct_capacity() {
    let actor = spawn_idle(ActorConfig::default().with_mailbox_capacity(10)).await;

    assert_eq!(actor.mailbox_capacity(), 10);
    assert_eq!(actor.mailbox_available(), 10);
    assert_eq!(actor.mailbox_len(), 0);
}

#[tokio::test]
async fn mailbox_len_and_available_sum_to_capacity() {
    let actor = spawn_idle(ActorConfig::default().with_mailbox_capacity(10)).await;

    for _ in 0..5 {
        actor.try_cast(()).unwrap();
    }

    let len = actor.mailbox_len();
    let available = actor.mailbox_available();
    assert!(len <= 5, "Mailbox should have at most 5 messages");
    assert_eq!(len + available, 10, "Len + available should equal capacity");
}

#[tokio::test]
async fn handle_equality_based_on_actor_id() {
    let actor1 = spawn_idle(ActorConfig::default().with_name("actor1")).await;
    let actor2 = spawn_idle(ActorConfig::default().with_name("actor2")).await;
    let actor1_clone = actor1.clone();

    assert_eq!(actor1, actor1_clone, "Handle should equal its clone");
    assert_ne!(actor1, actor2, "Different actors should not be equal");
    assert_eq!(actor1.id().as_str(), "actor1");
}

#[tokio::test]
async fn generated_ids_are_unique() {
    let first = spawn_idle(ActorConfig::default()).await;
    let second = spawn_idle(ActorConfig::default()).await;

    assert_ne!(first.id(), second.id());
    assert!(first.id().as_str().starts_with("actor-"));
}

#[tokio::test]
async fn handle_can_be_used_in_hashset() {
    use std::collections::HashSet;

    let actor1 = spawn_idle(ActorConfig::default().with_name("actor1")).await;
    let actor2 = spawn_idle(ActorConfig::default().with_name("actor2")).await;
    let actor1_clone = actor1.clone();

    let mut set = HashSet::new();
    set.insert(actor1.clone());
    set.insert(actor2.clone());
    set.insert(actor1_clone);

    assert_eq!(set.len(), 2, "HashSet should deduplicate by actor ID");
    assert!(set.contains(&actor1));
    assert!(set.contains(&actor2));
}
