use std::time::Duration;

use tokio_lifecycle::{
    Actor, ActorConfig, ActorResult, Behavior, Completion, Event, Reaction, Sign, State,
    StopReason, WorkerContext,
};

struct Counter;

#[derive(Clone, Debug, Default)]
struct Tally {
    value: i64,
}

enum Msg {
    Increment(i64),
    Get,
}

impl Actor for Counter {
    type Data = Tally;
    type Patch = i64;
    type Output = ();
    type Command = Msg;
    type Reply = i64;

    fn merge(data: &mut Tally, patch: i64) {
        data.value = patch;
    }
}

async fn seed(_state: State<Counter>, _ctx: WorkerContext<Counter>) -> ActorResult<Completion<Counter>> {
    Ok(Completion::Merge(10))
}

async fn count(event: Event<Counter>, mut state: State<Counter>) -> ActorResult<Reaction<Counter>> {
    match event {
        Event::Notification(Msg::Increment(delta)) => {
            state.data.value += delta;
            Ok(Reaction::Continue(state))
        }
        Event::Request {
            command: Msg::Increment(delta),
            ..
        } => {
            state.data.value += delta;
            Ok(Reaction::Reply(state.data.value, state))
        }
        Event::Request {
            command: Msg::Get, ..
        } => Ok(Reaction::Reply(state.data.value, state)),
        _ => Ok(Reaction::Continue(state)),
    }
}

async fn farewell(state: State<Counter>) -> ActorResult<(Sign, State<Counter>)> {
    println!("counter leaving at {}", state.data.value);
    Ok((Sign::Stopped, state))
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let behavior = Behavior::new()
        .on_do(seed)
        .on_react(count)
        .on_exit(farewell);
    let handle = State::new(Tally::default())
        .with_behavior(behavior)
        .start(ActorConfig::default().with_name("counter"))
        .await?;

    let timeout = Duration::from_secs(1);
    handle.cast(Msg::Increment(2)).await;
    let _ = handle.call(Msg::Increment(2), timeout).await?;
    let count = handle.call(Msg::Get, timeout).await?;
    println!("counter value: {count}");

    let done = handle.stop(StopReason::Normal, timeout).await?;
    println!("counter stopped: sign={:?} status={:?}", done.sign, done.state.status());
    Ok(())
}
