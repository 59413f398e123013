use std::time::Duration;

use criterion::{criterion_group, criterion_main, Criterion};
use tokio::runtime::Builder;
use tokio_lifecycle::{
    Actor, ActorConfig, ActorResult, Behavior, Event, Reaction, State, StopReason,
};

struct Counting;

impl Actor for Counting {
    type Data = u64;
    type Patch = u64;
    type Output = ();
    type Command = u64;
    type Reply = u64;

    fn merge(data: &mut u64, patch: u64) {
        *data += patch;
    }
}

async fn add(event: Event<Counting>, mut state: State<Counting>) -> ActorResult<Reaction<Counting>> {
    match event {
        Event::Request { command, .. } => {
            state.data += command;
            Ok(Reaction::Reply(state.data, state))
        }
        Event::Notification(delta) => {
            state.data += delta;
            Ok(Reaction::Continue(state))
        }
        Event::Detach => Ok(Reaction::Continue(state)),
    }
}

fn counting() -> State<Counting> {
    State::new(0).with_behavior(Behavior::new().on_react(add))
}

async fn spawn_many(total: usize) {
    let mut handles = Vec::with_capacity(total);
    for idx in 0..total {
        let handle = counting()
            .start(ActorConfig::default().with_name(format!("bench-{idx}")))
            .await
            .expect("start");
        handles.push(handle);
    }

    for handle in &handles {
        handle.cast(1).await;
    }

    for handle in handles {
        handle
            .stop(StopReason::Normal, Duration::from_secs(5))
            .await
            .expect("stop");
    }
}

async fn ping_pong(iterations: usize) {
    let actor = counting().start(()).await.expect("start");

    for _ in 0..iterations {
        actor.call(1, Duration::from_secs(1)).await.expect("call");
    }

    let _ = actor
        .stop(StopReason::Normal, Duration::from_secs(5))
        .await
        .expect("stop");
}

async fn fire_and_forget(iterations: usize) {
    let actor = counting().start(()).await.expect("start");

    for _ in 0..iterations {
        actor.cast(1).await;
    }

    let _ = actor
        .stop(StopReason::Normal, Duration::from_secs(30))
        .await
        .expect("stop");
}

fn criterion_benchmarks(c: &mut Criterion) {
    c.bench_function("start_actors_10k", |b| {
        b.iter(|| {
            let rt = Builder::new_multi_thread().enable_all().build().unwrap();
            rt.block_on(async {
                spawn_many(10_000).await;
            });
        })
    });

    c.bench_function("call_round_trip_100k", |b| {
        b.iter(|| {
            let rt = Builder::new_multi_thread().enable_all().build().unwrap();
            rt.block_on(async {
                ping_pong(100_000).await;
            });
        })
    });

    c.bench_function("cast_1m", |b| {
        b.iter(|| {
            let rt = Builder::new_multi_thread().enable_all().build().unwrap();
            rt.block_on(async {
                fire_and_forget(1_000_000).await;
            });
        })
    });
}

criterion_group!(benches, criterion_benchmarks);
criterion_main!(benches);
