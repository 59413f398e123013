use std::time::Duration;

use tokio::time::{sleep, Instant};
use tokio_lifecycle::{
    Actor, ActorError, ActorResult, Behavior, Completion, Event, Output, Reaction, Sign, State,
    Status, StopReason, WorkMode, WorkerContext, WorkerMessage,
};

const BOUND: Duration = Duration::from_secs(2);

struct Job;

#[derive(Clone, Debug, Default, PartialEq)]
struct Progress {
    steps: u32,
}

enum JobMsg {
    Steps,
    HasWorker,
    Echo(u32),
}

impl Actor for Job {
    type Data = Progress;
    type Patch = Progress;
    type Output = u32;
    type Command = JobMsg;
    type Reply = u32;

    fn merge(data: &mut Progress, patch: Progress) {
        *data = patch;
    }
}

type Done = ActorResult<Completion<Job>>;

async fn report(event: Event<Job>, state: State<Job>) -> ActorResult<Reaction<Job>> {
    match event {
        Event::Request {
            command: JobMsg::Steps,
            ..
        } => Ok(Reaction::Reply(state.data.steps, state)),
        Event::Request {
            command: JobMsg::HasWorker,
            ..
        } => {
            let alive = u32::from(state.worker().is_some());
            Ok(Reaction::Reply(alive, state))
        }
        _ => Ok(Reaction::Continue(state)),
    }
}

fn job(work_mode: WorkMode, behavior: Behavior<Job>) -> State<Job> {
    State::new(Progress::default())
        .with_work_mode(work_mode)
        .with_behavior(behavior)
}

async fn slow_merge(_state: State<Job>, _ctx: WorkerContext<Job>) -> Done {
    sleep(Duration::from_millis(100)).await;
    Ok(Completion::Merge(Progress { steps: 41 }))
}

async fn until_stopped(_state: State<Job>, ctx: WorkerContext<Job>) -> Done {
    ctx.stopped().await;
    Ok(Completion::Output(7))
}

async fn quick_merge(_state: State<Job>, _ctx: WorkerContext<Job>) -> Done {
    Ok(Completion::Merge(Progress { steps: 3 }))
}

async fn fail(_state: State<Job>, _ctx: WorkerContext<Job>) -> Done {
    Err(ActorError::user("disk on fire"))
}

async fn finish(_state: State<Job>, _ctx: WorkerContext<Job>) -> Done {
    Ok(Completion::Stop(StopReason::Done))
}

async fn finish_with_patch(_state: State<Job>, _ctx: WorkerContext<Job>) -> Done {
    Ok(Completion::StopWith {
        patch: Progress { steps: 9 },
        reason: None,
    })
}

async fn explode(_state: State<Job>, _ctx: WorkerContext<Job>) -> Done {
    panic!("worker exploded")
}

async fn stubborn(_state: State<Job>, _ctx: WorkerContext<Job>) -> Done {
    sleep(Duration::from_secs(3600)).await;
    Ok(Completion::Continue)
}

async fn serve_forwarded(_state: State<Job>, mut ctx: WorkerContext<Job>) -> Done {
    let mut served = 0;
    while let Some(msg) = ctx.recv().await {
        match msg {
            WorkerMessage::Request {
                command: JobMsg::Echo(n),
                from,
            } => {
                served += 1;
                from.reply(n * 2);
            }
            WorkerMessage::Stop(_) => return Ok(Completion::Output(served)),
            _ => {}
        }
    }
    Ok(Completion::Continue)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn sync_do_blocks_the_mailbox_until_it_returns() {
    let started = Instant::now();
    let behavior = Behavior::new().on_do(slow_merge).on_react(report);
    let handle = job(WorkMode::Sync, behavior).start(()).await.unwrap();

    // Queued behind the running do hook, so it observes the merged result.
    let steps = handle.call(JobMsg::Steps, BOUND).await.unwrap();
    assert_eq!(steps, 41);
    assert!(started.elapsed() >= Duration::from_millis(50));

    handle.stop(StopReason::Normal, BOUND).await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn async_do_leaves_the_mailbox_responsive() {
    let behavior = Behavior::new().on_do(until_stopped).on_react(report);
    let handle = job(WorkMode::Async, behavior).start(()).await.unwrap();

    let has_worker = handle
        .call(JobMsg::HasWorker, Duration::from_millis(500))
        .await
        .unwrap();
    assert_eq!(has_worker, 1);

    let done = handle.stop(StopReason::Normal, BOUND).await.unwrap();
    assert_eq!(done.state.output(), Some(&Output::Value(7)));
    assert_eq!(done.state.status(), Status::Stopped);
    assert!(done.state.worker().is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn finished_worker_merges_and_actor_keeps_running() {
    let behavior = Behavior::new().on_do(quick_merge).on_react(report);
    let handle = job(WorkMode::Async, behavior).start(()).await.unwrap();

    let mut steps = 0;
    for _ in 0..50 {
        steps = handle.call(JobMsg::Steps, BOUND).await.unwrap();
        if steps == 3 {
            break;
        }
        sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(steps, 3);
    assert_eq!(handle.call(JobMsg::HasWorker, BOUND).await.unwrap(), 0);
    assert!(handle.is_alive());

    handle.stop(StopReason::Normal, BOUND).await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn worker_error_is_classified_as_exception() {
    let handle = job(WorkMode::Async, Behavior::new().on_do(fail))
        .start(())
        .await
        .unwrap();

    let done = handle.wait().await.unwrap();
    assert_eq!(done.state.status(), Status::Exception);
    assert_eq!(
        done.state.reason(),
        Some(&StopReason::Failure(ActorError::user("disk on fire")))
    );
    assert_eq!(done.sign, Sign::Exception);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn worker_panic_is_classified_as_exception() {
    let handle = job(WorkMode::Async, Behavior::new().on_do(explode))
        .start(())
        .await
        .unwrap();

    let done = handle.wait().await.unwrap();
    assert_eq!(done.state.status(), Status::Exception);
    assert_eq!(
        done.state.reason(),
        Some(&StopReason::Failure(ActorError::Panic(
            "worker exploded".to_string()
        )))
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn worker_stop_done_terminates_normally() {
    let handle = job(WorkMode::Async, Behavior::new().on_do(finish))
        .start(())
        .await
        .unwrap();

    let done = handle.wait().await.unwrap();
    assert_eq!(done.state.status(), Status::Stopped);
    assert_eq!(done.state.reason(), Some(&StopReason::Done));
    assert_eq!(done.sign, Sign::Stopped);

    let again = handle.stop(StopReason::Normal, BOUND).await.unwrap();
    assert!(std::sync::Arc::ptr_eq(&done, &again));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn stop_with_patch_merges_and_defaults_to_done() {
    let handle = job(WorkMode::Sync, Behavior::new().on_do(finish_with_patch))
        .start(())
        .await
        .unwrap();

    let done = handle.wait().await.unwrap();
    assert_eq!(done.state.data, Progress { steps: 9 });
    assert_eq!(done.state.reason(), Some(&StopReason::Done));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn sync_do_failure_stops_after_start() {
    let handle = job(WorkMode::Sync, Behavior::new().on_do(fail))
        .start(())
        .await
        .unwrap();

    let done = handle.wait().await.unwrap();
    assert_eq!(done.state.status(), Status::Exception);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn unresponsive_worker_is_killed_after_timeout() {
    let state = job(WorkMode::Async, Behavior::new().on_do(stubborn))
        .with_timeout(Duration::from_millis(50));
    let handle = state.start(()).await.unwrap();

    let started = Instant::now();
    let done = handle.stop(StopReason::Normal, BOUND).await.unwrap();

    assert!(started.elapsed() < BOUND);
    assert_eq!(done.state.output(), Some(&Output::Abort));
    assert_eq!(done.state.status(), Status::Stopped);
    assert_eq!(done.state.reason(), Some(&StopReason::Normal));
    println!("worker killed after {:?}", started.elapsed());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn unhandled_requests_are_forwarded_to_the_worker() {
    let handle = job(WorkMode::Async, Behavior::new().on_do(serve_forwarded))
        .start(())
        .await
        .unwrap();

    let echoed = handle.call(JobMsg::Echo(21), BOUND).await.unwrap();
    assert_eq!(echoed, 42);

    let done = handle.stop(StopReason::Normal, BOUND).await.unwrap();
    assert_eq!(done.state.output(), Some(&Output::Value(1)));
}
