use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use assetdag::config::{WatchAction, WatchConfig};
use assetdag::dag::{TaskNode, TaskRegistry};
use assetdag::engine::Reaction;
use assetdag::fs::mock::MockFileSystem;
use assetdag::server::LiveReload;
use assetdag::shutdown;
use assetdag::types::{ReloadNotice, TriggerWhileRunningBehaviour};
use assetdag::watch::{FsEvent, FsEventKind, WatchReactor};
use assetdag_test_utils::builders::ConfigFileBuilder;
use assetdag_test_utils::fakes::{failing_work, recording_work, EventLog};
use assetdag_test_utils::{init_tracing, wait_until, with_timeout};

const ROOT: &str = "/site";

fn modify(rel: &str) -> FsEvent {
    FsEvent::new(FsEventKind::Modify, vec![PathBuf::from(ROOT).join(rel)])
}

fn registry(log: &EventLog, delay: Duration) -> Arc<TaskRegistry> {
    let mut reg = TaskRegistry::new();
    reg.define_task("compileStyles", recording_work(log, "compileStyles", delay))
        .unwrap();
    Arc::new(reg)
}

#[tokio::test]
async fn matching_change_runs_bound_task_and_unrelated_change_does_not() {
    init_tracing();
    let log = EventLog::new();
    let mut reactor = WatchReactor::new(registry(&log, Duration::ZERO), ROOT)
        .with_fs(Arc::new(MockFileSystem::new()));
    reactor
        .watch("scss/**/*.scss", Reaction::Task(TaskNode::leaf("compileStyles")))
        .unwrap();

    let (tx, rx) = mpsc::unbounded_channel();
    let (trigger, stop) = shutdown::channel();
    let handle = tokio::spawn(reactor.run_with_events(rx, stop));

    tx.send(modify("js/app.js")).unwrap();
    tx.send(modify("scss/partials/_nav.scss")).unwrap();
    wait_until(|| log.count("end:compileStyles") == 1).await;

    // Give a stray second run a chance to show up.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(log.count("start:compileStyles"), 1);

    trigger.trigger();
    with_timeout(handle).await.unwrap().unwrap();
}

#[tokio::test]
async fn html_change_publishes_reload_without_building() {
    init_tracing();
    let log = EventLog::new();
    let reload = LiveReload::new();
    let mut client = reload.subscribe();

    let cfg = ConfigFileBuilder::new()
        .with_watch(WatchConfig::run("scss/**/*.scss", "compileStyles"))
        .with_watch(WatchConfig::action("*.html", WatchAction::Reload))
        .build();
    let reactor = WatchReactor::from_config(&cfg, registry(&log, Duration::ZERO), ROOT, reload)
        .unwrap()
        .with_fs(Arc::new(MockFileSystem::new()));
    assert_eq!(reactor.len(), 2);

    let (tx, rx) = mpsc::unbounded_channel();
    let (trigger, stop) = shutdown::channel();
    let handle = tokio::spawn(reactor.run_with_events(rx, stop));

    tx.send(modify("about.html")).unwrap();
    let notice = with_timeout(client.recv()).await.unwrap();
    assert_eq!(notice, ReloadNotice::Reload);
    assert_eq!(log.count("start:compileStyles"), 0);

    trigger.trigger();
    with_timeout(handle).await.unwrap().unwrap();
}

async fn burst_while_running(behaviour: TriggerWhileRunningBehaviour) -> EventLog {
    let log = EventLog::new();
    let mut reactor = WatchReactor::new(registry(&log, Duration::from_millis(150)), ROOT)
        .with_policy(behaviour, 8)
        .with_fs(Arc::new(MockFileSystem::new()));
    reactor
        .watch("scss/**/*.scss", Reaction::Task(TaskNode::leaf("compileStyles")))
        .unwrap();

    let (tx, rx) = mpsc::unbounded_channel();
    let (trigger, stop) = shutdown::channel();
    let handle = tokio::spawn(reactor.run_with_events(rx, stop));

    tx.send(modify("scss/style.scss")).unwrap();
    wait_until(|| log.count("start:compileStyles") == 1).await;

    for _ in 0..3 {
        tx.send(modify("scss/style.scss")).unwrap();
    }

    let expected = match behaviour {
        TriggerWhileRunningBehaviour::Queue => 4,
        TriggerWhileRunningBehaviour::Cancel => 2,
    };
    wait_until(|| log.count("end:compileStyles") == expected).await;
    tokio::time::sleep(Duration::from_millis(200)).await;

    trigger.trigger();
    with_timeout(handle).await.unwrap().unwrap();
    log
}

#[tokio::test]
async fn queue_mode_replays_every_trigger_received_while_running() {
    init_tracing();
    let log = burst_while_running(TriggerWhileRunningBehaviour::Queue).await;
    assert_eq!(log.count("start:compileStyles"), 4);
}

#[tokio::test]
async fn cancel_mode_collapses_pending_triggers_into_one_rerun() {
    init_tracing();
    let log = burst_while_running(TriggerWhileRunningBehaviour::Cancel).await;
    assert_eq!(log.count("start:compileStyles"), 2);
}

#[tokio::test]
async fn reactions_never_overlap_for_one_binding() {
    init_tracing();
    let log = burst_while_running(TriggerWhileRunningBehaviour::Queue).await;
    let entries = log.entries();
    for pair in entries.chunks(2) {
        assert_eq!(pair, ["start:compileStyles", "end:compileStyles"]);
    }
}

#[tokio::test]
async fn failed_reaction_keeps_the_reactor_alive() {
    init_tracing();
    let log = EventLog::new();
    let mut reg = TaskRegistry::new();
    reg.define_task("lint", failing_work(&log, "lint")).unwrap();

    let mut reactor = WatchReactor::new(Arc::new(reg), ROOT).with_fs(Arc::new(MockFileSystem::new()));
    reactor
        .watch("js/**/*.js", Reaction::Task(TaskNode::leaf("lint")))
        .unwrap();

    let (tx, rx) = mpsc::unbounded_channel();
    let (trigger, stop) = shutdown::channel();
    let handle = tokio::spawn(reactor.run_with_events(rx, stop));

    tx.send(modify("js/app.js")).unwrap();
    wait_until(|| log.count("start:lint") == 1).await;
    tx.send(modify("js/app.js")).unwrap();
    wait_until(|| log.count("start:lint") == 2).await;

    trigger.trigger();
    with_timeout(handle).await.unwrap().unwrap();
}

#[tokio::test]
async fn shutdown_waits_for_in_flight_reaction() {
    init_tracing();
    let log = EventLog::new();
    let mut reactor = WatchReactor::new(registry(&log, Duration::from_millis(150)), ROOT)
        .with_fs(Arc::new(MockFileSystem::new()));
    reactor
        .watch("scss/**/*.scss", Reaction::Task(TaskNode::leaf("compileStyles")))
        .unwrap();

    let (tx, rx) = mpsc::unbounded_channel();
    let (trigger, stop) = shutdown::channel();
    let handle = tokio::spawn(reactor.run_with_events(rx, stop));

    tx.send(modify("scss/style.scss")).unwrap();
    wait_until(|| log.count("start:compileStyles") == 1).await;
    // Queued behind the running one; dropped by the shutdown.
    tx.send(modify("scss/style.scss")).unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;

    trigger.trigger();
    with_timeout(handle).await.unwrap().unwrap();

    assert_eq!(log.count("end:compileStyles"), 1);
    assert_eq!(log.count("start:compileStyles"), 1);
}

#[tokio::test]
async fn hashed_binding_ignores_saves_without_content_change() {
    init_tracing();
    let log = EventLog::new();
    let fs = Arc::new(MockFileSystem::new());
    fs.add_file("/site/scss/style.scss", "body{}");

    let mut reactor = WatchReactor::new(registry(&log, Duration::ZERO), ROOT).with_fs(fs.clone());
    reactor
        .watch_hashed("scss/**/*.scss", Reaction::Task(TaskNode::leaf("compileStyles")))
        .unwrap();

    let (tx, rx) = mpsc::unbounded_channel();
    let (trigger, stop) = shutdown::channel();
    let handle = tokio::spawn(reactor.run_with_events(rx, stop));

    tx.send(modify("scss/style.scss")).unwrap();
    wait_until(|| log.count("end:compileStyles") == 1).await;

    tx.send(modify("scss/style.scss")).unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(log.count("start:compileStyles"), 1);

    fs.add_file("/site/scss/style.scss", "body{color:red}");
    tx.send(modify("scss/style.scss")).unwrap();
    wait_until(|| log.count("end:compileStyles") == 2).await;

    trigger.trigger();
    with_timeout(handle).await.unwrap().unwrap();
}

#[test]
fn invalid_pattern_is_rejected_at_bind_time() {
    let mut reactor = WatchReactor::new(Arc::new(TaskRegistry::new()), ROOT);
    let err = reactor
        .watch("scss/[oops", Reaction::Task(TaskNode::leaf("x")))
        .unwrap_err();
    assert!(matches!(err, assetdag::errors::AssetdagError::Glob(_)));
    assert!(reactor.is_empty());
}
