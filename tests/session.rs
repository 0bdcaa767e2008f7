use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use assetdag::config::ConfigFile;
use assetdag::errors::AssetdagError;
use assetdag::fs::mock::MockFileSystem;
use assetdag::fs::RealFileSystem;
use assetdag::render_task_list;
use assetdag::session::Session;
use assetdag::shutdown;
use assetdag_test_utils::builders::ConfigFileBuilder;
use assetdag_test_utils::{init_tracing, with_timeout};

const ROOT: &str = "/site";

/// Pass-through tools and no vendor sheets, so nothing external runs.
fn offline_config() -> ConfigFileBuilder {
    ConfigFileBuilder::new()
        .with_tools("", "", "", "")
        .with_vendor_styles(&[])
        .with_server("127.0.0.1", 0, ".")
}

fn sample_site() -> Arc<MockFileSystem> {
    let fs = Arc::new(MockFileSystem::new());
    fs.add_file("/site/index.html", "<html><body></body></html>");
    fs.add_file("/site/scss/style.scss", "body{}");
    fs.add_file("/site/scss/_vars.scss", "$c: red;");
    fs.add_file("/site/js/app.js", "app();");
    fs.add_file("/site/js/util.js", "util();");
    fs
}

#[tokio::test]
async fn build_group_produces_every_output() {
    init_tracing();
    let fs = sample_site();
    let (_trigger, stop) = shutdown::channel();
    let session = Session::new(&offline_config().build(), ROOT, fs.clone(), stop).unwrap();

    with_timeout(session.run("build")).await.unwrap();

    assert_eq!(fs.contents("/site/css/style.css").as_deref(), Some("body{}"));
    assert_eq!(fs.contents("/site/css/style.min.css").as_deref(), Some("body{}"));
    assert_eq!(fs.contents("/site/js/app.min.js").as_deref(), Some("app();"));
    assert!(fs.contents("/site/css/_vars.css").is_none());
}

#[tokio::test]
async fn unknown_task_fails_before_anything_runs() {
    init_tracing();
    let fs = sample_site();
    let (_trigger, stop) = shutdown::channel();
    let session = Session::new(&offline_config().build(), ROOT, fs.clone(), stop).unwrap();

    let err = session.run("deploy").await.unwrap_err();
    assert!(matches!(err, AssetdagError::TaskNotFound(ref name) if name == "deploy"));
    assert!(fs.contents("/site/css/style.css").is_none());
}

#[tokio::test]
async fn taken_port_fails_the_watch_session_up_front() {
    init_tracing();
    let taken = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = taken.local_addr().unwrap().port();

    let cfg = offline_config().with_server("127.0.0.1", port, ".").build();
    let (_trigger, stop) = shutdown::channel();
    let session = Session::new(&cfg, ROOT, sample_site(), stop).unwrap();

    let err = with_timeout(session.run("watch")).await.unwrap_err();
    assert!(matches!(err, AssetdagError::PortInUse(p) if p == port));

    // Tasks that never reach the server are unaffected.
    assert!(session.prepare("build").await.is_ok());
}

#[tokio::test]
async fn watch_session_stops_on_shutdown() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("index.html"), "<html></html>").unwrap();

    let (trigger, stop) = shutdown::channel();
    let session = Session::new(
        &offline_config().build(),
        dir.path(),
        Arc::new(RealFileSystem),
        stop,
    )
    .unwrap();

    let running = tokio::spawn(async move { session.run("watch").await });
    tokio::time::sleep(Duration::from_millis(100)).await;
    trigger.trigger();

    with_timeout(running).await.unwrap().unwrap();
}

#[tokio::test]
async fn interrupted_watch_session_winds_down_cleanly() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let (trigger, stop) = shutdown::channel();
    let session = Session::new(
        &offline_config().build(),
        dir.path(),
        Arc::new(RealFileSystem),
        stop,
    )
    .unwrap();

    let interrupt = tokio::time::sleep(Duration::from_millis(100));
    with_timeout(session.run_until("watch", trigger, interrupt))
        .await
        .unwrap();
}

#[cfg(unix)]
#[tokio::test]
async fn interrupted_build_stops_running_tools_and_fails() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir(dir.path().join("img")).unwrap();
    for i in 0..6 {
        std::fs::write(dir.path().join(format!("img/{i}.png")), "original png").unwrap();
    }

    let mut raw = offline_config().raw();
    raw.images.optimizers = BTreeMap::from([("png".to_string(), "sleep 30; cat".to_string())]);
    let cfg = ConfigFile::try_from(raw).unwrap();
    let (trigger, stop) = shutdown::channel();
    let session = Session::new(&cfg, dir.path(), Arc::new(RealFileSystem), stop).unwrap();

    let started = Instant::now();
    let interrupt = tokio::time::sleep(Duration::from_millis(300));
    let err = with_timeout(session.run_until("minImages", trigger, interrupt))
        .await
        .unwrap_err();

    assert!(matches!(err, AssetdagError::Interrupted(ref task) if task == "minImages"));
    assert!(started.elapsed() < Duration::from_secs(5));
    let untouched = std::fs::read_to_string(dir.path().join("img/0.png")).unwrap();
    assert_eq!(untouched, "original png");
}

#[tokio::test]
async fn finished_build_ignores_a_later_interrupt() {
    init_tracing();
    let fs = sample_site();
    let (trigger, stop) = shutdown::channel();
    let session = Session::new(&offline_config().build(), ROOT, fs.clone(), stop).unwrap();

    with_timeout(session.run_until("style", trigger, std::future::pending()))
        .await
        .unwrap();
    assert_eq!(fs.contents("/site/css/style.min.css").as_deref(), Some("body{}"));
}

#[test]
fn task_list_shows_tasks_groups_and_bindings() {
    let (_trigger, stop) = shutdown::channel();
    let session = Session::new(&ConfigFile::default(), ROOT, sample_site(), stop).unwrap();
    let listing = render_task_list(&session);

    assert!(listing.contains("  - compileStyles\n"));
    assert!(listing.contains("  - devServer\n"));
    assert!(listing.contains("  - build: parallel(style, js, minImages)\n"));
    assert!(listing.contains("  - watch (default): parallel(watchFiles, devServer)\n"));
    assert!(listing.contains("  - scss/**/*.scss -> run compileStyles\n"));
    assert!(listing.contains("  - *.html -> reload\n"));
}
