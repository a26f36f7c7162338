//! Behavioural tests covering the daemon's claim on the instance record.

use std::cell::RefCell;
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use beacon_config::{Config, RuntimePaths};
use beacon_supervisor::{DaemonizeError, Daemonizer, LaunchMode, SupervisorError};
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use tempfile::TempDir;

use crate::bootstrap::StaticConfigLoader;
use crate::process::{LaunchError, LaunchPlan, run_daemon_with};
use crate::shutdown::{ShutdownError, ShutdownSignal};

const WAIT_TIMEOUT: Duration = Duration::from_secs(2);
const POLL_INTERVAL: Duration = Duration::from_millis(25);

type StepResult = Result<(), String>;

#[fixture]
fn world() -> RefCell<ProcessTestWorld> {
    RefCell::new(ProcessTestWorld::new())
}

#[given("a fresh daemon process world")]
fn given_world(world: &RefCell<ProcessTestWorld>) {
    let _ = world;
}

#[given("a stale pid file exists")]
fn given_stale_pid_file(world: &RefCell<ProcessTestWorld>) -> StepResult {
    world.borrow().write_stale_pid()
}

#[when("the daemon starts in background mode")]
fn when_daemon_starts_background(world: &RefCell<ProcessTestWorld>) -> StepResult {
    world.borrow_mut().start_background()?;
    world.borrow().wait_for_registration()
}

#[when("the daemon starts in foreground mode")]
fn when_daemon_starts_foreground(world: &RefCell<ProcessTestWorld>) -> StepResult {
    world.borrow_mut().run_foreground()
}

#[when("shutdown is triggered")]
fn when_shutdown_triggered(world: &RefCell<ProcessTestWorld>) {
    world.borrow().shutdown.trigger();
}

#[when("the daemon run completes")]
fn when_daemon_completes(world: &RefCell<ProcessTestWorld>) -> StepResult {
    world.borrow_mut().join_background()
}

#[then("daemonisation was requested")]
fn then_daemonisation_requested(world: &RefCell<ProcessTestWorld>) {
    assert_eq!(world.borrow().daemonizer.calls(), 1);
}

#[then("daemonisation was not requested")]
fn then_daemonisation_not_requested(world: &RefCell<ProcessTestWorld>) {
    assert_eq!(world.borrow().daemonizer.calls(), 0);
}

#[then("the daemon wrote the pid file")]
fn then_pid_file_exists(world: &RefCell<ProcessTestWorld>) {
    let content =
        fs::read_to_string(world.borrow().pid_path()).expect("pid file should be readable");
    let pid: u32 = content
        .trim()
        .parse()
        .expect("pid file should contain an integer");
    assert_eq!(pid, std::process::id(), "pid file should record this process");
}

#[then("the daemon created the log file")]
fn then_log_file_exists(world: &RefCell<ProcessTestWorld>) {
    assert!(world.borrow().paths.log_path().is_file());
}

#[then("the pid file is removed")]
fn then_pid_file_removed(world: &RefCell<ProcessTestWorld>) {
    assert!(
        !world.borrow().pid_path().exists(),
        "pid file should be removed after shutdown"
    );
}

#[then("starting the daemon again fails with already running")]
fn then_duplicate_start_fails(world: &RefCell<ProcessTestWorld>) {
    let world = world.borrow();
    let result = run_daemon_with(LaunchPlan {
        mode: LaunchMode::Foreground,
        loader: world.loader.clone(),
        daemonizer: world.daemonizer.clone(),
        shutdown: TestShutdownSignal::triggered(),
    });
    match result {
        Err(LaunchError::Supervisor(SupervisorError::AlreadyRunning { pid })) => {
            assert_eq!(pid, std::process::id(), "pid should match the running daemon");
        }
        other => panic!("expected an already-running refusal, got {other:?}"),
    }
}

#[then("the daemon run succeeds")]
fn then_daemon_succeeds(world: &RefCell<ProcessTestWorld>) {
    let world = world.borrow();
    let result = world
        .result
        .as_ref()
        .expect("expected a recorded daemon result");
    assert!(result.is_ok(), "daemon run should succeed: {result:?}");
}

struct ProcessTestWorld {
    _dir: TempDir,
    paths: RuntimePaths,
    loader: StaticConfigLoader,
    daemonizer: TestDaemonizer,
    shutdown: TestShutdownSignal,
    handle: Option<thread::JoinHandle<Result<(), LaunchError>>>,
    result: Option<Result<(), LaunchError>>,
}

impl ProcessTestWorld {
    fn new() -> Self {
        let dir = TempDir::new().expect("temp dir");
        let config = Config {
            base_dir: dir.path().join("var"),
            ..Config::default()
        };
        Self {
            paths: config.runtime_paths(),
            loader: StaticConfigLoader::new(config),
            _dir: dir,
            daemonizer: TestDaemonizer::default(),
            shutdown: TestShutdownSignal::new(),
            handle: None,
            result: None,
        }
    }

    fn pid_path(&self) -> PathBuf {
        self.paths.pid_path().to_path_buf()
    }

    fn start_background(&mut self) -> StepResult {
        if self.handle.is_some() {
            return Err("daemon already running".to_string());
        }
        let plan = LaunchPlan {
            mode: LaunchMode::Background,
            loader: self.loader.clone(),
            daemonizer: self.daemonizer.clone(),
            shutdown: self.shutdown.clone(),
        };
        self.handle = Some(thread::spawn(move || run_daemon_with(plan)));
        Ok(())
    }

    fn wait_for_registration(&self) -> StepResult {
        let expected = std::process::id().to_string();
        let deadline = Instant::now() + WAIT_TIMEOUT;
        while Instant::now() < deadline {
            let recorded = fs::read_to_string(self.pid_path()).unwrap_or_default();
            if recorded.trim() == expected {
                return Ok(());
            }
            thread::sleep(POLL_INTERVAL);
        }
        Err("daemon did not register its pid".to_string())
    }

    fn run_foreground(&mut self) -> StepResult {
        if self.result.is_some() {
            return Err("result already recorded".to_string());
        }
        self.result = Some(run_daemon_with(LaunchPlan {
            mode: LaunchMode::Foreground,
            loader: self.loader.clone(),
            daemonizer: self.daemonizer.clone(),
            shutdown: TestShutdownSignal::triggered(),
        }));
        Ok(())
    }

    fn join_background(&mut self) -> StepResult {
        let handle = self
            .handle
            .take()
            .ok_or_else(|| "daemon not running".to_string())?;
        match handle.join() {
            Ok(result) => {
                self.result = Some(result);
                Ok(())
            }
            Err(_) => Err("daemon thread panicked".to_string()),
        }
    }

    fn write_stale_pid(&self) -> StepResult {
        let mut exited = Command::new("true")
            .spawn()
            .map_err(|error| error.to_string())?;
        let pid = exited.id();
        exited.wait().map_err(|error| error.to_string())?;
        self.paths.prepare().map_err(|error| error.to_string())?;
        fs::write(self.pid_path(), format!("{pid}\n")).map_err(|error| error.to_string())
    }
}

#[derive(Clone, Default)]
struct TestDaemonizer {
    calls: Arc<AtomicUsize>,
}

impl TestDaemonizer {
    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Daemonizer for TestDaemonizer {
    fn daemonize(&self, _paths: &RuntimePaths) -> Result<(), DaemonizeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Clone)]
struct TestShutdownSignal {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl TestShutdownSignal {
    fn new() -> Self {
        Self {
            inner: Arc::new((Mutex::new(false), Condvar::new())),
        }
    }

    fn triggered() -> Self {
        let signal = Self::new();
        signal.trigger();
        signal
    }

    fn trigger(&self) {
        let (lock, cvar) = &*self.inner;
        let mut triggered = lock.lock().expect("shutdown mutex poisoned");
        *triggered = true;
        cvar.notify_all();
    }
}

impl ShutdownSignal for TestShutdownSignal {
    fn wait(&self) -> Result<(), ShutdownError> {
        let (lock, cvar) = &*self.inner;
        let mut triggered = lock.lock().expect("shutdown mutex poisoned");
        while !*triggered {
            triggered = cvar
                .wait(triggered)
                .expect("shutdown mutex poisoned during wait");
        }
        Ok(())
    }
}

#[scenario(
    path = "tests/features/daemon_process.feature",
    name = "Background daemon registers itself and releases on shutdown"
)]
fn background_daemon_lifecycle(#[from(world)] _: RefCell<ProcessTestWorld>) -> Result<(), String> {
    Ok(())
}

#[scenario(
    path = "tests/features/daemon_process.feature",
    name = "Second daemon refuses to start while the first is alive"
)]
fn duplicate_daemon_refused(#[from(world)] _: RefCell<ProcessTestWorld>) -> Result<(), String> {
    Ok(())
}

#[scenario(
    path = "tests/features/daemon_process.feature",
    name = "Stale pid file does not block a foreground daemon"
)]
fn stale_pid_file_replaced(#[from(world)] _: RefCell<ProcessTestWorld>) -> Result<(), String> {
    Ok(())
}
