//! Runtime tests driving the CLI with substituted configuration.

use std::ffi::OsString;
use std::fs;
use std::process::{Command, ExitCode};

use beacon_config::{Config, RuntimePaths};
use rstest::{fixture, rstest};
use tempfile::TempDir;

use super::*;

struct StaticConfigLoader {
    config: Config,
}

impl ConfigLoader for StaticConfigLoader {
    fn load(&self, _args: &[OsString]) -> Result<Config, AppError> {
        Ok(self.config.clone())
    }
}

struct Workspace {
    _dir: TempDir,
    loader: StaticConfigLoader,
    paths: RuntimePaths,
}

#[fixture]
fn workspace() -> Workspace {
    let dir = TempDir::new().expect("temp dir");
    let config = Config {
        base_dir: dir.path().join("var"),
        daemon_binary: Some(dir.path().join("missing-beacond")),
        startup_timeout_seconds: 1,
        ..Config::default()
    };
    Workspace {
        paths: config.runtime_paths(),
        loader: StaticConfigLoader { config },
        _dir: dir,
    }
}

fn invoke(workspace: &Workspace, args: &[&str]) -> (ExitCode, String, String) {
    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    let exit = run_with_loader(
        args.iter().map(OsString::from),
        &mut stdout,
        &mut stderr,
        &workspace.loader,
    );
    (
        exit,
        String::from_utf8(stdout).expect("utf8 stdout"),
        String::from_utf8(stderr).expect("utf8 stderr"),
    )
}

#[rstest]
fn status_without_daemon_exits_two(workspace: Workspace) {
    let (exit, stdout, _) = invoke(&workspace, &["beacon", "status"]);
    assert_eq!(exit, ExitCode::from(2));
    assert_eq!(stdout, "beacond is not running\n");
}

#[rstest]
fn stop_without_daemon_succeeds(workspace: Workspace) {
    let (exit, stdout, _) = invoke(&workspace, &["beacon", "stop"]);
    assert_eq!(exit, ExitCode::SUCCESS);
    assert_eq!(stdout, "beacond is not running\n");
}

#[rstest]
fn status_reports_registered_process(workspace: Workspace) {
    workspace.paths.prepare().expect("prepare");
    let mut sleeper = Command::new("sleep").arg("30").spawn().expect("spawn");
    fs::write(workspace.paths.pid_path(), format!("{}\n", sleeper.id())).expect("seed record");

    let (exit, stdout, _) = invoke(&workspace, &["beacon", "status"]);
    assert_eq!(exit, ExitCode::SUCCESS);
    assert_eq!(stdout, format!("beacond is running in pid {}\n", sleeper.id()));

    let _ = sleeper.kill();
    let _ = sleeper.wait();
}

#[rstest]
fn start_with_missing_binary_reports_launch_failure(workspace: Workspace) {
    let (exit, stdout, stderr) = invoke(&workspace, &["beacon", "start"]);
    assert_eq!(exit, ExitCode::FAILURE);
    assert!(stdout.starts_with("starting beacond; logging to "));
    assert!(stderr.contains("failed to spawn daemon binary"), "stderr: {stderr}");
}

#[rstest]
fn unknown_command_is_a_usage_error(workspace: Workspace) {
    let (exit, _, stderr) = invoke(&workspace, &["beacon", "launch"]);
    assert_eq!(exit, ExitCode::FAILURE);
    assert!(stderr.contains("launch"), "stderr: {stderr}");
}

#[rstest]
fn help_goes_to_stdout(workspace: Workspace) {
    let (exit, stdout, _) = invoke(&workspace, &["beacon", "--help"]);
    assert_eq!(exit, ExitCode::SUCCESS);
    assert!(stdout.contains("status"));
}

#[test]
fn configuration_errors_are_reported() {
    struct FailingLoader;

    impl ConfigLoader for FailingLoader {
        fn load(&self, _args: &[OsString]) -> Result<Config, AppError> {
            Err(AppError::StopTimedOut { pid: 1 })
        }
    }

    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    let exit = run_with_loader(
        ["beacon", "status"].map(OsString::from),
        &mut stdout,
        &mut stderr,
        &FailingLoader,
    );
    assert_eq!(exit, ExitCode::FAILURE);
    assert!(stdout.is_empty());
    assert!(!stderr.is_empty());
}
