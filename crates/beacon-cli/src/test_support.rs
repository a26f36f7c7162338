//! Test doubles shared by the CLI and HTTP test suites.

use std::sync::Mutex;
use std::time::Duration;

use beacon_supervisor::{DaemonControl, Outcome, SupervisorError};

/// Pid handed out by [`FakeControl::start`].
pub(crate) const FAKE_PID: u32 = 4242;

/// In-memory daemon whose stop can be made to stall or whose start can fail.
pub(crate) struct FakeControl {
    running: Mutex<Option<u32>>,
    stubborn: bool,
    failing_start: bool,
}

impl FakeControl {
    pub(crate) fn new(running: Option<u32>, stubborn: bool) -> Self {
        Self {
            running: Mutex::new(running),
            stubborn,
            failing_start: false,
        }
    }

    pub(crate) fn failing_start() -> Self {
        Self {
            failing_start: true,
            ..Self::new(None, false)
        }
    }

    pub(crate) fn running(&self) -> Option<u32> {
        *self.running.lock().expect("state lock")
    }
}

impl DaemonControl for FakeControl {
    fn start(&self) -> Result<Outcome, SupervisorError> {
        let mut running = self.running.lock().expect("state lock");
        if let Some(pid) = *running {
            return Ok(Outcome::AlreadyRunning { pid });
        }
        if self.failing_start {
            return Err(SupervisorError::StartupFailed {
                exit_status: Some(1),
                log_path: "/var/beacon/log/beacond.log".into(),
            });
        }
        *running = Some(FAKE_PID);
        Ok(Outcome::Started { pid: FAKE_PID })
    }

    fn stop(&self) -> Result<Outcome, SupervisorError> {
        let mut running = self.running.lock().expect("state lock");
        match *running {
            None => Ok(Outcome::NotRunning),
            Some(pid) if self.stubborn => Ok(Outcome::TimedOut { pid }),
            Some(pid) => {
                *running = None;
                Ok(Outcome::Stopped { pid })
            }
        }
    }

    fn restart(&self) -> Result<Outcome, SupervisorError> {
        match self.stop()? {
            timed_out @ Outcome::TimedOut { .. } => Ok(timed_out),
            _ => self.start(),
        }
    }

    fn status(&self) -> Outcome {
        self.running()
            .map_or(Outcome::NotRunning, |pid| Outcome::AlreadyRunning { pid })
    }

    fn pid(&self) -> Option<u32> {
        self.running()
    }

    fn uptime(&self) -> Duration {
        if self.running().is_some() {
            Duration::from_millis(1500)
        } else {
            Duration::ZERO
        }
    }
}
