//! Non-destructive process existence checks.
//!
//! A pid is probed with signal 0. Processes owned by another user still count
//! as alive (`EPERM`); zombies count as dead because they will never serve
//! again. Probing through [`LivenessProber`] reconciles the registry: a record
//! naming a dead process is cleared on the spot.

use nix::errno::Errno;
use nix::sys::signal::kill;
use nix::unistd::Pid;
use sysinfo::{ProcessStatus, System};
use tracing::{info, warn};

use crate::registry::PidRegistry;

pub(crate) const LIVENESS_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::liveness");

/// Result of probing a pid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Liveness {
    /// The process exists, possibly owned by another user.
    Alive,
    /// No such process, or only its zombie remains.
    Dead,
}

/// Probes `pid` without affecting it.
pub fn probe(pid: u32) -> Liveness {
    let Ok(raw) = i32::try_from(pid) else {
        return Liveness::Dead;
    };
    if raw == 0 {
        return Liveness::Dead;
    }
    match kill(Pid::from_raw(raw), None) {
        Ok(()) | Err(Errno::EPERM) => {
            if is_zombie(pid) {
                Liveness::Dead
            } else {
                Liveness::Alive
            }
        }
        Err(Errno::ESRCH) => Liveness::Dead,
        Err(errno) => {
            warn!(
                target: LIVENESS_TARGET,
                pid,
                %errno,
                "unexpected probe failure; assuming process is alive"
            );
            Liveness::Alive
        }
    }
}

fn is_zombie(pid: u32) -> bool {
    let mut system = System::new();
    let target = sysinfo::Pid::from_u32(pid);
    if !system.refresh_process(target) {
        return false;
    }
    system
        .process(target)
        .is_some_and(|process| process.status() == ProcessStatus::Zombie)
}

/// Liveness checks that keep the registry honest.
#[derive(Debug, Clone)]
pub struct LivenessProber {
    registry: PidRegistry,
}

impl LivenessProber {
    /// Builds a prober reconciling the given registry.
    pub fn new(registry: PidRegistry) -> Self {
        Self { registry }
    }

    /// Registry reconciled by this prober.
    pub fn registry(&self) -> &PidRegistry {
        &self.registry
    }

    /// Reports whether `pid` is alive, clearing its record when it is not.
    pub fn is_alive(&self, pid: u32) -> bool {
        match probe(pid) {
            Liveness::Alive => true,
            Liveness::Dead => {
                match self.registry.clear_if(pid) {
                    Ok(true) => info!(
                        target: LIVENESS_TARGET,
                        pid,
                        "cleared stale pid file"
                    ),
                    Ok(false) => {}
                    Err(error) => warn!(
                        target: LIVENESS_TARGET,
                        pid,
                        error = %error,
                        "failed to clear stale pid file"
                    ),
                }
                false
            }
        }
    }

    /// The pid of the live registered instance, if any.
    pub fn live_pid(&self) -> Option<u32> {
        self.registry.read().filter(|pid| self.is_alive(*pid))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::{Child, Command};
    use tempfile::TempDir;

    fn spawn_sleeper() -> Child {
        Command::new("sleep")
            .arg("30")
            .spawn()
            .expect("spawn sleep")
    }

    fn reap(mut child: Child) {
        let _ = child.kill();
        let _ = child.wait();
    }

    fn prober() -> (TempDir, LivenessProber) {
        let dir = TempDir::new().expect("temp dir");
        let registry = PidRegistry::new(dir.path().join("beacond.pid"));
        (dir, LivenessProber::new(registry))
    }

    #[test]
    fn current_process_is_alive() {
        assert_eq!(probe(std::process::id()), Liveness::Alive);
    }

    #[test]
    fn pid_zero_and_out_of_range_are_dead() {
        assert_eq!(probe(0), Liveness::Dead);
        assert_eq!(probe(u32::MAX), Liveness::Dead);
    }

    #[test]
    fn exited_child_is_dead_once_reaped() {
        let child = spawn_sleeper();
        let pid = child.id();
        reap(child);
        assert_eq!(probe(pid), Liveness::Dead);
    }

    #[test]
    fn unreaped_child_counts_as_dead() {
        let mut child = spawn_sleeper();
        let pid = child.id();
        child.kill().expect("kill sleeper");
        std::thread::sleep(std::time::Duration::from_millis(200));
        assert_eq!(probe(pid), Liveness::Dead, "zombies are not live");
        let _ = child.wait();
    }

    #[test]
    fn stale_record_is_cleared_on_probe() {
        let (_dir, prober) = prober();
        let child = spawn_sleeper();
        let pid = child.id();
        reap(child);
        prober.registry().write(pid).expect("seed record");

        assert!(!prober.is_alive(pid));
        assert_eq!(prober.registry().read(), None);
        assert!(!prober.is_alive(pid), "second probe is a no-op");
    }

    #[test]
    fn live_record_survives_probe() {
        let (_dir, prober) = prober();
        let child = spawn_sleeper();
        prober.registry().write(child.id()).expect("seed record");

        assert_eq!(prober.live_pid(), Some(child.id()));
        assert_eq!(prober.registry().read(), Some(child.id()));
        reap(child);
    }

    #[test]
    fn probing_an_unrelated_dead_pid_keeps_the_record() {
        let (_dir, prober) = prober();
        prober.registry().write(std::process::id()).expect("seed record");
        let child = spawn_sleeper();
        let dead = child.id();
        reap(child);

        assert!(!prober.is_alive(dead));
        assert_eq!(prober.registry().read(), Some(std::process::id()));
    }
}
