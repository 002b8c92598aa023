use std::ffi::OsStr;
use std::io;
use std::process::{Child, Command, ExitStatus};
use std::thread;
use std::time::{Duration, Instant};

const POLL_MIN: Duration = Duration::from_millis(10);
const POLL_MAX: Duration = Duration::from_millis(250);

/// Command whose process leads its own process group, so a timeout can
/// take down launcher scripts together with everything they started.
pub fn scoped_command<S: AsRef<OsStr>>(program: S) -> Command {
    let mut cmd = Command::new(program);
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        cmd.process_group(0);
    }
    cmd
}

/// Kills the child's process group (unix) and the child itself.
fn kill_scoped(child: &mut Child) {
    #[cfg(unix)]
    {
        if let Ok(pgid) = libc::pid_t::try_from(child.id()) {
            // ESRCH when the group is already gone
            unsafe {
                libc::kill(-pgid, libc::SIGKILL);
            }
        }
    }
    // Fails if the child exited in the meantime; reaping still applies.
    let _ = child.kill();
}

/// Waits for `child` to exit for at most `limit`.
///
/// Returns `Ok(None)` when the limit elapsed; the child and its process
/// group have then been killed and the child reaped.
pub fn wait_with_timeout(child: &mut Child, limit: Duration) -> io::Result<Option<ExitStatus>> {
    let deadline = Instant::now() + limit;
    let mut interval = POLL_MIN;

    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }

        let now = Instant::now();
        if now >= deadline {
            kill_scoped(child);
            child.wait()?;
            return Ok(None);
        }

        thread::sleep(interval.min(deadline - now));
        interval = (interval * 2).min(POLL_MAX);
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::process::Stdio;

    fn sh(script: &str) -> Child {
        scoped_command("sh")
            .arg("-c")
            .arg(script)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .expect("sh should be available")
    }

    #[test]
    fn test_fast_child_reports_status() {
        let mut child = sh("exit 3");
        let status = wait_with_timeout(&mut child, Duration::from_secs(10))
            .unwrap()
            .expect("child should finish");
        assert_eq!(status.code(), Some(3));
    }

    #[test]
    fn test_slow_child_is_killed() {
        let mut child = sh("sleep 30");
        let started = Instant::now();
        let status = wait_with_timeout(&mut child, Duration::from_millis(200)).unwrap();
        assert!(status.is_none());
        assert!(started.elapsed() < Duration::from_secs(10));
        assert!(child.try_wait().unwrap().is_some(), "child must be reaped");
    }

    #[test]
    fn test_timeout_kills_grandchildren() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("marker");
        // the inner shell is a separate process, not an exec of the outer one
        let mut child = sh(&format!("sh -c 'sleep 2; touch {}'; true", marker.display()));

        let status = wait_with_timeout(&mut child, Duration::from_millis(300)).unwrap();
        assert!(status.is_none());

        thread::sleep(Duration::from_secs(4));
        assert!(!marker.exists(), "grandchild outlived the timeout");
    }
}
