//! Cancellation supervisor: owns the cancel token and every in-flight
//! verifier process
//!
//! Registration, polling and termination all go through one lock. A
//! process registered after cancellation is killed on registration, so no
//! child can slip between "spawned" and "seen by the cancel scan".

use std::collections::HashMap;
use std::io::{self, Read};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use archeck_core::CancelToken;

/// How often a waiting task polls its child for exit.
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Exit status and output (stdout, then stderr) of one tracked process.
#[derive(Debug)]
pub struct ProcessOutput {
    pub status: ExitStatus,
    pub output: String,
}

#[derive(Debug, Default)]
pub struct Supervisor {
    token: CancelToken,
    inflight: Mutex<HashMap<u64, Child>>,
    next_id: AtomicU64,
}

impl Supervisor {
    pub fn new(token: CancelToken) -> Self {
        Self {
            token,
            inflight: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(0),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Set the cancel flag and kill every registered process.
    ///
    /// Returns `true` if cancellation had already been requested.
    pub fn cancel(&self) -> bool {
        let already = self.token.cancel();
        let mut inflight = self.inflight.lock().expect("supervisor lock poisoned");
        if !inflight.is_empty() {
            log::warn!("Terminating {} running verifier process(es)", inflight.len());
        }
        for child in inflight.values_mut() {
            kill_quietly(child);
        }
        already
    }

    /// Number of processes currently registered.
    pub fn in_flight(&self) -> usize {
        self.inflight.lock().expect("supervisor lock poisoned").len()
    }

    /// Run `cmd` to completion as a tracked process.
    ///
    /// stdin is closed; stdout and stderr are captured separately and
    /// concatenated, stdout first.
    /// If the supervisor is cancelled meanwhile the process is killed and
    /// its (non-success) status is returned as usual.
    pub fn run(&self, cmd: &mut Command) -> io::Result<ProcessOutput> {
        let mut child = cmd
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let registration = self.register(child);

        std::thread::scope(|s| {
            let out = s.spawn(move || read_lossy(stdout));
            let err = s.spawn(move || read_lossy(stderr));

            let status = loop {
                match registration.try_wait() {
                    Ok(Some(status)) => break status,
                    Ok(None) => std::thread::sleep(POLL_INTERVAL),
                    Err(e) => {
                        // Readers only finish once the pipes close.
                        registration.kill();
                        return Err(e);
                    }
                }
            };

            let mut output = out.join().unwrap_or_default();
            output.push_str(&err.join().unwrap_or_default());
            Ok(ProcessOutput { status, output })
        })
    }

    fn register(&self, mut child: Child) -> Registration<'_> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut inflight = self.inflight.lock().expect("supervisor lock poisoned");
        if self.token.is_cancelled() {
            kill_quietly(&mut child);
        }
        inflight.insert(id, child);
        Registration { owner: self, id }
    }
}

/// Entry in the in-flight table; removed (and reaped) on drop.
struct Registration<'a> {
    owner: &'a Supervisor,
    id: u64,
}

impl Registration<'_> {
    fn try_wait(&self) -> io::Result<Option<ExitStatus>> {
        let mut inflight = self.owner.inflight.lock().expect("supervisor lock poisoned");
        match inflight.get_mut(&self.id) {
            Some(child) => child.try_wait(),
            None => Err(io::Error::other("process not registered")),
        }
    }

    fn kill(&self) {
        let mut inflight = self.owner.inflight.lock().expect("supervisor lock poisoned");
        if let Some(child) = inflight.get_mut(&self.id) {
            kill_quietly(child);
        }
    }
}

impl Drop for Registration<'_> {
    fn drop(&mut self) {
        let child = self
            .owner
            .inflight
            .lock()
            .map(|mut m| m.remove(&self.id))
            .unwrap_or(None);
        if let Some(mut child) = child {
            if matches!(child.try_wait(), Ok(None)) {
                kill_quietly(&mut child);
                let _ = child.wait();
            }
        }
    }
}

fn kill_quietly(child: &mut Child) {
    // InvalidInput means it already exited
    if let Err(e) = child.kill() {
        if e.kind() != io::ErrorKind::InvalidInput {
            log::debug!("kill pid {}: {e}", child.id());
        }
    }
}

fn read_lossy(pipe: Option<impl Read>) -> String {
    let mut buf = Vec::new();
    if let Some(mut pipe) = pipe {
        let _ = pipe.read_to_end(&mut buf);
    }
    String::from_utf8_lossy(&buf).into_owned()
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Instant;

    fn sh(script: &str) -> Command {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(script);
        cmd
    }

    #[test]
    fn captures_stdout_and_stderr() {
        let sup = Supervisor::default();
        let out = sup.run(&mut sh("echo hello; echo oops >&2; exit 3")).unwrap();
        assert_eq!(out.status.code(), Some(3));
        assert!(out.output.contains("hello"));
        assert!(out.output.contains("oops"));
        assert_eq!(sup.in_flight(), 0);
    }

    #[test]
    fn success_status() {
        let sup = Supervisor::default();
        let out = sup.run(&mut sh("exit 0")).unwrap();
        assert!(out.status.success());
    }

    #[test]
    fn spawn_failure_is_error() {
        let sup = Supervisor::default();
        let err = sup
            .run(&mut Command::new("/nonexistent/verifier-binary"))
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
        assert_eq!(sup.in_flight(), 0);
    }

    #[test]
    fn cancel_kills_running_process() {
        let sup = Arc::new(Supervisor::default());
        let worker = {
            let sup = sup.clone();
            std::thread::spawn(move || sup.run(&mut sh("exec sleep 30")))
        };

        let deadline = Instant::now() + Duration::from_secs(5);
        while sup.in_flight() == 0 {
            assert!(Instant::now() < deadline, "process never registered");
            std::thread::sleep(Duration::from_millis(10));
        }

        let started = Instant::now();
        assert!(!sup.cancel());
        let out = worker.join().unwrap().unwrap();
        assert!(!out.status.success());
        assert!(started.elapsed() < Duration::from_secs(10));
        assert_eq!(sup.in_flight(), 0);
    }

    #[test]
    fn registered_after_cancel_is_killed() {
        let sup = Supervisor::default();
        sup.cancel();
        let started = Instant::now();
        let out = sup.run(&mut sh("exec sleep 30")).unwrap();
        assert!(!out.status.success());
        assert!(started.elapsed() < Duration::from_secs(10));
    }
}
