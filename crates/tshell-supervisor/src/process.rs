//! Backend child process management

use std::path::Path;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, oneshot};

use tshell_core::events::BackendEvent;
use tshell_core::prelude::*;

/// One spawned backend process instance.
///
/// The `Child` handle is moved into a dedicated `wait_for_exit` background
/// task that calls `child.wait()`, so the real exit code is captured and
/// emitted as `BackendEvent::Exited { code }` exactly once. The backend
/// takes no commands, so stdin is discarded at spawn time.
///
/// `BackendProcess` retains a kill channel to request termination and an
/// atomic flag for synchronous `has_exited()` checks.
pub struct BackendProcess {
    /// Process ID for logging
    pid: Option<u32>,
    /// One-shot sender that tells the wait task to kill the process.
    /// Consumed on first use (or on drop).
    kill_tx: Option<oneshot::Sender<()>>,
    /// Set to `true` by the wait task once the child has exited.
    exited: Arc<AtomicBool>,
}

impl BackendProcess {
    /// Spawn the backend executable with stdin discarded and stdout/stderr
    /// captured as line streams.
    ///
    /// Events are sent to `event_tx`; the channel is private to this
    /// instance, so a retired instance's events never reach a consumer
    /// that has moved on.
    pub fn spawn(executable: &Path, event_tx: mpsc::Sender<BackendEvent>) -> Result<Self> {
        info!("Spawning backend process: {}", executable.display());

        let mut child = Command::new(executable)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true) // Critical: cleanup on drop
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    Error::BackendMissing {
                        path: executable.to_path_buf(),
                    }
                } else {
                    Error::ProcessSpawn {
                        reason: e.to_string(),
                    }
                }
            })?;

        let pid = child.id();
        info!("Backend process started with PID: {:?}", pid);

        // Spawn stdout reader task (does NOT emit Exited - that's the wait
        // task's job)
        let stdout = child.stdout.take().expect("stdout was configured");
        tokio::spawn(Self::stdout_reader(stdout, event_tx.clone()));

        // Spawn stderr reader task
        let stderr = child.stderr.take().expect("stderr was configured");
        tokio::spawn(Self::stderr_reader(stderr, event_tx.clone()));

        let exited = Arc::new(AtomicBool::new(false));

        // Kill channel: BackendProcess holds the sender, wait task holds
        // the receiver.
        let (kill_tx, kill_rx) = oneshot::channel::<()>();

        // Spawn the dedicated wait task - takes ownership of `child`.
        tokio::spawn(Self::wait_for_exit(
            child,
            kill_rx,
            event_tx,
            Arc::clone(&exited),
        ));

        Ok(Self {
            pid,
            kill_tx: Some(kill_tx),
            exited,
        })
    }

    /// Background task: owns `child`, waits for it to exit, emits
    /// `BackendEvent::Exited`.
    ///
    /// Two ways the task can end:
    /// 1. The backend exits naturally - `child.wait()` resolves.
    /// 2. `kill_rx` fires - we kill the child first, then wait for it so
    ///    the OS reaps the process.
    async fn wait_for_exit(
        mut child: Child,
        kill_rx: oneshot::Receiver<()>,
        event_tx: mpsc::Sender<BackendEvent>,
        exited: Arc<AtomicBool>,
    ) {
        let code: Option<i32> = tokio::select! {
            // Natural exit path
            result = child.wait() => {
                match result {
                    Ok(status) => {
                        info!("Backend process exited with status: {:?}", status);
                        status.code()
                    }
                    Err(e) => {
                        error!("Error waiting for backend process: {}", e);
                        None
                    }
                }
            }
            // Kill path: kill_tx was sent (by the supervisor or on drop)
            _ = kill_rx => {
                info!("Kill signal received, terminating backend process");
                if let Err(e) = child.kill().await {
                    error!("Failed to kill backend process: {}", e);
                }
                match child.wait().await {
                    Ok(status) => {
                        info!("Backend process killed, exit status: {:?}", status);
                        status.code()
                    }
                    Err(e) => {
                        error!("Error waiting after kill: {}", e);
                        None
                    }
                }
            }
        };

        // Mark the instance exited before sending the event so callers
        // observing the event see has_exited() == true.
        exited.store(true, Ordering::Release);

        debug!("Sending BackendEvent::Exited {{ code: {:?} }}", code);
        let _ = event_tx.send(BackendEvent::Exited { code }).await;
    }

    /// Read lines from stdout and send as `BackendEvent::Stdout`.
    ///
    /// Stdout EOF just means the pipe closed; the wait task emits the
    /// `Exited` event with the real exit code.
    async fn stdout_reader(stdout: tokio::process::ChildStdout, tx: mpsc::Sender<BackendEvent>) {
        let mut reader = BufReader::new(stdout).lines();

        while let Ok(Some(line)) = reader.next_line().await {
            trace!("backend stdout: {}", line);

            if tx.send(BackendEvent::Stdout(line)).await.is_err() {
                debug!("stdout channel closed");
                break;
            }
        }

        debug!("stdout reader finished");
    }

    /// Read lines from stderr and send as `BackendEvent::Stderr`
    async fn stderr_reader(stderr: tokio::process::ChildStderr, tx: mpsc::Sender<BackendEvent>) {
        let mut reader = BufReader::new(stderr).lines();

        while let Ok(Some(line)) = reader.next_line().await {
            trace!("backend stderr: {}", line);

            if tx.send(BackendEvent::Stderr(line)).await.is_err() {
                debug!("stderr channel closed");
                break;
            }
        }

        debug!("stderr reader finished");
    }

    /// Request termination by signalling the wait task.
    ///
    /// Fire-and-forget from the caller's perspective: the wait task calls
    /// `child.kill()` and then `child.wait()`, ensuring the OS reaps the
    /// process before `Exited` is emitted.
    pub fn kill(&mut self) {
        if let Some(tx) = self.kill_tx.take() {
            // Ignore send error - the wait task may have already exited
            // naturally.
            let _ = tx.send(());
        }
    }

    /// Check if the process has already exited.
    ///
    /// Non-blocking, synchronous check backed by an atomic flag that is
    /// set by the wait task.
    pub fn has_exited(&self) -> bool {
        self.exited.load(Ordering::Acquire)
    }

    /// Check if the process is still running.
    pub fn is_running(&self) -> bool {
        !self.has_exited()
    }

    /// Get the process ID
    pub fn id(&self) -> Option<u32> {
        self.pid
    }
}

impl Drop for BackendProcess {
    fn drop(&mut self) {
        if !self.has_exited() {
            warn!("BackendProcess dropped while process may still be running");
            // Tell the wait task to tear down the child cleanly. If kill()
            // was already called this is a no-op.
            if let Some(tx) = self.kill_tx.take() {
                let _ = tx.send(());
            }
        }
        // kill_on_drop(true) on the Child is the final safety net if the
        // wait task has not handled the kill yet.
        debug!("BackendProcess dropped");
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::time::Duration;
    use tempfile::TempDir;

    /// Write an executable shell script to use as a stand-in backend.
    fn write_script(dir: &TempDir, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.path().join("fake_backend");
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).expect("write script");
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
            .expect("chmod script");
        path
    }

    async fn wait_for_exited(rx: &mut mpsc::Receiver<BackendEvent>) -> Option<i32> {
        for _ in 0..50 {
            match tokio::time::timeout(Duration::from_millis(200), rx.recv()).await {
                Ok(Some(BackendEvent::Exited { code })) => return code,
                Ok(Some(_)) => continue,
                Ok(None) => break,
                Err(_) => continue,
            }
        }
        panic!("BackendEvent::Exited was not received");
    }

    #[tokio::test]
    async fn test_spawn_missing_executable() {
        let (tx, _rx) = mpsc::channel(16);
        let result = BackendProcess::spawn(Path::new("/nonexistent/backend"), tx);

        assert!(matches!(result, Err(Error::BackendMissing { .. })));
    }

    #[tokio::test]
    async fn test_exit_code_captured_on_clean_exit() {
        let dir = TempDir::new().unwrap();
        let script = write_script(&dir, "exit 0");

        let (tx, mut rx) = mpsc::channel(16);
        let _process = BackendProcess::spawn(&script, tx).expect("spawn");

        assert_eq!(wait_for_exited(&mut rx).await, Some(0));
    }

    #[tokio::test]
    async fn test_exit_code_captured_on_crash_exit() {
        let dir = TempDir::new().unwrap();
        let script = write_script(&dir, "exit 42");

        let (tx, mut rx) = mpsc::channel(16);
        let _process = BackendProcess::spawn(&script, tx).expect("spawn");

        assert_eq!(wait_for_exited(&mut rx).await, Some(42));
    }

    #[tokio::test]
    async fn test_stdout_lines_forwarded_in_order() {
        let dir = TempDir::new().unwrap();
        let script = write_script(&dir, "echo first\necho second");

        let (tx, mut rx) = mpsc::channel(16);
        let _process = BackendProcess::spawn(&script, tx).expect("spawn");

        let mut lines = Vec::new();
        loop {
            match tokio::time::timeout(Duration::from_secs(2), rx.recv()).await {
                Ok(Some(BackendEvent::Stdout(line))) => lines.push(line),
                Ok(Some(BackendEvent::Exited { .. })) => break,
                Ok(Some(_)) => continue,
                _ => panic!("did not receive expected events"),
            }
        }

        assert_eq!(lines, vec!["first".to_string(), "second".to_string()]);
    }

    #[tokio::test]
    async fn test_exited_emitted_exactly_once() {
        let dir = TempDir::new().unwrap();
        let script = write_script(&dir, "exit 0");

        let (tx, mut rx) = mpsc::channel(32);
        let _process = BackendProcess::spawn(&script, tx).expect("spawn");

        let mut exited_count = 0usize;
        let deadline = tokio::time::sleep(Duration::from_millis(500));
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                event = rx.recv() => {
                    match event {
                        Some(BackendEvent::Exited { .. }) => exited_count += 1,
                        Some(_) => {}
                        None => break,
                    }
                }
                _ = &mut deadline => break,
            }
        }

        assert_eq!(
            exited_count, 1,
            "expected exactly one Exited event, got {}",
            exited_count
        );
    }

    #[tokio::test]
    async fn test_has_exited_becomes_true_after_exit() {
        let dir = TempDir::new().unwrap();
        let script = write_script(&dir, "exit 0");

        let (tx, mut rx) = mpsc::channel(16);
        let process = BackendProcess::spawn(&script, tx).expect("spawn");

        wait_for_exited(&mut rx).await;

        assert!(process.has_exited());
        assert!(!process.is_running());
    }

    #[tokio::test]
    async fn test_kill_terminates_long_running_process() {
        let dir = TempDir::new().unwrap();
        let script = write_script(&dir, "sleep 60");

        let (tx, mut rx) = mpsc::channel(16);
        let mut process = BackendProcess::spawn(&script, tx).expect("spawn");

        assert!(process.is_running());
        process.kill();

        // Killed by signal: no exit code on Unix.
        assert_eq!(wait_for_exited(&mut rx).await, None);
        assert!(process.has_exited());
    }
}
