//! Backend process supervisor
//!
//! Owns the lifecycle of exactly one backend process instance at a time:
//! spawn, readiness detection via a stdout sentinel, crash-restart with a
//! fixed delay, and kill-on-shutdown. Status transitions are published on
//! a watch channel consumed through [`SupervisorHandle`].

use std::path::PathBuf;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, watch};

use tshell_core::events::{BackendEvent, BackendStatus};
use tshell_core::prelude::*;

use crate::handle::SupervisorHandle;
use crate::process::BackendProcess;
use crate::resolve::{self, Deployment};

/// Substring the backend prints to stdout once initialization completes.
/// This is the entire handshake between shell and backend - no port
/// negotiation, no structured message.
pub const READY_SENTINEL: &str = "Started server process";

/// Delay before an automatic or manual restart respawns the backend,
/// giving the OS time to release the server port.
pub const RESTART_DELAY: Duration = Duration::from_secs(1);

const EVENT_CHANNEL_CAPACITY: usize = 256;
const COMMAND_CHANNEL_CAPACITY: usize = 8;

/// Supervisor configuration
#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    /// Resolved path to the backend executable
    pub executable: PathBuf,
    /// Delay applied before any respawn. Defaults to [`RESTART_DELAY`].
    pub restart_delay: Duration,
}

impl SupervisorConfig {
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
            restart_delay: RESTART_DELAY,
        }
    }

    /// Resolve the executable for the given deployment.
    pub fn for_deployment(deployment: &Deployment) -> Result<Self> {
        Ok(Self::new(resolve::backend_executable(deployment)?))
    }
}

/// Requests accepted from the presentation layer
#[derive(Debug)]
pub(crate) enum SupervisorCommand {
    /// Kill the live backend (if any), wait the fixed delay, respawn.
    /// Replies with the spawn success.
    Restart { reply: oneshot::Sender<bool> },

    /// Suppress pending restarts, kill the live backend, terminate the
    /// supervisor task.
    Shutdown { reply: oneshot::Sender<()> },
}

/// An event from one backend instance, tagged with the spawn generation
/// that produced it. Events from retired generations are discarded, so a
/// late `Exited` from a manually killed process can never trigger a
/// spurious restart.
#[derive(Debug)]
struct InstanceEvent {
    generation: u64,
    event: BackendEvent,
}

/// Supervisor actor. Owns at most one live backend process; all state
/// mutation happens on its single task, so no locking is needed.
pub struct Supervisor {
    config: SupervisorConfig,
    status_tx: watch::Sender<BackendStatus>,
    event_tx: mpsc::Sender<InstanceEvent>,
    restart_tx: mpsc::Sender<()>,
    process: Option<BackendProcess>,
    /// Bumped on every spawn attempt; identifies the current instance
    generation: u64,
    /// Sentinel observed for the current instance
    ready: bool,
    /// Set by shutdown; suppresses the automatic restart path
    quitting: bool,
}

impl Supervisor {
    /// Spawn the supervisor task and start the backend.
    ///
    /// Returns the presentation-facing handle. An initial spawn failure is
    /// reported through the status channel (`Error` status), not as an
    /// error here - the supervisor stays alive awaiting a manual restart.
    pub fn spawn(config: SupervisorConfig) -> SupervisorHandle {
        let (status_tx, status_rx) = watch::channel(BackendStatus::NotStarted);
        let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let (restart_tx, restart_rx) = mpsc::channel(4);

        let supervisor = Supervisor {
            config,
            status_tx,
            event_tx,
            restart_tx,
            process: None,
            generation: 0,
            ready: false,
            quitting: false,
        };

        tokio::spawn(supervisor.run(event_rx, cmd_rx, restart_rx));

        SupervisorHandle::new(cmd_tx, status_rx)
    }

    async fn run(
        mut self,
        mut event_rx: mpsc::Receiver<InstanceEvent>,
        mut cmd_rx: mpsc::Receiver<SupervisorCommand>,
        mut restart_rx: mpsc::Receiver<()>,
    ) {
        self.start();

        loop {
            tokio::select! {
                // The supervisor keeps a sender, so this channel never
                // closes from under us.
                Some(event) = event_rx.recv() => self.on_event(event),
                cmd = cmd_rx.recv() => match cmd {
                    Some(cmd) => {
                        if self.on_command(cmd).await {
                            break;
                        }
                    }
                    None => {
                        // All handles dropped: treat as shutdown.
                        info!("All supervisor handles dropped, shutting down");
                        self.shutdown();
                        break;
                    }
                },
                Some(()) = restart_rx.recv() => self.on_restart_due(),
            }
        }

        debug!("Supervisor task finished");
    }

    /// Spawn a fresh backend instance. Returns whether the spawn
    /// succeeded. Failures are logged and surfaced as an `Error` status;
    /// they never trigger the automatic restart path.
    fn start(&mut self) -> bool {
        let executable = self.config.executable.clone();
        self.generation += 1;
        self.ready = false;

        if !executable.is_file() {
            let err = Error::BackendMissing { path: executable };
            error!("Failed to start backend: {}", err);
            self.set_status(BackendStatus::Error {
                message: err.to_string(),
            });
            return false;
        }

        if let Err(e) = resolve::ensure_executable(&executable) {
            error!("Failed to prepare backend executable: {}", e);
            self.set_status(BackendStatus::Error {
                message: e.to_string(),
            });
            return false;
        }

        // Fresh channel per instance; a forwarder tags events with the
        // spawn generation before they reach the main loop.
        let (raw_tx, raw_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);

        match BackendProcess::spawn(&executable, raw_tx) {
            Ok(process) => {
                tokio::spawn(Self::forward_events(
                    raw_rx,
                    self.event_tx.clone(),
                    self.generation,
                ));
                self.process = Some(process);
                self.set_status(BackendStatus::Starting);
                true
            }
            Err(e) => {
                error!("Failed to start backend process: {}", e);
                self.process = None;
                self.set_status(BackendStatus::Error {
                    message: e.to_string(),
                });
                false
            }
        }
    }

    /// Tag one instance's events with its generation and forward them to
    /// the supervisor loop.
    async fn forward_events(
        mut raw_rx: mpsc::Receiver<BackendEvent>,
        event_tx: mpsc::Sender<InstanceEvent>,
        generation: u64,
    ) {
        while let Some(event) = raw_rx.recv().await {
            if event_tx
                .send(InstanceEvent { generation, event })
                .await
                .is_err()
            {
                break;
            }
        }
    }

    fn on_event(&mut self, event: InstanceEvent) {
        if event.generation != self.generation {
            debug!(
                "Discarding event from retired backend instance (generation {} < {})",
                event.generation, self.generation
            );
            return;
        }

        match event.event {
            BackendEvent::Stdout(line) => {
                if !self.ready && line.contains(READY_SENTINEL) {
                    info!("Backend reported ready");
                    self.ready = true;
                    self.set_status(BackendStatus::Ready);
                }
            }
            BackendEvent::Stderr(line) => {
                // Logged only; stderr never affects supervision state.
                warn!("backend stderr: {}", line);
            }
            BackendEvent::Exited { code } => {
                info!("Backend process exited with code {:?}", code);
                self.process = None;
                self.ready = false;
                self.set_status(BackendStatus::Stopped { code });

                // Crash exit: anything but a clean zero. A signal kill
                // reports no code and counts as a crash too.
                if code != Some(0) && !self.quitting {
                    self.schedule_restart();
                }
            }
        }
    }

    /// Defer a restart by the configured delay. The quitting flag is
    /// re-checked when the tick fires, so a shutdown issued during the
    /// delay reliably suppresses the restart.
    fn schedule_restart(&self) {
        info!(
            "Scheduling backend restart in {:?}",
            self.config.restart_delay
        );
        let restart_tx = self.restart_tx.clone();
        let delay = self.config.restart_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // Send failure means the supervisor is gone; nothing to do.
            let _ = restart_tx.send(()).await;
        });
    }

    /// A scheduled restart came due.
    fn on_restart_due(&mut self) {
        if self.quitting {
            debug!("Pending restart suppressed: shutting down");
            return;
        }
        if self.process.is_some() {
            debug!("Pending restart skipped: backend already running");
            return;
        }
        info!("Restarting backend process");
        self.start();
    }

    /// Handle one presentation-layer request. Returns `true` when the
    /// supervisor task should terminate.
    async fn on_command(&mut self, cmd: SupervisorCommand) -> bool {
        match cmd {
            SupervisorCommand::Restart { reply } => {
                let success = self.restart().await;
                let _ = reply.send(success);
                false
            }
            SupervisorCommand::Shutdown { reply } => {
                self.shutdown();
                let _ = reply.send(());
                true
            }
        }
    }

    /// Kill the live backend (if any), wait the fixed delay to avoid port
    /// contention, then spawn a fresh instance. Always attempts the
    /// respawn, regardless of how the previous instance ended.
    async fn restart(&mut self) -> bool {
        if let Some(mut process) = self.process.take() {
            info!("Killing backend process for restart");
            process.kill();
            self.ready = false;
            self.set_status(BackendStatus::Stopped { code: None });
        }

        tokio::time::sleep(self.config.restart_delay).await;
        self.start()
    }

    /// Mark the supervisor as quitting and kill the live backend, if any.
    /// Safe to call when nothing is running.
    fn shutdown(&mut self) {
        self.quitting = true;
        self.ready = false;
        if let Some(mut process) = self.process.take() {
            info!("Killing backend process for shutdown");
            process.kill();
            self.set_status(BackendStatus::Stopped { code: None });
        }
    }

    fn set_status(&self, status: BackendStatus) {
        debug!("Backend status: {:?}", status);
        // Receivers may all be gone; the supervisor does not care.
        let _ = self.status_tx.send(status);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults_to_one_second_delay() {
        let config = SupervisorConfig::new("/opt/tracker/resources/twitter_alert_tool");
        assert_eq!(config.restart_delay, Duration::from_secs(1));
    }

    #[test]
    fn test_config_for_packaged_deployment() {
        let config = SupervisorConfig::for_deployment(&Deployment::Packaged {
            resources_root: PathBuf::from("/opt/tracker"),
        })
        .unwrap();

        assert!(config.executable.starts_with("/opt/tracker"));
        assert_eq!(config.restart_delay, RESTART_DELAY);
    }

    #[test]
    fn test_sentinel_matches_as_substring() {
        let line = "INFO:     Started server process [1234]";
        assert!(line.contains(READY_SENTINEL));
        assert!(!"INFO:     Waiting for application startup.".contains(READY_SENTINEL));
    }
}
