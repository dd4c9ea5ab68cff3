//! Presentation-facing handle to the supervisor
//!
//! Mirrors the desktop shell's IPC surface: a push channel of status
//! transitions, a synchronous readiness query, and restart/shutdown
//! request-response pairs. Status events are low-frequency lifecycle
//! transitions, so the watch channel's latest-value semantics are all a
//! newly attached presentation surface needs.

use tokio::sync::{mpsc, oneshot, watch};

use tshell_core::events::BackendStatus;
use tshell_core::prelude::*;

use crate::supervisor::SupervisorCommand;

/// Handle for querying and controlling a [`Supervisor`].
///
/// Cheap to clone; all clones talk to the same supervisor task.
///
/// [`Supervisor`]: crate::Supervisor
#[derive(Debug, Clone)]
pub struct SupervisorHandle {
    cmd_tx: mpsc::Sender<SupervisorCommand>,
    status_rx: watch::Receiver<BackendStatus>,
}

impl SupervisorHandle {
    pub(crate) fn new(
        cmd_tx: mpsc::Sender<SupervisorCommand>,
        status_rx: watch::Receiver<BackendStatus>,
    ) -> Self {
        Self { cmd_tx, status_rx }
    }

    /// Last known status, read synchronously.
    pub fn status(&self) -> BackendStatus {
        self.status_rx.borrow().clone()
    }

    /// Last known readiness. Does not block on process state.
    pub fn is_ready(&self) -> bool {
        self.status_rx.borrow().is_ready()
    }

    /// Subscribe to status transitions.
    ///
    /// The receiver observes the current status immediately via
    /// `borrow()` and every transition after the subscription point.
    pub fn subscribe(&self) -> watch::Receiver<BackendStatus> {
        self.status_rx.clone()
    }

    /// Kill and respawn the backend. Returns whether the new spawn
    /// succeeded.
    pub async fn restart(&self) -> Result<bool> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.cmd_tx
            .send(SupervisorCommand::Restart { reply: reply_tx })
            .await
            .map_err(|_| Error::channel_send("supervisor command channel closed"))?;
        reply_rx.await.map_err(|_| Error::ChannelClosed)
    }

    /// Stop supervising: suppress any pending restart and kill the live
    /// backend. Idempotent - calling after the supervisor has already
    /// terminated is a no-op.
    pub async fn shutdown(&self) {
        let (reply_tx, reply_rx) = oneshot::channel();
        if self
            .cmd_tx
            .send(SupervisorCommand::Shutdown { reply: reply_tx })
            .await
            .is_ok()
        {
            let _ = reply_rx.await;
        }
    }
}
