//! Backend lifecycle events and status

use serde::{Deserialize, Serialize};

/// Raw event stream of a single backend process instance.
///
/// Produced by the reader/wait tasks attached to one spawned process and
/// consumed by the supervisor. Each spawn gets its own channel, so events
/// from a retired instance never reach the supervisor's current state.
#[derive(Debug, Clone)]
pub enum BackendEvent {
    /// A line of captured stdout
    Stdout(String),

    /// A line of captured stderr (logged only, never affects state)
    Stderr(String),

    /// The process has exited. `code` is `None` when the OS reports no
    /// exit code (killed by signal).
    Exited { code: Option<i32> },
}

/// Presentation-facing lifecycle status of the supervised backend.
///
/// At most one current status is retained; the supervisor publishes
/// transitions on a watch channel. The serialized shape matches the
/// desktop shell's IPC payload: `{status, message?, code?}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BackendStatus {
    /// Supervisor created, no spawn attempted yet
    NotStarted,

    /// Process spawned, readiness sentinel not yet observed
    Starting,

    /// Readiness sentinel observed on stdout
    Ready,

    /// Spawn failed; no automatic restart for this class of failure
    Error { message: String },

    /// Process exited (cleanly, crashed, or killed)
    Stopped {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        code: Option<i32>,
    },
}

impl BackendStatus {
    /// Whether the backend has reported readiness. This is the value the
    /// synchronous status query returns.
    pub fn is_ready(&self) -> bool {
        matches!(self, BackendStatus::Ready)
    }
}
