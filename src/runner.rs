//! Headless presentation surface
//!
//! Emits one NDJSON object per backend status transition on stdout and
//! serves the two request/response calls (`status`, `restart`) as line
//! commands on stdin. This is the same surface the desktop shell exposed
//! over IPC, reshaped for a terminal: push notifications, a synchronous
//! readiness query, and a restart request.
//!
//! # Example Output
//!
//! ```json
//! {"event":"backend_status","status":"starting","timestamp":1704700001000}
//! {"event":"backend_status","status":"ready","timestamp":1704700002000}
//! {"event":"restart_result","success":true,"timestamp":1704700003000}
//! ```

use chrono::Utc;
use serde::Serialize;
use tokio::sync::mpsc;

use tshell_core::events::BackendStatus;
use tshell_core::prelude::*;
use tshell_supervisor::SupervisorHandle;

/// Events emitted on stdout, one JSON object per line
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum ShellEvent {
    /// Backend lifecycle transition (push notification)
    BackendStatus {
        #[serde(flatten)]
        status: BackendStatus,
        timestamp: i64,
    },

    /// Reply to a `status` command
    StatusReport { ready: bool, timestamp: i64 },

    /// Reply to a `restart` command
    RestartResult { success: bool, timestamp: i64 },
}

impl ShellEvent {
    fn backend_status(status: BackendStatus) -> Self {
        Self::BackendStatus {
            status,
            timestamp: now_millis(),
        }
    }

    fn status_report(ready: bool) -> Self {
        Self::StatusReport {
            ready,
            timestamp: now_millis(),
        }
    }

    fn restart_result(success: bool) -> Self {
        Self::RestartResult {
            success,
            timestamp: now_millis(),
        }
    }

    /// Write this event to stdout as a single NDJSON line.
    fn emit(&self) {
        match serde_json::to_string(self) {
            Ok(json) => println!("{}", json),
            Err(e) => error!("Failed to serialize shell event: {}", e),
        }
    }
}

fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Commands accepted on stdin, one per line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ShellCommand {
    Status,
    Restart,
    Quit,
}

fn parse_command(line: &str) -> Option<ShellCommand> {
    match line.trim().to_lowercase().as_str() {
        "status" => Some(ShellCommand::Status),
        "restart" => Some(ShellCommand::Restart),
        "quit" | "exit" => Some(ShellCommand::Quit),
        _ => None,
    }
}

/// Run the presentation loop until stdin asks to quit, Ctrl-C arrives, or
/// the supervisor goes away. Always shuts the supervisor down on the way
/// out so the backend never outlives the shell.
pub async fn run(handle: SupervisorHandle) -> Result<()> {
    let mut status_rx = handle.subscribe();

    let (cmd_tx, mut cmd_rx) = mpsc::channel::<ShellCommand>(8);
    std::thread::spawn(move || read_stdin_commands(cmd_tx));

    // Report the state that existed before we attached (mirrors the
    // initial status push a freshly created window receives).
    ShellEvent::backend_status(status_rx.borrow_and_update().clone()).emit();

    loop {
        tokio::select! {
            changed = status_rx.changed() => match changed {
                Ok(()) => {
                    ShellEvent::backend_status(status_rx.borrow_and_update().clone()).emit();
                }
                Err(_) => {
                    info!("Supervisor terminated, leaving presentation loop");
                    break;
                }
            },
            Some(cmd) = cmd_rx.recv() => match cmd {
                ShellCommand::Status => {
                    ShellEvent::status_report(handle.is_ready()).emit();
                }
                ShellCommand::Restart => {
                    let success = match handle.restart().await {
                        Ok(success) => success,
                        Err(e) => {
                            warn!("Restart request failed: {}", e);
                            false
                        }
                    };
                    ShellEvent::restart_result(success).emit();
                }
                ShellCommand::Quit => {
                    info!("Quit requested on stdin");
                    break;
                }
            },
            _ = tokio::signal::ctrl_c() => {
                info!("Ctrl-C received");
                break;
            }
        }
    }

    handle.shutdown().await;
    Ok(())
}

/// Blocking stdin reader on a plain thread; sends parsed commands into
/// the async loop.
fn read_stdin_commands(cmd_tx: mpsc::Sender<ShellCommand>) {
    use std::io::BufRead;

    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let Ok(line) = line else { break };

        match parse_command(&line) {
            Some(cmd) => {
                if cmd_tx.blocking_send(cmd).is_err() {
                    break;
                }
            }
            None if line.trim().is_empty() => {}
            None => warn!("Unknown command on stdin: {}", line.trim()),
        }
    }

    debug!("stdin reader finished");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_command_variants() {
        assert_eq!(parse_command("status"), Some(ShellCommand::Status));
        assert_eq!(parse_command("  RESTART \n"), Some(ShellCommand::Restart));
        assert_eq!(parse_command("quit"), Some(ShellCommand::Quit));
        assert_eq!(parse_command("exit"), Some(ShellCommand::Quit));
        assert_eq!(parse_command("frobnicate"), None);
        assert_eq!(parse_command(""), None);
    }

    #[test]
    fn test_backend_status_event_shape() {
        let event = ShellEvent::BackendStatus {
            status: BackendStatus::Ready,
            timestamp: 1704700002000,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(
            json,
            r#"{"event":"backend_status","status":"ready","timestamp":1704700002000}"#
        );
    }

    #[test]
    fn test_stopped_status_event_carries_code() {
        let event = ShellEvent::BackendStatus {
            status: BackendStatus::Stopped { code: Some(1) },
            timestamp: 0,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(
            json,
            r#"{"event":"backend_status","status":"stopped","code":1,"timestamp":0}"#
        );
    }

    #[test]
    fn test_reply_event_shapes() {
        let json = serde_json::to_string(&ShellEvent::StatusReport {
            ready: false,
            timestamp: 0,
        })
        .unwrap();
        assert_eq!(json, r#"{"event":"status_report","ready":false,"timestamp":0}"#);

        let json = serde_json::to_string(&ShellEvent::RestartResult {
            success: true,
            timestamp: 0,
        })
        .unwrap();
        assert_eq!(
            json,
            r#"{"event":"restart_result","success":true,"timestamp":0}"#
        );
    }
}
