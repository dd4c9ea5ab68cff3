//! # tshell-supervisor - Backend Process Supervision
//!
//! Manages the packaged tracker backend as a supervised child process:
//! spawn with captured output, readiness detection via a stdout sentinel,
//! crash-restart with a fixed delay, and kill-on-shutdown.
//!
//! Depends on [`tshell_core`] for domain types and error handling.
//!
//! ## Public API
//!
//! ### Supervision
//! - [`Supervisor`] - Single-task actor owning at most one live backend
//!   process; apply with [`Supervisor::spawn`]
//! - [`SupervisorConfig`] - Executable path and restart delay
//! - [`SupervisorHandle`] - Presentation-facing status channel: push
//!   subscription, synchronous readiness query, restart/shutdown requests
//!
//! ### Process Management
//! - [`BackendProcess`] - One spawned backend instance with line-captured
//!   stdout/stderr and a dedicated exit-wait task
//!
//! ### Executable Resolution
//! - [`resolve::backend_executable()`] - Development vs packaged path
//!   resolution
//! - [`resolve::ensure_executable()`] - chmod 755 on Unix platforms

pub mod handle;
pub mod process;
pub mod resolve;
pub mod supervisor;

// Public API re-exports
pub use handle::SupervisorHandle;
pub use process::BackendProcess;
pub use resolve::Deployment;
pub use supervisor::{Supervisor, SupervisorConfig, READY_SENTINEL, RESTART_DELAY};
