//! # tshell-core - Core Domain Types
//!
//! Foundation crate for Tracker Shell. Provides the backend lifecycle
//! types, error handling, and logging setup shared by the supervisor and
//! the shell binary.
//!
//! This crate has **zero internal dependencies** -- it only depends on
//! external crates (serde, thiserror, tracing).
//!
//! ## Public API
//!
//! ### Events (`events`)
//! - [`BackendEvent`] - Raw stdout/stderr/exit stream of one backend
//!   process instance
//! - [`BackendStatus`] - Presentation-facing lifecycle status
//!   (starting/ready/error/stopped)
//!
//! ### Error Handling (`error`)
//! - [`Error`] - Custom error enum
//! - [`Result`] - Type alias for `std::result::Result<T, Error>`
//! - [`ResultExt`] - Extension trait for adding error context
//!
//! ## Prelude
//!
//! Import commonly used types with:
//! ```rust
//! use tshell_core::prelude::*;
//! ```

pub mod error;
pub mod events;
pub mod logging;

/// Prelude for common imports used throughout all Tracker Shell crates
pub mod prelude {
    pub use super::error::{Error, Result, ResultExt};
    pub use tracing::{debug, error, info, trace, warn};
}

// Re-export commonly used types at crate root for convenience
pub use error::{Error, Result, ResultExt};
pub use events::{BackendEvent, BackendStatus};
