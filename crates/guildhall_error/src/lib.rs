//! Error types for the Guildhall workspace.
//!
//! # Error Hierarchy
//!
//! Errors follow the `ErrorKind` + wrapper struct pattern:
//! - `*ErrorKind` enum defines specific error conditions
//! - `*Error` struct wraps the kind with source location tracking
//! - All constructors use `#[track_caller]` for automatic location capture
//!
//! Note that deny outcomes (cooldown active, spam detected, farming interval not
//! elapsed) are not errors. They are ordinary return values of the guards.
//!
//! # Examples
//!
//! ```
//! use guildhall_error::{ConfigError, GuildhallResult};
//!
//! fn load() -> GuildhallResult<u64> {
//!     Err(ConfigError::new("sweep_interval_ms must be greater than zero"))?
//! }
//!
//! assert!(load().is_err());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod error;
mod json;
mod server;

pub use config::ConfigError;
pub use error::{GuildhallError, GuildhallErrorKind, GuildhallResult};
pub use json::JsonError;
pub use server::{ServerError, ServerErrorKind};
