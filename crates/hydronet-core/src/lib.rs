//! Core types and error definitions for the HydroNet chat client.
//!
//! This crate provides the types shared across the HydroNet crates:
//!
//! - [`HydroNetError`] — Unified error enum for transport, decoding and
//!   server-reported failures.
//! - [`HydroNetResult`] — Convenience alias for `Result<T, HydroNetError>`.
//! - [`StreamEvent`] — One decoded event of a chat stream.
//! - [`ToolOutcome`] — Payload of a finished tool invocation.
//! - [`ToolStatus`] — Lifecycle state of a tool invocation.

pub mod error;
pub mod event;
pub mod tool;

pub use error::{HydroNetError, HydroNetResult};
pub use event::{StreamEvent, ToolOutcome};
pub use tool::{display_name, ToolStatus};
