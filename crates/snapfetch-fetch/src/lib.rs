//! HTTP plumbing for snapfetch: a retrying transport, streaming downloads, and
//! bounded fan-out of independent units of work.
//!
//! # Architecture
//!
//! This crate follows the three-layer pattern:
//! - [`data`] - Immutable configuration and response types
//! - [`core`] - Pure retry bookkeeping
//! - [`effects`] - I/O operations with trait abstraction
//!
//! Callers never see transient failures: statuses in the configured forcelist,
//! connect failures and read failures are retried inside [`Transport`] until the
//! budget runs out. What survives is for the caller to classify.

pub mod core;
pub mod data;
mod effects;
mod error;

pub use core::{RetryBudget, RetryKind, retry_delay};
pub use data::{HttpResponse, TransportOptions};
pub use effects::{Batch, BatchError, BatchReport, BoxStream, Fetcher, HttpClient};

#[cfg(feature = "reqwest")]
pub use effects::Transport;

pub use error::FetchError;
