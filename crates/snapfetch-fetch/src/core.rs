//! Core layer: pure retry bookkeeping, no I/O.

mod retry;

pub use retry::{RetryBudget, RetryKind, retry_delay};
