//! Effects layer: network and filesystem I/O.

mod batch;
mod fetcher;
mod http;

pub use batch::{Batch, BatchError, BatchReport};
pub use fetcher::Fetcher;
pub use http::{BoxStream, HttpClient};

#[cfg(feature = "reqwest")]
pub use http::Transport;
