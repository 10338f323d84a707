//! Batch delivery, retry, and offline buffering for the ldesign tracker SDK.

pub mod delivery;
pub mod offline;
pub mod payload;
pub mod retry;
pub mod transport;

pub use delivery::{deliver, HttpClient, ReqwestClient, SharedHttpClient};
pub use offline::OfflineBuffer;
pub use payload::{BatchEnvelope, BatchMetadata};
pub use retry::{retry, RetryPolicy};
pub use transport::{Transport, TransportRequest};
