//! Tracker core for the ldesign tracker SDK.

pub mod device;
pub mod session;
pub mod stats;
pub mod tracker;

pub use device::capture_device_info;
pub use session::{SessionManager, SESSION_STORAGE_KEY};
pub use stats::{StatsSnapshot, TrackerStats};
pub use tracker::Tracker;
