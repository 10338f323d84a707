//! Device information captured once at tracker install.

use serde::{Deserialize, Serialize};

/// Device and environment snapshot attached to every event.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfo {
    pub user_agent: String,
    pub screen_width: u32,
    pub screen_height: u32,
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub device_pixel_ratio: f64,
    pub language: String,
    pub timezone: String,
    pub platform: String,
    pub is_touch: bool,
    pub is_mobile: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network_effective_type: Option<String>,
    /// Approximate device memory in GiB.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_memory: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hardware_concurrency: Option<u32>,
}
