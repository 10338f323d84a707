//! Device info capture from the host window.

use tracker_core::DeviceInfo;
use tracker_host::Window;

/// Captures the device snapshot attached to every event. Called once at
/// tracker install.
pub fn capture_device_info(window: &Window) -> DeviceInfo {
    let navigator = window.navigator();
    let (screen_width, screen_height) = window.screen();
    let (viewport_width, viewport_height) = window.viewport();

    DeviceInfo {
        user_agent: navigator.user_agent.clone(),
        screen_width,
        screen_height,
        viewport_width,
        viewport_height,
        device_pixel_ratio: window.device_pixel_ratio(),
        language: navigator.language.clone(),
        timezone: navigator.timezone.clone(),
        platform: navigator.platform.clone(),
        is_touch: navigator.max_touch_points > 0,
        is_mobile: navigator.is_mobile,
        network_effective_type: navigator.network_effective_type.clone(),
        device_memory: navigator.device_memory,
        hardware_concurrency: navigator.hardware_concurrency,
    }
}
