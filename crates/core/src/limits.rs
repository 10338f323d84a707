//! Size limits and truncation caps for the tracker SDK.
//!
//! PII SAFETY: the truncation caps bound how much page content can leave the
//! tab inside an event. Free-form capture beyond these caps is a contract
//! violation.
//!
//! # Usage Note
//!
//! The `#[validate]` derive macro requires literal values in attributes, so
//! field limits are duplicated there. Keep both in sync when modifying.

// === Queue / dedup bounds ===

/// Default in-memory event queue capacity.
pub const DEFAULT_QUEUE_CAPACITY: usize = 200;

/// Reported-event-id dedup window (FIFO evicted).
pub const DEDUP_SET_CAPACITY: usize = 1000;

/// Error-signature dedup window (FIFO evicted).
pub const ERROR_DEDUP_CAPACITY: usize = 100;

// === String field limits (chars) ===

/// Event name max length.
pub const MAX_EVENT_NAME_LEN: usize = 100;

/// Page URL max length.
pub const MAX_URL_LEN: usize = 2048;

/// User agent string max length.
pub const MAX_USER_AGENT_LEN: usize = 512;

/// User ID max length.
pub const MAX_USER_ID_LEN: usize = 128;

/// Element text content cap.
pub const MAX_ELEMENT_TEXT_LEN: usize = 100;

/// Action text cap for buttons and inputs.
pub const MAX_ACTION_TEXT_LEN: usize = 50;

/// Action text cap for links.
pub const MAX_LINK_TEXT_LEN: usize = 100;

/// Component prop string value cap.
pub const MAX_PROP_STRING_LEN: usize = 50;

/// Error message cap.
pub const MAX_ERROR_MESSAGE_LEN: usize = 500;

/// Error message prefix used in the dedup signature.
pub const ERROR_SIGNATURE_MESSAGE_LEN: usize = 100;

/// Error stack trace cap.
pub const MAX_ERROR_STACK_LEN: usize = 2000;

// === Structural bounds ===

/// Component chain walk depth cap.
pub const MAX_COMPONENT_CHAIN_DEPTH: usize = 10;

/// Region lookup ancestor climb cap.
pub const MAX_REGION_CLIMB: usize = 15;

/// Clickable-ancestor bubble search cap.
pub const MAX_CLICKABLE_BUBBLE: usize = 5;

/// `data-track-ignore` ancestor search cap.
pub const MAX_IGNORE_CLIMB: usize = 5;

/// Resource timing entries kept by the performance collector.
pub const MAX_RESOURCE_ENTRIES: usize = 50;

// === Payload bounds ===

/// Image (GET) delivery max encoded payload size in bytes.
///
/// URL length limits in the field sit around 2KB-8KB; anything larger must go
/// over a POST mechanism.
pub const MAX_IMAGE_PAYLOAD_BYTES: usize = 8 * 1024;

/// Offline buffer default cap (events).
pub const DEFAULT_OFFLINE_MAX_EVENTS: usize = 500;

/// Offline buffer default expiry (ms): 24 hours.
pub const DEFAULT_OFFLINE_EXPIRE_MS: i64 = 24 * 60 * 60 * 1000;
