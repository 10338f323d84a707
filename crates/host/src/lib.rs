//! Browser-host abstraction for the ldesign tracker SDK.
//!
//! The tracker runs against a [`Window`]: document tree, signal listeners,
//! timers, history, storage, performance timeline, and visibility state. An
//! embedder (or a test) drives the window; collectors observe it.

pub mod clock;
pub mod dom;
pub mod path;
pub mod performance;
pub mod selector;
pub mod signal;
pub mod storage;
pub mod window;

pub use clock::{Clock, ManualClock, SharedClock, SystemClock};
pub use dom::{ComponentInstance, Document, ElementData, NodeId};
pub use path::{css_path, xpath};
pub use performance::{NavigationTiming, PerformanceEntry, PerformanceEntryKind};
pub use selector::Selector;
pub use signal::{
    ClickSignalKind, HistoryOp, InputKind, PointerDetail, RejectionReason, Signal, SignalKind,
};
pub use storage::{MemoryStorage, SharedStorage, Storage};
pub use window::{ListenerId, NavigatorInfo, TimerId, Window, WindowBuilder};
