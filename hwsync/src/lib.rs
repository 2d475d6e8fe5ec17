// Background core of the HomeworkCenter sync extension.
//
// Wires the host-browser boundary, the remote session store, and the OAuth
// bridge into the three-message contract the foreground contexts speak:
// `check-sync-status`, `copy-session`, and `google-auth`.

pub mod capture;
pub mod classifier;
pub mod coordinator;
pub mod dispatch;
pub mod messages;
pub mod resolver;
pub mod settings;

pub use capture::{CaptureError, SessionCapture};
pub use classifier::classify;
pub use coordinator::UpsertCoordinator;
pub use dispatch::Dispatcher;
pub use resolver::{SyncStatus, SyncStatusResolver};
pub use settings::Settings;
