// Host-browser capability boundary for the HomeworkCenter sync extension.
//
// The privileged background context talks to the browser through the traits
// in this crate (tab lifecycle, cookie enumeration, in-page storage reads).
// Real implementations live on the extension side of the message transport;
// this crate ships the contract plus an instrumented mock for tests.

mod error;
pub mod mock;
mod page;
mod tabs;

pub use error::HostError;
pub use page::{CookieRecord, PageHost, StorageSnapshot};
pub use tabs::{NavigationEvent, NavigationWatcher, TabHost, TabId, TabRef, WatcherId};
