// Remote session store for the HomeworkCenter sync extension: the
// `user_auth_details` data model, the `SessionStore` trait with an atomic
// conditional upsert, a REST-backed client, and an in-memory store for tests.

mod error;
mod memory;
mod models;
mod rest;
mod store;

pub use error::StoreError;
pub use memory::MemoryStore;
pub use models::{SessionPayload, SessionRecord, SiteCategory};
pub use rest::RestStore;
pub use store::SessionStore;
