// Browser-mediated OAuth for the HomeworkCenter sync extension.
//
// The bridge opens an identity-provider login in a transient tab, watches
// for the navigation back to the extension's redirect URL, pulls the issued
// tokens out of it, exchanges them for a backend session, and persists that
// session locally.

mod bridge;
mod error;
mod identity;
mod redirect;
mod session;

pub use bridge::{OAuthBridge, DEFAULT_FLOW_TIMEOUT};
pub use error::AuthError;
pub use identity::{IdentityApi, RestIdentity};
pub use redirect::{extract_tokens, AuthTokenPair};
pub use session::{BackendSession, SessionFile, SessionUser};
