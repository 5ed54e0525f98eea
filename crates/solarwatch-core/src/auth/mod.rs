//! Authentication module for managing the persisted session.
//!
//! This module provides:
//! - `Session`: the credential plus the signed-in user's profile
//! - `TokenStore`: durable storage for the session (file, keychain, memory)
//! - `SessionManager`: start, inspect and end the session without a backend
//! - `token`: optimistic client-side expiry checks on the credential
//! - `teardown`: the single logout path every session end converges on

pub mod manager;
pub mod session;
pub mod store;
pub mod token;

pub use manager::SessionManager;
pub use session::{Session, UserProfile};
pub use store::{
    FileTokenStore, KeyringTokenStore, MemoryTokenStore, OsKeychain, SecretBackend, TokenStore,
};
pub use token::TokenStatus;

use tracing::warn;

use crate::navigation::{NavigationPort, Route};

/// End the current session: clear the store and send the user to login.
///
/// Explicit logout, locally detected expiry and a backend authentication
/// failure all end up here.
pub fn teardown(store: &dyn TokenStore, navigator: &dyn NavigationPort) {
    if let Err(e) = store.clear() {
        warn!(error = %e, "Failed to clear session store");
    }
    navigator.navigate(Route::Login);
}
