//! Local session lifecycle, usable without a backend.

use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use super::session::{Session, UserProfile};
use super::store::TokenStore;
use crate::navigation::{NavigationPort, Route};

/// Starts, inspects and ends the stored session.
///
/// Nothing here touches the network, so signing out or checking who is
/// signed in works with no backend configured.
#[derive(Clone)]
pub struct SessionManager {
    store: Arc<dyn TokenStore>,
    navigator: Arc<dyn NavigationPort>,
}

impl SessionManager {
    pub fn new(store: Arc<dyn TokenStore>, navigator: Arc<dyn NavigationPort>) -> Self {
        Self { store, navigator }
    }

    pub fn store(&self) -> &Arc<dyn TokenStore> {
        &self.store
    }

    pub fn navigator(&self) -> &Arc<dyn NavigationPort> {
        &self.navigator
    }

    /// Store a fresh session and move to the dashboard
    pub fn start(&self, session: &Session) -> Result<()> {
        self.store.set(session)?;
        info!(user = %session.user().email, "Signed in");
        self.navigator.navigate(Route::Dashboard);
        Ok(())
    }

    pub fn current_session(&self) -> Result<Option<Session>> {
        self.store.get()
    }

    pub fn current_user(&self) -> Result<Option<UserProfile>> {
        Ok(self.current_session()?.map(|s| s.user().clone()))
    }

    pub fn logout(&self) {
        info!("Signing out");
        super::teardown(self.store.as_ref(), self.navigator.as_ref());
    }
}
