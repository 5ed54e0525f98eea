//! Ends the session when the backend rejects the credential.

use std::sync::Arc;

use tracing::{debug, warn};

use super::interceptor::{Interceptor, RequestContext};
use super::response::Response;
use crate::auth::{self, TokenStore};
use crate::navigation::NavigationPort;

/// Response-side backstop for credentials that looked valid locally but were
/// refused by the server, e.g. one that expired while the request was in
/// flight. Never retries.
pub struct ErrorInterceptor {
    store: Arc<dyn TokenStore>,
    navigator: Arc<dyn NavigationPort>,
}

impl ErrorInterceptor {
    pub fn new(store: Arc<dyn TokenStore>, navigator: Arc<dyn NavigationPort>) -> Self {
        Self { store, navigator }
    }
}

impl Interceptor for ErrorInterceptor {
    fn name(&self) -> &'static str {
        "error"
    }

    fn on_response(&self, ctx: &RequestContext, response: &Response) {
        let Some(error) = response.unauthenticated_error() else {
            return;
        };

        if self.navigator.current_route().is_login() {
            debug!(operation = %ctx.operation.name, "Unauthenticated response while at login, ignoring");
            return;
        }

        warn!(
            operation = %ctx.operation.name,
            message = %error.message,
            "Received UNAUTHENTICATED error, logging out"
        );
        auth::teardown(self.store.as_ref(), self.navigator.as_ref());
    }
}
