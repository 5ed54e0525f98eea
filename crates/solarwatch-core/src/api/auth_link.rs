//! Attaches the bearer credential to outgoing operations.

use std::sync::Arc;

use reqwest::header::{self, HeaderValue};
use tracing::{debug, warn};

use super::error::CancelReason;
use super::interceptor::{Interceptor, RequestContext};
use super::operation::Access;
use super::PipelineError;
use crate::auth::{self, Session, TokenStore};
use crate::navigation::NavigationPort;

pub struct AuthMiddleware {
    store: Arc<dyn TokenStore>,
    navigator: Arc<dyn NavigationPort>,
}

impl AuthMiddleware {
    pub fn new(store: Arc<dyn TokenStore>, navigator: Arc<dyn NavigationPort>) -> Self {
        Self { store, navigator }
    }

    /// Current session, or `None` if it cannot be read
    fn snapshot(&self) -> Option<Session> {
        match self.store.get() {
            Ok(session) => session,
            Err(e) => {
                warn!(error = %e, "Failed to read session store");
                None
            }
        }
    }

    fn cancel(&self, ctx: &RequestContext, reason: CancelReason) -> PipelineError {
        warn!(operation = %ctx.operation.name, %reason, "Cancelling operation, logging out");
        auth::teardown(self.store.as_ref(), self.navigator.as_ref());
        PipelineError::Cancelled(reason)
    }
}

impl Interceptor for AuthMiddleware {
    fn name(&self) -> &'static str {
        "auth"
    }

    fn on_request(&self, ctx: &mut RequestContext) -> Result<(), PipelineError> {
        let public = ctx.operation.access == Access::Public;

        let session = match self.snapshot() {
            Some(session) => session,
            None if public => {
                debug!(operation = %ctx.operation.name, "Sending public operation anonymously");
                return Ok(());
            }
            None => return Err(self.cancel(ctx, CancelReason::NoSession)),
        };

        if session.is_expired() {
            if public {
                debug!(operation = %ctx.operation.name, "Dropping expired session before public operation");
                if let Err(e) = self.store.clear() {
                    warn!(error = %e, "Failed to clear session store");
                }
                return Ok(());
            }
            return Err(self.cancel(ctx, CancelReason::SessionExpired));
        }

        // A credential that cannot be a header value has no chance of being accepted
        match HeaderValue::from_str(&format!("Bearer {}", session.credential())) {
            Ok(value) => {
                ctx.headers.insert(header::AUTHORIZATION, value);
                Ok(())
            }
            Err(_) => Err(self.cancel(ctx, CancelReason::SessionExpired)),
        }
    }
}
