//! Ordered interceptor chain around the transport.

use std::sync::Arc;

use tracing::debug;

use super::auth_link::AuthMiddleware;
use super::error_link::ErrorInterceptor;
use super::interceptor::{Interceptor, RequestContext};
use super::operation::Operation;
use super::response::Response;
use super::transport::Transport;
use super::PipelineError;
use crate::auth::TokenStore;
use crate::navigation::NavigationPort;

/// Every operation the application sends goes through here.
///
/// Request phase: interceptors in insertion order, then the transport.
/// Response phase: interceptors in reverse order, for delivered responses
/// only. Nothing is retried.
pub struct RequestPipeline {
    interceptors: Vec<Box<dyn Interceptor>>,
    transport: Arc<dyn Transport>,
}

impl RequestPipeline {
    pub fn builder(transport: Arc<dyn Transport>) -> PipelineBuilder {
        PipelineBuilder {
            interceptors: Vec::new(),
            transport,
        }
    }

    /// Error interceptor, then auth middleware, then transport.
    pub fn standard(
        store: Arc<dyn TokenStore>,
        navigator: Arc<dyn NavigationPort>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self::builder(transport)
            .interceptor(ErrorInterceptor::new(store.clone(), navigator.clone()))
            .interceptor(AuthMiddleware::new(store, navigator))
            .build()
    }

    /// Interceptor names in request-phase order
    pub fn interceptor_names(&self) -> Vec<&'static str> {
        self.interceptors.iter().map(|i| i.name()).collect()
    }

    pub async fn execute(&self, operation: Operation) -> Result<Response, PipelineError> {
        let mut ctx = RequestContext::new(operation);

        for interceptor in &self.interceptors {
            interceptor.on_request(&mut ctx)?;
        }

        debug!(operation = %ctx.operation.name, "Dispatching operation");
        let response = self.transport.send(&ctx.operation, &ctx.headers).await?;

        for interceptor in self.interceptors.iter().rev() {
            interceptor.on_response(&ctx, &response);
        }

        if response.has_errors() {
            debug!(
                operation = %ctx.operation.name,
                errors = response.errors.len(),
                "Response carried application errors"
            );
        }
        Ok(response)
    }
}

pub struct PipelineBuilder {
    interceptors: Vec<Box<dyn Interceptor>>,
    transport: Arc<dyn Transport>,
}

impl PipelineBuilder {
    pub fn interceptor(mut self, interceptor: impl Interceptor + 'static) -> Self {
        self.interceptors.push(Box::new(interceptor));
        self
    }

    pub fn build(self) -> RequestPipeline {
        RequestPipeline {
            interceptors: self.interceptors,
            transport: self.transport,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::{Duration, Utc};
    use reqwest::header::{self, HeaderMap};
    use serde_json::json;

    use crate::api::error::{CancelReason, TransportError};
    use crate::auth::token::tests::token_expiring_at;
    use crate::auth::{MemoryTokenStore, Session, UserProfile};
    use crate::navigation::tests::RecordingNavigator;
    use crate::navigation::Route;

    /// Transport that records what it was asked to send and replies from a queue
    #[derive(Default)]
    pub(crate) struct FakeTransport {
        pub(crate) sent: Mutex<Vec<(Operation, HeaderMap)>>,
        replies: Mutex<Vec<Response>>,
    }

    impl FakeTransport {
        pub(crate) fn replying(replies: Vec<serde_json::Value>) -> Self {
            let mut replies: Vec<Response> = replies
                .into_iter()
                .map(|r| serde_json::from_value(r).unwrap())
                .collect();
            replies.reverse();
            Self {
                sent: Mutex::new(Vec::new()),
                replies: Mutex::new(replies),
            }
        }

        pub(crate) fn calls(&self) -> usize {
            self.sent.lock().unwrap().len()
        }

        pub(crate) fn last_headers(&self) -> HeaderMap {
            self.sent.lock().unwrap().last().unwrap().1.clone()
        }

        pub(crate) fn last_operation(&self) -> Operation {
            self.sent.lock().unwrap().last().unwrap().0.clone()
        }
    }

    #[async_trait]
    impl Transport for FakeTransport {
        async fn send(&self, operation: &Operation, headers: &HeaderMap) -> Result<Response, TransportError> {
            self.sent.lock().unwrap().push((operation.clone(), headers.clone()));
            Ok(self.replies.lock().unwrap().pop().unwrap_or_default())
        }
    }

    struct Recording {
        name: &'static str,
        log: Arc<Mutex<Vec<String>>>,
        fail: bool,
    }

    impl Interceptor for Recording {
        fn name(&self) -> &'static str {
            self.name
        }

        fn on_request(&self, _ctx: &mut RequestContext) -> Result<(), PipelineError> {
            self.log.lock().unwrap().push(format!("request:{}", self.name));
            if self.fail {
                return Err(PipelineError::Cancelled(CancelReason::NoSession));
            }
            Ok(())
        }

        fn on_response(&self, _ctx: &RequestContext, _response: &Response) {
            self.log.lock().unwrap().push(format!("response:{}", self.name));
        }
    }

    fn recording(name: &'static str, log: &Arc<Mutex<Vec<String>>>, fail: bool) -> Recording {
        Recording {
            name,
            log: log.clone(),
            fail,
        }
    }

    pub(crate) fn user() -> UserProfile {
        UserProfile {
            id: "65f1".to_string(),
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
        }
    }

    #[tokio::test]
    async fn test_response_phase_runs_in_reverse() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let transport = Arc::new(FakeTransport::default());
        let pipeline = RequestPipeline::builder(transport.clone())
            .interceptor(recording("first", &log, false))
            .interceptor(recording("second", &log, false))
            .build();

        pipeline.execute(Operation::new("Op", "q")).await.unwrap();

        assert_eq!(
            *log.lock().unwrap(),
            vec!["request:first", "request:second", "response:second", "response:first"]
        );
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test]
    async fn test_failed_request_phase_stops_chain() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let transport = Arc::new(FakeTransport::default());
        let pipeline = RequestPipeline::builder(transport.clone())
            .interceptor(recording("first", &log, true))
            .interceptor(recording("second", &log, false))
            .build();

        assert!(pipeline.execute(Operation::new("Op", "q")).await.is_err());
        assert_eq!(*log.lock().unwrap(), vec!["request:first"]);
        assert_eq!(transport.calls(), 0);
    }

    /// Adds a header on the way out and checks it is still there on the way back
    struct Stamping {
        seen_on_response: Arc<Mutex<Option<String>>>,
    }

    impl Interceptor for Stamping {
        fn name(&self) -> &'static str {
            "stamp"
        }

        fn on_request(&self, ctx: &mut RequestContext) -> Result<(), PipelineError> {
            ctx.headers
                .insert("x-request-stamp", header::HeaderValue::from_static("abc123"));
            Ok(())
        }

        fn on_response(&self, ctx: &RequestContext, _response: &Response) {
            let stamp = ctx
                .headers
                .get("x-request-stamp")
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            *self.seen_on_response.lock().unwrap() = stamp;
        }
    }

    #[tokio::test]
    async fn test_context_headers_reach_transport_and_response_phase() {
        let seen = Arc::new(Mutex::new(None));
        let transport = Arc::new(FakeTransport::default());
        let pipeline = RequestPipeline::builder(transport.clone())
            .interceptor(Stamping {
                seen_on_response: seen.clone(),
            })
            .build();

        pipeline.execute(Operation::new("Op", "q")).await.unwrap();

        assert_eq!(transport.last_headers().get("x-request-stamp").unwrap(), "abc123");
        assert_eq!(seen.lock().unwrap().as_deref(), Some("abc123"));
    }

    #[test]
    fn test_standard_order() {
        let pipeline = RequestPipeline::standard(
            Arc::new(MemoryTokenStore::new()),
            Arc::new(RecordingNavigator::at(Route::Dashboard)),
            Arc::new(FakeTransport::default()),
        );
        assert_eq!(pipeline.interceptor_names(), vec!["error", "auth"]);
    }

    #[tokio::test]
    async fn test_no_session_never_reaches_transport() {
        let transport = Arc::new(FakeTransport::default());
        let nav = Arc::new(RecordingNavigator::at(Route::Dashboard));
        let pipeline = RequestPipeline::standard(
            Arc::new(MemoryTokenStore::new()),
            nav.clone(),
            transport.clone(),
        );

        for name in ["GetFacilitiesByUser", "GetFacilityById", "DeleteFacility"] {
            let err = pipeline.execute(Operation::new(name, "q")).await.unwrap_err();
            assert!(err.is_session_error());
        }
        assert_eq!(transport.calls(), 0);
        assert_eq!(nav.current_route(), Route::Login);
    }

    #[tokio::test]
    async fn test_expired_session_never_reaches_transport() {
        let transport = Arc::new(FakeTransport::default());
        let store = Arc::new(MemoryTokenStore::with_session(Session::new(
            token_expiring_at(Utc::now() - Duration::seconds(1)),
            user(),
        )));
        let pipeline = RequestPipeline::standard(
            store.clone(),
            Arc::new(RecordingNavigator::at(Route::Dashboard)),
            transport.clone(),
        );

        let err = pipeline.execute(Operation::new("Op", "q")).await.unwrap_err();
        assert!(matches!(err, PipelineError::Cancelled(CancelReason::SessionExpired)));
        assert_eq!(transport.calls(), 0);
        assert_eq!(store.get().unwrap(), None);
    }

    #[tokio::test]
    async fn test_valid_session_sends_bearer() {
        let token = token_expiring_at(Utc::now() + Duration::seconds(3600));
        let transport = Arc::new(FakeTransport::default());
        let pipeline = RequestPipeline::standard(
            Arc::new(MemoryTokenStore::with_session(Session::new(token.clone(), user()))),
            Arc::new(RecordingNavigator::at(Route::Dashboard)),
            transport.clone(),
        );

        pipeline.execute(Operation::new("Op", "q")).await.unwrap();
        assert_eq!(
            transport.last_headers().get(header::AUTHORIZATION).unwrap(),
            &format!("Bearer {}", token)
        );
    }

    #[tokio::test]
    async fn test_unauthenticated_response_tears_down_once() {
        let token = token_expiring_at(Utc::now() + Duration::seconds(3600));
        let unauthenticated = json!({
            "data": null,
            "errors": [{ "message": "Unauthorized", "extensions": { "code": "UNAUTHENTICATED" } }]
        });
        let transport = Arc::new(FakeTransport::replying(vec![unauthenticated.clone(), unauthenticated]));
        let store = Arc::new(MemoryTokenStore::with_session(Session::new(token, user())));
        let nav = Arc::new(RecordingNavigator::at(Route::Facility("f1".to_string())));
        let pipeline = RequestPipeline::standard(store.clone(), nav.clone(), transport.clone());

        // The error is still delivered to the caller
        let response = pipeline.execute(Operation::new("Op", "q")).await.unwrap();
        assert!(response.unauthenticated_error().is_some());
        assert_eq!(store.get().unwrap(), None);
        assert_eq!(nav.visits(), vec![Route::Login]);

        // A second in-flight reply lands at login: no further change
        let second = pipeline.execute(Operation::new("Login", "m").public()).await.unwrap();
        assert!(second.has_errors());
        assert_eq!(nav.visits(), vec![Route::Login]);
        assert_eq!(transport.calls(), 2);
    }
}
