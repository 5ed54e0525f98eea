use reqwest::header::HeaderMap;

use super::operation::Operation;
use super::response::Response;
use super::PipelineError;

/// An operation plus the headers accumulated for it so far.
#[derive(Debug)]
pub struct RequestContext {
    pub operation: Operation,
    pub headers: HeaderMap,
}

impl RequestContext {
    pub fn new(operation: Operation) -> Self {
        Self {
            operation,
            headers: HeaderMap::new(),
        }
    }
}

/// One stage of the request pipeline.
///
/// `on_request` runs before dispatch in pipeline order and may stop the
/// operation by returning an error. `on_response` runs for delivered
/// responses in reverse pipeline order.
pub trait Interceptor: Send + Sync {
    fn name(&self) -> &'static str;

    fn on_request(&self, _ctx: &mut RequestContext) -> Result<(), PipelineError> {
        Ok(())
    }

    fn on_response(&self, _ctx: &RequestContext, _response: &Response) {}
}
