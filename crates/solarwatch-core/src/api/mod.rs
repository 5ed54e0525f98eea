//! GraphQL API pipeline for the solar facility backend.
//!
//! All operations go to one endpoint through a [`RequestPipeline`]:
//! the [`ErrorInterceptor`] and [`AuthMiddleware`] wrap an
//! [`HttpTransport`]. The API uses JWT bearer authentication obtained from
//! the `login` and `signup` mutations.

pub mod auth_link;
pub mod client;
pub mod error;
pub mod error_link;
pub mod interceptor;
pub mod operation;
pub mod pipeline;
pub mod response;
pub mod transport;

pub use auth_link::AuthMiddleware;
pub use client::{FacilityUpdate, SolarApi};
pub use error::{CancelReason, PipelineError, TransportError};
pub use error_link::ErrorInterceptor;
pub use interceptor::{Interceptor, RequestContext};
pub use operation::{Access, Attachment, Operation, Upload};
pub use pipeline::{PipelineBuilder, RequestPipeline};
pub use response::{GraphQLError, Response, UNAUTHENTICATED};
pub use transport::{HttpTransport, Transport, PREFLIGHT_HEADER};
