//! Core library for solarwatch.
//!
//! Every data operation the dashboard performs goes through the
//! [`api::RequestPipeline`]: an ordered chain of interceptors wrapped around
//! a single GraphQL endpoint. The pipeline owns the credential lifecycle:
//!
//! - `auth`: persisted session state, unsigned token expiry checks, teardown
//! - `api`: operations, interceptors, transport, typed facility API
//! - `navigation`: the route capability the pipeline uses to force a login
//! - `models`: facility and user data returned by the backend
//! - `config`: endpoint and storage configuration

pub mod api;
pub mod auth;
pub mod config;
pub mod models;
pub mod navigation;

pub use api::{Operation, PipelineError, RequestPipeline, SolarApi};
pub use auth::{Session, TokenStore, UserProfile};
pub use config::Config;
pub use navigation::{NavigationPort, Route, Router};
