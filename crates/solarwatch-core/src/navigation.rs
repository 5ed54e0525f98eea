//! Route state shared between the pipeline and the UI.
//!
//! The pipeline never calls into view code. When it needs the user to sign
//! in again it moves the route to [`Route::Login`] through a
//! [`NavigationPort`]; the UI observes that by subscribing to the [`Router`].

use std::fmt;

use tokio::sync::watch;
use tracing::debug;

const LOGIN_PATH: &str = "/login";
const DASHBOARD_PATH: &str = "/";
const FACILITIES_PREFIX: &str = "/facilities/";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Login,
    Dashboard,
    CreateFacility,
    Facility(String),
    EditFacility(String),
    Other(String),
}

impl Route {
    /// Parse a location path into a route
    pub fn from_path(path: &str) -> Self {
        let trimmed = path.trim_end_matches('/');
        match trimmed {
            "" => return Route::Dashboard,
            LOGIN_PATH => return Route::Login,
            _ => {}
        }

        if let Some(rest) = trimmed.strip_prefix(FACILITIES_PREFIX) {
            let parts: Vec<&str> = rest.split('/').collect();
            match parts.as_slice() {
                ["create"] => return Route::CreateFacility,
                [id] if !id.is_empty() => return Route::Facility(id.to_string()),
                [id, "edit"] if !id.is_empty() => return Route::EditFacility(id.to_string()),
                _ => {}
            }
        }

        Route::Other(path.to_string())
    }

    pub fn path(&self) -> String {
        match self {
            Route::Login => LOGIN_PATH.to_string(),
            Route::Dashboard => DASHBOARD_PATH.to_string(),
            Route::CreateFacility => format!("{}create", FACILITIES_PREFIX),
            Route::Facility(id) => format!("{}{}", FACILITIES_PREFIX, id),
            Route::EditFacility(id) => format!("{}{}/edit", FACILITIES_PREFIX, id),
            Route::Other(path) => path.clone(),
        }
    }

    pub fn is_login(&self) -> bool {
        matches!(self, Route::Login)
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

/// Capability to read and change the current route.
pub trait NavigationPort: Send + Sync {
    fn current_route(&self) -> Route;

    fn navigate(&self, route: Route);
}

/// Production navigator backed by a watch channel.
///
/// Subscribers are only woken when the route actually changes, so repeated
/// redirects to login produce a single notification.
pub struct Router {
    tx: watch::Sender<Route>,
}

impl Router {
    pub fn new(initial: Route) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx }
    }

    pub fn subscribe(&self) -> watch::Receiver<Route> {
        self.tx.subscribe()
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new(Route::Dashboard)
    }
}

impl NavigationPort for Router {
    fn current_route(&self) -> Route {
        self.tx.borrow().clone()
    }

    fn navigate(&self, route: Route) {
        self.tx.send_if_modified(|current| {
            if *current == route {
                false
            } else {
                debug!(from = %current, to = %route, "Navigating");
                *current = route;
                true
            }
        });
    }
}

// ============================================================================
// Tests
// ============================================================================
