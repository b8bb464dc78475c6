//! Guarded navigation.
//!
//! Every route declares whether it needs a logged-in or logged-out session.
//! The `Router` runs that guard before committing a transition and follows
//! any redirect through the guards again, all synchronously.

pub mod guard;
pub mod route;

use tracing::{debug, info, warn};

use crate::auth::Session;

pub use guard::{guard, GuardDecision};
pub use route::{Access, DashboardView, Route};

/// Upper bound on chained guard redirects for a single navigation
const MAX_REDIRECTS: usize = 5;

/// Result of a navigation attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    /// The requested route was committed
    Proceeded(Route),
    /// A guard sent the navigation elsewhere; `landed` was committed
    Redirected { requested: Route, landed: Route },
    /// No route matches the path; the current route is unchanged
    NotFound(String),
    /// Guards kept redirecting; the current route is unchanged
    Aborted { requested: Route },
}

impl Navigation {
    /// Route committed by this navigation, if any
    pub fn landed(&self) -> Option<Route> {
        match self {
            Navigation::Proceeded(route) => Some(*route),
            Navigation::Redirected { landed, .. } => Some(*landed),
            Navigation::NotFound(_) | Navigation::Aborted { .. } => None,
        }
    }
}

#[derive(Debug)]
pub struct Router {
    current: Option<Route>,
    check_expiry_on_navigate: bool,
}

impl Router {
    /// `check_expiry_on_navigate` runs `Session::check_expiry` before the
    /// guards see the session, so an expired session is never trusted.
    pub fn new(check_expiry_on_navigate: bool) -> Self {
        Self {
            current: None,
            check_expiry_on_navigate,
        }
    }

    pub fn current(&self) -> Option<Route> {
        self.current
    }

    /// Navigate to a location path
    pub fn navigate(&mut self, path: &str, session: &mut Session) -> Navigation {
        match Route::parse(path) {
            Some(route) => self.navigate_to(route, session),
            None => {
                warn!(path, "No route matches path");
                Navigation::NotFound(path.to_string())
            }
        }
    }

    pub fn navigate_to(&mut self, requested: Route, session: &mut Session) -> Navigation {
        if self.check_expiry_on_navigate {
            session.check_expiry();
        }

        let mut target = requested;
        for _ in 0..=MAX_REDIRECTS {
            match guard(target, session) {
                GuardDecision::Proceed => {
                    self.current = Some(target);
                    if target == requested {
                        debug!(route = %target, "Navigated");
                        return Navigation::Proceeded(target);
                    }
                    info!(requested = %requested, landed = %target, "Navigation redirected");
                    return Navigation::Redirected {
                        requested,
                        landed: target,
                    };
                }
                GuardDecision::Redirect(next) => {
                    debug!(from = %target, to = %next, "Guard redirect");
                    target = next;
                }
            }
        }

        warn!(requested = %requested, "Too many guard redirects, navigation aborted");
        Navigation::Aborted { requested }
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new(true)
    }
}
