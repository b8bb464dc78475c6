use super::route::{Access, Route};
use crate::auth::Session;

/// Outcome of evaluating a route's guard
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    Proceed,
    Redirect(Route),
}

/// Decide whether navigation to `route` may complete.
///
/// Reads only the in-memory session; never touches storage or the network,
/// and never calls `check_expiry` itself.
pub fn guard(route: Route, session: &Session) -> GuardDecision {
    decide(route.access(), session.is_authenticated())
}

fn decide(access: Access, authenticated: bool) -> GuardDecision {
    match (access, authenticated) {
        (Access::AnonymousOnly, true) => GuardDecision::Redirect(Route::dashboard_root()),
        (Access::AuthenticatedOnly, false) => GuardDecision::Redirect(Route::entry()),
        _ => GuardDecision::Proceed,
    }
}
