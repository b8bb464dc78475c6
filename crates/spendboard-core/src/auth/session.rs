use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use tracing::{debug, info, warn};

use super::clock::Clock;
use super::credentials::{KeyValueStore, EXPIRY_KEY, TOKEN_KEY, USER_KEY};
use crate::models::UserProfile;

/// Fixed session window granted by `login`.
const SESSION_WINDOW_HOURS: i64 = 24;

/// Which state the session machine is in right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No token
    Anonymous,
    /// Token and user present, not past expiry
    Authenticated,
    /// Token present but past expiry; collapses to `Anonymous` on the next
    /// `check_expiry`
    Expired,
}

/// Stored user record. Both fields are optional so that a partially written
/// or hand-edited record still hydrates.
#[derive(Debug, Default, Deserialize)]
struct StoredUser {
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    email: Option<String>,
}

/// Client-side session derived from the persisted credential record.
///
/// The in-memory fields are the source of truth for navigation guards; the
/// store is only consulted on hydrate, on `check_expiry` and when a token is
/// requested for an API call.
pub struct Session {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    username: Option<String>,
    email: Option<String>,
    is_authenticated: bool,
    expiry: Option<DateTime<Utc>>,
}

impl Session {
    /// Create a session and hydrate it from `store`.
    pub fn new(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        let mut session = Self {
            store,
            clock,
            username: None,
            email: None,
            is_authenticated: false,
            expiry: None,
        };
        session.hydrate();
        session
    }

    /// Rebuild in-memory state from the credential store. Never fails: any
    /// read error or malformed record degrades to empty fields.
    pub fn hydrate(&mut self) {
        let user = self
            .read(USER_KEY)
            .and_then(|raw| match serde_json::from_str::<Option<StoredUser>>(&raw) {
                Ok(user) => user,
                Err(e) => {
                    warn!(error = %e, "Stored user record is malformed, ignoring");
                    None
                }
            })
            .unwrap_or_default();

        self.username = user.username.filter(|s| !s.is_empty());
        self.email = user.email.filter(|s| !s.is_empty());
        self.is_authenticated = self.read(TOKEN_KEY).is_some();
        self.expiry = self.read_expiry();

        debug!(
            authenticated = self.is_authenticated,
            username = ?self.username,
            expiry = ?self.expiry,
            "Session hydrated"
        );
    }

    /// Start a session for `user` with `token`, valid for the fixed window.
    pub fn login(&mut self, user: &UserProfile, token: &str) {
        let expiry = self.clock.now() + Duration::hours(SESSION_WINDOW_HOURS);

        self.username = Some(user.username.clone());
        self.email = Some(user.email.clone());
        self.is_authenticated = true;
        self.expiry = Some(expiry);

        match serde_json::to_string(user) {
            Ok(json) => self.write(USER_KEY, &json),
            Err(e) => warn!(error = %e, "Failed to encode user record"),
        }
        self.write(TOKEN_KEY, token);
        self.write(EXPIRY_KEY, &expiry.timestamp_millis().to_string());

        info!(username = %user.username, %expiry, "Logged in");
    }

    /// End the session. Calling it while already anonymous is a no-op.
    pub fn logout(&mut self) {
        let was_authenticated = self.is_authenticated;

        self.username = None;
        self.email = None;
        self.is_authenticated = false;
        self.expiry = None;

        for key in [USER_KEY, TOKEN_KEY, EXPIRY_KEY] {
            if let Err(e) = self.store.remove(key) {
                warn!(key, error = %e, "Failed to remove credential");
            }
        }

        if was_authenticated {
            info!("Logged out");
        }
    }

    /// Log out if the persisted expiry has passed. Returns true when the
    /// session was ended by this call.
    pub fn check_expiry(&mut self) -> bool {
        match self.read_expiry() {
            Some(expiry) if self.clock.now() > expiry => {
                info!(%expiry, "Session expired");
                self.logout();
                true
            }
            _ => false,
        }
    }

    pub fn state(&self) -> SessionState {
        if !self.is_authenticated {
            return SessionState::Anonymous;
        }
        match self.expiry {
            Some(expiry) if self.clock.now() > expiry => SessionState::Expired,
            _ => SessionState::Authenticated,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.is_authenticated
    }

    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    pub fn expiry(&self) -> Option<DateTime<Utc>> {
        self.expiry
    }

    /// Current bearer token, read from the store on every call.
    pub fn token(&self) -> Option<String> {
        self.read(TOKEN_KEY)
    }

    pub fn time_until_expiry(&self) -> Option<Duration> {
        self.expiry.map(|expiry| expiry - self.clock.now())
    }

    /// Minutes remaining until expiry (for display)
    pub fn minutes_until_expiry(&self) -> Option<i64> {
        self.time_until_expiry().map(|d| d.num_minutes().max(0))
    }

    fn read(&self, key: &str) -> Option<String> {
        match self.store.get(key) {
            Ok(value) => value,
            Err(e) => {
                warn!(key, error = %e, "Failed to read credential");
                None
            }
        }
    }

    fn write(&self, key: &str, value: &str) {
        if let Err(e) = self.store.set(key, value) {
            warn!(key, error = %e, "Failed to persist credential");
        }
    }

    fn read_expiry(&self) -> Option<DateTime<Utc>> {
        let raw = self.read(EXPIRY_KEY)?;
        let parsed = raw
            .trim()
            .parse::<i64>()
            .ok()
            .and_then(DateTime::from_timestamp_millis);
        if parsed.is_none() {
            warn!(raw = %raw, "Stored expiry is not a millisecond timestamp, ignoring");
        }
        parsed
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("is_authenticated", &self.is_authenticated)
            .field("expiry", &self.expiry)
            .finish_non_exhaustive()
    }
}
