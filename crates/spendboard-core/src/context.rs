//! Application context.
//!
//! One `AppContext` per running application holds the session, router, event
//! bus, API client and dashboard stores. Components receive it (or the piece
//! they need) explicitly instead of reaching for globals, so each test can
//! build a fresh one.

use std::sync::Arc;

use anyhow::{Context as _, Result};
use tracing::{debug, info};

use crate::api::{ApiClient, ApiError};
use crate::auth::{Clock, FileStore, KeyValueStore, KeyringStore, Session, SystemClock};
use crate::config::{Config, StorageBackend};
use crate::events::EventBus;
use crate::router::{Navigation, Route, Router};
use crate::stores::Dashboard;

pub struct AppContext {
    pub config: Config,
    pub session: Session,
    pub router: Router,
    pub bus: EventBus,
    pub api: ApiClient,
    pub dashboard: Dashboard,
}

impl AppContext {
    /// Build the context from `config`, opening the configured credential
    /// storage and the wall clock.
    pub fn new(config: Config) -> Result<Self> {
        let credentials: Arc<dyn KeyValueStore> = match config.storage_backend {
            StorageBackend::File => {
                let path = config.storage_path()?;
                debug!(path = %path.display(), "Using file credential storage");
                Arc::new(FileStore::open(path))
            }
            StorageBackend::Keyring => {
                debug!("Using keychain credential storage");
                Arc::new(KeyringStore::new())
            }
        };

        Self::with_parts(config, credentials, Arc::new(SystemClock))
            .context("Failed to create API client")
    }

    /// Build the context over explicit storage and clock.
    ///
    /// The session is hydrated and then checked for expiry, so a session that
    /// lapsed while the application was closed starts out logged out.
    pub fn with_parts(
        config: Config,
        credentials: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ApiError> {
        let api = ApiClient::new(&config.api_base_url(), config.request_timeout())?;
        let bus = EventBus::new();

        let mut session = Session::new(credentials.clone(), clock);
        session.check_expiry();

        let dashboard = Dashboard::new(api.clone(), credentials, bus.clone());
        let router = Router::new(config.check_expiry_on_navigate);

        Ok(Self {
            config,
            session,
            router,
            bus,
            api,
            dashboard,
        })
    }

    /// Navigate through the route guards
    pub fn navigate(&mut self, path: &str) -> Navigation {
        self.router.navigate(path, &mut self.session)
    }

    pub fn navigate_to(&mut self, route: Route) -> Navigation {
        self.router.navigate_to(route, &mut self.session)
    }

    /// Authenticate against the API and start a session.
    pub async fn login(&mut self, email: &str, password: &str) -> Result<(), ApiError> {
        let auth = self.api.authenticate(email, password).await?;
        self.session.login(&auth.user, &auth.token);
        self.config.last_email = Some(email.to_string());
        info!(username = %auth.user.username, "Authenticated");
        Ok(())
    }

    pub fn logout(&mut self) {
        self.session.logout();
    }
}

impl std::fmt::Debug for AppContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppContext")
            .field("session", &self.session)
            .field("router", &self.router)
            .field("dashboard", &self.dashboard)
            .finish_non_exhaustive()
    }
}
