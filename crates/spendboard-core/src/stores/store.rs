use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::resources::Resource;
use crate::api::{ApiClient, ApiError};
use crate::auth::{KeyValueStore, TOKEN_KEY};
use crate::events::{Event, EventBus};
use crate::models::ValidationError;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Not logged in - no token stored")]
    MissingToken,

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("Response failed validation: {0}")]
    Invalid(#[from] ValidationError),

    #[error("Fetch superseded by a newer request")]
    Superseded,
}

/// Shared count of fetches in flight.
///
/// Stores sharing a tracker announce one loading bracket for any overlap:
/// `loading-state: true` when the first fetch starts and `false` when the
/// last one ends.
#[derive(Debug, Clone, Default)]
pub struct LoadingTracker {
    in_flight: Arc<AtomicUsize>,
}

impl LoadingTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    fn begin<'a>(&'a self, bus: &'a EventBus) -> LoadingGuard<'a> {
        if self.in_flight.fetch_add(1, Ordering::SeqCst) == 0 {
            bus.emit(Event::LoadingState(true));
        }
        LoadingGuard { tracker: self, bus }
    }
}

/// Ends one fetch's share of the loading bracket when dropped, so an aborted
/// fetch still closes it.
struct LoadingGuard<'a> {
    tracker: &'a LoadingTracker,
    bus: &'a EventBus,
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        if self.tracker.in_flight.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.bus.emit(Event::LoadingState(false));
        }
    }
}

struct StoreInner<R: Resource> {
    api: ApiClient,
    credentials: Arc<dyn KeyValueStore>,
    bus: EventBus,
    loading: LoadingTracker,
    cache: watch::Sender<Arc<R::Data>>,
    generation: AtomicU64,
}

/// Reactive cache for one API resource.
///
/// `fetch` reads the bearer token from the credential store on every call,
/// replaces the cached value, then announces it on the bus. A failed fetch
/// resets the cache to empty and announces nothing. Clones share one cache.
pub struct DataStore<R: Resource> {
    inner: Arc<StoreInner<R>>,
}

impl<R: Resource> Clone for DataStore<R> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<R: Resource> DataStore<R> {
    pub fn new(api: ApiClient, credentials: Arc<dyn KeyValueStore>, bus: EventBus) -> Self {
        Self::with_tracker(api, credentials, bus, LoadingTracker::new())
    }

    /// Like `new`, sharing `loading` with other stores.
    pub fn with_tracker(
        api: ApiClient,
        credentials: Arc<dyn KeyValueStore>,
        bus: EventBus,
        loading: LoadingTracker,
    ) -> Self {
        let (cache, _) = watch::channel(Arc::new(R::Data::default()));
        Self {
            inner: Arc::new(StoreInner {
                api,
                credentials,
                bus,
                loading,
                cache,
                generation: AtomicU64::new(0),
            }),
        }
    }

    /// Currently cached value
    pub fn snapshot(&self) -> Arc<R::Data> {
        self.inner.cache.borrow().clone()
    }

    /// Receiver that observes every cache replacement
    pub fn subscribe(&self) -> watch::Receiver<Arc<R::Data>> {
        self.inner.cache.subscribe()
    }

    /// Fetch the resource and update the cache.
    ///
    /// If another fetch on this store starts before this one finishes, this
    /// one's result is dropped and `StoreError::Superseded` is returned.
    pub async fn fetch(&self) -> Result<Arc<R::Data>, StoreError> {
        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let _loading = self.inner.loading.begin(&self.inner.bus);

        let result = self.load().await;

        if self.inner.generation.load(Ordering::SeqCst) != generation {
            debug!(store = R::NAME, generation, "Discarding superseded fetch result");
            return Err(StoreError::Superseded);
        }

        match result {
            Ok(data) => {
                self.inner.cache.send_replace(data.clone());
                info!(store = R::NAME, "Fetched");
                self.inner.bus.emit(R::completed(data.clone()));
                Ok(data)
            }
            Err(e) => {
                error!(store = R::NAME, error = %e, "Fetch failed");
                self.inner.cache.send_replace(Arc::new(R::Data::default()));
                Err(e)
            }
        }
    }

    async fn load(&self) -> Result<Arc<R::Data>, StoreError> {
        let token = match self.inner.credentials.get(TOKEN_KEY) {
            Ok(token) => token,
            Err(e) => {
                warn!(store = R::NAME, error = %e, "Failed to read token");
                None
            }
        };
        let token = token.ok_or(StoreError::MissingToken)?;

        let raw = self.inner.api.get_json(R::ENDPOINT, &token).await?;
        Ok(Arc::new(R::decode(raw)?))
    }

    /// Run `fetch` as a background task.
    ///
    /// The returned handle cancels the task when dropped; call
    /// [`FetchHandle::detach`] to let it run unobserved.
    ///
    /// # Panics
    /// Panics when called outside a Tokio runtime.
    pub fn spawn_fetch(&self) -> FetchHandle {
        let store = self.clone();
        let task = tokio::spawn(async move {
            if let Err(e) = store.fetch().await {
                debug!(store = R::NAME, error = %e, "Background fetch finished without data");
            }
        });
        FetchHandle {
            name: R::NAME,
            task: Some(task),
        }
    }
}

impl<R: Resource> std::fmt::Debug for DataStore<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataStore")
            .field("resource", &R::NAME)
            .field("generation", &self.inner.generation.load(Ordering::Relaxed))
            .finish()
    }
}

/// Handle to a background fetch, tied to the lifetime of whoever holds it.
#[must_use = "dropping a FetchHandle cancels the fetch; call detach() to let it run"]
#[derive(Debug)]
pub struct FetchHandle {
    name: &'static str,
    task: Option<JoinHandle<()>>,
}

impl FetchHandle {
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Abort the fetch. Its result, if any arrives, is never applied.
    pub fn cancel(mut self) {
        if let Some(task) = self.task.take() {
            debug!(store = self.name, "Cancelling fetch");
            task.abort();
        }
    }

    /// Let the fetch run to completion without holding on to it.
    pub fn detach(mut self) {
        self.task.take();
    }

    /// Wait for the fetch to finish.
    pub async fn join(mut self) {
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                if e.is_panic() {
                    error!(store = self.name, "Fetch task panicked");
                }
            }
        }
    }
}

impl Drop for FetchHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::MemoryStore;
    use crate::events::Channel;
    use crate::models::Category;
    use crate::stores::resources::{CategoryResource, ExpenseResource};
    use serde_json::json;
    use std::sync::Mutex;
    use std::time::Duration;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn categories_body() -> serde_json::Value {
        json!([
            {"id": 1, "name": "Food", "icon": "Utensils"},
            {"id": 2, "name": "Transport", "icon": "Bus"}
        ])
    }

    fn setup(server: &MockServer, token: Option<&str>) -> (Arc<MemoryStore>, EventBus, DataStore<CategoryResource>) {
        let credentials = Arc::new(MemoryStore::new());
        if let Some(token) = token {
            credentials.set(TOKEN_KEY, token).unwrap();
        }
        let bus = EventBus::new();
        let api = ApiClient::new(&server.uri(), None).unwrap();
        let store = DataStore::new(api, credentials.clone(), bus.clone());
        (credentials, bus, store)
    }

    fn record(bus: &EventBus, channel: Channel) -> Arc<Mutex<Vec<Event>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        bus.on(channel, move |e| sink.lock().unwrap().push(e.clone()));
        seen
    }

    #[tokio::test]
    async fn test_fetch_success_updates_cache_then_emits() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/categories"))
            .and(header("authorization", "Bearer tok123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(categories_body()))
            .expect(1)
            .mount(&server)
            .await;

        let (_, bus, store) = setup(&server, Some("tok123"));

        // The cache must already hold the new data when the event arrives
        let cached_at_emit = Arc::new(Mutex::new(None));
        let observer = store.clone();
        let slot = cached_at_emit.clone();
        bus.on(Channel::CategoryData, move |e| {
            if let Event::CategoryData(data) = e {
                *slot.lock().unwrap() = Some(Arc::ptr_eq(data, &observer.snapshot()));
            }
        });
        let loading = record(&bus, Channel::LoadingState);

        let data = store.fetch().await.unwrap();
        assert_eq!(data.len(), 2);
        assert_eq!(store.snapshot()[0].name, "Food");
        assert_eq!(*cached_at_emit.lock().unwrap(), Some(true));

        let loading = loading.lock().unwrap();
        assert!(matches!(loading[..], [Event::LoadingState(true), Event::LoadingState(false)]));
    }

    #[tokio::test]
    async fn test_fetch_failure_resets_cache_and_stays_silent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/categories"))
            .respond_with(ResponseTemplate::new(200).set_body_json(categories_body()))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/categories"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let (_, bus, store) = setup(&server, Some("tok123"));
        store.fetch().await.unwrap();
        assert_eq!(store.snapshot().len(), 2);

        let events = record(&bus, Channel::CategoryData);
        let err = store.fetch().await.unwrap_err();
        assert!(matches!(err, StoreError::Api(ApiError::ServerError(_))));
        assert!(store.snapshot().is_empty());
        assert!(events.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_fetch_without_token_skips_network() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(categories_body()))
            .expect(0)
            .mount(&server)
            .await;

        let (_, bus, store) = setup(&server, None);
        let events = record(&bus, Channel::CategoryData);

        assert!(matches!(store.fetch().await, Err(StoreError::MissingToken)));
        assert!(events.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_fetch_rereads_token_every_call() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/categories"))
            .and(header("authorization", "Bearer old"))
            .respond_with(ResponseTemplate::new(200).set_body_json(categories_body()))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/categories"))
            .and(header("authorization", "Bearer new"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(1)
            .mount(&server)
            .await;

        let (credentials, _, store) = setup(&server, Some("old"));
        assert_eq!(store.fetch().await.unwrap().len(), 2);

        credentials.set(TOKEN_KEY, "new").unwrap();
        assert!(store.fetch().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_shape_is_a_failed_fetch() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/expenses"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"title": "no date"}])))
            .mount(&server)
            .await;

        let credentials = Arc::new(MemoryStore::new());
        credentials.set(TOKEN_KEY, "tok").unwrap();
        let bus = EventBus::new();
        let events = record(&bus, Channel::ExpenseData);
        let api = ApiClient::new(&server.uri(), None).unwrap();
        let store: DataStore<ExpenseResource> = DataStore::new(api, credentials, bus);

        assert!(matches!(store.fetch().await, Err(StoreError::Invalid(_))));
        assert!(store.snapshot().is_empty());
        assert!(events.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_subscribers_observe_cache_replacement() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/categories"))
            .respond_with(ResponseTemplate::new(200).set_body_json(categories_body()))
            .mount(&server)
            .await;

        let (_, _, store) = setup(&server, Some("tok"));
        let mut rx = store.subscribe();
        assert!(rx.borrow().is_empty());

        let handle = store.spawn_fetch();
        rx.changed().await.unwrap();
        let names: Vec<String> = rx.borrow().iter().map(|c: &Category| c.name.clone()).collect();
        assert_eq!(names, vec!["Food", "Transport"]);
        handle.join().await;
    }

    #[tokio::test]
    async fn test_cancelled_fetch_never_applies() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/categories"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(categories_body())
                    .set_delay(Duration::from_millis(300)),
            )
            .mount(&server)
            .await;

        let (_, bus, store) = setup(&server, Some("tok"));
        let events = record(&bus, Channel::CategoryData);
        let loading = record(&bus, Channel::LoadingState);

        let handle = store.spawn_fetch();
        tokio::time::sleep(Duration::from_millis(50)).await;
        handle.cancel();
        tokio::time::sleep(Duration::from_millis(500)).await;

        assert!(store.snapshot().is_empty());
        assert!(events.lock().unwrap().is_empty());
        // The loading bracket is closed even though the task was aborted
        assert!(matches!(loading.lock().unwrap().last(), Some(Event::LoadingState(false))));
    }

    #[tokio::test]
    async fn test_superseded_fetch_is_discarded() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/categories"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!([{"name": "Stale", "icon": "Clock"}]))
                    .set_delay(Duration::from_millis(300)),
            )
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/categories"))
            .respond_with(ResponseTemplate::new(200).set_body_json(categories_body()))
            .mount(&server)
            .await;

        let (_, _, store) = setup(&server, Some("tok"));
        let slow = store.clone();
        let first = tokio::spawn(async move { slow.fetch().await });
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(store.fetch().await.unwrap().len(), 2);
        assert!(matches!(first.await.unwrap(), Err(StoreError::Superseded)));
        assert_eq!(store.snapshot()[0].name, "Food");
    }

    #[tokio::test]
    async fn test_overlapping_fetches_share_one_loading_bracket() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/categories"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(categories_body())
                    .set_delay(Duration::from_millis(100)),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/expenses"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let credentials = Arc::new(MemoryStore::new());
        credentials.set(TOKEN_KEY, "tok").unwrap();
        let bus = EventBus::new();
        let api = ApiClient::new(&server.uri(), None).unwrap();
        let tracker = LoadingTracker::new();
        let categories: DataStore<CategoryResource> =
            DataStore::with_tracker(api.clone(), credentials.clone(), bus.clone(), tracker.clone());
        let expenses: DataStore<ExpenseResource> =
            DataStore::with_tracker(api, credentials, bus.clone(), tracker.clone());
        let loading = record(&bus, Channel::LoadingState);

        let (a, b) = futures::join!(categories.fetch(), expenses.fetch());
        a.unwrap();
        b.unwrap();

        assert_eq!(tracker.in_flight(), 0);
        let loading = loading.lock().unwrap();
        assert!(matches!(loading[..], [Event::LoadingState(true), Event::LoadingState(false)]));
    }

    #[tokio::test]
    async fn test_cancelled_fetch_releases_tracker() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/categories"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(categories_body())
                    .set_delay(Duration::from_millis(300)),
            )
            .mount(&server)
            .await;

        let credentials = Arc::new(MemoryStore::new());
        credentials.set(TOKEN_KEY, "tok").unwrap();
        let api = ApiClient::new(&server.uri(), None).unwrap();
        let tracker = LoadingTracker::new();
        let store: DataStore<CategoryResource> =
            DataStore::with_tracker(api, credentials, EventBus::new(), tracker.clone());

        let handle = store.spawn_fetch();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(tracker.in_flight(), 1);
        drop(handle);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(tracker.in_flight(), 0);
    }
}
