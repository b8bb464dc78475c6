use std::sync::Arc;

use tracing::{debug, warn};

use super::resources::{CategoryResource, ExpenseResource, OverviewResource, Resource};
use super::store::{DataStore, FetchHandle, LoadingTracker, StoreError};
use crate::api::ApiClient;
use crate::auth::KeyValueStore;
use crate::events::{Channel, EventBus, SubscriptionId};
use crate::router::DashboardView;

pub type CategoryStore = DataStore<CategoryResource>;
pub type ExpenseStore = DataStore<ExpenseResource>;
pub type OverviewStore = DataStore<OverviewResource>;

/// The dashboard's stores plus the bus wiring that keeps them in step.
///
/// - `updated` refetches expenses and the overview aggregates
/// - `updated-category` refetches categories
///
/// The three stores share one loading bracket.
///
/// The wiring is removed when the `Dashboard` is dropped.
pub struct Dashboard {
    pub categories: CategoryStore,
    pub expenses: ExpenseStore,
    pub overview: OverviewStore,
    bus: EventBus,
    subscriptions: Vec<(Channel, SubscriptionId)>,
}

/// Start a detached refetch if a runtime is available to run it on.
fn refetch<R: Resource>(store: &DataStore<R>) {
    if tokio::runtime::Handle::try_current().is_err() {
        warn!(store = R::NAME, "No async runtime, skipping refetch");
        return;
    }
    debug!(store = R::NAME, "Refetch triggered by change signal");
    store.spawn_fetch().detach();
}

impl Dashboard {
    pub fn new(api: ApiClient, credentials: Arc<dyn KeyValueStore>, bus: EventBus) -> Self {
        let loading = LoadingTracker::new();
        let categories = CategoryStore::with_tracker(
            api.clone(),
            credentials.clone(),
            bus.clone(),
            loading.clone(),
        );
        let expenses =
            ExpenseStore::with_tracker(api.clone(), credentials.clone(), bus.clone(), loading.clone());
        let overview = OverviewStore::with_tracker(api, credentials, bus.clone(), loading);

        let on_updated = {
            let expenses = expenses.clone();
            let overview = overview.clone();
            bus.on(Channel::Updated, move |_| {
                refetch(&expenses);
                refetch(&overview);
            })
        };
        let on_category_updated = {
            let categories = categories.clone();
            bus.on(Channel::UpdatedCategory, move |_| refetch(&categories))
        };

        Self {
            categories,
            expenses,
            overview,
            bus,
            subscriptions: vec![
                (Channel::Updated, on_updated),
                (Channel::UpdatedCategory, on_category_updated),
            ],
        }
    }

    /// Fetch what `view` displays, concurrently, and wait for all of it.
    /// Every fetch runs to completion; the first error is returned.
    pub async fn refresh(&self, view: DashboardView) -> Result<(), StoreError> {
        match view {
            DashboardView::Overview => {
                let (overview, categories) =
                    futures::join!(self.overview.fetch(), self.categories.fetch());
                overview?;
                categories?;
            }
            DashboardView::Expenses => {
                let (expenses, categories) =
                    futures::join!(self.expenses.fetch(), self.categories.fetch());
                expenses?;
                categories?;
            }
            DashboardView::Categories => {
                self.categories.fetch().await?;
            }
        }
        Ok(())
    }

    /// Fetch every store concurrently
    pub async fn refresh_all(&self) -> Result<(), StoreError> {
        let (categories, expenses, overview) = futures::join!(
            self.categories.fetch(),
            self.expenses.fetch(),
            self.overview.fetch()
        );
        categories?;
        expenses?;
        overview?;
        Ok(())
    }

    /// Start background fetches for `view`. Dropping the handles (for
    /// example when the view is left) cancels whatever is still in flight.
    ///
    /// # Panics
    /// Panics when called outside a Tokio runtime.
    pub fn mount(&self, view: DashboardView) -> Vec<FetchHandle> {
        match view {
            DashboardView::Overview => {
                vec![self.overview.spawn_fetch(), self.categories.spawn_fetch()]
            }
            DashboardView::Expenses => {
                vec![self.expenses.spawn_fetch(), self.categories.spawn_fetch()]
            }
            DashboardView::Categories => vec![self.categories.spawn_fetch()],
        }
    }

}

impl Drop for Dashboard {
    fn drop(&mut self) {
        for (channel, id) in self.subscriptions.drain(..) {
            self.bus.off(channel, id);
        }
    }
}

impl std::fmt::Debug for Dashboard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dashboard")
            .field("categories", &self.categories)
            .field("expenses", &self.expenses)
            .field("overview", &self.overview)
            .finish_non_exhaustive()
    }
}
