/// Child views under `/dashboard`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DashboardView {
    Overview,
    Expenses,
    Categories,
}

/// Session state a route insists on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Login and registration: only reachable while logged out
    AnonymousOnly,
    /// Dashboard and descendants: only reachable while logged in
    AuthenticatedOnly,
}

/// The application's route table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    /// `/`, the anonymous entry point
    Login,
    /// `/register`
    Register,
    /// `/dashboard` and its children
    Dashboard(DashboardView),
}

impl Route {
    pub const ALL: [Route; 5] = [
        Route::Login,
        Route::Register,
        Route::Dashboard(DashboardView::Overview),
        Route::Dashboard(DashboardView::Expenses),
        Route::Dashboard(DashboardView::Categories),
    ];

    /// Where logged-out users are sent
    pub const fn entry() -> Self {
        Route::Login
    }

    /// Where logged-in users are sent
    pub const fn dashboard_root() -> Self {
        Route::Dashboard(DashboardView::Overview)
    }

    /// Resolve a location path. Query strings, fragments, trailing slashes
    /// and letter case are ignored.
    pub fn parse(path: &str) -> Option<Self> {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let segments: Vec<String> = path
            .split('/')
            .filter(|s| !s.is_empty())
            .map(str::to_ascii_lowercase)
            .collect();

        match segments.iter().map(String::as_str).collect::<Vec<_>>().as_slice() {
            [] => Some(Route::Login),
            ["register"] => Some(Route::Register),
            ["dashboard"] => Some(Route::Dashboard(DashboardView::Overview)),
            ["dashboard", "expense"] => Some(Route::Dashboard(DashboardView::Expenses)),
            ["dashboard", "category"] => Some(Route::Dashboard(DashboardView::Categories)),
            _ => None,
        }
    }

    pub fn path(&self) -> &'static str {
        match self {
            Route::Login => "/",
            Route::Register => "/register",
            Route::Dashboard(DashboardView::Overview) => "/dashboard",
            Route::Dashboard(DashboardView::Expenses) => "/dashboard/expense/",
            Route::Dashboard(DashboardView::Categories) => "/dashboard/category/",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Route::Login => "login",
            Route::Register => "register",
            Route::Dashboard(DashboardView::Overview) => "Overview",
            Route::Dashboard(DashboardView::Expenses) => "Expense",
            Route::Dashboard(DashboardView::Categories) => "Category",
        }
    }

    pub fn access(&self) -> Access {
        match self {
            Route::Login | Route::Register => Access::AnonymousOnly,
            Route::Dashboard(_) => Access::AuthenticatedOnly,
        }
    }
}

impl std::fmt::Display for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.path())
    }
}
