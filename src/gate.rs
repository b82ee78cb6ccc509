#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Route {
    Dashboard,
    Clients,
    Deals,
    Analytics,
    Profile,
    Login,
    Register,
    ForgotPassword,
    ResetPassword,
}

impl Route {
    /// Routes reachable from the sidebar once logged in.
    pub const NAVIGATION: [Route; 5] = [
        Route::Dashboard,
        Route::Clients,
        Route::Deals,
        Route::Analytics,
        Route::Profile,
    ];

    pub fn is_public(self) -> bool {
        matches!(
            self,
            Route::Login | Route::Register | Route::ForgotPassword | Route::ResetPassword
        )
    }

    pub fn path(self) -> &'static str {
        match self {
            Route::Dashboard => "/",
            Route::Clients => "/clients",
            Route::Deals => "/deals",
            Route::Analytics => "/analytics",
            Route::Profile => "/profile",
            Route::Login => "/login",
            Route::Register => "/register",
            Route::ForgotPassword => "/forgot-password",
            Route::ResetPassword => "/reset-password",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Route::Dashboard => "Dashboard",
            Route::Clients => "Clients",
            Route::Deals => "Deals",
            Route::Analytics => "Analytics",
            Route::Profile => "Profile",
            Route::Login => "Sign in",
            Route::Register => "Register",
            Route::ForgotPassword => "Forgot password",
            Route::ResetPassword => "Reset password",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GateDecision {
    Allow,
    /// Carries the originally requested route so login can return to it.
    RedirectToLogin { callback: Route },
    RedirectHome,
}

impl GateDecision {
    pub fn target(self, requested: Route) -> Route {
        match self {
            GateDecision::Allow => requested,
            GateDecision::RedirectToLogin { .. } => Route::Login,
            GateDecision::RedirectHome => Route::Dashboard,
        }
    }
}

/// Runs before any screen is shown, looking only at the mirrored token.
pub fn check(route: Route, cookie_token: Option<&str>) -> GateDecision {
    let authenticated = cookie_token.is_some_and(|t| !t.is_empty());
    match (authenticated, route.is_public()) {
        (false, false) => GateDecision::RedirectToLogin { callback: route },
        (true, true) => GateDecision::RedirectHome,
        _ => GateDecision::Allow,
    }
}
