//! Route access gate derived from the session snapshot.

use crate::models::{ApplicationUser, UserRole};
use crate::state::InitializationState;

pub const LOGIN_PATH: &str = "/login";
pub const DASHBOARD_PATH: &str = "/dashboard";
pub const ADMIN_PATH: &str = "/admin";

/// Three-state signal consumed by the navigation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessGate {
    /// Initialisation still pending; no navigation decision yet.
    Unknown,
    Unauthenticated,
    Authenticated(UserRole),
}

impl AccessGate {
    pub fn from_state(init: &InitializationState, user: Option<&ApplicationUser>) -> Self {
        if !init.is_ready() {
            return AccessGate::Unknown;
        }
        match user {
            Some(user) => AccessGate::Authenticated(user.role),
            None => AccessGate::Unauthenticated,
        }
    }

    /// Where an authenticated user lands when opening the app root.
    pub fn landing_path(&self) -> Option<&'static str> {
        match self {
            AccessGate::Unknown => None,
            AccessGate::Unauthenticated => Some(LOGIN_PATH),
            AccessGate::Authenticated(UserRole::Admin) => Some(ADMIN_PATH),
            AccessGate::Authenticated(_) => Some(DASHBOARD_PATH),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteAccess {
    Public,
    Protected,
    AdminOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationDecision {
    /// Render the loading affordance.
    Loading,
    Allow,
    Redirect(&'static str),
    NotFound,
}

pub fn authorize(gate: AccessGate, access: RouteAccess) -> NavigationDecision {
    match (gate, access) {
        (AccessGate::Unknown, _) => NavigationDecision::Loading,
        (_, RouteAccess::Public) => NavigationDecision::Allow,
        (AccessGate::Unauthenticated, _) => NavigationDecision::Redirect(LOGIN_PATH),
        (AccessGate::Authenticated(UserRole::Admin), _) => NavigationDecision::Allow,
        (AccessGate::Authenticated(_), RouteAccess::AdminOnly) => {
            NavigationDecision::Redirect(DASHBOARD_PATH)
        }
        (AccessGate::Authenticated(_), RouteAccess::Protected) => NavigationDecision::Allow,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Landing,
    Login,
    Register,
    Admin,
    Dashboard,
    Tasks,
    Projects,
    Departments,
    Users,
    Profile,
    NotFound,
}

impl Route {
    pub fn from_path(path: &str) -> Self {
        let path = path.split(&['?', '#'][..]).next().unwrap_or_default();
        let trimmed = path.trim_end_matches('/');

        match trimmed {
            "" => Route::Landing,
            "/login" => Route::Login,
            "/register" => Route::Register,
            "/admin" => Route::Admin,
            "/dashboard" => Route::Dashboard,
            "/tasks" => Route::Tasks,
            "/projects" => Route::Projects,
            "/departments" => Route::Departments,
            "/users" => Route::Users,
            "/profile" => Route::Profile,
            other if other.starts_with("/admin/") => Route::Admin,
            _ => Route::NotFound,
        }
    }

    pub fn access(&self) -> RouteAccess {
        match self {
            Route::Landing | Route::Login | Route::Register | Route::NotFound => RouteAccess::Public,
            Route::Admin => RouteAccess::AdminOnly,
            Route::Dashboard
            | Route::Tasks
            | Route::Projects
            | Route::Departments
            | Route::Users
            | Route::Profile => RouteAccess::Protected,
        }
    }
}

/// Decide what the shell should do when asked to show `path`.
pub fn navigate(gate: AccessGate, path: &str) -> NavigationDecision {
    if gate == AccessGate::Unknown {
        return NavigationDecision::Loading;
    }

    match Route::from_path(path) {
        Route::Landing => match gate.landing_path() {
            Some(target) => NavigationDecision::Redirect(target),
            None => NavigationDecision::Loading,
        },
        Route::NotFound => NavigationDecision::NotFound,
        route => authorize(gate, route.access()),
    }
}
