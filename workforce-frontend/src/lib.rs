pub mod config;
pub mod middleware;
pub mod models;
pub mod services;
pub mod startup;
pub mod state;

use state::{NotificationStore, SessionContext};

/// Client state shared between the session layer and its readers.
#[derive(Clone, Default)]
pub struct AppContext {
    pub session: SessionContext,
    pub notifications: NotificationStore,
}

impl AppContext {
    pub fn new() -> Self {
        Self::default()
    }
}
