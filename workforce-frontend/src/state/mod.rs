//! Client-side state owned by the session layer and read by the UI.
//!
//! Each piece lives in a `watch` channel: one writer, any number of readers.

pub mod notifications;
pub mod session;

pub use notifications::{NotificationState, NotificationStore};
pub use session::{InitStatus, InitializationState, SessionContext, SessionSnapshot};
