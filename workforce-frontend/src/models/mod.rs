pub mod notification;
pub mod profile;
pub mod session;
pub mod user;

pub use notification::{Notification, NotificationKind};
pub use profile::ProfileRecord;
pub use session::{Session, SessionMetadata};
pub use user::{ApplicationUser, UserRole};
