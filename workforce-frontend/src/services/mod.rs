pub mod error;
pub mod initializer;
pub mod notifications;
pub mod provider;
pub mod registration;
pub mod rest_provider;
pub mod shell;
pub mod subscription;
pub mod token_store;

pub use error::{ProviderError, ResolutionFailure, SessionError};
pub use initializer::{SessionHandle, SessionInitializer};
pub use provider::{AuthEvent, AuthEventKind, AuthEventStream, AuthProvider, RowQuery};
pub use shell::{ClientShell, StoreShell};
pub use subscription::Subscription;
pub use token_store::{FileTokenStore, MemoryTokenStore, TokenStore};
