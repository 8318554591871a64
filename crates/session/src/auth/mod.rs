//! Session authentication state and token refresh

pub mod context;
pub mod errors;
pub mod events;
pub mod refresh;

pub use context::{SessionContext, SessionState, SessionStatus};
pub use errors::{ProfileFetchError, RefreshError};
pub use events::Subscription;
pub use refresh::{RefreshCoordinator, RefreshOutcome};
