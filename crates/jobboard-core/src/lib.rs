// Library root for the job board client core: configuration, the session and
// its persistence, and the typed domain models.

pub mod config;
pub mod models;
pub mod session;
pub mod store;

pub use config::{Config, ConfigError, Endpoints};
pub use session::Session;
pub use store::{SessionStore, StoreError};
