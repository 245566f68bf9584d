pub mod auth;
pub mod config;
pub mod core;
pub mod transport;

// Re-export commonly used items for convenience
pub use auth::{AuthError, AuthenticatedTransport, Credentials, TokenSource};
pub use config::{ClientConfig, ConfigError};
pub use core::*;
pub use transport::{HttpTransport, ReqwestTransport, TransportError};
