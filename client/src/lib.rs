//! In-Paw-Dia API client
//!
//! Keeps the session's token pair in a [`TokenStore`] and refreshes an expired
//! access token transparently, with at most one refresh in flight no matter
//! how many requests hit a 401 at once.

pub mod client;
pub mod config;
pub mod error;
pub mod interceptor;
pub mod models;
pub mod token_store;
pub mod transport;

pub use client::{ApiClient, SessionState};
pub use config::ClientConfig;
pub use error::{ClientError, StorageError};
pub use interceptor::{RefreshCoordinator, RefreshLease, Ticket};
pub use models::{TokenPair, User, UserRole};
pub use token_store::{FileTokenStore, MemoryTokenStore, TokenStore};
pub use transport::{ApiRequest, ApiResponse, ReqwestTransport, Transport};
