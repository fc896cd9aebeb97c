//! Core library for userdesk.
//!
//! Talks to the user-management API, keeps the session token on disk or in
//! the OS keychain, and tracks who is signed in.
//!
//! ```no_run
//! # async fn run() -> anyhow::Result<()> {
//! use userdesk_core::api::ApiClient;
//! use userdesk_core::auth::{MemoryTokenStore, SessionCore};
//!
//! let session = SessionCore::new(ApiClient::new("http://localhost:8080/api")?, MemoryTokenStore::new());
//! session.hydrate().await;
//! session.login("admin@example.com", "secret").await?;
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod auth;
pub mod config;
pub mod models;

pub use api::{ApiClient, ApiError, UserApi};
pub use auth::{Access, AccessGate, HydrateOutcome, SessionCore, SessionError, SessionPhase, SessionState};
pub use config::Config;
pub use models::{AuthOutcome, Credential, Profile, ProfilePatch, ProfileUpdate};
