//! Authentication module for managing the user session.
//!
//! This module provides:
//! - `SessionCore`: the credential/profile state machine
//! - `AccessGate`: the signed-in check protected views consult
//! - `TokenStore`: persistence for the session token (file, OS keyring, memory)
//!
//! The token is persisted on every sign-in and cleared on sign-out or when
//! the server rejects it during hydration.

pub mod credentials;
pub mod error;
pub mod gate;
pub mod session;
pub mod state;
pub mod token_store;

pub use credentials::KeyringTokenStore;
pub use error::SessionError;
pub use gate::{Access, AccessGate};
pub use session::{HydrateOutcome, SessionCore, UpdateOutcome};
pub use state::{SessionPhase, SessionState};
pub use token_store::{FileTokenStore, MemoryTokenStore, TokenStore, TOKEN_KEY};
