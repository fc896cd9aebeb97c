//! REST API client module for the user-management service.
//!
//! This module provides the `ApiClient` for registering, logging in and
//! managing user accounts, and the `UserApi` trait the session core is
//! written against.
//!
//! The API uses JWT bearer token authentication. Tokens are obtained from
//! `/login` or `/register` and sent on every protected request.

pub mod client;
pub mod endpoints;
pub mod error;

pub use client::{ApiClient, DEFAULT_API_BASE_URL, REQUEST_TIMEOUT_SECS};
pub use endpoints::UserApi;
pub use error::{ApiError, GENERIC_FAILURE_MESSAGE};
