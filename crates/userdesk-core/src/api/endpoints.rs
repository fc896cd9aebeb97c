use std::future::Future;

use crate::models::{AuthOutcome, Credential, Profile, ProfilePatch};

use super::ApiError;

/// The user-management endpoints the session core depends on.
///
/// `ApiClient` implements this over HTTP. Tests substitute in-memory
/// implementations so session behaviour can be exercised without a server.
pub trait UserApi: Send + Sync {
    /// `POST /login`
    fn login(
        &self,
        email: &str,
        password: &str,
    ) -> impl Future<Output = Result<AuthOutcome, ApiError>> + Send;

    /// `POST /register`
    fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> impl Future<Output = Result<AuthOutcome, ApiError>> + Send;

    /// `GET /profile`
    fn fetch_profile(
        &self,
        credential: &Credential,
    ) -> impl Future<Output = Result<Profile, ApiError>> + Send;

    /// `GET /users`
    fn list_users(
        &self,
        credential: &Credential,
    ) -> impl Future<Output = Result<Vec<Profile>, ApiError>> + Send;

    /// `GET /users/{id}`
    fn fetch_user(
        &self,
        credential: &Credential,
        id: i64,
    ) -> impl Future<Output = Result<Profile, ApiError>> + Send;

    /// `PUT /users/{id}`. Returns the profile echoed by the server.
    fn update_user(
        &self,
        credential: &Credential,
        id: i64,
        patch: &ProfilePatch,
    ) -> impl Future<Output = Result<Profile, ApiError>> + Send;

    /// `DELETE /users/{id}`
    fn delete_user(
        &self,
        credential: &Credential,
        id: i64,
    ) -> impl Future<Output = Result<(), ApiError>> + Send;
}
