//! API client for the user-management REST API.
//!
//! This module provides the `ApiClient` struct. Every call goes through
//! [`ApiClient::request`], which attaches the bearer credential and turns
//! any failure into an [`ApiError`] with a displayable message.

use std::time::Duration;

use anyhow::Result;
use reqwest::{header, Client, Method, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

use crate::models::{
    AuthOutcome, AuthResponse, Credential, LoginRequest, Profile, ProfilePatch, RegisterRequest,
    UserResponse, UsersResponse,
};

use super::{ApiError, UserApi};

// ============================================================================
// Constants
// ============================================================================

/// Base URL used when neither config nor environment provide one.
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8080/api";

/// HTTP request timeout in seconds.
/// 30s allows for slow API responses while failing fast enough for good UX.
pub const REQUEST_TIMEOUT_SECS: u64 = 30;

/// API client for the user-management service.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    /// Create a new API client with the default timeout
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::with_timeout(base_url, Duration::from_secs(REQUEST_TIMEOUT_SECS))
    }

    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        let base_url = base_url.into().trim_end_matches('/').to_string();

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send a JSON request and decode the JSON response.
    ///
    /// An empty body (including `204 No Content`) decodes from `null`, which
    /// yields `()` for unit responses. Non-success statuses become [`ApiError::Status`] with the
    /// server's `error` message when one is present.
    pub async fn request<T, B>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        credential: Option<&Credential>,
    ) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let url = self.url(path);
        debug!(%method, url = %url, authenticated = credential.is_some(), "Sending request");

        let mut builder = self
            .client
            .request(method.clone(), &url)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(credential) = credential {
            builder = builder.bearer_auth(credential.as_str());
        }
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let err = ApiError::from_status(status, &body);
            warn!(%method, url = %url, status = status.as_u16(), error = %err, "Request failed");
            return Err(err);
        }

        let text = if status == StatusCode::NO_CONTENT {
            String::new()
        } else {
            response.text().await?
        };
        if text.trim().is_empty() {
            return serde_json::from_value(serde_json::Value::Null)
                .map_err(|e| ApiError::InvalidResponse(format!("{} (empty body from {})", e, path)));
        }

        serde_json::from_str(&text)
            .map_err(|e| ApiError::InvalidResponse(format!("{} (from {})", e, path)))
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        credential: Option<&Credential>,
    ) -> Result<T, ApiError> {
        self.request::<T, ()>(Method::GET, path, None, credential).await
    }

    async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
        credential: Option<&Credential>,
    ) -> Result<T, ApiError> {
        self.request(Method::POST, path, Some(body), credential).await
    }
}

impl UserApi for ApiClient {
    async fn login(&self, email: &str, password: &str) -> Result<AuthOutcome, ApiError> {
        let body = LoginRequest { email, password };
        let response: AuthResponse = self.post("/login", &body, None).await?;
        Ok(response.into())
    }

    async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<AuthOutcome, ApiError> {
        let body = RegisterRequest {
            name,
            email,
            password,
        };
        let response: AuthResponse = self.post("/register", &body, None).await?;
        Ok(response.into())
    }

    async fn fetch_profile(&self, credential: &Credential) -> Result<Profile, ApiError> {
        let response: UserResponse = self.get("/profile", Some(credential)).await?;
        Ok(response.user)
    }

    async fn list_users(&self, credential: &Credential) -> Result<Vec<Profile>, ApiError> {
        let response: UsersResponse = self.get("/users", Some(credential)).await?;
        Ok(response.users)
    }

    async fn fetch_user(&self, credential: &Credential, id: i64) -> Result<Profile, ApiError> {
        let response: UserResponse = self.get(&format!("/users/{}", id), Some(credential)).await?;
        Ok(response.user)
    }

    async fn update_user(
        &self,
        credential: &Credential,
        id: i64,
        patch: &ProfilePatch,
    ) -> Result<Profile, ApiError> {
        let response: UserResponse = self
            .request(Method::PUT, &format!("/users/{}", id), Some(patch), Some(credential))
            .await?;
        Ok(response.user)
    }

    async fn delete_user(&self, credential: &Credential, id: i64) -> Result<(), ApiError> {
        self.request::<(), ()>(Method::DELETE, &format!("/users/{}", id), None, Some(credential))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn user_json(id: i64, email: &str) -> serde_json::Value {
        json!({
            "id": id,
            "name": "Ada",
            "email": email,
            "createdAt": "2024-03-01T10:00:00Z",
            "updatedAt": "2024-03-01T10:00:00Z"
        })
    }

    fn client_for(server: &MockServer) -> ApiClient {
        ApiClient::new(format!("{}/api/", server.uri())).expect("Failed to build client")
    }

    #[tokio::test]
    async fn test_login_posts_json_and_parses_outcome() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/login"))
            .and(header("content-type", "application/json"))
            .and(body_json(json!({"email": "a@x.com", "password": "secret"})))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"token": "tok1", "user": user_json(1, "a@x.com")})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let outcome = client.login("a@x.com", "secret").await.unwrap();

        assert_eq!(outcome.credential.as_str(), "tok1");
        assert_eq!(outcome.profile.id, 1);
    }

    #[tokio::test]
    async fn test_profile_sends_bearer_credential() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/profile"))
            .and(header("authorization", "Bearer tok1"))
            .and(header("content-type", "application/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"user": user_json(1, "a@x.com")})))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let profile = client.fetch_profile(&Credential::new("tok1")).await.unwrap();
        assert_eq!(profile.email, "a@x.com");
    }

    #[tokio::test]
    async fn test_error_payload_message_is_surfaced() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/login"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({"error": "invalid credentials"})))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client.login("a@x.com", "wrong").await.unwrap_err();

        assert_eq!(err.to_string(), "invalid credentials");
        assert!(err.is_unauthorized());
    }

    #[tokio::test]
    async fn test_unparseable_error_falls_back_to_generic_message() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/users"))
            .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client.list_users(&Credential::new("tok1")).await.unwrap_err();

        assert_eq!(err.to_string(), "Request failed");
        assert_eq!(err.status(), Some(StatusCode::INTERNAL_SERVER_ERROR));
    }

    #[tokio::test]
    async fn test_delete_no_content_yields_unit() {
        let server = MockServer::start().await;

        Mock::given(method("DELETE"))
            .and(path("/api/users/4"))
            .and(header("authorization", "Bearer tok1"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        client.delete_user(&Credential::new("tok1"), 4).await.unwrap();
    }

    #[tokio::test]
    async fn test_update_sends_only_patch_fields() {
        let server = MockServer::start().await;

        Mock::given(method("PUT"))
            .and(path("/api/users/1"))
            .and(body_json(json!({"email": "new@x.com"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"user": user_json(1, "new@x.com")})))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let patch = ProfilePatch {
            email: Some("new@x.com".to_string()),
            ..Default::default()
        };
        let echoed = client.update_user(&Credential::new("tok1"), 1, &patch).await.unwrap();
        assert_eq!(echoed.email, "new@x.com");
    }

    #[tokio::test]
    async fn test_list_users_and_fetch_user() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/users"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "users": [user_json(1, "a@x.com"), user_json(2, "b@x.com")]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/users/2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"user": user_json(2, "b@x.com")})))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let credential = Credential::new("tok1");

        let users = client.list_users(&credential).await.unwrap();
        assert_eq!(users.len(), 2);
        assert_eq!(users[1].email, "b@x.com");

        let user = client.fetch_user(&credential, 2).await.unwrap();
        assert_eq!(user.id, 2);
    }

    #[tokio::test]
    async fn test_malformed_success_body_is_invalid_response() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/profile"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client.fetch_profile(&Credential::new("tok1")).await.unwrap_err();
        assert!(matches!(err, ApiError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_connection_failure_is_network_error() {
        // Reserve a port, then release it so nothing is listening there.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let client =
            ApiClient::with_timeout(format!("http://127.0.0.1:{}/api", port), Duration::from_secs(2)).unwrap();
        let err = client.login("a@x.com", "secret").await.unwrap_err();
        assert!(matches!(err, ApiError::Network(_)));
    }

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let client = ApiClient::new("http://localhost:8080/api/").unwrap();
        assert_eq!(client.base_url(), "http://localhost:8080/api");
        assert_eq!(client.url("/login"), "http://localhost:8080/api/login");
    }
}
