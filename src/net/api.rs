//! REST access to the auth and labs services.
//!
//! ARCHITECTURE
//! ============
//! Flows talk to the backend through the [`LabApi`] trait; `HttpLabApi` is
//! the `reqwest` implementation and tests substitute mocks. Authenticated
//! calls read the bearer token from durable storage on every request, so a
//! fresh login is picked up without rebuilding the client.
//!
//! ERROR HANDLING
//! ==============
//! No retries and no extra timeout layer beyond the HTTP client's own. A
//! missing token is not an error here: the request goes out without an
//! `Authorization` header and the backend decides.

use std::sync::Arc;

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::Serialize;

use super::types::{
    Analysis, Choice, Laboratory, LoginRequest, LoginResponse, Patient, ProfileUpdate, RegisterRequest, Reservation,
    ReservationPayload, embedded_list, one_or_many,
};
use crate::config::ClientConfig;
use crate::storage::{DurableStore, TOKEN_KEY};

// =============================================================================
// ERROR
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Transport failure: connection refused, DNS, timeout, body read.
    #[error("request failed: {0}")]
    Request(String),

    /// The backend answered with a non-success status.
    #[error("server responded with status {status}")]
    Status { status: u16, body: String },

    /// The response body did not match the expected shape.
    #[error("response parse failed: {0}")]
    Parse(String),

    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),
}

impl ApiError {
    /// `true` for 401/403, i.e. the backend rejected who we are.
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Status { status: 401 | 403, .. })
    }

    /// The `message` field of a JSON error body, if the backend sent one.
    #[must_use]
    pub fn backend_message(&self) -> Option<String> {
        let Self::Status { body, .. } = self else {
            return None;
        };
        serde_json::from_str::<serde_json::Value>(body)
            .ok()
            .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_owned))
            .filter(|m| !m.is_empty())
    }

    /// Human-readable message, preferring the backend's `message` field.
    #[must_use]
    pub fn user_message(&self) -> String {
        self.backend_message().unwrap_or_else(|| self.to_string())
    }
}

// =============================================================================
// TRAIT
// =============================================================================

/// Backend operations used by the client flows. Enables mocking in tests.
#[async_trait::async_trait]
pub trait LabApi: Send + Sync {
    /// `POST /api/auth/login`.
    async fn login(&self, request: &LoginRequest) -> Result<LoginResponse, ApiError>;

    /// `PUT /api/usuarios/{user_id}`.
    async fn update_profile(&self, user_id: &str, update: &ProfileUpdate) -> Result<(), ApiError>;

    /// `POST /api/usuarios`.
    async fn register(&self, request: &RegisterRequest) -> Result<(), ApiError>;

    /// `GET /api/areas`.
    async fn list_areas(&self) -> Result<Vec<Choice>, ApiError>;

    /// `GET /api/roles`.
    async fn list_roles(&self) -> Result<Vec<Choice>, ApiError>;

    /// `GET /api/laboratorios`.
    async fn list_laboratories(&self) -> Result<Vec<Laboratory>, ApiError>;

    /// `GET /api/analisis`.
    async fn list_analyses(&self) -> Result<Vec<Analysis>, ApiError>;

    /// `GET /api/paciente`.
    async fn list_patients(&self) -> Result<Vec<Patient>, ApiError>;

    /// `GET /api/asignacion_lab/usuario/{user_id}`.
    async fn list_reservations(&self, user_id: &str) -> Result<Vec<Reservation>, ApiError>;

    /// `POST /api/asignacion_lab`.
    async fn create_reservation(&self, payload: &ReservationPayload) -> Result<(), ApiError>;
}

// =============================================================================
// ENDPOINTS / HEADERS
// =============================================================================

fn login_endpoint(auth_url: &str) -> String {
    format!("{auth_url}/api/auth/login")
}

fn users_endpoint(auth_url: &str) -> String {
    format!("{auth_url}/api/usuarios")
}

fn user_endpoint(auth_url: &str, user_id: &str) -> String {
    format!("{auth_url}/api/usuarios/{user_id}")
}

fn reservations_endpoint(labs_url: &str) -> String {
    format!("{labs_url}/api/asignacion_lab")
}

fn user_reservations_endpoint(labs_url: &str, user_id: &str) -> String {
    format!("{labs_url}/api/asignacion_lab/usuario/{user_id}")
}

/// Read the stored bearer token, treating blank and unreadable as absent.
#[must_use]
pub fn stored_token(storage: &dyn DurableStore) -> Option<String> {
    match storage.get(TOKEN_KEY) {
        Ok(token) => token.filter(|t| !t.trim().is_empty()),
        Err(e) => {
            tracing::warn!(error = %e, "failed to read access token");
            None
        }
    }
}

/// Headers for an authenticated call. Without a token the map is empty.
#[must_use]
pub fn auth_headers(token: Option<&str>) -> HeaderMap {
    let mut headers = HeaderMap::new();
    let Some(token) = token else {
        return headers;
    };
    match HeaderValue::from_str(&format!("Bearer {token}")) {
        Ok(value) => {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
            headers.insert(AUTHORIZATION, value);
        }
        Err(_) => tracing::warn!("stored access token is not a valid header value; sending without it"),
    }
    headers
}

// =============================================================================
// HTTP CLIENT
// =============================================================================

/// `reqwest`-backed [`LabApi`].
pub struct HttpLabApi {
    http: reqwest::Client,
    labs_url: String,
    auth_url: String,
    storage: Arc<dyn DurableStore>,
}

impl HttpLabApi {
    /// Build a client for the configured services.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::HttpClientBuild`] if the HTTP client fails to build.
    pub fn new(config: &ClientConfig, storage: Arc<dyn DurableStore>) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeouts.request())
            .connect_timeout(config.timeouts.connect())
            .build()
            .map_err(|e| ApiError::HttpClientBuild(e.to_string()))?;
        Ok(Self { http, labs_url: config.labs_url.clone(), auth_url: config.auth_url.clone(), storage })
    }

    fn headers(&self) -> HeaderMap {
        auth_headers(stored_token(self.storage.as_ref()).as_deref())
    }

    async fn get_json(&self, url: String, authenticated: bool) -> Result<serde_json::Value, ApiError> {
        let mut req = self.http.get(&url);
        if authenticated {
            req = req.headers(self.headers());
        }
        let text = Self::settle(req.send().await).await?;
        if text.trim().is_empty() {
            return Ok(serde_json::Value::Null);
        }
        serde_json::from_str(&text).map_err(|e| ApiError::Parse(e.to_string()))
    }

    async fn send_json(
        &self,
        method: reqwest::Method,
        url: String,
        body: &impl Serialize,
        authenticated: bool,
    ) -> Result<String, ApiError> {
        let mut req = self.http.request(method, &url).json(body);
        if authenticated {
            req = req.headers(self.headers());
        }
        Self::settle(req.send().await).await
    }

    async fn settle(sent: Result<reqwest::Response, reqwest::Error>) -> Result<String, ApiError> {
        let response = sent.map_err(|e| ApiError::Request(e.to_string()))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ApiError::Request(e.to_string()))?;
        if !status.is_success() {
            return Err(ApiError::Status { status: status.as_u16(), body: text });
        }
        Ok(text)
    }

    async fn hal_list<T: serde::de::DeserializeOwned>(
        &self,
        url: String,
        list_name: &str,
        authenticated: bool,
    ) -> Result<Vec<T>, ApiError> {
        let body = self.get_json(url, authenticated).await?;
        embedded_list(body, list_name).map_err(|e| ApiError::Parse(e.to_string()))
    }
}

#[async_trait::async_trait]
impl LabApi for HttpLabApi {
    async fn login(&self, request: &LoginRequest) -> Result<LoginResponse, ApiError> {
        let text = self
            .send_json(reqwest::Method::POST, login_endpoint(&self.auth_url), request, false)
            .await?;
        serde_json::from_str(&text).map_err(|e| ApiError::Parse(e.to_string()))
    }

    async fn update_profile(&self, user_id: &str, update: &ProfileUpdate) -> Result<(), ApiError> {
        self.send_json(reqwest::Method::PUT, user_endpoint(&self.auth_url, user_id), update, true)
            .await?;
        Ok(())
    }

    async fn register(&self, request: &RegisterRequest) -> Result<(), ApiError> {
        self.send_json(reqwest::Method::POST, users_endpoint(&self.auth_url), request, false)
            .await?;
        Ok(())
    }

    async fn list_areas(&self) -> Result<Vec<Choice>, ApiError> {
        self.hal_list(format!("{}/api/areas", self.auth_url), "areaList", false)
            .await
    }

    async fn list_roles(&self) -> Result<Vec<Choice>, ApiError> {
        self.hal_list(format!("{}/api/roles", self.auth_url), "rolList", false)
            .await
    }

    async fn list_laboratories(&self) -> Result<Vec<Laboratory>, ApiError> {
        self.hal_list(format!("{}/api/laboratorios", self.labs_url), "laboratorioList", true)
            .await
    }

    async fn list_analyses(&self) -> Result<Vec<Analysis>, ApiError> {
        self.hal_list(format!("{}/api/analisis", self.labs_url), "analisisList", true)
            .await
    }

    async fn list_patients(&self) -> Result<Vec<Patient>, ApiError> {
        self.hal_list(format!("{}/api/paciente", self.labs_url), "pacienteList", true)
            .await
    }

    async fn list_reservations(&self, user_id: &str) -> Result<Vec<Reservation>, ApiError> {
        let body = self
            .get_json(user_reservations_endpoint(&self.labs_url, user_id), true)
            .await?;
        one_or_many(body).map_err(|e| ApiError::Parse(e.to_string()))
    }

    async fn create_reservation(&self, payload: &ReservationPayload) -> Result<(), ApiError> {
        self.send_json(reqwest::Method::POST, reservations_endpoint(&self.labs_url), payload, true)
            .await?;
        Ok(())
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================


#[cfg(test)]
#[path = "api_test.rs"]
mod tests;
