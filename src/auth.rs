//! Credential login, logout and profile updates.
//!
//! DESIGN
//! ======
//! `AuthGateway` turns a credential pair into a [`Session`]. On success the
//! bearer token is stored under its own key first, then the session is
//! pushed through the [`SessionStore`] (which writes it through to durable
//! storage). Any failure leaves both untouched.
//!
//! `login` never reads the current session, so concurrent calls are safe;
//! keeping one attempt per form in flight is the form's job ([`LoginForm`]).

use std::sync::Arc;

use crate::net::api::{ApiError, LabApi};
use crate::net::types::{LoginRequest, LoginResponse, ProfileUpdate};
use crate::session::{Session, SessionStore};
use crate::storage::{StorageError, TOKEN_KEY};
use crate::ui::{ADMIN_ROUTE, Navigator, PROFILE_ROUTE};

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("user name and password are required")]
    MissingCredentials,
    #[error("invalid credentials")]
    Rejected,
    #[error("no active session")]
    NotLoggedIn,
    #[error(transparent)]
    Api(ApiError),
    #[error("failed to persist access token: {0}")]
    Storage(#[from] StorageError),
}

impl From<ApiError> for AuthError {
    fn from(e: ApiError) -> Self {
        if e.is_unauthorized() { Self::Rejected } else { Self::Api(e) }
    }
}

/// Build the session descriptor for a successful login.
#[must_use]
pub fn session_from_login(resp: LoginResponse) -> Session {
    Session {
        logged_in: true,
        role: resp.role_name,
        user_id: resp.user_id,
        user_name: resp.user_name,
        first_name: resp.first_name,
        last_name: resp.last_name,
        email: resp.email,
        area: resp.area_name.filter(|a| !a.trim().is_empty()),
        token: resp.access_token,
    }
}

/// Where a freshly logged-in user lands: admins on the admin page, everyone
/// else on their profile.
#[must_use]
pub fn landing_route(session: &Session) -> &'static str {
    if session.is_admin() { ADMIN_ROUTE } else { PROFILE_ROUTE }
}

// =============================================================================
// GATEWAY
// =============================================================================

#[derive(Clone)]
pub struct AuthGateway {
    api: Arc<dyn LabApi>,
    sessions: SessionStore,
}

impl AuthGateway {
    #[must_use]
    pub fn new(api: Arc<dyn LabApi>, sessions: SessionStore) -> Self {
        Self { api, sessions }
    }

    /// Authenticate and install the resulting session.
    ///
    /// # Errors
    ///
    /// - [`AuthError::MissingCredentials`] if either field is blank (no request is sent)
    /// - [`AuthError::Rejected`] if the backend answers 401/403
    /// - [`AuthError::Api`] for any other transport or server failure
    /// - [`AuthError::Storage`] if the token cannot be persisted
    pub async fn login(&self, user_name: &str, password: &str) -> Result<Session, AuthError> {
        let user_name = user_name.trim();
        if user_name.is_empty() || password.is_empty() {
            return Err(AuthError::MissingCredentials);
        }

        let request = LoginRequest { user_name: user_name.to_owned(), password: password.to_owned() };
        let resp = match self.api.login(&request).await {
            Ok(resp) => resp,
            Err(e) => {
                let err = AuthError::from(e);
                match &err {
                    AuthError::Rejected => tracing::info!(user_name, "login rejected"),
                    other => tracing::warn!(user_name, error = %other, "login failed"),
                }
                return Err(err);
            }
        };

        self.sessions.storage().set(TOKEN_KEY, &resp.access_token)?;
        let session = session_from_login(resp);
        tracing::info!(user_id = %session.user_id, role = %session.role_key(), "login succeeded");
        self.sessions.set(Some(session.clone()));
        Ok(session)
    }

    /// Drop the session. The stored token is left in place.
    pub fn logout(&self) {
        if let Some(s) = self.sessions.current() {
            tracing::info!(user_id = %s.user_id, "logout");
        }
        self.sessions.set(None);
    }

    /// Push profile edits to the backend and refresh the stored session.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::NotLoggedIn`] without a session carrying a user
    /// id, or the mapped [`ApiError`] if the update fails.
    pub async fn update_profile(&self, update: ProfileUpdate) -> Result<Session, AuthError> {
        let Some(mut session) = self.sessions.current() else {
            return Err(AuthError::NotLoggedIn);
        };
        let Some(user_id) = session.user_id().map(str::to_owned) else {
            return Err(AuthError::NotLoggedIn);
        };

        self.api.update_profile(&user_id, &update).await?;

        session.first_name = update.first_name;
        session.last_name = update.last_name;
        session.email = update.email;
        self.sessions.set(Some(session.clone()));
        tracing::info!(user_id = %user_id, "profile updated");
        Ok(session)
    }
}

// =============================================================================
// LOGIN FORM
// =============================================================================

/// Login screen state: the two inputs, a pending flag raised while the
/// request is in flight, and the error flag shown under the form.
#[derive(Debug, Default, Clone)]
pub struct LoginForm {
    pub user_name: String,
    pub password: String,
    pending: bool,
    error: bool,
}

impl LoginForm {
    #[must_use]
    pub fn new(user_name: &str, password: &str) -> Self {
        Self { user_name: user_name.to_owned(), password: password.to_owned(), ..Self::default() }
    }

    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.pending
    }

    #[must_use]
    pub fn has_error(&self) -> bool {
        self.error
    }

    /// Submit the credentials; on success navigate to the landing route.
    ///
    /// `pending` is only set for the duration of the request so a renderer
    /// can disable the button; the `&mut` borrow already rules out a second
    /// concurrent submit on the same form.
    pub async fn submit(&mut self, gateway: &AuthGateway, navigator: &dyn Navigator) -> Option<Session> {
        self.error = false;
        self.pending = true;
        let result = gateway.login(&self.user_name, &self.password).await;
        self.pending = false;

        match result {
            Ok(session) => {
                navigator.navigate(landing_route(&session));
                Some(session)
            }
            Err(_) => {
                self.error = true;
                None
            }
        }
    }
}

#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;
