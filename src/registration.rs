//! Self-service account registration.
//!
//! The form validates locally before anything is sent. Area and role
//! choices come from the auth service; unlike the reservation dropdowns
//! there is no placeholder fallback, the form reports the problem instead.

use std::collections::BTreeMap;

use crate::net::api::LabApi;
use crate::net::types::{Choice, RegisterRequest};
use crate::ui::{LOGIN_ROUTE, Navigator};

pub const MIN_USER_NAME_LEN: usize = 4;
pub const MIN_PASSWORD_LEN: usize = 4;

const MSG_OPTIONS_EMPTY: &str = "No se pudo cargar la información de áreas/roles.";
const MSG_OPTIONS_FAILED: &str = "Error de conexión al cargar datos iniciales.";
const MSG_INVALID: &str = "Revisa los campos, hay errores en el formulario.";
const MSG_REGISTERED: &str = "Usuario registrado con éxito. Ahora puedes iniciar sesión.";
const MSG_DEFAULT_CONFLICT: &str = "Usuario o email ya existen.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RegistrationField {
    FirstName,
    LastName,
    UserName,
    Email,
    Password,
    PasswordConfirmation,
    Area,
    Role,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationError {
    Required,
    TooShort { min: usize },
    InvalidEmail,
    PasswordMismatch,
}

/// `true` if there is a non-empty local part, an `@`, and a dot somewhere
/// after it with characters on both sides.
fn looks_like_email(value: &str) -> bool {
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain
            .split_once('.')
            .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty())
}

// =============================================================================
// FORM
// =============================================================================

#[derive(Debug, Clone, Default)]
pub struct RegistrationForm {
    pub first_name: String,
    pub last_name: String,
    pub user_name: String,
    pub email: String,
    pub password: String,
    pub password_confirmation: String,
    pub area_id: String,
    pub role_id: String,
    error: Option<String>,
    success: Option<String>,
}

impl RegistrationForm {
    /// Every failing field.
    #[must_use]
    pub fn validate(&self) -> BTreeMap<RegistrationField, RegistrationError> {
        use RegistrationError::{InvalidEmail, PasswordMismatch, Required, TooShort};
        use RegistrationField as F;

        let mut errors = BTreeMap::new();
        let required = [
            (F::FirstName, &self.first_name),
            (F::LastName, &self.last_name),
            (F::UserName, &self.user_name),
            (F::Email, &self.email),
            (F::Password, &self.password),
            (F::PasswordConfirmation, &self.password_confirmation),
            (F::Area, &self.area_id),
            (F::Role, &self.role_id),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                errors.insert(field, Required);
            }
        }

        if !errors.contains_key(&F::UserName) && self.user_name.trim().chars().count() < MIN_USER_NAME_LEN {
            errors.insert(F::UserName, TooShort { min: MIN_USER_NAME_LEN });
        }
        if !errors.contains_key(&F::Email) && !looks_like_email(self.email.trim()) {
            errors.insert(F::Email, InvalidEmail);
        }
        if !errors.contains_key(&F::Password) && self.password.chars().count() < MIN_PASSWORD_LEN {
            errors.insert(F::Password, TooShort { min: MIN_PASSWORD_LEN });
        }
        if !errors.contains_key(&F::PasswordConfirmation) && self.password != self.password_confirmation {
            errors.insert(F::PasswordConfirmation, PasswordMismatch);
        }
        errors
    }

    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    #[must_use]
    pub fn success(&self) -> Option<&str> {
        self.success.as_deref()
    }

    #[must_use]
    pub fn to_request(&self) -> RegisterRequest {
        RegisterRequest {
            first_name: self.first_name.trim().to_owned(),
            last_name: self.last_name.trim().to_owned(),
            user_name: self.user_name.trim().to_owned(),
            email: self.email.trim().to_owned(),
            password: self.password.clone(),
            area_id: self.area_id.clone(),
            role_id: self.role_id.clone(),
        }
    }

    /// Validate and create the account. On success the user is sent to the
    /// login page. Returns whether the account was created.
    pub async fn register(&mut self, api: &dyn LabApi, navigator: &dyn Navigator) -> bool {
        self.error = None;
        self.success = None;

        let errors = self.validate();
        if !errors.is_empty() {
            tracing::debug!(?errors, "registration form invalid");
            self.error = Some(MSG_INVALID.to_owned());
            return false;
        }

        match api.register(&self.to_request()).await {
            Ok(()) => {
                tracing::info!(user_name = %self.user_name.trim(), "user registered");
                self.success = Some(MSG_REGISTERED.to_owned());
                navigator.navigate(LOGIN_ROUTE);
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, "registration failed");
                let reason = e.backend_message().unwrap_or_else(|| MSG_DEFAULT_CONFLICT.to_owned());
                self.error = Some(format!("Error al registrar: {reason}"));
                false
            }
        }
    }
}

// =============================================================================
// OPTIONS
// =============================================================================

/// Area and role choices for the registration dropdowns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistrationOptions {
    pub areas: Vec<Choice>,
    pub roles: Vec<Choice>,
    /// Message to show above the form when either list is unusable.
    pub error: Option<String>,
}

impl RegistrationOptions {
    pub async fn load(api: &dyn LabApi) -> Self {
        let (areas, roles) = tokio::join!(api.list_areas(), api.list_roles());
        match (areas, roles) {
            (Ok(areas), Ok(roles)) => {
                let error = (areas.is_empty() || roles.is_empty()).then(|| MSG_OPTIONS_EMPTY.to_owned());
                tracing::debug!(areas = areas.len(), roles = roles.len(), "registration options loaded");
                Self { areas, roles, error }
            }
            (Err(e), _) | (_, Err(e)) => {
                tracing::warn!(error = %e, "failed to load areas/roles");
                Self { error: Some(MSG_OPTIONS_FAILED.to_owned()), ..Self::default() }
            }
        }
    }
}

#[cfg(test)]
#[path = "registration_test.rs"]
mod tests;
