//! Wire types exchanged with the auth and labs services.
//!
//! Field names follow the backend's JSON (Spanish, camelCase); Rust-side
//! names are English. Unknown fields are ignored so backend additions do not
//! break deserialization.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

// =============================================================================
// AUTH
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub user_name: String,
    pub password: String,
}

/// Successful `POST /api/auth/login` body.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub access_token: String,
    #[serde(rename = "roleNombre", default)]
    pub role_name: String,
    #[serde(rename = "areaNombre", default)]
    pub area_name: Option<String>,
    pub user_id: String,
    #[serde(default)]
    pub user_name: String,
    #[serde(rename = "nombre", default)]
    pub first_name: String,
    #[serde(rename = "apellido", default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
}

/// `PUT /api/usuarios/{userId}` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProfileUpdate {
    #[serde(rename = "nombre")]
    pub first_name: String,
    #[serde(rename = "apellido")]
    pub last_name: String,
    pub email: String,
}

/// `POST /api/usuarios` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegisterRequest {
    #[serde(rename = "nombre")]
    pub first_name: String,
    #[serde(rename = "apellido")]
    pub last_name: String,
    #[serde(rename = "userName")]
    pub user_name: String,
    pub email: String,
    #[serde(rename = "contrasena")]
    pub password: String,
    #[serde(rename = "areaId")]
    pub area_id: String,
    #[serde(rename = "roleId")]
    pub role_id: String,
}

/// An `{id, nombre}` pair, used for areas, roles and dropdown choices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    pub id: String,
    #[serde(rename = "nombre", default)]
    pub name: String,
}

impl Choice {
    #[must_use]
    pub fn new(id: &str, name: &str) -> Self {
        Self { id: id.to_owned(), name: name.to_owned() }
    }
}

// =============================================================================
// LABS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Laboratory {
    pub id: String,
    #[serde(rename = "nombre", default)]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Analysis {
    pub id: String,
    #[serde(rename = "nombre", default)]
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    pub id: String,
    #[serde(rename = "rut", default)]
    pub tax_id: String,
    #[serde(rename = "dv", default)]
    pub tax_check_digit: String,
    #[serde(rename = "nombrePaciente", default)]
    pub first_name: String,
    #[serde(rename = "apellidoPaciente", default)]
    pub last_name: String,
    #[serde(rename = "fechaNacimiento", default)]
    pub birth_date: String,
    #[serde(rename = "telefono", default)]
    pub phone: String,
    #[serde(rename = "genero", default)]
    pub gender: Option<String>,
    #[serde(rename = "edad", default)]
    pub age: Option<u32>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(rename = "direccion", default)]
    pub address: Option<String>,
}

impl Patient {
    /// `12345678-9 Juana Perez` style label for dropdowns.
    #[must_use]
    pub fn label(&self) -> String {
        let name = format!("{} {}", self.first_name, self.last_name);
        if self.tax_id.is_empty() {
            name.trim().to_owned()
        } else {
            format!("{}-{} {}", self.tax_id, self.tax_check_digit, name.trim())
        }
    }
}

/// A lab assignment as listed by `GET /api/asignacion_lab/usuario/{userId}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reservation {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "laboratorio", default)]
    pub laboratory: Option<Laboratory>,
    #[serde(rename = "analisis", default)]
    pub analysis: Option<Analysis>,
    #[serde(rename = "paciente", default)]
    pub patient: Option<Patient>,
    #[serde(rename = "usuarioId", default)]
    pub user_id: String,
    #[serde(rename = "fechaAsignacion", default)]
    pub scheduled_at: String,
    #[serde(rename = "detalle", default)]
    pub detail: String,
    #[serde(rename = "laboratorioId", default)]
    pub laboratory_id: String,
    #[serde(rename = "analisisId", default)]
    pub analysis_id: String,
    #[serde(rename = "pacienteId", default)]
    pub patient_id: Option<String>,
}

/// `POST /api/asignacion_lab` body.
///
/// `pacienteId` is always serialized (`null` for a new patient); the
/// new-patient fields are omitted entirely when absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReservationPayload {
    #[serde(rename = "laboratorioId")]
    pub laboratory_id: String,
    #[serde(rename = "analisisId")]
    pub analysis_id: String,
    #[serde(rename = "usuarioId")]
    pub user_id: String,
    #[serde(rename = "detalle")]
    pub detail: String,
    #[serde(rename = "fechaAsignacion")]
    pub scheduled_at: String,
    #[serde(rename = "pacienteId")]
    pub patient_id: Option<String>,
    #[serde(rename = "rut", skip_serializing_if = "Option::is_none")]
    pub tax_id: Option<String>,
    #[serde(rename = "dv", skip_serializing_if = "Option::is_none")]
    pub tax_check_digit: Option<String>,
    #[serde(rename = "edad", skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
    #[serde(rename = "nombrePaciente", skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(rename = "apellidoPaciente", skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(rename = "telefono", skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

// =============================================================================
// HAL ENVELOPES
// =============================================================================

/// Extract `_embedded.<list_name>` from a HAL collection body.
///
/// A body without `_embedded` (or without the named list) is an empty
/// collection, which is how the backend renders zero rows.
///
/// # Errors
///
/// Returns a decode error if the list exists but its items do not match `T`.
pub fn embedded_list<T: DeserializeOwned>(body: serde_json::Value, list_name: &str) -> Result<Vec<T>, serde_json::Error> {
    let mut body = body;
    match body
        .get_mut("_embedded")
        .and_then(|e| e.get_mut(list_name))
        .map(serde_json::Value::take)
    {
        Some(list) if !list.is_null() => serde_json::from_value(list),
        _ => Ok(Vec::new()),
    }
}

/// Decode a body that is usually an array but may be a single object or null.
///
/// # Errors
///
/// Returns a decode error if the items do not match `T`.
pub fn one_or_many<T: DeserializeOwned>(body: serde_json::Value) -> Result<Vec<T>, serde_json::Error> {
    match body {
        serde_json::Value::Null => Ok(Vec::new()),
        serde_json::Value::Array(_) => serde_json::from_value(body),
        other => Ok(vec![serde_json::from_value(other)?]),
    }
}

#[cfg(test)]
#[path = "types_test.rs"]
mod tests;
