//! Reservation form: two patient modes, validation, submission.
//!
//! DESIGN
//! ======
//! The draft's patient part is a tagged union. `Existing` carries only the
//! selected patient id and `New` carries the six inline registration fields.
//! The inactive group does not exist, so "exactly one group is required"
//! holds by construction. Switching modes replaces the variant, which clears
//! the group being left and starts the other one empty.
//!
//! Submission reads the session once, when called. A draft that fails
//! validation or a missing acting user both abort before any request.
//!
//! Dropdown data is loaded once at mount. A list whose fetch fails is
//! replaced by a single placeholder entry so the form stays usable against
//! an unreachable backend.

use std::collections::{BTreeMap, BTreeSet};

use crate::net::api::{ApiError, LabApi};
use crate::net::types::{Choice, Reservation, ReservationPayload};
use crate::session::Session;
use crate::ui::{AlertLevel, Alerts, Navigator, RESERVATIONS_ROUTE};

pub const PLACEHOLDER_LABORATORY: (&str, &str) = ("uuid-lab-1", "Lab Central Prueba");
pub const PLACEHOLDER_ANALYSIS: (&str, &str) = ("uuid-ana-1", "Sangre Completo Prueba");
pub const PLACEHOLDER_PATIENT: (&str, &str) = ("uuid-pac-1", "Paciente Prueba");

const MSG_UNATTRIBUTED: &str = "Error: No se pudo identificar al usuario. Inicia sesión nuevamente.";
const MSG_CREATED: &str = "Reserva creada con éxito";
const MSG_CREATE_FAILED: &str = "Ocurrió un error al crear la reserva";

// =============================================================================
// FIELDS
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Field {
    Laboratory,
    Analysis,
    Detail,
    ScheduledAt,
    PatientId,
    TaxId,
    TaxCheckDigit,
    Age,
    FirstName,
    LastName,
    Phone,
}

impl Field {
    /// Required in both modes.
    pub const COMMON: [Field; 4] = [Field::Laboratory, Field::Analysis, Field::Detail, Field::ScheduledAt];
    /// Required only when registering a new patient.
    pub const NEW_PATIENT: [Field; 6] =
        [Field::TaxId, Field::TaxCheckDigit, Field::Age, Field::FirstName, Field::LastName, Field::Phone];
    pub const ALL: [Field; 11] = [
        Field::Laboratory,
        Field::Analysis,
        Field::Detail,
        Field::ScheduledAt,
        Field::PatientId,
        Field::TaxId,
        Field::TaxCheckDigit,
        Field::Age,
        Field::FirstName,
        Field::LastName,
        Field::Phone,
    ];

    /// Backend name of the field in the submission payload.
    #[must_use]
    pub fn wire_name(self) -> &'static str {
        match self {
            Field::Laboratory => "laboratorioId",
            Field::Analysis => "analisisId",
            Field::Detail => "detalle",
            Field::ScheduledAt => "fechaAsignacion",
            Field::PatientId => "pacienteId",
            Field::TaxId => "rut",
            Field::TaxCheckDigit => "dv",
            Field::Age => "edad",
            Field::FirstName => "nombrePaciente",
            Field::LastName => "apellidoPaciente",
            Field::Phone => "telefono",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldError {
    Required,
    NotANumber,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum FormError {
    #[error("field {0:?} is not part of the current patient mode")]
    InactiveField(Field),
}

// =============================================================================
// DRAFT
// =============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PatientMode {
    #[default]
    Existing,
    New,
}

/// Inline registration data for a patient not yet in the system.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewPatient {
    pub tax_id: String,
    pub tax_check_digit: String,
    /// Raw input; validated as a whole number.
    pub age: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatientEntry {
    Existing { patient_id: String },
    New(NewPatient),
}

impl PatientEntry {
    #[must_use]
    pub fn mode(&self) -> PatientMode {
        match self {
            Self::Existing { .. } => PatientMode::Existing,
            Self::New(_) => PatientMode::New,
        }
    }

    fn empty(mode: PatientMode) -> Self {
        match mode {
            PatientMode::Existing => Self::Existing { patient_id: String::new() },
            PatientMode::New => Self::New(NewPatient::default()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReservationDraft {
    pub laboratory_id: String,
    pub analysis_id: String,
    pub detail: String,
    /// `YYYY-MM-DDTHH:MM`, as a datetime-local input produces.
    pub scheduled_at: String,
    pub patient: PatientEntry,
}

impl Default for ReservationDraft {
    fn default() -> Self {
        Self::new(default_scheduled_at())
    }
}

impl ReservationDraft {
    /// Fresh draft in existing-patient mode.
    #[must_use]
    pub fn new(scheduled_at: impl Into<String>) -> Self {
        Self {
            laboratory_id: String::new(),
            analysis_id: String::new(),
            detail: String::new(),
            scheduled_at: scheduled_at.into(),
            patient: PatientEntry::empty(PatientMode::Existing),
        }
    }

    #[must_use]
    pub fn mode(&self) -> PatientMode {
        self.patient.mode()
    }

    /// Current value of `field`, or `None` if the field belongs to the
    /// inactive patient group.
    #[must_use]
    pub fn value(&self, field: Field) -> Option<&str> {
        let v = match (field, &self.patient) {
            (Field::Laboratory, _) => &self.laboratory_id,
            (Field::Analysis, _) => &self.analysis_id,
            (Field::Detail, _) => &self.detail,
            (Field::ScheduledAt, _) => &self.scheduled_at,
            (Field::PatientId, PatientEntry::Existing { patient_id }) => patient_id,
            (Field::TaxId, PatientEntry::New(p)) => &p.tax_id,
            (Field::TaxCheckDigit, PatientEntry::New(p)) => &p.tax_check_digit,
            (Field::Age, PatientEntry::New(p)) => &p.age,
            (Field::FirstName, PatientEntry::New(p)) => &p.first_name,
            (Field::LastName, PatientEntry::New(p)) => &p.last_name,
            (Field::Phone, PatientEntry::New(p)) => &p.phone,
            _ => return None,
        };
        Some(v.as_str())
    }

    fn slot(&mut self, field: Field) -> Option<&mut String> {
        let slot = match (field, &mut self.patient) {
            (Field::Laboratory, _) => &mut self.laboratory_id,
            (Field::Analysis, _) => &mut self.analysis_id,
            (Field::Detail, _) => &mut self.detail,
            (Field::ScheduledAt, _) => &mut self.scheduled_at,
            (Field::PatientId, PatientEntry::Existing { patient_id }) => patient_id,
            (Field::TaxId, PatientEntry::New(p)) => &mut p.tax_id,
            (Field::TaxCheckDigit, PatientEntry::New(p)) => &mut p.tax_check_digit,
            (Field::Age, PatientEntry::New(p)) => &mut p.age,
            (Field::FirstName, PatientEntry::New(p)) => &mut p.first_name,
            (Field::LastName, PatientEntry::New(p)) => &mut p.last_name,
            (Field::Phone, PatientEntry::New(p)) => &mut p.phone,
            _ => return None,
        };
        Some(slot)
    }

    /// Whether `field` is required under the current mode.
    #[must_use]
    pub fn is_required(&self, field: Field) -> bool {
        match field {
            Field::PatientId => self.mode() == PatientMode::Existing,
            f if Field::NEW_PATIENT.contains(&f) => self.mode() == PatientMode::New,
            _ => true,
        }
    }

    fn check(&self, field: Field) -> Option<FieldError> {
        if !self.is_required(field) {
            return None;
        }
        let value = self.value(field).unwrap_or_default().trim();
        if value.is_empty() {
            return Some(FieldError::Required);
        }
        if field == Field::Age && value.parse::<u32>().is_err() {
            return Some(FieldError::NotANumber);
        }
        None
    }

    /// Every failing active field.
    #[must_use]
    pub fn errors(&self) -> BTreeMap<Field, FieldError> {
        Field::ALL
            .into_iter()
            .filter_map(|f| self.check(f).map(|e| (f, e)))
            .collect()
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors().is_empty()
    }

    /// Build the creation body, stamping `user_id` as the acting user.
    #[must_use]
    pub fn to_payload(&self, user_id: &str) -> ReservationPayload {
        let mut payload = ReservationPayload {
            laboratory_id: self.laboratory_id.trim().to_owned(),
            analysis_id: self.analysis_id.trim().to_owned(),
            user_id: user_id.to_owned(),
            detail: self.detail.trim().to_owned(),
            scheduled_at: self.scheduled_at.trim().to_owned(),
            patient_id: None,
            tax_id: None,
            tax_check_digit: None,
            age: None,
            first_name: None,
            last_name: None,
            phone: None,
        };
        match &self.patient {
            PatientEntry::Existing { patient_id } => payload.patient_id = Some(patient_id.trim().to_owned()),
            PatientEntry::New(p) => {
                let owned = |s: &str| Some(s.trim().to_owned());
                payload.tax_id = owned(&p.tax_id);
                payload.tax_check_digit = owned(&p.tax_check_digit);
                payload.age = Some(p.age.trim().parse().unwrap_or(0));
                payload.first_name = owned(&p.first_name);
                payload.last_name = owned(&p.last_name);
                payload.phone = owned(&p.phone);
            }
        }
        payload
    }
}

/// Current UTC time in datetime-local form, minute precision.
#[must_use]
pub fn default_scheduled_at() -> String {
    let now = time::OffsetDateTime::now_utc();
    format!(
        "{:04}-{:02}-{:02}T{:02}:{:02}",
        now.year(),
        u8::from(now.month()),
        now.day(),
        now.hour(),
        now.minute()
    )
}

// =============================================================================
// DROPDOWN OPTIONS
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReservationOptions {
    pub laboratories: Vec<Choice>,
    pub analyses: Vec<Choice>,
    pub patients: Vec<Choice>,
    /// At least one list is a placeholder because its fetch failed.
    pub degraded: bool,
}

impl ReservationOptions {
    /// Fetch the three dropdown sources concurrently.
    pub async fn load(api: &dyn LabApi) -> Self {
        let (labs, analyses, patients) = tokio::join!(api.list_laboratories(), api.list_analyses(), api.list_patients());
        let mut degraded = false;

        let laboratories = or_placeholder(
            "laboratories",
            labs.map(|l| l.into_iter().map(|l| Choice { id: l.id, name: l.name }).collect()),
            PLACEHOLDER_LABORATORY,
            &mut degraded,
        );
        let analyses = or_placeholder(
            "analyses",
            analyses.map(|a| a.into_iter().map(|a| Choice { id: a.id, name: a.name }).collect()),
            PLACEHOLDER_ANALYSIS,
            &mut degraded,
        );
        let patients = or_placeholder(
            "patients",
            patients.map(|p| p.into_iter().map(|p| Choice { name: p.label(), id: p.id }).collect()),
            PLACEHOLDER_PATIENT,
            &mut degraded,
        );

        Self { laboratories, analyses, patients, degraded }
    }
}

fn or_placeholder(
    list: &'static str,
    fetched: Result<Vec<Choice>, ApiError>,
    placeholder: (&str, &str),
    degraded: &mut bool,
) -> Vec<Choice> {
    match fetched {
        Ok(items) => items,
        Err(e) => {
            tracing::warn!(list, error = %e, "dropdown fetch failed; using placeholder");
            *degraded = true;
            vec![Choice::new(placeholder.0, placeholder.1)]
        }
    }
}

// =============================================================================
// FORM CONTROLLER
// =============================================================================

#[derive(Debug)]
pub enum SubmitOutcome {
    /// Validation failed; every field is now touched.
    Invalid,
    /// No session or no user id; nothing was sent.
    Unattributed,
    Created,
    Failed(ApiError),
}

#[derive(Debug, Clone, Default)]
pub struct ReservationForm {
    draft: ReservationDraft,
    touched: BTreeSet<Field>,
    submitting: bool,
    pub options: ReservationOptions,
}

impl ReservationForm {
    #[must_use]
    pub fn new(draft: ReservationDraft) -> Self {
        Self { draft, ..Self::default() }
    }

    /// New form with its dropdown sources loaded.
    pub async fn mount(api: &dyn LabApi) -> Self {
        let options = ReservationOptions::load(api).await;
        Self { options, ..Self::default() }
    }

    #[must_use]
    pub fn draft(&self) -> &ReservationDraft {
        &self.draft
    }

    #[must_use]
    pub fn mode(&self) -> PatientMode {
        self.draft.mode()
    }

    #[must_use]
    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    /// Switch patient mode. The group being left is discarded and the other
    /// group starts empty; selecting the current mode changes nothing.
    pub fn set_mode(&mut self, mode: PatientMode) {
        if self.draft.mode() == mode {
            return;
        }
        self.draft.patient = PatientEntry::empty(mode);
        tracing::debug!(?mode, "patient mode switched");
    }

    /// The "register a new patient" checkbox.
    pub fn set_new_patient(&mut self, checked: bool) {
        self.set_mode(if checked { PatientMode::New } else { PatientMode::Existing });
    }

    /// Store user input for `field` and mark it touched.
    ///
    /// # Errors
    ///
    /// Returns [`FormError::InactiveField`] if `field` belongs to the other
    /// patient mode.
    pub fn set_field(&mut self, field: Field, value: &str) -> Result<(), FormError> {
        let slot = self.draft.slot(field).ok_or(FormError::InactiveField(field))?;
        value.clone_into(slot);
        self.touched.insert(field);
        Ok(())
    }

    #[must_use]
    pub fn is_required(&self, field: Field) -> bool {
        self.draft.is_required(field)
    }

    #[must_use]
    pub fn is_touched(&self, field: Field) -> bool {
        self.touched.contains(&field)
    }

    pub fn mark_all_touched(&mut self) {
        self.touched.extend(Field::ALL);
    }

    /// Error to render under `field`: only once it has been touched.
    #[must_use]
    pub fn visible_error(&self, field: Field) -> Option<FieldError> {
        if !self.is_touched(field) {
            return None;
        }
        self.draft.check(field)
    }

    /// Validate, attribute and send the reservation.
    ///
    /// On success the user is told and taken to the reservations list. On
    /// failure the draft is left as is for another attempt.
    pub async fn submit(
        &mut self,
        session: Option<&Session>,
        api: &dyn LabApi,
        navigator: &dyn Navigator,
        alerts: &dyn Alerts,
    ) -> SubmitOutcome {
        if !self.draft.is_valid() {
            self.mark_all_touched();
            tracing::debug!(errors = ?self.draft.errors(), "reservation draft invalid");
            return SubmitOutcome::Invalid;
        }

        let Some(user_id) = session.filter(|s| s.logged_in).and_then(Session::user_id) else {
            tracing::warn!("reservation submit without an identified user");
            alerts.alert(AlertLevel::Warning, MSG_UNATTRIBUTED);
            return SubmitOutcome::Unattributed;
        };

        let payload = self.draft.to_payload(user_id);
        self.submitting = true;
        let result = api.create_reservation(&payload).await;
        self.submitting = false;

        match result {
            Ok(()) => {
                tracing::info!(user_id, mode = ?self.draft.mode(), "reservation created");
                alerts.alert(AlertLevel::Info, MSG_CREATED);
                navigator.navigate(RESERVATIONS_ROUTE);
                SubmitOutcome::Created
            }
            Err(e) => {
                tracing::warn!(user_id, error = %e, "reservation create failed");
                alerts.alert(AlertLevel::Error, MSG_CREATE_FAILED);
                SubmitOutcome::Failed(e)
            }
        }
    }
}

// =============================================================================
// LISTING
// =============================================================================

/// Reservations created by the acting user. Without an identified user, or
/// when the call fails, the list is empty.
pub async fn load_user_reservations(session: Option<&Session>, api: &dyn LabApi) -> Vec<Reservation> {
    let Some(user_id) = session.filter(|s| s.logged_in).and_then(Session::user_id) else {
        tracing::warn!("no session user id; skipping reservation listing");
        return Vec::new();
    };
    match api.list_reservations(user_id).await {
        Ok(list) => list,
        Err(e) => {
            tracing::warn!(user_id, error = %e, "reservation listing failed");
            Vec::new()
        }
    }
}

#[cfg(test)]
#[path = "reservation_test.rs"]
mod tests;
