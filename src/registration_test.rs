use super::*;
use crate::net::api::ApiError;
use crate::net::api::test_helpers::MockApi;
use crate::ui::test_helpers::RecordingNavigator;

fn valid_form() -> RegistrationForm {
    RegistrationForm {
        first_name: "Juana".into(),
        last_name: "Perez".into(),
        user_name: "jperez".into(),
        email: "juana@lab.cl".into(),
        password: "s3cret".into(),
        password_confirmation: "s3cret".into(),
        area_id: "area-1".into(),
        role_id: "role-2".into(),
        ..RegistrationForm::default()
    }
}

// =============================================================================
// validate
// =============================================================================

#[test]
fn valid_form_has_no_errors() {
    assert!(valid_form().validate().is_empty());
}

#[test]
fn empty_form_reports_every_field_required() {
    let errors = RegistrationForm::default().validate();
    assert_eq!(errors.len(), 8);
    assert!(errors.values().all(|e| *e == RegistrationError::Required));
}

#[test]
fn short_user_name_and_password() {
    let mut form = valid_form();
    form.user_name = "ana".into();
    form.password = "abc".into();
    form.password_confirmation = "abc".into();
    let errors = form.validate();
    assert_eq!(errors[&RegistrationField::UserName], RegistrationError::TooShort { min: 4 });
    assert_eq!(errors[&RegistrationField::Password], RegistrationError::TooShort { min: 4 });
    assert!(!errors.contains_key(&RegistrationField::PasswordConfirmation));
}

#[test]
fn email_shape() {
    for bad in ["juana", "juana@lab", "@lab.cl", "juana@.cl", "juana@lab.", "a@b@c.cl"] {
        let mut form = valid_form();
        form.email = bad.into();
        assert_eq!(form.validate().get(&RegistrationField::Email), Some(&RegistrationError::InvalidEmail), "{bad}");
    }
    assert!(looks_like_email("juana@mail.lab.cl"));
}

#[test]
fn password_confirmation_must_match() {
    let mut form = valid_form();
    form.password_confirmation = "other".into();
    assert_eq!(
        form.validate().get(&RegistrationField::PasswordConfirmation),
        Some(&RegistrationError::PasswordMismatch)
    );
}

// =============================================================================
// register
// =============================================================================

#[tokio::test]
async fn register_posts_backend_shape_and_goes_to_login() {
    let api = MockApi::default();
    let navigator = RecordingNavigator::default();
    let mut form = valid_form();

    assert!(form.register(&api, &navigator).await);

    let sent = api.registrations.lock().unwrap();
    assert_eq!(sent.len(), 1);
    let json = serde_json::to_value(&sent[0]).unwrap();
    assert_eq!(json["userName"], "jperez");
    assert_eq!(json["contrasena"], "s3cret");
    assert_eq!(json["nombre"], "Juana");
    assert_eq!(json["areaId"], "area-1");
    assert_eq!(json["roleId"], "role-2");
    assert!(form.success().is_some());
    assert_eq!(form.error(), None);
    assert_eq!(navigator.routes(), vec![LOGIN_ROUTE.to_owned()]);
}

#[tokio::test]
async fn invalid_form_sends_nothing() {
    let api = MockApi::default();
    let mut form = valid_form();
    form.email = "nope".into();

    assert!(!form.register(&api, &RecordingNavigator::default()).await);

    assert_eq!(api.total_calls(), 0);
    assert_eq!(form.error(), Some(MSG_INVALID));
}

#[tokio::test]
async fn backend_rejection_uses_default_reason() {
    let api = MockApi { write_failure_status: Some(409), ..MockApi::default() };
    let navigator = RecordingNavigator::default();
    let mut form = valid_form();

    assert!(!form.register(&api, &navigator).await);

    assert_eq!(form.error(), Some("Error al registrar: Usuario o email ya existen."));
    assert!(navigator.routes().is_empty());
}

#[test]
fn backend_message_is_extracted_from_status_body() {
    let err = ApiError::Status { status: 409, body: r#"{"message":"email duplicado"}"#.into() };
    assert_eq!(err.backend_message().as_deref(), Some("email duplicado"));
    assert_eq!(ApiError::Request("x".into()).backend_message(), None);
}

// =============================================================================
// options
// =============================================================================

#[tokio::test]
async fn options_load_both_lists() {
    let api = MockApi {
        areas: Some(vec![Choice::new("area-1", "Hematología")]),
        roles: Some(vec![Choice::new("role-1", "medico")]),
        ..MockApi::default()
    };

    let options = RegistrationOptions::load(&api).await;

    assert_eq!(options.areas.len(), 1);
    assert_eq!(options.roles.len(), 1);
    assert_eq!(options.error, None);
}

#[tokio::test]
async fn empty_list_reports_error_without_placeholder() {
    let api = MockApi {
        areas: Some(vec![Choice::new("area-1", "Hematología")]),
        roles: Some(vec![]),
        ..MockApi::default()
    };

    let options = RegistrationOptions::load(&api).await;

    assert!(options.roles.is_empty());
    assert_eq!(options.error.as_deref(), Some(MSG_OPTIONS_EMPTY));
}

#[tokio::test]
async fn fetch_failure_reports_connection_error() {
    let api = MockApi { roles: Some(vec![Choice::new("role-1", "medico")]), ..MockApi::default() };

    let options = RegistrationOptions::load(&api).await;

    assert!(options.areas.is_empty());
    assert!(options.roles.is_empty());
    assert_eq!(options.error.as_deref(), Some(MSG_OPTIONS_FAILED));
    assert_eq!(api.total_calls(), 2);
}
