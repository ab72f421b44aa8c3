use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use reservalab::auth::{AuthError, AuthGateway, LoginForm};
use reservalab::config::{ClientConfig, ConfigError};
use reservalab::navigation::{CatalogError, NavigationPolicy, default_catalog};
use reservalab::net::api::{ApiError, HttpLabApi, LabApi};
use reservalab::net::types::ProfileUpdate;
use reservalab::registration::{RegistrationForm, RegistrationOptions};
use reservalab::reservation::{Field, FormError, ReservationForm, SubmitOutcome, load_user_reservations};
use reservalab::session::{Session, SessionStore};
use reservalab::storage::FileStore;
use reservalab::ui::{AlertLevel, Alerts, Navigator};
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error("menu catalog invalid: {0}")]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Form(#[from] FormError),
    #[error("login failed; check user name and password")]
    LoginFailed,
    #[error("no visible menu option labeled `{0}`")]
    UnknownOption(String),
    #[error("not logged in")]
    NotLoggedIn,
    #[error("reservation draft has invalid fields")]
    InvalidReservation,
    #[error("{0}")]
    Registration(String),
    #[error("invalid JSON output: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "reservalab", about = "Lab reservation client")]
struct Cli {
    /// Overrides RESERVALAB_LABS_URL.
    #[arg(long)]
    labs_url: Option<String>,

    /// Overrides RESERVALAB_AUTH_URL.
    #[arg(long)]
    auth_url: Option<String>,

    #[arg(long, env = "RESERVALAB_STORAGE_PATH")]
    storage_path: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Login {
        #[arg(long)]
        user: String,
        #[arg(long)]
        password: String,
    },
    Logout,
    Whoami,
    /// List the menu options visible to the current session.
    Menu,
    /// Activate a visible menu option by label.
    Open {
        label: String,
    },
    Labs,
    Analyses,
    Patients,
    Reservations(ReservationsCommand),
    Profile {
        #[arg(long)]
        first_name: String,
        #[arg(long)]
        last_name: String,
        #[arg(long)]
        email: String,
    },
    Register(RegisterArgs),
    /// Areas and roles offered at registration.
    RegisterOptions,
}

#[derive(Args, Debug)]
struct ReservationsCommand {
    #[command(subcommand)]
    command: ReservationsSubcommand,
}

#[derive(Subcommand, Debug)]
enum ReservationsSubcommand {
    List,
    Create(CreateReservationArgs),
}

#[derive(Args, Debug)]
struct CreateReservationArgs {
    #[arg(long)]
    lab: String,
    #[arg(long)]
    analysis: String,
    #[arg(long)]
    detail: String,
    #[arg(long, help = "YYYY-MM-DDTHH:MM; defaults to now")]
    at: Option<String>,

    #[arg(long, conflicts_with = "new_patient", required_unless_present = "new_patient")]
    patient_id: Option<String>,

    #[arg(long, default_value_t = false)]
    new_patient: bool,
    #[arg(long)]
    tax_id: Option<String>,
    #[arg(long)]
    check_digit: Option<String>,
    #[arg(long)]
    age: Option<String>,
    #[arg(long)]
    first_name: Option<String>,
    #[arg(long)]
    last_name: Option<String>,
    #[arg(long)]
    phone: Option<String>,
}

#[derive(Args, Debug)]
struct RegisterArgs {
    #[arg(long)]
    first_name: String,
    #[arg(long)]
    last_name: String,
    #[arg(long)]
    user: String,
    #[arg(long)]
    email: String,
    #[arg(long)]
    password: String,
    #[arg(long)]
    password_confirmation: String,
    #[arg(long)]
    area_id: String,
    #[arg(long)]
    role_id: String,
}

// =============================================================================
// TERMINAL COLLABORATORS
// =============================================================================

struct TerminalNavigator;

impl Navigator for TerminalNavigator {
    fn navigate(&self, route: &str) {
        eprintln!("-> {route}");
    }
}

struct TerminalAlerts;

impl Alerts for TerminalAlerts {
    fn alert(&self, level: AlertLevel, message: &str) {
        let tag = match level {
            AlertLevel::Info => "info",
            AlertLevel::Warning => "warning",
            AlertLevel::Error => "error",
        };
        println!("[{tag}] {message}");
    }
}

// =============================================================================
// APPLICATION ROOT
// =============================================================================

struct App {
    sessions: SessionStore,
    api: Arc<HttpLabApi>,
    gateway: AuthGateway,
    policy: NavigationPolicy,
}

impl App {
    fn build(cli: &Cli) -> Result<Self, CliError> {
        let mut config = ClientConfig::from_env()?;
        if let Some(url) = &cli.labs_url {
            config = config.with_labs_url(url)?;
        }
        if let Some(url) = &cli.auth_url {
            config = config.with_auth_url(url)?;
        }
        if let Some(path) = &cli.storage_path {
            config.storage_path.clone_from(path);
        }

        let storage = Arc::new(FileStore::new(config.storage_path.clone()));
        let sessions = SessionStore::initialize(storage.clone());
        let api = Arc::new(HttpLabApi::new(&config, storage)?);
        let gateway = AuthGateway::new(api.clone(), sessions.clone());
        let logout = gateway.clone();
        let policy = NavigationPolicy::new(default_catalog(move || logout.logout())?);

        tracing::debug!(
            labs_url = %config.labs_url,
            auth_url = %config.auth_url,
            storage = %config.storage_path.display(),
            "client configured"
        );
        Ok(Self { sessions, api, gateway, policy })
    }
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let cli = Cli::parse();
    let app = App::build(&cli)?;

    match cli.command {
        Command::Login { user, password } => run_login(&app, &user, &password).await,
        Command::Logout => {
            app.gateway.logout();
            println!("logged out");
            Ok(())
        }
        Command::Whoami => run_whoami(&app),
        Command::Menu => {
            for option in app.policy.visible_options(app.sessions.current().as_ref()) {
                let target = if option.has_action() { "(action)" } else { option.route.as_str() };
                println!("{:<16} {target}", option.label);
            }
            Ok(())
        }
        Command::Open { label } => run_open(&app, &label),
        Command::Labs => print_json(&app.api.list_laboratories().await?),
        Command::Analyses => print_json(&app.api.list_analyses().await?),
        Command::Patients => print_json(&app.api.list_patients().await?),
        Command::Reservations(cmd) => match cmd.command {
            ReservationsSubcommand::List => {
                let list = load_user_reservations(app.sessions.current().as_ref(), app.api.as_ref()).await;
                print_json(&list)
            }
            ReservationsSubcommand::Create(args) => run_create_reservation(&app, args).await,
        },
        Command::Profile { first_name, last_name, email } => {
            let session = app
                .gateway
                .update_profile(ProfileUpdate { first_name, last_name, email })
                .await?;
            print_json(&session_view(&session)?)
        }
        Command::Register(args) => run_register(&app, args).await,
        Command::RegisterOptions => {
            let options = RegistrationOptions::load(app.api.as_ref()).await;
            if let Some(error) = &options.error {
                eprintln!("{error}");
            }
            print_json(&serde_json::json!({ "areas": options.areas, "roles": options.roles }))
        }
    }
}

async fn run_login(app: &App, user: &str, password: &str) -> Result<(), CliError> {
    let mut form = LoginForm::new(user, password);
    let Some(session) = form.submit(&app.gateway, &TerminalNavigator).await else {
        return Err(CliError::LoginFailed);
    };
    println!("logged in as {} ({})", session.display_name(), session.role);
    Ok(())
}

fn run_whoami(app: &App) -> Result<(), CliError> {
    match app.sessions.current() {
        Some(session) => print_json(&session_view(&session)?),
        None => {
            println!("anonymous");
            Ok(())
        }
    }
}

fn run_open(app: &App, label: &str) -> Result<(), CliError> {
    let current = app.sessions.current();
    let wanted = label.trim().to_lowercase();
    let option = app
        .policy
        .visible_options(current.as_ref())
        .into_iter()
        .find(|o| o.label.to_lowercase() == wanted)
        .ok_or_else(|| CliError::UnknownOption(label.to_owned()))?;
    app.policy.activate(option, &TerminalNavigator);
    Ok(())
}

async fn run_create_reservation(app: &App, args: CreateReservationArgs) -> Result<(), CliError> {
    let mut form = ReservationForm::mount(app.api.as_ref()).await;
    if form.options.degraded {
        eprintln!("warning: some dropdown data is unavailable; placeholders in use");
    }

    fill_reservation(&mut form, &args)?;

    let session = app.sessions.current();
    match form
        .submit(session.as_ref(), app.api.as_ref(), &TerminalNavigator, &TerminalAlerts)
        .await
    {
        SubmitOutcome::Created => Ok(()),
        SubmitOutcome::Invalid => {
            for field in Field::ALL {
                if let Some(error) = form.visible_error(field) {
                    eprintln!("  {}: {error:?}", field.wire_name());
                }
            }
            Err(CliError::InvalidReservation)
        }
        SubmitOutcome::Unattributed => Err(CliError::NotLoggedIn),
        SubmitOutcome::Failed(e) => Err(e.into()),
    }
}

async fn run_register(app: &App, args: RegisterArgs) -> Result<(), CliError> {
    let mut form = registration_form(args);
    for (field, error) in form.validate() {
        eprintln!("  {field:?}: {error:?}");
    }
    if form.register(app.api.as_ref(), &TerminalNavigator).await {
        if let Some(message) = form.success() {
            println!("{message}");
        }
        Ok(())
    } else {
        Err(CliError::Registration(form.error().unwrap_or("registration failed").to_owned()))
    }
}

/// Copy the command-line reservation fields into `form`, switching it to
/// new-patient mode when `--new-patient` is given.
fn fill_reservation(form: &mut ReservationForm, args: &CreateReservationArgs) -> Result<(), FormError> {
    form.set_field(Field::Laboratory, &args.lab)?;
    form.set_field(Field::Analysis, &args.analysis)?;
    form.set_field(Field::Detail, &args.detail)?;
    if let Some(at) = &args.at {
        form.set_field(Field::ScheduledAt, at)?;
    }

    if args.new_patient {
        form.set_new_patient(true);
        let inline = [
            (Field::TaxId, &args.tax_id),
            (Field::TaxCheckDigit, &args.check_digit),
            (Field::Age, &args.age),
            (Field::FirstName, &args.first_name),
            (Field::LastName, &args.last_name),
            (Field::Phone, &args.phone),
        ];
        for (field, value) in inline {
            form.set_field(field, value.as_deref().unwrap_or_default())?;
        }
    } else {
        form.set_field(Field::PatientId, args.patient_id.as_deref().unwrap_or_default())?;
    }
    Ok(())
}

fn registration_form(args: RegisterArgs) -> RegistrationForm {
    let mut form = RegistrationForm::default();
    form.first_name = args.first_name;
    form.last_name = args.last_name;
    form.user_name = args.user;
    form.email = args.email;
    form.password = args.password;
    form.password_confirmation = args.password_confirmation;
    form.area_id = args.area_id;
    form.role_id = args.role_id;
    form
}

/// Session as printed to the terminal; the bearer token is left out.
fn session_view(session: &Session) -> Result<serde_json::Value, serde_json::Error> {
    let mut view = serde_json::to_value(session)?;
    if let Some(fields) = view.as_object_mut() {
        fields.remove("token");
    }
    Ok(view)
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}

#[cfg(test)]
#[path = "main_test.rs"]
mod tests;
