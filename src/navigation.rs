//! Role-based menu filtering and dispatch.
//!
//! DESIGN
//! ======
//! The catalog is fixed at start-up. Visibility is a pure function of the
//! catalog and the current session: an option shows iff its login
//! requirement equals the session's logged-in state and, when it names
//! roles, the session's lower-cased role is one of them. Anonymous visitors
//! therefore only ever see anonymous, role-free options, and an unknown role
//! sees no role-gated option at all.
//!
//! [`MenuWatch`] recomputes the visible list on every session emission
//! instead of caching per role.

use std::collections::{BTreeSet, HashSet};
use std::sync::{Arc, Mutex, PoisonError};

use crate::session::{Session, SessionStore, Subscription, is_logged_in};
use crate::ui::{HOME_ROUTE, Navigator};

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_PHYSICIAN: &str = "medico";
pub const ROLE_LAB: &str = "laboratorio";

/// Side effect run when an option is activated (e.g. logout).
pub type NavCallback = Arc<dyn Fn() + Send + Sync>;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("duplicate menu label `{0}`")]
    DuplicateLabel(String),
    #[error("menu option `{0}` is public but restricted to roles")]
    PublicWithRoles(String),
}

// =============================================================================
// NAV OPTION
// =============================================================================

/// One menu entry and its visibility rule.
#[derive(Clone)]
pub struct NavOption {
    pub label: String,
    /// Empty when the option only performs an action.
    pub route: String,
    /// Lower-cased. Empty means any role.
    pub required_roles: BTreeSet<String>,
    pub requires_login: bool,
    on_activate: Option<NavCallback>,
}

impl NavOption {
    /// Option shown only to visitors without a session.
    #[must_use]
    pub fn anonymous(label: &str, route: &str) -> Self {
        Self {
            label: label.to_owned(),
            route: route.to_owned(),
            required_roles: BTreeSet::new(),
            requires_login: false,
            on_activate: None,
        }
    }

    /// Option shown only to logged-in users.
    #[must_use]
    pub fn authenticated(label: &str, route: &str) -> Self {
        Self { requires_login: true, ..Self::anonymous(label, route) }
    }

    #[must_use]
    pub fn with_roles(mut self, roles: &[&str]) -> Self {
        self.required_roles = roles.iter().map(|r| r.trim().to_lowercase()).collect();
        self
    }

    #[must_use]
    pub fn with_action<F>(mut self, action: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.on_activate = Some(Arc::new(action));
        self
    }

    #[must_use]
    pub fn has_action(&self) -> bool {
        self.on_activate.is_some()
    }

    #[must_use]
    pub fn is_visible_to(&self, session: Option<&Session>) -> bool {
        let logged_in = is_logged_in(session);
        if self.requires_login != logged_in {
            return false;
        }
        if self.required_roles.is_empty() {
            return true;
        }
        session.is_some_and(|s| self.required_roles.contains(&s.role_key()))
    }
}

impl std::fmt::Debug for NavOption {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NavOption")
            .field("label", &self.label)
            .field("route", &self.route)
            .field("required_roles", &self.required_roles)
            .field("requires_login", &self.requires_login)
            .field("has_action", &self.has_action())
            .finish()
    }
}

// =============================================================================
// CATALOG
// =============================================================================

#[derive(Debug, Clone)]
pub struct NavCatalog {
    options: Vec<NavOption>,
}

impl NavCatalog {
    /// Validate and freeze a catalog.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError`] for duplicate labels or for a public option
    /// that names roles.
    pub fn new(options: Vec<NavOption>) -> Result<Self, CatalogError> {
        let mut labels = HashSet::new();
        for option in &options {
            if !labels.insert(option.label.as_str()) {
                return Err(CatalogError::DuplicateLabel(option.label.clone()));
            }
            if !option.requires_login && !option.required_roles.is_empty() {
                return Err(CatalogError::PublicWithRoles(option.label.clone()));
            }
        }
        Ok(Self { options })
    }

    #[must_use]
    pub fn options(&self) -> &[NavOption] {
        &self.options
    }
}

/// The application menu. `on_logout` runs when "Cerrar sesión" is activated.
///
/// # Errors
///
/// Never fails in practice; the entries are static and valid.
pub fn default_catalog<F>(on_logout: F) -> Result<NavCatalog, CatalogError>
where
    F: Fn() + Send + Sync + 'static,
{
    NavCatalog::new(vec![
        NavOption::anonymous("Login", "/login"),
        NavOption::anonymous("Registro", "/registro"),
        NavOption::authenticated("Perfil", "/perfil"),
        NavOption::authenticated("Reservas", "/reservas").with_roles(&[ROLE_ADMIN, ROLE_PHYSICIAN, ROLE_LAB]),
        NavOption::authenticated("Nueva reserva", "/reservas/nueva").with_roles(&[ROLE_ADMIN, ROLE_PHYSICIAN]),
        NavOption::authenticated("Pacientes", "/pacientes").with_roles(&[ROLE_ADMIN, ROLE_PHYSICIAN]),
        NavOption::authenticated("Laboratorios", "/laboratorios").with_roles(&[ROLE_ADMIN, ROLE_LAB]),
        NavOption::authenticated("Cerrar sesión", "").with_action(on_logout),
    ])
}

// =============================================================================
// POLICY
// =============================================================================

#[derive(Debug, Clone)]
pub struct NavigationPolicy {
    catalog: Arc<NavCatalog>,
}

impl NavigationPolicy {
    #[must_use]
    pub fn new(catalog: NavCatalog) -> Self {
        Self { catalog: Arc::new(catalog) }
    }

    /// Options visible under `session`, in catalog order.
    #[must_use]
    pub fn visible_options(&self, session: Option<&Session>) -> Vec<&NavOption> {
        visible(&self.catalog, session)
    }

    /// Case-insensitive label lookup over the whole catalog.
    #[must_use]
    pub fn find(&self, label: &str) -> Option<&NavOption> {
        let wanted = label.trim().to_lowercase();
        self.catalog
            .options()
            .iter()
            .find(|o| o.label.to_lowercase() == wanted)
    }

    /// Run the option: its action followed by a redirect home, else its
    /// route. An option with neither does nothing.
    pub fn activate(&self, option: &NavOption, navigator: &dyn Navigator) {
        if let Some(action) = &option.on_activate {
            tracing::debug!(label = %option.label, "running menu action");
            action();
            navigator.navigate(HOME_ROUTE);
        } else if !option.route.is_empty() {
            navigator.navigate(&option.route);
        }
    }

    /// Keep a live copy of the visible options in step with `sessions`.
    pub fn watch(&self, sessions: &SessionStore) -> MenuWatch {
        let visible_now = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&visible_now);
        let catalog = Arc::clone(&self.catalog);
        let subscription = sessions.subscribe(move |session| {
            let options: Vec<NavOption> = visible(&catalog, session).into_iter().cloned().collect();
            tracing::debug!(count = options.len(), "menu recomputed");
            *sink.lock().unwrap_or_else(PoisonError::into_inner) = options;
        });
        MenuWatch { visible: visible_now, _subscription: subscription }
    }
}

fn visible<'a>(catalog: &'a NavCatalog, session: Option<&Session>) -> Vec<&'a NavOption> {
    catalog
        .options()
        .iter()
        .filter(|o| o.is_visible_to(session))
        .collect()
}

// =============================================================================
// MENU WATCH
// =============================================================================

/// The menu as currently rendered. Dropping it stops tracking the session.
pub struct MenuWatch {
    visible: Arc<Mutex<Vec<NavOption>>>,
    _subscription: Subscription,
}

impl MenuWatch {
    #[must_use]
    pub fn options(&self) -> Vec<NavOption> {
        self.visible
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    #[must_use]
    pub fn labels(&self) -> Vec<String> {
        self.options().into_iter().map(|o| o.label).collect()
    }
}

#[cfg(test)]
#[path = "navigation_test.rs"]
mod tests;
