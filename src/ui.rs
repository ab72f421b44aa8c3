//! Presentation-side collaborators the flows drive: route changes and
//! user-visible alerts. The binary implements them as terminal output.

/// Root route; every side-effecting menu action lands here.
pub const HOME_ROUTE: &str = "/";
pub const LOGIN_ROUTE: &str = "/login";
pub const PROFILE_ROUTE: &str = "/perfil";
pub const ADMIN_ROUTE: &str = "/admin";
pub const RESERVATIONS_ROUTE: &str = "/reservas";

/// Performs a route change.
pub trait Navigator: Send + Sync {
    fn navigate(&self, route: &str);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertLevel {
    Info,
    Warning,
    Error,
}

/// Blocking, user-visible messages.
pub trait Alerts: Send + Sync {
    fn alert(&self, level: AlertLevel, message: &str);
}

// =============================================================================
// TEST HELPERS
// =============================================================================

#[cfg(test)]
pub mod test_helpers {
    use std::sync::Mutex;

    use super::*;

    /// Records every route change.
    #[derive(Default)]
    pub struct RecordingNavigator {
        pub routes: Mutex<Vec<String>>,
    }

    impl RecordingNavigator {
        pub fn routes(&self) -> Vec<String> {
            self.routes.lock().unwrap().clone()
        }
    }

    impl Navigator for RecordingNavigator {
        fn navigate(&self, route: &str) {
            self.routes.lock().unwrap().push(route.to_owned());
        }
    }

    /// Records every alert.
    #[derive(Default)]
    pub struct RecordingAlerts {
        pub alerts: Mutex<Vec<(AlertLevel, String)>>,
    }

    impl RecordingAlerts {
        pub fn levels(&self) -> Vec<AlertLevel> {
            self.alerts.lock().unwrap().iter().map(|(l, _)| *l).collect()
        }
    }

    impl Alerts for RecordingAlerts {
        fn alert(&self, level: AlertLevel, message: &str) {
            self.alerts.lock().unwrap().push((level, message.to_owned()));
        }
    }
}
