//! # reservalab
//!
//! Client-side core for the lab reservation system: session state shared by
//! independent UI regions, credential login against the auth backend,
//! role-based navigation filtering, the two-mode reservation form, and
//! self-service registration.
//!
//! DESIGN
//! ======
//! Every stateful piece is constructed once at the application root and
//! handed to consumers by handle. Nothing lives in a static. The HTTP backend
//! sits behind the [`net::api::LabApi`] trait so flows can be exercised with
//! mocks, and the presentation layer is reduced to the [`ui::Navigator`] and
//! [`ui::Alerts`] collaborators.

pub mod auth;
pub mod config;
pub mod navigation;
pub mod net;
pub mod registration;
pub mod reservation;
pub mod session;
pub mod storage;
pub mod ui;
