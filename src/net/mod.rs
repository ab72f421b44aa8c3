//! Backend HTTP access: wire types and the `LabApi` seam.

pub mod api;
pub mod types;
