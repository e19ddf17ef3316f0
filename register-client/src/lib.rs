//! Producer side of the register center: writes metadata and uri
//! registrations as records the gateway can watch.
pub mod config;
pub mod metrics_defs;
mod repository;

pub use repository::{ClientRegisterRepository, RegisterError};
