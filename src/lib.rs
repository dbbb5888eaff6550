//! PostgreSQL provisioning for a pgvector-backed application
//!
//! One-shot bootstrap of an application database and role:
//! - Structured logging initialization
//! - Environment/file configuration
//! - An ordered, short-circuiting statement pipeline over a persistent
//!   admin connection

pub mod config;
pub mod error;
pub mod logging;
pub mod provision;
pub mod sql;

pub use config::Config;
pub use error::ProvisionError;
pub use logging::init_logging;
pub use provision::{Provisioner, Step};
