//! Database bootstrap for a pgvector-backed application
//!
//! Drops and recreates the application database and role, grants privileges,
//! and enables the vector extension. Runs once and exits; exit codes
//! distinguish configuration, connection, privilege, dependency, statement
//! and timeout failures.

use pgvector_provision::{init_logging, Config, Provisioner};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let _guard = init_logging();

    let config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            error!(error = %e, "Configuration error");
            std::process::exit(e.exit_code());
        }
    };

    info!(
        host = %config.host,
        port = config.port,
        database = %config.db_name,
        role = %config.db_user,
        "Starting provisioning run"
    );

    if let Err(e) = Provisioner::new(config).run().await {
        error!(error = %e, "Provisioning failed");
        std::process::exit(e.exit_code());
    }
}
