//! The provisioning pipeline
//!
//! Runs a fixed sequence of administrative statements over one persistent
//! admin connection, then a second connection to the new database for the
//! extension and schema grants. Each step either succeeds or the run aborts
//! with an error naming the step it reached. Only the database drop is
//! retried, once, to let transient connections close.

use crate::config::Config;
use crate::error::{classify, ProvisionError};
use crate::sql;
use std::fmt;
use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tokio_postgres::{Client, NoTls};
use tracing::{debug, info, warn};

/// A single step of the bootstrap sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    DropDatabase,
    DropRole,
    CreateRole,
    CreateDatabase,
    GrantDatabase,
    CreateExtension,
    GrantSchema,
}

impl Step {
    pub fn describe(&self) -> &'static str {
        match self {
            Self::DropDatabase => "drop database",
            Self::DropRole => "drop role",
            Self::CreateRole => "create role",
            Self::CreateDatabase => "create database",
            Self::GrantDatabase => "grant database privileges",
            Self::CreateExtension => "create vector extension",
            Self::GrantSchema => "grant schema privileges",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.describe())
    }
}

/// One-shot database bootstrap: drop/create role and database, grant
/// privileges, enable the vector extension.
pub struct Provisioner {
    config: Config,
}

impl Provisioner {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Steps executed on the admin maintenance database, in order.
    fn admin_plan(&self) -> Vec<(Step, String)> {
        let c = &self.config;
        vec![
            (
                Step::DropDatabase,
                sql::drop_database(&c.db_name, c.drop_force),
            ),
            (Step::DropRole, sql::drop_role(&c.db_user)),
            (Step::CreateRole, sql::create_role(&c.db_user, &c.db_pass)),
            (Step::CreateDatabase, sql::create_database(&c.db_name)),
            (
                Step::GrantDatabase,
                sql::grant_database(&c.db_name, &c.db_user),
            ),
        ]
    }

    /// Steps executed on the freshly created database.
    fn target_plan(&self) -> Vec<(Step, String)> {
        vec![
            (Step::CreateExtension, sql::create_extension().to_string()),
            (Step::GrantSchema, sql::grant_schema(&self.config.db_user)),
        ]
    }

    /// Run the full bootstrap sequence.
    pub async fn run(&self) -> Result<(), ProvisionError> {
        let c = &self.config;

        let admin = self.connect(&c.admin_db).await?;
        for (step, stmt) in self.admin_plan() {
            if step == Step::DropDatabase {
                self.drop_database(&admin, &stmt).await?;
            } else {
                self.execute(&admin, step, &stmt).await?;
            }
        }

        let target = self.connect(&c.db_name).await?;
        for (step, stmt) in self.target_plan() {
            self.execute(&target, step, &stmt).await?;
        }

        info!(
            host = %c.host,
            port = c.port,
            database = %c.db_name,
            role = %c.db_user,
            password = "<redacted>",
            "Provisioning complete"
        );
        Ok(())
    }

    /// Open a connection as the admin role to the given database.
    async fn connect(&self, database: &str) -> Result<Client, ProvisionError> {
        let c = &self.config;
        info!(host = %c.host, port = c.port, database = %database, user = %c.admin_user, "Connecting");

        let mut pg = tokio_postgres::Config::new();
        pg.host(&c.host)
            .port(c.port)
            .user(&c.admin_user)
            .dbname(database);
        if !c.admin_pass.is_empty() {
            pg.password(&c.admin_pass);
        }

        let (client, connection) = timeout(c.connect_timeout, pg.connect(NoTls))
            .await
            .map_err(|_| ProvisionError::Timeout {
                what: "connect",
                seconds: c.connect_timeout.as_secs(),
            })?
            .map_err(|e| {
                ProvisionError::Connection(format!(
                    "could not connect to {}:{} as {}: {}",
                    c.host, c.port, c.admin_user, e
                ))
            })?;

        // The connection task drives the socket until the client is dropped.
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                debug!(error = %e, "Connection task ended");
            }
        });

        Ok(client)
    }

    /// Execute one statement, classifying failures by step and SQLSTATE.
    async fn execute(
        &self,
        client: &Client,
        step: Step,
        stmt: &str,
    ) -> Result<(), ProvisionError> {
        info!(step = %step, "Executing");
        match timeout(self.config.statement_timeout, client.batch_execute(stmt)).await {
            Err(_) => Err(ProvisionError::Timeout {
                what: step.describe(),
                seconds: self.config.statement_timeout.as_secs(),
            }),
            Ok(Err(e)) => Err(classify(step, e)),
            Ok(Ok(())) => Ok(()),
        }
    }

    /// Drop the target database, retrying once if other sessions hold it open.
    async fn drop_database(&self, client: &Client, stmt: &str) -> Result<(), ProvisionError> {
        retry_drop_once(
            move || self.execute(client, Step::DropDatabase, stmt),
            self.config.drop_retry_delay,
        )
        .await
    }
}

/// Run the drop attempt, retrying exactly once when the database is held
/// open by other sessions. Any other outcome is surfaced as-is.
async fn retry_drop_once<F, Fut>(mut attempt: F, delay: Duration) -> Result<(), ProvisionError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<(), ProvisionError>>,
{
    match attempt().await {
        Err(ProvisionError::Dependency { detail, .. }) => {
            warn!(
                delay_secs = delay.as_secs(),
                %detail,
                "Database in use, retrying drop once"
            );
            sleep(delay).await;
            attempt().await
        }
        other => other,
    }
}
