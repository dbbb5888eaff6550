//! Error taxonomy for the provisioning run
//!
//! Every failure mode maps to a distinct exit code so operators and scripts
//! can tell a privilege problem from a missing server-side extension.

use crate::provision::Step;
use thiserror::Error;
use tokio_postgres::error::SqlState;

#[derive(Debug, Error)]
pub enum ProvisionError {
    /// Missing or unusable configuration.
    #[error("invalid configuration: {0}")]
    Environment(String),

    /// Server unreachable or authentication rejected.
    #[error("database connection failed: {0}")]
    Connection(String),

    /// The admin credential lacks a privilege a step requires.
    #[error("insufficient privilege during {step}: {detail}")]
    Permission { step: Step, detail: String },

    /// An external precondition is not met (extension package absent,
    /// database held open by other sessions).
    #[error("{step}: {detail}")]
    Dependency { step: Step, detail: String },

    /// Any other SQL failure, naming the step that hit it.
    #[error("{step} failed: {detail}")]
    Statement { step: Step, detail: String },

    /// Explicit connect or statement timeout expired.
    #[error("{what} timed out after {seconds}s")]
    Timeout { what: &'static str, seconds: u64 },
}

impl ProvisionError {
    /// Process exit code for this failure. 0 is reserved for success.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Environment(_) => 2,
            Self::Connection(_) => 3,
            Self::Permission { .. } => 4,
            Self::Dependency { .. } => 5,
            Self::Statement { .. } => 6,
            Self::Timeout { .. } => 7,
        }
    }
}

/// Classify a driver error that occurred while executing `step`.
///
/// Errors without a server-side component (socket closed, I/O failure) are
/// connection failures; everything else is classified by SQLSTATE.
pub fn classify(step: Step, err: tokio_postgres::Error) -> ProvisionError {
    match err.as_db_error() {
        Some(db) => classify_sqlstate(step, db.code(), db.message()),
        None => ProvisionError::Connection(err.to_string()),
    }
}

/// Map a SQLSTATE to the provisioning error taxonomy.
pub fn classify_sqlstate(step: Step, code: &SqlState, message: &str) -> ProvisionError {
    // Class 28: invalid authorization (bad password, unknown role)
    if code.code().starts_with("28") {
        return ProvisionError::Connection(message.to_string());
    }

    if *code == SqlState::INSUFFICIENT_PRIVILEGE {
        return ProvisionError::Permission {
            step,
            detail: message.to_string(),
        };
    }

    if *code == SqlState::OBJECT_IN_USE && step == Step::DropDatabase {
        return ProvisionError::Dependency {
            step,
            detail: format!("database is in use by other sessions: {message}"),
        };
    }

    if step == Step::CreateExtension
        && (*code == SqlState::UNDEFINED_FILE || *code == SqlState::FEATURE_NOT_SUPPORTED)
    {
        return ProvisionError::Dependency {
            step,
            detail: format!(
                "the vector extension is not installed on the server; \
                 install the pgvector package for your PostgreSQL version \
                 and re-run ({message})"
            ),
        };
    }

    ProvisionError::Statement {
        step,
        detail: message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_privilege_is_permission() {
        let err = classify_sqlstate(
            Step::CreateDatabase,
            &SqlState::INSUFFICIENT_PRIVILEGE,
            "permission denied to create database",
        );
        assert!(matches!(
            err,
            ProvisionError::Permission {
                step: Step::CreateDatabase,
                ..
            }
        ));
        assert_eq!(err.exit_code(), 4);
    }

    #[test]
    fn test_auth_failure_is_connection() {
        let err = classify_sqlstate(
            Step::DropDatabase,
            &SqlState::INVALID_PASSWORD,
            "password authentication failed",
        );
        assert!(matches!(err, ProvisionError::Connection(_)));
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn test_database_in_use_is_dependency() {
        let err = classify_sqlstate(
            Step::DropDatabase,
            &SqlState::OBJECT_IN_USE,
            "database \"testdb\" is being accessed by other users",
        );
        assert!(matches!(
            err,
            ProvisionError::Dependency {
                step: Step::DropDatabase,
                ..
            }
        ));
    }

    #[test]
    fn test_missing_extension_is_dependency_with_hint() {
        let err = classify_sqlstate(
            Step::CreateExtension,
            &SqlState::UNDEFINED_FILE,
            "could not open extension control file",
        );
        assert_eq!(err.exit_code(), 5);
        assert!(err.to_string().contains("pgvector package"));
    }

    #[test]
    fn test_object_in_use_outside_drop_is_statement() {
        let err = classify_sqlstate(
            Step::CreateDatabase,
            &SqlState::OBJECT_IN_USE,
            "source database is being accessed",
        );
        assert!(matches!(err, ProvisionError::Statement { .. }));
        assert_eq!(err.exit_code(), 6);
    }

    #[test]
    fn test_exit_codes_distinct_per_variant() {
        let errors = [
            ProvisionError::Environment("DB_USER must be set".to_string()),
            ProvisionError::Connection("connection refused".to_string()),
            ProvisionError::Permission {
                step: Step::CreateDatabase,
                detail: "permission denied".to_string(),
            },
            ProvisionError::Dependency {
                step: Step::CreateExtension,
                detail: "extension unavailable".to_string(),
            },
            ProvisionError::Statement {
                step: Step::GrantSchema,
                detail: "syntax error".to_string(),
            },
            ProvisionError::Timeout {
                what: "connect",
                seconds: 10,
            },
        ];
        let codes: Vec<i32> = errors.iter().map(|e| e.exit_code()).collect();
        assert_eq!(codes, vec![2, 3, 4, 5, 6, 7]);
    }

    #[test]
    fn test_unknown_sqlstate_is_statement_naming_step() {
        let err = classify_sqlstate(
            Step::GrantSchema,
            &SqlState::SYNTAX_ERROR,
            "syntax error at or near",
        );
        assert!(err.to_string().contains("grant schema privileges"));
    }
}
