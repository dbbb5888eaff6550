//! SQL statement construction for the provisioning pipeline
//!
//! Configuration values are never spliced into statements raw: identifiers
//! go through `quote_ident` and literals through `quote_literal`.

/// Quote a PostgreSQL identifier (role or database name).
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Quote a PostgreSQL string literal (passwords).
///
/// Uses the E'' form when the value contains backslashes so the result is
/// valid regardless of the server's `standard_conforming_strings` setting.
pub fn quote_literal(value: &str) -> String {
    if value.contains('\\') {
        format!(
            "E'{}'",
            value.replace('\\', "\\\\").replace('\'', "''")
        )
    } else {
        format!("'{}'", value.replace('\'', "''"))
    }
}

pub fn drop_database(database: &str, force: bool) -> String {
    if force {
        format!(
            "DROP DATABASE IF EXISTS {} WITH (FORCE)",
            quote_ident(database)
        )
    } else {
        format!("DROP DATABASE IF EXISTS {}", quote_ident(database))
    }
}

pub fn drop_role(role: &str) -> String {
    format!("DROP ROLE IF EXISTS {}", quote_ident(role))
}

pub fn create_role(role: &str, password: &str) -> String {
    format!(
        "CREATE ROLE {} WITH LOGIN PASSWORD {}",
        quote_ident(role),
        quote_literal(password)
    )
}

pub fn create_database(database: &str) -> String {
    format!("CREATE DATABASE {}", quote_ident(database))
}

pub fn grant_database(database: &str, role: &str) -> String {
    format!(
        "GRANT ALL PRIVILEGES ON DATABASE {} TO {}",
        quote_ident(database),
        quote_ident(role)
    )
}

pub fn create_extension() -> &'static str {
    "CREATE EXTENSION IF NOT EXISTS vector"
}

pub fn grant_schema(role: &str) -> String {
    format!("GRANT ALL ON SCHEMA public TO {}", quote_ident(role))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_ident_plain() {
        assert_eq!(quote_ident("testdb"), "\"testdb\"");
    }

    #[test]
    fn test_quote_ident_embedded_quote() {
        assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
    }

    #[test]
    fn test_quote_literal_escapes_single_quotes() {
        assert_eq!(quote_literal("it's"), "'it''s'");
    }

    #[test]
    fn test_quote_literal_backslash_uses_escape_string() {
        assert_eq!(quote_literal("a\\b"), "E'a\\\\b'");
    }

    #[test]
    fn test_drop_database_force() {
        assert_eq!(
            drop_database("testdb", true),
            "DROP DATABASE IF EXISTS \"testdb\" WITH (FORCE)"
        );
    }

    #[test]
    fn test_create_role_quotes_password() {
        assert_eq!(
            create_role("alice", "s'ecret"),
            "CREATE ROLE \"alice\" WITH LOGIN PASSWORD 's''ecret'"
        );
    }

    #[test]
    fn test_grant_database() {
        assert_eq!(
            grant_database("testdb", "alice"),
            "GRANT ALL PRIVILEGES ON DATABASE \"testdb\" TO \"alice\""
        );
    }
}
