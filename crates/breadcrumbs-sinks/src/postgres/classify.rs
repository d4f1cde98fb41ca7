//! Turning raw database failures into [`PostgresError`] kinds.

use crate::error::CONNECTION_EXCEPTION_CLASS;
use crate::{PostgresError, SinkError};
use regex::{Regex, RegexBuilder};
use std::io;

/// SQLSTATE for a statement cancelled by `statement_timeout`.
const STATEMENT_TIMEOUT_CODE: &str = "57014";

/// Invalid password, invalid authorization, insufficient privilege.
const AUTH_CODES: &[&str] = &["28P01", "28000", "42501"];

/// Socket-level error names reported for connection failures.
const TRANSPORT_CODES: &[&str] = &[
    "ECONNREFUSED",
    "ECONNRESET",
    "EPIPE",
    "ETIMEDOUT",
    "ENOTFOUND",
    "EHOSTUNREACH",
    "EAI_AGAIN",
    "ECONNABORTED",
];

const TRANSPORT_VOCABULARY: &str = "connect|connection|socket|network|dns|econn";

/// A database failure before classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbFailure {
    /// SQLSTATE or socket error name, when known.
    pub code: Option<String>,
    pub message: String,
}

impl DbFailure {
    pub fn new(code: Option<&str>, message: impl Into<String>) -> Self {
        Self {
            code: code.map(str::to_string),
            message: message.into(),
        }
    }

    /// The client-side deadline for one attempt elapsed.
    pub fn deadline(timeout_ms: u64) -> Self {
        Self::new(None, format!("query timeout after {timeout_ms}ms"))
    }

    /// Extract code and message from a sqlx error.
    pub fn from_sqlx(err: &sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db) => Self::new(db.code().as_deref(), db.message()),
            sqlx::Error::Io(io) => Self::new(io_code(io), io.to_string()),
            sqlx::Error::PoolTimedOut => {
                Self::new(None, "connection acquire timeout: pool timed out")
            }
            other => Self::new(None, other.to_string()),
        }
    }
}

fn io_code(err: &io::Error) -> Option<&'static str> {
    let code = match err.kind() {
        io::ErrorKind::ConnectionRefused => "ECONNREFUSED",
        io::ErrorKind::ConnectionReset => "ECONNRESET",
        io::ErrorKind::ConnectionAborted => "ECONNABORTED",
        io::ErrorKind::BrokenPipe => "EPIPE",
        io::ErrorKind::TimedOut => "ETIMEDOUT",
        io::ErrorKind::HostUnreachable => "EHOSTUNREACH",
        _ if err.to_string().contains("failed to lookup address") => "ENOTFOUND",
        _ => return None,
    };
    Some(code)
}

/// Maps failures to [`PostgresError`] kinds for one sink.
///
/// Checked in order: timeout, auth, transport, query.
#[derive(Debug, Clone)]
pub struct FailureClassifier {
    timeout_ms: u64,
    transport_vocabulary: Regex,
}

impl FailureClassifier {
    pub fn new(timeout_ms: u64) -> Result<Self, SinkError> {
        let transport_vocabulary = RegexBuilder::new(TRANSPORT_VOCABULARY)
            .case_insensitive(true)
            .build()
            .map_err(|err| SinkError::InvalidConfig(format!("transport vocabulary: {err}")))?;
        Ok(Self {
            timeout_ms,
            transport_vocabulary,
        })
    }

    pub fn timeout_ms(&self) -> u64 {
        self.timeout_ms
    }

    pub fn classify(&self, failure: &DbFailure) -> PostgresError {
        let code = failure.code.as_deref();
        if self.is_timeout(failure) {
            return PostgresError::Timeout {
                timeout_ms: self.timeout_ms,
            };
        }
        if code.is_some_and(|code| AUTH_CODES.contains(&code)) {
            return PostgresError::Auth;
        }
        if self.is_transport(failure) {
            return PostgresError::Transport {
                message: failure.message.clone(),
            };
        }
        PostgresError::Query {
            code: failure.code.clone(),
            message: failure.message.clone(),
        }
    }

    fn is_timeout(&self, failure: &DbFailure) -> bool {
        if failure.code.as_deref() == Some(STATEMENT_TIMEOUT_CODE) {
            return true;
        }
        let message = failure.message.to_lowercase();
        message.contains("timeout") || message.contains(&format!("{}ms", self.timeout_ms))
    }

    fn is_transport(&self, failure: &DbFailure) -> bool {
        if let Some(code) = failure.code.as_deref() {
            if TRANSPORT_CODES.contains(&code) || code.starts_with(CONNECTION_EXCEPTION_CLASS) {
                return true;
            }
        }
        self.transport_vocabulary.is_match(&failure.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn classify(failure: &DbFailure, timeout_ms: u64) -> PostgresError {
        FailureClassifier::new(timeout_ms)
            .expect("classifier")
            .classify(failure)
    }

    #[test]
    fn statement_timeout_code_is_timeout() {
        let failure = DbFailure::new(Some("57014"), "canceling statement due to statement timeout");
        assert_eq!(
            classify(&failure, 10),
            PostgresError::Timeout { timeout_ms: 10 }
        );
        assert_eq!(classify(&failure, 10).to_string(), "Postgres timeout after 10ms.");
    }

    #[test]
    fn deadline_failure_is_timeout() {
        assert_eq!(
            classify(&DbFailure::deadline(250), 250),
            PostgresError::Timeout { timeout_ms: 250 }
        );
    }

    #[test]
    fn auth_codes_are_auth() {
        for code in ["28P01", "28000", "42501"] {
            let failure = DbFailure::new(Some(code), "password authentication failed");
            assert_eq!(classify(&failure, 5000), PostgresError::Auth, "{code}");
        }
    }

    #[test]
    fn timeout_wins_over_auth() {
        let failure = DbFailure::new(Some("28P01"), "timeout expired");
        assert_eq!(
            classify(&failure, 5000),
            PostgresError::Timeout { timeout_ms: 5000 }
        );
    }

    #[test]
    fn connection_refused_is_transport() {
        let failure = DbFailure::new(Some("ECONNREFUSED"), "connect ECONNREFUSED 127.0.0.1:5432");
        let err = classify(&failure, 5000);
        assert_eq!(
            err,
            PostgresError::Transport {
                message: "connect ECONNREFUSED 127.0.0.1:5432".to_string()
            }
        );
        assert!(err.to_string().contains("transport error"));
    }

    #[test]
    fn connection_exception_class_is_transport() {
        let failure = DbFailure::new(Some("08006"), "server closed unexpectedly");
        assert!(matches!(classify(&failure, 5000), PostgresError::Transport { .. }));
    }

    #[test]
    fn message_vocabulary_is_transport() {
        let failure = DbFailure::new(None, "Network unreachable");
        assert!(matches!(classify(&failure, 5000), PostgresError::Transport { .. }));
    }

    #[test]
    fn one_classifier_serves_many_failures() {
        let classifier = FailureClassifier::new(500).expect("classifier");
        assert_eq!(classifier.timeout_ms(), 500);
        for message in ["SOCKET closed", "dns lookup failed", "Connection reset by peer"] {
            let failure = DbFailure::new(None, message);
            assert!(
                matches!(classifier.classify(&failure), PostgresError::Transport { .. }),
                "{message}"
            );
        }
        let failure = DbFailure::new(Some("23505"), "duplicate key value");
        assert!(matches!(classifier.classify(&failure), PostgresError::Query { .. }));
    }

    #[test]
    fn other_codes_are_query_errors() {
        let failure = DbFailure::new(Some("42P01"), "relation \"agent_logs\" does not exist");
        assert_eq!(
            classify(&failure, 5000),
            PostgresError::Query {
                code: Some("42P01".to_string()),
                message: "relation \"agent_logs\" does not exist".to_string(),
            }
        );
    }

    #[test]
    fn io_errors_map_to_socket_codes() {
        let err = sqlx::Error::Io(io::Error::new(io::ErrorKind::ConnectionRefused, "refused"));
        assert_eq!(
            DbFailure::from_sqlx(&err).code.as_deref(),
            Some("ECONNREFUSED")
        );
    }

    #[test]
    fn pool_timeout_classifies_as_timeout() {
        let failure = DbFailure::from_sqlx(&sqlx::Error::PoolTimedOut);
        assert_eq!(
            classify(&failure, 100),
            PostgresError::Timeout { timeout_ms: 100 }
        );
    }
}
