use thiserror::Error;
use tokio_tungstenite::tungstenite;

use crate::document::{DocumentError, OperationKind};
use crate::protocol::GraphqlError;

/// Why an operation was rejected.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error(transparent)]
    Document(#[from] DocumentError),

    #[error("network error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("invalid response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("{}", join_messages(.0))]
    Graphql(Vec<GraphqlError>),

    #[error("response contained no data")]
    MissingData,

    #[error("response data has no field `{0}`")]
    MissingField(String),

    #[error("websocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),

    #[error("protocol violation: {0}")]
    Protocol(String),

    #[error("connection rejected: {0}")]
    ConnectionRejected(String),

    #[error("subscription connection closed")]
    ConnectionClosed,

    #[error("subscriptions are not available in this execution context")]
    SubscriptionsUnavailable,

    #[error("expected a {expected} operation, got {}", describe_kind(.found))]
    WrongKind {
        expected: OperationKind,
        found: Option<OperationKind>,
    },
}

impl TransportError {
    /// The first message reported by the server, if the server rejected the
    /// operation itself rather than the transport failing.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            TransportError::Graphql(errors) => errors.first().map(|e| e.message.as_str()),
            _ => None,
        }
    }
}

fn join_messages(errors: &[GraphqlError]) -> String {
    if errors.is_empty() {
        return "server reported an error".to_string();
    }
    errors
        .iter()
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

fn describe_kind(found: &Option<OperationKind>) -> String {
    match found {
        Some(kind) => format!("a {kind}"),
        None => "a fragment-only document".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn graphql_error_display_joins_messages() {
        let err = TransportError::Graphql(vec![
            GraphqlError::new("Job not found"),
            GraphqlError::new("Forbidden"),
        ]);
        assert_eq!(err.to_string(), "Job not found; Forbidden");
        assert_eq!(err.server_message(), Some("Job not found"));
    }

    #[test]
    fn transport_failures_have_no_server_message() {
        assert_eq!(TransportError::ConnectionClosed.server_message(), None);
        let status = TransportError::Status {
            status: 502,
            body: "bad gateway".into(),
        };
        assert_eq!(status.server_message(), None);
        assert_eq!(status.to_string(), "server returned status 502: bad gateway");
    }

    #[test]
    fn wrong_kind_display() {
        let err = TransportError::WrongKind {
            expected: OperationKind::Query,
            found: Some(OperationKind::Subscription),
        };
        assert_eq!(
            err.to_string(),
            "expected a query operation, got a subscription"
        );
        let err = TransportError::WrongKind {
            expected: OperationKind::Mutation,
            found: None,
        };
        assert!(err.to_string().ends_with("a fragment-only document"));
    }
}
