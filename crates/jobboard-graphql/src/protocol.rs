// Wire shapes: the GraphQL-over-HTTP request/response bodies and the
// `graphql-transport-ws` messages used on the subscription socket.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::TransportError;

/// WebSocket subprotocol spoken on the persistent channel.
pub const WS_SUBPROTOCOL: &str = "graphql-transport-ws";

// ---------------------------------------------------------------------------
// Operation payload and execution result
// ---------------------------------------------------------------------------

/// Body of an HTTP request and payload of a `subscribe` message.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationPayload<'a> {
    pub query: &'a str,
    pub variables: &'a Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation_name: Option<&'a str>,
}

/// A GraphQL execution result.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Response {
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<GraphqlError>>,
}

impl Response {
    pub fn has_errors(&self) -> bool {
        self.errors.as_ref().is_some_and(|e| !e.is_empty())
    }

    /// The `data` of a successful result. Any reported error rejects the
    /// whole result, as does a missing `data`.
    pub fn into_data(self) -> Result<Value, TransportError> {
        match self.errors {
            Some(errors) if !errors.is_empty() => Err(TransportError::Graphql(errors)),
            _ => match self.data {
                Some(Value::Null) | None => Err(TransportError::MissingData),
                Some(data) => Ok(data),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphqlError {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Value>,
}

impl GraphqlError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            path: None,
            extensions: None,
        }
    }
}

// ---------------------------------------------------------------------------
// graphql-transport-ws messages
// ---------------------------------------------------------------------------

/// Messages the client sends on the subscription socket.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    ConnectionInit { payload: Map<String, Value> },
    Subscribe { id: String, payload: Value },
    Complete { id: String },
    Ping {},
    Pong {},
}

/// Messages the server sends on the subscription socket.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    ConnectionAck {
        #[serde(default)]
        payload: Option<Value>,
    },
    Next {
        id: String,
        payload: Response,
    },
    Error {
        id: String,
        payload: Vec<GraphqlError>,
    },
    Complete {
        id: String,
    },
    Ping {
        #[serde(default)]
        payload: Option<Value>,
    },
    Pong {
        #[serde(default)]
        payload: Option<Value>,
    },
}

/// Connection parameters sent with `connection_init`:
/// `{"authorization": "Bearer <token>"}`, or `{}` without a token.
pub fn connection_params(bearer: Option<String>) -> Map<String, Value> {
    let mut params = Map::new();
    if let Some(bearer) = bearer {
        params.insert("authorization".to_string(), Value::String(bearer));
    }
    params
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn connection_params_with_token() {
        let params = connection_params(Some("Bearer xyz".into()));
        assert_eq!(Value::Object(params), json!({ "authorization": "Bearer xyz" }));
    }

    #[test]
    fn connection_params_without_token_is_empty_object() {
        assert_eq!(Value::Object(connection_params(None)), json!({}));
    }

    #[test]
    fn client_messages_serialize_with_type_tag() {
        let init = ClientMessage::ConnectionInit {
            payload: connection_params(Some("Bearer t".into())),
        };
        assert_eq!(
            serde_json::to_value(&init).unwrap(),
            json!({ "type": "connection_init", "payload": { "authorization": "Bearer t" } })
        );

        let complete = ClientMessage::Complete { id: "abc".into() };
        assert_eq!(
            serde_json::to_value(&complete).unwrap(),
            json!({ "type": "complete", "id": "abc" })
        );

        assert_eq!(
            serde_json::to_value(ClientMessage::Pong {}).unwrap(),
            json!({ "type": "pong" })
        );
    }

    #[test]
    fn server_next_message_parses() {
        let msg: ServerMessage = serde_json::from_str(
            r#"{"type":"next","id":"1","payload":{"data":{"jobCreated":{"id":"j1"}}}}"#,
        )
        .unwrap();
        match msg {
            ServerMessage::Next { id, payload } => {
                assert_eq!(id, "1");
                assert_eq!(payload.into_data().unwrap(), json!({ "jobCreated": { "id": "j1" } }));
            }
            other => panic!("expected next, got {other:?}"),
        }
    }

    #[test]
    fn server_ack_without_payload_parses() {
        let msg: ServerMessage = serde_json::from_str(r#"{"type":"connection_ack"}"#).unwrap();
        assert_eq!(msg, ServerMessage::ConnectionAck { payload: None });
    }

    #[test]
    fn server_error_message_parses() {
        let msg: ServerMessage = serde_json::from_str(
            r#"{"type":"error","id":"7","payload":[{"message":"Not authorized"}]}"#,
        )
        .unwrap();
        assert_eq!(
            msg,
            ServerMessage::Error {
                id: "7".into(),
                payload: vec![GraphqlError::new("Not authorized")],
            }
        );
    }

    #[test]
    fn unknown_server_message_type_fails() {
        assert!(serde_json::from_str::<ServerMessage>(r#"{"type":"data","id":"1"}"#).is_err());
    }

    #[test]
    fn response_with_errors_is_rejected() {
        let response: Response = serde_json::from_value(json!({
            "data": null,
            "errors": [{ "message": "Invalid credentials", "path": ["login"] }]
        }))
        .unwrap();
        assert!(response.has_errors());
        match response.into_data() {
            Err(TransportError::Graphql(errors)) => {
                assert_eq!(errors[0].message, "Invalid credentials");
            }
            other => panic!("expected graphql error, got {other:?}"),
        }
    }

    #[test]
    fn response_without_data_is_rejected() {
        let response: Response = serde_json::from_value(json!({ "data": null })).unwrap();
        assert!(matches!(response.into_data(), Err(TransportError::MissingData)));
    }

    #[test]
    fn null_errors_field_is_accepted() {
        let response: Response =
            serde_json::from_value(json!({ "data": { "me": null }, "errors": null })).unwrap();
        assert!(!response.has_errors());
        assert_eq!(response.into_data().unwrap(), json!({ "me": null }));
    }
}
