// Request/response channel: GraphQL over HTTP POST with bearer-token
// injection.

use async_trait::async_trait;
use jobboard_core::Session;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use tracing::{debug, warn};

use crate::document::Operation;
use crate::error::TransportError;
use crate::protocol::Response;
use crate::selector::RequestChannel;

/// Longest slice of a non-GraphQL error body kept in [`TransportError::Status`].
const MAX_ERROR_BODY: usize = 512;

pub struct HttpChannel {
    http: reqwest::Client,
    endpoint: String,
    session: Option<Session>,
}

impl HttpChannel {
    /// A channel posting to `endpoint`. With a session, every request carries
    /// the session's token as read at send time; without one, requests are
    /// anonymous.
    pub fn new(endpoint: impl Into<String>, session: Option<Session>) -> Self {
        Self::with_client(reqwest::Client::new(), endpoint, session)
    }

    pub fn with_client(
        http: reqwest::Client,
        endpoint: impl Into<String>,
        session: Option<Session>,
    ) -> Self {
        Self {
            http,
            endpoint: endpoint.into(),
            session,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Value of the `authorization` header for the next request, if any.
    pub fn authorization(&self) -> Option<String> {
        self.session.as_ref().and_then(Session::bearer)
    }
}

#[async_trait]
impl RequestChannel for HttpChannel {
    async fn request(&self, operation: &Operation) -> Result<Response, TransportError> {
        let mut request = self
            .http
            .post(&self.endpoint)
            .header(ACCEPT, "application/json")
            .json(&operation.payload());

        let authorization = self.authorization();
        let authenticated = authorization.is_some();
        if let Some(value) = authorization {
            request = request.header(AUTHORIZATION, value);
        }

        debug!(
            operation = operation.name().unwrap_or("<anonymous>"),
            authenticated, "POST {}", self.endpoint
        );

        let response = request.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        decode_response(status, &body)
    }
}

/// Interpret an HTTP reply. A body carrying GraphQL errors is returned even
/// with a non-2xx status so the server's messages reach the caller.
pub(crate) fn decode_response(status: u16, body: &str) -> Result<Response, TransportError> {
    let success = (200..300).contains(&status);
    match serde_json::from_str::<Response>(body) {
        Ok(response) if success || response.has_errors() => Ok(response),
        Ok(_) => Err(status_error(status, body)),
        Err(_) if !success => Err(status_error(status, body)),
        Err(e) => {
            warn!("undecodable GraphQL response body: {e}");
            Err(TransportError::Decode(e))
        }
    }
}

fn status_error(status: u16, body: &str) -> TransportError {
    let mut end = body.len().min(MAX_ERROR_BODY);
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    TransportError::Status {
        status,
        body: body[..end].to_string(),
    }
}
