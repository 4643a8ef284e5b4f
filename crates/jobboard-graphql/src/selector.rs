// Transport selection: every operation goes either over the request/response
// channel or over the persistent subscription channel, decided by the kind
// of its main definition.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::document::Operation;
use crate::error::TransportError;
use crate::protocol::Response;
use crate::ws::Subscription;

/// One-shot request/reply transport for queries and mutations.
#[async_trait]
pub trait RequestChannel: Send + Sync {
    async fn request(&self, operation: &Operation) -> Result<Response, TransportError>;
}

/// Long-lived bidirectional transport for subscriptions.
#[async_trait]
pub trait PersistentChannel: Send + Sync {
    async fn subscribe(&self, operation: &Operation) -> Result<Subscription, TransportError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    RequestResponse,
    Persistent,
}

/// Subscriptions go over the persistent channel; queries, mutations, and
/// fragment-only documents over the request/response channel.
pub fn route(operation: &Operation) -> Route {
    if operation.is_subscription() {
        Route::Persistent
    } else {
        Route::RequestResponse
    }
}

/// Result of dispatching an operation.
#[derive(Debug)]
pub enum Dispatch {
    Response(Response),
    Subscription(Subscription),
}

/// The composed transport: a request/response channel plus, in interactive
/// contexts, a persistent channel.
pub struct TransportSelector {
    request: Arc<dyn RequestChannel>,
    persistent: Option<Arc<dyn PersistentChannel>>,
}

impl TransportSelector {
    pub fn new(
        request: Arc<dyn RequestChannel>,
        persistent: Option<Arc<dyn PersistentChannel>>,
    ) -> Self {
        Self {
            request,
            persistent,
        }
    }

    pub fn has_persistent_channel(&self) -> bool {
        self.persistent.is_some()
    }

    pub async fn dispatch(&self, operation: &Operation) -> Result<Dispatch, TransportError> {
        let route = route(operation);
        debug!(
            operation = operation.name().unwrap_or("<anonymous>"),
            ?route,
            "dispatching operation"
        );
        match route {
            Route::RequestResponse => {
                let response = self.request.request(operation).await?;
                Ok(Dispatch::Response(response))
            }
            Route::Persistent => match &self.persistent {
                Some(channel) => Ok(Dispatch::Subscription(channel.subscribe(operation).await?)),
                None => Err(TransportError::SubscriptionsUnavailable),
            },
        }
    }
}
