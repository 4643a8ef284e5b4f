// GraphQL client: a transport selector plus a query cache, and the factory
// that decides whether callers share one client or get a fresh one each.

use std::sync::{Arc, OnceLock};

use jobboard_core::{Endpoints, Session};
use serde_json::Value;
use tracing::{debug, info};

use crate::cache::{FetchPolicy, QueryCache};
use crate::document::{Operation, OperationKind};
use crate::error::TransportError;
use crate::http::HttpChannel;
use crate::selector::{Dispatch, PersistentChannel, RequestChannel, TransportSelector};
use crate::ws::{Subscription, WsChannel};

pub struct GraphqlClient {
    selector: TransportSelector,
    cache: QueryCache,
}

impl GraphqlClient {
    pub fn new(selector: TransportSelector) -> Self {
        Self {
            selector,
            cache: QueryCache::new(),
        }
    }

    /// A client authenticating with `session` on both channels.
    pub fn interactive(endpoints: &Endpoints, session: Session) -> Self {
        let request: Arc<dyn RequestChannel> =
            Arc::new(HttpChannel::new(&endpoints.graphql_url, Some(session.clone())));
        let persistent: Arc<dyn PersistentChannel> =
            Arc::new(WsChannel::new(&endpoints.ws_url, session));
        Self::new(TransportSelector::new(request, Some(persistent)))
    }

    /// An anonymous client with no subscription channel.
    pub fn ephemeral(endpoints: &Endpoints) -> Self {
        let request: Arc<dyn RequestChannel> =
            Arc::new(HttpChannel::new(&endpoints.graphql_url, None));
        Self::new(TransportSelector::new(request, None))
    }

    pub fn selector(&self) -> &TransportSelector {
        &self.selector
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    /// Run a query and return its `data`.
    pub async fn query(
        &self,
        operation: &Operation,
        policy: FetchPolicy,
    ) -> Result<Value, TransportError> {
        expect_kind(operation, OperationKind::Query)?;
        if policy == FetchPolicy::CacheFirst {
            if let Some(data) = self.cache.get(operation) {
                debug!(operation = operation.name().unwrap_or("<anonymous>"), "cache hit");
                return Ok(data);
            }
        }
        let data = self.execute(operation).await?;
        self.cache.put(operation, data.clone());
        Ok(data)
    }

    /// Run a mutation and return its `data`. On success, cached results of the
    /// operations named in `evict` are dropped.
    pub async fn mutate(
        &self,
        operation: &Operation,
        evict: &[&str],
    ) -> Result<Value, TransportError> {
        expect_kind(operation, OperationKind::Mutation)?;
        let data = self.execute(operation).await?;
        for name in evict {
            self.cache.evict_operation(name);
        }
        Ok(data)
    }

    pub async fn subscribe(&self, operation: &Operation) -> Result<Subscription, TransportError> {
        expect_kind(operation, OperationKind::Subscription)?;
        match self.selector.dispatch(operation).await? {
            Dispatch::Subscription(subscription) => Ok(subscription),
            Dispatch::Response(_) => Err(TransportError::Protocol(
                "subscription answered with a single response".to_string(),
            )),
        }
    }

    async fn execute(&self, operation: &Operation) -> Result<Value, TransportError> {
        match self.selector.dispatch(operation).await? {
            Dispatch::Response(response) => response.into_data(),
            Dispatch::Subscription(_) => Err(TransportError::Protocol(
                "request routed to the subscription channel".to_string(),
            )),
        }
    }

    /// Forget every cached result, e.g. after the signed-in user changes.
    pub fn reset_store(&self) {
        self.cache.clear();
        info!("query cache cleared");
    }
}

fn expect_kind(operation: &Operation, expected: OperationKind) -> Result<(), TransportError> {
    match operation.kind() {
        Some(kind) if kind == expected => Ok(()),
        found => Err(TransportError::WrongKind { expected, found }),
    }
}

// ---------------------------------------------------------------------------
// Factory
// ---------------------------------------------------------------------------

/// Where the client runs.
#[derive(Debug, Clone)]
pub enum ExecutionContext {
    /// A long-lived interactive process: one client shared by every caller,
    /// authenticated by the session.
    Interactive(Session),
    /// A one-off, anonymous context: a fresh client per call, no
    /// subscriptions.
    Ephemeral,
}

pub struct ClientFactory {
    endpoints: Endpoints,
    context: ExecutionContext,
    shared: OnceLock<Arc<GraphqlClient>>,
}

impl ClientFactory {
    pub fn new(endpoints: Endpoints, context: ExecutionContext) -> Self {
        Self {
            endpoints,
            context,
            shared: OnceLock::new(),
        }
    }

    pub fn interactive(endpoints: Endpoints, session: Session) -> Self {
        Self::new(endpoints, ExecutionContext::Interactive(session))
    }

    pub fn ephemeral(endpoints: Endpoints) -> Self {
        Self::new(endpoints, ExecutionContext::Ephemeral)
    }

    pub fn context(&self) -> &ExecutionContext {
        &self.context
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// The session of an interactive context.
    pub fn session(&self) -> Option<&Session> {
        match &self.context {
            ExecutionContext::Interactive(session) => Some(session),
            ExecutionContext::Ephemeral => None,
        }
    }

    /// The shared client in an interactive context, created on first use; a
    /// new client on every call in an ephemeral one.
    pub fn client(&self) -> Arc<GraphqlClient> {
        match &self.context {
            ExecutionContext::Interactive(session) => Arc::clone(self.shared.get_or_init(|| {
                debug!(endpoint = %self.endpoints.graphql_url, "creating shared client");
                Arc::new(GraphqlClient::interactive(&self.endpoints, session.clone()))
            })),
            ExecutionContext::Ephemeral => {
                Arc::new(GraphqlClient::ephemeral(&self.endpoints))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Response;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Answers every request with `data`, counting calls.
    struct Canned {
        data: Value,
        calls: AtomicUsize,
    }

    impl Canned {
        fn new(data: Value) -> Arc<Self> {
            Arc::new(Self {
                data,
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl RequestChannel for Canned {
        async fn request(&self, _operation: &Operation) -> Result<Response, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Response {
                data: Some(self.data.clone()),
                errors: None,
            })
        }
    }

    fn client_over(channel: Arc<Canned>) -> GraphqlClient {
        GraphqlClient::new(TransportSelector::new(channel, None))
    }

    fn op(doc: &str) -> Operation {
        Operation::parse(doc, json!({})).unwrap()
    }

    #[tokio::test]
    async fn cache_first_skips_network_on_hit() {
        let channel = Canned::new(json!({ "myCompany": { "id": "c1" } }));
        let client = client_over(channel.clone());
        let query = op("query GetMyCompany { myCompany { id } }");

        client.query(&query, FetchPolicy::CacheFirst).await.unwrap();
        client.query(&query, FetchPolicy::CacheFirst).await.unwrap();
        assert_eq!(channel.calls(), 1);

        client.query(&query, FetchPolicy::NetworkOnly).await.unwrap();
        assert_eq!(channel.calls(), 2);
    }

    #[tokio::test]
    async fn mutation_evicts_named_queries() {
        let channel = Canned::new(json!({ "ok": true }));
        let client = client_over(channel.clone());
        let query = op("query GetMyCompany { myCompany { id } }");
        client.query(&query, FetchPolicy::NetworkOnly).await.unwrap();
        assert_eq!(client.cache().len(), 1);

        client
            .mutate(&op("mutation CreateCompany { createCompany { id } }"), &["GetMyCompany"])
            .await
            .unwrap();
        assert!(client.cache().is_empty());
    }

    #[tokio::test]
    async fn wrong_kind_is_rejected_before_dispatch() {
        let channel = Canned::new(json!({}));
        let client = client_over(channel.clone());

        let err = client
            .query(&op("mutation M { logout }"), FetchPolicy::NetworkOnly)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            TransportError::WrongKind {
                expected: OperationKind::Query,
                found: Some(OperationKind::Mutation)
            }
        ));
        assert_eq!(channel.calls(), 0);
    }

    #[tokio::test]
    async fn ephemeral_client_cannot_subscribe() {
        let client = GraphqlClient::ephemeral(&Endpoints::default());
        assert!(!client.selector().has_persistent_channel());
        let err = client
            .subscribe(&op("subscription S { jobCreated { id } }"))
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::SubscriptionsUnavailable));
    }

    #[test]
    fn interactive_factory_shares_one_client() {
        let factory = ClientFactory::interactive(Endpoints::default(), Session::new());
        let a = factory.client();
        let b = factory.client();
        assert!(Arc::ptr_eq(&a, &b));
        assert!(a.selector().has_persistent_channel());
        assert!(factory.session().is_some());
    }

    #[test]
    fn ephemeral_factory_builds_fresh_clients() {
        let factory = ClientFactory::ephemeral(Endpoints::default());
        let a = factory.client();
        let b = factory.client();
        assert!(!Arc::ptr_eq(&a, &b));
        assert!(factory.session().is_none());
    }

    #[test]
    fn reset_store_clears_cache() {
        let client = client_over(Canned::new(json!({})));
        client
            .cache()
            .put(&op("query GetMe { me { id } }"), json!({ "me": null }));
        client.reset_store();
        assert!(client.cache().is_empty());
    }
}
