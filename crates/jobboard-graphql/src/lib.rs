// GraphQL transport for the job board client: operation documents, the
// HTTP and WebSocket channels, the selector routing between them, and the
// client built on top.

pub mod cache;
pub mod client;
pub mod document;
pub mod error;
pub mod http;
pub mod protocol;
pub mod selector;
pub mod ws;

pub use cache::{FetchPolicy, QueryCache};
pub use client::{ClientFactory, ExecutionContext, GraphqlClient};
pub use document::{DocumentError, MainDefinition, Operation, OperationKind};
pub use error::TransportError;
pub use http::HttpChannel;
pub use protocol::{GraphqlError, Response};
pub use selector::{Dispatch, PersistentChannel, RequestChannel, Route, TransportSelector};
pub use ws::{Subscription, SubscriptionItem, WsChannel};
