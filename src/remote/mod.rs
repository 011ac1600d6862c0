// src/remote/mod.rs

//! Remote action protocol: `ping`, `invoke` and `query` against entities
//! addressed by [`Urn`].
//!
//! - [`invoker`]: the server side, resolving URNs to local projects/tasks.
//! - [`connection`]: the client side, picking a transport from the address.
//! - [`http`] and [`tcp`]: the two bindings, both client and listener.
//! - [`wire`]: length-prefixed JSON framing used by the socket binding.

pub mod connection;
pub mod http;
pub mod invoker;
pub mod messages;
pub mod tcp;
pub mod urn;
pub mod wire;

use std::sync::Arc;

use crate::errors::RemoteError;
use crate::types::BoxFuture;

pub use connection::{DEFAULT_REMOTE_TIMEOUT, DefaultConnector, ServerConnection};
pub use http::serve_http;
pub use invoker::ActionInvoker;
pub use messages::{
    ForceBuildRequest, InvokeArguments, InvokeResult, ProjectList, ProjectRequest, ProjectStatus,
    QueryArguments,
    QueryResult, RemoteActionDefinition, RemoteResultCode, TaskDescription, VersionInfo,
};
pub use tcp::serve_tcp;
pub use urn::{URN_PREFIX, Urn};

/// Anything that answers the remote protocol: the local invoker or a
/// connection to another server.
///
/// `Err` is only returned for transport problems; protocol-level failures
/// come back as a non-success result code.
pub trait RemoteEndpoint: Send + Sync {
    fn ping(&self) -> BoxFuture<'_, bool>;

    fn invoke<'a>(
        &'a self,
        urn: &'a str,
        arguments: InvokeArguments,
    ) -> BoxFuture<'a, Result<InvokeResult, RemoteError>>;

    fn query<'a>(
        &'a self,
        urn: &'a str,
        arguments: QueryArguments,
    ) -> BoxFuture<'a, Result<QueryResult, RemoteError>>;
}

/// Opens endpoints for network addresses. Injected into the server so tests
/// can replace the network.
pub trait Connector: Send + Sync {
    fn connect(&self, address: &str) -> Result<Arc<dyn RemoteEndpoint>, RemoteError>;
}
