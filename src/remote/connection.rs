// src/remote/connection.rs

//! Client side: pick a binding from the address scheme and bound every call
//! with a timeout.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use super::http::HttpBinding;
use super::messages::{InvokeArguments, InvokeResult, QueryArguments, QueryResult, WireRequest, WireResponse};
use super::tcp::TcpBinding;
use super::{Connector, RemoteEndpoint};
use crate::errors::RemoteError;
use crate::types::BoxFuture;

/// Timeout for outbound calls when none is configured.
pub const DEFAULT_REMOTE_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug)]
enum Binding {
    Http(HttpBinding),
    Tcp(TcpBinding),
}

/// Connection to another server's remote endpoint.
///
/// `http://` and `https://` addresses use the HTTP binding, `tcp://` the
/// persistent-socket binding. Nothing is sent until the first call.
#[derive(Debug)]
pub struct ServerConnection {
    address: String,
    timeout: Duration,
    binding: Binding,
}

impl ServerConnection {
    pub fn open(address: &str, timeout: Duration) -> Result<Self, RemoteError> {
        let address = address.trim();
        let Some((scheme, rest)) = address.split_once("://") else {
            return Err(RemoteError::UnsupportedScheme(address.to_string()));
        };

        let binding = match scheme.to_ascii_lowercase().as_str() {
            "http" | "https" => Binding::Http(HttpBinding::new(address)?),
            "tcp" => Binding::Tcp(TcpBinding::new(rest.trim_end_matches('/'))),
            _ => return Err(RemoteError::UnsupportedScheme(address.to_string())),
        };
        debug!(address = %address, scheme = %scheme, "opened server connection");

        Ok(Self {
            address: address.to_string(),
            timeout,
            binding,
        })
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn is_http(&self) -> bool {
        matches!(self.binding, Binding::Http(_))
    }

    async fn bounded<T>(
        &self,
        call: impl Future<Output = Result<T, RemoteError>>,
    ) -> Result<T, RemoteError> {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(RemoteError::Timeout {
                address: self.address.clone(),
                timeout_ms: self.timeout.as_millis(),
            }),
        }
    }

    async fn ping_binding(&self) -> Result<bool, RemoteError> {
        match &self.binding {
            Binding::Http(http) => http.ping().await,
            Binding::Tcp(tcp) => match tcp.round_trip(&WireRequest::Ping).await? {
                WireResponse::Pong { alive } => Ok(alive),
                other => Err(self.unexpected(other)),
            },
        }
    }

    async fn invoke_binding(&self, urn: &str, arguments: InvokeArguments) -> Result<InvokeResult, RemoteError> {
        match &self.binding {
            Binding::Http(http) => http.invoke(urn, arguments).await,
            Binding::Tcp(tcp) => {
                let request = WireRequest::Invoke {
                    urn: urn.to_string(),
                    arguments,
                };
                match tcp.round_trip(&request).await? {
                    WireResponse::Invoke(result) => Ok(result),
                    other => Err(self.unexpected(other)),
                }
            }
        }
    }

    async fn query_binding(&self, urn: &str, arguments: QueryArguments) -> Result<QueryResult, RemoteError> {
        match &self.binding {
            Binding::Http(http) => http.query(urn, arguments).await,
            Binding::Tcp(tcp) => {
                let request = WireRequest::Query {
                    urn: urn.to_string(),
                    arguments,
                };
                match tcp.round_trip(&request).await? {
                    WireResponse::Query(result) => Ok(result),
                    other => Err(self.unexpected(other)),
                }
            }
        }
    }

    fn unexpected(&self, response: WireResponse) -> RemoteError {
        let message = match response {
            WireResponse::Error { message } => message,
            other => format!("unexpected response {other:?}"),
        };
        RemoteError::Protocol {
            address: self.address.clone(),
            message,
        }
    }
}

impl RemoteEndpoint for ServerConnection {
    /// A failed or timed-out ping reports `false`.
    fn ping(&self) -> BoxFuture<'_, bool> {
        Box::pin(async move {
            match self.bounded(self.ping_binding()).await {
                Ok(alive) => alive,
                Err(err) => {
                    debug!(address = %self.address, error = %err, "ping failed");
                    false
                }
            }
        })
    }

    fn invoke<'a>(
        &'a self,
        urn: &'a str,
        arguments: InvokeArguments,
    ) -> BoxFuture<'a, Result<InvokeResult, RemoteError>> {
        Box::pin(self.bounded(self.invoke_binding(urn, arguments)))
    }

    fn query<'a>(
        &'a self,
        urn: &'a str,
        arguments: QueryArguments,
    ) -> BoxFuture<'a, Result<QueryResult, RemoteError>> {
        Box::pin(self.bounded(self.query_binding(urn, arguments)))
    }
}

/// Opens a fresh [`ServerConnection`] for every address asked for.
#[derive(Debug, Clone, Copy)]
pub struct DefaultConnector {
    timeout: Duration,
}

impl DefaultConnector {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for DefaultConnector {
    fn default() -> Self {
        Self::new(DEFAULT_REMOTE_TIMEOUT)
    }
}

impl Connector for DefaultConnector {
    fn connect(&self, address: &str) -> Result<Arc<dyn RemoteEndpoint>, RemoteError> {
        Ok(Arc::new(ServerConnection::open(address, self.timeout)?))
    }
}
