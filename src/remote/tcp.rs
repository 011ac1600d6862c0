// src/remote/tcp.rs

//! Persistent-socket binding: one TCP connection per client, reused across
//! calls, carrying [`wire`](super::wire) frames.

use anyhow::{Context, Result};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::invoker::ActionInvoker;
use super::messages::{WireRequest, WireResponse};
use super::wire::{ProtocolError, decode, encode, read_message, write_message};
use crate::errors::RemoteError;

/// Client half. Calls are serialized over the single connection; a broken
/// connection is dropped and re-opened on the next call.
#[derive(Debug)]
pub struct TcpBinding {
    address: String,
    stream: Mutex<Option<TcpStream>>,
}

impl TcpBinding {
    /// `address` is `host:port`, without the scheme.
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            stream: Mutex::new(None),
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// One request/response exchange.
    ///
    /// The cached stream stays out of its slot while the exchange is in
    /// flight and goes back only after a complete round trip. A call
    /// cancelled half way drops the socket along with its unread response.
    pub async fn round_trip(&self, request: &WireRequest) -> Result<WireResponse, RemoteError> {
        let mut guard = self.stream.lock().await;
        let cached = guard.take();
        let reused = cached.is_some();

        let mut stream = match cached {
            Some(stream) => stream,
            None => self.connect().await?,
        };

        match exchange(&mut stream, request).await {
            Ok(response) => {
                *guard = Some(stream);
                Ok(response)
            }
            // The server may have dropped an idle connection: retry once on a
            // fresh one.
            Err(err) if reused && !matches!(err, ProtocolError::Json(_)) => {
                debug!(address = %self.address, error = %err, "reconnecting");
                let mut stream = self.connect().await?;
                let response = exchange(&mut stream, request)
                    .await
                    .map_err(|err| self.map_error(err))?;
                *guard = Some(stream);
                Ok(response)
            }
            Err(err) => Err(self.map_error(err)),
        }
    }

    async fn connect(&self) -> Result<TcpStream, RemoteError> {
        TcpStream::connect(&self.address)
            .await
            .map_err(|err| RemoteError::Transport {
                address: self.address.clone(),
                source: anyhow::Error::new(err).context("connect failed"),
            })
    }

    fn map_error(&self, err: ProtocolError) -> RemoteError {
        match err {
            ProtocolError::Json(err) => RemoteError::Protocol {
                address: self.address.clone(),
                message: err.to_string(),
            },
            other => RemoteError::Transport {
                address: self.address.clone(),
                source: other.into(),
            },
        }
    }
}

async fn exchange(stream: &mut TcpStream, request: &WireRequest) -> Result<WireResponse, ProtocolError> {
    write_message(stream, &encode(request)?).await?;
    let frame = read_message(stream).await?;
    decode(&frame)
}

/// Listener half: accepts connections until the listener fails, one task
/// per connection, requests on a connection answered in order.
pub async fn serve_tcp(listener: TcpListener, invoker: ActionInvoker) -> Result<()> {
    let local = listener.local_addr().context("listener has no local address")?;
    info!(address = %local, "socket endpoint listening");

    loop {
        let (stream, peer) = listener.accept().await.context("accept failed")?;
        debug!(peer = %peer, "socket client connected");
        let invoker = invoker.clone();
        tokio::spawn(async move {
            match handle_connection(stream, &invoker).await {
                Ok(()) => debug!(peer = %peer, "socket client disconnected"),
                Err(err) => warn!(peer = %peer, error = %err, "socket connection failed"),
            }
        });
    }
}

async fn handle_connection(mut stream: TcpStream, invoker: &ActionInvoker) -> Result<(), ProtocolError> {
    loop {
        let frame = match read_message(&mut stream).await {
            Ok(frame) => frame,
            Err(ProtocolError::ConnectionClosed) => return Ok(()),
            Err(err) => return Err(err),
        };

        let response = match decode::<WireRequest>(&frame) {
            Ok(request) => dispatch(invoker, request),
            Err(err) => WireResponse::Error {
                message: err.to_string(),
            },
        };
        write_message(&mut stream, &encode(&response)?).await?;
    }
}

fn dispatch(invoker: &ActionInvoker, request: WireRequest) -> WireResponse {
    match request {
        WireRequest::Ping => WireResponse::Pong { alive: true },
        WireRequest::Invoke { urn, arguments } => {
            WireResponse::Invoke(invoker.handle_invoke(&urn, &arguments))
        }
        WireRequest::Query { urn, arguments } => {
            WireResponse::Query(invoker.handle_query(&urn, &arguments))
        }
    }
}
