// src/remote/http.rs

//! HTTP binding: `GET /ping`, `POST /invoke`, `POST /query` with JSON bodies.

use anyhow::{Context, Result};
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tracing::info;

use super::invoker::ActionInvoker;
use super::messages::{InvokeArguments, InvokeBody, InvokeResult, QueryArguments, QueryBody, QueryResult};
use crate::errors::RemoteError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PingReply {
    pub alive: bool,
}

/// Client half: a `reqwest` client bound to one base URL.
#[derive(Debug, Clone)]
pub struct HttpBinding {
    base_url: String,
    client: reqwest::Client,
}

impl HttpBinding {
    pub fn new(address: &str) -> Result<Self, RemoteError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|err| transport(address, err))?;
        Ok(Self {
            base_url: address.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub async fn ping(&self) -> Result<bool, RemoteError> {
        let reply: PingReply = self
            .client
            .get(format!("{}/ping", self.base_url))
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|err| transport(&self.base_url, err))?
            .json()
            .await
            .map_err(|err| protocol(&self.base_url, err))?;
        Ok(reply.alive)
    }

    pub async fn invoke(&self, urn: &str, arguments: InvokeArguments) -> Result<InvokeResult, RemoteError> {
        let body = InvokeBody {
            urn: urn.to_string(),
            arguments,
        };
        self.post("invoke", &body).await
    }

    pub async fn query(&self, urn: &str, arguments: QueryArguments) -> Result<QueryResult, RemoteError> {
        let body = QueryBody {
            urn: urn.to_string(),
            arguments,
        };
        self.post("query", &body).await
    }

    async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, RemoteError>
    where
        B: Serialize + ?Sized,
        T: serde::de::DeserializeOwned,
    {
        self.client
            .post(format!("{}/{path}", self.base_url))
            .json(body)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|err| transport(&self.base_url, err))?
            .json()
            .await
            .map_err(|err| protocol(&self.base_url, err))
    }
}

fn transport(address: &str, err: reqwest::Error) -> RemoteError {
    RemoteError::Transport {
        address: address.to_string(),
        source: err.into(),
    }
}

fn protocol(address: &str, err: reqwest::Error) -> RemoteError {
    RemoteError::Protocol {
        address: address.to_string(),
        message: err.to_string(),
    }
}

/// Listener half: routes answered by `invoker`.
pub fn router(invoker: ActionInvoker) -> Router {
    Router::new()
        .route("/ping", get(ping))
        .route("/invoke", post(invoke))
        .route("/query", post(query))
        .with_state(invoker)
}

async fn ping() -> Json<PingReply> {
    Json(PingReply { alive: true })
}

async fn invoke(State(invoker): State<ActionInvoker>, Json(body): Json<InvokeBody>) -> Json<InvokeResult> {
    Json(invoker.handle_invoke(&body.urn, &body.arguments))
}

async fn query(State(invoker): State<ActionInvoker>, Json(body): Json<QueryBody>) -> Json<QueryResult> {
    Json(invoker.handle_query(&body.urn, &body.arguments))
}

/// Serve the HTTP binding on an already bound listener until the task is
/// dropped or the listener fails.
pub async fn serve_http(listener: TcpListener, invoker: ActionInvoker) -> Result<()> {
    let local = listener.local_addr().context("listener has no local address")?;
    info!(address = %local, "http endpoint listening");
    axum::serve(listener, router(invoker))
        .await
        .context("http endpoint failed")
}
