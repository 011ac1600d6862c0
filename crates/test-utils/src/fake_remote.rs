use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use ccnet::errors::RemoteError;
use ccnet::remote::{
    Connector, InvokeArguments, InvokeResult, QueryArguments, QueryResult, RemoteEndpoint,
    RemoteResultCode,
};
use ccnet::types::BoxFuture;

/// A scripted remote endpoint that records what it was asked.
///
/// `invoke` answers with queued results in order, then with `default_code`.
pub struct FakeEndpoint {
    alive: bool,
    default_code: RemoteResultCode,
    results: Mutex<VecDeque<Result<InvokeResult, String>>>,
    invocations: Mutex<Vec<(String, InvokeArguments)>>,
}

impl FakeEndpoint {
    pub fn answering(code: RemoteResultCode) -> Arc<Self> {
        Arc::new(Self {
            alive: true,
            default_code: code,
            results: Mutex::new(VecDeque::new()),
            invocations: Mutex::new(Vec::new()),
        })
    }

    pub fn dead() -> Arc<Self> {
        Arc::new(Self {
            alive: false,
            default_code: RemoteResultCode::FatalError,
            results: Mutex::new(VecDeque::new()),
            invocations: Mutex::new(Vec::new()),
        })
    }

    pub fn push_result(&self, result: InvokeResult) {
        self.results.lock().unwrap().push_back(Ok(result));
    }

    /// The next `invoke` fails with a transport error.
    pub fn push_transport_error(&self, message: &str) {
        self.results.lock().unwrap().push_back(Err(message.to_string()));
    }

    pub fn invocations(&self) -> Vec<(String, InvokeArguments)> {
        self.invocations.lock().unwrap().clone()
    }
}

impl RemoteEndpoint for FakeEndpoint {
    fn ping(&self) -> BoxFuture<'_, bool> {
        let alive = self.alive;
        Box::pin(async move { alive })
    }

    fn invoke<'a>(
        &'a self,
        urn: &'a str,
        arguments: InvokeArguments,
    ) -> BoxFuture<'a, Result<InvokeResult, RemoteError>> {
        self.invocations
            .lock()
            .unwrap()
            .push((urn.to_string(), arguments));
        let next = self.results.lock().unwrap().pop_front();
        let default_code = self.default_code;

        Box::pin(async move {
            match next {
                Some(Ok(result)) => Ok(result),
                Some(Err(message)) => Err(RemoteError::Transport {
                    address: "fake".to_string(),
                    source: anyhow::anyhow!(message),
                }),
                None => Ok(InvokeResult {
                    correlation_id: Some("fake-correlation".to_string()),
                    ..InvokeResult::with_code(default_code)
                }),
            }
        })
    }

    fn query<'a>(
        &'a self,
        _urn: &'a str,
        _arguments: QueryArguments,
    ) -> BoxFuture<'a, Result<QueryResult, RemoteError>> {
        Box::pin(async { Ok(QueryResult::with_code(RemoteResultCode::Success)) })
    }
}

/// Hands out registered fake endpoints by address.
#[derive(Clone, Default)]
pub struct FakeConnector {
    endpoints: Arc<Mutex<HashMap<String, Arc<FakeEndpoint>>>>,
    connects: Arc<Mutex<Vec<String>>>,
}

impl FakeConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, address: &str, endpoint: Arc<FakeEndpoint>) -> &Self {
        self.endpoints
            .lock()
            .unwrap()
            .insert(address.to_string(), endpoint);
        self
    }

    /// Addresses `connect` was called with, in order.
    pub fn connects(&self) -> Vec<String> {
        self.connects.lock().unwrap().clone()
    }
}

impl Connector for FakeConnector {
    fn connect(&self, address: &str) -> Result<Arc<dyn RemoteEndpoint>, RemoteError> {
        self.connects.lock().unwrap().push(address.to_string());
        match self.endpoints.lock().unwrap().get(address) {
            Some(endpoint) => Ok(Arc::clone(endpoint) as Arc<dyn RemoteEndpoint>),
            None => Err(RemoteError::Transport {
                address: address.to_string(),
                source: anyhow::anyhow!("connection refused"),
            }),
        }
    }
}
