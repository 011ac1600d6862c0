// tests/remote_transport.rs

mod common;
use crate::common::{ProjectBuilder, ServerBuilder, TestServer, init_tracing, with_timeout};

use std::error::Error;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream};

use ccnet::errors::RemoteError;
use ccnet::remote::messages::{WireRequest, WireResponse};
use ccnet::remote::wire::{decode, encode, read_message, write_message};
use ccnet::remote::{
    Connector, DefaultConnector, InvokeArguments, ProjectList, QueryArguments, RemoteEndpoint,
    InvokeResult, RemoteResultCode, ServerConnection, serve_http, serve_tcp,
};

type TestResult = Result<(), Box<dyn Error>>;

fn test_server() -> TestServer {
    init_tracing();
    ServerBuilder::new("remote")
        .project(ProjectBuilder::new("alpha"))
        .project(ProjectBuilder::new("beta"))
        .build()
}

async fn spawn_tcp(test: &TestServer) -> Result<String, Box<dyn Error>> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let address = format!("tcp://{}", listener.local_addr()?);
    tokio::spawn(serve_tcp(listener, test.server.invoker()));
    Ok(address)
}

async fn spawn_http(test: &TestServer) -> Result<String, Box<dyn Error>> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let address = format!("http://{}", listener.local_addr()?);
    tokio::spawn(serve_http(listener, test.server.invoker()));
    Ok(address)
}

async fn exercise(connection: &ServerConnection) -> TestResult {
    assert!(connection.ping().await);

    let listed = connection
        .invoke("urn:ccnet:remote", InvokeArguments::new("ListProjects"))
        .await?;
    assert_eq!(listed.result_code, RemoteResultCode::Success);
    assert!(listed.correlation_id.is_some());
    let list: ProjectList = serde_json::from_str(listed.data.as_deref().ok_or("no data")?)?;
    assert_eq!(list.projects, ["alpha", "beta"]);

    let unknown = connection
        .invoke("urn:ccnet:remote:zeta", InvokeArguments::new("ForceBuild"))
        .await?;
    assert_eq!(unknown.result_code, RemoteResultCode::UnknownUrn);

    let query = connection
        .query("urn:ccnet:remote:alpha", QueryArguments::default())
        .await?;
    assert_eq!(query.result_code, RemoteResultCode::Success);
    assert_eq!(query.actions.len(), 4);
    Ok(())
}

#[tokio::test]
async fn tcp_binding_round_trips_on_one_connection() -> TestResult {
    let test = test_server();
    let address = spawn_tcp(&test).await?;

    let connection = ServerConnection::open(&address, Duration::from_secs(5))?;
    assert!(!connection.is_http());

    with_timeout(exercise(&connection)).await?;

    let forced = connection
        .invoke("urn:ccnet:remote:alpha", InvokeArguments::new("ForceBuild"))
        .await?;
    assert!(forced.is_success());
    let alpha = test.server.project("alpha").ok_or("alpha missing")?;
    assert!(alpha.force_pending());
    Ok(())
}

#[tokio::test]
async fn http_binding_round_trips() -> TestResult {
    let test = test_server();
    let address = spawn_http(&test).await?;

    let connection = ServerConnection::open(&address, Duration::from_secs(5))?;
    assert!(connection.is_http());

    with_timeout(exercise(&connection)).await?;
    Ok(())
}

#[tokio::test]
async fn tcp_listener_answers_garbage_with_error_frame() -> TestResult {
    let test = test_server();
    let address = spawn_tcp(&test).await?;
    let mut stream = TcpStream::connect(address.trim_start_matches("tcp://")).await?;

    write_message(&mut stream, b"{ definitely not a request").await?;
    let reply: WireResponse = decode(&read_message(&mut stream).await?)?;
    assert!(matches!(reply, WireResponse::Error { .. }));

    // The connection stays usable.
    write_message(&mut stream, &encode(&WireRequest::Ping)?).await?;
    let reply: WireResponse = decode(&read_message(&mut stream).await?)?;
    assert!(matches!(reply, WireResponse::Pong { alive: true }));
    Ok(())
}

#[tokio::test]
async fn ping_to_closed_port_reports_not_alive() -> TestResult {
    init_tracing();
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    drop(listener);

    let tcp = ServerConnection::open(&format!("tcp://{addr}"), Duration::from_secs(2))?;
    assert!(!with_timeout(tcp.ping()).await);

    let http = ServerConnection::open(&format!("http://{addr}"), Duration::from_secs(2))?;
    assert!(!with_timeout(http.ping()).await);

    let err = tcp.invoke("urn:ccnet:x", InvokeArguments::new("Ping")).await.err();
    assert!(matches!(err, Some(RemoteError::Transport { .. })));
    Ok(())
}

#[tokio::test]
async fn silent_server_times_out() -> TestResult {
    init_tracing();
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    // Accept and hold connections without ever answering.
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((stream, _)) = listener.accept().await {
            held.push(stream);
        }
    });

    let connection = ServerConnection::open(&format!("tcp://{addr}"), Duration::from_millis(100))?;
    let err = with_timeout(connection.invoke("urn:ccnet:x", InvokeArguments::new("ListProjects")))
        .await
        .err();
    assert!(matches!(err, Some(RemoteError::Timeout { timeout_ms: 100, .. })));

    assert!(!with_timeout(connection.ping()).await);
    Ok(())
}

#[test]
fn only_known_schemes_are_accepted() {
    for address in ["ftp://host:21", "host:21235", "", "remoting://host"] {
        let result = ServerConnection::open(address, Duration::from_secs(1));
        assert!(
            matches!(result, Err(RemoteError::UnsupportedScheme(_))),
            "{address:?} should be rejected"
        );
    }

    for address in ["http://build-2:8080", "HTTPS://build-2", "tcp://build-2:21235"] {
        assert!(ServerConnection::open(address, Duration::from_secs(1)).is_ok());
    }
}

#[test]
fn default_connector_opens_connections_lazily() {
    let connector = DefaultConnector::default();
    // Nothing listens here, but opening sends nothing.
    assert!(connector.connect("tcp://127.0.0.1:9").is_ok());
    assert!(matches!(
        connector.connect("gopher://old"),
        Err(RemoteError::UnsupportedScheme(_))
    ));
}

#[tokio::test]
async fn oversized_frames_are_rejected() -> TestResult {
    use ccnet::remote::wire::{MAX_FRAME_LEN, ProtocolError};
    use tokio::io::AsyncWriteExt;

    let (mut client, mut server) = tokio::io::duplex(64);
    let declared = (MAX_FRAME_LEN as u32 + 1).to_be_bytes();
    client.write_all(&declared).await?;

    let err = read_message(&mut server).await.err();
    assert!(matches!(err, Some(ProtocolError::FrameTooLarge(_))));

    drop(client);
    let closed = read_message(&mut server).await.err();
    assert!(matches!(closed, Some(ProtocolError::ConnectionClosed)));
    Ok(())
}

/// Answers every invoke with the action name as correlation id. The very
/// first request the listener sees is answered only after `first_delay`.
async fn spawn_echo_listener(
    first_delay: Duration,
) -> Result<(String, Arc<AtomicUsize>), Box<dyn Error>> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let address = format!("tcp://{}", listener.local_addr()?);
    let accepted = Arc::new(AtomicUsize::new(0));
    let requests = Arc::new(AtomicUsize::new(0));

    let counter = Arc::clone(&accepted);
    tokio::spawn(async move {
        while let Ok((mut stream, _)) = listener.accept().await {
            counter.fetch_add(1, Ordering::SeqCst);
            let requests = Arc::clone(&requests);
            tokio::spawn(async move {
                while let Ok(frame) = read_message(&mut stream).await {
                    let Ok(WireRequest::Invoke { arguments, .. }) = decode::<WireRequest>(&frame)
                    else {
                        return;
                    };
                    if requests.fetch_add(1, Ordering::SeqCst) == 0 {
                        tokio::time::sleep(first_delay).await;
                    }
                    let reply = WireResponse::Invoke(InvokeResult {
                        correlation_id: Some(arguments.action),
                        ..InvokeResult::with_code(RemoteResultCode::Success)
                    });
                    let Ok(bytes) = encode(&reply) else { return };
                    if write_message(&mut stream, &bytes).await.is_err() {
                        return;
                    }
                }
            });
        }
    });
    Ok((address, accepted))
}

#[tokio::test]
async fn timed_out_call_does_not_leak_its_reply_into_the_next() -> TestResult {
    init_tracing();
    let (address, accepted) = spawn_echo_listener(Duration::from_millis(300)).await?;
    let connection = ServerConnection::open(&address, Duration::from_millis(100))?;

    let err = with_timeout(connection.invoke("urn:ccnet:x", InvokeArguments::new("first")))
        .await
        .err();
    assert!(matches!(err, Some(RemoteError::Timeout { .. })));

    // Let the late reply to "first" arrive on the abandoned socket.
    tokio::time::sleep(Duration::from_millis(400)).await;

    let second = with_timeout(connection.invoke("urn:ccnet:x", InvokeArguments::new("second"))).await?;
    assert_eq!(second.correlation_id.as_deref(), Some("second"));
    let third = with_timeout(connection.invoke("urn:ccnet:x", InvokeArguments::new("third"))).await?;
    assert_eq!(third.correlation_id.as_deref(), Some("third"));

    // One socket for the abandoned call, one reused by the two after it.
    assert_eq!(accepted.load(Ordering::SeqCst), 2);
    Ok(())
}
