//! NodeClient integration tests against an in-process WebSocket server.
//!
//! The server side is a plain tokio-tungstenite acceptor; each test scripts
//! the node's half of the conversation and asserts on what the client sends
//! and on how its calls resolve.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;

use crate::error::NodeError;
use crate::node::{HeadStatus, NodeClient};

const WAIT: Duration = Duration::from_secs(2);

/// One accepted client connection, scriptable from the test body
struct TestSession {
    from_client: mpsc::Receiver<String>,
    to_client: mpsc::Sender<String>,
}

struct TestServer {
    url: String,
    sessions: mpsc::Receiver<TestSession>,
}

async fn spawn_server() -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (session_tx, sessions) = mpsc::channel(4);

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            let ws = match tokio_tungstenite::accept_async(stream).await {
                Ok(ws) => ws,
                Err(_) => continue,
            };
            let (mut sink, mut source) = ws.split();
            let (from_tx, from_rx) = mpsc::channel(16);
            let (to_tx, mut to_rx) = mpsc::channel::<String>(16);
            if session_tx
                .send(TestSession {
                    from_client: from_rx,
                    to_client: to_tx,
                })
                .await
                .is_err()
            {
                return;
            }
            tokio::spawn(async move {
                loop {
                    tokio::select! {
                        inbound = source.next() => match inbound {
                            Some(Ok(Message::Text(text))) => {
                                if from_tx.send(text).await.is_err() {
                                    break;
                                }
                            }
                            Some(Ok(_)) => {}
                            _ => break,
                        },
                        outbound = to_rx.recv() => match outbound {
                            Some(text) => {
                                if sink.send(Message::Text(text)).await.is_err() {
                                    break;
                                }
                            }
                            // session handle dropped: kill the TCP stream
                            // without a close handshake
                            None => break,
                        },
                    }
                }
            });
        }
    });

    TestServer {
        url: format!("ws://{addr}"),
        sessions,
    }
}

/// Connect a client and accept its session on the server side
async fn connect(server: &mut TestServer, client: &NodeClient) -> TestSession {
    client.connect();
    timeout(WAIT, server.sessions.recv())
        .await
        .expect("client did not connect")
        .expect("server stopped")
}

async fn wait_for_status(client: &NodeClient, want: HeadStatus) {
    let mut watch = client.status_watch();
    timeout(WAIT, async {
        loop {
            if *watch.borrow_and_update() == want {
                return;
            }
            watch.changed().await.unwrap();
        }
    })
    .await
    .unwrap_or_else(|_| panic!("status never became {want:?}, is {:?}", client.status()));
}

async fn recv_json(session: &mut TestSession) -> serde_json::Value {
    let raw = timeout(WAIT, session.from_client.recv())
        .await
        .expect("client sent nothing")
        .expect("connection dropped");
    serde_json::from_str(&raw).expect("client sent invalid json")
}

async fn send(session: &TestSession, payload: &str) {
    session.to_client.send(payload.to_string()).await.unwrap();
}

fn greeting(status: &str) -> String {
    format!(r#"{{"tag":"Greetings","headStatus":"{status}"}}"#)
}

#[tokio::test]
async fn init_resolves_when_head_starts_initializing() {
    let mut server = spawn_server().await;
    let client = NodeClient::new("alice", server.url.clone());
    let mut session = connect(&mut server, &client).await;

    send(&session, &greeting("Idle")).await;
    wait_for_status(&client, HeadStatus::Idle).await;

    let init_client = client.clone();
    let mut init = tokio::spawn(async move { init_client.init().await });

    let sent = recv_json(&mut session).await;
    assert_eq!(sent, serde_json::json!({"tag": "Init"}));

    send(&session, r#"{"tag":"HeadIsInitializing"}"#).await;
    timeout(WAIT, &mut init).await.unwrap().unwrap().unwrap();
    assert_eq!(client.status(), HeadStatus::Initializing);
}

#[tokio::test]
async fn init_under_external_deadline_times_out_on_a_silent_node() {
    let mut server = spawn_server().await;
    let client = NodeClient::new("alice", server.url.clone());
    let mut session = connect(&mut server, &client).await;

    send(&session, &greeting("Idle")).await;
    wait_for_status(&client, HeadStatus::Idle).await;

    let result = timeout(Duration::from_millis(1000), client.init()).await;
    assert!(result.is_err(), "init should still be pending");

    // the command itself did go out
    let sent = recv_json(&mut session).await;
    assert_eq!(sent["tag"], "Init");
}

#[tokio::test]
async fn init_can_be_retried_after_the_caller_gives_up() {
    let mut server = spawn_server().await;
    let client = NodeClient::new("alice", server.url.clone());
    let mut session = connect(&mut server, &client).await;

    send(&session, &greeting("Idle")).await;
    wait_for_status(&client, HeadStatus::Idle).await;

    // first attempt is cancelled by an external deadline before any reply
    let result = timeout(Duration::from_millis(200), client.init()).await;
    assert!(result.is_err(), "init should still be pending");
    let sent = recv_json(&mut session).await;
    assert_eq!(sent["tag"], "Init");

    // the abandoned slot must not shadow the retry
    let retry_client = client.clone();
    let mut retry = tokio::spawn(async move { retry_client.init().await });
    let sent = recv_json(&mut session).await;
    assert_eq!(sent["tag"], "Init");

    send(&session, r#"{"tag":"HeadIsInitializing"}"#).await;
    timeout(WAIT, &mut retry).await.unwrap().unwrap().unwrap();
    assert_eq!(client.status(), HeadStatus::Initializing);
}

#[tokio::test]
async fn init_outside_idle_fails_without_sending() {
    let mut server = spawn_server().await;
    let client = NodeClient::new("alice", server.url.clone());
    let mut session = connect(&mut server, &client).await;

    send(&session, &greeting("Open")).await;
    wait_for_status(&client, HeadStatus::Open).await;

    match client.init().await {
        Err(NodeError::InvalidStatus { operation, status }) => {
            assert_eq!(operation, "init");
            assert_eq!(status, HeadStatus::Open);
        }
        other => panic!("expected InvalidStatus, got {other:?}"),
    }

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(session.from_client.try_recv().is_err(), "no command expected");
}

#[tokio::test]
async fn status_only_moves_on_lifecycle_tags() {
    let mut server = spawn_server().await;
    let client = NodeClient::new("alice", server.url.clone());
    let session = connect(&mut server, &client).await;

    send(&session, &greeting("Idle")).await;
    wait_for_status(&client, HeadStatus::Idle).await;

    // none of these carries lifecycle meaning
    send(&session, r#"{"tag":"PeerConnected"}"#).await;
    send(&session, r#"{"tag":"TxValid","transaction":{"txId":"aa"}}"#).await;
    send(
        &session,
        r#"{"tag":"SnapshotConfirmed","snapshot":{"confirmedTransactions":[]}}"#,
    )
    .await;
    send(&session, "not json at all").await;
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(client.status(), HeadStatus::Idle);

    send(&session, r#"{"tag":"HeadIsOpen"}"#).await;
    wait_for_status(&client, HeadStatus::Open).await;
}

#[tokio::test]
async fn greeting_status_parsing_is_case_insensitive() {
    let mut server = spawn_server().await;
    let client = NodeClient::new("alice", server.url.clone());
    let session = connect(&mut server, &client).await;

    send(&session, &greeting("FanoutPossible")).await;
    wait_for_status(&client, HeadStatus::FanoutPossible).await;

    send(&session, &greeting("IDLE")).await;
    wait_for_status(&client, HeadStatus::Idle).await;
}

#[tokio::test]
async fn concurrent_new_tx_calls_resolve_independently() {
    let mut server = spawn_server().await;
    let client = NodeClient::new("alice", server.url.clone());
    let mut session = connect(&mut server, &client).await;

    send(&session, &greeting("Open")).await;
    wait_for_status(&client, HeadStatus::Open).await;

    let tx_a = chain_core::TxEnvelope::conway("84a10080a0f5f6");
    let tx_b = chain_core::TxEnvelope::conway("84a10101a0f5f6");
    let id_a = chain_core::hash::tx_id(&tx_a.cbor_hex).unwrap();
    let id_b = chain_core::hash::tx_id(&tx_b.cbor_hex).unwrap();
    assert_ne!(id_a, id_b);

    let (client_a, client_b) = (client.clone(), client.clone());
    let mut call_a = tokio::spawn(async move { client_a.new_tx(&tx_a).await });
    let mut call_b = tokio::spawn(async move { client_b.new_tx(&tx_b).await });

    // both commands go out before any reply
    recv_json(&mut session).await;
    recv_json(&mut session).await;

    send(
        &session,
        &format!(r#"{{"tag":"TxValid","transaction":{{"txId":"{id_b}"}}}}"#),
    )
    .await;
    let resolved = timeout(WAIT, &mut call_b).await.unwrap().unwrap().unwrap();
    assert_eq!(resolved, id_b);
    assert!(
        timeout(Duration::from_millis(200), &mut call_a).await.is_err(),
        "call A must not see B's terminal event"
    );

    send(
        &session,
        &format!(r#"{{"tag":"TxInvalid","transaction":{{"txId":"{id_a}"}}}}"#),
    )
    .await;
    match timeout(WAIT, &mut call_a).await.unwrap().unwrap() {
        Err(NodeError::TxRejected { tx_id }) => assert_eq!(tx_id, id_a),
        other => panic!("expected TxRejected, got {other:?}"),
    }
}

#[tokio::test]
async fn close_resends_until_terminal_event_then_stops() {
    let mut server = spawn_server().await;
    let client = NodeClient::new("alice", server.url.clone())
        .with_resend_interval(Duration::from_millis(50));
    let mut session = connect(&mut server, &client).await;

    send(&session, &greeting("Open")).await;
    wait_for_status(&client, HeadStatus::Open).await;

    let close_client = client.clone();
    let mut close = tokio::spawn(async move { close_client.close().await });

    for _ in 0..3 {
        let sent = recv_json(&mut session).await;
        assert_eq!(sent, serde_json::json!({"tag": "Close"}));
    }

    send(&session, r#"{"tag":"HeadIsClosed"}"#).await;
    timeout(WAIT, &mut close).await.unwrap().unwrap().unwrap();
    assert_eq!(client.status(), HeadStatus::Closed);

    // drain anything sent before the terminal event landed, then verify
    // the resend loop has stopped
    tokio::time::sleep(Duration::from_millis(150)).await;
    while session.from_client.try_recv().is_ok() {}
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert!(session.from_client.try_recv().is_err(), "close kept resending");
}

#[tokio::test]
async fn command_failed_rejects_the_matching_call() {
    let mut server = spawn_server().await;
    let client = NodeClient::new("alice", server.url.clone());
    let mut session = connect(&mut server, &client).await;

    send(&session, &greeting("Idle")).await;
    wait_for_status(&client, HeadStatus::Idle).await;

    let init_client = client.clone();
    let mut init = tokio::spawn(async move { init_client.init().await });
    recv_json(&mut session).await;

    send(&session, r#"{"tag":"CommandFailed","clientInput":{"tag":"Init"}}"#).await;
    match timeout(WAIT, &mut init).await.unwrap().unwrap() {
        Err(NodeError::CommandFailed { command }) => assert_eq!(command, "Init"),
        other => panic!("expected CommandFailed, got {other:?}"),
    }
}

#[tokio::test]
async fn post_tx_failure_rejects_the_matching_call() {
    let mut server = spawn_server().await;
    let client = NodeClient::new("alice", server.url.clone())
        .with_resend_interval(Duration::from_secs(60));
    let mut session = connect(&mut server, &client).await;

    send(&session, &greeting("Open")).await;
    wait_for_status(&client, HeadStatus::Open).await;

    let close_client = client.clone();
    let mut close = tokio::spawn(async move { close_client.close().await });
    recv_json(&mut session).await;

    send(
        &session,
        r#"{"tag":"PostTxOnChainFailed","postChainTx":{"tag":"CloseTx"},"postTxError":{"tag":"ScriptFailedInWallet"}}"#,
    )
    .await;
    match timeout(WAIT, &mut close).await.unwrap().unwrap() {
        Err(NodeError::PostTxFailed { tag, .. }) => assert_eq!(tag, "CloseTx"),
        other => panic!("expected PostTxFailed, got {other:?}"),
    }
}

#[tokio::test]
async fn await_tx_sees_snapshot_confirmations() {
    let mut server = spawn_server().await;
    let client = NodeClient::new("alice", server.url.clone());
    let session = connect(&mut server, &client).await;

    send(&session, &greeting("Open")).await;
    wait_for_status(&client, HeadStatus::Open).await;

    let await_client = client.clone();
    let mut pending = tokio::spawn(async move {
        await_client
            .await_tx("cafe0001", Duration::from_millis(10))
            .await
    });
    assert!(
        timeout(Duration::from_millis(100), &mut pending).await.is_err(),
        "nothing confirmed yet"
    );

    send(
        &session,
        r#"{"tag":"SnapshotConfirmed","snapshot":{"confirmedTransactions":["cafe0001","cafe0002"]}}"#,
    )
    .await;
    assert!(timeout(WAIT, &mut pending).await.unwrap().unwrap());
}

#[tokio::test]
async fn connection_loss_fails_in_flight_calls() {
    let mut server = spawn_server().await;
    let client = NodeClient::new("alice", server.url.clone());
    let mut session = connect(&mut server, &client).await;

    send(&session, &greeting("Idle")).await;
    wait_for_status(&client, HeadStatus::Idle).await;

    let init_client = client.clone();
    let mut init = tokio::spawn(async move { init_client.init().await });
    recv_json(&mut session).await;

    // drop the server half without a close handshake
    drop(session);
    match timeout(WAIT, &mut init).await.unwrap().unwrap() {
        Err(NodeError::ConnectionReset) => {}
        other => panic!("expected ConnectionReset, got {other:?}"),
    }

    // the transport reconnects on its own
    let session = timeout(WAIT, server.sessions.recv()).await.unwrap().unwrap();
    send(&session, &greeting("Idle")).await;
    wait_for_status(&client, HeadStatus::Idle).await;
}

#[tokio::test]
async fn duplicate_in_flight_command_is_rejected() {
    let mut server = spawn_server().await;
    let client = NodeClient::new("alice", server.url.clone())
        .with_resend_interval(Duration::from_secs(60));
    let mut session = connect(&mut server, &client).await;

    send(&session, &greeting("Open")).await;
    wait_for_status(&client, HeadStatus::Open).await;

    let close_client = client.clone();
    let _close = tokio::spawn(async move { close_client.close().await });
    recv_json(&mut session).await;

    match client.close().await {
        Err(NodeError::CallInFlight(command)) => assert_eq!(command, "Close"),
        other => panic!("expected CallInFlight, got {other:?}"),
    }
}
