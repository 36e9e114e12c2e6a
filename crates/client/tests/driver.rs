//! End-to-end tests against a scripted in-memory transport.
//!
//! The pipe stands in for the browser side of the WebSocket: requests the
//! client sends surface on a channel, and inbound traffic is injected as
//! raw text, so tests control interleaving precisely.

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio_test::{assert_pending, task};

use tokio_cdp::cdp::{dom, page, runtime, target, Event, EventKind};
use tokio_cdp::transport::{TransportError, TransportRx, TransportTx};
use tokio_cdp::{context, CloseReason, Connection, Error, Session};

struct PipeTx {
    requests: mpsc::UnboundedSender<String>,
}

#[async_trait]
impl TransportTx for PipeTx {
    async fn send(&mut self, message: String) -> Result<(), TransportError> {
        self.requests
            .send(message)
            .map_err(|_| TransportError::Closed)
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        Ok(())
    }
}

struct PipeRx {
    inbound: mpsc::UnboundedReceiver<String>,
}

#[async_trait]
impl TransportRx for PipeRx {
    async fn receive(&mut self) -> Result<Option<String>, TransportError> {
        Ok(self.inbound.recv().await)
    }
}

struct Harness {
    conn: Arc<Connection>,
    requests: mpsc::UnboundedReceiver<String>,
    inbound: mpsc::UnboundedSender<String>,
}

fn open_pipe() -> Harness {
    let (request_tx, request_rx) = mpsc::unbounded_channel();
    let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
    let conn = Connection::open(
        Box::new(PipeTx {
            requests: request_tx,
        }),
        Box::new(PipeRx {
            inbound: inbound_rx,
        }),
    );
    Harness {
        conn,
        requests: request_rx,
        inbound: inbound_tx,
    }
}

impl Harness {
    /// Next request the client sent, parsed.
    async fn request(&mut self) -> Value {
        let text = self.requests.recv().await.expect("client request");
        serde_json::from_str(&text).expect("request is valid JSON")
    }

    fn send(&self, message: Value) {
        self.send_raw(message.to_string());
    }

    fn send_raw(&self, message: String) {
        self.inbound.send(message).expect("inbound channel open");
    }

    /// Answer `request` with a result, echoing its id and session tag.
    fn respond(&self, request: &Value, result: Value) {
        let mut response = json!({ "id": request["id"], "result": result });
        if let Some(session_id) = request.get("sessionId") {
            response["sessionId"] = session_id.clone();
        }
        self.send(response);
    }
}

/// Drive the attach handshake and return the new session.
async fn attach(harness: &mut Harness, target_id: &str, session_id: &str) -> Arc<Session> {
    let conn = Arc::clone(&harness.conn);
    let target_id = target_id.to_owned();
    let open = tokio::spawn(async move { conn.open_session(target_id).await });
    let request = harness.request().await;
    assert_eq!(request["method"], "Target.attachToTarget");
    assert_eq!(request["params"]["flatten"], true);
    harness.respond(&request, json!({ "sessionId": session_id }));
    open.await.unwrap().unwrap()
}

/// Round-trip one command so the reader has provably processed everything
/// injected before it.
async fn barrier(harness: &mut Harness) {
    let conn = Arc::clone(&harness.conn);
    let call = tokio::spawn(async move { conn.execute(target::set_discover_targets(false)).await });
    let request = harness.request().await;
    harness.respond(&request, json!({}));
    call.await.unwrap().unwrap();
}

#[tokio::test]
async fn execute_decodes_typed_result() {
    let mut harness = open_pipe();

    let conn = Arc::clone(&harness.conn);
    let call = tokio::spawn(async move { conn.execute(target::get_targets()).await });

    let request = harness.request().await;
    assert_eq!(request["method"], "Target.getTargets");
    assert_eq!(request["id"], 0);
    assert!(request.get("sessionId").is_none());

    harness.respond(
        &request,
        json!({
            "targetInfos": [{
                "targetId": "target1",
                "type": "page",
                "title": "New Tab",
                "url": "about:blank",
                "attached": false,
            }],
        }),
    );

    let targets = call.await.unwrap().unwrap();
    assert_eq!(targets.target_infos.len(), 1);
    assert_eq!(targets.target_infos[0].target_id, "target1");
}

#[tokio::test]
async fn browser_error_reaches_only_its_caller() {
    let mut harness = open_pipe();

    let conn = Arc::clone(&harness.conn);
    let call = tokio::spawn(async move { conn.execute(target::get_targets()).await });

    let request = harness.request().await;
    harness.send(json!({
        "id": request["id"],
        "error": {
            "code": -32000,
            "message": "this is a browser error",
            "data": "additional data",
        },
    }));

    let error = call.await.unwrap().unwrap_err();
    let Error::Browser(error) = error else {
        panic!("expected a browser error, got {error:?}");
    };
    assert_eq!(error.code, -32000);
    assert_eq!(error.message, "this is a browser error");

    // The connection itself is still healthy.
    barrier(&mut harness).await;
}

#[tokio::test]
async fn invalid_json_tears_down_the_connection() {
    let mut harness = open_pipe();

    let conn = Arc::clone(&harness.conn);
    let call = tokio::spawn(async move { conn.execute(target::get_targets()).await });
    let _request = harness.request().await;

    harness.send_raw("bogus".to_owned());

    let error = call.await.unwrap().unwrap_err();
    let Error::Closed(CloseReason::Desync(desync)) = error else {
        panic!("expected desync teardown, got {error:?}");
    };
    assert_eq!(desync.code, -32700);

    // Later calls fail fast without touching the wire.
    let error = harness.conn.execute(target::get_targets()).await.unwrap_err();
    assert!(matches!(error, Error::Closed(_)));
    assert!(matches!(
        harness.conn.close_reason(),
        Some(CloseReason::Desync(_))
    ));
}

#[tokio::test]
async fn unknown_call_id_is_ignored() {
    let mut harness = open_pipe();

    let conn = Arc::clone(&harness.conn);
    let call = tokio::spawn(async move { conn.execute(target::get_targets()).await });
    let request = harness.request().await;

    // A response nobody asked for must not crash the reader or resolve the
    // wrong waiter.
    harness.send(json!({ "id": 999, "result": {} }));
    harness.respond(&request, json!({ "targetInfos": [] }));

    let targets = call.await.unwrap().unwrap();
    assert!(targets.target_infos.is_empty());
}

#[tokio::test]
async fn session_commands_carry_the_session_tag() {
    let mut harness = open_pipe();
    let session = attach(&mut harness, "target1", "session1").await;
    assert_eq!(session.session_id(), "session1");
    assert_eq!(session.target_id(), "target1");

    let worker = Arc::clone(&session);
    let query = tokio::spawn(async move { worker.execute(dom::query_selector(0, "p.foo")).await });

    let request = harness.request().await;
    assert_eq!(request["method"], "DOM.querySelector");
    assert_eq!(request["sessionId"], "session1");
    assert_eq!(request["params"]["nodeId"], 0);
    assert_eq!(request["params"]["selector"], "p.foo");

    harness.respond(&request, json!({ "nodeId": 1 }));
    assert_eq!(query.await.unwrap().unwrap().node_id, 1);
}

#[tokio::test]
async fn sessions_do_not_cross_talk() {
    let mut harness = open_pipe();
    let first = attach(&mut harness, "target1", "session1").await;
    let second = attach(&mut harness, "target2", "session2").await;

    let worker = Arc::clone(&first);
    let query_one = tokio::spawn(async move { worker.execute(dom::query_selector(0, "#one")).await });
    let request_one = harness.request().await;

    let worker = Arc::clone(&second);
    let query_two = tokio::spawn(async move { worker.execute(dom::query_selector(0, "#two")).await });
    let request_two = harness.request().await;

    assert_eq!(request_one["sessionId"], "session1");
    assert_eq!(request_two["sessionId"], "session2");
    // Each endpoint runs its own id sequence.
    assert_eq!(request_one["id"], 0);
    assert_eq!(request_two["id"], 0);

    // Answer in reverse order; routing is by session tag, not arrival.
    harness.respond(&request_two, json!({ "nodeId": 2 }));
    harness.respond(&request_one, json!({ "nodeId": 1 }));

    assert_eq!(query_one.await.unwrap().unwrap().node_id, 1);
    assert_eq!(query_two.await.unwrap().unwrap().node_id, 2);
}

#[tokio::test]
async fn concurrent_calls_resolve_by_id() {
    let mut harness = open_pipe();

    let mut calls = Vec::new();
    for i in 0..8 {
        let conn = Arc::clone(&harness.conn);
        calls.push(tokio::spawn(async move {
            let returns = conn.execute(runtime::evaluate(i.to_string())).await.unwrap();
            (i, returns)
        }));
    }

    let mut requests = Vec::new();
    for _ in 0..8 {
        requests.push(harness.request().await);
    }

    let mut ids: Vec<u64> = requests
        .iter()
        .map(|request| request["id"].as_u64().unwrap())
        .collect();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), 8, "in-flight calls must have distinct ids");

    // Answer in reverse arrival order.
    for request in requests.iter().rev() {
        let expression = request["params"]["expression"].as_str().unwrap();
        let value: i64 = expression.parse().unwrap();
        harness.respond(
            request,
            json!({ "result": { "type": "number", "value": value } }),
        );
    }

    for call in calls {
        let (i, returns) = call.await.unwrap();
        assert_eq!(returns.result.value, Some(json!(i)));
    }
}

#[tokio::test]
async fn wait_for_skips_other_event_types() {
    let harness = open_pipe();

    let waiter = harness.conn.wait_for::<page::LoadEventFired>();
    harness.send(json!({ "method": "Page.domContentEventFired", "params": { "timestamp": 1 } }));
    harness.send(json!({ "method": "Page.loadEventFired", "params": { "timestamp": 2 } }));

    let event = waiter.wait().await.unwrap();
    assert_eq!(event.timestamp, 2.0);
}

#[tokio::test]
async fn listen_streams_events_in_arrival_order() {
    let harness = open_pipe();

    let mut events = harness.conn.listen(&[page::LoadEventFired::METHOD]);
    harness.send(json!({ "method": "Page.loadEventFired", "params": { "timestamp": 1 } }));
    harness.send(json!({ "method": "Page.loadEventFired", "params": { "timestamp": 2 } }));

    for expected in [1.0, 2.0] {
        let Some(Event::PageLoadEventFired(fired)) = events.next_event().await else {
            panic!("expected a load event");
        };
        assert_eq!(fired.timestamp, expected);
    }
}

#[tokio::test]
async fn dropped_listener_does_not_affect_others() {
    let mut harness = open_pipe();

    let first = harness.conn.listen(&[page::LoadEventFired::METHOD]);
    let mut second = harness.conn.listen(&[page::LoadEventFired::METHOD]);
    drop(first);

    harness.send(json!({ "method": "Page.loadEventFired", "params": { "timestamp": 1 } }));
    barrier(&mut harness).await;

    assert!(second.next_event().await.is_some());
}

#[tokio::test]
async fn slow_subscriber_loses_events_instead_of_blocking() {
    let mut harness = open_pipe();

    let mut events = harness.conn.listen_with(&[page::LoadEventFired::METHOD], 1);
    for timestamp in 1..=3 {
        harness.send(json!({
            "method": "Page.loadEventFired",
            "params": { "timestamp": timestamp },
        }));
    }
    barrier(&mut harness).await;

    // Only the first event fit the buffer; the rest were dropped at
    // dispatch time.
    let Some(Event::PageLoadEventFired(fired)) = events.next_event().await else {
        panic!("expected a load event");
    };
    assert_eq!(fired.timestamp, 1.0);

    let mut pending = task::spawn(events.next_event());
    assert_pending!(pending.poll());
    drop(pending);

    // Consuming freed the buffer; delivery resumes with new events.
    harness.send(json!({ "method": "Page.loadEventFired", "params": { "timestamp": 4 } }));
    let Some(Event::PageLoadEventFired(fired)) = events.next_event().await else {
        panic!("expected a load event");
    };
    assert_eq!(fired.timestamp, 4.0);
}

#[tokio::test]
async fn session_events_route_to_that_session_only() {
    let mut harness = open_pipe();
    let session = attach(&mut harness, "target1", "session1").await;

    let mut on_session = session.listen(&[page::LoadEventFired::METHOD]);
    let mut on_root = harness.conn.listen(&[page::LoadEventFired::METHOD]);

    harness.send(json!({
        "method": "Page.loadEventFired",
        "params": { "timestamp": 1 },
        "sessionId": "session1",
    }));

    assert!(on_session.next_event().await.is_some());
    let mut pending = task::spawn(on_root.next_event());
    assert_pending!(pending.poll());
}

#[tokio::test]
async fn message_for_unknown_session_tears_down() {
    let mut harness = open_pipe();

    let conn = Arc::clone(&harness.conn);
    let call = tokio::spawn(async move { conn.execute(target::get_targets()).await });
    let _request = harness.request().await;

    harness.send(json!({ "id": 0, "sessionId": "ghost", "result": {} }));

    let error = call.await.unwrap().unwrap_err();
    let Error::Closed(CloseReason::Desync(desync)) = error else {
        panic!("expected desync teardown, got {error:?}");
    };
    assert_eq!(desync.code, -32600);
    assert!(desync.message.contains("unknown session"));
}

#[tokio::test]
async fn feature_scopes_share_one_enable_and_one_disable() {
    let mut harness = open_pipe();
    let session = attach(&mut harness, "target1", "session1").await;

    // Hand the browser side to an auto-responder that acks every command
    // and records the methods it saw.
    let methods = Arc::new(std::sync::Mutex::new(Vec::new()));
    let log = Arc::clone(&methods);
    let mut requests = harness.requests;
    let inbound = harness.inbound.clone();
    tokio::spawn(async move {
        while let Some(text) = requests.recv().await {
            let request: Value = serde_json::from_str(&text).unwrap();
            log.lock()
                .unwrap()
                .push(request["method"].as_str().unwrap().to_owned());
            let mut response = json!({ "id": request["id"], "result": {} });
            if let Some(session_id) = request.get("sessionId") {
                response["sessionId"] = session_id.clone();
            }
            if inbound.send(response.to_string()).is_err() {
                break;
            }
        }
    });

    // Two concurrent holders race for the same feature; the enable count
    // is locked across the underlying command, so exactly one Page.enable
    // goes out.
    let (first, second) = tokio::join!(session.page_enable(), session.page_enable());
    let first = first.unwrap();
    let second = second.unwrap();

    // Releasing the first holder must not disable; releasing the last one
    // sends exactly one Page.disable.
    first.release().await.unwrap();
    second.release().await.unwrap();

    assert_eq!(
        *methods.lock().unwrap(),
        vec!["Page.enable".to_owned(), "Page.disable".to_owned()]
    );
}

#[tokio::test]
async fn cancelled_call_ignores_its_late_response() {
    let mut harness = open_pipe();

    let conn = Arc::clone(&harness.conn);
    let call = tokio::spawn(async move { conn.execute(target::get_targets()).await });
    let request = harness.request().await;

    call.abort();
    assert!(call.await.is_err());

    // The late response must hit the unknown-id path, leaving the
    // connection usable.
    harness.respond(&request, json!({ "targetInfos": [] }));

    let conn = Arc::clone(&harness.conn);
    let second = tokio::spawn(async move { conn.execute(target::get_targets()).await });
    let request = harness.request().await;
    assert_eq!(request["id"], 1);
    harness.respond(&request, json!({ "targetInfos": [] }));
    second.await.unwrap().unwrap();
}

#[tokio::test]
async fn close_fails_pending_calls_and_later_ones() {
    let mut harness = open_pipe();

    let conn = Arc::clone(&harness.conn);
    let call = tokio::spawn(async move { conn.execute(target::get_targets()).await });
    let _request = harness.request().await;

    harness.conn.close().await;

    let error = call.await.unwrap().unwrap_err();
    assert!(matches!(error, Error::Closed(CloseReason::Clean)));

    let error = harness.conn.execute(target::get_targets()).await.unwrap_err();
    assert!(matches!(error, Error::Closed(CloseReason::Clean)));

    // Closing again is a no-op.
    harness.conn.close().await;
}

#[tokio::test]
async fn remote_close_ends_event_streams() {
    let harness = open_pipe();

    let mut events = harness.conn.listen(&[page::LoadEventFired::METHOD]);
    drop(harness.inbound);

    assert!(events.next_event().await.is_none());
    assert!(matches!(
        harness.conn.close_reason(),
        Some(CloseReason::Clean)
    ));
}

#[tokio::test]
async fn ambient_context_is_task_scoped() {
    let mut harness = open_pipe();
    let session = attach(&mut harness, "target1", "session1").await;

    assert!(context::current_session().is_err());

    let seen = context::with_session(Arc::clone(&session), async {
        context::current_session().unwrap().session_id().clone()
    })
    .await;
    assert_eq!(seen, "session1");

    assert!(context::current_session().is_err());
}

#[tokio::test]
async fn works_over_a_real_websocket() {
    use tokio_tungstenite::tungstenite::Message;

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        while let Some(Ok(message)) = ws.next().await {
            if let Message::Text(text) = message {
                let request: Value = serde_json::from_str(&text).unwrap();
                let response = json!({ "id": request["id"], "result": { "targetInfos": [] } });
                if ws.send(Message::Text(response.to_string())).await.is_err() {
                    break;
                }
            }
        }
    });

    let conn = Connection::connect(&format!("ws://{addr}/devtools/browser/test"))
        .await
        .unwrap();
    let targets = conn.execute(target::get_targets()).await.unwrap();
    assert!(targets.target_infos.is_empty());
    conn.close().await;
}
