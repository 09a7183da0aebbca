//! Dispatcher behaviour: in-flight deduplication, retries, classification,
//! busy signaling and cleanup.

mod common;

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::json;
use tokio::sync::Notify;

use common::{builder, wait_until_in_flight, RecordingBusy, ScriptedTransport, Step};
use signed_dispatch::dispatch::{PLATFORM_HEADER, SIGNATURE_HEADER, TOKEN_HEADER};
use signed_dispatch::resilience::BackoffPolicy;
use signed_dispatch::signing::{canonical_query, signature};
use signed_dispatch::transport::TransportError;
use signed_dispatch::{DispatchError, DispatchRequest, Method, RequestData};

const URL: &str = "https://api.example.com/orders";

fn data(pairs: &[(&str, serde_json::Value)]) -> RequestData {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

#[tokio::test]
async fn test_duplicate_rejected_while_in_flight() {
    let gate = Arc::new(Notify::new());
    let transport = ScriptedTransport::new(vec![Step::Wait(gate.clone(), 200, json!({"id": 1}))]);
    let busy = RecordingBusy::new();
    let dispatcher = builder(transport.clone(), busy.clone()).build();

    let request = DispatchRequest::new(Method::GET, URL);
    let descriptor = request.descriptor();

    let first = tokio::spawn({
        let dispatcher = dispatcher.clone();
        let request = request.clone();
        async move { dispatcher.send(request).await }
    });
    wait_until_in_flight(dispatcher.tracker(), &descriptor).await;

    let err = dispatcher.send(request.clone()).await.unwrap_err();
    assert!(matches!(err, DispatchError::DuplicateRejected(ref fp) if *fp == descriptor.fingerprint()));

    gate.notify_one();
    let body = first.await.unwrap().unwrap();
    assert_eq!(body, json!({"id": 1}));
    assert_eq!(transport.attempts(), 1);
    assert!(dispatcher.tracker().is_empty());

    // Once settled, the same call is accepted again.
    assert!(dispatcher.send(request).await.is_ok());
    assert_eq!(transport.attempts(), 2);
}

#[tokio::test]
async fn test_duplicate_does_not_touch_busy_indicator() {
    let gate = Arc::new(Notify::new());
    let transport = ScriptedTransport::new(vec![Step::Wait(gate.clone(), 200, json!(null))]);
    let busy = RecordingBusy::new();
    let dispatcher = builder(transport, busy.clone()).build();
    let descriptor = DispatchRequest::new(Method::GET, URL).descriptor();

    let first = tokio::spawn({
        let dispatcher = dispatcher.clone();
        async move { dispatcher.get(URL).await }
    });
    wait_until_in_flight(dispatcher.tracker(), &descriptor).await;

    for _ in 0..3 {
        assert!(dispatcher.get(URL).await.is_err());
    }
    assert_eq!(busy.begins(), 1);
    assert_eq!(busy.ends(), 0);

    gate.notify_one();
    first.await.unwrap().unwrap();
    assert_eq!(busy.begins(), 1);
    assert_eq!(busy.ends(), 1);
}

#[tokio::test]
async fn test_key_order_does_not_distinguish_calls() {
    let gate = Arc::new(Notify::new());
    let transport = ScriptedTransport::new(vec![Step::Wait(gate.clone(), 200, json!(null))]);
    let dispatcher = builder(transport.clone(), RecordingBusy::new()).build();

    let first_request = DispatchRequest::new(Method::POST, URL).param("b", 1).param("a", 2);
    let second_request = DispatchRequest::new(Method::POST, URL).param("a", 2).param("b", 1);
    let descriptor = first_request.descriptor();

    let first = tokio::spawn({
        let dispatcher = dispatcher.clone();
        async move { dispatcher.send(first_request).await }
    });
    wait_until_in_flight(dispatcher.tracker(), &descriptor).await;

    let err = dispatcher.send(second_request).await.unwrap_err();
    assert!(matches!(err, DispatchError::DuplicateRejected(_)));

    gate.notify_one();
    first.await.unwrap().unwrap();
    assert_eq!(transport.attempts(), 1);
}

#[tokio::test]
async fn test_distinct_calls_run_concurrently() {
    let gate = Arc::new(Notify::new());
    let transport = ScriptedTransport::repeat(Step::Wait(gate.clone(), 200, json!(null)));
    let dispatcher = builder(transport.clone(), RecordingBusy::new()).build();

    let requests = vec![
        DispatchRequest::new(Method::GET, URL),
        DispatchRequest::new(Method::DELETE, URL),
        DispatchRequest::new(Method::POST, URL).param("qty", 1),
        DispatchRequest::new(Method::POST, URL).param("qty", 2),
    ];
    let descriptors: Vec<_> = requests.iter().map(DispatchRequest::descriptor).collect();

    let handles: Vec<_> = requests
        .into_iter()
        .map(|request| {
            let dispatcher = dispatcher.clone();
            tokio::spawn(async move { dispatcher.send(request).await })
        })
        .collect();

    for descriptor in &descriptors {
        wait_until_in_flight(dispatcher.tracker(), descriptor).await;
    }
    assert_eq!(dispatcher.tracker().len(), 4);

    while transport.attempts() < 4 {
        tokio::task::yield_now().await;
    }
    gate.notify_waiters();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }
    assert!(dispatcher.tracker().is_empty());
    assert_eq!(transport.attempts(), 4);
}

#[tokio::test]
async fn test_transport_failure_exhausts_retries() {
    let transport = ScriptedTransport::repeat(Step::Fail);
    let busy = RecordingBusy::new();
    let dispatcher = builder(transport.clone(), busy.clone()).build();

    let request = DispatchRequest::new(Method::GET, URL).max_retries(3);
    let descriptor = request.descriptor();

    let err = dispatcher.send(request).await.unwrap_err();
    match err {
        DispatchError::TransportFailure { attempts, source } => {
            assert_eq!(attempts, 4);
            assert!(matches!(source, TransportError::Connect(_)));
        }
        other => panic!("unexpected outcome: {other:?}"),
    }

    assert_eq!(transport.attempts(), 4);
    assert_eq!(busy.begins(), 1);
    assert_eq!(busy.ends(), 1);
    assert!(!dispatcher.tracker().contains(&descriptor));
}

#[tokio::test]
async fn test_zero_retries_means_single_attempt() {
    let transport = ScriptedTransport::repeat(Step::Fail);
    let dispatcher = builder(transport.clone(), RecordingBusy::new())
        .max_retries(0)
        .build();

    let err = dispatcher.get(URL).await.unwrap_err();
    assert!(matches!(err, DispatchError::TransportFailure { attempts: 1, .. }));
    assert_eq!(transport.attempts(), 1);
}

#[tokio::test]
async fn test_failure_then_success() {
    let transport = ScriptedTransport::new(vec![
        Step::Fail,
        Step::Fail,
        Step::Respond(200, json!({"items": []})),
    ]);
    let busy = RecordingBusy::new();
    let dispatcher = builder(transport.clone(), busy.clone()).build();

    let body = dispatcher
        .send(DispatchRequest::new(Method::GET, URL).max_retries(2))
        .await
        .unwrap();

    assert_eq!(body, json!({"items": []}));
    assert_eq!(transport.attempts(), 3);
    assert_eq!(busy.begins(), 1);
    assert_eq!(busy.ends(), 1);
    assert!(dispatcher.tracker().is_empty());
}

#[tokio::test]
async fn test_received_statuses_are_never_retried() {
    let cases: [(u16, fn(&DispatchError) -> bool); 3] = [
        (401, |e| matches!(e, DispatchError::Auth)),
        (500, |e| matches!(e, DispatchError::Server)),
        (404, |e| matches!(e, DispatchError::UnknownStatus(404))),
    ];

    for (status, expected) in cases {
        let transport = ScriptedTransport::repeat(Step::Respond(status, json!({"msg": "no"})));
        let busy = RecordingBusy::new();
        let dispatcher = builder(transport.clone(), busy.clone()).max_retries(3).build();

        let err = dispatcher.get(URL).await.unwrap_err();
        assert!(expected(&err), "status {status} gave {err:?}");
        assert_eq!(transport.attempts(), 1, "status {status} was retried");
        assert_eq!(busy.ends(), 1);
        assert!(dispatcher.tracker().is_empty());
    }
}

#[tokio::test]
async fn test_abandoned_call_releases_entry() {
    let transport = ScriptedTransport::new(vec![Step::Hang]);
    let busy = RecordingBusy::new();
    let dispatcher = builder(transport.clone(), busy.clone()).build();
    let descriptor = DispatchRequest::new(Method::GET, URL).descriptor();

    let abandoned = tokio::time::timeout(Duration::from_millis(50), dispatcher.get(URL)).await;
    assert!(abandoned.is_err());

    assert!(!dispatcher.tracker().contains(&descriptor));
    assert_eq!(busy.begins(), 1);
    assert_eq!(busy.ends(), 1);

    assert!(dispatcher.get(URL).await.is_ok());
    assert_eq!(transport.attempts(), 2);
}

#[tokio::test]
async fn test_fixed_backoff_between_attempts() {
    let transport = ScriptedTransport::new(vec![Step::Fail, Step::Fail]);
    let dispatcher = builder(transport.clone(), RecordingBusy::new())
        .backoff(BackoffPolicy::Fixed(Duration::from_millis(40)))
        .build();

    let start = Instant::now();
    dispatcher.get(URL).await.unwrap();

    assert_eq!(transport.attempts(), 3);
    assert!(start.elapsed() >= Duration::from_millis(80));
}

#[tokio::test]
async fn test_headers_signed_and_stable_across_retries() {
    let transport = ScriptedTransport::new(vec![Step::Fail]);
    let busy = RecordingBusy::new();
    let dispatcher = builder(transport.clone(), busy.clone())
        .busy_message("Saving...")
        .build();

    let payload = data(&[("sku", json!("A-100")), ("qty", json!(2))]);
    dispatcher.post(URL, payload.clone()).await.unwrap();

    let expected = signature(&canonical_query(Some(&payload)), common::SECRET);
    let requests = transport.requests();
    assert_eq!(requests.len(), 2);
    for request in &requests {
        assert_eq!(request.method, Method::POST);
        assert_eq!(request.data.as_ref(), Some(&payload));
        assert_eq!(request.headers[TOKEN_HEADER], common::TOKEN);
        assert_eq!(request.headers[PLATFORM_HEADER], common::PLATFORM);
        assert_eq!(request.headers[SIGNATURE_HEADER], expected.as_str());
    }
    assert_eq!(busy.messages(), vec!["Saving...".to_string()]);
}

#[tokio::test]
async fn test_shared_tracker_spans_dispatchers() {
    let gate = Arc::new(Notify::new());
    let transport = ScriptedTransport::new(vec![Step::Wait(gate.clone(), 200, json!(null))]);
    let first_dispatcher = builder(transport.clone(), RecordingBusy::new()).build();
    let second_dispatcher = builder(transport.clone(), RecordingBusy::new())
        .tracker(first_dispatcher.tracker().clone())
        .build();
    let descriptor = DispatchRequest::new(Method::GET, URL).descriptor();

    let first = tokio::spawn({
        let dispatcher = first_dispatcher.clone();
        async move { dispatcher.get(URL).await }
    });
    wait_until_in_flight(first_dispatcher.tracker(), &descriptor).await;

    let err = second_dispatcher.get(URL).await.unwrap_err();
    assert!(matches!(err, DispatchError::DuplicateRejected(_)));

    gate.notify_one();
    first.await.unwrap().unwrap();
}
