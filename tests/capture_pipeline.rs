use std::time::Duration;

use serial_test::serial;

use rust_lib_nibble::api::capture_api::{
    capture_status, clear_session, create_default_config, init_core, record_event,
    selected_transaction, start_capture, stop_capture, subscribe_updates, transaction_dump,
    CaptureError,
};
use rust_lib_nibble::models::{CaptureEvent, UiUpdate};

fn request_event(id: &str, ts: f64) -> CaptureEvent {
    let mut event = CaptureEvent::request(id, "GET", "/api/users");
    event.ts = Some(ts);
    event.start_line = Some("GET /api/users HTTP/1.1".into());
    event.push_header("Host", "api.example.com");
    event
}

fn response_event(id: &str, ts: f64) -> CaptureEvent {
    let mut event = CaptureEvent::response(id, 200, "OK");
    event.ts = Some(ts);
    event.start_line = Some("HTTP/1.1 200 OK".into());
    event.push_header("Content-Type", "application/json; charset=utf-8");
    event.text_body = Some(r#"{"users":[]}"#.into());
    event
}

async fn next_update(updates: &mut tokio::sync::broadcast::Receiver<UiUpdate>) -> UiUpdate {
    tokio::time::timeout(Duration::from_secs(2), updates.recv())
        .await
        .expect("update arrives in time")
        .expect("update channel open")
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
#[serial]
async fn capture_pipeline_emits_row_updates() {
    let storage_dir = tempfile::tempdir().unwrap();
    init_core(Some(storage_dir.path().to_string_lossy().to_string())).unwrap();

    let mut config = create_default_config();
    config.poll_interval_ms = 50;
    start_capture(config).expect("capture starts");
    let mut updates = subscribe_updates().expect("subscribed");

    record_event(request_event("tx-1", 1000.0)).expect("request recorded");

    let first = next_update(&mut updates).await;
    let UiUpdate::NewRow {
        id,
        sequence,
        handle,
        request,
    } = first
    else {
        panic!("expected NewRow, got {first:?}");
    };
    assert_eq!(id, "tx-1");
    assert_eq!(sequence, 1);
    assert_eq!(request.host, "api.example.com");
    assert_eq!(request.path, "/api/users");

    record_event(response_event("tx-1", 1000.245)).expect("response recorded");

    let second = next_update(&mut updates).await;
    let UiUpdate::UpdateRow {
        handle: updated,
        response,
        duration,
    } = second
    else {
        panic!("expected UpdateRow, got {second:?}");
    };
    assert_eq!(updated, handle, "row update targets the row it created");
    assert_eq!(response.status_code, Some(200));
    assert_eq!(response.content_type, "application/json");
    assert_eq!(duration.as_deref(), Some("245ms"));

    let tx = selected_transaction("tx-1")
        .await
        .expect("transaction recorded");
    assert!(tx.request.is_some() && tx.response.is_some());

    let dump = transaction_dump("tx-1").await.expect("dump renders");
    assert!(dump.request_raw.starts_with("GET /api/users HTTP/1.1"));
    assert!(dump.response_raw.ends_with(r#"{"users":[]}"#));

    let status = capture_status().await;
    assert!(status.is_running);
    assert_eq!(status.transaction_count, 1);
    assert_eq!(status.buffered_events, 0, "pump drained the buffer");

    stop_capture().expect("capture stops");
    assert!(!capture_status().await.is_running);
    assert!(matches!(
        record_event(request_event("tx-2", 1001.0)),
        Err(CaptureError::NotRunning)
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
#[serial]
async fn start_capture_rejects_a_second_session() {
    start_capture(create_default_config()).expect("first start");
    assert!(matches!(
        start_capture(create_default_config()),
        Err(CaptureError::AlreadyRunning)
    ));
    stop_capture().expect("stop");
    assert!(matches!(stop_capture(), Err(CaptureError::NotRunning)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
#[serial]
async fn clear_session_resets_the_transaction_table() {
    let mut config = create_default_config();
    config.poll_interval_ms = 25;
    start_capture(config).expect("capture starts");
    let mut updates = subscribe_updates().expect("subscribed");

    record_event(request_event("tx-1", 2000.0)).expect("recorded");
    let _ = next_update(&mut updates).await;
    assert_eq!(capture_status().await.transaction_count, 1);

    clear_session().await.expect("cleared");
    assert_eq!(capture_status().await.transaction_count, 0);
    assert!(selected_transaction("tx-1").await.is_none());

    stop_capture().expect("stop");
}
