mod common;

use axum::{
    body::{Body, to_bytes},
    http::{Request, StatusCode},
};
use common::{Harness, aspirin};
use medminder::router::{MedminderState, medminder_router};
use medminder::service::scheduler;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

async fn body_string(resp: axum::response::Response) -> String {
    let body = to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("failed to read response body");
    String::from_utf8(body.to_vec()).expect("response body was not utf-8")
}

#[tokio::test]
async fn manual_trigger_requires_key_and_returns_summary() {
    let h = Harness::new("router").await;
    let user = h.user("pat@example.com", "+15551234567").await;
    h.medication(user.id, aspirin()).await;

    let handle = scheduler::spawn(h.engine.clone(), Duration::from_secs(3600))
        .await
        .unwrap();
    let state = MedminderState::new(h.engine.clone(), handle.clone(), Arc::from("pwd"));
    let app = medminder_router(state);

    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/send_reminders")
                .body(Body::empty())
                .expect("failed to build request"),
        )
        .await
        .expect("request failed");
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert!(h.sms.sent().is_empty());

    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/send_reminders")
                .header("x-admin-key", "pwd")
                .body(Body::empty())
                .expect("failed to build request"),
        )
        .await
        .expect("request failed");
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_string(resp).await;
    assert!(body.contains(r#""ok":true"#));
    assert!(body.contains(r#""sent":1"#));

    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/admin/reminders/run?key=pwd")
                .body(Body::empty())
                .expect("failed to build request"),
        )
        .await
        .expect("request failed");
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(body_string(resp).await.contains(r#""skipped_duplicate":1"#));
    assert_eq!(h.sms.sent().len(), 1);

    handle.shutdown();
}

#[tokio::test]
async fn scheduler_can_be_controlled_over_http() {
    let h = Harness::new("router-sched").await;
    let handle = scheduler::spawn(h.engine.clone(), Duration::from_secs(3600))
        .await
        .unwrap();
    let state = MedminderState::new(h.engine.clone(), handle.clone(), Arc::from("pwd"));
    let app = medminder_router(state);

    let call = |method: &'static str, uri: &'static str| {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("authorization", "Bearer pwd")
            .body(Body::empty())
            .expect("failed to build request")
    };

    let resp = app.clone().oneshot(call("GET", "/admin/scheduler")).await.unwrap();
    assert!(body_string(resp).await.contains(r#""state":"stopped""#));

    let resp = app
        .clone()
        .oneshot(call("POST", "/admin/scheduler/start"))
        .await
        .unwrap();
    assert!(body_string(resp).await.contains(r#""state":"idle""#));

    let resp = app
        .clone()
        .oneshot(call("POST", "/admin/scheduler/stop"))
        .await
        .unwrap();
    assert!(body_string(resp).await.contains(r#""state":"stopped""#));

    handle.shutdown();
}

#[tokio::test]
async fn scan_failure_maps_to_internal_error() {
    let h = Harness::new("router-500").await;
    sqlx::query("DROP TABLE notifications")
        .execute(h.db.storage.pool())
        .await
        .unwrap();
    sqlx::query("DROP TABLE medications")
        .execute(h.db.storage.pool())
        .await
        .unwrap();
    let handle = scheduler::spawn(h.engine.clone(), Duration::from_secs(3600))
        .await
        .unwrap();
    let app = medminder_router(MedminderState::new(
        h.engine.clone(),
        handle.clone(),
        Arc::from("pwd"),
    ));

    let resp = app
        .oneshot(
            Request::builder()
                .uri("/send_reminders?key=pwd")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body_string(resp).await.contains("INTERNAL_ERROR"));
    handle.shutdown();
}

#[tokio::test]
async fn empty_admin_key_locks_every_admin_route() {
    let h = Harness::new("router-nokey").await;
    let user = h.user("pat@example.com", "+15551234567").await;
    h.medication(user.id, aspirin()).await;
    let handle = scheduler::spawn(h.engine.clone(), Duration::from_secs(3600))
        .await
        .unwrap();
    handle.start().await.unwrap();
    let app = medminder_router(MedminderState::new(
        h.engine.clone(),
        handle.clone(),
        Arc::from(""),
    ));

    for (method, uri) in [
        ("GET", "/send_reminders?key="),
        ("POST", "/admin/reminders/run"),
        ("POST", "/admin/scheduler/stop?key="),
        ("POST", "/admin/scheduler/stop?key=medminder"),
    ] {
        let resp = app
            .clone()
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri(uri)
                    .header("x-admin-key", "")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED, "{method} {uri}");
    }

    assert!(h.sms.sent().is_empty());
    assert_eq!(
        handle.status().await.unwrap().state,
        scheduler::SchedulerState::Idle
    );
    handle.shutdown();
}
