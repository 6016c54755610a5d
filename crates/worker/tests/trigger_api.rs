//! Integration tests for the trigger endpoint, end to end against a mock
//! Satori API and a real PostgreSQL database.

mod common;

use axum::http::StatusCode;
use sqlx::PgPool;

use common::{
    body_json, build_test_app, build_test_app_with_pool, capture_logs, csv_export, envelope,
    post_json, post_raw, unreachable_base_url, MockSatori, DESTINATION,
};
use satori_sync_db::repositories::AuditRecordRepo;
use satori_sync_worker::state::SessionSource;

// "1"
const ONE_DAY: &str = "MQ==";

// ---------------------------------------------------------------------------
// Successful invocations
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = false)]
async fn trigger_loads_export_into_destination(pool: PgPool) {
    let mock = MockSatori::serving(csv_export(&["flow-1", "flow-2"]));
    let app = build_test_app_with_pool(mock.spawn().await, pool.clone());

    let response = post_json(app, "/", &envelope(ONE_DAY)).await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["days_ago"], 1);
    assert_eq!(json["staged"], 2);
    assert_eq!(json["inserted"], 2);
    assert_eq!(
        json["to_ms"].as_i64().unwrap() - json["from_ms"].as_i64().unwrap(),
        30 * 86_400_000
    );
    assert_eq!(AuditRecordRepo::count(&pool, DESTINATION).await.unwrap(), 2);
}

#[sqlx::test(migrations = false)]
async fn redelivered_trigger_inserts_nothing_new(pool: PgPool) {
    let mock = MockSatori::serving(csv_export(&["flow-1", "flow-2"]));
    let base = mock.spawn().await;

    let first = post_json(
        build_test_app_with_pool(base.clone(), pool.clone()),
        "/",
        &envelope(ONE_DAY),
    )
    .await;
    let second = post_json(
        build_test_app_with_pool(base, pool.clone()),
        "/",
        &envelope(ONE_DAY),
    )
    .await;

    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(second.status(), StatusCode::OK);
    assert_eq!(body_json(second).await["inserted"], 0);
    assert_eq!(AuditRecordRepo::count(&pool, DESTINATION).await.unwrap(), 2);
}

#[sqlx::test(migrations = false)]
async fn header_only_export_succeeds_with_zero_rows(pool: PgPool) {
    let mock = MockSatori::serving(csv_export(&[]));
    let app = build_test_app_with_pool(mock.spawn().await, pool.clone());

    let response = post_json(app, "/", &envelope(ONE_DAY)).await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["staged"], 0);
    assert_eq!(json["inserted"], 0);
    assert!(AuditRecordRepo::table_exists(&pool, DESTINATION).await.unwrap());
    assert_eq!(AuditRecordRepo::count(&pool, DESTINATION).await.unwrap(), 0);

    let leftover: i64 = sqlx::query_scalar(
        "SELECT COUNT(*)::BIGINT FROM pg_tables \
         WHERE schemaname = 'public' AND tablename LIKE 'satori_audit_tempbuffer%'",
    )
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(leftover, 0, "staging table must not survive the invocation");
}

#[sqlx::test(migrations = false)]
async fn duplicate_flow_ids_in_export_yield_one_row(pool: PgPool) {
    let mock = MockSatori::serving(csv_export(&["flow-dup", "flow-dup"]));
    let app = build_test_app_with_pool(mock.spawn().await, pool.clone());

    let response = post_json(app, "/", &envelope(ONE_DAY)).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["inserted"], 1);
    assert_eq!(AuditRecordRepo::count(&pool, DESTINATION).await.unwrap(), 1);
}

// ---------------------------------------------------------------------------
// Upstream failures
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = false)]
async fn auth_401_leaves_destination_untouched_and_is_logged(pool: PgPool) {
    let (logs, _guard) = capture_logs();
    let mock = MockSatori::rejecting_auth(StatusCode::UNAUTHORIZED);
    let app = build_test_app_with_pool(mock.spawn().await, pool.clone());

    let response = post_json(app, "/", &envelope(ONE_DAY)).await;

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let json = body_json(response).await;
    assert_eq!(json["code"], "UPSTREAM_ERROR");
    assert!(json["error"].as_str().unwrap().contains("401"));

    assert_eq!(mock.export_calls(), 0);
    assert!(!AuditRecordRepo::table_exists(&pool, DESTINATION).await.unwrap());

    let logged = logs.contents();
    assert!(
        logged.contains("Bearer token request failed"),
        "auth failure should be logged, got: {logged}"
    );
}

#[tokio::test]
async fn unreachable_satori_is_bad_gateway() {
    let app = build_test_app(unreachable_base_url().await, SessionSource::PerInvocation);

    let response = post_json(app, "/", &envelope(ONE_DAY)).await;

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn database_unreachable_after_fetch_is_unavailable() {
    let mock = MockSatori::serving(csv_export(&["flow-1"]));
    let app = build_test_app(mock.spawn().await, SessionSource::PerInvocation);

    let response = post_json(app, "/", &envelope(ONE_DAY)).await;

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body_json(response).await["code"], "DATABASE_UNAVAILABLE");
    assert_eq!(mock.export_calls(), 1);
}

// ---------------------------------------------------------------------------
// Malformed payloads
// ---------------------------------------------------------------------------

#[tokio::test]
async fn invalid_base64_fails_before_any_work() {
    let mock = MockSatori::serving(csv_export(&["flow-1"]));
    let app = build_test_app(mock.spawn().await, SessionSource::PerInvocation);

    let response = post_json(app, "/", &envelope("%%% not base64 %%%")).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "INVALID_PAYLOAD");
    assert_eq!(mock.export_calls(), 0);
}

#[tokio::test]
async fn non_integer_payload_is_rejected() {
    let mock = MockSatori::serving(csv_export(&[]));
    let app = build_test_app(mock.spawn().await, SessionSource::PerInvocation);

    // "yesterday"
    let response = post_json(app, "/", &envelope("eWVzdGVyZGF5")).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(mock.export_calls(), 0);
}

#[tokio::test]
async fn non_json_body_is_rejected() {
    let app = build_test_app(unreachable_base_url().await, SessionSource::PerInvocation);

    let response = post_raw(app, "/", "MQ==").await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn out_of_range_offset_is_rejected() {
    let app = build_test_app(unreachable_base_url().await, SessionSource::PerInvocation);

    // "999999"
    let response = post_json(app, "/", &envelope("OTk5OTk5")).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
