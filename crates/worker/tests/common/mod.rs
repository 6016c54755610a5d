use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::response::Response;
use axum::routing;
use axum::{Json, Router};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use satori_sync_core::audit_schema::column_list;
use satori_sync_core::config::{AppConfig, DbConfig, SatoriConfig, ServerConfig};
use satori_sync_db::DbPool;
use satori_sync_worker::routes;
use satori_sync_worker::state::{AppState, SessionSource};

pub const DESTINATION: &str = "public.satori_audit_data";

/// Build a test `AppConfig`. The socket root does not exist, so any attempt
/// to open a per-invocation session fails.
pub fn test_config() -> AppConfig {
    AppConfig {
        database: DbConfig {
            server: "test-instance".into(),
            socket_root: PathBuf::from("/nonexistent/cloudsql"),
            port: 5432,
            username: "loader".into(),
            password: "secret".into(),
            database: "warehouse".into(),
            schema: "public".into(),
            table: "satori_audit_data".into(),
        },
        satori: SatoriConfig {
            service_account_id: "sa-id".into(),
            service_account_key: "sa-key".into(),
            account_id: "acct-1".into(),
            api_host: "unused.test".into(),
            http_timeout: Duration::from_secs(5),
        },
        server: ServerConfig {
            host: "127.0.0.1".into(),
            port: 0,
        },
    }
}

/// Build the worker router against a mock Satori API and a session source.
pub fn build_test_app(satori_base_url: String, sessions: SessionSource) -> Router {
    let state = AppState {
        config: Arc::new(test_config()),
        satori_base_url,
        sessions,
    };
    routes::build_router(state)
}

/// Build the worker router with a shared test pool.
pub fn build_test_app_with_pool(satori_base_url: String, pool: DbPool) -> Router {
    build_test_app(satori_base_url, SessionSource::Pool(pool))
}

// ---------------------------------------------------------------------------
// Mock Satori API
// ---------------------------------------------------------------------------

/// Behaviour of the mock Satori API.
#[derive(Clone)]
pub struct MockSatori {
    pub auth_status: StatusCode,
    pub export_body: String,
    pub export_calls: Arc<Mutex<usize>>,
}

impl MockSatori {
    pub fn serving(export_body: impl Into<String>) -> Self {
        Self {
            auth_status: StatusCode::OK,
            export_body: export_body.into(),
            export_calls: Arc::new(Mutex::new(0)),
        }
    }

    pub fn rejecting_auth(status: StatusCode) -> Self {
        Self {
            auth_status: status,
            ..Self::serving("")
        }
    }

    pub fn export_calls(&self) -> usize {
        *self.export_calls.lock().unwrap()
    }

    /// Serve the mock on an ephemeral port and return its base URL.
    pub async fn spawn(&self) -> String {
        let auth_status = self.auth_status;
        let body = self.export_body.clone();
        let calls = Arc::clone(&self.export_calls);

        let app = Router::new()
            .route(
                "/api/authentication/token",
                routing::post(move || async move {
                    if auth_status.is_success() {
                        (auth_status, Json(json!({ "token": "tok-123" })))
                    } else {
                        (auth_status, Json(json!({ "message": "invalid credentials" })))
                    }
                }),
            )
            .route(
                "/api/data-flow/{account_id}/export",
                routing::get(move || async move {
                    *calls.lock().unwrap() += 1;
                    body
                }),
            );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }
}

/// Base URL on which nothing is listening.
pub async fn unreachable_base_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

// ---------------------------------------------------------------------------
// CSV fixtures
// ---------------------------------------------------------------------------

/// CSV export with a header and one 34-field row per flow id.
pub fn csv_export(flow_ids: &[&str]) -> String {
    let mut out = column_list().replace(", ", ",");
    out.push('\n');
    for flow_id in flow_ids {
        let mut fields = vec![String::new(); 34];
        fields[0] = "2024-01-01 10:00:00".into();
        fields[1] = "acct-1".into();
        fields[3] = (*flow_id).to_string();
        out.push_str(&fields.join(","));
        out.push('\n');
    }
    out
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// Envelope carrying `data` as the push subscription delivers it.
pub fn envelope(data: &str) -> Value {
    json!({
        "message": { "data": data, "messageId": "1" },
        "subscription": "projects/test/subscriptions/satori-sync",
    })
}

pub async fn post_json(app: Router, uri: &str, body: &Value) -> Response {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn post_raw(app: Router, uri: &str, body: &'static str) -> Response {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .body(Body::from(body))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn get(app: Router, uri: &str) -> Response {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn body_json(response: Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

// ---------------------------------------------------------------------------
// Log capture
// ---------------------------------------------------------------------------

/// Writer collecting formatted log lines in memory.
#[derive(Clone, Default)]
pub struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Route this thread's tracing output into a buffer until the guard drops.
pub fn capture_logs() -> (CapturedLogs, tracing::subscriber::DefaultGuard) {
    let logs = CapturedLogs::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::DEBUG)
        .finish();
    let guard = tracing::subscriber::set_default(subscriber);
    (logs, guard)
}
