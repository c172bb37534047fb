//! Mock device — an axum server standing in for a device's `/firmware`
//! endpoint.
//!
//! Binds `127.0.0.1:0`, records every upload it receives, and answers with a
//! fixed status and body. The server shuts down when the [`MockDevice`] is
//! dropped.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::routing::post;
use tokio::net::TcpListener;
use tokio::sync::oneshot;

/// One multipart part as the device saw it.
#[derive(Debug, Clone)]
pub struct ReceivedPart {
    pub name: Option<String>,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

/// One request to `/firmware`.
#[derive(Debug, Clone)]
pub struct ReceivedUpload {
    /// Raw `Authorization` header.
    pub authorization: Option<String>,
    /// Raw `Content-Type` header.
    pub content_type: Option<String>,
    pub parts: Vec<ReceivedPart>,
}

struct DeviceState {
    status: StatusCode,
    body: String,
    delay: Duration,
    received: Mutex<Vec<ReceivedUpload>>,
}

/// A running mock device.
pub struct MockDevice {
    addr: SocketAddr,
    state: Arc<DeviceState>,
    shutdown: Option<oneshot::Sender<()>>,
}

impl MockDevice {
    /// Start a device answering every upload with `status` and `body`.
    pub async fn start(status: u16, body: &str) -> Self {
        Self::start_with_delay(status, body, Duration::ZERO).await
    }

    /// Start a device that waits `delay` before answering.
    pub async fn start_with_delay(status: u16, body: &str, delay: Duration) -> Self {
        let state = Arc::new(DeviceState {
            status: StatusCode::from_u16(status).expect("invalid status code"),
            body: body.to_string(),
            delay,
            received: Mutex::new(Vec::new()),
        });

        let app = axum::Router::new()
            .route("/firmware", post(handle_firmware))
            .layer(DefaultBodyLimit::max(16 * 1024 * 1024))
            .with_state(Arc::clone(&state));

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind mock device");
        let addr = listener.local_addr().expect("mock device has no address");

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.await;
                })
                .await;
        });

        tracing::debug!(%addr, status, "Mock device listening");

        Self {
            addr,
            state,
            shutdown: Some(shutdown_tx),
        }
    }

    /// `host:port`, as used for `upload_port`.
    pub fn address(&self) -> String {
        self.addr.to_string()
    }

    /// Every upload received so far, in arrival order.
    pub fn uploads(&self) -> Vec<ReceivedUpload> {
        self.state
            .received
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }
}

impl Drop for MockDevice {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

async fn handle_firmware(
    State(state): State<Arc<DeviceState>>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> (StatusCode, String) {
    let header_str = |name: header::HeaderName| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    let authorization = header_str(header::AUTHORIZATION);
    let content_type = header_str(header::CONTENT_TYPE);

    let mut parts = Vec::new();
    while let Ok(Some(field)) = multipart.next_field().await {
        let name = field.name().map(str::to_string);
        let file_name = field.file_name().map(str::to_string);
        let part_type = field.content_type().map(str::to_string);
        let data = field.bytes().await.map(|b| b.to_vec()).unwrap_or_default();
        parts.push(ReceivedPart {
            name,
            file_name,
            content_type: part_type,
            data,
        });
    }

    if let Ok(mut received) = state.received.lock() {
        received.push(ReceivedUpload {
            authorization,
            content_type,
            parts,
        });
    }

    if !state.delay.is_zero() {
        tokio::time::sleep(state.delay).await;
    }

    (state.status, state.body.clone())
}

/// An address nothing is listening on.
pub async fn unused_address() -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("failed to bind probe listener");
    let addr = listener.local_addr().expect("probe listener has no address");
    drop(listener);
    addr.to_string()
}
