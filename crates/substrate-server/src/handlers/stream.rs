// crates/substrate-server/src/handlers/stream.rs
// ============================================================================
// Module: Live Stream Handlers
// Description: SSE and WebSocket tails over the append-only event stream.
// Purpose: Let a caller follow a stream live instead of polling `/events/tail`.
// Dependencies: axum, tokio, tokio-stream, substrate-core, substrate-gate
// ============================================================================

//! ## Overview
//! Both transports share one poll loop: every tick, `list_after` is called
//! with the last event id seen so far, and any new records are pushed to
//! the client. There is no fan-out subscriber registry; a live tail is just
//! `/events/tail` run on an interval, which keeps this module's only new
//! failure mode "the poll loop stalls", not "the broadcast channel backs
//! up". The SSE handler honors `Last-Event-ID` as its resume point, the
//! same header browsers set automatically on reconnect.

use std::convert::Infallible;
use std::time::Duration;

use axum::extract::Path;
use axum::extract::State;
use axum::extract::ws::Message;
use axum::extract::ws::WebSocket;
use axum::extract::ws::WebSocketUpgrade;
use axum::http::HeaderMap;
use axum::response::Response;
use axum::response::sse::Event;
use axum::response::sse::Sse;
use substrate_core::EventStream;
use substrate_core::ResourceKind;
use substrate_gate::GateAction;
use tokio_stream::wrappers::ReceiverStream;

use crate::error::ApiError;
use crate::handlers::support::resolve_and_gate;
use crate::handlers::support::scoped_key;
use crate::state::AppState;

const POLL_INTERVAL: Duration = Duration::from_millis(500);
const TAIL_LIMIT: usize = 100;

fn action(name: &str) -> GateAction {
    GateAction {
        name: name.to_owned(),
        resource_kind: Some(ResourceKind::EventStream),
        backend_type: Some("sqlite".to_owned()),
        ..GateAction::default()
    }
}

/// Handles `GET /sse/stream/{stream_id}`, resuming from `Last-Event-ID` when
/// present.
///
/// # Errors
///
/// Returns [`ApiError`] when context resolution or gating fails.
pub async fn sse(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(stream_id): Path<String>,
) -> Result<Sse<ReceiverStream<Result<Event, Infallible>>>, ApiError> {
    let ctx = resolve_and_gate(&state, &headers, &action("stream.sse"))?;
    let stream_key = scoped_key(&ctx, &stream_id);
    let mut cursor = headers.get("last-event-id").and_then(|value| value.to_str().ok()).map(str::to_owned);

    let (tx, rx) = tokio::sync::mpsc::channel::<Result<Event, Infallible>>(32);
    tokio::spawn(async move {
        loop {
            let records = match state.store.list_after(&stream_key, cursor.as_deref(), TAIL_LIMIT) {
                Ok(records) => records,
                Err(err) => {
                    let event = Event::default().event("error").data(err.to_string());
                    if tx.send(Ok(event)).await.is_err() {
                        return;
                    }
                    tokio::time::sleep(POLL_INTERVAL).await;
                    continue;
                }
            };

            for record in records {
                let Some(event_id) = record.envelope.event_id.as_ref().map(ToString::to_string) else {
                    continue;
                };
                let payload = serde_json::to_string(&record).unwrap_or_else(|_| "{}".to_owned());
                let event = Event::default().id(event_id.clone()).data(payload);
                if tx.send(Ok(event)).await.is_err() {
                    return;
                }
                cursor = Some(event_id);
            }

            tokio::time::sleep(POLL_INTERVAL).await;
        }
    });

    Ok(Sse::new(ReceiverStream::new(rx)))
}

/// Handles `GET /ws/stream/{stream_id}`.
///
/// # Errors
///
/// Returns [`ApiError`] when context resolution or gating fails.
pub async fn ws(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(stream_id): Path<String>,
    upgrade: WebSocketUpgrade,
) -> Result<Response, ApiError> {
    let ctx = resolve_and_gate(&state, &headers, &action("stream.ws"))?;
    let stream_key = scoped_key(&ctx, &stream_id);
    Ok(upgrade.on_upgrade(move |socket| tail_socket(socket, state, stream_key)))
}

async fn tail_socket(mut socket: WebSocket, state: AppState, stream_key: String) {
    let mut cursor: Option<String> = None;
    loop {
        let records = match state.store.list_after(&stream_key, cursor.as_deref(), TAIL_LIMIT) {
            Ok(records) => records,
            Err(err) => {
                let _ = socket.send(Message::Text(err.to_string().into())).await;
                tokio::time::sleep(POLL_INTERVAL).await;
                continue;
            }
        };

        for record in &records {
            let Some(event_id) = record.envelope.event_id.as_ref().map(ToString::to_string) else {
                continue;
            };
            let payload = serde_json::to_string(record).unwrap_or_else(|_| "{}".to_owned());
            if socket.send(Message::Text(payload.into())).await.is_err() {
                return;
            }
            cursor = Some(event_id);
        }

        tokio::select! {
            () = tokio::time::sleep(POLL_INTERVAL) => {}
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(Message::Close(_))) | None => return,
                    Some(Err(_)) => return,
                    _ => {}
                }
            }
        }
    }
}
