//! Realtime session dispatcher.
//!
//! Each connection gets its own task; each inbound event gets its own
//! handler task, so a slow analyzer or model call blocks only the request
//! that issued it. Handlers are stateless request/response: every known
//! inbound event produces exactly one outbound event, broadcast to all
//! connected clients through [`EventBroadcaster`].

use std::sync::Arc;

use anyhow::Result;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::Value;
use tandem_analysis::{CheckerRegistry, run_checks};
use tandem_providers::ChatClient;
use tandem_types::Language;
use tandem_types::events::{AutopilotPayload, CheckPayload, FixPayload, OutboundEvent};
use tokio::net::TcpListener;
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

use crate::broadcast::EventBroadcaster;

/// Explicitly constructed service state shared by every handler.
///
/// Holding the external collaborators here (instead of globals) lets tests
/// substitute the chat endpoint and the analyzer registry per instance.
pub struct SessionContext {
    pub registry: CheckerRegistry,
    pub chat: ChatClient,
    pub broadcaster: EventBroadcaster,
}

/// Inbound event envelope: `{"event": <name>, "data": {...}}`.
#[derive(Deserialize)]
struct Envelope {
    event: String,
    #[serde(default)]
    data: Value,
}

/// Accept loop. Runs until a shutdown signal arrives.
pub async fn run(ctx: Arc<SessionContext>, addr: &str) -> Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!(addr = %addr, "session dispatcher listening");

    let shutdown = make_shutdown_future();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            biased;

            () = &mut shutdown => {
                info!("shutdown signal received, stopping dispatcher");
                break;
            }

            conn = listener.accept() => {
                let (stream, peer) = match conn {
                    Ok(c) => c,
                    Err(e) => {
                        error!(err = %e, "accept error");
                        continue;
                    }
                };
                debug!(peer = %peer, "new connection");
                let ctx = ctx.clone();
                tokio::spawn(async move {
                    if let Err(e) = handle_connection(stream, ctx).await {
                        warn!(peer = %peer, err = %e, "connection error");
                    }
                });
            }
        }
    }

    Ok(())
}

/// Resolves when a shutdown signal is received: SIGTERM or Ctrl-C on Unix,
/// Ctrl-C elsewhere.
async fn make_shutdown_future() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        let mut sigterm = signal(SignalKind::terminate()).expect("failed to register SIGTERM");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await.ok();
    }
}

async fn handle_connection(
    stream: tokio::net::TcpStream,
    ctx: Arc<SessionContext>,
) -> Result<()> {
    let ws = accept_async(stream).await?;
    let (mut sink, mut stream) = ws.split();

    let mut broadcast_rx = ctx.broadcaster.subscribe();

    loop {
        tokio::select! {
            // Incoming event from this client: handled on its own task so a
            // hung external tool blocks only that request.
            msg = stream.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let ctx = ctx.clone();
                        tokio::spawn(async move {
                            if let Some(event) = handle_event(&ctx, &text).await {
                                ctx.broadcaster.broadcast(&event);
                            }
                        });
                    }
                    Some(Ok(Message::Ping(data))) => {
                        let _ = sink.send(Message::Pong(data)).await;
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        warn!(err = %e, "ws error");
                        break;
                    }
                    _ => {}
                }
            }
            // Outgoing broadcast event
            event = broadcast_rx.recv() => {
                match event {
                    Ok(json) => {
                        if let Err(e) = sink.send(Message::Text(json)).await {
                            warn!(err = %e, "send error");
                            break;
                        }
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                        warn!(skipped = n, "broadcast lagged");
                    }
                }
            }
        }
    }
    Ok(())
}

/// Route one inbound event to its handler.
///
/// Malformed payloads degrade to default (empty) fields rather than failing
/// the event; unknown event names are logged and dropped. Returns the
/// response event for every known inbound event.
pub async fn handle_event(ctx: &SessionContext, text: &str) -> Option<OutboundEvent> {
    let envelope: Envelope = match serde_json::from_str(text) {
        Ok(envelope) => envelope,
        Err(e) => {
            warn!(err = %e, "unparsable inbound message");
            return None;
        }
    };

    debug!(event = %envelope.event, "dispatching event");

    match envelope.event.as_str() {
        "check_code" => {
            let payload: CheckPayload =
                serde_json::from_value(envelope.data).unwrap_or_default();
            let language = Language::parse(&payload.language);
            let errors = run_checks(&ctx.registry, &payload.code, language).await;
            Some(OutboundEvent::CodeErrors {
                errors,
                code: payload.code,
            })
        }
        "fix_code" => {
            let payload: FixPayload = serde_json::from_value(envelope.data).unwrap_or_default();
            let fix_result = ctx.chat.request_fix(&payload.code, &payload.error).await;
            Some(OutboundEvent::CodeFix {
                error: payload.error,
                fix_result,
            })
        }
        "autopilot_code" => {
            let payload: AutopilotPayload =
                serde_json::from_value(envelope.data).unwrap_or_default();
            let language = Language::parse(&payload.language);
            let result = ctx
                .chat
                .request_generation(&payload.instruction, language, &payload.code)
                .await;
            Some(OutboundEvent::AutopilotResult {
                line: payload.line,
                result,
            })
        }
        other => {
            warn!(event = %other, "unknown event");
            None
        }
    }
}
