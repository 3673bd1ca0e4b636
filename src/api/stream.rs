//! Live camera stream: JPEG frames in, annotated JPEG frames out.
//!
//! Frames are handled strictly one at a time per connection, so a slow model
//! throttles the client rather than queueing work.

use axum::body::Bytes;
use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::live::FrameAnnotator;

use super::AppState;
use super::dto::ErrorResponse;

pub async fn stream_handler(
    State(state): State<Arc<AppState>>,
    ws: WebSocketUpgrade,
) -> Response {
    let annotator = Arc::clone(&state.annotator);
    ws.on_upgrade(move |socket| run_stream(socket, annotator))
}

async fn run_stream(mut socket: WebSocket, annotator: Arc<FrameAnnotator>) {
    tracing::info!("Live stream opened");
    let mut frames = 0usize;

    while let Some(msg) = socket.recv().await {
        let frame = match msg {
            Ok(Message::Binary(bytes)) => bytes,
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                tracing::debug!("Live stream receive failed: {}", e);
                break;
            }
        };

        let reply = reply_for(process(&annotator, frame).await);
        if socket.send(reply).await.is_err() {
            break;
        }
        frames += 1;
    }

    tracing::info!("Live stream closed after {} frames", frames);
}

async fn process(annotator: &Arc<FrameAnnotator>, frame: Bytes) -> Result<Vec<u8>> {
    let annotator = Arc::clone(annotator);
    tokio::task::spawn_blocking(move || annotator.process_frame(&frame))
        .await
        .map_err(|e| AppError::Inference(format!("frame task failed: {e}")))?
}

/// Annotated frames go back as binary, failures as a JSON text message.
fn reply_for(outcome: Result<Vec<u8>>) -> Message {
    match outcome {
        Ok(jpeg) => Message::Binary(jpeg.into()),
        Err(e) => {
            tracing::debug!("Frame rejected: {}", e);
            let body = ErrorResponse::new(&e.to_string(), e.code());
            let text = serde_json::to_string(&body).unwrap_or_else(|_| e.to_string());
            Message::Text(text.into())
        }
    }
}
