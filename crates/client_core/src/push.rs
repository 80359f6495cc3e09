//! Server push intake: patch sets the server broadcasts to every client.

use std::sync::Arc;

use anyhow::{Context, Result};
use futures::StreamExt;
use shared::protocol::PushEvent;
use store::ReactiveStore;
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, warn};

/// Decodes one push frame and applies its patches; returns how many there were.
pub fn apply_push_message(store: &ReactiveStore, raw: &str) -> Result<usize, serde_json::Error> {
    let event: PushEvent = serde_json::from_str(raw)?;
    store.apply(&event.onyx_data);
    Ok(event.onyx_data.len())
}

/// Connects to `ws_url` and applies every text frame until the socket closes.
/// Frames that fail to decode are logged and skipped.
pub async fn spawn_push_listener(
    ws_url: &str,
    store: Arc<ReactiveStore>,
) -> Result<JoinHandle<()>> {
    let (ws_stream, _) = connect_async(ws_url)
        .await
        .with_context(|| format!("failed to connect push websocket: {ws_url}"))?;
    let (_, mut ws_reader) = ws_stream.split();
    info!(url = ws_url, "push: connected");

    Ok(tokio::spawn(async move {
        while let Some(msg) = ws_reader.next().await {
            match msg {
                Ok(Message::Text(text)) => match apply_push_message(&store, &text) {
                    Ok(patches) => debug!(patches, "push: applied"),
                    Err(err) => warn!("push: dropping undecodable frame: {err}"),
                },
                Ok(Message::Close(_)) => break,
                Ok(_) => {}
                Err(err) => {
                    warn!("push: websocket error: {err}");
                    break;
                }
            }
        }
        info!("push: listener stopped");
    }))
}
