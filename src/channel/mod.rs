// src/channel/mod.rs
//
// Persistent WebSocket channel to the management server. One task owns the
// connection and the session state behind it; when the connection drops for
// any reason we clear all sessions and redial after a fixed delay, forever.
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use thiserror::Error;
use tokio::sync::Mutex;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

use crate::models::agent::AgentIdentity;
use crate::models::frames::{decode_frame, Frame};
use crate::session::SessionManager;

const RECONNECT_DELAY: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("websocket error: {0}")]
    Ws(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("frame encoding error: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("binary payload is not valid utf-8: {0}")]
    Binary(#[from] std::string::FromUtf8Error),
}

/// Extract the text of a channel message. Binary messages must hold UTF-8
/// frame text; anything else is a decode failure that ends the connection.
/// Control messages carry no frame and decode to `None`.
fn message_text(message: Message) -> Result<Option<String>, ChannelError> {
    match message {
        Message::Text(text) => Ok(Some(text)),
        Message::Binary(bytes) => Ok(Some(String::from_utf8(bytes)?)),
        _ => Ok(None),
    }
}

pub struct ChannelManager {
    url: String,
    identity: AgentIdentity,
    sessions: Arc<Mutex<SessionManager>>,
}

fn connect_uri(base: &str, agent_id: &str) -> String {
    format!("{}?agentId={}&type=agent", base, agent_id)
}

impl ChannelManager {
    pub fn new(url: String, identity: AgentIdentity, sessions: Arc<Mutex<SessionManager>>) -> Self {
        ChannelManager {
            url,
            identity,
            sessions,
        }
    }

    /// Dial the server and serve frames until the connection dies, then
    /// redial after a fixed delay. Never returns.
    pub async fn run(self) {
        loop {
            info!("connecting to channel at {}", self.url);
            match self.connect_and_serve().await {
                Ok(()) => info!("channel closed by server"),
                Err(e) => warn!("channel lost: {}", e),
            }
            // The server side of every session died with the socket.
            self.sessions.lock().await.clear();
            tokio::time::sleep(RECONNECT_DELAY).await;
        }
    }

    async fn connect_and_serve(&self) -> Result<(), ChannelError> {
        let uri = connect_uri(&self.url, &self.identity.agent_id);
        let (stream, _response) = connect_async(uri).await?;
        let (mut write, mut read) = stream.split();

        let register = Frame::AgentRegister {
            agent_id: self.identity.agent_id.clone(),
        };
        write
            .send(Message::Text(serde_json::to_string(&register)?))
            .await?;
        info!("channel registered as {}", self.identity.agent_id);

        while let Some(message) = read.next().await {
            let message = message?;
            if let Message::Close(_) = message {
                break;
            }
            // Pings and pongs are handled by tungstenite itself.
            let Some(text) = message_text(message)? else {
                continue;
            };

            let frame = match decode_frame(&text) {
                Ok(Some(frame)) => frame,
                Ok(None) => {
                    debug!("ignoring frame with unexpected shape");
                    continue;
                }
                Err(e) => {
                    // Non-JSON traffic means we no longer understand the
                    // peer; drop the connection and start over.
                    error!("undecodable channel payload: {}", e);
                    return Err(ChannelError::Encode(e));
                }
            };

            let reply = self.sessions.lock().await.handle_frame(frame);
            if let Some(reply) = reply {
                write
                    .send(Message::Text(serde_json::to_string(&reply)?))
                    .await?;
            }
        }

        Ok(())
    }
}
