//! WebSocket notification stream

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};
use uuid::Uuid;

use crate::protocol::Publication;
use crate::web::server::AppState;

pub async fn events(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let rx = state.publisher.subscribe();
    ws.on_upgrade(move |socket| subscriber_session(socket, rx))
}

/// Forward publications until either side goes away
async fn subscriber_session(socket: WebSocket, mut rx: broadcast::Receiver<Publication>) {
    let session = Uuid::new_v4();
    tracing::info!("Subscriber {} connected", session);

    let (mut sink, mut stream) = socket.split();

    loop {
        tokio::select! {
            publication = rx.recv() => match publication {
                Ok(publication) => {
                    if sink.send(Message::Text(publication.to_text())).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(missed)) => {
                    tracing::warn!("Subscriber {} missed {} notifications", session, missed);
                }
                Err(RecvError::Closed) => break,
            },
            incoming = stream.next() => match incoming {
                Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                // Subscribers are passive; anything they send is ignored
                Some(Ok(_)) => {}
            },
        }
    }

    tracing::info!("Subscriber {} disconnected", session);
}
