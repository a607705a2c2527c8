// Real-time notifications pushed to WebSocket clients

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::{Sink, SinkExt, StreamExt};
use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RealtimeEvent {
    Connected {
        session_id: String,
    },
    RecipeCreated {
        recipe_id: i64,
        title: String,
        user_id: String,
    },
    RecipeUpdated {
        recipe_id: i64,
    },
    RecipeDeleted {
        recipe_id: i64,
    },
    RecipeLiked {
        recipe_id: i64,
        user_id: String,
        liked: bool,
        likes_count: i64,
    },
}

struct Inner {
    events: broadcast::Sender<RealtimeEvent>,
    shutdown: watch::Sender<bool>,
    connections: AtomicUsize,
}

/// Fan-out hub shared by every request handler that emits events
#[derive(Clone)]
pub struct Realtime {
    inner: Arc<Inner>,
}

impl Realtime {
    pub fn new(capacity: usize) -> Self {
        let (events, _) = broadcast::channel(capacity.max(1));
        let (shutdown, _) = watch::channel(false);

        Self {
            inner: Arc::new(Inner {
                events,
                shutdown,
                connections: AtomicUsize::new(0),
            }),
        }
    }

    /// Send an event to every connected client. Returns how many receivers got it.
    pub fn publish(&self, event: RealtimeEvent) -> usize {
        if self.is_shut_down() {
            return 0;
        }

        match self.inner.events.send(event) {
            Ok(receivers) => receivers,
            // No one is listening; not an error
            Err(_) => 0,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RealtimeEvent> {
        self.inner.events.subscribe()
    }

    pub fn connections(&self) -> usize {
        self.inner.connections.load(Ordering::Relaxed)
    }

    /// Close every client session and stop accepting events
    pub fn shutdown(&self) {
        if !self.inner.shutdown.send_replace(true) {
            info!(
                "Realtime hub shutting down ({} open connections)",
                self.connections()
            );
        }
    }

    pub fn is_shut_down(&self) -> bool {
        *self.inner.shutdown.borrow()
    }
}

/// GET /ws - Upgrade to a WebSocket that receives every published event
pub async fn ws_handler(ws: WebSocketUpgrade, State(realtime): State<Realtime>) -> Response {
    ws.on_upgrade(move |socket| client_session(socket, realtime))
}

async fn client_session(socket: WebSocket, realtime: Realtime) {
    let session_id = Uuid::new_v4().to_string();
    let mut events = realtime.subscribe();
    let mut shutdown = realtime.inner.shutdown.subscribe();
    let (mut sender, mut receiver) = socket.split();

    realtime.inner.connections.fetch_add(1, Ordering::Relaxed);
    debug!("Realtime session {} connected", session_id);

    let greeting = RealtimeEvent::Connected {
        session_id: session_id.clone(),
    };
    let greeted = send_event(&mut sender, &greeting).await;
    let mut open = greeted && !*shutdown.borrow();

    while open {
        tokio::select! {
            event = events.recv() => match event {
                Ok(event) => open = send_event(&mut sender, &event).await,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("Realtime session {} lagged, {} events dropped", session_id, skipped);
                }
                Err(broadcast::error::RecvError::Closed) => open = false,
            },
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Close(_))) | None | Some(Err(_)) => open = false,
                Some(Ok(_)) => {}
            },
            _ = shutdown.changed() => open = false,
        }
    }

    let _ = sender.send(Message::Close(None)).await;
    realtime.inner.connections.fetch_sub(1, Ordering::Relaxed);
    debug!("Realtime session {} closed", session_id);
}

async fn send_event<S>(sender: &mut S, event: &RealtimeEvent) -> bool
where
    S: Sink<Message> + Unpin,
{
    match serde_json::to_string(event) {
        Ok(text) => sender.send(Message::Text(text)).await.is_ok(),
        Err(e) => {
            warn!("Failed to serialize realtime event: {}", e);
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_reaches_subscribers() {
        let realtime = Realtime::new(8);
        assert_eq!(realtime.publish(RealtimeEvent::RecipeDeleted { recipe_id: 1 }), 0);

        let mut rx = realtime.subscribe();
        let delivered = realtime.publish(RealtimeEvent::RecipeUpdated { recipe_id: 2 });
        assert_eq!(delivered, 1);
        assert_eq!(
            rx.recv().await.unwrap(),
            RealtimeEvent::RecipeUpdated { recipe_id: 2 }
        );
    }

    #[tokio::test]
    async fn test_shutdown_stops_publishing() {
        let realtime = Realtime::new(8);
        let _rx = realtime.subscribe();

        realtime.shutdown();
        realtime.shutdown();

        assert!(realtime.is_shut_down());
        assert_eq!(realtime.publish(RealtimeEvent::RecipeUpdated { recipe_id: 1 }), 0);
    }

    #[test]
    fn test_event_wire_format() {
        let event = RealtimeEvent::RecipeLiked {
            recipe_id: 3,
            user_id: "u".to_string(),
            liked: true,
            likes_count: 4,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "recipe_liked");
        assert_eq!(json["likes_count"], 4);
    }
}
