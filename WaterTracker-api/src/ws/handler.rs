use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use chrono::Utc;
use futures::{SinkExt, StreamExt};
use serde::de::DeserializeOwned;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use water_tracker_domain::auth::logging::{log_auth_event, AuthEvent, AuthEventType};
use water_tracker_domain::auth::{token, TokenType};
use water_tracker_domain::entities::realtime::{chat_channel, RealtimeEvent};
use water_tracker_domain::services::UserServiceTrait;

use crate::api::state::AppState;
use crate::ws::manager::{ConnectionManager, WsSender};
use crate::ws::messages::{
    event_text, AuthenticatePayload, ChatPayload, ClientMessage, ServerMessage, SubscriptionPayload, AUTHENTICATE,
    CLOSE_AUTH_FAILED, SEND_MESSAGE, SUBSCRIBE, UNSUBSCRIBE,
};

/// Upgrade `GET /ws` to a WebSocket
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    let context = WsContext {
        connections: state.connections.clone(),
        users: state.services.users.clone(),
    };
    ws.on_upgrade(move |socket| handle_socket(socket, context))
}

/// What a session needs from the rest of the application
#[derive(Clone)]
pub struct WsContext {
    pub connections: Arc<ConnectionManager>,
    pub users: Arc<dyn UserServiceTrait + Send + Sync>,
}

/// Frame the session wants written back to its own socket
#[derive(Debug, Clone, PartialEq)]
pub enum Outgoing {
    Text(String),
    Close { code: u16, reason: String },
}

impl Outgoing {
    fn reply(message: ServerMessage, request_id: Option<&str>) -> Self {
        Outgoing::Text(message.to_text(request_id))
    }

    fn into_message(self) -> Message {
        match self {
            Outgoing::Text(text) => Message::Text(text),
            Outgoing::Close { code, reason } => Message::Close(Some(CloseFrame { code, reason: reason.into() })),
        }
    }
}

#[derive(Debug, Clone)]
struct SessionUser {
    id: String,
    username: String,
}

/// Protocol state of one socket
pub struct Session {
    conn_id: String,
    sender: WsSender,
    user: Option<SessionUser>,
}

fn parse_payload<T: DeserializeOwned>(message: &ClientMessage) -> Result<T, String> {
    serde_json::from_value(message.payload.clone()).map_err(|e| e.to_string())
}

/// Who may subscribe to what
pub fn authorize_channel(user_id: &str, channel: &str) -> Result<(), String> {
    let parts: Vec<&str> = channel.split(':').collect();
    match parts.as_slice() {
        ["general"] => Ok(()),
        ["user", owner, "notifications"] if !owner.is_empty() => {
            if *owner == user_id {
                Ok(())
            } else {
                Err("You can only subscribe to your own notifications.".to_string())
            }
        }
        ["leaderboard", id] | ["chat", id] if !id.is_empty() => Ok(()),
        _ => Err(format!("Unknown channel: {}", channel)),
    }
}

impl Session {
    pub fn new(conn_id: String, sender: WsSender) -> Self {
        Self { conn_id, sender, user: None }
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user.as_ref().map(|user| user.id.as_str())
    }

    /// Handle one text frame and return the replies for this socket
    pub async fn handle_text(&mut self, context: &WsContext, text: &str) -> Vec<Outgoing> {
        let message: ClientMessage = match serde_json::from_str(text) {
            Ok(message) => message,
            Err(e) => {
                debug!(conn_id = %self.conn_id, "Unparseable frame: {}", e);
                return vec![Outgoing::reply(ServerMessage::error("Invalid message format."), None)];
            }
        };
        let request_id = message.request_id.clone();
        let request_id = request_id.as_deref();

        if message.message_type == AUTHENTICATE {
            return self.authenticate(context, &message, request_id).await;
        }

        let Some(user) = self.user.clone() else {
            return vec![Outgoing::reply(ServerMessage::error("Authentication required."), request_id)];
        };

        match message.message_type.as_str() {
            SUBSCRIBE => {
                let payload: SubscriptionPayload = match parse_payload(&message) {
                    Ok(payload) => payload,
                    Err(e) => {
                        return vec![Outgoing::reply(
                            ServerMessage::error(format!("Invalid subscription payload: {}", e)),
                            request_id,
                        )]
                    }
                };
                let status = match authorize_channel(&user.id, &payload.channel) {
                    Ok(()) => {
                        let success = context.connections.subscribe(&user.id, &payload.channel).await;
                        ServerMessage::SubscriptionStatus {
                            channel: payload.channel,
                            success,
                            error: (!success).then(|| "Not connected.".to_string()),
                        }
                    }
                    Err(reason) => {
                        warn!(user_id = %user.id, channel = %payload.channel, "Subscription refused: {}", reason);
                        ServerMessage::SubscriptionStatus { channel: payload.channel, success: false, error: Some(reason) }
                    }
                };
                vec![Outgoing::reply(status, request_id)]
            }
            UNSUBSCRIBE => {
                let payload: SubscriptionPayload = match parse_payload(&message) {
                    Ok(payload) => payload,
                    Err(e) => {
                        return vec![Outgoing::reply(
                            ServerMessage::error(format!("Invalid subscription payload: {}", e)),
                            request_id,
                        )]
                    }
                };
                context.connections.unsubscribe(&user.id, &payload.channel).await;
                vec![Outgoing::reply(
                    ServerMessage::SubscriptionStatus { channel: payload.channel, success: true, error: None },
                    request_id,
                )]
            }
            SEND_MESSAGE => {
                let payload: ChatPayload = match parse_payload(&message) {
                    Ok(payload) => payload,
                    Err(e) => {
                        return vec![Outgoing::reply(
                            ServerMessage::error(format!("Invalid chat payload: {}", e)),
                            request_id,
                        )]
                    }
                };
                if payload.text.trim().is_empty() {
                    return vec![Outgoing::reply(ServerMessage::error("Message text cannot be empty."), request_id)];
                }
                let channel = chat_channel(&payload.room_id);
                let event = RealtimeEvent::ChatMessage {
                    room_id: payload.room_id,
                    sender_id: user.id.clone(),
                    sender_username: user.username.clone(),
                    text: payload.text,
                    timestamp: Utc::now(),
                };
                let reached = context.connections.broadcast_text(&channel, &event_text(&event)).await;
                debug!(user_id = %user.id, channel = %channel, reached, "Chat message broadcast");
                Vec::new()
            }
            other => vec![Outgoing::reply(ServerMessage::error(format!("Unknown message type: {}", other)), request_id)],
        }
    }

    async fn authenticate(&mut self, context: &WsContext, message: &ClientMessage, request_id: Option<&str>) -> Vec<Outgoing> {
        if self.user.is_some() {
            return vec![Outgoing::reply(ServerMessage::error("Already authenticated."), request_id)];
        }

        match self.resolve_user(context, message).await {
            Ok(user) => {
                context.connections.connect(&user.id, &self.conn_id, self.sender.clone()).await;
                log_auth_event(
                    AuthEvent::new(AuthEventType::WebSocketAuthentication, Some(&user.id), true)
                        .with_resource("/ws")
                        .with_auth_method("websocket"),
                );
                let status = ServerMessage::AuthenticationStatus { success: true, user_id: Some(user.id.clone()), error: None };
                self.user = Some(user);
                vec![Outgoing::reply(status, request_id)]
            }
            Err(reason) => {
                log_auth_event(
                    AuthEvent::new(AuthEventType::WebSocketAuthentication, None, false)
                        .with_details(reason.clone())
                        .with_resource("/ws")
                        .with_auth_method("websocket"),
                );
                vec![
                    Outgoing::reply(
                        ServerMessage::AuthenticationStatus { success: false, user_id: None, error: Some(reason) },
                        request_id,
                    ),
                    Outgoing::Close { code: CLOSE_AUTH_FAILED, reason: "Authentication failed".to_string() },
                ]
            }
        }
    }

    async fn resolve_user(&self, context: &WsContext, message: &ClientMessage) -> Result<SessionUser, String> {
        let payload: AuthenticatePayload = parse_payload(message)?;
        let claims = token::validate_token_of_type(&payload.token, TokenType::Access).map_err(|e| e.to_string())?;
        let user = context.users.get_user(&claims.sub).await.map_err(|_| "Unknown user".to_string())?;
        if !user.is_active {
            return Err("Account is inactive".to_string());
        }
        Ok(SessionUser { id: user.id, username: user.username })
    }

    /// Forget this socket in the connection registry
    pub async fn close(&self, context: &WsContext) {
        if let Some(user_id) = self.user_id() {
            context.connections.disconnect(user_id, &self.conn_id).await;
        }
    }
}

async fn handle_socket(socket: WebSocket, context: WsContext) {
    let conn_id = uuid::Uuid::new_v4().to_string();
    info!(conn_id = %conn_id, "WebSocket connected");

    let (tx, mut rx) = mpsc::unbounded_channel::<Message>();
    let (mut sink, mut stream) = socket.split();

    let sender_conn_id = conn_id.clone();
    let send_task = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            let closing = matches!(message, Message::Close(_));
            if sink.send(message).await.is_err() {
                debug!(conn_id = %sender_conn_id, "WebSocket sink closed");
                break;
            }
            if closing {
                break;
            }
        }
    });

    let mut session = Session::new(conn_id.clone(), tx.clone());
    let _ = tx.send(Outgoing::reply(ServerMessage::system("Connected. Send an authenticate message to continue."), None).into_message());

    'receive: while let Some(result) = stream.next().await {
        let replies = match result {
            Ok(Message::Text(text)) => session.handle_text(&context, &text).await,
            Ok(Message::Binary(_)) => vec![Outgoing::reply(ServerMessage::error("Invalid message format."), None)],
            Ok(Message::Close(_)) => break,
            Ok(_) => Vec::new(),
            Err(e) => {
                debug!(conn_id = %conn_id, error = %e, "WebSocket receive error");
                break;
            }
        };

        for reply in replies {
            let closing = matches!(reply, Outgoing::Close { .. });
            if tx.send(reply.into_message()).is_err() || closing {
                break 'receive;
            }
        }
    }

    session.close(&context).await;
    drop(session);
    drop(tx);
    if tokio::time::timeout(Duration::from_secs(5), send_task).await.is_err() {
        debug!(conn_id = %conn_id, "WebSocket sender did not finish in time");
    }
    info!(conn_id = %conn_id, "WebSocket disconnected");
}
