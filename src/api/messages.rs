use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    response::{
        sse::{Event, KeepAlive, Sse},
        Json,
    },
    routing::{get, post},
    Router,
};
use axum_extra::extract::WithRejection;
use futures::stream::{self, Stream};
use serde_json::{json, Value};
use std::convert::Infallible;
use tokio::sync::broadcast::error::RecvError;
use uuid::Uuid;

use crate::auth::{jwt_auth_middleware, AuthService, UserSession};
use crate::errors::ServiceError;
use crate::models::{ConversationSummary, Message, MessageFeed, PaginationQuery, SendMessageRequest};
use crate::services::MessageService;

#[derive(Clone)]
pub struct MessagesAppState {
    pub message_service: MessageService,
}

pub fn message_routes(state: MessagesAppState, auth_service: AuthService) -> Router {
    Router::new()
        .route("/", post(send_message))
        .route("/conversations", get(list_conversations))
        .route("/with/:user_id", get(get_conversation))
        .route("/with/:user_id/read", post(mark_conversation_read))
        .route("/stream", get(stream_messages))
        .route_layer(middleware::from_fn_with_state(auth_service, jwt_auth_middleware))
        .with_state(state)
}

#[tracing::instrument(skip(state, session, request), fields(user_id = %session.user_id))]
pub async fn send_message(
    State(state): State<MessagesAppState>,
    session: UserSession,
    WithRejection(Json(request), _): WithRejection<Json<SendMessageRequest>, ServiceError>,
) -> Result<(StatusCode, Json<Message>), ServiceError> {
    let message = state.message_service.send(session.user_id, request).await?;
    Ok((StatusCode::CREATED, Json(message)))
}

pub async fn list_conversations(
    State(state): State<MessagesAppState>,
    session: UserSession,
) -> Result<Json<Vec<ConversationSummary>>, ServiceError> {
    let conversations = state.message_service.conversations(session.user_id).await?;
    Ok(Json(conversations))
}

pub async fn get_conversation(
    State(state): State<MessagesAppState>,
    session: UserSession,
    Path(counterpart_id): Path<Uuid>,
    Query(page): Query<PaginationQuery>,
) -> Result<Json<Vec<Message>>, ServiceError> {
    let messages = state
        .message_service
        .conversation(session.user_id, counterpart_id, &page)
        .await?;
    Ok(Json(messages))
}

pub async fn mark_conversation_read(
    State(state): State<MessagesAppState>,
    session: UserSession,
    Path(counterpart_id): Path<Uuid>,
) -> Result<Json<Value>, ServiceError> {
    let updated = state
        .message_service
        .mark_conversation_read(session.user_id, counterpart_id)
        .await?;
    Ok(Json(json!({ "marked_read": updated })))
}

/// Server-sent events carrying every new message the caller sends or receives
#[tracing::instrument(skip(state, session), fields(user_id = %session.user_id))]
pub async fn stream_messages(
    State(state): State<MessagesAppState>,
    session: UserSession,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let receiver = state.message_service.hub().subscribe();
    let feed = MessageFeed::new(session.user_id);
    let user_id = session.user_id;

    tracing::debug!("message stream opened");

    let events = stream::unfold((receiver, feed), move |(mut receiver, mut feed)| async move {
        loop {
            match receiver.recv().await {
                Ok(message) => {
                    if !feed.accept(&message) {
                        continue;
                    }
                    match Event::default()
                        .event("message")
                        .id(message.id.to_string())
                        .json_data(&message)
                    {
                        Ok(event) => return Some((Ok(event), (receiver, feed))),
                        Err(e) => tracing::warn!(message_id = %message.id, "failed to encode message event: {}", e),
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(user_id = %user_id, skipped, "message stream lagged, skipping ahead");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    });

    Sse::new(events).keep_alive(KeepAlive::default())
}
