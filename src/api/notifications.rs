use axum::{
    extract::{Path, Query, State},
    middleware,
    response::Json,
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::auth::{jwt_auth_middleware, AuthService, UserSession};
use crate::errors::ServiceError;
use crate::models::{Notification, NotificationListResponse, NotificationQuery};
use crate::services::NotificationService;

pub fn notification_routes(notification_service: NotificationService, auth_service: AuthService) -> Router {
    Router::new()
        .route("/", get(list_notifications))
        .route("/read-all", post(mark_all_read))
        .route("/:notification_id/read", post(mark_read))
        .route_layer(middleware::from_fn_with_state(auth_service, jwt_auth_middleware))
        .with_state(notification_service)
}

pub async fn list_notifications(
    State(service): State<NotificationService>,
    session: UserSession,
    Query(query): Query<NotificationQuery>,
) -> Result<Json<NotificationListResponse>, ServiceError> {
    let response = service.list_for_user(session.user_id, &query).await?;
    Ok(Json(response))
}

pub async fn mark_read(
    State(service): State<NotificationService>,
    session: UserSession,
    Path(notification_id): Path<Uuid>,
) -> Result<Json<Notification>, ServiceError> {
    let notification = service.mark_read(session.user_id, notification_id).await?;
    Ok(Json(notification))
}

#[tracing::instrument(skip(service, session), fields(user_id = %session.user_id))]
pub async fn mark_all_read(
    State(service): State<NotificationService>,
    session: UserSession,
) -> Result<Json<Value>, ServiceError> {
    let updated = service.mark_all_read(session.user_id).await?;
    Ok(Json(json!({ "marked_read": updated })))
}
