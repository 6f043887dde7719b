use axum::{
    extract::{Path, State},
    http::StatusCode,
    middleware,
    response::Json,
    routing::{get, put},
    Router,
};
use axum_extra::extract::WithRejection;
use uuid::Uuid;

use crate::auth::{jwt_auth_middleware, trainer_only_middleware, AuthService, UserSession};
use crate::errors::ServiceError;
use crate::models::{AvailabilitySlot, CreateAvailabilitySlot, UpdateAvailabilitySlot};
use crate::services::{AvailabilityService, TrainerProfileService};

#[derive(Clone)]
pub struct AvailabilityAppState {
    pub availability_service: AvailabilityService,
    pub trainer_profile_service: TrainerProfileService,
}

impl AvailabilityAppState {
    async fn own_trainer_id(&self, session: &UserSession) -> Result<Uuid, ServiceError> {
        Ok(self.trainer_profile_service.require_for_user(session.user_id).await?.id)
    }
}

/// Trainer-managed weekly slots
pub fn availability_routes(state: AvailabilityAppState, auth_service: AuthService) -> Router {
    Router::new()
        .route("/", get(list_own_slots).post(create_slot))
        .route("/:slot_id", put(update_slot).delete(delete_slot))
        .route_layer(middleware::from_fn(trainer_only_middleware))
        .route_layer(middleware::from_fn_with_state(auth_service, jwt_auth_middleware))
        .with_state(state)
}

pub async fn list_own_slots(
    State(state): State<AvailabilityAppState>,
    session: UserSession,
) -> Result<Json<Vec<AvailabilitySlot>>, ServiceError> {
    let trainer_id = state.own_trainer_id(&session).await?;
    let slots = state.availability_service.list_for_trainer(trainer_id, false).await?;
    Ok(Json(slots))
}

#[tracing::instrument(skip(state, session, request), fields(user_id = %session.user_id))]
pub async fn create_slot(
    State(state): State<AvailabilityAppState>,
    session: UserSession,
    WithRejection(Json(request), _): WithRejection<Json<CreateAvailabilitySlot>, ServiceError>,
) -> Result<(StatusCode, Json<AvailabilitySlot>), ServiceError> {
    let trainer_id = state.own_trainer_id(&session).await?;
    let slot = state.availability_service.create(trainer_id, request).await?;
    Ok((StatusCode::CREATED, Json(slot)))
}

#[tracing::instrument(skip(state, session, request), fields(user_id = %session.user_id))]
pub async fn update_slot(
    State(state): State<AvailabilityAppState>,
    session: UserSession,
    Path(slot_id): Path<Uuid>,
    WithRejection(Json(request), _): WithRejection<Json<UpdateAvailabilitySlot>, ServiceError>,
) -> Result<Json<AvailabilitySlot>, ServiceError> {
    let trainer_id = state.own_trainer_id(&session).await?;
    let slot = state.availability_service.update(trainer_id, slot_id, request).await?;
    Ok(Json(slot))
}

#[tracing::instrument(skip(state, session), fields(user_id = %session.user_id))]
pub async fn delete_slot(
    State(state): State<AvailabilityAppState>,
    session: UserSession,
    Path(slot_id): Path<Uuid>,
) -> Result<StatusCode, ServiceError> {
    let trainer_id = state.own_trainer_id(&session).await?;
    state.availability_service.delete(trainer_id, slot_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
