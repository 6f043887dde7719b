use axum::{
    extract::{Path, Query, State},
    middleware,
    response::Json,
    routing::{get, post, put},
    Router,
};
use axum_extra::extract::WithRejection;
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::{admin_only_middleware, jwt_auth_middleware, AuthService, UserSession};
use crate::errors::ServiceError;
use crate::models::{
    AdminStats, AdminUserQuery, Booking, BookingQuery, Dispute, DisputeQuery, ResolveDisputeRequest,
    SetActiveRequest, TrainerProfile, UserSummary,
};
use crate::services::{AdminService, BookingService, DisputeService, TrainerProfileService};

#[derive(Clone)]
pub struct AdminAppState {
    pub admin_service: AdminService,
    pub booking_service: BookingService,
    pub dispute_service: DisputeService,
    pub trainer_profile_service: TrainerProfileService,
}

#[derive(Debug, Deserialize)]
pub struct SetVerifiedRequest {
    pub is_verified: bool,
}

/// Back-office routes, admin role only
pub fn admin_routes(state: AdminAppState, auth_service: AuthService) -> Router {
    Router::new()
        .route("/stats", get(get_stats))
        .route("/users", get(list_users))
        .route("/users/:user_id/active", put(set_user_active))
        .route("/trainers/:trainer_id/verified", put(set_trainer_verified))
        .route("/bookings", get(list_bookings))
        .route("/disputes", get(list_disputes))
        .route("/disputes/:dispute_id/review", post(start_dispute_review))
        .route("/disputes/:dispute_id/resolve", post(resolve_dispute))
        .route_layer(middleware::from_fn(admin_only_middleware))
        .route_layer(middleware::from_fn_with_state(auth_service, jwt_auth_middleware))
        .with_state(state)
}

#[tracing::instrument(skip(state))]
pub async fn get_stats(State(state): State<AdminAppState>) -> Result<Json<AdminStats>, ServiceError> {
    let stats = state.admin_service.stats().await?;
    Ok(Json(stats))
}

pub async fn list_users(
    State(state): State<AdminAppState>,
    Query(query): Query<AdminUserQuery>,
) -> Result<Json<Vec<UserSummary>>, ServiceError> {
    let users = state.admin_service.list_users(&query).await?;
    Ok(Json(users))
}

#[tracing::instrument(skip(state, session, request), fields(admin_id = %session.user_id))]
pub async fn set_user_active(
    State(state): State<AdminAppState>,
    session: UserSession,
    Path(user_id): Path<Uuid>,
    WithRejection(Json(request), _): WithRejection<Json<SetActiveRequest>, ServiceError>,
) -> Result<Json<UserSummary>, ServiceError> {
    let user = state
        .admin_service
        .set_user_active(session.user_id, user_id, request.is_active)
        .await?;
    Ok(Json(user))
}

#[tracing::instrument(skip(state, request))]
pub async fn set_trainer_verified(
    State(state): State<AdminAppState>,
    Path(trainer_id): Path<Uuid>,
    WithRejection(Json(request), _): WithRejection<Json<SetVerifiedRequest>, ServiceError>,
) -> Result<Json<TrainerProfile>, ServiceError> {
    let profile = state
        .trainer_profile_service
        .set_verified(trainer_id, request.is_verified)
        .await?;
    Ok(Json(profile))
}

pub async fn list_bookings(
    State(state): State<AdminAppState>,
    session: UserSession,
    Query(query): Query<BookingQuery>,
) -> Result<Json<Vec<Booking>>, ServiceError> {
    let bookings = state.booking_service.list(&session, &query).await?;
    Ok(Json(bookings))
}

pub async fn list_disputes(
    State(state): State<AdminAppState>,
    Query(query): Query<DisputeQuery>,
) -> Result<Json<Vec<Dispute>>, ServiceError> {
    let disputes = state.dispute_service.list(&query).await?;
    Ok(Json(disputes))
}

#[tracing::instrument(skip(state))]
pub async fn start_dispute_review(
    State(state): State<AdminAppState>,
    Path(dispute_id): Path<Uuid>,
) -> Result<Json<Dispute>, ServiceError> {
    let dispute = state.dispute_service.start_review(dispute_id).await?;
    Ok(Json(dispute))
}

#[tracing::instrument(skip(state, session, request), fields(admin_id = %session.user_id))]
pub async fn resolve_dispute(
    State(state): State<AdminAppState>,
    session: UserSession,
    Path(dispute_id): Path<Uuid>,
    WithRejection(Json(request), _): WithRejection<Json<ResolveDisputeRequest>, ServiceError>,
) -> Result<Json<Dispute>, ServiceError> {
    let dispute = state
        .dispute_service
        .resolve(session.user_id, dispute_id, request)
        .await?;
    Ok(Json(dispute))
}
