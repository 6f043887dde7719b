use axum::{
    extract::{Path, Query, State},
    middleware,
    response::Json,
    routing::get,
    Router,
};
use axum_extra::extract::WithRejection;
use uuid::Uuid;

use crate::auth::{jwt_auth_middleware, trainer_only_middleware, AuthService, UserSession};
use crate::errors::ServiceError;
use crate::models::{
    AvailabilitySlot, PaginationQuery, Review, ScoredTrainer, TrainerDashboard, TrainerDetail, TrainerProfile,
    TrainerSearchQuery, UpsertTrainerProfile,
};
use crate::services::{AvailabilityService, DashboardService, MatchingService, ReviewService, TrainerProfileService};

#[derive(Clone)]
pub struct TrainersAppState {
    pub matching_service: MatchingService,
    pub trainer_profile_service: TrainerProfileService,
    pub availability_service: AvailabilityService,
    pub review_service: ReviewService,
    pub dashboard_service: DashboardService,
}

pub fn trainer_routes(state: TrainersAppState, auth_service: AuthService) -> Router {
    let own = Router::new()
        .route("/me/profile", get(get_own_profile).put(upsert_own_profile))
        .route("/me/dashboard", get(get_dashboard))
        .route_layer(middleware::from_fn(trainer_only_middleware))
        .route("/search", get(search_trainers))
        .route_layer(middleware::from_fn_with_state(auth_service, jwt_auth_middleware));

    let public = Router::new()
        .route("/:trainer_id", get(get_trainer))
        .route("/:trainer_id/availability", get(get_trainer_availability))
        .route("/:trainer_id/reviews", get(get_trainer_reviews));

    own.merge(public).with_state(state)
}

/// Ranked trainer search for the signed-in user
#[tracing::instrument(skip(state, session), fields(user_id = %session.user_id))]
pub async fn search_trainers(
    State(state): State<TrainersAppState>,
    session: UserSession,
    Query(query): Query<TrainerSearchQuery>,
) -> Result<Json<Vec<ScoredTrainer>>, ServiceError> {
    let results = state.matching_service.search(Some(session.user_id), &query).await?;
    Ok(Json(results))
}

#[tracing::instrument(skip(state))]
pub async fn get_trainer(
    State(state): State<TrainersAppState>,
    Path(trainer_id): Path<Uuid>,
) -> Result<Json<TrainerDetail>, ServiceError> {
    let detail = state.trainer_profile_service.get_detail(trainer_id).await?;
    Ok(Json(detail))
}

pub async fn get_trainer_availability(
    State(state): State<TrainersAppState>,
    Path(trainer_id): Path<Uuid>,
) -> Result<Json<Vec<AvailabilitySlot>>, ServiceError> {
    let slots = state.availability_service.list_for_trainer(trainer_id, true).await?;
    Ok(Json(slots))
}

pub async fn get_trainer_reviews(
    State(state): State<TrainersAppState>,
    Path(trainer_id): Path<Uuid>,
    Query(page): Query<PaginationQuery>,
) -> Result<Json<Vec<Review>>, ServiceError> {
    let reviews = state.review_service.list_for_trainer(trainer_id, &page).await?;
    Ok(Json(reviews))
}

#[tracing::instrument(skip(state, session), fields(user_id = %session.user_id))]
pub async fn get_own_profile(
    State(state): State<TrainersAppState>,
    session: UserSession,
) -> Result<Json<TrainerProfile>, ServiceError> {
    let profile = state.trainer_profile_service.require_for_user(session.user_id).await?;
    Ok(Json(profile))
}

#[tracing::instrument(skip(state, session, request), fields(user_id = %session.user_id))]
pub async fn upsert_own_profile(
    State(state): State<TrainersAppState>,
    session: UserSession,
    WithRejection(Json(request), _): WithRejection<Json<UpsertTrainerProfile>, ServiceError>,
) -> Result<Json<TrainerProfile>, ServiceError> {
    let profile = state.trainer_profile_service.upsert(session.user_id, request).await?;
    Ok(Json(profile))
}

#[tracing::instrument(skip(state, session), fields(user_id = %session.user_id))]
pub async fn get_dashboard(
    State(state): State<TrainersAppState>,
    session: UserSession,
) -> Result<Json<TrainerDashboard>, ServiceError> {
    let profile = state.trainer_profile_service.require_for_user(session.user_id).await?;
    let dashboard = state.dashboard_service.trainer_dashboard(profile.id).await?;
    Ok(Json(dashboard))
}
