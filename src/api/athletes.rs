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

use crate::auth::{athlete_only_middleware, jwt_auth_middleware, AuthService, UserSession};
use crate::errors::ServiceError;
use crate::models::{
    AthleteDashboard, AthleteProfile, CreateSubAccount, SubAccount, UpdateSubAccount, UpsertAthleteProfile,
};
use crate::services::{AthleteProfileService, DashboardService};

#[derive(Clone)]
pub struct AthletesAppState {
    pub athlete_profile_service: AthleteProfileService,
    pub dashboard_service: DashboardService,
}

pub fn athlete_routes(state: AthletesAppState, auth_service: AuthService) -> Router {
    Router::new()
        .route("/me/profile", get(get_own_profile).put(upsert_own_profile))
        .route("/me/dashboard", get(get_dashboard))
        .route("/me/sub-accounts", get(list_sub_accounts).post(create_sub_account))
        .route(
            "/me/sub-accounts/:sub_account_id",
            put(update_sub_account).delete(delete_sub_account),
        )
        .route_layer(middleware::from_fn(athlete_only_middleware))
        .route_layer(middleware::from_fn_with_state(auth_service, jwt_auth_middleware))
        .with_state(state)
}

#[tracing::instrument(skip(state, session), fields(user_id = %session.user_id))]
pub async fn get_own_profile(
    State(state): State<AthletesAppState>,
    session: UserSession,
) -> Result<Json<AthleteProfile>, ServiceError> {
    state
        .athlete_profile_service
        .get_by_user_id(session.user_id)
        .await?
        .map(Json)
        .ok_or(ServiceError::NotFound("Athlete profile"))
}

#[tracing::instrument(skip(state, session, request), fields(user_id = %session.user_id))]
pub async fn upsert_own_profile(
    State(state): State<AthletesAppState>,
    session: UserSession,
    WithRejection(Json(request), _): WithRejection<Json<UpsertAthleteProfile>, ServiceError>,
) -> Result<Json<AthleteProfile>, ServiceError> {
    let profile = state.athlete_profile_service.upsert(session.user_id, request).await?;
    Ok(Json(profile))
}

#[tracing::instrument(skip(state, session), fields(user_id = %session.user_id))]
pub async fn get_dashboard(
    State(state): State<AthletesAppState>,
    session: UserSession,
) -> Result<Json<AthleteDashboard>, ServiceError> {
    let dashboard = state.dashboard_service.athlete_dashboard(session.user_id).await?;
    Ok(Json(dashboard))
}

pub async fn list_sub_accounts(
    State(state): State<AthletesAppState>,
    session: UserSession,
) -> Result<Json<Vec<SubAccount>>, ServiceError> {
    let accounts = state.athlete_profile_service.list_sub_accounts(session.user_id).await?;
    Ok(Json(accounts))
}

#[tracing::instrument(skip(state, session, request), fields(user_id = %session.user_id))]
pub async fn create_sub_account(
    State(state): State<AthletesAppState>,
    session: UserSession,
    WithRejection(Json(request), _): WithRejection<Json<CreateSubAccount>, ServiceError>,
) -> Result<(StatusCode, Json<SubAccount>), ServiceError> {
    let account = state
        .athlete_profile_service
        .create_sub_account(session.user_id, request)
        .await?;
    Ok((StatusCode::CREATED, Json(account)))
}

#[tracing::instrument(skip(state, session, request), fields(user_id = %session.user_id))]
pub async fn update_sub_account(
    State(state): State<AthletesAppState>,
    session: UserSession,
    Path(sub_account_id): Path<Uuid>,
    WithRejection(Json(request), _): WithRejection<Json<UpdateSubAccount>, ServiceError>,
) -> Result<Json<SubAccount>, ServiceError> {
    let account = state
        .athlete_profile_service
        .update_sub_account(session.user_id, sub_account_id, request)
        .await?;
    Ok(Json(account))
}

#[tracing::instrument(skip(state, session), fields(user_id = %session.user_id))]
pub async fn delete_sub_account(
    State(state): State<AthletesAppState>,
    session: UserSession,
    Path(sub_account_id): Path<Uuid>,
) -> Result<StatusCode, ServiceError> {
    state
        .athlete_profile_service
        .delete_sub_account(session.user_id, sub_account_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
