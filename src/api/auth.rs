use axum::{
    extract::{Request, State},
    middleware,
    response::Json,
    routing::{get, post},
    Router,
};
use axum_extra::extract::WithRejection;
use std::time::Duration;

use crate::auth::{
    extract_bearer_token, jwt_auth_middleware, rate_limit_middleware, AuthError, AuthResponse, AuthService,
    LoginRequest, MessageResponse, RateLimiter, RefreshTokenRequest, RegisterRequest, TokenResponse, UserInfo,
    UserSession,
};
use crate::errors::ServiceError;

/// Attempts per client address per minute on the credential endpoints
const CREDENTIAL_ATTEMPTS_PER_MINUTE: usize = 10;

/// Authentication routes
pub fn auth_routes(auth_service: AuthService, trust_proxy_headers: bool) -> Router {
    let limiter = RateLimiter::new(CREDENTIAL_ATTEMPTS_PER_MINUTE, Duration::from_secs(60))
        .trusting_proxy_headers(trust_proxy_headers);

    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route_layer(middleware::from_fn_with_state(limiter, rate_limit_middleware))
        .route("/refresh", post(refresh_token))
        .route("/logout", post(logout))
        .route(
            "/me",
            get(me).route_layer(middleware::from_fn_with_state(
                auth_service.clone(),
                jwt_auth_middleware,
            )),
        )
        .with_state(auth_service)
}

/// Register a new athlete or trainer
#[tracing::instrument(skip(auth_service, request))]
async fn register(
    State(auth_service): State<AuthService>,
    WithRejection(Json(request), _): WithRejection<Json<RegisterRequest>, ServiceError>,
) -> Result<Json<AuthResponse>, ServiceError> {
    let response = auth_service.register(request).await?;
    Ok(Json(response))
}

#[tracing::instrument(skip(auth_service, request))]
async fn login(
    State(auth_service): State<AuthService>,
    WithRejection(Json(request), _): WithRejection<Json<LoginRequest>, ServiceError>,
) -> Result<Json<AuthResponse>, ServiceError> {
    let response = auth_service.login(request).await?;
    Ok(Json(response))
}

/// Refresh access token
#[tracing::instrument(skip(auth_service, request))]
async fn refresh_token(
    State(auth_service): State<AuthService>,
    WithRejection(Json(request), _): WithRejection<Json<RefreshTokenRequest>, ServiceError>,
) -> Result<Json<TokenResponse>, ServiceError> {
    let response = auth_service.refresh_token(request).await?;
    Ok(Json(response))
}

/// Logout user
#[tracing::instrument(skip(auth_service, request))]
async fn logout(
    State(auth_service): State<AuthService>,
    request: Request,
) -> Result<Json<MessageResponse>, AuthError> {
    let auth_header = request
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
        .ok_or(AuthError::MissingAuthHeader)?;

    let token = extract_bearer_token(auth_header)?;
    let response = auth_service.logout(token).await?;
    Ok(Json(response))
}

#[tracing::instrument(skip(auth_service, session), fields(user_id = %session.user_id))]
async fn me(State(auth_service): State<AuthService>, session: UserSession) -> Result<Json<UserInfo>, AuthError> {
    let user_info = auth_service.current_user(&session).await?;
    Ok(Json(user_info))
}
