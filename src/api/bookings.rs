use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    response::Json,
    routing::{get, post},
    Router,
};
use axum_extra::extract::WithRejection;
use uuid::Uuid;

use crate::auth::{athlete_only_middleware, jwt_auth_middleware, AuthService, UserSession};
use crate::errors::ServiceError;
use crate::models::{
    Booking, BookingQuery, CreateBookingRequest, CreateReviewRequest, Dispute, OpenDisputeRequest, Review,
    UpdateBookingStatusRequest,
};
use crate::services::{BookingService, DisputeService, ReviewService};

#[derive(Clone)]
pub struct BookingsAppState {
    pub booking_service: BookingService,
    pub review_service: ReviewService,
    pub dispute_service: DisputeService,
}

pub fn booking_routes(state: BookingsAppState, auth_service: AuthService) -> Router {
    let athlete_only = Router::new()
        .route("/", post(create_booking))
        .route("/:booking_id/payment", post(mark_paid))
        .route("/:booking_id/review", post(create_review))
        .route_layer(middleware::from_fn(athlete_only_middleware));

    Router::new()
        .route("/", get(list_bookings))
        .route("/:booking_id", get(get_booking))
        .route("/:booking_id/status", post(update_status))
        .route("/:booking_id/dispute", post(open_dispute))
        .merge(athlete_only)
        .route_layer(middleware::from_fn_with_state(auth_service, jwt_auth_middleware))
        .with_state(state)
}

/// Request a session; runs the availability and conflict checks atomically
#[tracing::instrument(skip(state, session, request), fields(user_id = %session.user_id))]
pub async fn create_booking(
    State(state): State<BookingsAppState>,
    session: UserSession,
    WithRejection(Json(request), _): WithRejection<Json<CreateBookingRequest>, ServiceError>,
) -> Result<(StatusCode, Json<Booking>), ServiceError> {
    let booking = state.booking_service.create(session.user_id, request).await?;
    Ok((StatusCode::CREATED, Json(booking)))
}

#[tracing::instrument(skip(state, session), fields(user_id = %session.user_id))]
pub async fn list_bookings(
    State(state): State<BookingsAppState>,
    session: UserSession,
    Query(query): Query<BookingQuery>,
) -> Result<Json<Vec<Booking>>, ServiceError> {
    let bookings = state.booking_service.list(&session, &query).await?;
    Ok(Json(bookings))
}

pub async fn get_booking(
    State(state): State<BookingsAppState>,
    session: UserSession,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<Booking>, ServiceError> {
    let booking = state.booking_service.get(&session, booking_id).await?;
    Ok(Json(booking))
}

pub async fn update_status(
    State(state): State<BookingsAppState>,
    session: UserSession,
    Path(booking_id): Path<Uuid>,
    WithRejection(Json(request), _): WithRejection<Json<UpdateBookingStatusRequest>, ServiceError>,
) -> Result<Json<Booking>, ServiceError> {
    let booking = state.booking_service.update_status(&session, booking_id, request).await?;
    Ok(Json(booking))
}

#[tracing::instrument(skip(state, session), fields(user_id = %session.user_id))]
pub async fn mark_paid(
    State(state): State<BookingsAppState>,
    session: UserSession,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<Booking>, ServiceError> {
    let booking = state.booking_service.mark_paid(&session, booking_id).await?;
    Ok(Json(booking))
}

#[tracing::instrument(skip(state, session, request), fields(user_id = %session.user_id))]
pub async fn create_review(
    State(state): State<BookingsAppState>,
    session: UserSession,
    Path(booking_id): Path<Uuid>,
    WithRejection(Json(request), _): WithRejection<Json<CreateReviewRequest>, ServiceError>,
) -> Result<(StatusCode, Json<Review>), ServiceError> {
    let review = state.review_service.create(session.user_id, booking_id, request).await?;
    Ok((StatusCode::CREATED, Json(review)))
}

pub async fn open_dispute(
    State(state): State<BookingsAppState>,
    session: UserSession,
    Path(booking_id): Path<Uuid>,
    WithRejection(Json(request), _): WithRejection<Json<OpenDisputeRequest>, ServiceError>,
) -> Result<(StatusCode, Json<Dispute>), ServiceError> {
    let dispute = state.dispute_service.open(&session, booking_id, request).await?;
    Ok((StatusCode::CREATED, Json(dispute)))
}
