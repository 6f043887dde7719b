use axum::{routing::get, Router};
use sqlx::PgPool;
use tower_http::trace::TraceLayer;

use super::admin::{admin_routes, AdminAppState};
use super::athletes::{athlete_routes, AthletesAppState};
use super::auth::auth_routes;
use super::availability::{availability_routes, AvailabilityAppState};
use super::bookings::{booking_routes, BookingsAppState};
use super::health::health_check;
use super::messages::{message_routes, MessagesAppState};
use super::notifications::notification_routes;
use super::trainers::{trainer_routes, TrainersAppState};
use crate::auth::{cors_layer, security_headers_layer, AuthService};
use crate::config::AppConfig;
use crate::services::{
    AdminService, AthleteProfileService, AvailabilityService, BookingService, DashboardService, DisputeService,
    MatchingService, MessageHub, MessageService, NotificationService, ReviewService, TrainerProfileService,
};

pub fn create_routes(db: PgPool, config: &AppConfig) -> Router {
    create_routes_with_hub(db, config, MessageHub::new())
}

/// Build the full application router around an existing message hub
pub fn create_routes_with_hub(db: PgPool, config: &AppConfig, hub: MessageHub) -> Router {
    let auth_service = AuthService::new(db.clone(), &config.jwt_secret);

    let trainer_profile_service = TrainerProfileService::new(db.clone());
    let availability_service = AvailabilityService::new(db.clone());
    let booking_service = BookingService::new(db.clone(), config.platform_fee_percent);
    let review_service = ReviewService::new(db.clone());
    let dispute_service = DisputeService::new(db.clone());
    let dashboard_service = DashboardService::new(db.clone());

    let trainers = TrainersAppState {
        matching_service: MatchingService::new(db.clone()),
        trainer_profile_service: trainer_profile_service.clone(),
        availability_service: availability_service.clone(),
        review_service: review_service.clone(),
        dashboard_service: dashboard_service.clone(),
    };
    let athletes = AthletesAppState {
        athlete_profile_service: AthleteProfileService::new(db.clone()),
        dashboard_service,
    };
    let availability = AvailabilityAppState {
        availability_service,
        trainer_profile_service: trainer_profile_service.clone(),
    };
    let bookings = BookingsAppState {
        booking_service: booking_service.clone(),
        review_service,
        dispute_service: dispute_service.clone(),
    };
    let messages = MessagesAppState {
        message_service: MessageService::new(db.clone(), hub),
    };
    let admin = AdminAppState {
        admin_service: AdminService::new(db.clone()),
        booking_service,
        dispute_service,
        trainer_profile_service,
    };

    let api = Router::new()
        .nest("/auth", auth_routes(auth_service.clone(), config.trust_proxy_headers))
        .nest("/trainers", trainer_routes(trainers, auth_service.clone()))
        .nest("/athletes", athlete_routes(athletes, auth_service.clone()))
        .nest("/availability", availability_routes(availability, auth_service.clone()))
        .nest("/bookings", booking_routes(bookings, auth_service.clone()))
        .nest("/messages", message_routes(messages, auth_service.clone()))
        .nest(
            "/notifications",
            notification_routes(NotificationService::new(db), auth_service.clone()),
        )
        .nest("/admin", admin_routes(admin, auth_service));

    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", api)
        .layer(security_headers_layer())
        .layer(cors_layer())
        .layer(TraceLayer::new_for_http())
}
