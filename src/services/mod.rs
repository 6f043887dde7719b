// Business logic services

pub mod admin_service;
pub mod athlete_profile_service;
pub mod availability_service;
pub mod background_job_service;
pub mod booking_service;
pub mod dashboard_service;
pub mod dispute_service;
pub mod matching_service;
pub mod message_service;
pub mod notification_service;
pub mod review_service;
pub mod trainer_profile_service;

pub use admin_service::AdminService;
pub use athlete_profile_service::AthleteProfileService;
pub use availability_service::AvailabilityService;
pub use background_job_service::BackgroundJobService;
pub use booking_service::BookingService;
pub use dashboard_service::DashboardService;
pub use dispute_service::DisputeService;
pub use matching_service::MatchingService;
pub use message_service::{MessageHub, MessageService};
pub use notification_service::NotificationService;
pub use review_service::ReviewService;
pub use trainer_profile_service::TrainerProfileService;
