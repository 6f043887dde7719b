// Domain models, request/response types and input validation

pub mod athlete_profile;
pub mod availability;
pub mod booking;
pub mod dashboard;
pub mod dispute;
pub mod message;
pub mod notification;
pub mod pagination;
pub mod review;
pub mod trainer_profile;
pub mod user;
pub mod validation;

pub use athlete_profile::*;
pub use availability::*;
pub use booking::*;
pub use dashboard::*;
pub use dispute::*;
pub use message::*;
pub use notification::*;
pub use pagination::*;
pub use review::*;
pub use trainer_profile::*;
pub use user::*;
