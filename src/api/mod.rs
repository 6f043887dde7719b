// API routes and handlers

pub mod admin;
pub mod athletes;
pub mod auth;
pub mod availability;
pub mod bookings;
pub mod health;
pub mod messages;
pub mod notifications;
pub mod routes;
pub mod trainers;

pub use routes::{create_routes, create_routes_with_hub};
