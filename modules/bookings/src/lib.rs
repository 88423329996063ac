pub mod clock;
pub mod config;
pub mod db;
pub mod domain;
pub mod health;
pub mod metrics;
pub mod models;
pub mod repos;
pub mod routes;
pub mod services;

pub use domain::{derive_step, Step};
pub use models::{BookingRecord, BookingSnapshot};
pub use repos::{BookingRepository, InMemoryBookingRepository, PgBookingRepository};
pub use routes::{router, AppState};
pub use services::{TransitionError, TransitionService};
