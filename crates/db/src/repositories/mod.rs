//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async CRUD methods
//! that accept `&PgPool` as the first argument.

pub mod payment_repo;
pub mod request_repo;
pub mod review_repo;
pub mod user_repo;

pub use payment_repo::{PaymentRepo, TimelineRecord};
pub use request_repo::{RequestFilter, RequestRepo};
pub use review_repo::ReviewRepo;
pub use user_repo::UserRepo;
