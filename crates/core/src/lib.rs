//! Domain rules for the helphub marketplace.
//!
//! Nothing in this crate performs I/O; the database and HTTP layers call
//! into it to validate and derive state.

pub mod error;
pub mod escrow;
pub mod pagination;
pub mod request_status;
pub mod review;
pub mod roles;
pub mod signature;
pub mod types;
