//! HTTP request handlers.
//!
//! Each submodule provides the async handler functions for one resource.
//! Handlers validate through `helphub_core`, persist through the
//! `helphub_db` repositories, publish on the event bus, and map errors via
//! [`AppError`](crate::error::AppError).

pub mod admin;
pub mod auth;
pub mod payment;
pub mod request;
pub mod review;
pub mod user;
pub mod webhook;
