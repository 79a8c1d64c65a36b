//! Authentication and authorization extractors.
//!
//! - [`auth::AuthUser`]: the authenticated user from a JWT Bearer token.
//! - [`auth::OptionalAuthUser`]: same, but anonymous callers are allowed.
//! - [`rbac::RequireAdmin`]: requires the `admin` role.
//! - [`rbac::RequireVolunteer`]: requires `volunteer` or `admin`.

pub mod auth;
pub mod rbac;
