//! Well-known role name constants.
//!
//! These must match the `CHECK` constraint on `users.role` in
//! `20260301000001_create_users_table.sql`.

use crate::error::CoreError;

pub const ROLE_CUSTOMER: &str = "customer";
pub const ROLE_VOLUNTEER: &str = "volunteer";
pub const ROLE_ADMIN: &str = "admin";

/// Roles a visitor may pick when registering. Admins are provisioned out of band.
pub const SELF_REGISTER_ROLES: &[&str] = &[ROLE_CUSTOMER, ROLE_VOLUNTEER];

/// Validate a role requested at registration time.
pub fn validate_registration_role(role: &str) -> Result<(), CoreError> {
    if SELF_REGISTER_ROLES.contains(&role) {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "Invalid role '{role}'. Must be one of: {}",
            SELF_REGISTER_ROLES.join(", ")
        )))
    }
}
