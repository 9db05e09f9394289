use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumString};

use crate::error::{AppError, Result, msg};

/// Basic email format validation.
///
/// Requires exactly one `@`, a non-empty local part without spaces, and a
/// dotted domain that does not start or end with a dot. Not RFC 5322.
pub fn validate_email_format(email: &str) -> Result<()> {
    let email = email.trim();

    let Some((local_part, domain_part)) = email.split_once('@') else {
        return Err(AppError::Validation(msg::INVALID_EMAIL.into()));
    };

    if local_part.is_empty() || local_part.contains(' ') || domain_part.contains('@') {
        return Err(AppError::Validation(msg::INVALID_EMAIL.into()));
    }

    if !domain_part.contains('.') || domain_part.starts_with('.') || domain_part.ends_with('.') {
        return Err(AppError::Validation(msg::INVALID_EMAIL.into()));
    }

    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Role {
    User,
    Admin,
    SuperAdmin,
}

impl Role {
    /// Admins and super admins may read reporting rollups and other users' data.
    pub fn is_privileged(&self) -> bool {
        matches!(self, Role::Admin | Role::SuperAdmin)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: String,
    pub role: Role,
    /// When the first-purchase welcome was claimed (None = not yet welcomed)
    pub welcomed_at: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl User {
    pub fn has_been_welcomed(&self) -> bool {
        self.welcomed_at.is_some()
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateUser {
    pub email: String,
    pub name: String,
    pub role: Role,
}

impl CreateUser {
    pub fn validate(&self) -> Result<()> {
        validate_email_format(&self.email)?;
        if self.name.trim().is_empty() {
            return Err(AppError::Validation("Name cannot be empty".into()));
        }
        Ok(())
    }
}
