//! Prefixed ID generation for coursepay entities.
//!
//! IDs use a `cp_` brand prefix so they never collide with gateway-issued
//! transaction references. Format: `cp_{entity}_{uuid_simple}`.

use uuid::Uuid;

const ALL_PREFIXES: &[&str] = &["cp_usr_", "cp_crs_"];

/// Cheap format check used to reject garbage path parameters before a lookup.
pub fn is_valid_prefixed_id(s: &str) -> bool {
    let Some(prefix) = ALL_PREFIXES.iter().find(|p| s.starts_with(*p)) else {
        return false;
    };

    let hex_part = &s[prefix.len()..];
    hex_part.len() == 32 && hex_part.chars().all(|c| c.is_ascii_hexdigit())
}

#[derive(Debug, Clone, Copy)]
pub enum EntityType {
    User,
    Course,
}

impl EntityType {
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::User => "cp_usr",
            Self::Course => "cp_crs",
        }
    }

    pub fn gen_id(&self) -> String {
        format!("{}_{}", self.prefix(), Uuid::new_v4().simple())
    }
}
