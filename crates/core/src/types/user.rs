//! User payload returned by the backend.
//!
//! The storefront treats the user as opaque: it is stored as received and only
//! read for display and for the id used in per-user endpoints.

use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};

use super::id::UserId;

/// Account role as reported by the backend.
///
/// The backend spells the customer role `costumer`; both spellings are read.
/// Unknown roles are kept rather than rejected.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    #[default]
    #[serde(rename = "costumer", alias = "customer")]
    Customer,
    Artist,
    #[serde(untagged)]
    Other(String),
}

/// An authenticated user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    #[serde(default)]
    pub firstname: String,
    #[serde(default)]
    pub lastname: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub rol: Role,
    #[serde(default = "default_active")]
    pub is_active: bool,
    /// Creation timestamp exactly as the backend formatted it.
    #[serde(default)]
    pub created_at: Option<String>,
}

const fn default_active() -> bool {
    true
}

impl User {
    /// First and last name joined, falling back to the email.
    #[must_use]
    pub fn display_name(&self) -> String {
        let name = format!("{} {}", self.firstname.trim(), self.lastname.trim());
        let name = name.trim();
        if name.is_empty() {
            self.email.clone()
        } else {
            name.to_string()
        }
    }

    /// Registration date, if the backend timestamp can be read.
    ///
    /// Accepts RFC 3339 (`2025-10-14T10:00:00Z`) and the RFC 2822 form Flask
    /// emits (`Tue, 14 Oct 2025 10:00:00 GMT`).
    #[must_use]
    pub fn registered_on(&self) -> Option<NaiveDate> {
        let raw = self.created_at.as_deref()?.trim();
        DateTime::parse_from_rfc3339(raw)
            .or_else(|_| DateTime::parse_from_rfc2822(raw))
            .map(|dt| dt.date_naive())
            .ok()
    }
}
