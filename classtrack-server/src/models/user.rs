//! User records (tutors and students)

use classtrack_common::{Error, Result};
use serde::{Deserialize, Serialize};

/// Role of a known user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Tutor,
    Student,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Tutor => "tutor",
            UserRole::Student => "student",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "tutor" => Ok(UserRole::Tutor),
            "student" => Ok(UserRole::Student),
            other => Err(Error::Internal(format!("Unknown user role: {}", other))),
        }
    }
}

/// A known tutor or student
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub full_name: String,
    pub role: UserRole,
    /// Billing rate for students, payroll rate for tutors
    pub hourly_rate: f64,
    pub is_active: bool,
}
