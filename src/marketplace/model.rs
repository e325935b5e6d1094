//! Request and response shapes for marketplace operations

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::storage::Record;

/// Account kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Company,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Company => "company",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "student" => Ok(Role::Student),
            "company" => Ok(Role::Company),
            _ => Err(Error::Invalid("Role must be student or company".to_string())),
        }
    }
}

/// An already-authenticated caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Viewer {
    pub id: String,
    pub role: Role,
}

impl Viewer {
    pub fn student(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role: Role::Student,
        }
    }

    pub fn company(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role: Role::Company,
        }
    }
}

/// Registration form; the password arrives already hashed
#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub name: String,
    pub role: Role,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewProject {
    pub title: String,
    pub description: String,
    pub skills: String,
}

/// Partial project update; `None` keeps the stored value
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProjectPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub skills: Option<String>,
    pub status: Option<String>,
}

/// Filters for the public project listing
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProjectQuery {
    /// Defaults to `open`
    pub status: Option<String>,
    /// Substring match against the skills text
    pub skills: Option<String>,
}

/// Whether an application was taken on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Accepted,
    Rejected,
}

impl Decision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Accepted => "accepted",
            Decision::Rejected => "rejected",
        }
    }
}

impl FromStr for Decision {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "accepted" => Ok(Decision::Accepted),
            "rejected" => Ok(Decision::Rejected),
            _ => Err(Error::Invalid(
                "Status must be accepted or rejected".to_string(),
            )),
        }
    }
}

/// A company's verdict on a submission
#[derive(Debug, Clone, Deserialize)]
pub struct NewReview {
    pub rating: i64,
    pub feedback: Option<String>,
    /// Submission status to record; `approved` when absent
    pub status: Option<String>,
}

/// A project as seen by one viewer
#[derive(Debug, Clone, Serialize)]
pub struct ProjectDetail {
    pub project: Record,
    /// The viewing student's own application
    pub application: Option<Record>,
    /// Every application, shown to the owning company only
    pub applications: Vec<Record>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parse() {
        assert_eq!("student".parse::<Role>().unwrap(), Role::Student);
        assert!("admin".parse::<Role>().is_err());
        assert_eq!(Role::Company.to_string(), "company");
    }

    #[test]
    fn test_decision_parse() {
        assert_eq!("accepted".parse::<Decision>().unwrap(), Decision::Accepted);
        assert!(matches!(
            "maybe".parse::<Decision>(),
            Err(Error::Invalid(_))
        ));
    }
}
