//! Users and the caller identity supplied by the identity collaborator

use crate::classification::{Role, Team};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Registered user, mirrored from the identity collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    pub email_address: String,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team: Option<Team>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn identity(&self) -> AgentIdentity {
        AgentIdentity {
            id: self.id.clone(),
            name: self.name.clone(),
            role: self.role,
            team: self.team,
        }
    }
}

/// User registration request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewUser {
    /// Reuse an id issued by the identity collaborator; generated when absent
    pub id: Option<String>,
    pub name: String,
    pub email_address: String,
    pub role: String,
    pub team: Option<String>,
}

impl NewUser {
    pub fn into_user(self, now: DateTime<Utc>) -> crate::Result<User> {
        let mut invalid = super::blank_fields(&[
            ("name", self.name.as_str()),
            ("emailAddress", self.email_address.as_str()),
            ("role", self.role.as_str()),
        ]);

        let role = self.role.parse::<Role>().ok();
        if role.is_none() && !invalid.contains(&"role") {
            invalid.push("role");
        }
        let team = match self.team.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            Some(raw) => match raw.parse::<Team>() {
                Ok(team) => Some(team),
                Err(_) => {
                    invalid.push("team");
                    None
                }
            },
            None => None,
        };

        let role = match role {
            Some(r) if invalid.is_empty() => r,
            _ => return Err(crate::Error::validation(invalid)),
        };

        Ok(User {
            id: self.id.filter(|id| !id.trim().is_empty()).unwrap_or_else(super::new_id),
            name: self.name.trim().to_string(),
            email_address: self.email_address.trim().to_string(),
            role,
            team,
            created_at: now,
            updated_at: now,
        })
    }
}

/// Authenticated caller as supplied on every call; the core trusts it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentIdentity {
    pub id: String,
    pub name: String,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team: Option<Team>,
}

impl AgentIdentity {
    pub fn new(id: impl Into<String>, name: impl Into<String>, role: Role) -> Self {
        Self { id: id.into(), name: name.into(), role, team: None }
    }

    pub fn with_team(mut self, team: Team) -> Self {
        self.team = Some(team);
        self
    }
}
