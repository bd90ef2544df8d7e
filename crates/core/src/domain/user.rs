use serde::{Deserialize, Serialize};

use crate::errors::WorkflowError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

/// Roles recognized by the approval chain. `Staff` submits requests,
/// the remaining roles gate approval levels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Staff,
    ApproverLevel1,
    ApproverLevel2,
    Finance,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Staff => "staff",
            Self::ApproverLevel1 => "approver_level_1",
            Self::ApproverLevel2 => "approver_level_2",
            Self::Finance => "finance",
            Self::Admin => "admin",
        }
    }
}

impl std::str::FromStr for Role {
    type Err = WorkflowError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "staff" => Ok(Self::Staff),
            "approver_level_1" => Ok(Self::ApproverLevel1),
            "approver_level_2" => Ok(Self::ApproverLevel2),
            "finance" => Ok(Self::Finance),
            "admin" => Ok(Self::Admin),
            other => Err(WorkflowError::UnknownRole { role: other.to_string() }),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity record consumed by the engine. Supplied by the auth
/// collaborator, never mutated here.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    pub username: String,
    pub role: Role,
    pub active: bool,
}
