//! Member model.

use serde::{Deserialize, Serialize};

/// Member type of the general rotation pool. Every other type is exempt from rotation.
pub const GENERAL_MEMBER_TYPE: i64 = 0;

/// Status value of a member who left the roster.
pub const INACTIVE_MEMBER_STATUS: i64 = 0;

/// A person who can be put on duty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub member_type: i64,
    pub status: i64,
    #[serde(default)]
    pub updated_at: String,
}

impl Member {
    pub fn is_active(&self) -> bool {
        self.status != INACTIVE_MEMBER_STATUS
    }

    /// Whether round-robin selection may pick this member.
    pub fn in_rotation(&self) -> bool {
        self.member_type == GENERAL_MEMBER_TYPE && self.is_active()
    }
}

/// Request body for registering a member.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMemberRequest {
    pub id: i64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "type", default)]
    pub member_type: i64,
    #[serde(default = "default_status")]
    pub status: i64,
}

fn default_status() -> i64 {
    1
}

/// Request body for updating a member.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMemberRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "type", default)]
    pub member_type: Option<i64>,
    #[serde(default)]
    pub status: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(member_type: i64, status: i64) -> Member {
        Member {
            id: 1,
            name: None,
            member_type,
            status,
            updated_at: String::new(),
        }
    }

    #[test]
    fn test_rotation_eligibility() {
        assert!(member(GENERAL_MEMBER_TYPE, 1).in_rotation());
        assert!(!member(GENERAL_MEMBER_TYPE, INACTIVE_MEMBER_STATUS).in_rotation());
        assert!(!member(2, 1).in_rotation());
    }

    #[test]
    fn test_type_field_name() {
        let json = serde_json::to_value(member(3, 1)).unwrap();
        assert_eq!(json["type"], 3);
        assert!(json.get("name").is_none());
    }
}
