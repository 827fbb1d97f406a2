//! Registered participant model matching the frontend Member interface.

use serde::{Deserialize, Serialize};

/// A registered participant who can hold slots in option queues.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub id: String,
    pub display_name: String,
    /// Optional URL that approval notifications are pushed to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    pub created_at: String,
}

/// Request body for registering a new member.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterMemberRequest {
    pub display_name: String,
    #[serde(default)]
    pub endpoint: Option<String>,
}

/// Derive the stable member id from a display name.
///
/// Lower-cased, with whitespace runs collapsed to a single `-`.
pub fn member_id_from_name(name: &str) -> String {
    name.to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_member_id_lowercases() {
        assert_eq!(member_id_from_name("Alice"), "alice");
    }

    #[test]
    fn test_member_id_collapses_whitespace() {
        assert_eq!(member_id_from_name("  Mary   Jane  Watson "), "mary-jane-watson");
    }

    #[test]
    fn test_member_id_is_deterministic() {
        assert_eq!(
            member_id_from_name("Bob Smith"),
            member_id_from_name("bob   SMITH")
        );
    }
}
