//! Option aggregate: the circular turn queue and its pending actions.

use std::collections::BTreeMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::errors::AppError;

use super::{ActionKind, Member, PendingAction};

/// One member's position within an option's queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Slot {
    pub slot_id: String,
    pub member_id: String,
    pub display_name: String,
}

/// A shared resource with a rotating turn order among members.
///
/// `current_index` is always a valid index into `queue` when the queue is
/// non-empty, and `0` otherwise.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnOption {
    pub id: String,
    pub name: String,
    pub created_by: String,
    pub queue: Vec<Slot>,
    pub current_index: usize,
    #[serde(default)]
    pub pending_actions: BTreeMap<ActionKind, PendingAction>,
    pub created_at: String,
    pub updated_at: String,
}

impl TurnOption {
    /// Create a new option with an empty queue.
    pub fn new(name: &str, created_by: &str) -> Self {
        let now = Utc::now().to_rfc3339();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.to_string(),
            created_by: created_by.to_string(),
            queue: Vec::new(),
            current_index: 0,
            pending_actions: BTreeMap::new(),
            created_at: now.clone(),
            updated_at: now,
        }
    }

    pub fn is_member(&self, member_id: &str) -> bool {
        self.queue.iter().any(|slot| slot.member_id == member_id)
    }

    /// Member ids of everyone currently in the queue except `member_id`.
    pub fn other_member_ids(&self, member_id: &str) -> Vec<String> {
        self.queue
            .iter()
            .filter(|slot| slot.member_id != member_id)
            .map(|slot| slot.member_id.clone())
            .collect()
    }

    /// Append a member to the tail of the queue.
    pub fn append(&mut self, member: &Member) -> Result<(), AppError> {
        if self.is_member(&member.id) {
            return Err(AppError::Conflict(format!(
                "Member {} is already in the queue",
                member.id
            )));
        }

        self.queue.push(Slot {
            slot_id: uuid::Uuid::new_v4().to_string(),
            member_id: member.id.clone(),
            display_name: member.display_name.clone(),
        });
        Ok(())
    }

    /// Remove a member's slot and repair `current_index`.
    ///
    /// Policy: when the removal empties the queue or leaves the pointer past
    /// the tail, the pointer resets to the head. The previously-current
    /// member is not re-located.
    pub fn remove(&mut self, member_id: &str) -> Result<(), AppError> {
        let position = self
            .queue
            .iter()
            .position(|slot| slot.member_id == member_id)
            .ok_or_else(|| {
                AppError::NotFound(format!("Member {} is not in the queue", member_id))
            })?;

        self.queue.remove(position);

        if self.queue.is_empty() || self.current_index >= self.queue.len() {
            self.current_index = 0;
        }
        Ok(())
    }

    /// Move the turn to the next member, wrapping past the tail.
    pub fn advance(&mut self) -> Result<(), AppError> {
        if self.queue.is_empty() {
            return Err(AppError::InvalidState(
                "No members in the queue".to_string(),
            ));
        }
        self.current_index = (self.current_index + 1) % self.queue.len();
        Ok(())
    }

    /// The slot whose turn it currently is, or `None` for an empty queue.
    pub fn current_slot(&self) -> Option<&Slot> {
        self.queue.get(self.current_index)
    }
}

/// Request body for creating a new option.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOptionRequest {
    pub name: String,
    pub requester_id: String,
}

/// Request body for renaming an option.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenameOptionRequest {
    pub name: String,
    pub requester_id: String,
}

/// Request body for joining an option's queue.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinOptionRequest {
    pub requester_id: String,
}

/// Request body for adding another registered member to the queue.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddMemberRequest {
    pub requester_id: String,
    pub target_id: String,
}
