//! Pending actions and their unanimous-approval ballots.

use std::collections::BTreeMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::errors::AppError;

use super::Slot;

/// The fixed vocabulary of consent-gated actions on an option.
///
/// At most one pending action per kind may be open on an option at a time.
/// `JoinPerson` is part of the vocabulary but joining is always direct and
/// never opens a ballot.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "camelCase")]
pub enum ActionKind {
    CompleteTurn,
    JoinPerson,
    LeavePerson,
    DeletePerson,
    DeleteOption,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::CompleteTurn => "completeTurn",
            ActionKind::JoinPerson => "joinPerson",
            ActionKind::LeavePerson => "leavePerson",
            ActionKind::DeletePerson => "deletePerson",
            ActionKind::DeleteOption => "deleteOption",
        }
    }

    /// Parse the camelCase wire form used in URL paths.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "completeTurn" => Some(ActionKind::CompleteTurn),
            "joinPerson" => Some(ActionKind::JoinPerson),
            "leavePerson" => Some(ActionKind::LeavePerson),
            "deletePerson" => Some(ActionKind::DeletePerson),
            "deleteOption" => Some(ActionKind::DeleteOption),
            _ => None,
        }
    }
}

/// One member's position on an open ballot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Vote {
    Undecided,
    Approved,
    Rejected,
}

/// Outcome of applying a vote to a ballot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Resolution {
    /// Undecided votes remain and nobody has rejected.
    Pending,
    /// Every member present at open time has approved.
    Approved,
    /// At least one member rejected; remaining undecided votes are ignored.
    Rejected,
}

/// An open request for a consent-gated mutation.
///
/// The vote set is frozen when the ballot opens: every member in the queue
/// at that moment gets an entry, later joiners do not.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingAction {
    pub requested_by: String,
    pub requested_at: String,
    /// Member being removed, for leave/remove actions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_member_id: Option<String>,
    pub approvals: BTreeMap<String, Vote>,
}

impl PendingAction {
    /// Open a ballot over a snapshot of the queue. The requester is pre-set
    /// to `Approved`, everyone else starts `Undecided`.
    pub fn open(queue: &[Slot], requested_by: &str, target_member_id: Option<String>) -> Self {
        let approvals = queue
            .iter()
            .map(|slot| {
                let vote = if slot.member_id == requested_by {
                    Vote::Approved
                } else {
                    Vote::Undecided
                };
                (slot.member_id.clone(), vote)
            })
            .collect();

        Self {
            requested_by: requested_by.to_string(),
            requested_at: Utc::now().to_rfc3339(),
            target_member_id,
            approvals,
        }
    }

    /// Record a vote. Re-voting before resolution overwrites the prior vote.
    ///
    /// Fails with `Forbidden` when the member has no entry, i.e. was not in
    /// the queue when the ballot opened.
    pub fn vote(&mut self, member_id: &str, approve: bool) -> Result<Resolution, AppError> {
        let entry = self.approvals.get_mut(member_id).ok_or_else(|| {
            AppError::Forbidden(format!(
                "Member {} is not eligible to vote on this action",
                member_id
            ))
        })?;

        *entry = if approve { Vote::Approved } else { Vote::Rejected };
        Ok(self.resolution())
    }

    /// Current resolution. A single rejection short-circuits; approval
    /// requires every entry to be `Approved`.
    pub fn resolution(&self) -> Resolution {
        if self.approvals.values().any(|v| *v == Vote::Rejected) {
            Resolution::Rejected
        } else if self.approvals.values().all(|v| *v == Vote::Approved) {
            Resolution::Approved
        } else {
            Resolution::Pending
        }
    }
}

/// Request body for actions that only carry the caller identity.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionRequest {
    pub requester_id: String,
}

/// Request body for removing a specific member.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveMemberRequest {
    pub requester_id: String,
    pub target_id: String,
}

/// Request body for casting a vote on an open ballot.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteRequest {
    pub requester_id: String,
    pub approve: bool,
}

/// Result of a cast vote.
///
/// `option` is absent after an approved `DeleteOption`, since the aggregate
/// no longer exists.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteOutcome {
    pub status: Resolution,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub option: Option<super::TurnOption>,
}
