//! Datastore model matching the frontend Datastore interface.

use serde::{Deserialize, Serialize};

use super::{Member, Slot, TurnOption};

/// The root datastore containing all application data.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Datastore {
    pub schema_version: i32,
    pub generated_at: String,
    pub revision_id: i64,
    pub members: Vec<Member>,
    pub options: Vec<TurnOption>,
}

/// Revision information for change detection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevisionInfo {
    pub revision_id: i64,
    pub generated_at: String,
}

/// Projection of whose turn it currently is on an option.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentTurn {
    pub current_slot: Option<Slot>,
    pub current_index: usize,
    pub total_members: usize,
}
