//! Action API endpoints: consent-gated requests, votes, and cancellation.

use axum::{
    extract::{Path, State},
    Json,
};

use super::{error, success, ApiResult};
use crate::errors::AppError;
use crate::models::{
    ActionKind, ActionRequest, RemoveMemberRequest, TurnOption, VoteOutcome, VoteRequest,
};
use crate::AppState;

fn parse_kind(kind: &str) -> Result<ActionKind, AppError> {
    ActionKind::parse(kind)
        .ok_or_else(|| AppError::BadRequest(format!("Unknown action kind: {}", kind)))
}

/// POST /api/options/:id/actions/complete - Request completion of the current turn.
pub async fn request_complete(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<ActionRequest>,
) -> ApiResult<TurnOption> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.coordinator.request_complete(&id, &request).await {
        Ok(option) => {
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success(option, new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

/// POST /api/options/:id/actions/leave - Request to leave the queue.
pub async fn request_leave(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<ActionRequest>,
) -> ApiResult<TurnOption> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.coordinator.request_leave(&id, &request).await {
        Ok(option) => {
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success(option, new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

/// POST /api/options/:id/actions/remove - Request removal of another member.
pub async fn request_remove(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<RemoveMemberRequest>,
) -> ApiResult<TurnOption> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.coordinator.request_remove(&id, &request).await {
        Ok(option) => {
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success(option, new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

/// POST /api/options/:id/actions/delete - Request deletion of the option.
pub async fn request_delete_option(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<ActionRequest>,
) -> ApiResult<TurnOption> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.coordinator.request_delete_option(&id, &request).await {
        Ok(option) => {
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success(option, new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

/// POST /api/options/:id/actions/:kind/vote - Cast a vote on an open ballot.
pub async fn cast_vote(
    State(state): State<AppState>,
    Path((id, kind)): Path<(String, String)>,
    Json(request): Json<VoteRequest>,
) -> ApiResult<VoteOutcome> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    let kind = match parse_kind(&kind) {
        Ok(kind) => kind,
        Err(e) => return error(e, revision_id),
    };

    match state.coordinator.cast_vote(&id, kind, &request).await {
        Ok(outcome) => {
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success(outcome, new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

/// POST /api/options/:id/actions/:kind/cancel - Cancel a pending action.
pub async fn cancel_action(
    State(state): State<AppState>,
    Path((id, kind)): Path<(String, String)>,
    Json(request): Json<ActionRequest>,
) -> ApiResult<TurnOption> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    let kind = match parse_kind(&kind) {
        Ok(kind) => kind,
        Err(e) => return error(e, revision_id),
    };

    match state.coordinator.cancel_action(&id, kind, &request).await {
        Ok(option) => {
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success(option, new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}
