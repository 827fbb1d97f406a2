//! Option API endpoints.

use axum::{
    extract::{Path, State},
    Json,
};

use super::{error, success, ApiResult};
use crate::errors::AppError;
use crate::models::{
    AddMemberRequest, CreateOptionRequest, CurrentTurn, JoinOptionRequest, RenameOptionRequest,
    TurnOption,
};
use crate::AppState;

/// GET /api/options - List all options.
pub async fn list_options(State(state): State<AppState>) -> ApiResult<Vec<TurnOption>> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.list_options().await {
        Ok(options) => success(options, revision_id),
        Err(e) => error(e, revision_id),
    }
}

/// GET /api/options/:id - Get a single option.
pub async fn get_option(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<TurnOption> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.get_option(&id).await {
        Ok(Some(option)) => success(option, revision_id),
        Ok(None) => error(
            AppError::NotFound(format!("Option {} not found", id)),
            revision_id,
        ),
        Err(e) => error(e, revision_id),
    }
}

/// GET /api/options/:id/current - Whose turn it currently is.
pub async fn get_current_turn(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<CurrentTurn> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.get_option(&id).await {
        Ok(Some(option)) => success(
            CurrentTurn {
                current_slot: option.current_slot().cloned(),
                current_index: option.current_index,
                total_members: option.queue.len(),
            },
            revision_id,
        ),
        Ok(None) => error(
            AppError::NotFound(format!("Option {} not found", id)),
            revision_id,
        ),
        Err(e) => error(e, revision_id),
    }
}

/// POST /api/options - Create a new option.
pub async fn create_option(
    State(state): State<AppState>,
    Json(request): Json<CreateOptionRequest>,
) -> ApiResult<TurnOption> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    // Validate required fields
    if request.name.trim().is_empty() {
        return error(
            AppError::Validation("Option name is required".to_string()),
            revision_id,
        );
    }

    match state.coordinator.create_option(&request).await {
        Ok(option) => {
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success(option, new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

/// PUT /api/options/:id - Rename an option.
pub async fn rename_option(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<RenameOptionRequest>,
) -> ApiResult<TurnOption> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    if request.name.trim().is_empty() {
        return error(
            AppError::Validation("Option name is required".to_string()),
            revision_id,
        );
    }

    match state.coordinator.rename_option(&id, &request).await {
        Ok(option) => {
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success(option, new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

/// DELETE /api/options/:id - Delete an option with an empty queue.
pub async fn delete_option(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<()> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.coordinator.delete_option_direct(&id).await {
        Ok(()) => {
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success((), new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

/// POST /api/options/:id/join - Join an option's queue.
pub async fn join_option(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<JoinOptionRequest>,
) -> ApiResult<TurnOption> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.coordinator.join_option(&id, &request).await {
        Ok(option) => {
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success(option, new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

/// POST /api/options/:id/members - Add another member to the queue.
pub async fn add_member(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<AddMemberRequest>,
) -> ApiResult<TurnOption> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.coordinator.add_member(&id, &request).await {
        Ok(option) => {
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success(option, new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}
