//! Database repository for CRUD operations.
//!
//! Uses prepared statements and JSON text columns for the queue and ballot maps.

use chrono::Utc;
use sqlx::{Row, SqlitePool};

use crate::errors::AppError;
use crate::models::{
    member_id_from_name, Datastore, Member, RegisterMemberRequest, RevisionInfo, TurnOption,
};

/// Database repository for all data operations.
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Get the current revision ID.
    pub async fn get_revision_id(&self) -> Result<i64, AppError> {
        let row = sqlx::query("SELECT revision_id FROM meta WHERE id = 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("revision_id"))
    }

    /// Get revision info.
    pub async fn get_revision_info(&self) -> Result<RevisionInfo, AppError> {
        let row = sqlx::query("SELECT revision_id, generated_at FROM meta WHERE id = 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(RevisionInfo {
            revision_id: row.get("revision_id"),
            generated_at: row.get("generated_at"),
        })
    }

    /// Increment the revision ID and return the new value.
    pub async fn increment_revision(&self) -> Result<i64, AppError> {
        let now = Utc::now().to_rfc3339();
        sqlx::query("UPDATE meta SET revision_id = revision_id + 1, generated_at = ? WHERE id = 1")
            .bind(&now)
            .execute(&self.pool)
            .await?;
        self.get_revision_id().await
    }

    /// Get the full datastore.
    pub async fn get_datastore(&self) -> Result<Datastore, AppError> {
        let meta =
            sqlx::query("SELECT schema_version, revision_id, generated_at FROM meta WHERE id = 1")
                .fetch_one(&self.pool)
                .await?;

        let members = self.list_members().await?;
        let options = self.list_options().await?;

        Ok(Datastore {
            schema_version: meta.get("schema_version"),
            revision_id: meta.get("revision_id"),
            generated_at: meta.get("generated_at"),
            members,
            options,
        })
    }

    // ==================== MEMBER OPERATIONS ====================

    /// List all members.
    pub async fn list_members(&self) -> Result<Vec<Member>, AppError> {
        let rows = sqlx::query(
            "SELECT id, display_name, endpoint, created_at FROM members ORDER BY display_name",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|row| member_from_row(&row)).collect())
    }

    /// Resolve a member by ID.
    pub async fn get_member(&self, id: &str) -> Result<Option<Member>, AppError> {
        let row =
            sqlx::query("SELECT id, display_name, endpoint, created_at FROM members WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.as_ref().map(member_from_row))
    }

    /// Register a new member. The id is derived from the display name.
    pub async fn create_member(&self, request: &RegisterMemberRequest) -> Result<Member, AppError> {
        let id = member_id_from_name(&request.display_name);
        let now = Utc::now().to_rfc3339();

        if self.get_member(&id).await?.is_some() {
            return Err(AppError::Conflict(format!(
                "Member {} is already registered",
                id
            )));
        }

        sqlx::query(
            "INSERT INTO members (id, display_name, endpoint, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(&request.display_name)
        .bind(&request.endpoint)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        self.increment_revision().await?;

        Ok(Member {
            id,
            display_name: request.display_name.clone(),
            endpoint: request.endpoint.clone(),
            created_at: now,
        })
    }

    /// Delete a member from the registry.
    pub async fn delete_member(&self, id: &str) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM members WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Member {} not found", id)));
        }

        self.increment_revision().await?;
        Ok(())
    }

    // ==================== OPTION OPERATIONS ====================

    /// List all options.
    pub async fn list_options(&self) -> Result<Vec<TurnOption>, AppError> {
        let rows = sqlx::query(
            r#"SELECT id, name, created_by, current_index, queue, pending_actions,
                      created_at, updated_at
               FROM options ORDER BY name"#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(option_from_row).collect())
    }

    /// Load an option by ID.
    pub async fn get_option(&self, id: &str) -> Result<Option<TurnOption>, AppError> {
        let row = sqlx::query(
            r#"SELECT id, name, created_by, current_index, queue, pending_actions,
                      created_at, updated_at
               FROM options WHERE id = ?"#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(option_from_row))
    }

    /// Insert a freshly created option.
    pub async fn insert_option(&self, option: &TurnOption) -> Result<(), AppError> {
        let queue_json = serde_json::to_string(&option.queue)?;
        let pending_json = serde_json::to_string(&option.pending_actions)?;

        sqlx::query(
            r#"INSERT INTO options (id, name, created_by, current_index, queue, pending_actions,
                                    created_at, updated_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(&option.id)
        .bind(&option.name)
        .bind(&option.created_by)
        .bind(option.current_index as i64)
        .bind(&queue_json)
        .bind(&pending_json)
        .bind(&option.created_at)
        .bind(&option.updated_at)
        .execute(&self.pool)
        .await?;

        self.increment_revision().await?;
        Ok(())
    }

    /// Persist the full state of a mutated option. Last writer wins; callers
    /// serialize per option (see the coordinator).
    pub async fn save_option(&self, option: &mut TurnOption) -> Result<(), AppError> {
        let now = Utc::now().to_rfc3339();
        option.updated_at = now;

        let queue_json = serde_json::to_string(&option.queue)?;
        let pending_json = serde_json::to_string(&option.pending_actions)?;

        let result = sqlx::query(
            r#"UPDATE options SET name = ?, current_index = ?, queue = ?, pending_actions = ?,
                                  updated_at = ?
               WHERE id = ?"#,
        )
        .bind(&option.name)
        .bind(option.current_index as i64)
        .bind(&queue_json)
        .bind(&pending_json)
        .bind(&option.updated_at)
        .bind(&option.id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "Option {} not found",
                option.id
            )));
        }

        self.increment_revision().await?;
        Ok(())
    }

    /// Delete an option aggregate.
    pub async fn delete_option(&self, id: &str) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM options WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Option {} not found", id)));
        }

        self.increment_revision().await?;
        Ok(())
    }
}

// Helper functions for row conversion

fn member_from_row(row: &sqlx::sqlite::SqliteRow) -> Member {
    Member {
        id: row.get("id"),
        display_name: row.get("display_name"),
        endpoint: row.get("endpoint"),
        created_at: row.get("created_at"),
    }
}

fn option_from_row(row: &sqlx::sqlite::SqliteRow) -> TurnOption {
    let current_index: i64 = row.get("current_index");
    let queue_str: String = row.get("queue");
    let pending_str: String = row.get("pending_actions");

    TurnOption {
        id: row.get("id"),
        name: row.get("name"),
        created_by: row.get("created_by"),
        current_index: current_index as usize,
        queue: serde_json::from_str(&queue_str).unwrap_or_default(),
        pending_actions: serde_json::from_str(&pending_str).unwrap_or_default(),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}
