//! Action coordinator: the state machine gating queue mutations behind
//! unanimous approval.
//!
//! Every operation runs the whole load-validate-mutate-save sequence under a
//! per-option lock, so requests against one option are serialized while
//! different options proceed in parallel.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::Mutex as AsyncMutex;

use crate::db::Repository;
use crate::errors::AppError;
use crate::models::{
    ActionKind, ActionRequest, AddMemberRequest, CreateOptionRequest, JoinOptionRequest, Member,
    PendingAction, RemoveMemberRequest, RenameOptionRequest, Resolution, TurnOption, VoteOutcome,
    VoteRequest,
};
use crate::notify::{ApprovalEvent, Notifier};

/// Coordinates option mutations, fast paths, and approval ballots.
pub struct Coordinator {
    repo: Arc<Repository>,
    notifier: Notifier,
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl Coordinator {
    pub fn new(repo: Arc<Repository>, notifier: Notifier) -> Self {
        Self {
            repo,
            notifier,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// The serialization lock for one option id.
    fn option_lock(&self, option_id: &str) -> Arc<AsyncMutex<()>> {
        let mut locks = self.locks.lock().expect("lock map poisoned");
        locks
            .entry(option_id.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }

    async fn load(&self, option_id: &str) -> Result<TurnOption, AppError> {
        self.repo
            .get_option(option_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Option {} not found", option_id)))
    }

    async fn resolve_member(&self, member_id: &str) -> Result<Member, AppError> {
        self.repo
            .get_member(member_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Member {} not found", member_id)))
    }

    // ==================== DIRECT OPERATIONS ====================

    /// Create an option with an empty queue.
    pub async fn create_option(
        &self,
        request: &CreateOptionRequest,
    ) -> Result<TurnOption, AppError> {
        let creator = self.resolve_member(&request.requester_id).await?;
        let option = TurnOption::new(&request.name, &creator.id);
        self.repo.insert_option(&option).await?;

        tracing::info!("Option {} ({}) created by {}", option.id, option.name, creator.id);
        Ok(option)
    }

    /// Rename an option. Allowed for current queue members and the creator.
    pub async fn rename_option(
        &self,
        option_id: &str,
        request: &RenameOptionRequest,
    ) -> Result<TurnOption, AppError> {
        let lock = self.option_lock(option_id);
        let _guard = lock.lock().await;

        let mut option = self.load(option_id).await?;
        if !option.is_member(&request.requester_id) && option.created_by != request.requester_id {
            return Err(AppError::Forbidden(
                "Only queue members or the creator may rename an option".to_string(),
            ));
        }

        option.name = request.name.clone();
        self.repo.save_option(&mut option).await?;
        Ok(option)
    }

    /// Delete an option directly. Only legal while the queue is empty; with
    /// members present, deletion goes through the DeleteOption ballot.
    pub async fn delete_option_direct(&self, option_id: &str) -> Result<(), AppError> {
        let lock = self.option_lock(option_id);
        let _guard = lock.lock().await;

        let option = self.load(option_id).await?;
        if !option.queue.is_empty() {
            return Err(AppError::RequiresApproval(
                "Deleting an option with members requires unanimous approval".to_string(),
            ));
        }

        self.repo.delete_option(option_id).await
    }

    /// Self-join an option's queue. Joining is unilateral and never opens a
    /// ballot.
    pub async fn join_option(
        &self,
        option_id: &str,
        request: &JoinOptionRequest,
    ) -> Result<TurnOption, AppError> {
        let lock = self.option_lock(option_id);
        let _guard = lock.lock().await;

        let mut option = self.load(option_id).await?;
        let member = self.resolve_member(&request.requester_id).await?;
        option.append(&member)?;
        self.repo.save_option(&mut option).await?;
        Ok(option)
    }

    /// Add another registered member to the queue. The requester must
    /// already hold a slot.
    pub async fn add_member(
        &self,
        option_id: &str,
        request: &AddMemberRequest,
    ) -> Result<TurnOption, AppError> {
        let lock = self.option_lock(option_id);
        let _guard = lock.lock().await;

        let mut option = self.load(option_id).await?;
        if !option.is_member(&request.requester_id) {
            return Err(AppError::Forbidden(
                "Only queue members may add other members".to_string(),
            ));
        }

        let target = self.resolve_member(&request.target_id).await?;
        option.append(&target)?;
        self.repo.save_option(&mut option).await?;
        Ok(option)
    }

    // ==================== ACTION REQUESTS ====================

    /// Request completion of the current turn. Only the current-turn holder
    /// may request; a single-member queue advances directly.
    pub async fn request_complete(
        &self,
        option_id: &str,
        request: &ActionRequest,
    ) -> Result<TurnOption, AppError> {
        let lock = self.option_lock(option_id);
        let _guard = lock.lock().await;

        let mut option = self.load(option_id).await?;
        let holder = option
            .current_slot()
            .map(|slot| slot.member_id.clone())
            .ok_or_else(|| AppError::InvalidState("No members in the queue".to_string()))?;

        if holder != request.requester_id {
            return Err(AppError::Forbidden(format!(
                "It is not {}'s turn",
                request.requester_id
            )));
        }

        if option.queue.len() == 1 {
            option.advance()?;
            self.repo.save_option(&mut option).await?;
            return Ok(option);
        }

        self.open_ballot(&mut option, ActionKind::CompleteTurn, &request.requester_id, None)?;
        self.repo.save_option(&mut option).await?;
        self.notify_others(&option, ActionKind::CompleteTurn, &request.requester_id)
            .await;
        Ok(option)
    }

    /// Request to leave the queue. A lone member leaves directly.
    pub async fn request_leave(
        &self,
        option_id: &str,
        request: &ActionRequest,
    ) -> Result<TurnOption, AppError> {
        let lock = self.option_lock(option_id);
        let _guard = lock.lock().await;

        let mut option = self.load(option_id).await?;
        if !option.is_member(&request.requester_id) {
            return Err(AppError::Forbidden(format!(
                "Member {} is not in the queue",
                request.requester_id
            )));
        }

        if option.queue.len() == 1 {
            option.remove(&request.requester_id)?;
            self.repo.save_option(&mut option).await?;
            return Ok(option);
        }

        self.open_ballot(
            &mut option,
            ActionKind::LeavePerson,
            &request.requester_id,
            Some(request.requester_id.clone()),
        )?;
        self.repo.save_option(&mut option).await?;
        self.notify_others(&option, ActionKind::LeavePerson, &request.requester_id)
            .await;
        Ok(option)
    }

    /// Request removal of another member. Always ballot-gated.
    pub async fn request_remove(
        &self,
        option_id: &str,
        request: &RemoveMemberRequest,
    ) -> Result<TurnOption, AppError> {
        let lock = self.option_lock(option_id);
        let _guard = lock.lock().await;

        let mut option = self.load(option_id).await?;
        if !option.is_member(&request.requester_id) {
            return Err(AppError::Forbidden(format!(
                "Member {} is not in the queue",
                request.requester_id
            )));
        }
        if !option.is_member(&request.target_id) {
            return Err(AppError::NotFound(format!(
                "Member {} is not in the queue",
                request.target_id
            )));
        }

        self.open_ballot(
            &mut option,
            ActionKind::DeletePerson,
            &request.requester_id,
            Some(request.target_id.clone()),
        )?;
        self.repo.save_option(&mut option).await?;
        self.notify_others(&option, ActionKind::DeletePerson, &request.requester_id)
            .await;
        Ok(option)
    }

    /// Request deletion of the whole option. Always ballot-gated.
    pub async fn request_delete_option(
        &self,
        option_id: &str,
        request: &ActionRequest,
    ) -> Result<TurnOption, AppError> {
        let lock = self.option_lock(option_id);
        let _guard = lock.lock().await;

        let mut option = self.load(option_id).await?;
        if !option.is_member(&request.requester_id) {
            return Err(AppError::Forbidden(format!(
                "Member {} is not in the queue",
                request.requester_id
            )));
        }

        self.open_ballot(&mut option, ActionKind::DeleteOption, &request.requester_id, None)?;
        self.repo.save_option(&mut option).await?;
        self.notify_others(&option, ActionKind::DeleteOption, &request.requester_id)
            .await;
        Ok(option)
    }

    // ==================== BALLOT RESOLUTION ====================

    /// Cast a vote on an open ballot.
    ///
    /// The voter must be a queue member at vote time and hold an entry in
    /// the ballot's frozen approvals map. Rejection discards the ballot with
    /// no mutation; unanimous approval applies the kind's mutation and
    /// clears the ballot in the same persisted write.
    pub async fn cast_vote(
        &self,
        option_id: &str,
        kind: ActionKind,
        request: &VoteRequest,
    ) -> Result<VoteOutcome, AppError> {
        let lock = self.option_lock(option_id);
        let _guard = lock.lock().await;

        let mut option = self.load(option_id).await?;
        if !option.is_member(&request.requester_id) {
            return Err(AppError::Forbidden(format!(
                "Member {} is not in the queue",
                request.requester_id
            )));
        }

        let pending = option.pending_actions.get_mut(&kind).ok_or_else(|| {
            AppError::NotFound(format!(
                "No pending {} action on this option",
                kind.as_str()
            ))
        })?;

        let resolution = pending.vote(&request.requester_id, request.approve)?;
        let target = pending.target_member_id.clone();

        match resolution {
            Resolution::Pending => {
                self.repo.save_option(&mut option).await?;
                Ok(VoteOutcome {
                    status: Resolution::Pending,
                    option: Some(option),
                })
            }
            Resolution::Rejected => {
                option.pending_actions.remove(&kind);
                self.repo.save_option(&mut option).await?;
                tracing::info!("{} action on option {} rejected", kind.as_str(), option_id);
                Ok(VoteOutcome {
                    status: Resolution::Rejected,
                    option: Some(option),
                })
            }
            Resolution::Approved => {
                match kind {
                    ActionKind::CompleteTurn => option.advance()?,
                    ActionKind::LeavePerson | ActionKind::DeletePerson => {
                        let target = target.ok_or_else(|| {
                            AppError::Internal(
                                "Pending removal has no target member".to_string(),
                            )
                        })?;
                        option.remove(&target)?;
                    }
                    ActionKind::DeleteOption => {
                        self.repo.delete_option(option_id).await?;
                        tracing::info!("Option {} deleted by unanimous approval", option_id);
                        return Ok(VoteOutcome {
                            status: Resolution::Approved,
                            option: None,
                        });
                    }
                    ActionKind::JoinPerson => {
                        return Err(AppError::Internal(
                            "Join actions are never ballot-gated".to_string(),
                        ));
                    }
                }

                option.pending_actions.remove(&kind);
                self.repo.save_option(&mut option).await?;
                tracing::info!("{} action on option {} approved", kind.as_str(), option_id);
                Ok(VoteOutcome {
                    status: Resolution::Approved,
                    option: Some(option),
                })
            }
        }
    }

    /// Cancel an open ballot. Only its original requester may cancel; the
    /// queue is never mutated.
    pub async fn cancel_action(
        &self,
        option_id: &str,
        kind: ActionKind,
        request: &ActionRequest,
    ) -> Result<TurnOption, AppError> {
        let lock = self.option_lock(option_id);
        let _guard = lock.lock().await;

        let mut option = self.load(option_id).await?;
        let pending = option.pending_actions.get(&kind).ok_or_else(|| {
            AppError::NotFound(format!(
                "No pending {} action on this option",
                kind.as_str()
            ))
        })?;

        if pending.requested_by != request.requester_id {
            return Err(AppError::Forbidden(
                "Only the requester may cancel a pending action".to_string(),
            ));
        }

        option.pending_actions.remove(&kind);
        self.repo.save_option(&mut option).await?;
        Ok(option)
    }

    // ==================== INTERNAL ====================

    /// Open a ballot of the given kind over the current queue snapshot.
    /// At most one ballot per kind may be open on an option.
    fn open_ballot(
        &self,
        option: &mut TurnOption,
        kind: ActionKind,
        requested_by: &str,
        target_member_id: Option<String>,
    ) -> Result<(), AppError> {
        if option.pending_actions.contains_key(&kind) {
            return Err(AppError::Conflict(format!(
                "A {} action is already awaiting approval",
                kind.as_str()
            )));
        }

        let action = PendingAction::open(&option.queue, requested_by, target_member_id);
        option.pending_actions.insert(kind, action);
        Ok(())
    }

    /// Alert every queue member except the requester that their approval is
    /// needed. Best-effort only.
    async fn notify_others(&self, option: &TurnOption, kind: ActionKind, requested_by: &str) {
        let mut recipients = Vec::new();
        for member_id in option.other_member_ids(requested_by) {
            match self.repo.get_member(&member_id).await {
                Ok(Some(member)) => recipients.push(member),
                Ok(None) => {}
                Err(err) => {
                    tracing::warn!("Failed to resolve {} for notification: {}", member_id, err);
                }
            }
        }

        let event = ApprovalEvent::approval_requested(&option.id, &option.name, kind, requested_by);
        self.notifier.notify(recipients, event);
    }
}
