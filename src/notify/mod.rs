//! Best-effort push notification of approval events.
//!
//! Delivery is fire-and-forget: sends are spawned off the request path and
//! failures are logged, never surfaced to the caller.

use std::time::Duration;

use serde::Serialize;

use crate::models::{ActionKind, Member};

/// Event pushed to members whose approval is needed.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalEvent {
    pub event: &'static str,
    pub option_id: String,
    pub option_name: String,
    pub kind: ActionKind,
    pub requested_by: String,
}

impl ApprovalEvent {
    pub fn approval_requested(
        option_id: &str,
        option_name: &str,
        kind: ActionKind,
        requested_by: &str,
    ) -> Self {
        Self {
            event: "approvalRequested",
            option_id: option_id.to_string(),
            option_name: option_name.to_string(),
            kind,
            requested_by: requested_by.to_string(),
        }
    }
}

/// Pushes events to members' notification endpoints over HTTP.
pub struct Notifier {
    client: reqwest::Client,
}

impl Notifier {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap_or_default();
        Self { client }
    }

    /// Fan the event out to every recipient that has an endpoint configured.
    /// Returns immediately; delivery happens on spawned tasks.
    pub fn notify(&self, recipients: Vec<Member>, event: ApprovalEvent) {
        for member in recipients {
            let Some(endpoint) = member.endpoint else {
                continue;
            };

            let client = self.client.clone();
            let event = event.clone();
            let member_id = member.id;
            tokio::spawn(async move {
                match client.post(&endpoint).json(&event).send().await {
                    Ok(resp) if resp.status().is_success() => {}
                    Ok(resp) => {
                        tracing::warn!(
                            "Notification to {} returned status {}",
                            member_id,
                            resp.status()
                        );
                    }
                    Err(err) => {
                        tracing::warn!("Failed to notify {}: {}", member_id, err);
                    }
                }
            });
        }
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new()
    }
}
