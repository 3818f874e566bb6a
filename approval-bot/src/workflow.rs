//! Stateless approval workflow over chat interactions.
//!
//! Workflow state is carried entirely in component identifiers
//! (`approve:<device>`, `decline:<device>`, `select_tags:<device>`,
//! `cancel:<device>`); every transition is determined by the identifier the
//! user clicked plus at most one fresh catalog lookup. This survives
//! process restarts between steps at the cost of a benign last-writer-wins
//! race on concurrent approvals.

use crate::discord::{
    Component, InteractionResponse, MessageBody, SelectOption, BUTTON_SECONDARY,
};
use crate::services::controller::ControllerApi;
use std::sync::Arc;

/// Action encoded in an interactive component identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApprovalAction {
    Approve(String),
    Decline(String),
    SelectTags(String),
    Cancel(String),
}

impl ApprovalAction {
    /// Parse a component identifier. Unknown or malformed identifiers
    /// yield `None` and are acknowledged as no-ops, never surfaced as
    /// errors.
    pub fn parse(custom_id: &str) -> Option<Self> {
        let (action, device_id) = custom_id.split_once(':')?;
        if device_id.is_empty() {
            return None;
        }
        match action {
            "approve" => Some(Self::Approve(device_id.to_string())),
            "decline" => Some(Self::Decline(device_id.to_string())),
            "select_tags" => Some(Self::SelectTags(device_id.to_string())),
            "cancel" => Some(Self::Cancel(device_id.to_string())),
            _ => None,
        }
    }
}

pub struct ApprovalWorkflow {
    controller: Arc<dyn ControllerApi>,
    fixed_tags: Option<Vec<String>>,
}

impl ApprovalWorkflow {
    pub fn new(controller: Arc<dyn ControllerApi>, fixed_tags: Option<Vec<String>>) -> Self {
        Self {
            controller,
            fixed_tags,
        }
    }

    /// Handle a message-component interaction, producing the in-place
    /// update for the originating message.
    pub async fn handle_component(
        &self,
        custom_id: &str,
        values: &[String],
        username: &str,
    ) -> InteractionResponse {
        let Some(action) = ApprovalAction::parse(custom_id) else {
            tracing::warn!(custom_id = %custom_id, "Ignoring unrecognized component identifier");
            return InteractionResponse::deferred_update();
        };

        tracing::info!(action = ?action, user = %username, "Component interaction");

        match action {
            ApprovalAction::Approve(device_id) => self.handle_approve(&device_id, username).await,
            ApprovalAction::Decline(device_id) => self.handle_decline(&device_id, username).await,
            ApprovalAction::SelectTags(device_id) => {
                self.handle_selection(&device_id, values, username).await
            }
            ApprovalAction::Cancel(_) => {
                InteractionResponse::update_message(MessageBody::text("🚫 **Cancelled**"))
            }
        }
    }

    async fn handle_approve(&self, device_id: &str, username: &str) -> InteractionResponse {
        // Fixed-tag mode: apply immediately, no selection step.
        if let Some(tags) = &self.fixed_tags {
            return match self.controller.approve(device_id, tags).await {
                Ok(()) => approved_message(username, tags),
                Err(err) => {
                    tracing::error!(device_id = %device_id, error = %err, "Failed to approve device");
                    InteractionResponse::update_message(MessageBody::text(format!(
                        "Failed to approve device: {}",
                        err
                    )))
                }
            };
        }

        match self.controller.available_tags().await {
            Ok(tags) if tags.is_empty() => InteractionResponse::update_message(MessageBody::text(
                "No tags are available to apply. Check the tailnet policy.",
            )),
            Ok(tags) => {
                InteractionResponse::update_message(tag_selection_message(device_id, &tags))
            }
            Err(err) => {
                tracing::error!(error = %err, "Failed to fetch tags");
                // Keep the Approve/Decline prompt intact; only the acting
                // user sees the failure.
                InteractionResponse::channel_message(MessageBody::ephemeral(format!(
                    "Failed to fetch available tags: {}",
                    err
                )))
            }
        }
    }

    async fn handle_decline(&self, device_id: &str, username: &str) -> InteractionResponse {
        match self.controller.decline(device_id).await {
            Ok(()) => InteractionResponse::update_message(MessageBody::text(format!(
                "❌ **Declined** by {}",
                username
            ))),
            Err(err) => {
                tracing::error!(device_id = %device_id, error = %err, "Failed to decline device");
                InteractionResponse::update_message(MessageBody::text(format!(
                    "Failed to decline device: {}",
                    err
                )))
            }
        }
    }

    async fn handle_selection(
        &self,
        device_id: &str,
        values: &[String],
        username: &str,
    ) -> InteractionResponse {
        if values.is_empty() {
            // Discord enforces min_values = 1; an empty submission is stale.
            return InteractionResponse::deferred_update();
        }

        tracing::info!(device_id = %device_id, tags = ?values, user = %username, "Tags selected");

        match self.controller.approve(device_id, values).await {
            Ok(()) => approved_message(username, values),
            Err(err) => {
                tracing::error!(device_id = %device_id, error = %err, "Failed to approve device");
                InteractionResponse::update_message(MessageBody::text(format!(
                    "Failed to approve device: {}",
                    err
                )))
            }
        }
    }
}

fn approved_message(username: &str, tags: &[String]) -> InteractionResponse {
    InteractionResponse::update_message(MessageBody::text(format!(
        "✅ **Approved** by {}\nTags: `{}`",
        username,
        tags.join("`, `")
    )))
}

/// Re-render the approval prompt as a tag picker bound to the same device.
fn tag_selection_message(device_id: &str, tags: &[String]) -> MessageBody {
    let options = tags
        .iter()
        .map(|tag| SelectOption {
            label: tag.clone(),
            value: tag.clone(),
        })
        .collect();

    MessageBody::with_components(
        format!("**Select tags to apply**\nDevice ID: `{}`", device_id),
        vec![
            Component::action_row(vec![Component::select_menu(
                format!("select_tags:{}", device_id),
                "Select tags to apply...",
                options,
            )]),
            Component::action_row(vec![Component::button(
                "Cancel",
                BUTTON_SECONDARY,
                format!("cancel:{}", device_id),
            )]),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discord::{CALLBACK_DEFERRED_UPDATE_MESSAGE, CALLBACK_UPDATE_MESSAGE};
    use crate::services::controller::MockControllerApi;

    fn tags(names: &[&str]) -> Vec<String> {
        names.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn test_parse_known_actions() {
        assert_eq!(
            ApprovalAction::parse("approve:node-1"),
            Some(ApprovalAction::Approve("node-1".to_string()))
        );
        assert_eq!(
            ApprovalAction::parse("decline:node-1"),
            Some(ApprovalAction::Decline("node-1".to_string()))
        );
        assert_eq!(
            ApprovalAction::parse("select_tags:node-1"),
            Some(ApprovalAction::SelectTags("node-1".to_string()))
        );
        assert_eq!(
            ApprovalAction::parse("cancel:node-1"),
            Some(ApprovalAction::Cancel("node-1".to_string()))
        );
    }

    #[test]
    fn test_parse_rejects_malformed_identifiers() {
        assert_eq!(ApprovalAction::parse("approve"), None);
        assert_eq!(ApprovalAction::parse("approve:"), None);
        assert_eq!(ApprovalAction::parse("reboot:node-1"), None);
        assert_eq!(ApprovalAction::parse(""), None);
    }

    #[tokio::test]
    async fn test_decline_calls_controller_and_finalizes_message() {
        let controller = Arc::new(MockControllerApi::default());
        let workflow = ApprovalWorkflow::new(controller.clone(), None);

        let response = workflow.handle_component("decline:node-1", &[], "alice").await;

        assert_eq!(controller.decline_calls(), vec!["node-1"]);
        assert_eq!(response.kind, CALLBACK_UPDATE_MESSAGE);
        let body = response.data.unwrap();
        assert!(body.content.contains("Declined"));
        assert!(body.content.contains("alice"));
        assert!(body.components.is_empty());
    }

    #[tokio::test]
    async fn test_approve_selectable_mode_renders_tag_picker() {
        let controller = Arc::new(
            MockControllerApi::default().with_tags(tags(&["tag:dev", "tag:prod", "tag:ci"])),
        );
        let workflow = ApprovalWorkflow::new(controller.clone(), None);

        let response = workflow.handle_component("approve:node-1", &[], "alice").await;

        assert_eq!(controller.tags_fetches(), 1);
        assert!(controller.approve_calls().is_empty());
        assert_eq!(response.kind, CALLBACK_UPDATE_MESSAGE);

        let body = response.data.unwrap();
        let menu = body
            .components
            .iter()
            .find_map(|c| match c {
                Component::ActionRow { components, .. } => components.iter().find_map(|c| {
                    if let Component::SelectMenu {
                        custom_id,
                        min_values,
                        max_values,
                        options,
                        ..
                    } = c
                    {
                        Some((custom_id.clone(), *min_values, *max_values, options.len()))
                    } else {
                        None
                    }
                }),
                _ => None,
            })
            .expect("expected a select menu");
        assert_eq!(menu, ("select_tags:node-1".to_string(), 1, 3, 3));
    }

    #[tokio::test]
    async fn test_approve_fixed_mode_skips_catalog_and_applies() {
        let controller = Arc::new(MockControllerApi::default());
        let workflow =
            ApprovalWorkflow::new(controller.clone(), Some(tags(&["tag:a", "tag:b"])));

        let response = workflow.handle_component("approve:node-1", &[], "alice").await;

        assert_eq!(controller.tags_fetches(), 0);
        assert_eq!(
            controller.approve_calls(),
            vec![("node-1".to_string(), tags(&["tag:a", "tag:b"]))]
        );
        let body = response.data.unwrap();
        assert!(body.content.contains("Approved"));
        assert!(body.components.is_empty());
    }

    #[tokio::test]
    async fn test_selection_applies_exactly_the_chosen_tags() {
        let controller = Arc::new(MockControllerApi::default());
        let workflow = ApprovalWorkflow::new(controller.clone(), None);

        let chosen = tags(&["tag:dev"]);
        let response = workflow
            .handle_component("select_tags:node-1", &chosen, "bob")
            .await;

        assert_eq!(
            controller.approve_calls(),
            vec![("node-1".to_string(), chosen)]
        );
        let body = response.data.unwrap();
        assert!(body.content.contains("Approved"));
        assert!(body.content.contains("bob"));
        assert!(body.content.contains("tag:dev"));
    }

    #[tokio::test]
    async fn test_cancel_ends_workflow_without_upstream_calls() {
        let controller = Arc::new(MockControllerApi::default());
        let workflow = ApprovalWorkflow::new(controller.clone(), None);

        let response = workflow.handle_component("cancel:node-1", &[], "alice").await;

        assert!(controller.approve_calls().is_empty());
        assert!(controller.decline_calls().is_empty());
        let body = response.data.unwrap();
        assert!(body.content.contains("Cancelled"));
        assert!(body.components.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_identifier_is_a_no_op() {
        let controller = Arc::new(MockControllerApi::default());
        let workflow = ApprovalWorkflow::new(controller.clone(), None);

        let response = workflow.handle_component("garbage", &[], "alice").await;

        assert_eq!(response.kind, CALLBACK_DEFERRED_UPDATE_MESSAGE);
        assert!(controller.approve_calls().is_empty());
        assert!(controller.decline_calls().is_empty());
        assert_eq!(controller.tags_fetches(), 0);
    }

    #[tokio::test]
    async fn test_approve_failure_reports_into_the_message() {
        let controller = Arc::new(MockControllerApi::default());
        controller.fail_approve();
        let workflow = ApprovalWorkflow::new(controller.clone(), None);

        let response = workflow
            .handle_component("select_tags:node-1", &tags(&["tag:dev"]), "bob")
            .await;

        assert_eq!(response.kind, CALLBACK_UPDATE_MESSAGE);
        let body = response.data.unwrap();
        assert!(body.content.contains("Failed to approve device"));
    }
}
