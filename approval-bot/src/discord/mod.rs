//! Discord interaction wire types.
//!
//! Only the fields this bot reads or writes are modeled; see the Discord
//! developer docs for the full shapes.

pub mod verify;

use serde::{Deserialize, Serialize};

pub use verify::InteractionVerifier;

// Interaction types.
pub const INTERACTION_PING: u8 = 1;
pub const INTERACTION_APPLICATION_COMMAND: u8 = 2;
pub const INTERACTION_MESSAGE_COMPONENT: u8 = 3;

// Interaction callback types.
pub const CALLBACK_PONG: u8 = 1;
pub const CALLBACK_CHANNEL_MESSAGE: u8 = 4;
pub const CALLBACK_DEFERRED_UPDATE_MESSAGE: u8 = 6;
pub const CALLBACK_UPDATE_MESSAGE: u8 = 7;

// Component types.
const COMPONENT_ACTION_ROW: u8 = 1;
const COMPONENT_BUTTON: u8 = 2;
const COMPONENT_SELECT_MENU: u8 = 3;

// Button styles.
pub const BUTTON_SECONDARY: u8 = 2;
pub const BUTTON_SUCCESS: u8 = 3;
pub const BUTTON_DANGER: u8 = 4;

/// Only the acting user sees the message.
pub const MESSAGE_FLAG_EPHEMERAL: u64 = 1 << 6;

/// An inbound interaction delivered to the webhook endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct Interaction {
    #[serde(rename = "type")]
    pub kind: u8,
    #[serde(default)]
    pub data: Option<InteractionData>,
    #[serde(default)]
    pub member: Option<GuildMember>,
    #[serde(default)]
    pub user: Option<User>,
    #[serde(default)]
    pub channel_id: Option<String>,
}

impl Interaction {
    /// Display name of the acting user, wherever Discord put it.
    pub fn username(&self) -> &str {
        self.member
            .as_ref()
            .map(|m| &m.user)
            .or(self.user.as_ref())
            .map(|u| u.username.as_str())
            .unwrap_or("unknown")
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct InteractionData {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub custom_id: Option<String>,
    #[serde(default)]
    pub values: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GuildMember {
    pub user: User,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub username: String,
}

/// The synchronous response to an interaction delivery.
#[derive(Debug, Clone, Serialize)]
pub struct InteractionResponse {
    #[serde(rename = "type")]
    pub kind: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<MessageBody>,
}

impl InteractionResponse {
    pub fn pong() -> Self {
        Self {
            kind: CALLBACK_PONG,
            data: None,
        }
    }

    /// Post a new message in response to the interaction.
    pub fn channel_message(body: MessageBody) -> Self {
        Self {
            kind: CALLBACK_CHANNEL_MESSAGE,
            data: Some(body),
        }
    }

    /// Rewrite the originating message in place.
    pub fn update_message(body: MessageBody) -> Self {
        Self {
            kind: CALLBACK_UPDATE_MESSAGE,
            data: Some(body),
        }
    }

    /// Acknowledge without changing anything.
    pub fn deferred_update() -> Self {
        Self {
            kind: CALLBACK_DEFERRED_UPDATE_MESSAGE,
            data: None,
        }
    }
}

/// Body of an outbound message, message edit, or interaction callback.
#[derive(Debug, Clone, Serialize)]
pub struct MessageBody {
    pub content: String,
    pub components: Vec<Component>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flags: Option<u64>,
}

impl MessageBody {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            components: Vec::new(),
            flags: None,
        }
    }

    pub fn with_components(content: impl Into<String>, components: Vec<Component>) -> Self {
        Self {
            content: content.into(),
            components,
            flags: None,
        }
    }

    pub fn ephemeral(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            components: Vec::new(),
            flags: Some(MESSAGE_FLAG_EPHEMERAL),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Component {
    ActionRow {
        #[serde(rename = "type")]
        kind: u8,
        components: Vec<Component>,
    },
    Button {
        #[serde(rename = "type")]
        kind: u8,
        style: u8,
        label: String,
        custom_id: String,
    },
    SelectMenu {
        #[serde(rename = "type")]
        kind: u8,
        custom_id: String,
        placeholder: String,
        min_values: u8,
        max_values: u8,
        options: Vec<SelectOption>,
    },
}

impl Component {
    pub fn action_row(components: Vec<Component>) -> Self {
        Component::ActionRow {
            kind: COMPONENT_ACTION_ROW,
            components,
        }
    }

    pub fn button(label: impl Into<String>, style: u8, custom_id: impl Into<String>) -> Self {
        Component::Button {
            kind: COMPONENT_BUTTON,
            style,
            label: label.into(),
            custom_id: custom_id.into(),
        }
    }

    /// Multi-select menu requiring at least one choice, allowing all.
    pub fn select_menu(
        custom_id: impl Into<String>,
        placeholder: impl Into<String>,
        options: Vec<SelectOption>,
    ) -> Self {
        let max_values = options.len() as u8;
        Component::SelectMenu {
            kind: COMPONENT_SELECT_MENU,
            custom_id: custom_id.into(),
            placeholder: placeholder.into(),
            min_values: 1,
            max_values,
            options,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SelectOption {
    pub label: String,
    pub value: String,
}

/// Slash command registration payload.
#[derive(Debug, Clone, Serialize)]
pub struct CommandSpec {
    pub name: String,
    pub description: String,
}
