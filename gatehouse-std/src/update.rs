//! Bundled chat-bot event model.
//!
//! [`Update`] is a closed set of inbound variants. Each variant may carry the
//! [`User`] it originated from; the serde shape follows the usual bot API
//! layout, with the variant name as the outer key:
//!
//! ```json
//! { "message": { "message_id": 7, "from": { "id": 42, "username": "ann" }, "text": "hi" } }
//! ```

use gatehouse_core::Event;
use serde::{Deserialize, Serialize};

/// The account an update originated from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Stable numeric identifier.
    pub id: i64,
    /// Public handle, if the user has one.
    #[serde(default)]
    pub username: Option<String>,
}

impl User {
    /// A user with an id and a username.
    pub fn new(id: i64, username: impl Into<String>) -> Self {
        Self {
            id,
            username: Some(username.into()),
        }
    }

    /// A user without a public handle.
    pub fn anonymous(id: i64) -> Self {
        Self { id, username: None }
    }
}

/// A chat message (new or edited).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Message identifier within its chat.
    pub message_id: i64,
    /// Sender, absent for channel posts.
    #[serde(default)]
    pub from: Option<User>,
    /// Text body, absent for media-only messages.
    #[serde(default)]
    pub text: Option<String>,
}

/// A press on an inline keyboard button.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallbackQuery {
    /// Query identifier.
    pub id: String,
    /// The user who pressed the button.
    #[serde(default)]
    pub from: Option<User>,
    /// Data attached to the button.
    #[serde(default)]
    pub data: Option<String>,
}

/// Text typed after the bot's handle in any chat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InlineQuery {
    /// Query identifier.
    pub id: String,
    /// The user who typed the query.
    #[serde(default)]
    pub from: Option<User>,
    /// The query text.
    pub query: String,
}

/// Any update kind without a dedicated variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtherUpdate {
    /// Name of the update kind, e.g. `"chat_member"`.
    pub kind: String,
    /// Originating user, when the update has one.
    #[serde(default)]
    pub from: Option<User>,
}

/// One inbound unit of work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Update {
    /// A new message.
    Message(Message),
    /// A new version of a message that was edited.
    EditedMessage(Message),
    /// An inline keyboard button press.
    CallbackQuery(CallbackQuery),
    /// An inline query.
    InlineQuery(InlineQuery),
    /// Anything else.
    Other(OtherUpdate),
}

impl Event for Update {}

impl Update {
    /// The user the update originated from, if any.
    pub fn from_user(&self) -> Option<&User> {
        match self {
            Update::Message(m) | Update::EditedMessage(m) => m.from.as_ref(),
            Update::CallbackQuery(q) => q.from.as_ref(),
            Update::InlineQuery(q) => q.from.as_ref(),
            Update::Other(o) => o.from.as_ref(),
        }
    }

    /// Short name of the variant, as used in the serialized form.
    pub fn kind(&self) -> &str {
        match self {
            Update::Message(_) => "message",
            Update::EditedMessage(_) => "edited_message",
            Update::CallbackQuery(_) => "callback_query",
            Update::InlineQuery(_) => "inline_query",
            Update::Other(o) => &o.kind,
        }
    }
}

/// Normalized description of what a user did.
///
/// Every field is optional: events without an originating user produce an
/// empty record, and unrecognized variants produce no action.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserAction {
    /// Originating user id.
    pub user_id: Option<i64>,
    /// Originating username.
    pub username: Option<String>,
    /// Variant-specific description of the action.
    pub action: Option<String>,
}

/// Events that can describe the user activity they carry.
pub trait ActivitySource {
    /// Extract the user action carried by this event.
    fn user_action(&self) -> UserAction;
}

/// Stands in for a message text or callback data the event does not carry.
pub const MISSING_PAYLOAD: &str = "<none>";

impl ActivitySource for Update {
    fn user_action(&self) -> UserAction {
        let Some(user) = self.from_user() else {
            return UserAction::default();
        };

        let action = match self {
            Update::Message(m) | Update::EditedMessage(m) => {
                Some(format!("Message: {}", m.text.as_deref().unwrap_or(MISSING_PAYLOAD)))
            }
            Update::CallbackQuery(q) => {
                Some(format!("Callback: {}", q.data.as_deref().unwrap_or(MISSING_PAYLOAD)))
            }
            Update::InlineQuery(q) => Some(format!("Inline query: {}", q.query)),
            Update::Other(_) => None,
        };

        UserAction {
            user_id: Some(user.id),
            username: user.username.clone(),
            action,
        }
    }
}

impl<T: ActivitySource> ActivitySource for std::sync::Arc<T> {
    fn user_action(&self) -> UserAction {
        (**self).user_action()
    }
}
