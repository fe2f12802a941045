//! Microsoft Graph resources read by the client.
//!
//! Graph may omit any property depending on `$select`, so every field is
//! optional.

use chrono::{DateTime, Utc};
use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub display_name: Option<String>,
    pub mail: Option<String>,
    pub user_principal_name: Option<String>,
}

impl User {
    /// Work/school accounts carry the address in `mail`; personal accounts
    /// only in `userPrincipalName`.
    pub fn email(&self) -> Option<&str> {
        self.mail
            .as_deref()
            .or(self.user_principal_name.as_deref())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EmailAddress {
    pub name: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipient {
    pub email_address: Option<EmailAddress>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: Option<String>,
    pub subject: Option<String>,
    pub from: Option<Recipient>,
    pub is_read: Option<bool>,
    pub received_date_time: Option<DateTime<Utc>>,
}

impl Message {
    pub fn sender_name(&self) -> Option<&str> {
        self.from
            .as_ref()
            .and_then(|r| r.email_address.as_ref())
            .and_then(|a| a.name.as_deref().or(a.address.as_deref()))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    /// e.g. `#microsoft.graph.fileAttachment`
    #[serde(rename = "@odata.type")]
    pub odata_type: Option<String>,
    pub id: Option<String>,
    pub name: Option<String>,
    pub content_type: Option<String>,
    pub size: Option<i64>,
    pub is_inline: Option<bool>,
}

/// One page of a Graph collection.
#[derive(Debug, Clone, Deserialize)]
pub struct Collection<T> {
    #[serde(default = "Vec::new")]
    pub value: Vec<T>,
    #[serde(rename = "@odata.nextLink")]
    pub next_link: Option<String>,
}

impl<T> Default for Collection<T> {
    fn default() -> Self {
        Self {
            value: Vec::new(),
            next_link: None,
        }
    }
}

impl<T> Collection<T> {
    pub fn new(value: Vec<T>) -> Self {
        Self {
            value,
            next_link: None,
        }
    }

    /// Continuation indicator: more results exist on the server.
    pub fn has_more(&self) -> bool {
        self.next_link.is_some()
    }
}

pub type MessagePage = Collection<Message>;
pub type AttachmentPage = Collection<Attachment>;

/// Graph error envelope: `{"error": {"code": "...", "message": "..."}}`
#[derive(Debug, Deserialize)]
pub struct ErrorEnvelope {
    pub error: ErrorBody,
}

#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
}
