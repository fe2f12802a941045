use crate::auth::{ClientSecretCredential, DeviceCodeCredential};
use crate::config::Settings;
use crate::error::{Error, Result};
use crate::graph::GraphClient;
use crate::graph::models::{AttachmentPage, MessagePage, User};

pub const USER_FIELDS: &[&str] = &["displayName", "mail", "userPrincipalName"];
pub const INBOX_FIELDS: &[&str] = &["from", "isRead", "receivedDateTime", "subject"];
pub const INBOX_PAGE_SIZE: u32 = 25;
pub const INBOX_ORDER: &str = "receivedDateTime DESC";

/// High-level operations the shell needs. Implemented by [`GraphSession`]
/// against the live service and by stubs in tests.
pub trait MailSession {
    /// Bearer token for the configured scopes.
    fn get_user_token(&mut self) -> Result<String>;
    fn get_current_user(&mut self) -> Result<User>;
    /// Newest messages of the inbox, one page.
    fn get_inbox(&mut self) -> Result<MessagePage>;
    fn get_attachments(&mut self, message_id: &str) -> Result<AttachmentPage>;
}

/// The credential and Graph client pair held for the process lifetime.
pub struct GraphSession {
    credential: DeviceCodeCredential,
    client: GraphClient,
    app_credential: Option<ClientSecretCredential>,
}

impl GraphSession {
    /// Build the device-code credential and a Graph client bound to it.
    /// Nothing touches the network until the first token is needed.
    pub fn initialize_user_auth(settings: &Settings) -> Result<Self> {
        let credential = DeviceCodeCredential::new(settings)?;
        let client = GraphClient::new(settings.graph_endpoint.clone())?;
        log::debug!(
            "session ready for tenant {} with scopes {:?}",
            settings.auth_tenant,
            credential.scopes()
        );
        Ok(Self {
            credential,
            client,
            app_credential: None,
        })
    }

    /// Set up the client-secret credential for app-only calls. Needs
    /// `TENANT_ID` and `CLIENT_SECRET`; a second call keeps the existing one.
    pub fn ensure_graph_for_app_only_auth(&mut self, settings: &Settings) -> Result<()> {
        if self.app_credential.is_none() {
            self.app_credential = Some(ClientSecretCredential::new(settings)?);
            log::debug!("app-only credential ready for tenant {:?}", settings.tenant_id);
        }
        Ok(())
    }

    pub fn has_app_only_auth(&self) -> bool {
        self.app_credential.is_some()
    }

    /// Bearer token for the application itself, `.default` scope.
    pub fn get_app_token(&mut self) -> Result<String> {
        match &mut self.app_credential {
            Some(cred) => cred.get_token(),
            None => Err(Error::config("app-only auth is not initialized")),
        }
    }
}

impl MailSession for GraphSession {
    fn get_user_token(&mut self) -> Result<String> {
        self.credential.get_token()
    }

    fn get_current_user(&mut self) -> Result<User> {
        let token = self.credential.get_token()?;
        self.client
            .get(&token, &["me"], &user_query())
    }

    fn get_inbox(&mut self) -> Result<MessagePage> {
        let token = self.credential.get_token()?;
        self.client.get(
            &token,
            &["me", "mailFolders", "inbox", "messages"],
            &inbox_query(),
        )
    }

    fn get_attachments(&mut self, message_id: &str) -> Result<AttachmentPage> {
        let token = self.credential.get_token()?;
        let page: AttachmentPage =
            self.client
                .get(&token, &["me", "messages", message_id, "attachments"], &[])?;
        if page.has_more() {
            log::debug!("message {message_id} has more attachments than one page");
        }
        Ok(page)
    }
}

fn user_query() -> Vec<(&'static str, String)> {
    vec![("$select", USER_FIELDS.join(","))]
}

fn inbox_query() -> Vec<(&'static str, String)> {
    vec![
        ("$select", INBOX_FIELDS.join(",")),
        ("$top", INBOX_PAGE_SIZE.to_string()),
        ("$orderby", INBOX_ORDER.to_string()),
    ]
}
