//! Sales-inbox notifications for new leads.
//!
//! Exactly one provider is active per deployment, picked from configuration
//! at startup by [`from_settings`]. Callers treat every failure as non-fatal.

use crate::config::{NotifierSettings, SmtpConfig};
use crate::models::Lead;
use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use serde_json::json;
use std::fmt;
use std::sync::Arc;

pub const RESEND_API_URL: &str = "https://api.resend.com";
pub const RESEND_SENDER: &str = "LEXVOYAGE <notify@lexvoyage.app>";
const SENDER_NAME: &str = "LEXVOYAGE";
const SMTPS_PORT: u16 = 465;
const MISSING: &str = "&mdash;";

#[derive(Debug)]
pub enum NotificationError {
    /// Sender or recipient address could not be parsed.
    InvalidAddress(String),
    /// The message could not be assembled.
    Build(String),
    /// The provider could not be reached.
    Transport(String),
    /// The provider answered with a failure status.
    Rejected { status: u16, body: String },
}

impl fmt::Display for NotificationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotificationError::InvalidAddress(msg) => write!(f, "Invalid address: {}", msg),
            NotificationError::Build(msg) => write!(f, "Failed to build message: {}", msg),
            NotificationError::Transport(msg) => write!(f, "Transport error: {}", msg),
            NotificationError::Rejected { status, body } => {
                write!(f, "Provider rejected message ({}): {}", status, body)
            }
        }
    }
}

impl std::error::Error for NotificationError {}

/// Sends the new-lead summary to the sales inbox.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Provider name for logs.
    fn provider(&self) -> &'static str;

    async fn notify(&self, lead: &Lead) -> Result<(), NotificationError>;
}

/// Builds the configured provider.
pub fn from_settings(settings: &NotifierSettings) -> Result<Arc<dyn Notifier>, NotificationError> {
    match settings {
        NotifierSettings::Resend {
            api_key,
            sales_inbox,
        } => Ok(Arc::new(ResendNotifier::new(
            api_key.clone(),
            sales_inbox.clone(),
        )?)),
        NotifierSettings::Smtp { smtp, sales_inbox } => {
            Ok(Arc::new(SmtpNotifier::new(smtp, sales_inbox)?))
        }
    }
}

pub fn subject(lead: &Lead) -> String {
    format!("New quote request - {}", lead.name)
}

/// Escapes the characters that matter inside HTML text and attribute values.
pub fn escape_html(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            other => escaped.push(other),
        }
    }
    escaped
}

fn or_missing(value: Option<&str>) -> String {
    value.map(escape_html).unwrap_or_else(|| MISSING.to_string())
}

/// Fixed HTML summary of a normalized lead.
pub fn render_html(lead: &Lead) -> String {
    let adults = lead
        .adults
        .map(|a| a.to_string())
        .unwrap_or_else(|| "?".to_string());
    let interests = lead
        .interests
        .as_ref()
        .filter(|tags| !tags.is_empty())
        .map(|tags| escape_html(&tags.join(", ")))
        .unwrap_or_else(|| MISSING.to_string());

    format!(
        "<h2>New quote request</h2>\n\
         <p><b>Name:</b> {}</p>\n\
         <p><b>Email:</b> {}</p>\n\
         <p><b>Phone:</b> {}</p>\n\
         <p><b>Dates:</b> {}</p>\n\
         <p><b>Travellers:</b> {} adults, {} children</p>\n\
         <p><b>Budget:</b> {}</p>\n\
         <p><b>Style:</b> {}</p>\n\
         <p><b>Interests:</b> {}</p>\n",
        escape_html(&lead.name),
        escape_html(&lead.email),
        or_missing(lead.phone.as_deref()),
        or_missing(lead.dates.as_deref()),
        adults,
        lead.children,
        or_missing(lead.budget.as_deref()),
        or_missing(lead.style.as_deref()),
        interests,
    )
}

/// Submitter address to reply to, if it is a syntactically valid mailbox.
fn reply_to_address(email: &str) -> Option<Address> {
    match email.parse::<Address>() {
        Ok(address) => Some(address),
        Err(e) => {
            tracing::debug!("Skipping Reply-To for unparsable address: {}", e);
            None
        }
    }
}

// ============ Resend ============

/// Provider A: Resend HTTP API.
#[derive(Clone)]
pub struct ResendNotifier {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    sales_inbox: String,
}

impl ResendNotifier {
    pub fn new(api_key: String, sales_inbox: String) -> Result<Self, NotificationError> {
        Self::with_base_url(RESEND_API_URL.to_string(), api_key, sales_inbox)
    }

    pub fn with_base_url(
        base_url: String,
        api_key: String,
        sales_inbox: String,
    ) -> Result<Self, NotificationError> {
        let client = reqwest::Client::builder().build().map_err(|e| {
            NotificationError::Build(format!("Failed to create Resend client: {}", e))
        })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            sales_inbox,
        })
    }
}

#[async_trait]
impl Notifier for ResendNotifier {
    fn provider(&self) -> &'static str {
        "resend"
    }

    async fn notify(&self, lead: &Lead) -> Result<(), NotificationError> {
        let mut body = json!({
            "from": RESEND_SENDER,
            "to": [self.sales_inbox],
            "subject": subject(lead),
            "html": render_html(lead),
        });
        if let Some(reply_to) = reply_to_address(&lead.email) {
            body["reply_to"] = json!(reply_to.to_string());
        }

        let response = self
            .client
            .post(format!("{}/emails", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| NotificationError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(NotificationError::Rejected { status, body });
        }

        Ok(())
    }
}

// ============ SMTP ============

/// Provider B: authenticated SMTP relay.
pub struct SmtpNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Mailbox,
}

impl SmtpNotifier {
    /// Port 465 gets implicit TLS, every other port STARTTLS.
    pub fn new(smtp: &SmtpConfig, sales_inbox: &str) -> Result<Self, NotificationError> {
        let builder = if smtp.port == SMTPS_PORT {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&smtp.host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&smtp.host)
        }
        .map_err(|e| NotificationError::Build(format!("Invalid SMTP relay: {}", e)))?;

        let transport = builder
            .port(smtp.port)
            .credentials(Credentials::new(smtp.user.clone(), smtp.pass.clone()))
            .build();

        let from = format!("{} <{}>", SENDER_NAME, smtp.user)
            .parse::<Mailbox>()
            .map_err(|e| NotificationError::InvalidAddress(format!("SMTP_USER: {}", e)))?;
        let to = sales_inbox
            .parse::<Mailbox>()
            .map_err(|e| NotificationError::InvalidAddress(format!("SALES_INBOX: {}", e)))?;

        Ok(Self {
            transport,
            from,
            to,
        })
    }

    fn build_message(&self, lead: &Lead) -> Result<Message, NotificationError> {
        let mut builder = Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .subject(subject(lead))
            .header(ContentType::TEXT_HTML);
        if let Some(reply_to) = reply_to_address(&lead.email) {
            builder = builder.reply_to(Mailbox::new(Some(lead.name.clone()), reply_to));
        }

        builder
            .body(render_html(lead))
            .map_err(|e| NotificationError::Build(e.to_string()))
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    fn provider(&self) -> &'static str {
        "smtp"
    }

    async fn notify(&self, lead: &Lead) -> Result<(), NotificationError> {
        let message = self.build_message(lead)?;
        self.transport
            .send(message)
            .await
            .map_err(|e| NotificationError::Transport(e.to_string()))?;
        Ok(())
    }
}
