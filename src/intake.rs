//! Lead intake: validate, normalize, persist, notify.
//!
//! Flow for one submission:
//! 1. Fail with a configuration error if no sink is configured.
//! 2. Reject submissions without a name or email.
//! 3. Normalize loosely typed form fields into a [`Lead`].
//! 4. Insert exactly one row into the sink (terminal on failure, no retry).
//! 5. Best-effort notification; its outcome is logged and reported, never fatal.

use crate::config::Config;
use crate::errors::AppError;
use crate::models::{Lead, QuoteRequest, SubmissionAck};
use crate::notifier::{self, Notifier};
use crate::sink::{LeadSink, SupabaseLeadSink};
use serde_json::Value;
use std::sync::Arc;

pub const MISSING_NAME_OR_EMAIL: &str = "Missing name or email";
pub const SINK_NOT_CONFIGURED: &str =
    "Supabase env vars missing. Set SUPABASE_URL and SUPABASE_SERVICE_ROLE_KEY (or SUPABASE_ANON_KEY).";

/// The quote-request service. Gateways are fixed at construction.
#[derive(Clone, Default)]
pub struct LeadIntakeService {
    sink: Option<Arc<dyn LeadSink>>,
    notifier: Option<Arc<dyn Notifier>>,
}

impl LeadIntakeService {
    pub fn new(sink: Option<Arc<dyn LeadSink>>, notifier: Option<Arc<dyn Notifier>>) -> Self {
        Self { sink, notifier }
    }

    /// Wires the gateways the configuration has credentials for.
    ///
    /// A notifier that fails to build is logged and left out; it must not keep
    /// leads from being stored.
    pub fn from_config(config: &Config) -> Result<Self, AppError> {
        let sink = match config.sink_credentials() {
            Some(credentials) => {
                Some(Arc::new(SupabaseLeadSink::new(&credentials)?) as Arc<dyn LeadSink>)
            }
            None => None,
        };

        let notifier = config.notifier_settings().and_then(|settings| {
            match notifier::from_settings(&settings) {
                Ok(n) => {
                    tracing::info!("✓ Notifier initialized: {}", n.provider());
                    Some(n)
                }
                Err(e) => {
                    tracing::error!("Failed to initialize notifier: {}", e);
                    None
                }
            }
        });

        Ok(Self::new(sink, notifier))
    }

    pub fn has_sink(&self) -> bool {
        self.sink.is_some()
    }

    pub fn has_notifier(&self) -> bool {
        self.notifier.is_some()
    }

    /// Processes one quote submission.
    pub async fn submit_lead(&self, request: QuoteRequest) -> Result<SubmissionAck, AppError> {
        let sink = self
            .sink
            .as_ref()
            .ok_or_else(|| AppError::Configuration(SINK_NOT_CONFIGURED.to_string()))?;

        let lead = normalize_lead(&request.lead)?;

        sink.insert(&lead).await?;
        tracing::info!("Lead stored for {}", lead.email);

        let notified = match &self.notifier {
            Some(notifier) => match notifier.notify(&lead).await {
                Ok(()) => {
                    tracing::info!("Sales notification sent via {}", notifier.provider());
                    Some(true)
                }
                Err(e) => {
                    tracing::warn!(
                        "Sales notification via {} failed (lead already saved): {}",
                        notifier.provider(),
                        e
                    );
                    Some(false)
                }
            },
            None => None,
        };

        Ok(SubmissionAck { ok: true, notified })
    }
}

/// Validates and normalizes the raw `lead` object of a submission.
///
/// A non-object `lead` is treated as empty and therefore fails validation.
pub fn normalize_lead(raw: &Value) -> Result<Lead, AppError> {
    let field = |key: &str| raw.get(key);

    let (name, email) = match (coerce_text(field("name")), coerce_text(field("email"))) {
        (Some(name), Some(email)) => (name, email),
        _ => return Err(AppError::Validation(MISSING_NAME_OR_EMAIL.to_string())),
    };

    Ok(Lead {
        name,
        email,
        phone: coerce_text(field("phone")),
        dates: coerce_text(field("dates")),
        adults: coerce_count("adults", field("adults"))?,
        children: coerce_count("children", field("children"))?.unwrap_or(0),
        budget: coerce_text(field("budget")),
        style: coerce_text(field("style")),
        interests: coerce_tags(field("interests")),
    })
}

/// Trimmed text for strings, numbers and `true`; `None` for everything else
/// and for values that are blank after trimming.
fn coerce_text(value: Option<&Value>) -> Option<String> {
    let text = match value? {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(true) => "true".to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

/// Whole numbers (or their decimal text) pass through; null means absent.
/// Anything else is rejected rather than rewritten.
fn coerce_count(key: &str, value: Option<&Value>) -> Result<Option<i64>, AppError> {
    let count = match value {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Number(n)) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                .map(|f| f as i64)
        }),
        Some(Value::String(s)) => s.trim().parse().ok(),
        Some(_) => None,
    };
    count
        .map(Some)
        .ok_or_else(|| AppError::Validation(format!("Invalid {}: expected a whole number", key)))
}

fn coerce_tags(value: Option<&Value>) -> Option<Vec<String>> {
    match value? {
        Value::Array(items) => Some(
            items
                .iter()
                .map(|item| match item {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect(),
        ),
        _ => None,
    }
}
