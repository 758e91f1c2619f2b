/// Default submission port used by STARTTLS relays.
pub const DEFAULT_SMTP_PORT: u16 = 587;

/// Raw deployment configuration.
///
/// Every backend credential is optional: an absent value switches the
/// corresponding capability off instead of failing startup. Only malformed
/// values abort.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub port: u16,
    /// Server-side project URL used by the lead sink.
    pub supabase_url: Option<String>,
    /// Browser-facing project URL used by login and the vault.
    pub supabase_public_url: Option<String>,
    pub supabase_service_role_key: Option<String>,
    pub supabase_anon_key: Option<String>,
    pub resend_api_key: Option<String>,
    pub smtp: Option<SmtpConfig>,
    pub sales_inbox: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub pass: String,
}

/// Which key the lead sink authenticates with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyRole {
    ServiceRole,
    Anon,
}

/// Endpoint and credential for the `leads` row store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkCredentials {
    pub url: String,
    pub key: String,
    pub role: KeyRole,
}

/// Endpoint and anonymous key used by the login and vault capabilities.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicAuthConfig {
    pub url: String,
    pub anon_key: String,
}

/// The single notification provider selected for this deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifierSettings {
    Resend { api_key: String, sales_inbox: String },
    Smtp { smtp: SmtpConfig, sales_inbox: String },
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self::from_lookup(|key| std::env::var(key).ok())?;

        // Log capability summary (without sensitive values)
        tracing::info!("Configuration loaded successfully");
        tracing::debug!("Server Port: {}", config.port);
        match config.sink_credentials() {
            Some(sink) => tracing::info!("Lead sink configured ({:?} key)", sink.role),
            None => tracing::warn!("Lead sink not configured; quote submissions will fail"),
        }
        match config.notifier_settings() {
            Some(NotifierSettings::Resend { .. }) => tracing::info!("Notifications via Resend"),
            Some(NotifierSettings::Smtp { ref smtp, .. }) => {
                tracing::info!("Notifications via SMTP {}:{}", smtp.host, smtp.port)
            }
            None => tracing::info!("Notifications disabled"),
        }
        if config.public_auth().is_none() {
            tracing::info!("Login and vault disabled (Supabase URL or anon key missing)");
        }

        Ok(config)
    }

    /// Builds the configuration from an arbitrary variable source.
    ///
    /// Blank values are treated as absent.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let supabase_url = var("SUPABASE_URL")
            .or_else(|| var("NEXT_PUBLIC_SUPABASE_URL"))
            .map(|url| parse_project_url(&url))
            .transpose()?;
        let supabase_public_url = var("NEXT_PUBLIC_SUPABASE_URL")
            .or_else(|| var("SUPABASE_URL"))
            .map(|url| parse_project_url(&url))
            .transpose()?;

        let smtp = match (var("SMTP_HOST"), var("SMTP_USER"), var("SMTP_PASS")) {
            (Some(host), Some(user), Some(pass)) => Some(SmtpConfig {
                host,
                port: var("SMTP_PORT")
                    .map(|p| {
                        p.parse().map_err(|_| {
                            anyhow::anyhow!("SMTP_PORT must be a valid number between 1-65535")
                        })
                    })
                    .transpose()?
                    .unwrap_or(DEFAULT_SMTP_PORT),
                user,
                pass,
            }),
            _ => None,
        };

        Ok(Self {
            port: var("PORT")
                .unwrap_or_else(|| "3000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number between 1-65535"))?,
            supabase_url,
            supabase_public_url,
            supabase_service_role_key: var("SUPABASE_SERVICE_ROLE_KEY"),
            supabase_anon_key: var("NEXT_PUBLIC_SUPABASE_ANON_KEY")
                .or_else(|| var("SUPABASE_ANON_KEY")),
            resend_api_key: var("RESEND_API_KEY"),
            smtp,
            sales_inbox: var("SALES_INBOX"),
        })
    }

    /// Sink endpoint and key, preferring the service-role key over the anon key.
    pub fn sink_credentials(&self) -> Option<SinkCredentials> {
        let url = self.supabase_url.clone()?;
        if let Some(key) = &self.supabase_service_role_key {
            return Some(SinkCredentials {
                url,
                key: key.clone(),
                role: KeyRole::ServiceRole,
            });
        }
        self.supabase_anon_key.clone().map(|key| SinkCredentials {
            url,
            key,
            role: KeyRole::Anon,
        })
    }

    /// Resend wins over SMTP; both need a sales inbox to send anything.
    pub fn notifier_settings(&self) -> Option<NotifierSettings> {
        let sales_inbox = self.sales_inbox.clone()?;
        if let Some(api_key) = &self.resend_api_key {
            return Some(NotifierSettings::Resend {
                api_key: api_key.clone(),
                sales_inbox,
            });
        }
        self.smtp.clone().map(|smtp| NotifierSettings::Smtp { smtp, sales_inbox })
    }

    pub fn public_auth(&self) -> Option<PublicAuthConfig> {
        Some(PublicAuthConfig {
            url: self.supabase_public_url.clone()?,
            anon_key: self.supabase_anon_key.clone()?,
        })
    }
}

/// Project URLs must be absolute http(s); the trailing slash is dropped.
fn parse_project_url(url: &str) -> anyhow::Result<String> {
    if !url.starts_with("http://") && !url.starts_with("https://") {
        anyhow::bail!("Supabase URL must start with http:// or https://");
    }
    url::Url::parse(url).map_err(|e| anyhow::anyhow!("Supabase URL is not valid: {}", e))?;
    Ok(url.trim_end_matches('/').to_string())
}
