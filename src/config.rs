use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MailConfig {
    pub server: String,
    pub port: u16,
    pub use_tls: bool,
    pub username: Option<String>,
    pub password: Option<String>,
    pub default_sender: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    /// Base URL used when building password-reset links sent by email.
    pub public_base_url: String,
    /// Directory holding the bundled frontend served on unmatched routes.
    pub static_dir: String,
    pub jwt: JwtConfig,
    pub mail: MailConfig,
}

fn env_truthy(name: &str, default: bool) -> bool {
    std::env::var(name)
        .map(|v| matches!(v.to_lowercase().as_str(), "true" | "yes" | "1"))
        .unwrap_or(default)
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URI")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET_KEY")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "gatehouse".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "gatehouse-users".into()),
            ttl_minutes: std::env::var("JWT_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(60),
        };
        let username = std::env::var("MAIL_USERNAME").ok();
        let mail = MailConfig {
            server: std::env::var("MAIL_SERVER").unwrap_or_else(|_| "smtp.gmail.com".into()),
            port: std::env::var("MAIL_PORT")
                .ok()
                .and_then(|v| v.parse::<u16>().ok())
                .unwrap_or(587),
            use_tls: env_truthy("MAIL_USE_TLS", true),
            password: std::env::var("MAIL_PASSWORD").ok(),
            default_sender: std::env::var("MAIL_DEFAULT_SENDER")
                .ok()
                .or_else(|| username.clone()),
            username,
        };
        Ok(Self {
            database_url,
            public_base_url: std::env::var("PUBLIC_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:8080".into()),
            static_dir: std::env::var("STATIC_DIR").unwrap_or_else(|_| "build".into()),
            jwt,
            mail,
        })
    }
}
