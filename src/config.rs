use secrecy::Secret;

const DEFAULT_DATABASE_URL: &str = "sqlite://gospeltube.db";
const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:3001";
const DEFAULT_PUBLIC_BASE_URL: &str = "http://localhost:3001";

/// Credentials for the transactional mail API.
#[derive(Clone, Debug)]
pub struct EmailSettings {
    pub base_url: String,
    pub sender: String,
    pub token: Secret<String>,
}

/// Account created at startup when the store has no admin yet.
#[derive(Clone, Debug)]
pub struct AdminSeed {
    pub username: String,
    pub email: String,
    pub password: Secret<String>,
}

#[derive(Clone, Debug)]
pub struct Settings {
    pub database_url: String,
    pub bind_address: String,
    pub public_base_url: String,
    pub session_secure: bool,
    pub email: Option<EmailSettings>,
    pub admin_seed: Option<AdminSeed>,
}

impl Settings {
    /// Reads `.env` (if present) and then the process environment.
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let email = match (
            non_empty("EMAIL_BASE_URL"),
            non_empty("EMAIL_SENDER"),
            non_empty("EMAIL_TOKEN"),
        ) {
            (Some(base_url), Some(sender), Some(token)) => Some(EmailSettings {
                base_url: base_url.trim_end_matches('/').to_string(),
                sender,
                token: Secret::new(token),
            }),
            _ => None,
        };

        let admin_seed = match (
            non_empty("ADMIN_USERNAME"),
            non_empty("ADMIN_EMAIL"),
            non_empty("ADMIN_PASSWORD"),
        ) {
            (Some(username), Some(email), Some(password)) => Some(AdminSeed {
                username,
                email,
                password: Secret::new(password),
            }),
            _ => None,
        };

        Self {
            database_url: non_empty("DATABASE_URL")
                .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            bind_address: non_empty("BIND_ADDRESS")
                .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string()),
            public_base_url: non_empty("PUBLIC_BASE_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_PUBLIC_BASE_URL.to_string()),
            session_secure: non_empty("SESSION_SECURE")
                .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(false),
            email,
            admin_seed,
        }
    }
}
