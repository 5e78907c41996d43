use serde::Deserialize;
use std::{env, fmt, fs, path::Path, path::PathBuf};

use crate::auth::{DEFAULT_TOKEN_HEADER, HashCost};

/// Environment variable that overrides the configured signing secret.
pub const SECRET_KEY_ENV: &str = "SECRET_KEY";

/// Longest accepted token lifetime (100 years).
pub const MAX_TOKEN_TTL_SECONDS: u64 = 100 * 365 * 24 * 60 * 60;

/// Settings for the auth pipeline.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct AuthSettings {
    /// Process-wide token signing secret
    pub secret_key: String,
    /// Header carrying the identity token
    pub token_header: String,
    /// Token lifetime; tokens never expire when unset
    pub token_ttl_seconds: Option<u64>,
    /// Credential hashing work factor
    pub hash_cost: HashCost,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            secret_key: String::new(),
            token_header: DEFAULT_TOKEN_HEADER.to_string(),
            token_ttl_seconds: None,
            hash_cost: HashCost::default(),
        }
    }
}

impl fmt::Debug for AuthSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthSettings")
            .field("secret_key", &"<redacted>")
            .field("token_header", &self.token_header)
            .field("token_ttl_seconds", &self.token_ttl_seconds)
            .field("hash_cost", &self.hash_cost)
            .finish()
    }
}

impl AuthSettings {
    pub fn with_secret(secret_key: impl Into<String>) -> Self {
        Self {
            secret_key: secret_key.into(),
            ..Default::default()
        }
    }

    /// Parse settings from JSON, expanding `${VAR}` references in strings.
    pub fn from_json_str(raw: &str) -> anyhow::Result<Self> {
        let mut settings: AuthSettings = serde_json::from_str(raw)?;
        settings.secret_key = expand_env_vars(&settings.secret_key);
        settings.token_header = expand_env_vars(&settings.token_header);
        Ok(settings)
    }

    /// Check that the settings can start a server.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.secret_key.trim().is_empty() {
            return Err(anyhow::anyhow!(
                "No signing secret configured (set `secret_key` or {})",
                SECRET_KEY_ENV
            ));
        }
        http::HeaderName::from_bytes(self.token_header.as_bytes()).map_err(|_| {
            anyhow::anyhow!("`{}` is not a valid header name", self.token_header)
        })?;
        match self.token_ttl_seconds {
            Some(0) => return Err(anyhow::anyhow!("`token_ttl_seconds` must be positive")),
            Some(secs) if secs > MAX_TOKEN_TTL_SECONDS => {
                return Err(anyhow::anyhow!(
                    "`token_ttl_seconds` must be at most {}",
                    MAX_TOKEN_TTL_SECONDS
                ));
            }
            _ => {}
        }
        Ok(())
    }

    /// Token lifetime as a duration. Out-of-range values yield `None`;
    /// `validate` rejects them first.
    pub fn token_ttl(&self) -> Option<chrono::TimeDelta> {
        self.token_ttl_seconds
            .and_then(|secs| i64::try_from(secs).ok())
            .and_then(chrono::TimeDelta::try_seconds)
    }
}

/// Locate the settings file, if any.
///
/// Checked in order: `EATS_AUTH_CONFIG`, `$XDG_CONFIG_HOME/eats-auth/config.json`,
/// `./eats-auth.json`.
pub fn resolve_config_path() -> Option<PathBuf> {
    if let Ok(p) = env::var("EATS_AUTH_CONFIG") {
        return Some(PathBuf::from(p));
    }

    if let Ok(xdg) = env::var("XDG_CONFIG_HOME") {
        let candidate = PathBuf::from(xdg).join("eats-auth").join("config.json");
        if candidate.exists() {
            return Some(candidate);
        }
    }

    let candidate = PathBuf::from("eats-auth.json");
    if candidate.exists() {
        return Some(candidate);
    }

    None
}

fn expand_env_vars(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next(); // consume '{'
            let mut name = String::new();
            for c in chars.by_ref() {
                if c == '}' {
                    break;
                }
                name.push(c);
            }
            if let Ok(val) = env::var(&name) {
                out.push_str(&val);
            } else {
                out.push_str("${");
                out.push_str(&name);
                out.push('}');
            }
        } else {
            out.push(ch);
        }
    }

    out
}

/// Read settings from `path`.
pub fn load_settings_from(path: &Path) -> anyhow::Result<AuthSettings> {
    let raw = fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Could not read {}: {}", path.display(), e))?;
    AuthSettings::from_json_str(&raw)
}

/// Load settings from the resolved file (or defaults), then apply the
/// `SECRET_KEY` override. Does not validate.
pub fn load_settings() -> anyhow::Result<AuthSettings> {
    let mut settings = match resolve_config_path() {
        Some(path) => load_settings_from(&path)?,
        None => AuthSettings::default(),
    };

    if let Ok(secret) = env::var(SECRET_KEY_ENV)
        && !secret.is_empty()
    {
        settings.secret_key = secret;
    }

    Ok(settings)
}
