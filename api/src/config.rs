use std::env;

use uuid::Uuid;

use crate::auth::hash_admin_token;
use crate::domain::entities::UserId;

/// An admin allowed to call the moderation API
#[derive(Clone, Debug)]
pub struct AdminCredential {
    pub admin_id: UserId,
    /// SHA-256 hex of the bearer token
    pub token_hash: String,
}

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub admins: Vec<AdminCredential>,
    /// Block approval of verification requests with missing documents
    pub require_complete_documents: bool,
    /// Priority score at or above which a pending report counts as high priority
    pub high_priority_threshold: i32,
    /// Window in which a second report from the same reporter is rejected
    pub duplicate_report_window_days: i64,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        dotenvy::dotenv().ok();

        let database_url =
            env::var("DATABASE_URL").map_err(|_| "DATABASE_URL must be set".to_string())?;

        let admins = match env::var("ADMIN_TOKENS") {
            Ok(raw) => parse_admin_tokens(&raw)?,
            Err(_) => Vec::new(),
        };

        Ok(Self {
            database_url,
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            admins,
            require_complete_documents: env::var("REQUIRE_COMPLETE_DOCUMENTS")
                .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(false),
            high_priority_threshold: env::var("HIGH_PRIORITY_THRESHOLD")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(15),
            duplicate_report_window_days: env::var("DUPLICATE_REPORT_WINDOW_DAYS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(7),
        })
    }

    /// Find the admin owning a bearer token hash
    pub fn admin_for_token_hash(&self, hash: &str) -> Option<UserId> {
        self.admins
            .iter()
            .find(|a| a.token_hash == hash)
            .map(|a| a.admin_id)
    }
}

/// Parse `ADMIN_TOKENS`: comma-separated `<admin-uuid>:<token>` pairs
fn parse_admin_tokens(raw: &str) -> Result<Vec<AdminCredential>, String> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let (id, token) = entry
                .split_once(':')
                .ok_or_else(|| format!("ADMIN_TOKENS entry missing ':' separator: {}", entry))?;
            let admin_id = Uuid::parse_str(id.trim())
                .map_err(|e| format!("ADMIN_TOKENS has invalid admin id '{}': {}", id, e))?;
            if token.trim().is_empty() {
                return Err(format!("ADMIN_TOKENS has empty token for admin {}", id));
            }
            Ok(AdminCredential {
                admin_id: UserId(admin_id),
                token_hash: hash_admin_token(token.trim()),
            })
        })
        .collect()
}
