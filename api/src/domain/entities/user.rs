//! Moderated user domain entity
//!
//! The moderation-relevant slice of a platform user: account standing and the
//! restrictions applied by resolved reports. Profile data lives elsewhere.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a user (members and admins alike)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(pub Uuid);

impl UserId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for UserId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Account standing, ordered from least to most severe
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountStatus {
    Active,
    Warning,
    Restricted,
    Suspended,
    Banned,
}

impl std::fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AccountStatus::Active => write!(f, "active"),
            AccountStatus::Warning => write!(f, "warning"),
            AccountStatus::Restricted => write!(f, "restricted"),
            AccountStatus::Suspended => write!(f, "suspended"),
            AccountStatus::Banned => write!(f, "banned"),
        }
    }
}

impl std::str::FromStr for AccountStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "active" => Ok(AccountStatus::Active),
            "warning" => Ok(AccountStatus::Warning),
            "restricted" => Ok(AccountStatus::Restricted),
            "suspended" => Ok(AccountStatus::Suspended),
            "banned" => Ok(AccountStatus::Banned),
            _ => Err(format!("Unknown account status: {}", s)),
        }
    }
}

/// Feature restrictions with their expiry
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Restrictions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub messaging_until: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photos_until: Option<DateTime<Utc>>,
    #[serde(default)]
    pub warnings: u32,
    /// Details given with the most recent warning
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_warning: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_warning_at: Option<DateTime<Utc>>,
}

/// A platform user as seen by moderation
#[derive(Debug, Clone, Serialize)]
pub struct ModeratedUser {
    pub id: UserId,
    pub account_status: AccountStatus,
    /// Mirror of the latest trust score
    pub safety_score: i32,
    pub is_flagged: bool,
    pub restrictions: Restrictions,
    pub suspended_until: Option<DateTime<Utc>>,
    pub ban_reason: Option<String>,
    pub last_safety_check: Option<DateTime<Utc>>,
    /// Row version for conditional writes; 0 until first stored
    #[serde(skip)]
    pub version: i64,
}

impl ModeratedUser {
    /// A fresh user in good standing
    pub fn new(id: UserId) -> Self {
        Self {
            id,
            account_status: AccountStatus::Active,
            safety_score: 100,
            is_flagged: false,
            restrictions: Restrictions::default(),
            suspended_until: None,
            ban_reason: None,
            last_safety_check: None,
            version: 0,
        }
    }

    pub fn can_message(&self, now: DateTime<Utc>) -> bool {
        !self.is_locked_out(now) && self.restrictions.messaging_until.map_or(true, |t| t <= now)
    }

    pub fn can_upload_photos(&self, now: DateTime<Utc>) -> bool {
        !self.is_locked_out(now) && self.restrictions.photos_until.map_or(true, |t| t <= now)
    }

    /// Banned, or suspended with the suspension still running
    pub fn is_locked_out(&self, now: DateTime<Utc>) -> bool {
        match self.account_status {
            AccountStatus::Banned => true,
            AccountStatus::Suspended => self.suspended_until.map_or(true, |t| t > now),
            _ => false,
        }
    }

    pub fn issue_warning(&mut self, details: Option<&str>, now: DateTime<Utc>) {
        self.restrictions.warnings += 1;
        self.restrictions.last_warning = details
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(String::from);
        self.restrictions.last_warning_at = Some(now);
    }

    /// Extends (never shortens) a messaging restriction
    pub fn restrict_messaging(&mut self, hours: u32, now: DateTime<Utc>) {
        let until = now + Duration::hours(i64::from(hours));
        self.restrictions.messaging_until = Some(later(self.restrictions.messaging_until, until));
    }

    pub fn restrict_photos(&mut self, hours: u32, now: DateTime<Utc>) {
        let until = now + Duration::hours(i64::from(hours));
        self.restrictions.photos_until = Some(later(self.restrictions.photos_until, until));
    }

    pub fn suspend(&mut self, hours: u32, now: DateTime<Utc>) {
        if self.account_status == AccountStatus::Banned {
            return;
        }
        let until = now + Duration::hours(i64::from(hours));
        self.account_status = AccountStatus::Suspended;
        self.suspended_until = Some(later(self.suspended_until, until));
    }

    pub fn ban(&mut self, reason: &str) {
        self.account_status = AccountStatus::Banned;
        self.ban_reason = Some(reason.to_string());
        self.suspended_until = None;
    }

    /// Sync with a freshly computed trust score. A ban or a running
    /// suspension set by a moderator is never relaxed here. A suspension that
    /// comes from the score alone has no end date. Returns whether the account
    /// status changed.
    pub fn apply_trust_standing(
        &mut self,
        derived: AccountStatus,
        trust_score: i32,
        flagged: bool,
        now: DateTime<Utc>,
    ) -> bool {
        self.safety_score = trust_score;
        self.is_flagged = flagged;
        self.last_safety_check = Some(now);

        let running = self.suspended_until.is_some_and(|t| t > now);
        let held = self.account_status == AccountStatus::Banned
            || (self.account_status == AccountStatus::Suspended && running);
        if held && derived < self.account_status {
            return false;
        }
        if !running {
            self.suspended_until = None;
        }
        let changed = self.account_status != derived;
        self.account_status = derived;
        changed
    }
}

fn later(current: Option<DateTime<Utc>>, candidate: DateTime<Utc>) -> DateTime<Utc> {
    match current {
        Some(existing) if existing > candidate => existing,
        _ => candidate,
    }
}
