//! Verified badge domain entity
//!
//! Badges are granted after a successful verification and may expire. Expiry
//! is evaluated on read against `expires_at`; the stored status only changes
//! through an explicit admin action.

use chrono::{DateTime, Duration, Months, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::report::required_text;
use super::user::UserId;
use crate::error::DomainError;

/// Window in which a badge counts as expiring soon
pub const EXPIRES_SOON_DAYS: i64 = 30;

/// Unique identifier for a badge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BadgeId(pub Uuid);

impl BadgeId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for BadgeId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for BadgeId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for BadgeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BadgeType {
    PhoneVerified,
    EmailVerified,
    IdentityVerified,
    PhotoVerified,
    EmploymentVerified,
    EducationVerified,
    IncomeVerified,
    AddressVerified,
    SocialVerified,
    BackgroundCheck,
    PremiumMember,
    Influencer,
    MatchmakerVerified,
}

impl BadgeType {
    pub const ALL: [BadgeType; 13] = [
        BadgeType::PhoneVerified,
        BadgeType::EmailVerified,
        BadgeType::IdentityVerified,
        BadgeType::PhotoVerified,
        BadgeType::EmploymentVerified,
        BadgeType::EducationVerified,
        BadgeType::IncomeVerified,
        BadgeType::AddressVerified,
        BadgeType::SocialVerified,
        BadgeType::BackgroundCheck,
        BadgeType::PremiumMember,
        BadgeType::Influencer,
        BadgeType::MatchmakerVerified,
    ];

    /// Default validity when a badge is renewed; `None` never expires
    pub fn renewal_period(&self) -> Option<Months> {
        match self {
            BadgeType::IdentityVerified | BadgeType::BackgroundCheck => Some(Months::new(12)),
            BadgeType::EmploymentVerified | BadgeType::IncomeVerified => Some(Months::new(6)),
            BadgeType::PhotoVerified => Some(Months::new(3)),
            _ => None,
        }
    }

    /// Expiry for a badge granted or renewed at `now`
    pub fn default_expiry(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.renewal_period()
            .and_then(|period| now.checked_add_months(period))
    }

    /// Profile score contributed by an active badge
    pub fn score_value(&self) -> i32 {
        match self {
            BadgeType::PhoneVerified | BadgeType::EmailVerified | BadgeType::SocialVerified => 5,
            BadgeType::PhotoVerified
            | BadgeType::AddressVerified
            | BadgeType::PremiumMember
            | BadgeType::Influencer => 10,
            BadgeType::EmploymentVerified
            | BadgeType::EducationVerified
            | BadgeType::IncomeVerified => 15,
            BadgeType::IdentityVerified | BadgeType::MatchmakerVerified => 20,
            BadgeType::BackgroundCheck => 25,
        }
    }
}

impl std::fmt::Display for BadgeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            BadgeType::PhoneVerified => "phone_verified",
            BadgeType::EmailVerified => "email_verified",
            BadgeType::IdentityVerified => "identity_verified",
            BadgeType::PhotoVerified => "photo_verified",
            BadgeType::EmploymentVerified => "employment_verified",
            BadgeType::EducationVerified => "education_verified",
            BadgeType::IncomeVerified => "income_verified",
            BadgeType::AddressVerified => "address_verified",
            BadgeType::SocialVerified => "social_verified",
            BadgeType::BackgroundCheck => "background_check",
            BadgeType::PremiumMember => "premium_member",
            BadgeType::Influencer => "influencer",
            BadgeType::MatchmakerVerified => "matchmaker_verified",
        };
        write!(f, "{}", s)
    }
}

impl std::str::FromStr for BadgeType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.to_lowercase();
        BadgeType::ALL
            .into_iter()
            .find(|t| t.to_string() == lowered)
            .ok_or_else(|| format!("Unknown badge type: {}", s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BadgeStatus {
    Pending,
    Verified,
    Rejected,
    Expired,
}

impl std::fmt::Display for BadgeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BadgeStatus::Pending => write!(f, "pending"),
            BadgeStatus::Verified => write!(f, "verified"),
            BadgeStatus::Rejected => write!(f, "rejected"),
            BadgeStatus::Expired => write!(f, "expired"),
        }
    }
}

impl std::str::FromStr for BadgeStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(BadgeStatus::Pending),
            "verified" => Ok(BadgeStatus::Verified),
            "rejected" => Ok(BadgeStatus::Rejected),
            "expired" => Ok(BadgeStatus::Expired),
            _ => Err(format!("Unknown badge status: {}", s)),
        }
    }
}

/// A badge shown on a member's profile
#[derive(Debug, Clone, Serialize)]
pub struct VerifiedBadge {
    pub id: BadgeId,
    pub user_id: UserId,
    pub badge_type: BadgeType,
    pub status: BadgeStatus,
    pub admin_notes: Option<String>,
    pub verified_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub verified_by: Option<UserId>,
}

impl VerifiedBadge {
    /// A new badge awaiting review
    pub fn requested(new_badge: NewVerifiedBadge) -> Self {
        Self {
            id: BadgeId::new(),
            user_id: new_badge.user_id,
            badge_type: new_badge.badge_type,
            status: BadgeStatus::Pending,
            admin_notes: None,
            verified_at: None,
            expires_at: None,
            verified_by: None,
        }
    }

    /// Verified and not past its expiry
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.status == BadgeStatus::Verified && self.expires_at.map_or(true, |t| t > now)
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|t| t <= now)
    }

    pub fn expires_soon(&self, now: DateTime<Utc>) -> bool {
        self.expires_at
            .is_some_and(|t| t > now && t <= now + Duration::days(EXPIRES_SOON_DAYS))
    }

    /// Whole days left, floored at zero; `None` for badges without expiry
    pub fn days_until_expiration(&self, now: DateTime<Utc>) -> Option<i64> {
        self.expires_at.map(|t| (t - now).num_days().max(0))
    }

    /// Status as it should be displayed right now
    pub fn effective_status(&self, now: DateTime<Utc>) -> BadgeStatus {
        if self.status == BadgeStatus::Verified && self.is_expired(now) {
            BadgeStatus::Expired
        } else {
            self.status
        }
    }

    pub fn score_value(&self, now: DateTime<Utc>) -> i32 {
        if self.is_active(now) {
            self.badge_type.score_value()
        } else {
            0
        }
    }

    pub fn mark_verified(
        &mut self,
        by: UserId,
        expires_at: Option<DateTime<Utc>>,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        if !matches!(self.status, BadgeStatus::Pending | BadgeStatus::Expired) {
            return Err(DomainError::invalid_transition(
                "badge",
                self.status,
                BadgeStatus::Verified,
            ));
        }
        if expires_at.is_some_and(|t| t <= now) {
            return Err(DomainError::Validation(
                "Badge expiry must be in the future".into(),
            ));
        }
        self.status = BadgeStatus::Verified;
        self.verified_at = Some(now);
        self.verified_by = Some(by);
        self.expires_at = expires_at;
        self.admin_notes = notes;
        Ok(())
    }

    pub fn mark_rejected(&mut self, by: UserId, reason: &str) -> Result<(), DomainError> {
        if !matches!(self.status, BadgeStatus::Pending | BadgeStatus::Verified) {
            return Err(DomainError::invalid_transition(
                "badge",
                self.status,
                BadgeStatus::Rejected,
            ));
        }
        let reason = required_text(reason, "rejection reason")?;
        self.status = BadgeStatus::Rejected;
        self.verified_by = Some(by);
        self.admin_notes = Some(reason);
        Ok(())
    }

    /// Extends a verified or expired badge; without an explicit date the
    /// badge type's renewal period applies
    pub fn renew(
        &mut self,
        new_expiry: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        if !matches!(self.status, BadgeStatus::Verified | BadgeStatus::Expired) {
            return Err(DomainError::invalid_transition(
                "badge",
                self.status,
                BadgeStatus::Verified,
            ));
        }
        let expires_at = match new_expiry {
            Some(t) if t <= now => {
                return Err(DomainError::Validation(
                    "Badge expiry must be in the future".into(),
                ))
            }
            Some(t) => Some(t),
            None => self.badge_type.default_expiry(now),
        };
        self.status = BadgeStatus::Verified;
        self.expires_at = expires_at;
        Ok(())
    }
}

/// A badge application awaiting admin review
#[derive(Debug, Clone)]
pub struct NewVerifiedBadge {
    pub user_id: UserId,
    pub badge_type: BadgeType,
}
