//! Verification request domain entity
//!
//! A member's request to verify some aspect of their profile, reviewed by an
//! admin. `needs_review` parks a request for a second look; it can still be
//! approved or rejected afterwards, but never sent back to `pending`.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::report::required_text;
use super::user::UserId;
use super::verified_badge::BadgeType;
use crate::error::DomainError;

/// Unique identifier for a verification request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VerificationRequestId(pub Uuid);

impl VerificationRequestId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for VerificationRequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for VerificationRequestId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for VerificationRequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What is being verified
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationType {
    Identity,
    Photo,
    Employment,
    Education,
    Income,
    Address,
    SocialMedia,
    BackgroundCheck,
}

impl VerificationType {
    /// Badge granted when a request of this type is approved
    pub fn badge_type(&self) -> BadgeType {
        match self {
            VerificationType::Identity => BadgeType::IdentityVerified,
            VerificationType::Photo => BadgeType::PhotoVerified,
            VerificationType::Employment => BadgeType::EmploymentVerified,
            VerificationType::Education => BadgeType::EducationVerified,
            VerificationType::Income => BadgeType::IncomeVerified,
            VerificationType::Address => BadgeType::AddressVerified,
            VerificationType::SocialMedia => BadgeType::SocialVerified,
            VerificationType::BackgroundCheck => BadgeType::BackgroundCheck,
        }
    }

    pub const ALL: [VerificationType; 8] = [
        VerificationType::Identity,
        VerificationType::Photo,
        VerificationType::Employment,
        VerificationType::Education,
        VerificationType::Income,
        VerificationType::Address,
        VerificationType::SocialMedia,
        VerificationType::BackgroundCheck,
    ];

    /// Document keys that must be submitted, with their description
    pub fn required_documents(&self) -> &'static [(&'static str, &'static str)] {
        match self {
            VerificationType::Identity => &[
                (
                    "government_id",
                    "Government-issued ID (passport, driver's license, etc.)",
                ),
                ("selfie", "Selfie holding your ID"),
            ],
            VerificationType::Photo => &[(
                "profile_photos",
                "Clear photos of yourself for profile verification",
            )],
            VerificationType::Employment => &[
                ("employment_letter", "Employment verification letter"),
                ("payslip", "Recent payslip or salary statement"),
            ],
            VerificationType::Education => &[
                ("diploma", "Diploma or degree certificate"),
                ("transcript", "Official transcript"),
            ],
            VerificationType::Income => &[
                ("tax_return", "Recent tax return"),
                ("bank_statement", "Bank statement showing income"),
            ],
            VerificationType::Address => &[
                ("utility_bill", "Recent utility bill"),
                ("lease_agreement", "Lease agreement or mortgage statement"),
            ],
            VerificationType::SocialMedia => {
                &[("social_profiles", "Links to your social media profiles")]
            }
            VerificationType::BackgroundCheck => &[(
                "consent_form",
                "Signed consent form for background check",
            )],
        }
    }
}

impl std::fmt::Display for VerificationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            VerificationType::Identity => "identity",
            VerificationType::Photo => "photo",
            VerificationType::Employment => "employment",
            VerificationType::Education => "education",
            VerificationType::Income => "income",
            VerificationType::Address => "address",
            VerificationType::SocialMedia => "social_media",
            VerificationType::BackgroundCheck => "background_check",
        };
        write!(f, "{}", s)
    }
}

impl std::str::FromStr for VerificationType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.to_lowercase();
        VerificationType::ALL
            .into_iter()
            .find(|t| t.to_string() == lowered)
            .ok_or_else(|| format!("Unknown verification type: {}", s))
    }
}

/// Review status of a verification request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    Pending,
    Approved,
    Rejected,
    NeedsReview,
}

impl VerificationStatus {
    /// Still waiting on an admin decision
    pub fn is_open(&self) -> bool {
        matches!(
            self,
            VerificationStatus::Pending | VerificationStatus::NeedsReview
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            VerificationStatus::Approved | VerificationStatus::Rejected
        )
    }

    pub fn can_transition_to(&self, next: VerificationStatus) -> bool {
        use VerificationStatus::*;
        matches!(
            (self, next),
            (Pending, Approved | Rejected | NeedsReview) | (NeedsReview, Approved | Rejected)
        )
    }
}

impl std::fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VerificationStatus::Pending => write!(f, "pending"),
            VerificationStatus::Approved => write!(f, "approved"),
            VerificationStatus::Rejected => write!(f, "rejected"),
            VerificationStatus::NeedsReview => write!(f, "needs_review"),
        }
    }
}

impl std::str::FromStr for VerificationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(VerificationStatus::Pending),
            "approved" => Ok(VerificationStatus::Approved),
            "rejected" => Ok(VerificationStatus::Rejected),
            "needs_review" => Ok(VerificationStatus::NeedsReview),
            _ => Err(format!("Unknown verification status: {}", s)),
        }
    }
}

/// One uploaded document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentSubmission {
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

/// A request to verify part of a member's profile
#[derive(Debug, Clone, Serialize)]
pub struct VerificationRequest {
    pub id: VerificationRequestId,
    pub user_id: UserId,
    pub verification_type: VerificationType,
    pub status: VerificationStatus,
    /// Submitted documents keyed by document kind
    pub documents: BTreeMap<String, DocumentSubmission>,
    pub user_notes: Option<String>,
    pub admin_feedback: Option<String>,
    pub reviewed_by: Option<UserId>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub submitted_at: DateTime<Utc>,
}

impl VerificationRequest {
    pub fn submitted(new_request: NewVerificationRequest, now: DateTime<Utc>) -> Self {
        Self {
            id: VerificationRequestId::new(),
            user_id: new_request.user_id,
            verification_type: new_request.verification_type,
            status: VerificationStatus::Pending,
            documents: new_request.documents,
            user_notes: new_request.user_notes,
            admin_feedback: None,
            reviewed_by: None,
            reviewed_at: None,
            submitted_at: now,
        }
    }

    /// Required document keys that have not been submitted
    pub fn missing_documents(&self) -> Vec<&'static str> {
        self.verification_type
            .required_documents()
            .iter()
            .map(|(key, _)| *key)
            .filter(|key| !self.documents.contains_key(*key))
            .collect()
    }

    pub fn has_all_required_documents(&self) -> bool {
        self.missing_documents().is_empty()
    }

    pub fn days_since_submission(&self, now: DateTime<Utc>) -> i64 {
        (now - self.submitted_at).num_days().max(0)
    }

    fn review(
        &mut self,
        next: VerificationStatus,
        reviewer: UserId,
        feedback: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        if !self.status.can_transition_to(next) {
            return Err(DomainError::invalid_transition(
                "verification request",
                self.status,
                next,
            ));
        }
        self.status = next;
        self.reviewed_by = Some(reviewer);
        self.reviewed_at = Some(now);
        self.admin_feedback = feedback;
        Ok(())
    }

    pub fn approve(
        &mut self,
        reviewer: UserId,
        feedback: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        let feedback = feedback
            .map(|f| f.trim().to_string())
            .filter(|f| !f.is_empty());
        self.review(VerificationStatus::Approved, reviewer, feedback, now)
    }

    pub fn reject(
        &mut self,
        reviewer: UserId,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        let reason = required_text(reason, "rejection reason")?;
        self.review(VerificationStatus::Rejected, reviewer, Some(reason), now)
    }

    pub fn mark_needs_review(
        &mut self,
        reviewer: UserId,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        let reason = required_text(reason, "review reason")?;
        self.review(VerificationStatus::NeedsReview, reviewer, Some(reason), now)
    }
}

/// Data needed to submit a verification request
#[derive(Debug, Clone)]
pub struct NewVerificationRequest {
    pub user_id: UserId,
    pub verification_type: VerificationType,
    pub documents: BTreeMap<String, DocumentSubmission>,
    pub user_notes: Option<String>,
}
