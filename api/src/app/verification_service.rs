//! Verification service
//!
//! Review of profile verification requests. Document completeness is
//! reported on every read and enforced on approval only when configured.
//!
//! Every verification type grants a profile badge. The badge follows its
//! request: pending on submission, verified with the type's default expiry
//! on approval, rejected on rejection. Request and badge commit together.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::publish;
use crate::domain::entities::{
    BadgeStatus, BadgeType, DocumentSubmission, NewVerificationRequest, NewVerifiedBadge, UserId,
    VerificationRequest, VerificationRequestId, VerificationStatus, VerificationType,
    VerifiedBadge,
};
use crate::domain::ports::{
    ModerationEvent, ModerationStore, ModerationWrites, Notifier, StagedWrite,
    VerificationRequestRepository, VerifiedBadgeRepository,
};
use crate::error::{AppError, DomainError};

/// A request as shown to the reviewing admin
#[derive(Debug, Clone, Serialize)]
pub struct VerificationView {
    #[serde(flatten)]
    pub request: VerificationRequest,
    pub missing_documents: Vec<&'static str>,
    pub days_since_submission: i64,
    /// The badge this request grants, when it was touched by the operation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub badge: Option<VerifiedBadge>,
}

impl VerificationView {
    fn new(request: VerificationRequest) -> Self {
        Self {
            missing_documents: request.missing_documents(),
            days_since_submission: request.days_since_submission(Utc::now()),
            request,
            badge: None,
        }
    }

    fn with_badge(mut self, badge: Option<VerifiedBadge>) -> Self {
        self.badge = badge;
        self
    }
}

/// Documents and notes sent with a new request
#[derive(Debug, Clone, Deserialize)]
pub struct VerificationSubmission {
    pub user_id: UserId,
    pub verification_type: VerificationType,
    #[serde(default)]
    pub documents: BTreeMap<String, DocumentSubmission>,
    #[serde(default)]
    pub user_notes: Option<String>,
}

/// The user's badge of a type that a request acts on: an open application
/// first, then a verified badge, then an expired one. Rejected badges are
/// history and never reused.
fn current_badge(
    badges: Vec<VerifiedBadge>,
    badge_type: BadgeType,
    now: DateTime<Utc>,
) -> Option<VerifiedBadge> {
    badges
        .into_iter()
        .filter(|b| b.badge_type == badge_type)
        .filter_map(|b| {
            let rank = match b.effective_status(now) {
                BadgeStatus::Pending => 0,
                BadgeStatus::Verified => 1,
                BadgeStatus::Expired => 2,
                BadgeStatus::Rejected => return None,
            };
            Some((rank, b))
        })
        .min_by_key(|(rank, _)| *rank)
        .map(|(_, b)| b)
}

pub struct VerificationService<VR, BR, MS, N>
where
    VR: VerificationRequestRepository,
    BR: VerifiedBadgeRepository,
    MS: ModerationStore,
    N: Notifier,
{
    requests: Arc<VR>,
    badges: Arc<BR>,
    store: Arc<MS>,
    notifier: Arc<N>,
    require_complete_documents: bool,
}

impl<VR, BR, MS, N> VerificationService<VR, BR, MS, N>
where
    VR: VerificationRequestRepository,
    BR: VerifiedBadgeRepository,
    MS: ModerationStore,
    N: Notifier,
{
    pub fn new(
        requests: Arc<VR>,
        badges: Arc<BR>,
        store: Arc<MS>,
        notifier: Arc<N>,
        require_complete_documents: bool,
    ) -> Self {
        Self {
            requests,
            badges,
            store,
            notifier,
            require_complete_documents,
        }
    }

    /// File a request and open the matching badge application
    ///
    /// A user holds at most one pending or needs-review request per type.
    pub async fn submit(
        &self,
        submission: VerificationSubmission,
    ) -> Result<VerificationView, AppError> {
        let now = Utc::now();
        if self
            .requests
            .has_open_request(&submission.user_id, submission.verification_type)
            .await?
        {
            return Err(DomainError::Conflict(
                "You already have a pending verification request for this type".into(),
            )
            .into());
        }

        let documents = submission
            .documents
            .into_iter()
            .filter(|(_, doc)| !doc.path.trim().is_empty())
            .collect();
        let request = VerificationRequest::submitted(
            NewVerificationRequest {
                user_id: submission.user_id,
                verification_type: submission.verification_type,
                documents,
                user_notes: submission
                    .user_notes
                    .map(|n| n.trim().to_string())
                    .filter(|n| !n.is_empty()),
            },
            now,
        );

        let mut writes = ModerationWrites::new();
        writes.push(StagedWrite::InsertVerification(request.clone()));

        let badge_type = request.verification_type.badge_type();
        let existing = self.badges.find_by_user(&request.user_id).await?;
        let badge = match current_badge(existing, badge_type, now) {
            Some(b) if matches!(
                b.effective_status(now),
                BadgeStatus::Pending | BadgeStatus::Verified
            ) =>
            {
                b
            }
            _ => {
                let b = VerifiedBadge::requested(NewVerifiedBadge {
                    user_id: request.user_id,
                    badge_type,
                });
                writes.push(StagedWrite::InsertBadge(b.clone()));
                b
            }
        };
        self.store.commit(&writes).await?;

        tracing::info!(
            request_id = %request.id,
            user_id = %request.user_id,
            verification_type = %request.verification_type,
            documents = request.documents.len(),
            badge_id = %badge.id,
            "Verification request submitted"
        );
        Ok(VerificationView::new(request).with_badge(Some(badge)))
    }

    pub async fn get(&self, id: &VerificationRequestId) -> Result<VerificationView, AppError> {
        self.load(id).await.map(VerificationView::new)
    }

    /// Approve a request and verify its badge with the type's default expiry
    pub async fn approve(
        &self,
        id: &VerificationRequestId,
        reviewer: UserId,
        feedback: Option<String>,
    ) -> Result<VerificationView, AppError> {
        let now = Utc::now();
        let mut request = self.load(id).await?;
        let expected = request.status;

        if self.require_complete_documents
            && expected.can_transition_to(VerificationStatus::Approved)
        {
            let missing = request.missing_documents();
            if !missing.is_empty() {
                return Err(DomainError::Validation(format!(
                    "Missing required documents: {}",
                    missing.join(", ")
                ))
                .into());
            }
        }

        request.approve(reviewer, feedback.clone(), now)?;

        let badge_type = request.verification_type.badge_type();
        let existing = self.badges.find_by_user(&request.user_id).await?;
        let (badge, write) = match current_badge(existing, badge_type, now) {
            Some(mut b) if b.status == BadgeStatus::Pending => {
                b.mark_verified(reviewer, badge_type.default_expiry(now), feedback, now)?;
                let write = StagedWrite::BadgeTransition {
                    badge: b.clone(),
                    expected: BadgeStatus::Pending,
                };
                (b, write)
            }
            Some(mut b) => {
                let expected = b.status;
                b.renew(None, now)?;
                let write = StagedWrite::BadgeTransition {
                    badge: b.clone(),
                    expected,
                };
                (b, write)
            }
            None => {
                let mut b = VerifiedBadge::requested(NewVerifiedBadge {
                    user_id: request.user_id,
                    badge_type,
                });
                b.mark_verified(reviewer, badge_type.default_expiry(now), feedback, now)?;
                (b.clone(), StagedWrite::InsertBadge(b))
            }
        };

        self.commit_review(request, expected, Some((badge, write)))
            .await
    }

    /// Reject a request; a badge still waiting on it is rejected too
    pub async fn reject(
        &self,
        id: &VerificationRequestId,
        reviewer: UserId,
        reason: &str,
    ) -> Result<VerificationView, AppError> {
        let now = Utc::now();
        let mut request = self.load(id).await?;
        let expected = request.status;
        request.reject(reviewer, reason, now)?;

        let badge_type = request.verification_type.badge_type();
        let existing = self.badges.find_by_user(&request.user_id).await?;
        let badge = match current_badge(existing, badge_type, now) {
            Some(mut b) if b.status == BadgeStatus::Pending => {
                b.mark_rejected(reviewer, reason)?;
                let write = StagedWrite::BadgeTransition {
                    badge: b.clone(),
                    expected: BadgeStatus::Pending,
                };
                Some((b, write))
            }
            // A badge earned by an earlier request stands
            _ => None,
        };

        self.commit_review(request, expected, badge).await
    }

    /// Park a request for a second look; its badge stays pending
    pub async fn needs_review(
        &self,
        id: &VerificationRequestId,
        reviewer: UserId,
        reason: &str,
    ) -> Result<VerificationView, AppError> {
        let mut request = self.load(id).await?;
        let expected = request.status;
        request.mark_needs_review(reviewer, reason, Utc::now())?;
        self.requests.update_transition(&request, expected).await?;
        self.announce(&request, expected, None).await;
        Ok(VerificationView::new(request))
    }

    async fn load(&self, id: &VerificationRequestId) -> Result<VerificationRequest, AppError> {
        self.requests
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Verification request {}", id)))
    }

    async fn commit_review(
        &self,
        request: VerificationRequest,
        expected: VerificationStatus,
        badge: Option<(VerifiedBadge, StagedWrite)>,
    ) -> Result<VerificationView, AppError> {
        let mut writes = ModerationWrites::new();
        writes.push(StagedWrite::VerificationTransition {
            request: request.clone(),
            expected,
        });
        let badge = badge.map(|(badge, write)| {
            writes.push(write);
            badge
        });
        self.store.commit(&writes).await?;

        self.announce(&request, expected, badge.as_ref()).await;
        Ok(VerificationView::new(request).with_badge(badge))
    }

    async fn announce(
        &self,
        request: &VerificationRequest,
        expected: VerificationStatus,
        badge: Option<&VerifiedBadge>,
    ) {
        tracing::info!(
            request_id = %request.id,
            from = %expected,
            to = %request.status,
            reviewer = ?request.reviewed_by,
            badge_status = ?badge.map(|b| b.status),
            "Verification request reviewed"
        );
        publish(
            self.notifier.as_ref(),
            ModerationEvent::VerificationReviewed {
                request_id: request.id,
                user_id: request.user_id,
                status: request.status,
                timestamp: request.reviewed_at.unwrap_or_else(Utc::now),
            },
        )
        .await;
        if let Some(badge) = badge {
            publish(
                self.notifier.as_ref(),
                ModerationEvent::BadgeUpdated {
                    badge_id: badge.id,
                    user_id: badge.user_id,
                    status: badge.status,
                    expires_at: badge.expires_at,
                },
            )
            .await;
        }
    }
}
