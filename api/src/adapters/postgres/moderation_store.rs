//! PostgreSQL adapter for ModerationStore
//!
//! Applies a staged batch inside one database transaction. Any failed write
//! returns early and the dropped transaction rolls the whole batch back.

use async_trait::async_trait;
use sea_orm::{DatabaseConnection, DatabaseTransaction, TransactionTrait};

use super::badge_repo::{insert_badge, transition_badge};
use super::report_repo::{insert_report, transition_report};
use super::safety_score_repo::write_score;
use super::user_repo::write_user;
use super::verification_repo::{insert_request, transition_request};
use crate::domain::ports::{ModerationStore, ModerationWrites, StagedWrite};
use crate::error::DomainError;

pub struct PostgresModerationStore {
    db: DatabaseConnection,
}

impl PostgresModerationStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

async fn apply(txn: &DatabaseTransaction, write: &StagedWrite) -> Result<(), DomainError> {
    match write {
        StagedWrite::InsertReport(report) => insert_report(txn, report).await,
        StagedWrite::ReportTransition { report, expected } => {
            transition_report(txn, report, *expected).await
        }
        StagedWrite::Score(score) => write_score(txn, score).await,
        StagedWrite::User(user) => write_user(txn, user).await,
        StagedWrite::InsertVerification(request) => insert_request(txn, request).await,
        StagedWrite::VerificationTransition { request, expected } => {
            transition_request(txn, request, *expected).await
        }
        StagedWrite::InsertBadge(badge) => insert_badge(txn, badge).await,
        StagedWrite::BadgeTransition { badge, expected } => {
            transition_badge(txn, badge, *expected).await
        }
    }
}

#[async_trait]
impl ModerationStore for PostgresModerationStore {
    async fn commit(&self, writes: &ModerationWrites) -> Result<(), DomainError> {
        if writes.is_empty() {
            return Ok(());
        }

        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| DomainError::Database(e.to_string()))?;

        for write in writes.iter() {
            if let Err(e) = apply(&txn, write).await {
                tracing::debug!(error = %e, "Rolling back moderation batch");
                return Err(e);
            }
        }

        txn.commit()
            .await
            .map_err(|e| DomainError::Database(e.to_string()))
    }
}
