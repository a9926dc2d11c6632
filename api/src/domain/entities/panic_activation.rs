//! Panic activation domain entity
//!
//! An emergency raised by a member. Severity and the response budget are
//! derived from the trigger type and never stored.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::report::required_text;
use super::user::UserId;
use crate::error::DomainError;

/// Unique identifier for a panic activation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PanicActivationId(pub Uuid);

impl PanicActivationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PanicActivationId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for PanicActivationId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for PanicActivationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How the panic was raised
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerType {
    EmergencyContact,
    LocationSharing,
    FakeCall,
    SilentAlarm,
    SafeWord,
    DateCheckIn,
}

impl TriggerType {
    pub const ALL: [TriggerType; 6] = [
        TriggerType::EmergencyContact,
        TriggerType::LocationSharing,
        TriggerType::FakeCall,
        TriggerType::SilentAlarm,
        TriggerType::SafeWord,
        TriggerType::DateCheckIn,
    ];

    pub fn severity(&self) -> PanicSeverity {
        match self {
            TriggerType::SilentAlarm | TriggerType::SafeWord => PanicSeverity::Critical,
            TriggerType::EmergencyContact | TriggerType::DateCheckIn => PanicSeverity::High,
            TriggerType::LocationSharing => PanicSeverity::Medium,
            TriggerType::FakeCall => PanicSeverity::Low,
        }
    }
}

impl std::fmt::Display for TriggerType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TriggerType::EmergencyContact => "emergency_contact",
            TriggerType::LocationSharing => "location_sharing",
            TriggerType::FakeCall => "fake_call",
            TriggerType::SilentAlarm => "silent_alarm",
            TriggerType::SafeWord => "safe_word",
            TriggerType::DateCheckIn => "date_check_in",
        };
        write!(f, "{}", s)
    }
}

impl std::str::FromStr for TriggerType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.to_lowercase();
        TriggerType::ALL
            .into_iter()
            .find(|t| t.to_string() == lowered)
            .ok_or_else(|| format!("Unknown trigger type: {}", s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PanicSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl PanicSeverity {
    /// Minutes an admin has to respond
    pub fn response_minutes(&self) -> i64 {
        match self {
            PanicSeverity::Critical => 2,
            PanicSeverity::High => 5,
            PanicSeverity::Medium => 10,
            PanicSeverity::Low => 15,
        }
    }
}

impl std::fmt::Display for PanicSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PanicSeverity::Low => write!(f, "low"),
            PanicSeverity::Medium => write!(f, "medium"),
            PanicSeverity::High => write!(f, "high"),
            PanicSeverity::Critical => write!(f, "critical"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PanicStatus {
    Active,
    Resolved,
    FalseAlarm,
    Escalated,
}

impl PanicStatus {
    /// Closed with a resolution timestamp
    pub fn is_resolved(&self) -> bool {
        matches!(self, PanicStatus::Resolved | PanicStatus::FalseAlarm)
    }

    pub fn can_transition_to(&self, next: PanicStatus) -> bool {
        use PanicStatus::*;
        matches!(
            (self, next),
            (Active, Resolved | FalseAlarm | Escalated) | (Escalated, Resolved | FalseAlarm)
        )
    }
}

impl std::fmt::Display for PanicStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PanicStatus::Active => write!(f, "active"),
            PanicStatus::Resolved => write!(f, "resolved"),
            PanicStatus::FalseAlarm => write!(f, "false_alarm"),
            PanicStatus::Escalated => write!(f, "escalated"),
        }
    }
}

impl std::str::FromStr for PanicStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "active" => Ok(PanicStatus::Active),
            "resolved" => Ok(PanicStatus::Resolved),
            "false_alarm" => Ok(PanicStatus::FalseAlarm),
            "escalated" => Ok(PanicStatus::Escalated),
            _ => Err(format!("Unknown panic status: {}", s)),
        }
    }
}

/// A panic button activation
#[derive(Debug, Clone, Serialize)]
pub struct PanicActivation {
    pub id: PanicActivationId,
    pub user_id: UserId,
    pub trigger_type: TriggerType,
    pub status: PanicStatus,
    pub user_message: Option<String>,
    pub location_address: Option<String>,
    pub triggered_at: DateTime<Utc>,
    /// Set only once the panic is resolved or marked a false alarm
    pub resolved_at: Option<DateTime<Utc>>,
    pub resolved_by: Option<UserId>,
    pub resolution_notes: Option<String>,
    pub authorities_contacted: bool,
}

impl PanicActivation {
    pub fn severity(&self) -> PanicSeverity {
        self.trigger_type.severity()
    }

    pub fn response_minutes(&self) -> i64 {
        self.severity().response_minutes()
    }

    pub fn response_deadline(&self) -> DateTime<Utc> {
        self.triggered_at + Duration::minutes(self.response_minutes())
    }

    pub fn is_active(&self) -> bool {
        self.status == PanicStatus::Active
    }

    /// Unresolved and past its response budget
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        !self.status.is_resolved() && now > self.response_deadline()
    }

    /// Minutes from trigger until resolution, or until `now` while open
    pub fn duration_minutes(&self, now: DateTime<Utc>) -> i64 {
        let end = self.resolved_at.unwrap_or(now);
        (end - self.triggered_at).num_minutes().max(0)
    }

    pub fn formatted_duration(&self, now: DateTime<Utc>) -> String {
        let minutes = self.duration_minutes(now);
        if minutes < 60 {
            format!("{} minutes", minutes)
        } else {
            format!("{}h {}m", minutes / 60, minutes % 60)
        }
    }

    pub fn resolve(
        &mut self,
        resolver: UserId,
        notes: &str,
        false_alarm: bool,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        let next = if false_alarm {
            PanicStatus::FalseAlarm
        } else {
            PanicStatus::Resolved
        };
        if !self.status.can_transition_to(next) {
            return Err(DomainError::invalid_transition("panic", self.status, next));
        }
        let notes = required_text(notes, "resolution notes")?;

        self.status = next;
        self.resolved_at = Some(now);
        self.resolved_by = Some(resolver);
        self.resolution_notes = Some(notes);
        Ok(())
    }

    /// Hands the emergency to authorities; it stays open until resolved
    pub fn escalate_to_authorities(&mut self, by: UserId, notes: &str) -> Result<(), DomainError> {
        if !self.status.can_transition_to(PanicStatus::Escalated) {
            return Err(DomainError::invalid_transition(
                "panic",
                self.status,
                PanicStatus::Escalated,
            ));
        }
        let notes = required_text(notes, "escalation notes")?;

        self.status = PanicStatus::Escalated;
        self.authorities_contacted = true;
        self.resolved_by = Some(by);
        self.resolution_notes = Some(notes);
        Ok(())
    }
}

/// Data captured when a member raises a panic
#[derive(Debug, Clone)]
pub struct NewPanicActivation {
    pub user_id: UserId,
    pub trigger_type: TriggerType,
    pub user_message: Option<String>,
    pub location_address: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_panic(trigger_type: TriggerType, triggered_at: DateTime<Utc>) -> PanicActivation {
        PanicActivation {
            id: PanicActivationId::new(),
            user_id: UserId::new(),
            trigger_type,
            status: PanicStatus::Active,
            user_message: None,
            location_address: Some("Cafe Lumen".into()),
            triggered_at,
            resolved_at: None,
            resolved_by: None,
            resolution_notes: None,
            authorities_contacted: false,
        }
    }

    #[test]
    fn severity_and_budget_follow_trigger() {
        let cases = [
            (TriggerType::SilentAlarm, PanicSeverity::Critical, 2),
            (TriggerType::SafeWord, PanicSeverity::Critical, 2),
            (TriggerType::EmergencyContact, PanicSeverity::High, 5),
            (TriggerType::DateCheckIn, PanicSeverity::High, 5),
            (TriggerType::LocationSharing, PanicSeverity::Medium, 10),
            (TriggerType::FakeCall, PanicSeverity::Low, 15),
        ];
        for (trigger, severity, minutes) in cases {
            assert_eq!(trigger.severity(), severity);
            assert_eq!(severity.response_minutes(), minutes);
        }
    }

    #[test]
    fn silent_alarm_is_overdue_after_two_minutes() {
        let now = Utc::now();
        let panic = make_panic(TriggerType::SilentAlarm, now - Duration::minutes(3));
        assert!(panic.is_overdue(now));

        let fake_call = make_panic(TriggerType::FakeCall, now - Duration::minutes(3));
        assert!(!fake_call.is_overdue(now));
    }

    #[test]
    fn resolved_panic_is_never_overdue() {
        let now = Utc::now();
        let mut panic = make_panic(TriggerType::SilentAlarm, now - Duration::hours(1));
        panic
            .resolve(UserId::new(), "user confirmed safe", false, now)
            .unwrap();
        assert!(!panic.is_overdue(now + Duration::days(1)));
    }

    #[test]
    fn escalated_panic_still_counts_as_overdue() {
        let now = Utc::now();
        let mut panic = make_panic(TriggerType::SafeWord, now - Duration::minutes(30));
        panic
            .escalate_to_authorities(UserId::new(), "no answer from user")
            .unwrap();

        assert_eq!(panic.status, PanicStatus::Escalated);
        assert!(panic.authorities_contacted);
        assert!(panic.resolved_at.is_none());
        assert!(panic.is_overdue(now));
    }

    #[test]
    fn false_alarm_sets_resolution_fields() {
        let now = Utc::now();
        let resolver = UserId::new();
        let mut panic = make_panic(TriggerType::FakeCall, now - Duration::minutes(5));
        panic.resolve(resolver, "pocket dial", true, now).unwrap();

        assert_eq!(panic.status, PanicStatus::FalseAlarm);
        assert_eq!(panic.resolved_at, Some(now));
        assert_eq!(panic.resolved_by, Some(resolver));
        assert_eq!(panic.resolution_notes.as_deref(), Some("pocket dial"));
    }

    #[test]
    fn escalated_panic_can_be_resolved() {
        let now = Utc::now();
        let mut panic = make_panic(TriggerType::SafeWord, now - Duration::minutes(20));
        panic.escalate_to_authorities(UserId::new(), "police called").unwrap();
        panic.resolve(UserId::new(), "police on site", false, now).unwrap();

        assert_eq!(panic.status, PanicStatus::Resolved);
        assert!(panic.authorities_contacted);
        assert_eq!(panic.resolved_at, Some(now));
    }

    #[test]
    fn closed_panics_reject_further_transitions() {
        let now = Utc::now();
        let mut panic = make_panic(TriggerType::FakeCall, now);
        panic.resolve(UserId::new(), "fine", false, now).unwrap();

        let err = panic
            .escalate_to_authorities(UserId::new(), "late")
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidTransition { .. }));
        assert!(panic.resolve(UserId::new(), "again", true, now).is_err());
        assert_eq!(panic.status, PanicStatus::Resolved);
        assert!(!panic.authorities_contacted);
    }

    #[test]
    fn resolve_requires_notes() {
        let now = Utc::now();
        let mut panic = make_panic(TriggerType::FakeCall, now);
        assert!(matches!(
            panic.resolve(UserId::new(), "  ", false, now),
            Err(DomainError::Validation(_))
        ));
        assert!(panic.is_active());
        assert!(panic.resolved_at.is_none());
    }

    #[test]
    fn duration_formats_minutes_and_hours() {
        let now = Utc::now();
        let short = make_panic(TriggerType::FakeCall, now - Duration::minutes(42));
        assert_eq!(short.formatted_duration(now), "42 minutes");

        let mut long = make_panic(TriggerType::FakeCall, now - Duration::minutes(135));
        assert_eq!(long.formatted_duration(now), "2h 15m");

        long.resolve(UserId::new(), "ok", false, now - Duration::minutes(75))
            .unwrap();
        assert_eq!(long.duration_minutes(now + Duration::hours(5)), 60);
    }
}
