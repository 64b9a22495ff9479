use std::sync::{Arc, Mutex, PoisonError};

/// Who performed an audited action
#[derive(Serialize, Deserialize, Copy, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActorType {
    Voter,
    Admin,
}

/// What was attempted
#[derive(Serialize, Deserialize, Copy, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionType {
    Registration,
    FaceAuth,
    VoteCast,
    VoteDecrypt,
    ElectionCreate,
}

#[derive(Serialize, Deserialize, Copy, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Outcome {
    Success,
    Failed,
}

impl std::fmt::Display for ActorType {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str(match self {
            ActorType::Voter => "VOTER",
            ActorType::Admin => "ADMIN",
        })
    }
}

impl std::fmt::Display for ActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str(match self {
            ActionType::Registration => "REGISTRATION",
            ActionType::FaceAuth => "FACE_AUTH",
            ActionType::VoteCast => "VOTE_CAST",
            ActionType::VoteDecrypt => "VOTE_DECRYPT",
            ActionType::ElectionCreate => "ELECTION_CREATE",
        })
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str(match self {
            Outcome::Success => "SUCCESS",
            Outcome::Failed => "FAILED",
        })
    }
}

/// One security-relevant event. Never carries a plaintext choice or an embedding.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct AuditEvent {
    pub user_id: Option<u64>,
    pub actor: ActorType,
    pub action: ActionType,
    pub outcome: Outcome,
    pub detail: String,
}

/// Destination for audit events. Fire-and-forget: a sink can't fail the action it records.
pub trait AuditSink: Send + Sync {
    fn log_event(&self, event: AuditEvent);
}

impl<T: AuditSink + ?Sized> AuditSink for Arc<T> {
    fn log_event(&self, event: AuditEvent) {
        (**self).log_event(event)
    }
}

/// Writes audit events to the `audit` log target
#[derive(Default, Copy, Clone, Debug)]
pub struct LogAuditSink;

impl AuditSink for LogAuditSink {
    fn log_event(&self, event: AuditEvent) {
        let user = match event.user_id {
            Some(id) => id.to_string(),
            None => "-".to_owned(),
        };
        match event.outcome {
            Outcome::Success => info!(
                target: "audit",
                "{} {} {} {}: {}", event.actor, user, event.action, event.outcome, event.detail
            ),
            Outcome::Failed => warn!(
                target: "audit",
                "{} {} {} {}: {}", event.actor, user, event.action, event.outcome, event.detail
            ),
        }
    }
}

/// Keeps audit events in memory
#[derive(Default)]
pub struct MemAuditLog {
    events: Mutex<Vec<AuditEvent>>,
}

impl MemAuditLog {
    /// A copy of everything recorded so far
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl AuditSink for MemAuditLog {
    fn log_event(&self, event: AuditEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}
