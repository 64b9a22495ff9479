use crate::*;
use std::sync::Arc;

/// The external systems the voting booth leans on
#[derive(Clone)]
pub struct Collaborators {
    pub eligibility: Arc<dyn Eligibility>,
    pub templates: Arc<dyn TemplateStore>,
    pub keys: Arc<dyn ElectionKeyStore>,
    pub ledger: Arc<dyn VoteLedger>,
    pub audit: Arc<dyn AuditSink>,
}

impl Collaborators {
    /// Use one in-memory store for everything
    pub fn in_memory(store: Arc<MemStore>, audit: Arc<dyn AuditSink>) -> Self {
        Collaborators {
            eligibility: store.clone(),
            templates: store.clone(),
            keys: store.clone(),
            ledger: store,
            audit,
        }
    }
}

/// What a voter takes away after casting
#[derive(Serialize, Deserialize, Copy, Clone, Debug, PartialEq, Eq)]
pub struct CastReceipt {
    pub vote_id: VoteId,
    pub integrity_hash: IntegrityHash,
}

/// Ties face verification and the vote cipher to the collaborators.
///
/// Every authentication attempt, cast and decryption is audited, whatever the outcome.
pub struct VotingBooth<D, E, P = OsProvider> {
    matcher: FaceMatcher<D, E>,
    cipher: VoteCipher<P>,
    collaborators: Collaborators,
}

impl<D: FaceDetector, E: FaceEmbedder, P: CryptoProvider> VotingBooth<D, E, P> {
    pub fn new(matcher: FaceMatcher<D, E>, cipher: VoteCipher<P>, collaborators: Collaborators) -> Self {
        VotingBooth {
            matcher,
            cipher,
            collaborators,
        }
    }

    pub fn matcher(&self) -> &FaceMatcher<D, E> {
        &self.matcher
    }

    fn audit(
        &self,
        user_id: u64,
        actor: ActorType,
        action: ActionType,
        outcome: Outcome,
        detail: String,
    ) {
        self.collaborators.audit.log_event(AuditEvent {
            user_id: Some(user_id),
            actor,
            action,
            outcome,
            detail,
        });
    }

    fn audit_result<T>(
        &self,
        user_id: u64,
        actor: ActorType,
        action: ActionType,
        result: &Result<T, Error>,
        success: impl FnOnce(&T) -> String,
    ) {
        match result {
            Ok(value) => self.audit(user_id, actor, action, Outcome::Success, success(value)),
            Err(e) => {
                warn!("{} {} {} failed: {}", actor, user_id, action, e);
                self.audit(user_id, actor, action, Outcome::Failed, e.to_string())
            }
        }
    }

    /// Generate and store keys for a new election
    pub fn create_election(
        &self,
        admin: u64,
        election: ElectionId,
    ) -> Result<ElectionPublicKey, Error> {
        let result = self.try_create_election(election);

        self.audit_result(
            admin,
            ActorType::Admin,
            ActionType::ElectionCreate,
            &result,
            |_| format!("election {} created", election),
        );
        result
    }

    fn try_create_election(&self, election: ElectionId) -> Result<ElectionPublicKey, Error> {
        // Fail fast before keygen; the store still has the final say
        if self.collaborators.keys.load_public_key(election).is_some() {
            return Err(Error::ElectionExists(election));
        }

        let keys = self.cipher.generate_key_pair()?;
        let public_key = keys.public_key.clone();
        self.collaborators.keys.save_key_pair(election, keys)?;
        Ok(public_key)
    }

    /// Enroll (or re-enroll) a voter's face
    pub fn register_voter(&self, voter: VoterId, frame: &Frame) -> Result<(), Error> {
        let result = self
            .matcher
            .register(frame)
            .map(|template| self.collaborators.templates.save_template(voter, template))
            .map_err(Error::from);

        self.audit_result(
            voter,
            ActorType::Voter,
            ActionType::Registration,
            &result,
            |_| "voter registration".to_owned(),
        );
        result
    }

    /// Verify a live capture against the voter's enrollment.
    ///
    /// A non-match comes back as a decision, not an error.
    pub fn authenticate(&self, voter: VoterId, frame: &Frame) -> Result<MatchDecision, Error> {
        let template = match self.collaborators.templates.load_template(voter) {
            Some(template) => template,
            None => {
                let err = Error::TemplateNotFound(voter);
                self.audit(
                    voter,
                    ActorType::Voter,
                    ActionType::FaceAuth,
                    Outcome::Failed,
                    err.to_string(),
                );
                return Err(err);
            }
        };

        let decision = match self.matcher.authenticate(frame, &template) {
            Ok(decision) => decision,
            Err(rejection) => {
                self.audit(
                    voter,
                    ActorType::Voter,
                    ActionType::FaceAuth,
                    Outcome::Failed,
                    rejection.to_string(),
                );
                return Err(rejection.into());
            }
        };

        let outcome = if decision.is_match {
            Outcome::Success
        } else {
            Outcome::Failed
        };
        debug!(
            "voter {} face check: {} ({:.2})",
            voter, decision.reason, decision.score
        );
        self.audit(
            voter,
            ActorType::Voter,
            ActionType::FaceAuth,
            outcome,
            format!("{} (similarity: {:.2})", decision.reason, decision.score),
        );
        Ok(decision)
    }

    /// Verify the voter's face, then seal and record their choice
    pub fn cast_vote(
        &self,
        voter: VoterId,
        election: ElectionId,
        frame: &Frame,
        choice: Choice,
    ) -> Result<CastReceipt, Error> {
        let result = self.try_cast(voter, election, frame, choice);
        self.audit_result(
            voter,
            ActorType::Voter,
            ActionType::VoteCast,
            &result,
            |receipt| {
                format!(
                    "vote {} recorded in election {}",
                    receipt.vote_id, election
                )
            },
        );
        result
    }

    fn try_cast(
        &self,
        voter: VoterId,
        election: ElectionId,
        frame: &Frame,
        choice: Choice,
    ) -> Result<CastReceipt, Error> {
        let decision = self.authenticate(voter, frame)?;
        if !decision.is_match {
            return Err(Error::FaceVerificationFailed {
                score: decision.score,
                reason: decision.reason,
            });
        }

        if !self.collaborators.eligibility.is_eligible(voter, election) {
            return Err(Error::NotEligible { voter, election });
        }

        let public_key = self
            .collaborators
            .keys
            .load_public_key(election)
            .ok_or(Error::ElectionKeyNotFound(election))?;

        let sealed = self.cipher.seal(choice, &public_key)?;
        let integrity_hash = sealed.integrity_hash();
        let vote_id = self.collaborators.ledger.record_vote(voter, election, sealed)?;

        Ok(CastReceipt {
            vote_id,
            integrity_hash,
        })
    }

    /// Decrypt a recorded vote. Post-close, admin-only.
    pub fn open_vote(&self, admin: u64, vote_id: VoteId) -> Result<Choice, Error> {
        let result = self.try_open(vote_id);
        self.audit_result(
            admin,
            ActorType::Admin,
            ActionType::VoteDecrypt,
            &result,
            |_| format!("decrypted vote {}", vote_id),
        );
        result
    }

    fn try_open(&self, vote_id: VoteId) -> Result<Choice, Error> {
        let (election, sealed) = self
            .collaborators
            .ledger
            .load_vote(vote_id)
            .ok_or(Error::VoteNotFound(vote_id))?;

        let private_key = self
            .collaborators
            .keys
            .load_private_key(election)
            .ok_or(Error::ElectionKeyNotFound(election))?;

        self.cipher.open(&sealed, &private_key)
    }

    /// Public receipt check: does the stored vote carry this hash?
    pub fn verify_receipt(&self, vote_id: VoteId, receipt: &str) -> bool {
        let provided: IntegrityHash = match receipt.parse() {
            Ok(hash) => hash,
            Err(_) => return false,
        };

        self.collaborators.ledger.stored_hash(vote_id) == Some(provided)
    }
}
