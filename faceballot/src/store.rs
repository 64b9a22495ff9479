use crate::*;
use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

pub type VoterId = u64;
pub type ElectionId = u64;

/// Identifier handed back when a vote is recorded; the key for receipt lookups
#[derive(Serialize, Deserialize, Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct VoteId(pub u64);

impl std::fmt::Display for VoteId {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Authoritative answer to "may this voter vote in this election right now"
pub trait Eligibility: Send + Sync {
    fn is_eligible(&self, voter: VoterId, election: ElectionId) -> bool;
}

/// Enrollment templates, one per voter
pub trait TemplateStore: Send + Sync {
    fn load_template(&self, voter: VoterId) -> Option<EnrollmentTemplate>;

    /// Save a template, replacing any earlier enrollment
    fn save_template(&self, voter: VoterId, template: EnrollmentTemplate);
}

/// Election keys, one pair per election
pub trait ElectionKeyStore: Send + Sync {
    /// Store a new election's keys. Must refuse an election that already has keys.
    fn save_key_pair(&self, election: ElectionId, keys: ElectionKeyPair) -> Result<(), Error>;

    fn load_public_key(&self, election: ElectionId) -> Option<ElectionPublicKey>;

    /// Only to be called from the post-close tallying path
    fn load_private_key(&self, election: ElectionId) -> Option<ElectionPrivateKey>;
}

/// Persistent record of cast votes
pub trait VoteLedger: Send + Sync {
    /// Atomically record a vote. Must refuse a second vote for the same (voter, election).
    fn record_vote(
        &self,
        voter: VoterId,
        election: ElectionId,
        vote: SealedVote,
    ) -> Result<VoteId, Error>;

    /// The election a vote was cast in, and the vote itself
    fn load_vote(&self, id: VoteId) -> Option<(ElectionId, SealedVote)>;

    /// The receipt hash stored for a vote
    fn stored_hash(&self, id: VoteId) -> Option<IntegrityHash> {
        self.load_vote(id).map(|(_, vote)| vote.integrity_hash())
    }
}

#[derive(Default)]
struct MemStoreInner {
    eligible: BTreeSet<(VoterId, ElectionId)>,
    templates: BTreeMap<VoterId, EnrollmentTemplate>,
    keys: BTreeMap<ElectionId, ElectionKeyPair>,
    votes: BTreeMap<VoteId, (ElectionId, SealedVote)>,
    voted: BTreeSet<(VoterId, ElectionId)>,
    next_vote_id: u64,
}

/// A simple store that keeps everything in memory.
///
/// Implements every collaborator trait. Eligibility is an allow-list, and a
/// voter who has already voted in an election is no longer eligible for it.
#[derive(Default)]
pub struct MemStore {
    inner: RwLock<MemStoreInner>,
}

impl MemStore {
    fn read(&self) -> RwLockReadGuard<MemStoreInner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<MemStoreInner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add a voter to an election's electoral roll
    pub fn allow(&self, voter: VoterId, election: ElectionId) {
        self.write().eligible.insert((voter, election));
    }

    /// Number of votes recorded for an election
    pub fn vote_count(&self, election: ElectionId) -> usize {
        self.read()
            .votes
            .values()
            .filter(|(e, _)| *e == election)
            .count()
    }

    /// All votes recorded for an election, in the order they were cast
    pub fn votes(&self, election: ElectionId) -> Vec<(VoteId, SealedVote)> {
        self.read()
            .votes
            .iter()
            .filter(|(_, (e, _))| *e == election)
            .map(|(id, (_, vote))| (*id, vote.clone()))
            .collect()
    }
}

impl Eligibility for MemStore {
    fn is_eligible(&self, voter: VoterId, election: ElectionId) -> bool {
        let inner = self.read();
        inner.eligible.contains(&(voter, election)) && !inner.voted.contains(&(voter, election))
    }
}

impl TemplateStore for MemStore {
    fn load_template(&self, voter: VoterId) -> Option<EnrollmentTemplate> {
        self.read().templates.get(&voter).cloned()
    }

    fn save_template(&self, voter: VoterId, template: EnrollmentTemplate) {
        self.write().templates.insert(voter, template);
    }
}

impl ElectionKeyStore for MemStore {
    fn save_key_pair(&self, election: ElectionId, keys: ElectionKeyPair) -> Result<(), Error> {
        match self.write().keys.entry(election) {
            Entry::Occupied(_) => Err(Error::ElectionExists(election)),
            Entry::Vacant(entry) => {
                entry.insert(keys);
                Ok(())
            }
        }
    }

    fn load_public_key(&self, election: ElectionId) -> Option<ElectionPublicKey> {
        self.read()
            .keys
            .get(&election)
            .map(|keys| keys.public_key.clone())
    }

    fn load_private_key(&self, election: ElectionId) -> Option<ElectionPrivateKey> {
        self.read()
            .keys
            .get(&election)
            .map(|keys| keys.private_key.clone())
    }
}

impl VoteLedger for MemStore {
    fn record_vote(
        &self,
        voter: VoterId,
        election: ElectionId,
        vote: SealedVote,
    ) -> Result<VoteId, Error> {
        // Check and insert under one lock so two concurrent casts can't both win
        let mut inner = self.write();
        if !inner.voted.insert((voter, election)) {
            return Err(Error::AlreadyVoted { voter, election });
        }

        inner.next_vote_id += 1;
        let id = VoteId(inner.next_vote_id);
        inner.votes.insert(id, (election, vote));
        Ok(id)
    }

    fn load_vote(&self, id: VoteId) -> Option<(ElectionId, SealedVote)> {
        self.read().votes.get(&id).cloned()
    }
}
