use crate::*;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::convert::TryFrom;
use std::convert::TryInto;
use std::str::FromStr;

/// SHA-256 of a vote's raw ciphertext bytes.
///
/// This is the voter's receipt. It is public: anyone holding the ciphertext can
/// recompute it, and it says nothing about the choice inside.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct IntegrityHash([u8; 32]);

impl IntegrityHash {
    /// Hash raw ciphertext bytes
    pub fn of(ciphertext: &[u8]) -> Self {
        let mut hash = [0u8; 32];
        hash.copy_from_slice(&Sha256::digest(ciphertext));
        IntegrityHash(hash)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl FromStr for IntegrityHash {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s.trim()).map_err(|_| Error::HashBadHex)?;
        let bytes: [u8; 32] = bytes.as_slice().try_into().map_err(|_| Error::HashBadLen)?;
        Ok(IntegrityHash(bytes))
    }
}

impl std::fmt::Display for IntegrityHash {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl std::fmt::Debug for IntegrityHash {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "IntegrityHash({})", self)
    }
}

impl<'de> Deserialize<'de> for IntegrityHash {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        FromStr::from_str(&s).map_err(de::Error::custom)
    }
}

impl Serialize for IntegrityHash {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

/// An encrypted vote and its receipt.
///
/// `integrity_hash == sha256(ciphertext)` holds for every value of this type:
/// the hash is computed on construction and checked on deserialization.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "SealedVoteRecord", try_from = "SealedVoteRecord")]
pub struct SealedVote {
    ciphertext: Vec<u8>,
    integrity_hash: IntegrityHash,
}

impl SealedVote {
    /// Wrap raw ciphertext bytes, computing the receipt
    pub fn from_ciphertext(ciphertext: &[u8]) -> Self {
        SealedVote {
            ciphertext: ciphertext.to_vec(),
            integrity_hash: IntegrityHash::of(ciphertext),
        }
    }

    /// Decode standard base64 ciphertext
    pub fn from_base64(ciphertext: &str) -> Result<Self, Error> {
        let bytes = STANDARD
            .decode(ciphertext.trim())
            .map_err(|_| Error::MalformedCiphertext)?;
        Ok(SealedVote::from_ciphertext(&bytes))
    }

    /// Raw ciphertext bytes
    pub fn ciphertext_bytes(&self) -> &[u8] {
        &self.ciphertext
    }

    /// Ciphertext as standard, padded base64
    pub fn ciphertext(&self) -> String {
        STANDARD.encode(&self.ciphertext)
    }

    pub fn integrity_hash(&self) -> IntegrityHash {
        self.integrity_hash
    }

    /// Check a voter-held receipt against this vote
    pub fn matches_receipt(&self, receipt: &str) -> bool {
        match IntegrityHash::from_str(receipt) {
            Ok(hash) => hash == self.integrity_hash,
            Err(_) => false,
        }
    }
}

#[derive(Serialize, Deserialize, Clone)]
struct SealedVoteRecord {
    ciphertext: String,
    integrity_hash: IntegrityHash,
}

impl From<SealedVote> for SealedVoteRecord {
    fn from(vote: SealedVote) -> Self {
        SealedVoteRecord {
            ciphertext: vote.ciphertext(),
            integrity_hash: vote.integrity_hash,
        }
    }
}

impl TryFrom<SealedVoteRecord> for SealedVote {
    type Error = Error;

    fn try_from(record: SealedVoteRecord) -> Result<Self, Self::Error> {
        let vote = SealedVote::from_base64(&record.ciphertext)?;
        if vote.integrity_hash != record.integrity_hash {
            return Err(Error::IntegrityMismatch);
        }
        Ok(vote)
    }
}
