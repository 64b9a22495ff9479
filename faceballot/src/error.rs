use crate::*;

use thiserror::Error;

/// Reasons the identity encoder refuses to produce an embedding
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Rejection {
    #[error("faceballot: no face detected")]
    NoFaceDetected,

    #[error("faceballot: face detected with low confidence ({0:.3})")]
    LowConfidenceDetection(f32),

    #[error("faceballot: face processing error: {0}")]
    ProcessingError(String),
}

/// Error types
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Rejected(#[from] Rejection),

    #[error("faceballot: invalid policy: {0}")]
    InvalidPolicy(String),

    #[error("faceballot: unable to read policy: {0}")]
    PolicyIo(#[from] std::io::Error),

    #[error("faceballot: JSON error: {0}")]
    JSONDeserialization(#[from] serde_json::Error),

    #[error("faceballot: CBOR error: {0}")]
    CBOR(#[from] serde_cbor::Error),

    #[error("faceballot: unsupported template format {0}")]
    UnsupportedTemplateFormat(u8),

    #[error("faceballot: template declares {declared} dimensions but holds {actual}")]
    TemplateDimensionMismatch { declared: u32, actual: usize },

    #[error("faceballot: invalid integrity hash - invalid hexidecimal")]
    HashBadHex,

    #[error("faceballot: invalid integrity hash - wrong length")]
    HashBadLen,

    #[error("faceballot: integrity hash does not match ciphertext")]
    IntegrityMismatch,

    #[error("faceballot: RSA key generation failed: {0}")]
    KeyGenerationError(rsa::errors::Error),

    #[error("faceballot: invalid election key: {0}")]
    InvalidKey(String),

    #[error("faceballot: failed to encrypt vote: {0}")]
    EncryptionError(rsa::errors::Error),

    #[error("faceballot: malformed ciphertext")]
    MalformedCiphertext,

    // Deliberately carries no detail
    #[error("faceballot: failed to decrypt vote")]
    DecryptionError,

    #[error("faceballot: face verification failed: {reason} (similarity: {score:.2})")]
    FaceVerificationFailed { score: f64, reason: MatchReason },

    #[error("faceballot: voter {voter} is not eligible to vote in election {election}")]
    NotEligible { voter: VoterId, election: ElectionId },

    #[error("faceballot: no enrollment template for voter {0}")]
    TemplateNotFound(VoterId),

    #[error("faceballot: no keys for election {0}")]
    ElectionKeyNotFound(ElectionId),

    #[error("faceballot: election {0} already exists")]
    ElectionExists(ElectionId),

    #[error("faceballot: voter {voter} has already voted in election {election}")]
    AlreadyVoted { voter: VoterId, election: ElectionId },

    #[error("faceballot: vote {0} not found")]
    VoteNotFound(VoteId),
}
