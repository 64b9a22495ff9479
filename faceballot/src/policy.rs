use crate::*;
use std::env::var;
use std::path::Path;

/// Encoder settings: detection gate, crop and embedding shape
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct EncoderPolicy {
    /// Faces detected with lower confidence than this are rejected
    pub min_confidence: f32,

    /// Margin in pixels added around the detected face before cropping
    pub padding: u32,

    /// Side length of the square the cropped face is resized to
    pub face_size: u32,

    /// Length of the embedding vector the model must produce
    pub embedding_dims: usize,
}

impl Default for EncoderPolicy {
    fn default() -> Self {
        EncoderPolicy {
            min_confidence: 0.9,
            padding: 20,
            face_size: 160,
            embedding_dims: 512,
        }
    }
}

/// Matcher settings
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct MatchPolicy {
    /// Minimum cosine similarity for a match (inclusive)
    pub threshold: f64,
}

impl Default for MatchPolicy {
    fn default() -> Self {
        MatchPolicy { threshold: 0.6 }
    }
}

/// Full biometric policy.
///
/// `version` is stamped into every enrollment template. Bump it whenever a change
/// to the model or the encoder settings makes old embeddings incomparable.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct Policy {
    pub version: u16,
    pub encoder: EncoderPolicy,
    pub matcher: MatchPolicy,
}

impl Default for Policy {
    fn default() -> Self {
        Policy {
            version: 1,
            encoder: EncoderPolicy::default(),
            matcher: MatchPolicy::default(),
        }
    }
}

impl Policy {
    /// Parse a policy from JSON. Missing fields take their defaults.
    pub fn from_json(bytes: &[u8]) -> Result<Self, Error> {
        let policy: Policy = serde_json::from_slice(bytes)?;
        policy.validate()?;
        Ok(policy)
    }

    /// Load a policy from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let bytes = std::fs::read(path)?;
        Policy::from_json(&bytes)
    }

    /// Build a policy from the environment.
    ///
    /// `FACEBALLOT_POLICY` names a JSON policy file (defaults apply if unset).
    /// `FACEBALLOT_MATCH_THRESHOLD` and `FACEBALLOT_MIN_CONFIDENCE` override single values.
    pub fn from_env() -> Result<Self, Error> {
        let mut policy = match var("FACEBALLOT_POLICY") {
            Ok(path) => Policy::from_file(path)?,
            Err(_e) => Policy::default(),
        };

        if let Ok(val) = var("FACEBALLOT_MATCH_THRESHOLD") {
            policy.matcher.threshold = val.trim().parse().map_err(|_| {
                Error::InvalidPolicy(format!("FACEBALLOT_MATCH_THRESHOLD is not a number: {}", val))
            })?;
        }
        if let Ok(val) = var("FACEBALLOT_MIN_CONFIDENCE") {
            policy.encoder.min_confidence = val.trim().parse().map_err(|_| {
                Error::InvalidPolicy(format!("FACEBALLOT_MIN_CONFIDENCE is not a number: {}", val))
            })?;
        }

        policy.validate()?;
        Ok(policy)
    }

    /// Make sure the settings are sane
    pub fn validate(&self) -> Result<(), Error> {
        let threshold = self.matcher.threshold;
        if !threshold.is_finite() || !(-1.0..=1.0).contains(&threshold) {
            return Err(Error::InvalidPolicy(format!(
                "match threshold {} is outside [-1, 1]",
                threshold
            )));
        }

        let confidence = self.encoder.min_confidence;
        if !confidence.is_finite() || !(0.0..=1.0).contains(&confidence) {
            return Err(Error::InvalidPolicy(format!(
                "minimum detection confidence {} is outside [0, 1]",
                confidence
            )));
        }

        if self.encoder.face_size == 0 {
            return Err(Error::InvalidPolicy("face size must be non-zero".to_owned()));
        }
        if self.encoder.embedding_dims == 0 {
            return Err(Error::InvalidPolicy(
                "embedding dimensions must be non-zero".to_owned(),
            ));
        }

        Ok(())
    }
}
