use crate::*;

/// Why a verification came out the way it did
#[derive(Serialize, Deserialize, Copy, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MatchReason {
    Matched,
    BelowThreshold,
    DegenerateVector,
    DimensionMismatch,
    PolicyMismatch,
}

impl std::fmt::Display for MatchReason {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let text = match self {
            MatchReason::Matched => "face verified successfully",
            MatchReason::BelowThreshold => "face does not match",
            MatchReason::DegenerateVector => "degenerate embedding",
            MatchReason::DimensionMismatch => "embedding length differs from template",
            MatchReason::PolicyMismatch => "template was enrolled under a different policy",
        };
        f.write_str(text)
    }
}

/// The outcome of comparing a fresh capture against an enrollment template.
///
/// A non-match is a normal decision, not an error.
#[derive(Serialize, Deserialize, Copy, Clone, Debug, PartialEq)]
pub struct MatchDecision {
    pub is_match: bool,
    pub score: f64,
    pub reason: MatchReason,
}

impl MatchDecision {
    fn rejected(reason: MatchReason) -> Self {
        MatchDecision {
            is_match: false,
            score: 0.0,
            reason,
        }
    }
}

/// Cosine similarity of two equal-length vectors, clamped to [-1, 1].
///
/// Returns None if the lengths differ, either vector has zero norm, or a value is not finite.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Option<f64> {
    if a.len() != b.len() {
        return None;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (&x, &y) in a.iter().zip(b.iter()) {
        let (x, y) = (f64::from(x), f64::from(y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    // sqrt of the product rather than a product of square roots keeps score(a, a) at exactly 1
    let denominator = (norm_a * norm_b).sqrt();
    if !dot.is_finite() || !denominator.is_finite() || denominator == 0.0 {
        return None;
    }

    Some((dot / denominator).max(-1.0).min(1.0))
}

/// Enrolls voters and verifies fresh captures against their templates
pub struct FaceMatcher<D, E> {
    encoder: IdentityEncoder<D, E>,
    threshold: f64,
    policy_version: u16,
}

impl<D: FaceDetector, E: FaceEmbedder> FaceMatcher<D, E> {
    pub fn new(detector: D, embedder: E, policy: Policy) -> Self {
        FaceMatcher {
            encoder: IdentityEncoder::new(detector, embedder, policy.encoder),
            threshold: policy.matcher.threshold,
            policy_version: policy.version,
        }
    }

    pub fn encoder(&self) -> &IdentityEncoder<D, E> {
        &self.encoder
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Build an enrollment template from a capture
    pub fn register(&self, frame: &Frame) -> Result<EnrollmentTemplate, Rejection> {
        let embedding = self.encoder.encode(frame)?;
        Ok(EnrollmentTemplate::new(embedding, self.policy_version))
    }

    /// Compare a fresh embedding against a stored template
    pub fn verify(&self, fresh: &Embedding, template: &EnrollmentTemplate) -> MatchDecision {
        if template.policy_version() != self.policy_version {
            return MatchDecision::rejected(MatchReason::PolicyMismatch);
        }

        let stored = template.embedding();
        if fresh.len() != stored.len() {
            return MatchDecision::rejected(MatchReason::DimensionMismatch);
        }

        let score = match cosine_similarity(fresh.as_slice(), stored.as_slice()) {
            Some(score) => score,
            None => return MatchDecision::rejected(MatchReason::DegenerateVector),
        };

        let is_match = score >= self.threshold;
        MatchDecision {
            is_match,
            score,
            reason: if is_match {
                MatchReason::Matched
            } else {
                MatchReason::BelowThreshold
            },
        }
    }

    /// Encode a capture and verify it against a template
    pub fn authenticate(
        &self,
        frame: &Frame,
        template: &EnrollmentTemplate,
    ) -> Result<MatchDecision, Rejection> {
        let fresh = self.encoder.encode(frame)?;
        Ok(self.verify(&fresh, template))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    struct NoModel;

    impl FaceDetector for NoModel {
        fn detect_faces(&self, _frame: &Frame) -> Result<Vec<Detection>, ModelError> {
            Ok(vec![])
        }
    }

    impl FaceEmbedder for NoModel {
        fn embed(&self, _face: &Frame) -> Result<Vec<f32>, ModelError> {
            Err(ModelError("unreachable".to_owned()))
        }
    }

    fn matcher() -> FaceMatcher<NoModel, NoModel> {
        FaceMatcher::new(NoModel, NoModel, Policy::default())
    }

    fn template(values: Vec<f32>) -> EnrollmentTemplate {
        EnrollmentTemplate::new(values.into(), Policy::default().version)
    }

    #[test]
    fn self_similarity() {
        let a = vec![0.3, -1.2, 4.5, 0.01];
        let decision = matcher().verify(&a.clone().into(), &template(a));
        assert_eq!(decision.score, 1.0);
        assert!(decision.is_match);
        assert_eq!(decision.reason, MatchReason::Matched);
    }

    #[test]
    fn threshold_is_inclusive() {
        // cos = 3 / 5 exactly
        let decision = matcher().verify(&vec![3.0, 4.0].into(), &template(vec![1.0, 0.0]));
        assert_eq!(decision.score, 0.6);
        assert!(decision.is_match);

        let decision = matcher().verify(&vec![2.9, 4.0].into(), &template(vec![1.0, 0.0]));
        assert!(decision.score < 0.6);
        assert!(!decision.is_match);
        assert_eq!(decision.reason, MatchReason::BelowThreshold);
    }

    #[test]
    fn degenerate_vectors() {
        let decision = matcher().verify(&vec![0.0, 0.0].into(), &template(vec![1.0, 0.0]));
        assert_eq!(decision, MatchDecision::rejected(MatchReason::DegenerateVector));

        let decision = matcher().verify(&vec![1.0, 0.0].into(), &template(vec![0.0, 0.0]));
        assert_eq!(decision.reason, MatchReason::DegenerateVector);
        assert_eq!(decision.score, 0.0);

        let decision = matcher().verify(&vec![f32::INFINITY, 0.0].into(), &template(vec![1.0, 0.0]));
        assert_eq!(decision.reason, MatchReason::DegenerateVector);
    }

    #[test]
    fn dimension_and_policy_mismatch() {
        let decision = matcher().verify(&vec![1.0, 0.0, 0.0].into(), &template(vec![1.0, 0.0]));
        assert_eq!(decision.reason, MatchReason::DimensionMismatch);
        assert!(!decision.is_match);

        let old = EnrollmentTemplate::new(vec![1.0, 0.0].into(), 0);
        let decision = matcher().verify(&vec![1.0, 0.0].into(), &old);
        assert_eq!(decision.reason, MatchReason::PolicyMismatch);
        assert!(!decision.is_match);
    }

    #[test]
    fn register_propagates_rejection() {
        let frame = Frame::filled(8, 8, [0, 0, 0]).unwrap();
        assert_eq!(matcher().register(&frame), Err(Rejection::NoFaceDetected));
        assert_eq!(
            matcher().authenticate(&frame, &template(vec![1.0])),
            Err(Rejection::NoFaceDetected)
        );
    }

    proptest! {
        #[test]
        fn similarity_is_symmetric_and_bounded(
            a in prop::collection::vec(-100.0f32..100.0, 16),
            b in prop::collection::vec(-100.0f32..100.0, 16),
        ) {
            let ab = cosine_similarity(&a, &b);
            let ba = cosine_similarity(&b, &a);
            prop_assert_eq!(ab, ba);
            if let Some(score) = ab {
                prop_assert!((-1.0..=1.0).contains(&score));
            }
        }

        #[test]
        fn self_similarity_is_one(a in prop::collection::vec(-100.0f32..100.0, 1..64)) {
            prop_assume!(a.iter().any(|v| *v != 0.0));
            prop_assert_eq!(cosine_similarity(&a, &a), Some(1.0));
        }

        #[test]
        fn zero_vectors_never_panic(b in prop::collection::vec(-100.0f32..100.0, 8)) {
            let zero = vec![0.0f32; 8];
            prop_assert_eq!(cosine_similarity(&zero, &b), None);
            let decision = matcher().verify(&zero.into(), &template(b));
            prop_assert_eq!(decision.reason, MatchReason::DegenerateVector);
        }
    }
}
