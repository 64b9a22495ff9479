use crate::*;
use std::cmp::Ordering;
use std::sync::Arc;
use thiserror::Error;

/// An error reported by an external face model
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct ModelError(pub String);

/// A face found by a detector
#[derive(Serialize, Deserialize, Copy, Clone, Debug, PartialEq)]
pub struct Detection {
    pub bounding_box: BoundingBox,
    pub confidence: f32,
}

/// Locates faces in a frame.
///
/// Models that cannot be entered concurrently must serialize access themselves;
/// the encoder may be called from many request handlers at once.
pub trait FaceDetector: Send + Sync {
    fn detect_faces(&self, frame: &Frame) -> Result<Vec<Detection>, ModelError>;
}

/// Turns a cropped, square face into an identity vector
pub trait FaceEmbedder: Send + Sync {
    fn embed(&self, face: &Frame) -> Result<Vec<f32>, ModelError>;
}

impl<T: FaceDetector + ?Sized> FaceDetector for Arc<T> {
    fn detect_faces(&self, frame: &Frame) -> Result<Vec<Detection>, ModelError> {
        (**self).detect_faces(frame)
    }
}

impl<T: FaceEmbedder + ?Sized> FaceEmbedder for Arc<T> {
    fn embed(&self, face: &Frame) -> Result<Vec<f32>, ModelError> {
        (**self).embed(face)
    }
}

/// Converts a live capture into an embedding, or says why it can't
pub struct IdentityEncoder<D, E> {
    detector: D,
    embedder: E,
    policy: EncoderPolicy,
}

impl<D: FaceDetector, E: FaceEmbedder> IdentityEncoder<D, E> {
    pub fn new(detector: D, embedder: E, policy: EncoderPolicy) -> Self {
        IdentityEncoder {
            detector,
            embedder,
            policy,
        }
    }

    pub fn policy(&self) -> &EncoderPolicy {
        &self.policy
    }

    /// Encode the most confident face in the frame
    pub fn encode(&self, frame: &Frame) -> Result<Embedding, Rejection> {
        let faces = self
            .detector
            .detect_faces(frame)
            .map_err(|e| Rejection::ProcessingError(format!("face detection failed: {}", e)))?;

        let best = faces
            .into_iter()
            .filter(|face| face.confidence.is_finite())
            .max_by(|a, b| a.confidence.total_cmp(&b.confidence))
            .ok_or(Rejection::NoFaceDetected)?;

        // An incomparable (NaN) minimum rejects everything
        let passes = matches!(
            best.confidence.partial_cmp(&self.policy.min_confidence),
            Some(Ordering::Greater) | Some(Ordering::Equal)
        );
        if !passes {
            debug!(
                "best face confidence {:.3} is below {:.3}",
                best.confidence, self.policy.min_confidence
            );
            return Err(Rejection::LowConfidenceDetection(best.confidence));
        }

        let region = best
            .bounding_box
            .padded(self.policy.padding, frame.width(), frame.height())
            .ok_or_else(|| {
                Rejection::ProcessingError("face box lies outside the image".to_owned())
            })?;

        let size = self.policy.face_size;
        let face = frame.crop(&region).resize(size, size);

        let values = self
            .embedder
            .embed(&face)
            .map_err(|e| Rejection::ProcessingError(format!("embedding failed: {}", e)))?;

        if values.len() != self.policy.embedding_dims {
            return Err(Rejection::ProcessingError(format!(
                "model produced {} values, expected {}",
                values.len(),
                self.policy.embedding_dims
            )));
        }
        if values.iter().any(|v| !v.is_finite()) {
            return Err(Rejection::ProcessingError(
                "model produced non-finite values".to_owned(),
            ));
        }

        Ok(Embedding::new(values))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct FixedDetector(Vec<Detection>);

    impl FaceDetector for FixedDetector {
        fn detect_faces(&self, _frame: &Frame) -> Result<Vec<Detection>, ModelError> {
            Ok(self.0.clone())
        }
    }

    struct BrokenDetector;

    impl FaceDetector for BrokenDetector {
        fn detect_faces(&self, _frame: &Frame) -> Result<Vec<Detection>, ModelError> {
            Err(ModelError("corrupt image".to_owned()))
        }
    }

    /// Records the face it was handed and returns a fixed vector
    #[derive(Default)]
    struct RecordingEmbedder {
        seen: Mutex<Option<Frame>>,
        output: Vec<f32>,
    }

    impl FaceEmbedder for RecordingEmbedder {
        fn embed(&self, face: &Frame) -> Result<Vec<f32>, ModelError> {
            *self.seen.lock().unwrap() = Some(face.clone());
            Ok(self.output.clone())
        }
    }

    fn policy() -> EncoderPolicy {
        EncoderPolicy {
            embedding_dims: 3,
            ..EncoderPolicy::default()
        }
    }

    fn face(x: i32, confidence: f32) -> Detection {
        Detection {
            bounding_box: BoundingBox {
                x,
                y: 30,
                width: 40,
                height: 40,
            },
            confidence,
        }
    }

    fn embedder(output: Vec<f32>) -> Arc<RecordingEmbedder> {
        Arc::new(RecordingEmbedder {
            seen: Mutex::new(None),
            output,
        })
    }

    #[test]
    fn picks_most_confident_face() {
        // Left half black, right half white
        let mut pixels = Vec::new();
        for _y in 0..100 {
            for x in 0..200 {
                let v = if x < 100 { 0 } else { 255 };
                pixels.extend_from_slice(&[v, v, v]);
            }
        }
        let frame = Frame::new(200, 100, pixels).unwrap();

        let embedder = embedder(vec![0.1, 0.2, 0.3]);
        let detector = FixedDetector(vec![face(30, 0.95), face(130, 0.99), face(60, f32::NAN)]);
        let encoder = IdentityEncoder::new(detector, embedder.clone(), policy());

        let embedding = encoder.encode(&frame).unwrap();
        assert_eq!(embedding.as_slice(), &[0.1, 0.2, 0.3]);

        let seen = embedder.seen.lock().unwrap().clone().unwrap();
        assert_eq!((seen.width(), seen.height()), (160, 160));
        // The white face was chosen
        assert_eq!(seen.pixel(80, 80), [255, 255, 255]);
    }

    #[test]
    fn no_face() {
        let frame = Frame::filled(64, 64, [1, 2, 3]).unwrap();
        let encoder = IdentityEncoder::new(FixedDetector(vec![]), embedder(vec![0.0; 3]), policy());
        assert_eq!(encoder.encode(&frame), Err(Rejection::NoFaceDetected));
    }

    #[test]
    fn low_confidence() {
        let frame = Frame::filled(64, 64, [1, 2, 3]).unwrap();
        let detector = FixedDetector(vec![face(0, 0.5), face(10, 0.89)]);
        let encoder = IdentityEncoder::new(detector, embedder(vec![0.0; 3]), policy());
        assert_eq!(
            encoder.encode(&frame),
            Err(Rejection::LowConfidenceDetection(0.89))
        );
    }

    #[test]
    fn nan_minimum_confidence_rejects() {
        let frame = Frame::filled(64, 64, [1, 2, 3]).unwrap();
        let policy = EncoderPolicy {
            min_confidence: f32::NAN,
            ..policy()
        };
        for &confidence in &[0.01, 0.99, 1.0] {
            let detector = FixedDetector(vec![face(0, confidence)]);
            let encoder = IdentityEncoder::new(detector, embedder(vec![1.0; 3]), policy.clone());
            assert_eq!(
                encoder.encode(&frame),
                Err(Rejection::LowConfidenceDetection(confidence))
            );
        }
    }

    #[test]
    fn confidence_gate_is_inclusive() {
        let frame = Frame::filled(64, 64, [1, 2, 3]).unwrap();
        let detector = FixedDetector(vec![face(0, 0.9)]);
        let encoder = IdentityEncoder::new(detector, embedder(vec![1.0; 3]), policy());
        assert!(encoder.encode(&frame).is_ok());
    }

    #[test]
    fn processing_errors() {
        let frame = Frame::filled(64, 64, [1, 2, 3]).unwrap();

        let encoder = IdentityEncoder::new(BrokenDetector, embedder(vec![0.0; 3]), policy());
        assert!(matches!(
            encoder.encode(&frame),
            Err(Rejection::ProcessingError(_))
        ));

        // Wrong length from the model
        let detector = FixedDetector(vec![face(0, 0.99)]);
        let encoder = IdentityEncoder::new(detector, embedder(vec![0.0; 2]), policy());
        assert!(matches!(
            encoder.encode(&frame),
            Err(Rejection::ProcessingError(_))
        ));

        // NaN from the model
        let detector = FixedDetector(vec![face(0, 0.99)]);
        let encoder = IdentityEncoder::new(detector, embedder(vec![0.0, f32::NAN, 1.0]), policy());
        assert!(matches!(
            encoder.encode(&frame),
            Err(Rejection::ProcessingError(_))
        ));

        // Face box off the edge of the image
        let detector = FixedDetector(vec![face(900, 0.99)]);
        let encoder = IdentityEncoder::new(detector, embedder(vec![0.0; 3]), policy());
        assert!(matches!(
            encoder.encode(&frame),
            Err(Rejection::ProcessingError(_))
        ));
    }
}
