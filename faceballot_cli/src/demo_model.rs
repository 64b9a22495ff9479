//! A toy face model for demos: faces are solid patches of colour on a black
//! background, and identity is the patch's hue. Brightness doesn't change who you are.

use faceballot::*;

/// Pixels brighter than this in any channel count as face
const BACKGROUND_CUTOFF: u8 = 16;

/// Face colours that the model tells apart
pub const PALETTE: [[u8; 3]; 6] = [
    [220, 40, 40],
    [40, 220, 40],
    [40, 40, 220],
    [220, 220, 40],
    [220, 40, 220],
    [40, 220, 220],
];

#[derive(Copy, Clone, Debug)]
pub struct SyntheticModel {
    pub dims: usize,
}

impl SyntheticModel {
    pub fn new(policy: &Policy) -> Self {
        SyntheticModel {
            dims: policy.encoder.embedding_dims,
        }
    }

    /// Draw a face of the given colour, brightened by `lighting`
    pub fn capture(colour: [u8; 3], lighting: u8) -> Frame {
        const SIZE: u32 = 128;
        const FACE: std::ops::Range<u32> = 32..96;

        let mut pixels = Vec::with_capacity((SIZE * SIZE * 3) as usize);
        for y in 0..SIZE {
            for x in 0..SIZE {
                if FACE.contains(&x) && FACE.contains(&y) {
                    pixels.extend(colour.iter().map(|c| c.saturating_add(lighting)));
                } else {
                    pixels.extend_from_slice(&[0, 0, 0]);
                }
            }
        }

        // Dimensions and buffer always agree here
        Frame::new(SIZE, SIZE, pixels).unwrap()
    }

    // Fixed pseudo-random projection from colour space to embedding space
    fn basis(i: usize, channel: usize) -> f32 {
        let v = ((i * 3 + channel) as f64 * 12.9898).sin() * 43758.5453;
        (v.fract().abs() * 2.0 - 1.0) as f32
    }
}

impl FaceDetector for SyntheticModel {
    fn detect_faces(&self, frame: &Frame) -> Result<Vec<Detection>, ModelError> {
        let mut bounds: Option<(u32, u32, u32, u32)> = None;
        let mut lit = 0u64;

        for y in 0..frame.height() {
            for x in 0..frame.width() {
                if frame.pixel(x, y).iter().any(|c| *c > BACKGROUND_CUTOFF) {
                    lit += 1;
                    bounds = Some(match bounds {
                        None => (x, y, x, y),
                        Some((x0, y0, x1, y1)) => (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
                    });
                }
            }
        }

        let (x0, y0, x1, y1) = match bounds {
            Some(bounds) => bounds,
            None => return Ok(vec![]),
        };
        let width = x1 - x0 + 1;
        let height = y1 - y0 + 1;

        // A patchy blob is a poor face
        let fill = lit as f32 / (width as u64 * height as u64) as f32;

        Ok(vec![Detection {
            bounding_box: BoundingBox {
                x: x0 as i32,
                y: y0 as i32,
                width: width as i32,
                height: height as i32,
            },
            confidence: 0.99 * fill,
        }])
    }
}

impl FaceEmbedder for SyntheticModel {
    fn embed(&self, face: &Frame) -> Result<Vec<f32>, ModelError> {
        let pixels = (face.width() * face.height()) as f32;
        if pixels == 0.0 {
            return Err(ModelError("empty face crop".to_owned()));
        }

        let mut mean = [0f32; 3];
        for rgb in face.as_bytes().chunks_exact(3) {
            for (m, c) in mean.iter_mut().zip(rgb) {
                *m += *c as f32 / 255.0;
            }
        }
        for m in mean.iter_mut() {
            *m /= pixels;
        }

        // Drop the grey component, leaving hue and saturation
        let grey = mean.iter().sum::<f32>() / 3.0;
        for m in mean.iter_mut() {
            *m -= grey;
        }

        Ok((0..self.dims)
            .map(|i| {
                (0..3)
                    .map(|channel| mean[channel] * SyntheticModel::basis(i, channel))
                    .sum::<f32>()
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: [u8; 3] = PALETTE[0];

    #[test]
    fn same_colour_matches_and_others_do_not() {
        let policy = Policy::default();
        let model = SyntheticModel::new(&policy);
        let matcher = FaceMatcher::new(model, model, policy);

        let template = matcher.register(&SyntheticModel::capture(RED, 0)).unwrap();

        let later = matcher
            .authenticate(&SyntheticModel::capture(RED, 12), &template)
            .unwrap();
        assert!(later.is_match);

        for colour in &PALETTE[1..] {
            let stranger = matcher
                .authenticate(&SyntheticModel::capture(*colour, 0), &template)
                .unwrap();
            assert!(!stranger.is_match, "{:?} matched red", colour);
            assert_eq!(stranger.reason, MatchReason::BelowThreshold);
        }
    }

    #[test]
    fn blank_frame_has_no_face() {
        let policy = Policy::default();
        let model = SyntheticModel::new(&policy);
        let frame = Frame::filled(64, 64, [0, 0, 0]).unwrap();
        assert!(model.detect_faces(&frame).unwrap().is_empty());

        let matcher = FaceMatcher::new(model, model, policy);
        assert_eq!(matcher.register(&frame), Err(Rejection::NoFaceDetected));
    }
}
