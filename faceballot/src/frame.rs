use crate::*;

const CHANNELS: usize = 3;

/// A decoded still image: tightly packed RGB8 pixels in row-major order.
///
/// Decoding of JPEG/PNG/etc. happens at the boundary, before a frame is built.
#[derive(Clone, PartialEq, Eq)]
pub struct Frame {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl Frame {
    /// Wrap a pixel buffer, checking that it matches the stated dimensions
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self, Rejection> {
        let expected = buffer_len(width, height)?;
        if pixels.len() != expected {
            return Err(Rejection::ProcessingError(format!(
                "pixel buffer holds {} bytes, expected {} for a {}x{} RGB image",
                pixels.len(),
                expected,
                width,
                height
            )));
        }

        Ok(Frame {
            width,
            height,
            pixels,
        })
    }

    /// A frame filled with a single colour
    pub fn filled(width: u32, height: u32, rgb: [u8; 3]) -> Result<Self, Rejection> {
        let len = buffer_len(width, height)?;
        let pixels = rgb.iter().copied().cycle().take(len).collect();
        Frame::new(width, height, pixels)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.pixels
    }

    /// RGB value at (x, y). Panics if out of bounds.
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 3] {
        let i = self.offset(x, y);
        [self.pixels[i], self.pixels[i + 1], self.pixels[i + 2]]
    }

    fn offset(&self, x: u32, y: u32) -> usize {
        assert!(x < self.width && y < self.height, "pixel out of bounds");
        (y as usize * self.width as usize + x as usize) * CHANNELS
    }

    /// Copy out a region. The region must lie within the frame.
    pub fn crop(&self, region: &Region) -> Frame {
        let mut pixels = Vec::with_capacity(region.width as usize * region.height as usize * CHANNELS);
        for y in region.y..region.y + region.height {
            let start = self.offset(region.x, y);
            let end = start + region.width as usize * CHANNELS;
            pixels.extend_from_slice(&self.pixels[start..end]);
        }

        Frame {
            width: region.width,
            height: region.height,
            pixels,
        }
    }

    /// Bilinear resize to `width` x `height`, sampling at pixel centres
    pub fn resize(&self, width: u32, height: u32) -> Frame {
        if width == self.width && height == self.height {
            return self.clone();
        }

        let scale_x = self.width as f32 / width as f32;
        let scale_y = self.height as f32 / height as f32;
        let max_x = (self.width - 1) as f32;
        let max_y = (self.height - 1) as f32;

        let mut pixels = Vec::with_capacity(width as usize * height as usize * CHANNELS);
        for dy in 0..height {
            let sy = ((dy as f32 + 0.5) * scale_y - 0.5).max(0.0).min(max_y);
            let y0 = sy.floor() as u32;
            let y1 = (y0 + 1).min(self.height - 1);
            let fy = sy - y0 as f32;

            for dx in 0..width {
                let sx = ((dx as f32 + 0.5) * scale_x - 0.5).max(0.0).min(max_x);
                let x0 = sx.floor() as u32;
                let x1 = (x0 + 1).min(self.width - 1);
                let fx = sx - x0 as f32;

                let p00 = self.pixel(x0, y0);
                let p10 = self.pixel(x1, y0);
                let p01 = self.pixel(x0, y1);
                let p11 = self.pixel(x1, y1);

                for c in 0..CHANNELS {
                    let top = p00[c] as f32 * (1.0 - fx) + p10[c] as f32 * fx;
                    let bottom = p01[c] as f32 * (1.0 - fx) + p11[c] as f32 * fx;
                    let value = top * (1.0 - fy) + bottom * fy;
                    pixels.push(value.round().max(0.0).min(255.0) as u8);
                }
            }
        }

        Frame {
            width,
            height,
            pixels,
        }
    }
}

/// Bytes needed for a `width` x `height` RGB image
fn buffer_len(width: u32, height: u32) -> Result<usize, Rejection> {
    if width == 0 || height == 0 {
        return Err(Rejection::ProcessingError(format!(
            "empty image ({}x{})",
            width, height
        )));
    }

    (width as usize)
        .checked_mul(height as usize)
        .and_then(|n| n.checked_mul(CHANNELS))
        .ok_or_else(|| {
            Rejection::ProcessingError(format!("image too large ({}x{})", width, height))
        })
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "Frame({}x{})", self.width, self.height)
    }
}

/// A face box as reported by a detector, in pixel coordinates.
///
/// Detectors may report boxes that hang over the frame edge, so the origin is signed.
#[derive(Serialize, Deserialize, Copy, Clone, Debug, PartialEq, Eq)]
pub struct BoundingBox {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl BoundingBox {
    /// Grow the box by `padding` on every side and clamp it to a `frame_width` x `frame_height` frame.
    ///
    /// Returns None if nothing of the padded box lies inside the frame.
    pub fn padded(&self, padding: u32, frame_width: u32, frame_height: u32) -> Option<Region> {
        let padding = i64::from(padding);
        let x0 = (i64::from(self.x) - padding).max(0);
        let y0 = (i64::from(self.y) - padding).max(0);
        let x1 = (i64::from(self.x) + i64::from(self.width) + padding).min(i64::from(frame_width));
        let y1 = (i64::from(self.y) + i64::from(self.height) + padding).min(i64::from(frame_height));

        if x1 <= x0 || y1 <= y0 {
            return None;
        }

        Some(Region {
            x: x0 as u32,
            y: y0 as u32,
            width: (x1 - x0) as u32,
            height: (y1 - y0) as u32,
        })
    }
}

/// A non-empty rectangle that lies within a frame
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}
