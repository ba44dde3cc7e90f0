//! Pixel collision masks
//!
//! Each mask row is a `u128` bitset (bit `x` set = opaque pixel at column `x`),
//! so masks are at most 128 pixels wide. Overlap tests AND shifted rows over
//! the intersecting band instead of walking pixels.

use serde::{Deserialize, Serialize};

use crate::consts::*;

/// Widest mask a row bitset can hold
pub const MASK_MAX_WIDTH: u32 = 128;

/// A 1-bit opacity mask
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mask {
    width: u32,
    height: u32,
    rows: Vec<u128>,
}

impl Mask {
    /// Build a mask from a per-pixel predicate. Width is capped at `MASK_MAX_WIDTH`.
    pub fn from_fn(width: u32, height: u32, opaque: impl Fn(u32, u32) -> bool) -> Self {
        let width = width.min(MASK_MAX_WIDTH);
        let rows = (0..height)
            .map(|y| {
                (0..width).fold(0u128, |row, x| {
                    if opaque(x, y) { row | (1u128 << x) } else { row }
                })
            })
            .collect();
        Self {
            width,
            height,
            rows,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn get(&self, x: u32, y: u32) -> bool {
        x < self.width && y < self.height && self.rows[y as usize] & (1u128 << x) != 0
    }

    /// Mirror top to bottom
    pub fn flipped_vertical(&self) -> Self {
        Self {
            width: self.width,
            height: self.height,
            rows: self.rows.iter().rev().copied().collect(),
        }
    }

    /// First overlapping pixel (in `self` coordinates) when `other`'s top-left
    /// corner sits at `offset` relative to `self`'s top-left corner.
    pub fn overlap(&self, other: &Mask, offset: (i32, i32)) -> Option<(u32, u32)> {
        let (dx, dy) = offset;

        // Horizontal overlap band in self coordinates
        let x0 = dx.max(0);
        let x1 = (dx + other.width as i32).min(self.width as i32);
        let y0 = dy.max(0);
        let y1 = (dy + other.height as i32).min(self.height as i32);
        if x0 >= x1 || y0 >= y1 {
            return None;
        }

        for y in y0..y1 {
            let mine = self.rows[y as usize];
            let theirs = other.rows[(y - dy) as usize];
            let shifted = if dx >= 0 {
                theirs.checked_shl(dx as u32).unwrap_or(0)
            } else {
                theirs.checked_shr((-dx) as u32).unwrap_or(0)
            };
            let hit = mine & shifted;
            if hit != 0 {
                return Some((hit.trailing_zeros(), y as u32));
            }
        }
        None
    }
}

/// Immutable collision descriptors, built once and shared by every episode
#[derive(Debug, Clone)]
pub struct SpriteSet {
    pub bird: Mask,
    pub pipe_top: Mask,
    pub pipe_bottom: Mask,
}

impl SpriteSet {
    pub fn new() -> Self {
        let pipe_bottom = pipe_mask(PIPE_WIDTH, PIPE_HEIGHT);
        Self {
            bird: bird_mask(BIRD_WIDTH, BIRD_HEIGHT),
            pipe_top: pipe_bottom.flipped_vertical(),
            pipe_bottom,
        }
    }
}

impl Default for SpriteSet {
    fn default() -> Self {
        Self::new()
    }
}

/// Bird silhouette: an ellipse inset from the sprite box, leaving transparent
/// padding around the body.
fn bird_mask(width: u32, height: u32) -> Mask {
    let pad = 2.0;
    let cx = width as f32 / 2.0;
    let cy = height as f32 / 2.0;
    let rx = cx - pad;
    let ry = cy - pad;
    Mask::from_fn(width, height, |x, y| {
        let nx = (x as f32 + 0.5 - cx) / rx;
        let ny = (y as f32 + 0.5 - cy) / ry;
        nx * nx + ny * ny <= 1.0
    })
}

/// Pipe with its lip at the top: full width for the first rows, then a shaft
/// inset on both sides.
fn pipe_mask(width: u32, height: u32) -> Mask {
    let lip_rows = 48;
    let inset = 4;
    Mask::from_fn(width, height, |x, y| {
        y < lip_rows || (x >= inset && x < width.saturating_sub(inset))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(w: u32, h: u32) -> Mask {
        Mask::from_fn(w, h, |_, _| true)
    }

    #[test]
    fn test_overlap_solid_squares() {
        let a = solid(10, 10);
        let b = solid(10, 10);
        assert_eq!(a.overlap(&b, (5, 5)), Some((5, 5)));
        assert_eq!(a.overlap(&b, (-9, -9)), Some((0, 0)));
        assert_eq!(a.overlap(&b, (10, 0)), None);
        assert_eq!(a.overlap(&b, (0, -10)), None);
    }

    #[test]
    fn test_transparent_padding_does_not_collide() {
        let sprites = SpriteSet::new();
        // Bird corner pixel is transparent padding
        assert!(!sprites.bird.get(0, 0));
        // A 1x1 solid pixel touching only the corner misses
        let dot = solid(1, 1);
        assert_eq!(sprites.bird.overlap(&dot, (0, 0)), None);
        // The same pixel at the body center hits
        assert!(sprites.bird.overlap(&dot, (34, 24)).is_some());
    }

    #[test]
    fn test_pipe_top_is_flipped() {
        let sprites = SpriteSet::new();
        // Bottom pipe lip is at its top rows, top pipe lip at its bottom rows
        assert!(sprites.pipe_bottom.get(0, 0));
        assert!(!sprites.pipe_bottom.get(0, PIPE_HEIGHT - 1));
        assert!(sprites.pipe_top.get(0, PIPE_HEIGHT - 1));
        assert!(!sprites.pipe_top.get(0, 0));
    }

    #[test]
    fn test_width_is_capped() {
        let m = solid(300, 2);
        assert_eq!(m.width(), MASK_MAX_WIDTH);
        assert!(m.get(MASK_MAX_WIDTH - 1, 1));
        assert!(!m.get(MASK_MAX_WIDTH, 1));
    }

    #[test]
    fn test_far_offsets_do_not_overflow_shift() {
        let a = solid(128, 4);
        let b = solid(128, 4);
        assert_eq!(a.overlap(&b, (200, 0)), None);
        assert_eq!(a.overlap(&b, (-200, 0)), None);
        assert_eq!(a.overlap(&b, (127, 3)), Some((127, 3)));
    }
}
