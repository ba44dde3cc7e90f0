//! Collision detection
//!
//! Flappy uses pixel-accurate mask overlap so transparent sprite padding never
//! registers a hit. Pong uses a coarse strict containment test of the ball
//! center against the paddle rectangle.

use glam::Vec2;

use super::mask::SpriteSet;
use super::obstacles::Pipe;

/// Check whether a bird at `bird_pos` overlaps either piece of `pipe`
pub fn bird_pipe_overlap(bird_pos: Vec2, pipe: &Pipe, sprites: &SpriteSet) -> bool {
    let bird_x = bird_pos.x.round() as i32;
    let bird_y = bird_pos.y.round() as i32;
    let pipe_x = pipe.x.round() as i32;

    let top_offset = (pipe_x - bird_x, pipe.top().round() as i32 - bird_y);
    let bottom_offset = (pipe_x - bird_x, pipe.bottom().round() as i32 - bird_y);

    sprites.bird.overlap(&sprites.pipe_bottom, bottom_offset).is_some()
        || sprites.bird.overlap(&sprites.pipe_top, top_offset).is_some()
}

/// Vertical play-area rule: above the top edge, or lower edge on/below the floor
#[inline]
pub fn out_of_bounds(y: f32, height: f32, floor_y: f32) -> bool {
    y < 0.0 || y + height >= floor_y
}

/// Strict containment of `point` inside the rectangle at `min` with `size`
#[inline]
pub fn point_in_rect(point: Vec2, min: Vec2, size: Vec2) -> bool {
    min.x < point.x && point.x < min.x + size.x && min.y < point.y && point.y < min.y + size.y
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::*;

    fn pipe_at(x: f32, gap_top: f32) -> Pipe {
        Pipe::new(1, x, gap_top)
    }

    #[test]
    fn test_bird_in_gap_misses() {
        let sprites = SpriteSet::new();
        let pipe = pipe_at(BIRD_START_X, 300.0);
        // Gap spans 300..500, bird occupies 380..428
        assert!(!bird_pipe_overlap(Vec2::new(BIRD_START_X, 380.0), &pipe, &sprites));
    }

    #[test]
    fn test_bird_hits_top_piece() {
        let sprites = SpriteSet::new();
        let pipe = pipe_at(BIRD_START_X, 300.0);
        assert!(bird_pipe_overlap(Vec2::new(BIRD_START_X, 280.0), &pipe, &sprites));
    }

    #[test]
    fn test_bird_hits_bottom_piece() {
        let sprites = SpriteSet::new();
        let pipe = pipe_at(BIRD_START_X, 300.0);
        assert!(bird_pipe_overlap(Vec2::new(BIRD_START_X, 470.0), &pipe, &sprites));
    }

    #[test]
    fn test_bird_beside_pipe_misses() {
        let sprites = SpriteSet::new();
        let pipe = pipe_at(BIRD_START_X + 200.0, 300.0);
        assert!(!bird_pipe_overlap(Vec2::new(BIRD_START_X, 100.0), &pipe, &sprites));
    }

    #[test]
    fn test_box_touch_but_no_pixel_touch() {
        let sprites = SpriteSet::new();
        // Pipe lip starts 1px inside the bird's box at its corner; the
        // ellipse's transparent padding keeps them apart.
        let pipe = pipe_at(BIRD_START_X + BIRD_WIDTH as f32 - 1.0, 300.0);
        let bird = Vec2::new(BIRD_START_X, 300.0 + PIPE_GAP - BIRD_HEIGHT as f32 + 1.0);
        assert!(!bird_pipe_overlap(bird, &pipe, &sprites));
    }

    #[test]
    fn test_out_of_bounds() {
        let h = BIRD_HEIGHT as f32;
        assert!(out_of_bounds(-0.5, h, FLOOR_Y));
        assert!(out_of_bounds(FLOOR_Y - h, h, FLOOR_Y));
        assert!(!out_of_bounds(0.0, h, FLOOR_Y));
        assert!(!out_of_bounds(FLOOR_Y - h - 0.5, h, FLOOR_Y));
    }

    #[test]
    fn test_point_in_rect_is_strict() {
        let min = Vec2::new(20.0, 240.0);
        let size = Vec2::new(PADDLE_WIDTH, PADDLE_HEIGHT);
        assert!(point_in_rect(Vec2::new(25.0, 300.0), min, size));
        assert!(!point_in_rect(Vec2::new(20.0, 300.0), min, size));
        assert!(!point_in_rect(Vec2::new(30.0, 300.0), min, size));
        assert!(!point_in_rect(Vec2::new(25.0, 360.0), min, size));
    }
}
