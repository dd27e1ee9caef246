//! Collision-avoiding canvas layout for gallery cards.
//!
//! Cards are scattered over a canvas of fixed width and growable height. The
//! packer is a best-effort heuristic with a three-step fallback ladder:
//!
//! 1. up to [`MAX_RANDOM_ATTEMPTS`] uniformly random top-left corners,
//! 2. a deterministic grid scan with step [`GRID_STEP`],
//! 3. growing the canvas and placing the card below everything else.
//!
//! Larger cards are placed first. Positions are reported in input order and
//! any two cards end up at least `gap` apart on at least one axis.
//!
//! The random source is a parameter so tests can seed it. The layout is
//! always recomputed from scratch when the card set or any size changes.

use crate::models::{Position, Size};
use rand::Rng;
use serde::Serialize;
use std::cmp::Ordering;

/// Minimum clearance between two cards.
pub const GAP: f64 = 20.0;
pub const MAX_RANDOM_ATTEMPTS: usize = 200;
pub const GRID_STEP: f64 = 50.0;
pub const INITIAL_CANVAS_HEIGHT: f64 = 2000.0;

// ============================================================================
// Canvas Presets
// ============================================================================

/// Canvas width class, chosen from the viewport width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CanvasPreset {
    Narrow,
    Medium,
    Wide,
}

impl CanvasPreset {
    pub fn for_viewport_width(viewport_width: f64) -> Self {
        if viewport_width < 640.0 {
            CanvasPreset::Narrow
        } else if viewport_width < 768.0 {
            CanvasPreset::Medium
        } else {
            CanvasPreset::Wide
        }
    }

    pub fn canvas_width(self) -> f64 {
        match self {
            CanvasPreset::Narrow => 400.0,
            CanvasPreset::Medium => 600.0,
            CanvasPreset::Wide => 1200.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutConfig {
    pub canvas_width: f64,
    /// Starting height; the packer grows it when it runs out of room.
    pub canvas_height: f64,
    pub gap: f64,
    pub max_attempts: usize,
    pub grid_step: f64,
}

impl LayoutConfig {
    pub fn for_preset(preset: CanvasPreset) -> Self {
        Self {
            canvas_width: preset.canvas_width(),
            canvas_height: INITIAL_CANVAS_HEIGHT,
            gap: GAP,
            max_attempts: MAX_RANDOM_ATTEMPTS,
            grid_step: GRID_STEP,
        }
    }

    pub fn for_viewport_width(viewport_width: f64) -> Self {
        Self::for_preset(CanvasPreset::for_viewport_width(viewport_width))
    }
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self::for_preset(CanvasPreset::Wide)
    }
}

// ============================================================================
// Geometry
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(position: Position, size: Size) -> Self {
        Self {
            x: position.x,
            y: position.y,
            width: size.width,
            height: size.height,
        }
    }

    /// True when the two rectangles are closer than `gap` on both axes.
    /// Rectangles exactly `gap` apart do not collide.
    pub fn collides(&self, other: &Rect, gap: f64) -> bool {
        let horizontal =
            !(self.x + self.width + gap <= other.x || self.x >= other.x + other.width + gap);
        let vertical =
            !(self.y + self.height + gap <= other.y || self.y >= other.y + other.height + gap);
        horizontal && vertical
    }
}

/// Result of one packing pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Layout {
    /// One position per input size, in input order.
    pub positions: Vec<Position>,
    pub canvas_width: f64,
    /// Final height, including any growth.
    pub canvas_height: f64,
}

impl Layout {
    pub fn empty(config: &LayoutConfig) -> Self {
        Self {
            positions: Vec::new(),
            canvas_width: config.canvas_width,
            canvas_height: config.canvas_height,
        }
    }
}

fn usable(size: Size) -> Size {
    if size.width > 0.0 && size.height > 0.0 && size.width.is_finite() && size.height.is_finite()
    {
        size
    } else {
        Size::DEFAULT
    }
}

// ============================================================================
// Packing
// ============================================================================

struct Packer<'a, R: Rng + ?Sized> {
    config: &'a LayoutConfig,
    canvas_height: f64,
    placed: Vec<Rect>,
    rng: &'a mut R,
}

impl<'a, R: Rng + ?Sized> Packer<'a, R> {
    fn is_free(&self, candidate: &Rect) -> bool {
        !self
            .placed
            .iter()
            .any(|r| candidate.collides(r, self.config.gap))
    }

    fn try_random(&mut self, size: Size, span_x: f64, span_y: f64) -> Option<Position> {
        let gap = self.config.gap;
        for _ in 0..self.config.max_attempts {
            let x = self.rng.gen::<f64>() * span_x + gap;
            let y = self.rng.gen::<f64>() * span_y + gap;
            let position = Position::new(x, y);
            if self.is_free(&Rect::new(position, size)) {
                return Some(position);
            }
        }
        None
    }

    fn try_grid(&self, size: Size) -> Option<Position> {
        let gap = self.config.gap;
        let step = self.config.grid_step.max(1.0);
        let max_x = self.config.canvas_width - size.width - gap;
        let max_y = self.canvas_height - size.height - gap;

        let mut y = gap;
        while y < max_y {
            let mut x = gap;
            while x < max_x {
                let position = Position::new(x, y);
                if self.is_free(&Rect::new(position, size)) {
                    return Some(position);
                }
                x += step;
            }
            y += step;
        }
        None
    }

    /// Every placed card ends at least `gap` above the current height, so a
    /// card placed at `height + gap` can never collide.
    fn grow(&mut self, size: Size) -> Position {
        let gap = self.config.gap;
        let y = self.canvas_height + gap;
        self.canvas_height = y + size.height + gap;
        Position::new(gap, y)
    }

    fn place(&mut self, size: Size) -> Position {
        let gap = self.config.gap;
        let span_x = self.config.canvas_width - size.width - gap * 2.0;
        let span_y = self.canvas_height - size.height - gap * 2.0;

        let position = if span_x >= 0.0 && span_y >= 0.0 {
            self.try_random(size, span_x, span_y)
                .or_else(|| self.try_grid(size))
                .unwrap_or_else(|| self.grow(size))
        } else {
            // Does not fit the current bounds at all
            self.grow(size)
        };

        self.placed.push(Rect::new(position, size));
        position
    }
}

/// Place one card per size without overlap.
///
/// Cards are placed largest-area first; the returned positions line up with
/// `sizes`. Invalid sizes are treated as [`Size::DEFAULT`].
pub fn calculate_layout<R: Rng + ?Sized>(
    sizes: &[Size],
    config: &LayoutConfig,
    rng: &mut R,
) -> Layout {
    let sizes: Vec<Size> = sizes.iter().copied().map(usable).collect();

    let mut order: Vec<usize> = (0..sizes.len()).collect();
    order.sort_by(|&a, &b| {
        sizes[b]
            .area()
            .partial_cmp(&sizes[a].area())
            .unwrap_or(Ordering::Equal)
    });

    let mut packer = Packer {
        config,
        canvas_height: config.canvas_height,
        placed: Vec::with_capacity(sizes.len()),
        rng,
    };

    let mut positions = vec![Position::default(); sizes.len()];
    for index in order {
        positions[index] = packer.place(sizes[index]);
    }

    let widest = packer
        .placed
        .iter()
        .map(|r| r.x + r.width + config.gap)
        .fold(config.canvas_width, f64::max);

    log::debug!(
        "layout: {} cards on {}x{} canvas",
        positions.len(),
        widest,
        packer.canvas_height
    );

    Layout {
        positions,
        canvas_width: widest,
        canvas_height: packer.canvas_height,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn separated(a: &Rect, b: &Rect, gap: f64) -> bool {
        a.x + a.width + gap <= b.x
            || b.x + b.width + gap <= a.x
            || a.y + a.height + gap <= b.y
            || b.y + b.height + gap <= a.y
    }

    fn assert_no_overlap(layout: &Layout, sizes: &[Size], gap: f64) {
        assert_eq!(layout.positions.len(), sizes.len());
        let rects: Vec<Rect> = layout
            .positions
            .iter()
            .zip(sizes)
            .map(|(p, s)| Rect::new(*p, *s))
            .collect();
        for i in 0..rects.len() {
            for j in (i + 1)..rects.len() {
                assert!(
                    separated(&rects[i], &rects[j], gap),
                    "cards {} and {} overlap: {:?} {:?}",
                    i,
                    j,
                    rects[i],
                    rects[j]
                );
            }
        }
    }

    #[test]
    fn test_collides_touching_is_not_collision() {
        let a = Rect::new(Position::new(0.0, 0.0), Size::new(100.0, 100.0));
        let exactly_gap = Rect::new(Position::new(120.0, 0.0), Size::new(100.0, 100.0));
        let too_close = Rect::new(Position::new(119.0, 0.0), Size::new(100.0, 100.0));
        let diagonal = Rect::new(Position::new(119.0, 120.0), Size::new(100.0, 100.0));
        assert!(!a.collides(&exactly_gap, GAP));
        assert!(a.collides(&too_close, GAP));
        assert!(too_close.collides(&a, GAP));
        assert!(!a.collides(&diagonal, GAP));
    }

    #[test]
    fn test_presets() {
        assert_eq!(CanvasPreset::for_viewport_width(375.0), CanvasPreset::Narrow);
        assert_eq!(CanvasPreset::for_viewport_width(700.0), CanvasPreset::Medium);
        assert_eq!(CanvasPreset::for_viewport_width(768.0), CanvasPreset::Wide);
        assert_eq!(LayoutConfig::for_viewport_width(1440.0).canvas_width, 1200.0);
    }

    #[test]
    fn test_two_cards_on_wide_canvas() {
        let sizes = [Size::new(300.0, 400.0), Size::new(150.0, 200.0)];
        let mut rng = StdRng::seed_from_u64(4);
        let layout = calculate_layout(&sizes, &LayoutConfig::default(), &mut rng);
        assert_no_overlap(&layout, &sizes, GAP);
        assert_eq!(layout.canvas_height, INITIAL_CANVAS_HEIGHT);
    }

    #[test]
    fn test_grid_fallback_is_deterministic() {
        let config = LayoutConfig {
            max_attempts: 0,
            ..LayoutConfig::default()
        };
        // Smaller card first in input, but the larger one is placed first
        let sizes = [Size::new(150.0, 200.0), Size::new(300.0, 400.0)];
        let mut rng = StdRng::seed_from_u64(0);
        let layout = calculate_layout(&sizes, &config, &mut rng);
        assert_eq!(layout.positions[1], Position::new(20.0, 20.0));
        assert_eq!(layout.positions[0], Position::new(370.0, 20.0));
    }

    #[test]
    fn test_grows_canvas_when_full() {
        let config = LayoutConfig {
            canvas_width: 400.0,
            canvas_height: 500.0,
            max_attempts: 0,
            ..LayoutConfig::default()
        };
        let sizes = [Size::new(300.0, 400.0); 3];
        let mut rng = StdRng::seed_from_u64(0);
        let layout = calculate_layout(&sizes, &config, &mut rng);

        assert_eq!(
            layout.positions,
            vec![
                Position::new(20.0, 20.0),
                Position::new(20.0, 520.0),
                Position::new(20.0, 960.0),
            ]
        );
        assert_eq!(layout.canvas_height, 1380.0);
        assert_no_overlap(&layout, &sizes, GAP);
    }

    #[test]
    fn test_oversized_card_grows_instead_of_overlapping() {
        let config = LayoutConfig {
            canvas_width: 200.0,
            canvas_height: 100.0,
            ..LayoutConfig::default()
        };
        let sizes = [Size::new(300.0, 400.0), Size::new(50.0, 50.0)];
        let mut rng = StdRng::seed_from_u64(9);
        let layout = calculate_layout(&sizes, &config, &mut rng);
        assert_no_overlap(&layout, &sizes, GAP);
        assert!(layout.canvas_width >= 340.0);
    }

    #[test]
    fn test_many_cards_small_canvas_never_overlap() {
        let mut size_rng = StdRng::seed_from_u64(42);
        for seed in 0..5u64 {
            let sizes: Vec<Size> = (0..50)
                .map(|_| {
                    Size::new(
                        size_rng.gen_range(40.0..300.0),
                        size_rng.gen_range(40.0..400.0),
                    )
                })
                .collect();
            let config = LayoutConfig {
                canvas_height: 600.0,
                ..LayoutConfig::for_preset(CanvasPreset::Narrow)
            };
            let mut rng = StdRng::seed_from_u64(seed);
            let layout = calculate_layout(&sizes, &config, &mut rng);
            assert_no_overlap(&layout, &sizes, GAP);
            assert!(layout.canvas_height > 600.0);
        }
    }

    #[test]
    fn test_same_seed_same_layout() {
        let sizes = [
            Size::new(300.0, 400.0),
            Size::new(266.0, 400.0),
            Size::new(300.0, 168.0),
        ];
        let config = LayoutConfig::default();
        let a = calculate_layout(&sizes, &config, &mut StdRng::seed_from_u64(7));
        let b = calculate_layout(&sizes, &config, &mut StdRng::seed_from_u64(7));
        assert_eq!(a, b);
    }

    #[test]
    fn test_invalid_sizes_use_default() {
        let sizes = [Size::new(0.0, 0.0), Size::new(f64::NAN, 10.0)];
        let mut rng = StdRng::seed_from_u64(1);
        let layout = calculate_layout(&sizes, &LayoutConfig::default(), &mut rng);
        assert_no_overlap(&layout, &[Size::DEFAULT, Size::DEFAULT], GAP);
    }

    #[test]
    fn test_empty_input() {
        let mut rng = StdRng::seed_from_u64(1);
        let layout = calculate_layout(&[], &LayoutConfig::default(), &mut rng);
        assert!(layout.positions.is_empty());
        assert_eq!(layout, Layout::empty(&LayoutConfig::default()));
    }
}
