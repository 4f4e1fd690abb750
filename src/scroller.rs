//! Windowed scroller: the position model behind every carousel on the site.
//!
//! A carousel is a horizontal track of equally sized cards seen through a
//! window of the container's width. The arithmetic is pure and lives here;
//! the generated HTML carries the computed layout as `data-*` attributes and
//! `static/carousel.js` repeats the same transitions in the browser.
//!
//! ```text
//!   per_view     = clamp(container / (card + gap), 1, visible_count)
//!   total_slides = max(items - per_view + 1, 1)      window positions
//!   offset(i)    = i * (card + gap)                  px, track translateX
//! ```
//!
//! State machine:
//!
//! ```text
//!   Idle --pointer_down--> Dragging --pointer_up--> Idle (snapped, clamped)
//!   Idle --tick-----------> AutoScrolling -> Idle   (advance, wrap to 0)
//! ```
//!
//! A tick while dragging or while the pointer hovers the container does
//! nothing.

use crate::config::CarouselConfig;
use serde::{Deserialize, Serialize};

/// Card and window geometry in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Geometry {
    pub card_width: u32,
    pub gap: u32,
    pub visible_count: u32,
    pub container_width: u32,
}

impl Geometry {
    pub fn from_config(config: &CarouselConfig) -> Self {
        Self {
            card_width: config.card_width,
            gap: config.gap,
            visible_count: config.visible_count,
            container_width: config.container_width,
        }
    }

    /// Distance between the left edges of adjacent cards.
    pub fn step(&self) -> u32 {
        self.card_width.saturating_add(self.gap).max(1)
    }

    /// Cards fully visible at once.
    pub fn per_view(&self) -> u32 {
        let fit = self.container_width / self.step();
        fit.clamp(1, self.visible_count.max(1))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ScrollState {
    Idle,
    Dragging { start_x: f64 },
    AutoScrolling,
}

/// Render-time summary of a carousel, emitted as data attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Layout {
    pub per_view: u32,
    pub total_slides: u32,
    pub step: u32,
    pub track_width: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scroller {
    geometry: Geometry,
    item_count: u32,
    index: u32,
    state: ScrollState,
    drag_offset: f64,
    hovered: bool,
}

impl Scroller {
    pub fn new(geometry: Geometry, item_count: usize) -> Self {
        Self {
            geometry,
            item_count: u32::try_from(item_count).unwrap_or(u32::MAX),
            index: 0,
            state: ScrollState::Idle,
            drag_offset: 0.0,
            hovered: false,
        }
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn state(&self) -> ScrollState {
        self.state
    }

    pub fn drag_offset(&self) -> f64 {
        self.drag_offset
    }

    /// Number of distinct window positions; at least 1.
    pub fn total_slides(&self) -> u32 {
        let per_view = self.geometry.per_view();
        if self.item_count <= per_view {
            1
        } else {
            self.item_count - per_view + 1
        }
    }

    pub fn max_index(&self) -> u32 {
        self.total_slides() - 1
    }

    pub fn clamp(&self, index: i64) -> u32 {
        index.clamp(0, i64::from(self.max_index())) as u32
    }

    /// Whether there is anything to scroll.
    pub fn is_scrollable(&self) -> bool {
        self.total_slides() > 1
    }

    /// Track translation for the current index and drag, in px (negative
    /// moves the track left).
    pub fn offset_px(&self) -> f64 {
        -(f64::from(self.index) * f64::from(self.geometry.step())) + self.drag_offset
    }

    pub fn layout(&self) -> Layout {
        let step = self.geometry.step();
        Layout {
            per_view: self.geometry.per_view(),
            total_slides: self.total_slides(),
            step,
            track_width: self.item_count.saturating_mul(step).saturating_sub(self.geometry.gap),
        }
    }

    pub fn go_to(&mut self, index: i64) {
        self.index = self.clamp(index);
    }

    pub fn next(&mut self) {
        self.go_to(i64::from(self.index) + 1);
    }

    pub fn prev(&mut self) {
        self.go_to(i64::from(self.index) - 1);
    }

    pub fn set_hovered(&mut self, hovered: bool) {
        self.hovered = hovered;
    }

    pub fn pointer_down(&mut self, x: f64) {
        self.state = ScrollState::Dragging { start_x: x };
        self.drag_offset = 0.0;
    }

    pub fn pointer_move(&mut self, x: f64) {
        if let ScrollState::Dragging { start_x } = self.state {
            self.drag_offset = x - start_x;
        }
    }

    /// End a drag: snap to the nearest card and clamp.
    pub fn pointer_up(&mut self) {
        if !matches!(self.state, ScrollState::Dragging { .. }) {
            return;
        }
        let cards_moved = (-self.drag_offset / f64::from(self.geometry.step())).round() as i64;
        self.go_to(i64::from(self.index) + cards_moved);
        self.drag_offset = 0.0;
        self.state = ScrollState::Idle;
    }

    /// Auto-scroll timer tick. Advances one position, wrapping to the
    /// start after the last. Returns whether the index changed.
    pub fn tick(&mut self) -> bool {
        if self.hovered || !matches!(self.state, ScrollState::Idle) || !self.is_scrollable() {
            return false;
        }
        self.state = ScrollState::AutoScrolling;
        let before = self.index;
        self.index = if self.index >= self.max_index() {
            0
        } else {
            self.index + 1
        };
        self.state = ScrollState::Idle;
        self.index != before
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn geometry() -> Geometry {
        Geometry {
            card_width: 280,
            gap: 24,
            visible_count: 4,
            container_width: 1200,
        }
    }

    #[test]
    fn per_view_fits_container() {
        // 1200 / 304 = 3
        assert_eq!(geometry().per_view(), 3);
        let wide = Geometry {
            container_width: 5000,
            ..geometry()
        };
        assert_eq!(wide.per_view(), 4);
        let narrow = Geometry {
            container_width: 100,
            ..geometry()
        };
        assert_eq!(narrow.per_view(), 1);
    }

    #[test]
    fn step_saturates_on_huge_geometry() {
        let huge = Geometry {
            card_width: u32::MAX,
            gap: 24,
            ..geometry()
        };
        assert_eq!(huge.step(), u32::MAX);
        assert_eq!(huge.per_view(), 1);
    }

    #[test]
    fn total_slides_counts_window_positions() {
        assert_eq!(Scroller::new(geometry(), 10).total_slides(), 8);
        assert_eq!(Scroller::new(geometry(), 3).total_slides(), 1);
        assert_eq!(Scroller::new(geometry(), 0).total_slides(), 1);
    }

    #[test]
    fn index_is_clamped() {
        let mut s = Scroller::new(geometry(), 5);
        s.go_to(99);
        assert_eq!(s.index(), 2);
        s.go_to(-4);
        assert_eq!(s.index(), 0);
        s.prev();
        assert_eq!(s.index(), 0);
        s.next();
        s.next();
        s.next();
        assert_eq!(s.index(), 2);
    }

    #[test]
    fn drag_snaps_to_nearest_card() {
        let mut s = Scroller::new(geometry(), 10);
        s.pointer_down(500.0);
        assert!(matches!(s.state(), ScrollState::Dragging { .. }));
        s.pointer_move(500.0 - 532.0);
        assert_eq!(s.offset_px(), -532.0);
        s.pointer_up();
        assert_eq!(s.index(), 2);
        assert_eq!(s.state(), ScrollState::Idle);
        assert_eq!(s.offset_px(), -608.0);
    }

    #[test]
    fn drag_past_the_end_clamps() {
        let mut s = Scroller::new(geometry(), 4);
        s.pointer_down(0.0);
        s.pointer_move(-5000.0);
        s.pointer_up();
        assert_eq!(s.index(), s.max_index());
    }

    #[test]
    fn move_without_drag_is_ignored() {
        let mut s = Scroller::new(geometry(), 10);
        s.pointer_move(200.0);
        s.pointer_up();
        assert_eq!(s.drag_offset(), 0.0);
        assert_eq!(s.index(), 0);
    }

    #[test]
    fn tick_advances_and_wraps() {
        let mut s = Scroller::new(geometry(), 4);
        assert!(s.tick());
        assert_eq!(s.index(), 1);
        assert!(s.tick());
        assert_eq!(s.index(), 0);
    }

    #[test]
    fn tick_paused_while_hovered_or_dragging() {
        let mut s = Scroller::new(geometry(), 10);
        s.set_hovered(true);
        assert!(!s.tick());
        s.set_hovered(false);
        s.pointer_down(0.0);
        assert!(!s.tick());
        assert_eq!(s.index(), 0);
        s.pointer_up();
        assert!(s.tick());
    }

    #[test]
    fn tick_noop_when_everything_fits() {
        let mut s = Scroller::new(geometry(), 2);
        assert!(!s.is_scrollable());
        assert!(!s.tick());
    }

    #[test]
    fn layout_summary() {
        let layout = Scroller::new(geometry(), 5).layout();
        assert_eq!(
            layout,
            Layout {
                per_view: 3,
                total_slides: 3,
                step: 304,
                track_width: 5 * 304 - 24,
            }
        );
    }

    #[test]
    fn zero_geometry_does_not_divide_by_zero() {
        let g = Geometry {
            card_width: 0,
            gap: 0,
            visible_count: 0,
            container_width: 0,
        };
        let s = Scroller::new(g, 3);
        assert_eq!(g.per_view(), 1);
        assert_eq!(s.total_slides(), 3);
    }
}
