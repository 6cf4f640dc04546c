//! Button press detection from wrapping 4-bit counters.
//!
//! The tagger never reports button state directly. Each button has a counter
//! that increments on every press and wraps at 16. Any change between two
//! samples is one press, however far the counter moved: presses lost between
//! notifications collapse into a single edge.

use recoil_frame::TelemetryFrame;
use serde::Serialize;

/// Buttons tracked through press counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Button {
    Fire,
    Reload,
    /// Back / walkie-talkie button; cycles the fire mode.
    Back,
    /// Power button; toggles recoil.
    Power,
}

/// A detected press.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ButtonEdge {
    pub button: Button,
    pub previous: u8,
    pub current: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ButtonCounters {
    fire: u8,
    reload: u8,
    back: u8,
    power: u8,
}

impl ButtonCounters {
    fn from_frame(frame: &TelemetryFrame) -> Self {
        Self {
            fire: frame.fire_count & 0x0F,
            reload: frame.reload_count & 0x0F,
            back: frame.back_count & 0x0F,
            power: frame.power_count & 0x0F,
        }
    }

    fn pairs(&self) -> [(Button, u8); 4] {
        [
            (Button::Fire, self.fire),
            (Button::Reload, self.reload),
            (Button::Back, self.back),
            (Button::Power, self.power),
        ]
    }
}

/// Converts consecutive frames into press edges.
#[derive(Debug, Default)]
pub struct EdgeTracker {
    last: Option<ButtonCounters>,
}

impl EdgeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// True once a baseline frame has been seen.
    pub fn is_ready(&self) -> bool {
        self.last.is_some()
    }

    /// Forget the baseline; the next frame establishes a new one.
    pub fn reset(&mut self) {
        self.last = None;
    }

    /// Compare a frame against the stored counters.
    ///
    /// The first frame after construction or [`reset`](Self::reset) only
    /// records the baseline and yields no edges. Edges come out in
    /// fire, reload, back, power order.
    pub fn observe(&mut self, frame: &TelemetryFrame) -> Vec<ButtonEdge> {
        let current = ButtonCounters::from_frame(frame);
        let Some(previous) = self.last.replace(current) else {
            return Vec::new();
        };

        previous
            .pairs()
            .into_iter()
            .zip(current.pairs())
            .filter(|((_, old), (_, new))| old != new)
            .map(|((button, previous), (_, current))| ButtonEdge {
                button,
                previous,
                current,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use recoil_frame::{decode_telemetry, FRAME_LEN};

    use super::*;

    fn frame(byte3: u8, byte4: u8, byte5: u8) -> TelemetryFrame {
        let mut raw = [0u8; FRAME_LEN];
        raw[1] = 5;
        raw[3] = byte3;
        raw[4] = byte4;
        raw[5] = byte5;
        decode_telemetry(&raw).unwrap()
    }

    fn buttons(edges: &[ButtonEdge]) -> Vec<Button> {
        edges.iter().map(|e| e.button).collect()
    }

    #[test]
    fn first_frame_is_baseline_only() {
        let mut tracker = EdgeTracker::new();
        assert!(!tracker.is_ready());
        assert!(tracker.observe(&frame(0x37, 0x04, 0x09)).is_empty());
        assert!(tracker.is_ready());
    }

    #[test]
    fn unchanged_counters_yield_nothing() {
        let mut tracker = EdgeTracker::new();
        tracker.observe(&frame(0x10, 0, 0));
        assert!(tracker.observe(&frame(0x10, 0, 0)).is_empty());
    }

    #[test]
    fn fire_edge_without_reload_edge() {
        let mut tracker = EdgeTracker::new();
        tracker.observe(&frame(0x10, 0, 0));

        let edges = tracker.observe(&frame(0x13, 0, 0));
        assert_eq!(
            edges,
            vec![ButtonEdge {
                button: Button::Fire,
                previous: 0,
                current: 3
            }]
        );
    }

    #[test]
    fn reload_wraparound_is_one_edge() {
        let mut tracker = EdgeTracker::new();
        tracker.observe(&frame(0xF0, 0, 0));

        let edges = tracker.observe(&frame(0x00, 0, 0));
        assert_eq!(buttons(&edges), vec![Button::Reload]);
        assert_eq!((edges[0].previous, edges[0].current), (15, 0));
    }

    #[test]
    fn multi_step_jump_is_one_edge() {
        let mut tracker = EdgeTracker::new();
        tracker.observe(&frame(0x00, 0x01, 0));
        assert_eq!(buttons(&tracker.observe(&frame(0x00, 0x06, 0))), vec![Button::Back]);
        assert!(tracker.observe(&frame(0x00, 0x06, 0)).is_empty());
    }

    #[test]
    fn all_buttons_in_fixed_order() {
        let mut tracker = EdgeTracker::new();
        tracker.observe(&frame(0x00, 0, 0));
        let edges = tracker.observe(&frame(0x11, 0x01, 0x01));
        assert_eq!(
            buttons(&edges),
            vec![Button::Fire, Button::Reload, Button::Back, Button::Power]
        );
    }

    #[test]
    fn high_nibbles_of_back_and_power_are_ignored() {
        let mut tracker = EdgeTracker::new();
        tracker.observe(&frame(0x00, 0x02, 0x03));
        assert!(tracker.observe(&frame(0x00, 0xF2, 0xA3)).is_empty());
    }

    #[test]
    fn reset_requires_new_baseline() {
        let mut tracker = EdgeTracker::new();
        tracker.observe(&frame(0x00, 0, 0));
        tracker.reset();
        assert!(tracker.observe(&frame(0x55, 0x05, 0x05)).is_empty());
    }
}
