//! Button edge detection
//!
//! Buttons are sampled as levels every cycle; the control loop only wants to
//! hear about presses and releases.

use crate::types::{ButtonEvent, ButtonType};

/// Remembers the last level of each configured button
#[derive(Debug, Clone)]
pub struct ButtonEdgeDetector {
    /// One entry per configured button, in configured order
    states: Vec<(ButtonType, bool)>,
}

impl ButtonEdgeDetector {
    /// All buttons start out released
    pub fn new(buttons: impl IntoIterator<Item = ButtonType>) -> Self {
        Self {
            states: buttons.into_iter().map(|b| (b, false)).collect(),
        }
    }

    /// Compare `current` (one level per configured button, same order) with
    /// the stored levels and emit an event for every change.
    pub fn detect(&mut self, current: &[bool]) -> Vec<ButtonEvent> {
        debug_assert_eq!(current.len(), self.states.len());

        let mut events = Vec::new();
        for ((button, previous), &pressed) in self.states.iter_mut().zip(current) {
            if *previous != pressed {
                events.push(ButtonEvent {
                    button: *button,
                    pressed,
                });
            }
            *previous = pressed;
        }
        events
    }

    /// Stored level of the button at `index`
    pub fn is_pressed(&self, index: usize) -> Option<bool> {
        self.states.get(index).map(|&(_, pressed)| pressed)
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detector() -> ButtonEdgeDetector {
        ButtonEdgeDetector::new([
            ButtonType::SetCruise,
            ButtonType::ResumeCruise,
            ButtonType::Cancel,
        ])
    }

    #[test]
    fn test_starts_released() {
        let d = detector();
        assert_eq!(d.len(), 3);
        assert_eq!(d.is_pressed(0), Some(false));
        assert_eq!(d.is_pressed(3), None);
    }

    #[test]
    fn test_steady_input_fires_once() {
        let mut d = detector();
        let input = [true, false, true];

        let first = d.detect(&input);
        assert_eq!(
            first,
            vec![
                ButtonEvent { button: ButtonType::SetCruise, pressed: true },
                ButtonEvent { button: ButtonType::Cancel, pressed: true },
            ]
        );

        for _ in 0..10 {
            assert!(d.detect(&input).is_empty());
        }
    }

    #[test]
    fn test_alternating_input_fires_every_cycle() {
        let mut d = ButtonEdgeDetector::new([ButtonType::AccelCruise]);

        for cycle in 0..20 {
            let pressed = cycle % 2 == 0;
            let events = d.detect(&[pressed]);
            assert_eq!(events, vec![ButtonEvent { button: ButtonType::AccelCruise, pressed }]);
            assert_eq!(d.is_pressed(0), Some(pressed));
        }
    }

    #[test]
    fn test_events_follow_configured_order() {
        let mut d = detector();
        d.detect(&[true, true, true]);

        let events = d.detect(&[false, false, false]);
        let order: Vec<ButtonType> = events.iter().map(|e| e.button).collect();
        assert_eq!(
            order,
            vec![ButtonType::SetCruise, ButtonType::ResumeCruise, ButtonType::Cancel]
        );
        assert!(events.iter().all(|e| !e.pressed));
    }

    #[test]
    fn test_shared_event_type_keeps_separate_state() {
        let mut d = ButtonEdgeDetector::new([ButtonType::GapAdjustCruise, ButtonType::GapAdjustCruise]);

        assert_eq!(d.detect(&[true, false]).len(), 1);
        // Second row pressing must not be masked by the first
        let events = d.detect(&[true, true]);
        assert_eq!(events, vec![ButtonEvent { button: ButtonType::GapAdjustCruise, pressed: true }]);
        assert_eq!(d.is_pressed(1), Some(true));
    }
}
