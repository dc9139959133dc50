//! Press/drag/release disambiguation for the overlay
//!
//! All positions are in screen pixels. A press followed by a release is a
//! click (flip) unless the pointer strayed more than `DRAG_THRESHOLD` pixels
//! (manhattan) from where it went down, in which case it is a drag that
//! moves the window.

pub const DRAG_THRESHOLD: i32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureOutcome {
    /// Released without dragging
    Flip,
    /// Released after moving the window
    Dragged { x: i32, y: i32 },
    /// Release without a matching press
    Ignored,
}

#[derive(Debug, Clone, Copy)]
struct Press {
    start: (i32, i32),
    /// Pointer offset from the window's top-left corner
    grab: (i32, i32),
    dragging: bool,
    last_origin: (i32, i32),
}

#[derive(Debug, Default)]
pub struct PointerGesture {
    press: Option<Press>,
}

impl PointerGesture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_pressed(&self) -> bool {
        self.press.is_some()
    }

    /// Left button went down at `pointer` while the window sits at `origin`
    pub fn press(&mut self, pointer: (i32, i32), origin: (i32, i32)) {
        self.press = Some(Press {
            start: pointer,
            grab: (pointer.0 - origin.0, pointer.1 - origin.1),
            dragging: false,
            last_origin: origin,
        });
    }

    /// Pointer moved with the button held; returns the new window origin
    /// once the gesture has become a drag
    pub fn moved(&mut self, pointer: (i32, i32)) -> Option<(i32, i32)> {
        let press = self.press.as_mut()?;

        let distance = (pointer.0 - press.start.0).abs() + (pointer.1 - press.start.1).abs();
        if !press.dragging && distance > DRAG_THRESHOLD {
            press.dragging = true;
        }
        if !press.dragging {
            return None;
        }

        let origin = (pointer.0 - press.grab.0, pointer.1 - press.grab.1);
        press.last_origin = origin;
        Some(origin)
    }

    pub fn release(&mut self) -> GestureOutcome {
        match self.press.take() {
            Some(press) if press.dragging => GestureOutcome::Dragged {
                x: press.last_origin.0,
                y: press.last_origin.1,
            },
            Some(_) => GestureOutcome::Flip,
            None => GestureOutcome::Ignored,
        }
    }
}
