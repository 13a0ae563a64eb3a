//! Input model: tools, session state, pointer samples, and the gesture state machine.
//!
//! This module defines the types consumed by the input engine. `Tool` and
//! `SessionState` capture the user's intent at the time of a pointer event.
//! `PointerSample` is the single input type for mouse, pen and touch; the host
//! maps every DOM event kind onto it. `InputState` is the active gesture being
//! tracked between pointer-down and release.

#[cfg(test)]
#[path = "input_test.rs"]
mod input_test;

use crate::camera::Point;
use crate::consts::DEFAULT_STROKE_COLOR;

/// Which tool is currently active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tool {
    /// Freehand drawing (default).
    #[default]
    Draw,
    /// Remove every stroke the gesture crosses.
    Erase,
    /// Pan the canvas inside its container.
    Move,
}

impl Tool {
    /// Whether this tool collects a path (draw or erase).
    #[must_use]
    pub fn traces_path(self) -> bool {
        matches!(self, Self::Draw | Self::Erase)
    }
}

/// Process-local UI state. Never persisted or broadcast.
#[derive(Debug, Clone)]
pub struct SessionState {
    /// Currently active tool.
    pub tool: Tool,
    /// CSS color applied to new strokes. Ignored unless `tool` is [`Tool::Draw`].
    pub color: String,
}

impl Default for SessionState {
    fn default() -> Self {
        Self { tool: Tool::default(), color: DEFAULT_STROKE_COLOR.to_owned() }
    }
}

/// Pointer identifier. Mouse and pen report a single id; touches report one per finger.
pub type PointerId = i32;

/// One abstract pointer sample.
///
/// `position` is relative to the top-left of the element hosting the canvas
/// stack (the container), before the pan offset is removed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerSample {
    pub pointer_id: PointerId,
    pub position: Point,
}

impl PointerSample {
    #[must_use]
    pub fn new(pointer_id: PointerId, x: f64, y: f64) -> Self {
        Self { pointer_id, position: Point::new(x, y) }
    }
}

/// Internal state for the input state machine.
///
/// Each active variant records the pointer that owns the gesture. Samples from
/// any other pointer are ignored until the gesture ends, which is how extra
/// touch points are dropped.
#[derive(Debug, Clone, Default)]
pub enum InputState {
    /// No gesture in progress; waiting for the next pointer-down.
    #[default]
    Idle,
    /// Collecting a path for a draw or erase gesture.
    Drawing {
        /// Pointer that started the gesture.
        pointer_id: PointerId,
        /// Tool captured at pointer-down; a mid-gesture tool switch does not change it.
        tool: Tool,
        /// Canvas-space points in sample order.
        path: Vec<Point>,
    },
    /// Dragging the canvas with the move tool.
    Panning {
        /// Pointer that started the gesture.
        pointer_id: PointerId,
        /// Viewport-space position of the previous sample, used to compute the pan delta.
        last_viewport: Point,
    },
}

impl InputState {
    /// Pointer owning the active gesture, if any.
    #[must_use]
    pub fn active_pointer(&self) -> Option<PointerId> {
        match self {
            Self::Idle => None,
            Self::Drawing { pointer_id, .. } | Self::Panning { pointer_id, .. } => Some(*pointer_id),
        }
    }
}
