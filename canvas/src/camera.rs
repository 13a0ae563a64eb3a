#[cfg(test)]
#[path = "camera_test.rs"]
mod camera_test;

use serde::{Deserialize, Serialize};

use crate::consts::{MAX_CANVAS_HEIGHT, MAX_CANVAS_WIDTH};

/// A point in either viewport or canvas space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Page layout the canvas is hosted in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Layout {
    /// Canvas shrinks to fit the container.
    #[default]
    Desktop,
    /// Canvas keeps its full logical size and is panned inside the container.
    Mobile,
}

/// Pan state for the fixed-size drawing canvas.
///
/// `offset_x` / `offset_y` are the translation applied to the canvas stack,
/// in CSS pixels. They are never positive: the canvas can only slide left/up
/// far enough to expose its right/bottom edge.
///
/// Stroke coordinates live in canvas space and are never rescaled by a resize.
#[derive(Debug, Clone, Copy)]
pub struct Viewport {
    pub offset_x: f64,
    pub offset_y: f64,
    /// Logical canvas size in canvas pixels.
    pub canvas_width: f64,
    pub canvas_height: f64,
    /// Size of the element hosting the canvas stack, in CSS pixels.
    pub container_width: f64,
    pub container_height: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            offset_x: 0.0,
            offset_y: 0.0,
            canvas_width: MAX_CANVAS_WIDTH,
            canvas_height: MAX_CANVAS_HEIGHT,
            container_width: MAX_CANVAS_WIDTH,
            container_height: MAX_CANVAS_HEIGHT,
        }
    }
}

impl Viewport {
    /// Recompute the logical canvas size for a new container size and re-clamp the offset.
    ///
    /// Returns `true` when the canvas size changed, i.e. the base layer needs a redraw.
    pub fn resize(&mut self, container_width: f64, container_height: f64, layout: Layout) -> bool {
        self.container_width = container_width.max(0.0);
        self.container_height = container_height.max(0.0);

        let (width, height) = match layout {
            Layout::Desktop => (
                MAX_CANVAS_WIDTH.min(self.container_width),
                MAX_CANVAS_HEIGHT.min(self.container_height),
            ),
            Layout::Mobile => (MAX_CANVAS_WIDTH, MAX_CANVAS_HEIGHT),
        };

        let changed = (width - self.canvas_width).abs() > f64::EPSILON
            || (height - self.canvas_height).abs() > f64::EPSILON;
        self.canvas_width = width;
        self.canvas_height = height;
        self.clamp();
        changed
    }

    /// Shift the offset by a viewport-space delta, keeping the canvas attached to the container.
    pub fn pan_by(&mut self, dx: f64, dy: f64) {
        self.offset_x += dx;
        self.offset_y += dy;
        self.clamp();
    }

    /// Convert a container-relative point to canvas coordinates.
    #[must_use]
    pub fn to_canvas(&self, viewport_pt: Point) -> Point {
        Point {
            x: viewport_pt.x - self.offset_x,
            y: viewport_pt.y - self.offset_y,
        }
    }

    /// Convert a canvas point to container-relative coordinates.
    #[must_use]
    pub fn to_viewport(&self, canvas_pt: Point) -> Point {
        Point {
            x: canvas_pt.x + self.offset_x,
            y: canvas_pt.y + self.offset_y,
        }
    }

    fn clamp(&mut self) {
        self.offset_x = clamp_axis(self.offset_x, self.canvas_width, self.container_width);
        self.offset_y = clamp_axis(self.offset_y, self.canvas_height, self.container_height);
    }
}

/// Clamp one axis of the pan offset.
///
/// When the content fits, the offset is pinned to 0. Otherwise it may range
/// over `[container - content, 0]`.
#[must_use]
pub fn clamp_axis(offset: f64, content: f64, container: f64) -> f64 {
    if content <= container {
        return 0.0;
    }
    offset.clamp(container - content, 0.0)
}
