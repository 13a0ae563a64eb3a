//! Rendering: two-layer compositing of committed strokes and live feedback.
//!
//! The base layer holds every committed stroke and is fully redrawn whenever
//! the store or the canvas size changes. The overlay layer holds only the
//! gesture in progress: each pointer-move adds one segment, and commit or
//! cancel wipes it.
//!
//! Drawing goes through the [`Surface`] trait. The browser implementation is
//! [`web_sys::CanvasRenderingContext2d`]; tests use a recording surface. This
//! module reads store and viewport state and never mutates it.

#[cfg(test)]
#[path = "render_test.rs"]
mod render_test;

use wasm_bindgen::JsValue;
use web_sys::CanvasRenderingContext2d;

use crate::camera::{Point, Viewport};
use crate::consts::STROKE_WIDTH;
use crate::doc::StrokeStore;
use crate::engine::Action;

/// A 2D drawing target.
pub trait Surface {
    type Error;

    /// Set the backing size in canvas pixels. Implementations may discard content.
    ///
    /// # Errors
    ///
    /// Returns the surface's error when the resize fails.
    fn resize(&mut self, width: f64, height: f64) -> Result<(), Self::Error>;

    /// Clear the rectangle `(0, 0, width, height)`.
    ///
    /// # Errors
    ///
    /// Returns the surface's error when the clear fails.
    fn clear(&mut self, width: f64, height: f64) -> Result<(), Self::Error>;

    /// Stroke a connected polyline through `points`.
    ///
    /// # Errors
    ///
    /// Returns the surface's error when drawing fails.
    fn polyline(&mut self, points: &[Point], color: &str, width: f64) -> Result<(), Self::Error>;
}

/// Clear `surface` and draw every stroke in creation order.
///
/// Strokes with an empty path are skipped.
///
/// # Errors
///
/// Propagates the first surface error.
pub fn draw_strokes<S: Surface>(surface: &mut S, doc: &StrokeStore, viewport: &Viewport) -> Result<(), S::Error> {
    surface.clear(viewport.canvas_width, viewport.canvas_height)?;
    for stroke in doc.iter() {
        if stroke.path.is_empty() {
            continue;
        }
        surface.polyline(&stroke.path, &stroke.color, STROKE_WIDTH)?;
    }
    Ok(())
}

/// The base and overlay layers of the canvas stack.
pub struct Layers<S> {
    pub base: S,
    pub overlay: S,
}

impl<S: Surface> Layers<S> {
    #[must_use]
    pub fn new(base: S, overlay: S) -> Self {
        Self { base, overlay }
    }

    /// Redraw the base layer from the store.
    ///
    /// # Errors
    ///
    /// Propagates the first surface error.
    pub fn redraw_base(&mut self, doc: &StrokeStore, viewport: &Viewport) -> Result<(), S::Error> {
        draw_strokes(&mut self.base, doc, viewport)
    }

    /// Resize both layers to the viewport's canvas size, redraw the base and wipe the overlay.
    ///
    /// # Errors
    ///
    /// Propagates the first surface error.
    pub fn resize(&mut self, doc: &StrokeStore, viewport: &Viewport) -> Result<(), S::Error> {
        self.base.resize(viewport.canvas_width, viewport.canvas_height)?;
        self.overlay.resize(viewport.canvas_width, viewport.canvas_height)?;
        self.overlay.clear(viewport.canvas_width, viewport.canvas_height)?;
        self.redraw_base(doc, viewport)
    }

    /// Apply the rendering side of engine actions, in order.
    ///
    /// Sync-facing actions (`StrokeCommitted`, `StrokesErased`) and pan
    /// offsets are ignored here; the host handles them.
    ///
    /// # Errors
    ///
    /// Propagates the first surface error.
    pub fn apply(&mut self, actions: &[Action], doc: &StrokeStore, viewport: &Viewport) -> Result<(), S::Error> {
        for action in actions {
            match action {
                Action::OverlaySegment { from, to, color, width } => {
                    self.overlay.polyline(&[*from, *to], color, *width)?;
                }
                Action::ClearOverlay => {
                    self.overlay.clear(viewport.canvas_width, viewport.canvas_height)?;
                }
                Action::RedrawBase => self.redraw_base(doc, viewport)?,
                Action::CanvasResized { .. } => self.resize(doc, viewport)?,
                Action::ViewportChanged { .. } | Action::StrokeCommitted(_) | Action::StrokesErased(_) => {}
            }
        }
        Ok(())
    }
}

// =============================================================
// Browser surface
// =============================================================

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn backing_px(v: f64) -> u32 {
    v.max(0.0).round() as u32
}

impl Surface for CanvasRenderingContext2d {
    type Error = JsValue;

    fn resize(&mut self, width: f64, height: f64) -> Result<(), JsValue> {
        if let Some(canvas) = self.canvas() {
            canvas.set_width(backing_px(width));
            canvas.set_height(backing_px(height));
        }
        Ok(())
    }

    fn clear(&mut self, width: f64, height: f64) -> Result<(), JsValue> {
        self.clear_rect(0.0, 0.0, width, height);
        Ok(())
    }

    fn polyline(&mut self, points: &[Point], color: &str, width: f64) -> Result<(), JsValue> {
        let Some((first, rest)) = points.split_first() else {
            return Ok(());
        };
        self.begin_path();
        self.move_to(first.x, first.y);
        for p in rest {
            self.line_to(p.x, p.y);
        }
        self.set_stroke_style_str(color);
        self.set_line_width(width);
        self.set_line_cap("round");
        self.set_line_join("round");
        self.stroke();
        Ok(())
    }
}
