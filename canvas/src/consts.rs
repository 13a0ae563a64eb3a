//! Shared numeric constants for the canvas crate.

// ── Canvas size ─────────────────────────────────────────────────

/// Upper bound for the logical canvas width, in canvas pixels.
pub const MAX_CANVAS_WIDTH: f64 = 1200.0;

/// Upper bound for the logical canvas height, in canvas pixels.
pub const MAX_CANVAS_HEIGHT: f64 = 800.0;

// ── Strokes ─────────────────────────────────────────────────────

/// Line width for committed strokes and the live draw preview.
pub const STROKE_WIDTH: f64 = 2.0;

/// Color used for new strokes until the user picks another.
pub const DEFAULT_STROKE_COLOR: &str = "#000000";

// ── Eraser preview ──────────────────────────────────────────────

/// Color of the live eraser trail on the overlay layer.
pub const ERASER_PREVIEW_COLOR: &str = "#D0D0D0";

/// Line width of the live eraser trail.
pub const ERASER_PREVIEW_WIDTH: f64 = 8.0;
