//! Drawing, erasing and viewport engine for the collaborative drawing board.
//!
//! This crate runs in the browser (compiled to WebAssembly) and natively under
//! the sync client. It owns the client-side lifecycle of a board's canvas:
//! turning raw pointer samples into strokes, hit-testing eraser gestures,
//! keeping the stroke store ordered and duplicate-free, panning the fixed-size
//! canvas inside its container, and drawing the two canvas layers. Persisting
//! committed strokes is the host's job, driven by the returned
//! [`engine::Action`]s.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`engine`] | Top-level engine and testable [`engine::EngineCore`] |
//! | [`doc`] | Strokes, board codes and the in-memory [`doc::StrokeStore`] |
//! | [`camera`] | Pan offset, canvas sizing and coordinate conversions |
//! | [`input`] | Tools, pointer samples and the gesture state machine |
//! | [`hit`] | Bounding boxes and polyline crossing tests for erasing |
//! | [`render`] | Base/overlay layer drawing through the [`render::Surface`] trait |
//! | [`consts`] | Shared constants (canvas bounds, stroke widths, colors) |

pub mod camera;
pub mod consts;
pub mod doc;
pub mod engine;
pub mod hit;
pub mod input;
pub mod render;
