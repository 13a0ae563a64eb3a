use wasm_bindgen::{JsCast, JsValue};
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement};

use crate::camera::{Layout, Point, Viewport};
use crate::consts::{ERASER_PREVIEW_COLOR, ERASER_PREVIEW_WIDTH, STROKE_WIDTH};
use crate::doc::{Confirmation, ProvisionalIds, Stroke, StrokeId, StrokeStore};
use crate::hit;
use crate::input::{InputState, PointerId, PointerSample, SessionState, Tool};
use crate::render::Layers;

#[cfg(test)]
#[path = "engine_test.rs"]
mod engine_test;

/// Actions returned from input handlers for the host to process.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Draw one live segment on the overlay layer.
    OverlaySegment { from: Point, to: Point, color: String, width: f64 },
    /// Wipe the overlay layer.
    ClearOverlay,
    /// Redraw every committed stroke on the base layer.
    RedrawBase,
    /// The logical canvas size changed; both layers need resizing.
    CanvasResized { width: f64, height: f64 },
    /// The pan offset changed; the host updates the canvas stack transform.
    ViewportChanged { offset_x: f64, offset_y: f64 },
    /// A draw gesture was committed to the store under a provisional id.
    StrokeCommitted(Stroke),
    /// An erase gesture removed these strokes from the store.
    StrokesErased(Vec<StrokeId>),
}

/// Core engine state: all logic that doesn't depend on the canvas element.
///
/// Separated from `Engine` so it can be tested without WASM/browser dependencies.
#[derive(Debug, Default)]
pub struct EngineCore {
    pub doc: StrokeStore,
    pub viewport: Viewport,
    pub session: SessionState,
    pub input: InputState,
    ids: ProvisionalIds,
}

impl EngineCore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // --- Data inputs ---

    /// Hydrate the store from a server snapshot.
    pub fn load_snapshot(&mut self, strokes: Vec<Stroke>) {
        self.doc.load_snapshot(strokes);
    }

    /// Apply a peer broadcast: stroke created. Returns `true` if the store changed.
    pub fn apply_create(&mut self, stroke: Stroke) -> bool {
        self.doc.insert(stroke)
    }

    /// Apply a peer broadcast: stroke erased. Returns `true` if the store changed.
    pub fn apply_erase(&mut self, id: StrokeId) -> bool {
        self.doc.remove(id).is_some()
    }

    /// Swap a provisional stroke for the server-confirmed one.
    pub fn confirm_stroke(&mut self, provisional: StrokeId, confirmed: Stroke) -> Confirmation {
        self.doc.confirm(provisional, confirmed)
    }

    // --- Tool / viewport ---

    /// Set the active tool. An in-progress gesture keeps the tool it started with.
    pub fn set_tool(&mut self, tool: Tool) {
        self.session.tool = tool;
    }

    /// Set the color used for subsequent strokes.
    pub fn set_color(&mut self, color: impl Into<String>) {
        self.session.color = color.into();
    }

    /// Recompute canvas size for a new container size.
    pub fn resize(&mut self, container_width: f64, container_height: f64, layout: Layout) -> Vec<Action> {
        let mut actions = Vec::new();
        if self.viewport.resize(container_width, container_height, layout) {
            actions.push(Action::CanvasResized {
                width: self.viewport.canvas_width,
                height: self.viewport.canvas_height,
            });
            actions.push(Action::RedrawBase);
        }
        actions.push(self.viewport_changed());
        actions
    }

    // --- Input events ---

    /// Start a gesture. Ignored while another gesture is active.
    pub fn on_pointer_down(&mut self, sample: PointerSample) -> Vec<Action> {
        if !matches!(self.input, InputState::Idle) {
            return Vec::new();
        }

        let tool = self.session.tool;
        self.input = if tool.traces_path() {
            InputState::Drawing {
                pointer_id: sample.pointer_id,
                tool,
                path: vec![self.viewport.to_canvas(sample.position)],
            }
        } else {
            InputState::Panning { pointer_id: sample.pointer_id, last_viewport: sample.position }
        };
        Vec::new()
    }

    /// Extend the active gesture. Samples from other pointers are ignored.
    pub fn on_pointer_move(&mut self, sample: PointerSample) -> Vec<Action> {
        if self.input.active_pointer() != Some(sample.pointer_id) {
            return Vec::new();
        }

        let canvas_pt = self.viewport.to_canvas(sample.position);
        match &mut self.input {
            InputState::Idle => Vec::new(),
            InputState::Drawing { tool, path, .. } => {
                let Some(&from) = path.last() else {
                    path.push(canvas_pt);
                    return Vec::new();
                };
                path.push(canvas_pt);
                let (color, width) = if *tool == Tool::Erase {
                    (ERASER_PREVIEW_COLOR.to_owned(), ERASER_PREVIEW_WIDTH)
                } else {
                    (self.session.color.clone(), STROKE_WIDTH)
                };
                vec![Action::OverlaySegment { from, to: canvas_pt, color, width }]
            }
            InputState::Panning { last_viewport, .. } => {
                let dx = sample.position.x - last_viewport.x;
                let dy = sample.position.y - last_viewport.y;
                *last_viewport = sample.position;
                self.viewport.pan_by(dx, dy);
                vec![self.viewport_changed()]
            }
        }
    }

    /// End the active gesture (pointer-up, leave, touch-end or touch-cancel).
    pub fn on_pointer_up(&mut self, pointer_id: PointerId) -> Vec<Action> {
        self.on_pointer_up_at(pointer_id, now_ms())
    }

    /// [`Self::on_pointer_up`] with an explicit commit timestamp for provisional ids.
    pub fn on_pointer_up_at(&mut self, pointer_id: PointerId, now_ms: i64) -> Vec<Action> {
        if self.input.active_pointer() != Some(pointer_id) {
            return Vec::new();
        }

        match std::mem::take(&mut self.input) {
            InputState::Drawing { tool: Tool::Erase, path, .. } => self.commit_erase(&path),
            InputState::Drawing { path, .. } => self.commit_draw(path, now_ms),
            InputState::Idle | InputState::Panning { .. } => Vec::new(),
        }
    }

    fn commit_draw(&mut self, path: Vec<Point>, now_ms: i64) -> Vec<Action> {
        if path.is_empty() {
            return vec![Action::ClearOverlay];
        }
        let stroke = Stroke { id: self.ids.next(now_ms), path, color: self.session.color.clone() };
        self.doc.insert(stroke.clone());
        vec![Action::ClearOverlay, Action::RedrawBase, Action::StrokeCommitted(stroke)]
    }

    fn commit_erase(&mut self, path: &[Point]) -> Vec<Action> {
        let hits = hit::erase_hits(&self.doc, path);
        if hits.is_empty() {
            return vec![Action::ClearOverlay];
        }
        for id in &hits {
            self.doc.remove(*id);
        }
        vec![Action::ClearOverlay, Action::RedrawBase, Action::StrokesErased(hits)]
    }

    fn viewport_changed(&self) -> Action {
        Action::ViewportChanged { offset_x: self.viewport.offset_x, offset_y: self.viewport.offset_y }
    }

    // --- Queries ---

    /// The stroke currently being traced, if a draw or erase gesture is active.
    #[must_use]
    pub fn live_path(&self) -> Option<&[Point]> {
        match &self.input {
            InputState::Drawing { path, .. } => Some(path),
            _ => None,
        }
    }

    /// Look up a stroke by id.
    #[must_use]
    pub fn stroke(&self, id: StrokeId) -> Option<&Stroke> {
        self.doc.get(id)
    }
}

/// Wall-clock milliseconds since the Unix epoch.
#[cfg(target_arch = "wasm32")]
#[allow(clippy::cast_possible_truncation)]
fn now_ms() -> i64 {
    js_sys::Date::now() as i64
}

/// Wall-clock milliseconds since the Unix epoch.
#[cfg(not(target_arch = "wasm32"))]
fn now_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map_or(0, |d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
}

/// The browser canvas engine. Wraps `EngineCore` and owns both canvas layers.
pub struct Engine {
    layers: Layers<CanvasRenderingContext2d>,
    pub core: EngineCore,
}

impl Engine {
    /// Create an engine drawing committed strokes on `base` and live feedback on `overlay`.
    ///
    /// # Errors
    ///
    /// Returns `Err` if either element cannot produce a 2D context.
    pub fn new(base: &HtmlCanvasElement, overlay: &HtmlCanvasElement) -> Result<Self, JsValue> {
        let core = EngineCore::new();
        let mut layers = Layers::new(context_2d(base)?, context_2d(overlay)?);
        layers.resize(&core.doc, &core.viewport)?;
        Ok(Self { layers, core })
    }

    // --- Delegated data inputs ---

    /// Replace the committed strokes and redraw.
    ///
    /// # Errors
    ///
    /// Returns `Err` if a canvas call fails.
    pub fn load_snapshot(&mut self, strokes: Vec<Stroke>) -> Result<(), JsValue> {
        self.core.load_snapshot(strokes);
        self.redraw()
    }

    /// Redraw the base layer from the store.
    ///
    /// # Errors
    ///
    /// Returns `Err` if a canvas call fails.
    pub fn redraw(&mut self) -> Result<(), JsValue> {
        self.layers.redraw_base(&self.core.doc, &self.core.viewport)
    }

    pub fn set_tool(&mut self, tool: Tool) {
        self.core.set_tool(tool);
    }

    pub fn set_color(&mut self, color: &str) {
        self.core.set_color(color);
    }

    // --- Viewport / input ---

    /// Resize for a new container size.
    ///
    /// # Errors
    ///
    /// Returns `Err` if a canvas call fails.
    pub fn resize(&mut self, width: f64, height: f64, layout: Layout) -> Result<Vec<Action>, JsValue> {
        let actions = self.core.resize(width, height, layout);
        self.render(&actions)?;
        Ok(actions)
    }

    /// # Errors
    ///
    /// Returns `Err` if a canvas call fails.
    pub fn on_pointer_down(&mut self, sample: PointerSample) -> Result<Vec<Action>, JsValue> {
        let actions = self.core.on_pointer_down(sample);
        self.render(&actions)?;
        Ok(actions)
    }

    /// # Errors
    ///
    /// Returns `Err` if a canvas call fails.
    pub fn on_pointer_move(&mut self, sample: PointerSample) -> Result<Vec<Action>, JsValue> {
        let actions = self.core.on_pointer_move(sample);
        self.render(&actions)?;
        Ok(actions)
    }

    /// # Errors
    ///
    /// Returns `Err` if a canvas call fails.
    pub fn on_pointer_up(&mut self, pointer_id: PointerId) -> Result<Vec<Action>, JsValue> {
        let actions = self.core.on_pointer_up(pointer_id);
        self.render(&actions)?;
        Ok(actions)
    }

    fn render(&mut self, actions: &[Action]) -> Result<(), JsValue> {
        self.layers.apply(actions, &self.core.doc, &self.core.viewport)
    }
}

fn context_2d(canvas: &HtmlCanvasElement) -> Result<CanvasRenderingContext2d, JsValue> {
    canvas
        .get_context("2d")?
        .ok_or_else(|| JsValue::from_str("2d context unavailable"))?
        .dyn_into::<CanvasRenderingContext2d>()
        .map_err(JsValue::from)
}
