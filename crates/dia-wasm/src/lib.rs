//! WASM bridge for Dia — exposes the annotation session to the page script.
//!
//! Compiled via `wasm-pack build --target web`. The page owns the DOM: it
//! creates marker and tooltip elements, forwards input here, and applies the
//! returned effects (a JSON array of `{"kind": ...}` objects). URL writes are
//! applied by the bridge itself.

mod effects;

use dia_core::codec::DEBUG_PARAM;
use dia_core::{
    ANNOTATIONS_PARAM, AnnotationId, Bounds, Config, Dataset, DiaError, Measure, ParamUpdate,
    Point, Rect, Size, TypeKey,
};
use dia_editor::{Effect, InputEvent, PageParams, Session};
use dia_render::{RenderHandle, RenderHandles};
use effects::{PlacementView, batch_to_string};
use wasm_bindgen::prelude::*;
use web_sys::HtmlElement;

/// Measures the image's untransformed layout box: its offset parent's
/// viewport rectangle plus the image's layout offsets. The CSS transform used
/// for zoom does not affect offsets, so this stays valid while zoomed.
struct ElementMeasure {
    image: HtmlElement,
}

impl Measure for ElementMeasure {
    fn measure(&self) -> Option<Bounds> {
        if !self.image.is_connected() {
            return None;
        }
        let parent = self.image.offset_parent()?;
        let frame = parent.get_bounding_client_rect();
        Some(Bounds::new(
            frame.left() + f64::from(self.image.offset_left()),
            frame.top() + f64::from(self.image.offset_top()),
            f64::from(self.image.offset_width()),
            f64::from(self.image.offset_height()),
        ))
    }
}

/// The page-facing diagram controller.
#[wasm_bindgen]
pub struct DiagramView {
    session: Session<ElementMeasure>,
    handles: RenderHandles<HtmlElement>,
}

#[wasm_bindgen]
impl DiagramView {
    /// Create the controller for `image`. An empty `config_json` uses the
    /// built-in defaults. Query parameters are read once, here.
    #[wasm_bindgen(constructor)]
    pub fn new(
        image: HtmlElement,
        config_json: &str,
        dataset_json: &str,
    ) -> Result<DiagramView, JsValue> {
        console_error_panic_hook_setup();

        let params = read_page_params();
        console_logger_setup(params.debug);

        let config = if config_json.trim().is_empty() {
            Config::default()
        } else {
            Config::from_json(config_json).map_err(to_js)?
        };
        let dataset = Dataset::from_json(dataset_json).map_err(to_js)?;
        let session =
            Session::new(config, dataset, params, ElementMeasure { image }).map_err(to_js)?;
        log::info!(
            "dia ready: {} built-in, {} user annotations",
            session.store().builtin_count(),
            session.store().user_count()
        );

        Ok(Self {
            session,
            handles: RenderHandles::new(),
        })
    }

    // ─── Input ───────────────────────────────────────────────────────────

    pub fn pointer_down(&mut self, x: f64, y: f64) -> String {
        self.input(InputEvent::pointer_down(x, y))
    }

    pub fn pointer_move(&mut self, x: f64, y: f64) -> String {
        self.input(InputEvent::pointer_move(x, y))
    }

    pub fn pointer_up(&mut self, x: f64, y: f64) -> String {
        self.input(InputEvent::pointer_up(x, y))
    }

    pub fn wheel(&mut self, x: f64, y: f64, delta_y: f64) -> String {
        self.input(InputEvent::Wheel {
            position: Point::new(x, y),
            delta_y,
        })
    }

    /// Touches as a flat `[id, x, y, ...]` list of the fingers still down.
    pub fn touch_start(&mut self, touches: &[f64]) -> String {
        self.input(InputEvent::TouchStart {
            touches: InputEvent::touches_from_flat(touches),
        })
    }

    pub fn touch_move(&mut self, touches: &[f64]) -> String {
        self.input(InputEvent::TouchMove {
            touches: InputEvent::touches_from_flat(touches),
        })
    }

    pub fn touch_end(&mut self, touches: &[f64]) -> String {
        self.input(InputEvent::TouchEnd {
            touches: InputEvent::touches_from_flat(touches),
        })
    }

    pub fn key(&mut self, key: &str) -> String {
        self.input(InputEvent::key(key))
    }

    fn input(&mut self, event: InputEvent) -> String {
        let fx = self.session.handle(&event, now_ms());
        self.apply(fx)
    }

    // ─── Commands ────────────────────────────────────────────────────────

    pub fn begin_placement(
        &mut self,
        title: &str,
        kind: &str,
        description: &str,
        shape: &str,
    ) -> String {
        let result = self.session.begin_placement(title, kind, description, shape);
        self.command(result)
    }

    pub fn set_edit_mode(&mut self, on: bool) -> String {
        let result = self.session.set_edit_mode(on);
        self.command(result)
    }

    pub fn edit(&mut self, index: usize, title: &str, description: &str, kind: &str) -> String {
        let result = self.session.edit(index, title, description, kind);
        self.command(result)
    }

    pub fn delete(&mut self, index: usize) -> String {
        let result = self.session.delete(index);
        self.command(result)
    }

    pub fn clear_all(&mut self) -> String {
        let result = self.session.clear_all();
        self.command(result)
    }

    pub fn set_calibration(&mut self, x: &str, y: &str) -> String {
        let fx = self.session.set_calibration(x, y);
        self.apply(fx)
    }

    /// Built-in dataset with the calibration applied, as pretty JSON.
    pub fn export_calibrated(&self) -> Result<String, JsValue> {
        self.session
            .export_calibrated()
            .map_err(|e| JsValue::from_str(&e.to_string()))
    }

    pub fn resize(&mut self) -> String {
        let fx = self.session.resize();
        self.apply(fx)
    }

    pub fn reset_zoom(&mut self) -> String {
        let fx = self.session.reset_zoom();
        self.apply(fx)
    }

    fn command(&mut self, result: Result<Vec<Effect>, DiaError>) -> String {
        match result {
            Ok(fx) => self.apply(fx),
            Err(e) if e.is_user_facing() => batch_to_string(&[Effect::Notify(e.to_string())]),
            Err(e) => {
                log::warn!("command refused: {e}");
                "[]".to_string()
            }
        }
    }

    // ─── Rendering ───────────────────────────────────────────────────────

    /// Animation-frame callback for a `requestFrame` ticket. Returns the
    /// placements as a JSON array, or `null` when there is nothing to do.
    pub fn frame(&mut self, ticket: u32) -> String {
        let Some(placements) = self.session.frame(u64::from(ticket), now_ms()) else {
            return "null".to_string();
        };
        let views: Vec<PlacementView> = placements.iter().map(PlacementView::from).collect();
        for view in &views {
            if let Some(handle) = self.handles.get_mut(AnnotationId::from_raw(view.id)) {
                handle.display_index = view.display_index;
            }
        }
        serde_json::to_string(&views).unwrap_or_else(|_| "null".to_string())
    }

    /// Register the element the page created for annotation `id`.
    pub fn mount(&mut self, id: f64, element: HtmlElement, tooltip: Option<HtmlElement>) {
        let id = AnnotationId::from_raw(id as u64);
        let display_index = self
            .session
            .placements()
            .iter()
            .find(|p| p.id == id)
            .map_or(0, |p| p.display_index);
        let mut handle = RenderHandle::new(element, display_index);
        handle.tooltip = tooltip;
        if let Some(old) = self.handles.mount(id, handle) {
            remove_handle(&old);
        }
    }

    /// Sanitized tooltip body for annotation `id`.
    pub fn tooltip_html(&self, id: f64) -> Option<String> {
        self.session.tooltip_html(AnnotationId::from_raw(id as u64))
    }

    /// Position a mounted tooltip of the measured size. Returns `{left, top}`.
    pub fn place_tooltip(&self, width: f64, height: f64, anchor_x: f64, anchor_y: f64) -> String {
        let viewport = viewport_rect().unwrap_or(Rect::ZERO);
        let p = self.session.place_tooltip(
            Size::new(width, height),
            Point::new(anchor_x, anchor_y),
            viewport,
        );
        serde_json::json!({ "left": p.x, "top": p.y }).to_string()
    }

    // ─── Queries ─────────────────────────────────────────────────────────

    pub fn edit_mode(&self) -> bool {
        self.session.interaction().edit_mode()
    }

    pub fn is_debug(&self) -> bool {
        self.session.is_debug()
    }

    pub fn zoom(&self) -> f64 {
        self.session.transform().zoom
    }

    pub fn user_count(&self) -> usize {
        self.session.store().user_count()
    }

    pub fn max_users(&self) -> usize {
        self.session.store().max_users()
    }

    /// Delay before a tooltip hides once the pointer leaves it.
    pub fn tooltip_hide_delay(&self) -> u32 {
        self.session.config().tooltip_hide_delay_ms
    }

    /// `{bg, color, radius, border}` for a marker type, or `null`.
    pub fn marker_style(&self, kind: &str) -> String {
        self.session
            .config()
            .marker_style(TypeKey::intern(kind))
            .and_then(|style| serde_json::to_string(&style).ok())
            .unwrap_or_else(|| "null".to_string())
    }

    /// User annotations in their persisted form, for the edit list.
    pub fn users_json(&self) -> String {
        serde_json::to_string(self.session.store().users()).unwrap_or_else(|_| "[]".to_string())
    }

    // ─── Effects ─────────────────────────────────────────────────────────

    /// Apply what the bridge owns (URL, render handles) and encode the rest.
    fn apply(&mut self, fx: Vec<Effect>) -> String {
        for effect in &fx {
            match effect {
                Effect::WriteParam(update) => {
                    if let Err(e) = write_param(update) {
                        log::warn!("could not update the URL: {e:?}");
                    }
                }
                Effect::Unmount(id) => {
                    if let Some(handle) = self.handles.unmount(*id) {
                        remove_handle(&handle);
                    }
                }
                Effect::Rerender => {
                    let live: Vec<AnnotationId> = self
                        .session
                        .store()
                        .all_with_ids()
                        .map(|(id, _)| id)
                        .collect();
                    for (_, handle) in self.handles.retain_live(&live) {
                        remove_handle(&handle);
                    }
                }
                _ => {}
            }
        }
        batch_to_string(&fx)
    }
}

fn remove_handle(handle: &RenderHandle<HtmlElement>) {
    handle.element.remove();
    if let Some(tooltip) = &handle.tooltip {
        tooltip.remove();
    }
}

fn to_js(e: DiaError) -> JsValue {
    JsValue::from_str(&e.to_string())
}

// ─── Page access ─────────────────────────────────────────────────────────

fn now_ms() -> f64 {
    js_sys::Date::now()
}

fn viewport_rect() -> Option<Rect> {
    let window = web_sys::window()?;
    let width = window.inner_width().ok()?.as_f64()?;
    let height = window.inner_height().ok()?.as_f64()?;
    Some(Rect::new(0.0, 0.0, width, height))
}

fn read_page_params() -> PageParams {
    let Some(search) = web_sys::window().and_then(|w| w.location().search().ok()) else {
        return PageParams::default();
    };
    let Ok(query) = web_sys::UrlSearchParams::new_with_str(&search) else {
        return PageParams::default();
    };
    PageParams {
        debug: query.has(DEBUG_PARAM),
        annotations: query.get(ANNOTATIONS_PARAM),
    }
}

/// Rewrite the `annotations` parameter without reloading.
fn write_param(update: &ParamUpdate) -> Result<(), JsValue> {
    let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
    let url = web_sys::Url::new(&window.location().href()?)?;
    let query = url.search_params();
    match update {
        ParamUpdate::Set(value) => query.set(ANNOTATIONS_PARAM, value),
        ParamUpdate::Remove => query.delete(ANNOTATIONS_PARAM),
        ParamUpdate::Unchanged => return Ok(()),
    }
    window
        .history()?
        .replace_state_with_url(&JsValue::NULL, "", Some(&url.href()))
}

// ─── Console logging ─────────────────────────────────────────────────────

struct ConsoleLogger;

impl log::Log for ConsoleLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &log::Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let msg = JsValue::from_str(&format!("[dia] {}", record.args()));
        match record.level() {
            log::Level::Error => web_sys::console::error_1(&msg),
            log::Level::Warn => web_sys::console::warn_1(&msg),
            log::Level::Info => web_sys::console::info_1(&msg),
            log::Level::Debug | log::Level::Trace => web_sys::console::debug_1(&msg),
        }
    }

    fn flush(&self) {}
}

static LOGGER: ConsoleLogger = ConsoleLogger;

fn console_logger_setup(debug: bool) {
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(if debug {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        });
    }
}

// ─── Panic hook for WASM debugging ───────────────────────────────────────

fn console_error_panic_hook_setup() {
    #[cfg(target_arch = "wasm32")]
    {
        use std::sync::Once;
        static SET_HOOK: Once = Once::new();
        SET_HOOK.call_once(|| {
            std::panic::set_hook(Box::new(|info| {
                let msg = format!("Dia WASM panic: {info}");
                web_sys::console::error_1(&msg.into());
            }));
        });
    }
}
