//! Session: the one application-state struct.
//!
//! Owns the store, the bounds cache, the zoom/pan controller, the interaction
//! state machine and the frame scheduler, and is the only code that mutates
//! the store. Every entry point returns the effects the page must apply;
//! [`Effect::Commit`] and [`Effect::Reposition`] never leave the session.

use crate::effect::{Effect, StoreMutation};
use crate::input::{InputEvent, Touches};
use crate::interaction::{Frame, Interaction};
use crate::scheduler::FrameScheduler;
use crate::tooltip;
use crate::zoom::ZoomPan;
use dia_core::codec::DEBUG_PARAM;
use dia_core::coords::from_display;
use dia_core::dataset::pick_line;
use dia_core::model::in_unit_range;
use dia_core::sanitize::tooltip_html;
use dia_core::{
    ANNOTATIONS_PARAM, AllowList, AnnotationId, AnnotationPatch, AnnotationStore, Bounds,
    BoundsCache, Calibration, Config, Dataset, DiaError, Measure, ParamUpdate, PlacementDraft,
    Shape, Transform, TypeKey, decode, encode,
};
use dia_render::layout::Placement;
use dia_render::{hit_test, position_all};
use kurbo::{Point, Rect, Size};

/// Query parameters read once at startup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageParams {
    /// `debug` is present: coordinate picking and calibration are on.
    pub debug: bool,
    /// Raw `annotations` value, already URL-decoded by the host.
    pub annotations: Option<String>,
}

impl PageParams {
    /// Pick the parameters we care about out of decoded query pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut params = Self::default();
        for (key, value) in pairs {
            match key.as_ref() {
                DEBUG_PARAM => params.debug = true,
                ANNOTATIONS_PARAM => params.annotations = Some(value.into()),
                _ => {}
            }
        }
        params
    }
}

/// Inputs the last positioning pass was computed from.
#[derive(Debug, Clone, Copy, PartialEq)]
struct LayoutKey {
    revision: u64,
    bounds: Bounds,
    transform: Transform,
    calibration: Calibration,
}

pub struct Session<M: Measure> {
    config: Config,
    dataset: Dataset,
    store: AnnotationStore,
    sanitizer: AllowList,
    measure: M,
    bounds: BoundsCache,
    calibration: Calibration,
    zoom: ZoomPan,
    interaction: Interaction,
    scheduler: FrameScheduler,
    placements: Vec<Placement>,
    layout: Option<LayoutKey>,
    annotations_param: Option<String>,
    debug: bool,
    /// Last single-finger position, replayed as the pointer-up on touch end.
    last_touch: Option<Point>,
}

impl<M: Measure> Session<M> {
    pub fn new(
        config: Config,
        dataset: Dataset,
        params: PageParams,
        measure: M,
    ) -> Result<Self, DiaError> {
        config.validate()?;
        let mut store = AnnotationStore::new(&dataset, config.max_user_annotations);
        if let Some(raw) = params.annotations.as_deref() {
            let users = decode(raw, &config);
            log::debug!("restored {} user annotations from the URL", users.len());
            store.load_users(users);
        }

        Ok(Self {
            sanitizer: AllowList::from_config(&config),
            bounds: BoundsCache::new(config.bounds_cache_ms),
            zoom: ZoomPan::new(config.zoom),
            config,
            dataset,
            store,
            measure,
            calibration: Calibration::NONE,
            interaction: Interaction::new(),
            scheduler: FrameScheduler::new(),
            placements: Vec::new(),
            layout: None,
            annotations_param: params.annotations,
            debug: params.debug,
            last_touch: None,
        })
    }

    // ─── Accessors ───────────────────────────────────────────────────────

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &AnnotationStore {
        &self.store
    }

    pub fn interaction(&self) -> &Interaction {
        &self.interaction
    }

    pub fn transform(&self) -> Transform {
        self.zoom.transform()
    }

    pub fn bounds(&self) -> &BoundsCache {
        &self.bounds
    }

    pub fn calibration(&self) -> Calibration {
        self.calibration
    }

    pub fn is_debug(&self) -> bool {
        self.debug
    }

    /// Current value of the `annotations` parameter, `None` if removed.
    pub fn annotations_param(&self) -> Option<&str> {
        self.annotations_param.as_deref()
    }

    /// Result of the last positioning pass.
    pub fn placements(&self) -> &[Placement] {
        &self.placements
    }

    // ─── Input ───────────────────────────────────────────────────────────

    pub fn handle(&mut self, event: &InputEvent, now_ms: f64) -> Vec<Effect> {
        let fx = match event {
            InputEvent::Wheel { position, delta_y } => self.wheel(*position, *delta_y, now_ms),
            InputEvent::TouchStart { touches } => self.touch_start(touches, now_ms),
            InputEvent::TouchMove { touches } => self.touch_move(touches, now_ms),
            InputEvent::TouchEnd { touches } => self.touch_end(touches, now_ms),
            InputEvent::Key { .. } if event.is_escape() => {
                let mut fx = self.interaction.cancel();
                if self.zoom.end_pan() {
                    fx.push(Effect::ReleaseGlobalPointer);
                }
                fx
            }
            InputEvent::Key { .. } => Vec::new(),
            InputEvent::PointerDown { .. }
            | InputEvent::PointerMove { .. }
            | InputEvent::PointerUp { .. } => self.pointer(event, now_ms),
        };
        self.process(fx)
    }

    fn pointer(&mut self, event: &InputEvent, now_ms: f64) -> Vec<Effect> {
        let Some(position) = event.position() else {
            return Vec::new();
        };
        let Some(bounds) = self.bounds.get(&self.measure, now_ms, false) else {
            log::debug!("pointer event before the image was measured");
            return Vec::new();
        };
        self.ensure_layout(bounds);
        let local = position - bounds.origin().to_vec2();

        if self.zoom.is_panning() {
            return match event {
                InputEvent::PointerMove { .. } if self.zoom.update_pan(local) => {
                    self.transform_changed()
                }
                InputEvent::PointerUp { .. } => {
                    self.zoom.end_pan();
                    self.bounds.invalidate();
                    vec![Effect::ReleaseGlobalPointer, Effect::Reposition]
                }
                _ => Vec::new(),
            };
        }

        let hit = hit_test(&self.placements, position, self.config.handle_hit_radius);
        let display = self.bounds.display(&self.zoom.transform());
        let mut fx = Vec::new();

        if matches!(event, InputEvent::PointerDown { .. }) && self.interaction.is_idle() {
            if self.debug
                && hit.is_none()
                && let Some(n) = display.and_then(|d| from_display(position, d))
                && in_unit_range(n.x)
                && in_unit_range(n.y)
            {
                let line = pick_line(n);
                log::info!("{line}");
                fx.push(Effect::PickedCoordinate(line));
            }
            let grabs = self.interaction.edit_mode() && hit.is_some_and(|h| h.user_index.is_some());
            if !grabs && self.zoom.begin_pan(local) {
                fx.push(Effect::CaptureGlobalPointer);
                return fx;
            }
        }

        let frame = Frame {
            config: &self.config,
            store: &self.store,
            placements: &self.placements,
            display,
        };
        fx.extend(self.interaction.handle(event, hit, &frame));
        fx
    }

    fn wheel(&mut self, position: Point, delta_y: f64, now_ms: f64) -> Vec<Effect> {
        let Some(bounds) = self.bounds.get(&self.measure, now_ms, false) else {
            return Vec::new();
        };
        if !self.zoom.wheel(position - bounds.origin().to_vec2(), delta_y) {
            return Vec::new();
        }
        self.bounds.invalidate();
        self.transform_changed()
    }

    fn touch_start(&mut self, touches: &Touches, now_ms: f64) -> Vec<Effect> {
        match touches.as_slice() {
            [a, b, ..] => {
                self.bounds.begin_gesture(&self.measure, now_ms);
                let Some(origin) = self.bounds.last_known().map(|b| b.origin().to_vec2()) else {
                    return Vec::new();
                };
                // A second finger turns whatever the first one started into a pinch
                let mut fx = self.interaction.cancel();
                if self.zoom.end_pan() {
                    fx.push(Effect::ReleaseGlobalPointer);
                }
                self.last_touch = None;
                self.zoom.begin_pinch(a.position - origin, b.position - origin);
                log::debug!("pinch start at zoom {:.2}", self.zoom.zoom());
                fx
            }
            [one] => {
                self.bounds.begin_gesture(&self.measure, now_ms);
                self.last_touch = Some(one.position);
                self.pointer(&InputEvent::PointerDown { position: one.position }, now_ms)
            }
            [] => Vec::new(),
        }
    }

    fn touch_move(&mut self, touches: &Touches, now_ms: f64) -> Vec<Effect> {
        match touches.as_slice() {
            [a, b, ..] if self.zoom.is_pinching() => {
                let Some(origin) = self.bounds.last_known().map(|b| b.origin().to_vec2()) else {
                    return Vec::new();
                };
                if self.zoom.update_pinch(a.position - origin, b.position - origin) {
                    self.transform_changed()
                } else {
                    Vec::new()
                }
            }
            [one] if !self.zoom.is_pinching() => {
                self.last_touch = Some(one.position);
                self.pointer(&InputEvent::PointerMove { position: one.position }, now_ms)
            }
            _ => Vec::new(),
        }
    }

    fn touch_end(&mut self, touches: &Touches, now_ms: f64) -> Vec<Effect> {
        if self.zoom.is_pinching() {
            if touches.len() >= 2 {
                return Vec::new();
            }
            self.zoom.end_pinch();
            self.bounds.end_gesture();
            log::debug!("pinch end at zoom {:.2}", self.zoom.zoom());
            return vec![Effect::Reposition];
        }
        if !touches.is_empty() {
            return Vec::new();
        }
        let fx = match self.last_touch.take() {
            Some(position) => self.pointer(&InputEvent::PointerUp { position }, now_ms),
            None => Vec::new(),
        };
        self.bounds.end_gesture();
        fx
    }

    fn transform_changed(&self) -> Vec<Effect> {
        vec![
            Effect::TransformChanged(self.zoom.transform()),
            Effect::Reposition,
        ]
    }

    // ─── Commands ────────────────────────────────────────────────────────

    /// Start placing a new annotation from the add form.
    pub fn begin_placement(
        &mut self,
        title: &str,
        kind: &str,
        description: &str,
        shape: &str,
    ) -> Result<Vec<Effect>, DiaError> {
        if self.store.is_full() {
            return Err(DiaError::CapacityExceeded {
                max: self.store.max_users(),
            });
        }
        let kind = TypeKey::intern(kind);
        let style = self.config.style_or_err(kind)?.clone();
        let shape = Shape::parse(shape).unwrap_or_default();
        let draft = PlacementDraft::new(title, kind, description, shape)?;
        let mut fx = Vec::new();
        if self.zoom.end_pan() {
            fx.push(Effect::ReleaseGlobalPointer);
        }
        fx.extend(self.interaction.begin_placement(draft, &style)?);
        Ok(self.process(fx))
    }

    pub fn set_edit_mode(&mut self, on: bool) -> Result<Vec<Effect>, DiaError> {
        let fx = self.interaction.set_edit_mode(on)?;
        Ok(self.process(fx))
    }

    /// Submit the edit form for user annotation `index`.
    ///
    /// The title is trimmed and required. The type may change only within the
    /// same kind: a point stays a point, an area stays an area.
    pub fn edit(
        &mut self,
        index: usize,
        title: &str,
        description: &str,
        kind: &str,
    ) -> Result<Vec<Effect>, DiaError> {
        let current = self.store.user(index)?;
        let title = title.trim();
        if title.is_empty() {
            return Err(DiaError::InvalidAnnotation("title is required".into()));
        }
        let kind = TypeKey::intern(kind);
        let next = self.config.style_or_err(kind)?.annotation_type;
        if let Some(style) = self.config.style(current.kind)
            && style.annotation_type != next
        {
            return Err(DiaError::InvalidAnnotation(format!(
                "cannot change a {:?} annotation into {kind}",
                style.annotation_type
            )));
        }

        let patch = AnnotationPatch {
            title: Some(title.to_string()),
            description: Some(description.to_string()),
            kind: Some(kind),
            ..Default::default()
        };
        let mut fx = self.commit(StoreMutation::Update { index, patch })?;
        fx.push(Effect::Reposition);
        Ok(self.process(fx))
    }

    pub fn delete(&mut self, index: usize) -> Result<Vec<Effect>, DiaError> {
        if self.interaction.is_gesture_active() {
            return Err(DiaError::GestureInProgress);
        }
        let (id, removed) = self.store.remove(index)?;
        log::debug!("deleted {:?}", removed.title);
        let fx = self.after_removal(vec![id]);
        Ok(self.process(fx))
    }

    /// Remove every user annotation. Built-ins stay.
    pub fn clear_all(&mut self) -> Result<Vec<Effect>, DiaError> {
        if self.interaction.is_gesture_active() {
            return Err(DiaError::GestureInProgress);
        }
        if self.store.user_count() == 0 {
            return Ok(Vec::new());
        }
        let ids = self.store.clear();
        log::debug!("cleared {} user annotations", ids.len());
        let fx = self.after_removal(ids);
        Ok(self.process(fx))
    }

    fn after_removal(&mut self, ids: Vec<AnnotationId>) -> Vec<Effect> {
        let mut fx = Vec::with_capacity(ids.len() + 3);
        for id in ids {
            self.interaction.forget(id);
            fx.push(Effect::Unmount(id));
        }
        fx.push(Effect::Rerender);
        fx.extend(self.persist());
        fx.push(Effect::Reposition);
        fx
    }

    /// Set the debug calibration multipliers from raw form input.
    pub fn set_calibration(&mut self, x: &str, y: &str) -> Vec<Effect> {
        self.calibration = Calibration {
            x: Calibration::parse_axis(x),
            y: Calibration::parse_axis(y),
        };
        log::debug!("calibration {:?}", self.calibration);
        self.process(vec![Effect::Reposition])
    }

    /// The built-in dataset with the calibration baked into its coordinates.
    pub fn export_calibrated(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.dataset.export_calibrated(&self.calibration))
    }

    /// The window or the image was resized.
    pub fn resize(&mut self) -> Vec<Effect> {
        self.bounds.invalidate();
        self.process(vec![Effect::Reposition])
    }

    pub fn reset_zoom(&mut self) -> Vec<Effect> {
        if self.zoom.transform() == Transform::IDENTITY {
            return Vec::new();
        }
        self.zoom.reset();
        self.bounds.invalidate();
        let fx = self.transform_changed();
        self.process(fx)
    }

    // ─── Rendering ───────────────────────────────────────────────────────

    /// Animation-frame callback. Returns fresh placements, or `None` for a
    /// stale ticket or an image that can't be measured.
    pub fn frame(&mut self, ticket: u64, now_ms: f64) -> Option<&[Placement]> {
        if !self.scheduler.run(ticket) {
            return None;
        }
        log::trace!(
            "frame {ticket} ({} requests coalesced so far)",
            self.scheduler.coalesced()
        );
        let Some(bounds) = self.bounds.get(&self.measure, now_ms, false) else {
            log::debug!("image not measurable; positioning skipped");
            return None;
        };
        self.ensure_layout(bounds);
        if self.layout.is_none() {
            return None;
        }
        Some(self.placements.as_slice())
    }

    fn ensure_layout(&mut self, bounds: Bounds) {
        let key = LayoutKey {
            revision: self.store.revision(),
            bounds,
            transform: self.zoom.transform(),
            calibration: self.calibration,
        };
        if self.layout == Some(key) {
            return;
        }
        match position_all(
            &self.store,
            &self.config,
            &bounds,
            &key.transform,
            &self.calibration,
        ) {
            Some(placements) => {
                log::trace!("positioned {} annotations", placements.len());
                self.placements = placements;
                self.layout = Some(key);
            }
            None => {
                self.placements.clear();
                self.layout = None;
            }
        }
    }

    /// Top-left corner for a mounted tooltip of `size` (measured, before the
    /// minimum width is applied).
    pub fn place_tooltip(&self, size: Size, anchor: Point, viewport: Rect) -> Point {
        let size = Size::new(
            tooltip::width(size.width, self.config.tooltip_min_width),
            size.height,
        );
        tooltip::place(size, anchor, viewport, self.config.tooltip_gap)
    }

    /// Sanitized tooltip body for an annotation.
    pub fn tooltip_html(&self, id: AnnotationId) -> Option<String> {
        self.store
            .all_with_ids()
            .find(|(other, _)| *other == id)
            .map(|(_, entry)| tooltip_html(entry.title(), entry.description(), &self.sanitizer))
    }

    // ─── Effects ─────────────────────────────────────────────────────────

    /// Consume `Commit` and `Reposition`; pass everything else through.
    fn process(&mut self, fx: Vec<Effect>) -> Vec<Effect> {
        let mut out = Vec::with_capacity(fx.len());
        for effect in fx {
            match effect {
                Effect::Commit(mutation) => match self.commit(mutation) {
                    Ok(done) => out.extend(self.process(done)),
                    Err(e) if e.is_user_facing() => out.push(Effect::Notify(e.to_string())),
                    Err(e) => {
                        log::warn!("discarding change: {e}");
                        out.extend(self.schedule());
                    }
                },
                Effect::Reposition => out.extend(self.schedule()),
                other => out.push(other),
            }
        }
        out
    }

    /// Apply a mutation to the store and persist it.
    fn commit(&mut self, mutation: StoreMutation) -> Result<Vec<Effect>, DiaError> {
        match mutation {
            StoreMutation::Add(annotation) => {
                self.store.add(annotation)?;
            }
            StoreMutation::Update { index, patch } => {
                self.store.update(index, &patch)?;
            }
        }
        let mut fx = vec![Effect::Rerender];
        fx.extend(self.persist());
        Ok(fx)
    }

    fn persist(&mut self) -> Option<Effect> {
        if !self.store.take_dirty() {
            return None;
        }
        let update = encode(self.store.users());
        match &update {
            ParamUpdate::Set(value) => self.annotations_param = Some(value.clone()),
            ParamUpdate::Remove => self.annotations_param = None,
            ParamUpdate::Unchanged => return None,
        }
        Some(Effect::WriteParam(update))
    }

    fn schedule(&mut self) -> Option<Effect> {
        self.scheduler.request().map(Effect::RequestFrame)
    }
}
