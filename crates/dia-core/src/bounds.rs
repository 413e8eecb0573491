//! Bounds cache: memoizes the image's measured rectangle.
//!
//! Layout reads are expensive in the browser and pointer-move fires far more
//! often than the layout changes, so the last measurement is reused for
//! `bounds_cache_ms` (one frame by default) or until [`BoundsCache::invalidate`].
//!
//! [`Measure`] must report the image's *untransformed* layout box; zoom and
//! pan are applied analytically by [`crate::coords`]. During a touch gesture
//! the cache serves the gesture-start snapshot and never re-measures, because
//! the transformed element is mid-animation and its box is unreliable.

use crate::coords::{Bounds, Transform, display_rect};
use kurbo::Rect;

/// Layout measurement primitive (`measureElement` on the page).
///
/// Returns `None` when the element is not mounted.
pub trait Measure {
    fn measure(&self) -> Option<Bounds>;
}

impl<F> Measure for F
where
    F: Fn() -> Option<Bounds>,
{
    fn measure(&self) -> Option<Bounds> {
        self()
    }
}

/// A fixed measurement, handy for tests and headless use.
#[derive(Debug, Clone, Copy)]
pub struct FixedBounds(pub Bounds);

impl Measure for FixedBounds {
    fn measure(&self) -> Option<Bounds> {
        Some(self.0)
    }
}

#[derive(Debug, Clone)]
pub struct BoundsCache {
    ttl_ms: f64,
    cached: Option<Bounds>,
    measured_at: f64,
    stale: bool,
    /// Gesture-start snapshot; while set, `get` never measures.
    gesture: Option<Bounds>,
    measurements: u64,
}

impl BoundsCache {
    pub fn new(ttl_ms: f64) -> Self {
        Self {
            ttl_ms,
            cached: None,
            measured_at: f64::NEG_INFINITY,
            stale: true,
            gesture: None,
            measurements: 0,
        }
    }

    /// Current bounds, re-measuring when stale, expired, or forced.
    ///
    /// Returns the last known bounds when the element is unmounted, and `None`
    /// only if nothing was ever measured.
    pub fn get(&mut self, measure: &impl Measure, now_ms: f64, force: bool) -> Option<Bounds> {
        if let Some(snapshot) = self.gesture {
            return Some(snapshot);
        }

        let expired = now_ms - self.measured_at > self.ttl_ms;
        if force || self.stale || expired || self.cached.is_none() {
            self.refresh(measure, now_ms);
        }
        self.cached
    }

    fn refresh(&mut self, measure: &impl Measure, now_ms: f64) {
        match measure.measure() {
            Some(bounds) if bounds.is_valid() || self.cached.is_none() => {
                self.measurements += 1;
                self.cached = Some(bounds);
                self.measured_at = now_ms;
                self.stale = false;
            }
            Some(bounds) => {
                log::debug!("ignoring degenerate measurement {bounds:?}; keeping last known");
            }
            None => {
                log::debug!("image not mounted; serving last known bounds");
            }
        }
    }

    /// Force the next `get` to re-measure (resize, zoom end, pan end).
    pub fn invalidate(&mut self) {
        self.stale = true;
    }

    /// Freeze the bounds for the duration of a touch gesture.
    pub fn begin_gesture(&mut self, measure: &impl Measure, now_ms: f64) {
        if self.gesture.is_some() {
            return;
        }
        let snapshot = self.get(measure, now_ms, false);
        self.gesture = snapshot;
    }

    /// Release the gesture snapshot; the next read re-measures.
    pub fn end_gesture(&mut self) {
        if self.gesture.take().is_some() {
            self.invalidate();
        }
    }

    pub fn in_gesture(&self) -> bool {
        self.gesture.is_some()
    }

    /// On-screen image rectangle for a transform, derived analytically from
    /// the served bounds (snapshot during a gesture).
    pub fn display(&self, transform: &Transform) -> Option<Rect> {
        let bounds = self.gesture.or(self.cached)?;
        display_rect(&bounds, transform)
    }

    /// Last served bounds without measuring.
    pub fn last_known(&self) -> Option<Bounds> {
        self.gesture.or(self.cached)
    }

    /// Number of real layout reads performed so far.
    pub fn measurements(&self) -> u64 {
        self.measurements
    }
}
