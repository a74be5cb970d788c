//! Zoom/reset state machine for one chart.
//!
//! Every gesture that needs data is split into `begin_*` (builds the query
//! and stamps it with a generation) and [`ZoomController::complete`] (applies
//! the response). Only the newest generation may touch the buffer, so a slow
//! response to a superseded gesture is dropped instead of overwriting newer
//! data. State changes happen on completion: a failed fetch leaves the
//! buffer, the zoom window and the resolution setting as they were.

use super::options::ChartOptions;
use crate::error::ChartResult;
use crate::query::{
    build_query, select_resolution, QueryDescriptor, QueryTarget, Resolution, ResolutionSetting,
    TimeRange,
};
use crate::series::{ChartArrays, SeriesBuffer, SeriesRow};
use crate::storage::{run_query, SeriesSource};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ZoomState {
    Idle,
    Zoomed { min: u64, max: u64 },
}

impl ZoomState {
    pub fn window(&self) -> Option<(u64, u64)> {
        match self {
            ZoomState::Idle => None,
            ZoomState::Zoomed { min, max } => Some((*min, *max)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Gesture {
    Load,
    DragSelect { min: u64, max: u64 },
    ResolutionChange(ResolutionSetting),
}

/// An issued query waiting for its response.
#[derive(Debug, Clone)]
pub struct PendingQuery {
    generation: u64,
    request_id: Uuid,
    gesture: Gesture,
    descriptor: QueryDescriptor,
}

impl PendingQuery {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    pub fn gesture(&self) -> &Gesture {
        &self.gesture
    }

    pub fn descriptor(&self) -> &QueryDescriptor {
        &self.descriptor
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Applied,
    /// A later gesture superseded this one; the response was dropped.
    Stale,
}

#[derive(Debug, Clone, PartialEq)]
struct Snapshot {
    buffer: SeriesBuffer,
    resolution: Option<Resolution>,
}

pub struct ZoomController {
    target: QueryTarget,
    full_range: TimeRange,
    setting: ResolutionSetting,
    state: ZoomState,
    buffer: SeriesBuffer,
    resolution: Option<Resolution>,
    snapshot: Option<Snapshot>,
    generation: u64,
}

impl ZoomController {
    pub fn new(target: QueryTarget, full_range: TimeRange, setting: ResolutionSetting) -> Self {
        Self {
            target,
            full_range,
            setting,
            state: ZoomState::Idle,
            buffer: SeriesBuffer::new(),
            resolution: None,
            snapshot: None,
            generation: 0,
        }
    }

    fn issue(
        &mut self,
        gesture: Gesture,
        range: TimeRange,
        setting: &ResolutionSetting,
    ) -> ChartResult<PendingQuery> {
        let resolution = select_resolution(&range, setting);
        let descriptor = build_query(&self.target, &range, resolution)?;
        self.generation += 1;
        let pending = PendingQuery {
            generation: self.generation,
            request_id: Uuid::new_v4(),
            gesture,
            descriptor,
        };
        debug!(
            "Issued {:?} as generation {} ({}) at {}",
            pending.gesture, pending.generation, pending.request_id, resolution
        );
        Ok(pending)
    }

    /// Full-range query at the current setting.
    pub fn begin_load(&mut self) -> ChartResult<PendingQuery> {
        let setting = self.setting;
        self.issue(Gesture::Load, self.full_range, &setting)
    }

    /// Zoom into `[min, max]` at the current setting. A zero-width selection
    /// is a click, not a zoom, and issues nothing.
    pub fn begin_drag_select(&mut self, min: u64, max: u64) -> ChartResult<Option<PendingQuery>> {
        if min == max {
            debug!("Ignoring zero-width selection at {}", min);
            return Ok(None);
        }
        let (min, max) = if min < max { (min, max) } else { (max, min) };
        let setting = self.setting;
        self.issue(Gesture::DragSelect { min, max }, TimeRange::new(min, max), &setting)
            .map(Some)
    }

    /// Re-query the visible range (the zoom window if zoomed, otherwise the
    /// full range) at `setting`.
    pub fn begin_resolution_change(
        &mut self,
        setting: ResolutionSetting,
    ) -> ChartResult<PendingQuery> {
        let range = match self.state.window() {
            Some((min, max)) => TimeRange::new(min, max),
            None => self.full_range,
        };
        self.issue(Gesture::ResolutionChange(setting), range, &setting)
    }

    /// Applies the response to `pending`, unless a newer gesture has been
    /// issued since. Transport errors are returned unchanged and leave the
    /// controller untouched.
    pub fn complete(
        &mut self,
        pending: PendingQuery,
        result: ChartResult<Vec<SeriesRow>>,
    ) -> ChartResult<Outcome> {
        if pending.generation != self.generation {
            debug!(
                "Discarding stale response {} (generation {}, current {})",
                pending.request_id, pending.generation, self.generation
            );
            return Ok(Outcome::Stale);
        }

        let rows = match result {
            Ok(rows) => rows,
            Err(e) => {
                warn!(
                    "Query {} for {} failed: {}",
                    pending.request_id, pending.descriptor.table, e
                );
                return Err(e);
            }
        };

        let descriptor = pending.descriptor;
        match pending.gesture {
            Gesture::Load => {
                self.buffer.replace_all(&descriptor.fields, &rows);
                self.state = ZoomState::Idle;
                self.snapshot = None;
            }
            Gesture::DragSelect { min, max } => {
                if self.state == ZoomState::Idle {
                    self.snapshot = Some(Snapshot {
                        buffer: self.buffer.clone(),
                        resolution: self.resolution,
                    });
                }
                self.buffer.replace_window(&descriptor.fields, &rows, (min, max));
                self.state = ZoomState::Zoomed { min, max };
                info!("Zoomed {} to [{}, {}]", descriptor.table, min, max);
            }
            Gesture::ResolutionChange(setting) => {
                self.setting = setting;
                match self.state {
                    ZoomState::Zoomed { min, max } => {
                        self.buffer.replace_window(&descriptor.fields, &rows, (min, max))
                    }
                    ZoomState::Idle => self.buffer.replace_all(&descriptor.fields, &rows),
                }
            }
        }
        self.resolution = Some(descriptor.resolution);
        Ok(Outcome::Applied)
    }

    /// Restores the pre-zoom view from the cached snapshot without querying.
    /// Returns false when there was nothing to reset.
    pub fn double_click(&mut self) -> bool {
        if self.state == ZoomState::Idle {
            return false;
        }
        if let Some(snapshot) = self.snapshot.take() {
            self.buffer = snapshot.buffer;
            self.resolution = snapshot.resolution;
        }
        self.state = ZoomState::Idle;
        // in-flight zoom responses must not land on the restored view
        self.generation += 1;
        info!("Reset zoom on {}", self.target.table);
        true
    }

    /// Switches the chart to another sensor or field selection. The view
    /// drops back to idle and needs a fresh load.
    pub fn retarget(&mut self, target: QueryTarget, full_range: TimeRange) {
        self.target = target;
        self.full_range = full_range;
        self.state = ZoomState::Idle;
        self.snapshot = None;
        self.buffer.clear();
        self.resolution = None;
        self.generation += 1;
    }

    pub async fn load<S>(&mut self, source: &S) -> ChartResult<Outcome>
    where
        S: SeriesSource + ?Sized,
    {
        let pending = self.begin_load()?;
        let result = run_query(source, pending.descriptor()).await;
        self.complete(pending, result)
    }

    /// Returns `Ok(None)` for a zero-width selection.
    pub async fn drag_select<S>(
        &mut self,
        source: &S,
        min: u64,
        max: u64,
    ) -> ChartResult<Option<Outcome>>
    where
        S: SeriesSource + ?Sized,
    {
        let Some(pending) = self.begin_drag_select(min, max)? else {
            return Ok(None);
        };
        let result = run_query(source, pending.descriptor()).await;
        self.complete(pending, result).map(Some)
    }

    pub async fn change_resolution<S>(
        &mut self,
        source: &S,
        setting: ResolutionSetting,
    ) -> ChartResult<Outcome>
    where
        S: SeriesSource + ?Sized,
    {
        let pending = self.begin_resolution_change(setting)?;
        let result = run_query(source, pending.descriptor()).await;
        self.complete(pending, result)
    }

    pub fn state(&self) -> ZoomState {
        self.state
    }

    /// Forced x-axis range, present while zoomed.
    pub fn axis_scale(&self) -> Option<(u64, u64)> {
        self.state.window()
    }

    pub fn setting(&self) -> ResolutionSetting {
        self.setting
    }

    /// Resolution of the data currently in the buffer.
    pub fn resolution(&self) -> Option<Resolution> {
        self.resolution
    }

    pub fn target(&self) -> &QueryTarget {
        &self.target
    }

    pub fn full_range(&self) -> TimeRange {
        self.full_range
    }

    pub fn buffer(&self) -> &SeriesBuffer {
        &self.buffer
    }

    pub fn chart_arrays(&self) -> ChartArrays {
        self.buffer.to_chart_arrays()
    }

    pub fn options(&self, title: &str) -> ChartOptions {
        ChartOptions::build(title, self)
    }
}
