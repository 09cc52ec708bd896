//! Stroke continuity for remote and local drawing
//!
//! Remote points arrive in chunks flushed on a fixed cadence, so a chunk can
//! be a single point, can start far from where the previous one ended, or can
//! be missing entirely. Each remote sender gets a tiny state machine: idle
//! (no carry point) or in-stroke (carry = last rendered point). While
//! in-stroke, the next chunk is stitched onto the carry point and densified
//! so no rendered segment is longer than the step.

use std::collections::HashMap;
use uuid::Uuid;

use crate::messages::{Entry, Operation, Point, Style};

/// Longest segment rendered between two remote samples, in canvas units
pub const DEFAULT_DENSIFY_STEP: f64 = 2.0;

/// Upper bound on points inserted between two samples
pub const MAX_SEGMENT_STEPS: usize = 4096;

/// Canvas primitives the reconstructor draws with
pub trait Renderer {
    fn line(&mut self, from: Point, to: Point, style: &Style);
    fn dot(&mut self, at: Point, style: &Style);
}

/// Whether a chunk paints or erases
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkKind {
    Stroke,
    Erase,
}

/// Build the path `anchor, p0, p1, ...` with evenly spaced points inserted
/// wherever two consecutive points are more than `step` apart. Very long
/// segments get at most [`MAX_SEGMENT_STEPS`] pieces.
pub fn densify(anchor: Option<Point>, points: &[Point], step: f64) -> Vec<Point> {
    let mut out = Vec::with_capacity(points.len() + 1);
    let mut prev = anchor;
    if let Some(anchor) = anchor {
        out.push(anchor);
    }

    for &p in points {
        if let Some(from) = prev {
            let d = from.distance(&p);
            if step > 0.0 && d > step {
                let n = (d / step).ceil().min(MAX_SEGMENT_STEPS as f64) as usize;
                for i in 1..n {
                    out.push(from.lerp(&p, i as f64 / n as f64));
                }
            }
        }
        out.push(p);
        prev = Some(p);
    }
    out
}

fn render_path(path: &[Point], style: &Style, renderer: &mut impl Renderer) {
    for pair in path.windows(2) {
        renderer.line(pair[0], pair[1], style);
    }
}

/// Render state for one remote sender
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteRenderState {
    pub carry: Option<Point>,
    pub style: Style,
}

/// Turns chunked point batches from many senders into continuous strokes
#[derive(Debug)]
pub struct StrokeContinuityReconstructor {
    remotes: HashMap<Uuid, RemoteRenderState>,
    step: f64,
}

impl Default for StrokeContinuityReconstructor {
    fn default() -> Self {
        Self::new()
    }
}

impl StrokeContinuityReconstructor {
    pub fn new() -> Self {
        Self::with_step(DEFAULT_DENSIFY_STEP)
    }

    pub fn with_step(step: f64) -> Self {
        Self {
            remotes: HashMap::new(),
            step,
        }
    }

    /// Render one chunk from `by`, stitched onto that sender's previous chunk
    pub fn apply_chunk(
        &mut self,
        by: Uuid,
        points: &[Point],
        style: &Style,
        kind: ChunkKind,
        renderer: &mut impl Renderer,
    ) {
        let style = match kind {
            ChunkKind::Stroke => style.clone(),
            ChunkKind::Erase => style.erasing(),
        };
        let state = self
            .remotes
            .entry(by)
            .or_insert_with(|| RemoteRenderState {
                carry: None,
                style: style.clone(),
            });
        state.style = style.clone();

        let path = match state.carry {
            Some(anchor) => {
                let path = densify(Some(anchor), points, self.step);
                render_path(&path, &style, renderer);
                path
            }
            None => {
                if let [only] = points {
                    renderer.dot(*only, &style);
                } else {
                    render_path(points, &style, renderer);
                }
                points.to_vec()
            }
        };

        if let Some(last) = path.last() {
            state.carry = Some(*last);
        }
    }

    /// Sender finished its stroke; its next chunk starts a new one
    pub fn end_stroke(&mut self, by: Uuid) {
        if let Some(state) = self.remotes.get_mut(&by) {
            state.carry = None;
        }
    }

    pub fn state(&self, by: Uuid) -> Option<&RemoteRenderState> {
        self.remotes.get(&by)
    }

    pub fn carry(&self, by: Uuid) -> Option<Point> {
        self.remotes.get(&by).and_then(|s| s.carry)
    }

    pub fn in_stroke_count(&self) -> usize {
        self.remotes.values().filter(|s| s.carry.is_some()).count()
    }

    /// Drop all sender state, e.g. when switching rooms
    pub fn reset(&mut self) {
        self.remotes.clear();
    }

    /// Re-render a history snapshot from scratch
    pub fn replay(entries: &[Entry], renderer: &mut impl Renderer) {
        let mut reconstructor = Self::new();
        for entry in entries {
            match &entry.op {
                Operation::Stroke { points, style } => {
                    reconstructor.apply_chunk(entry.by, points, style, ChunkKind::Stroke, renderer)
                }
                Operation::Erase { points, style } => {
                    reconstructor.apply_chunk(entry.by, points, style, ChunkKind::Erase, renderer)
                }
                Operation::StrokeEnd { .. } => reconstructor.end_stroke(entry.by),
            }
        }
    }
}

/// The user's own in-progress stroke. Local pointer samples are rendered as
/// they arrive, so no densification is needed.
#[derive(Debug, Clone)]
pub struct LocalStroke {
    points: Vec<Point>,
    style: Style,
}

impl LocalStroke {
    pub fn begin(style: Style) -> Self {
        Self {
            points: Vec::new(),
            style,
        }
    }

    /// Record a point: a dot if it is the first one, else a segment from the previous
    pub fn add_point(&mut self, p: Point, renderer: &mut impl Renderer) {
        match self.points.last() {
            Some(prev) => renderer.line(*prev, p, &self.style),
            None => renderer.dot(p, &self.style),
        }
        self.points.push(p);
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn style(&self) -> &Style {
        &self.style
    }
}
