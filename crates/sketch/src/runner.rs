//! The sketch runner: owns the uniform state and drives one draw per frame.
//!
//! A runner is generic over three seams:
//!
//! * [`GraphicsContext`] compiles the program, holds the quad and draws.
//! * [`FrameScheduler`] delivers "next refresh" callbacks.
//! * [`UpdateHook`] layers user uniforms on top of the base update.
//!
//! Every frame runs the same sequence: match the drawable to its displayed
//! size, run the base update (`u_time`, `u_resolution`) followed by the hook,
//! set the viewport, issue one draw of the quad and request the next frame.

use anyhow::{Context, Result};
use tracing::{debug, trace, warn};

use crate::compile::declared_uniforms;
use crate::geometry::{QuadGeometry, FULLSCREEN_QUAD};
use crate::pointer::{normalized_mouse_position, DisplaySize, PointerEvent};
use crate::scheduler::{FrameHandle, FrameScheduler};
use crate::types::{ShaderSources, SurfaceSize, Viewport};
use crate::uniforms::{UniformLayout, UniformSet, U_RESOLUTION};

/// Everything a single draw needs.
pub struct DrawCall<'a, P, Q> {
    pub viewport: Viewport,
    pub program: &'a P,
    pub geometry: &'a Q,
    pub uniforms: &'a UniformSet,
}

/// GPU capabilities the runner relies on.
pub trait GraphicsContext {
    type Program;
    type Geometry;

    /// Compiles and links the pair. The layout lists every uniform the program
    /// will receive, in block order.
    fn compile_program(
        &mut self,
        sources: &ShaderSources,
        layout: &UniformLayout,
    ) -> Result<Self::Program>;

    fn upload_geometry(&mut self, quad: &QuadGeometry) -> Result<Self::Geometry>;

    /// Resizes the drawable to its displayed size. Returns true when it changed.
    fn resize_to_display(&mut self) -> bool;

    /// Current drawable size in physical pixels.
    fn surface_size(&self) -> SurfaceSize;

    /// Size at which the surface is displayed, used to normalise pointer offsets.
    fn display_size(&self) -> DisplaySize;

    fn draw(&mut self, call: DrawCall<'_, Self::Program, Self::Geometry>) -> Result<()>;
}

/// Per-frame extension point, invoked after the base update.
pub trait UpdateHook {
    /// Called once before the program is compiled. Uniforms added here become
    /// part of the uniform block.
    fn init(&mut self, _uniforms: &mut UniformSet) {}

    fn update(&mut self, time_ms: f64, uniforms: &mut UniformSet);
}

/// Hook that adds nothing to the base update.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoHook;

impl UpdateHook for NoHook {
    fn update(&mut self, _time_ms: f64, _uniforms: &mut UniformSet) {}
}

impl<F> UpdateHook for F
where
    F: FnMut(f64, &mut UniformSet),
{
    fn update(&mut self, time_ms: f64, uniforms: &mut UniformSet) {
        self(time_ms, uniforms)
    }
}

/// What happened to a delivered frame callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    Rendered,
    /// The handle was not the pending one, e.g. delivered after `stop`.
    Skipped,
}

pub struct SketchRunner<G: GraphicsContext, S, H> {
    context: G,
    scheduler: S,
    hook: H,
    program: G::Program,
    geometry: G::Geometry,
    layout: UniformLayout,
    uniforms: UniformSet,
    pending: Option<FrameHandle>,
    frames_rendered: u64,
    warned_skipped: bool,
}

impl<G, S, H> SketchRunner<G, S, H>
where
    G: GraphicsContext,
    S: FrameScheduler,
    H: UpdateHook,
{
    /// Builds the default uniform set from the current surface size, lets the
    /// hook declare its uniforms, then compiles the program and uploads the
    /// quad. Plain uniforms the shaders declare but nobody set start at zero.
    /// Nothing is scheduled until [`start`](Self::start).
    pub fn new(mut context: G, sources: &ShaderSources, scheduler: S, mut hook: H) -> Result<Self> {
        let mut uniforms = UniformSet::new(context.surface_size());
        hook.init(&mut uniforms);
        for (name, kind) in declared_uniforms(sources) {
            if !uniforms.contains(&name) {
                debug!(uniform = %name, kind = kind.glsl_type(), "shader uniform starts at zero");
                uniforms.set(name, kind.zero());
            }
        }
        let layout = UniformLayout::from_set(&uniforms)?;

        let program = context
            .compile_program(sources, &layout)
            .context("failed to build sketch program")?;
        let geometry = context
            .upload_geometry(&FULLSCREEN_QUAD)
            .context("failed to upload fullscreen quad")?;

        debug!(
            uniforms = layout.slots().len(),
            block_size = layout.size(),
            surface = %context.surface_size(),
            "sketch program ready"
        );

        Ok(Self {
            context,
            scheduler,
            hook,
            program,
            geometry,
            layout,
            uniforms,
            pending: None,
            frames_rendered: 0,
            warned_skipped: false,
        })
    }

    /// Schedules the first frame. Does nothing while already running.
    pub fn start(&mut self) {
        if self.pending.is_some() {
            trace!("start ignored; frame already pending");
            return;
        }
        let handle = self.scheduler.request_frame();
        debug!(frame = handle.id(), "sketch loop started");
        self.pending = Some(handle);
    }

    /// Cancels the pending frame, if any.
    pub fn stop(&mut self) {
        if let Some(handle) = self.pending.take() {
            self.scheduler.cancel_frame(handle);
            debug!(frame = handle.id(), "sketch loop stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.pending.is_some()
    }

    /// Base update followed by the hook.
    pub fn update(&mut self, time_ms: f64) {
        self.uniforms
            .apply_frame(time_ms, self.context.surface_size());
        self.hook.update(time_ms, &mut self.uniforms);
    }

    /// Normalises a pointer offset against the surface's displayed size.
    pub fn normalized_mouse_position(&self, event: PointerEvent) -> [f32; 2] {
        normalized_mouse_position(event, self.context.display_size())
    }

    /// Merges a pointer move into `u_mouse`.
    ///
    /// Offsets against a zero-sized surface have no meaningful position and
    /// leave `u_mouse` untouched.
    pub fn pointer_moved(&mut self, event: PointerEvent) {
        let position = self.normalized_mouse_position(event);
        if position.iter().all(|v| v.is_finite()) {
            self.uniforms.merge_mouse(position);
        }
    }

    /// Renders the frame for `handle` and schedules the next one.
    ///
    /// Handles other than the pending one are ignored. A failed draw leaves the
    /// loop stopped.
    pub fn run_frame(&mut self, handle: FrameHandle, time_ms: f64) -> Result<FrameOutcome> {
        if self.pending != Some(handle) {
            trace!(frame = handle.id(), "ignoring stale frame callback");
            return Ok(FrameOutcome::Skipped);
        }
        self.pending = None;

        self.render(time_ms)
            .with_context(|| format!("frame {} failed to render", handle.id()))?;

        self.pending = Some(self.scheduler.request_frame());
        Ok(FrameOutcome::Rendered)
    }

    /// Runs every frame callback the scheduler has made ready. Returns the
    /// number of frames rendered.
    pub fn tick(&mut self, time_ms: f64) -> Result<usize> {
        let mut rendered = 0;
        for handle in self.scheduler.take_ready() {
            if self.run_frame(handle, time_ms)? == FrameOutcome::Rendered {
                rendered += 1;
            }
        }
        Ok(rendered)
    }

    /// Repaints without advancing the loop: time and hook uniforms keep their
    /// values, only `u_resolution` follows a resize. Not counted as a frame.
    pub fn redraw(&mut self) -> Result<()> {
        if self.sync_surface() {
            self.uniforms
                .set(U_RESOLUTION, self.context.surface_size().as_vec2());
        }
        self.draw_current().context("failed to redraw paused sketch")
    }

    fn render(&mut self, time_ms: f64) -> Result<()> {
        self.sync_surface();
        self.update(time_ms);
        self.warn_unbound_uniforms();
        self.draw_current()?;

        self.frames_rendered += 1;
        trace!(frame = self.frames_rendered, time_ms, "frame drawn");
        Ok(())
    }

    fn sync_surface(&mut self) -> bool {
        let resized = self.context.resize_to_display();
        if resized {
            debug!(surface = %self.context.surface_size(), "surface resized");
        }
        resized
    }

    fn draw_current(&mut self) -> Result<()> {
        let viewport = Viewport::full(self.context.surface_size());
        self.context.draw(DrawCall {
            viewport,
            program: &self.program,
            geometry: &self.geometry,
            uniforms: &self.uniforms,
        })
    }

    fn warn_unbound_uniforms(&mut self) {
        if self.warned_skipped {
            return;
        }
        let unbound: Vec<&str> = self
            .uniforms
            .iter()
            .filter(|(name, value)| {
                self.layout
                    .slot(name)
                    .map_or(true, |slot| slot.kind != value.kind())
            })
            .map(|(name, _)| name)
            .collect();
        if !unbound.is_empty() {
            warn!(
                uniforms = ?unbound,
                "uniforms not declared before compilation are ignored"
            );
            self.warned_skipped = true;
        }
    }

    pub fn uniforms(&self) -> &UniformSet {
        &self.uniforms
    }

    pub fn uniforms_mut(&mut self) -> &mut UniformSet {
        &mut self.uniforms
    }

    pub fn layout(&self) -> &UniformLayout {
        &self.layout
    }

    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered
    }

    pub fn context(&self) -> &G {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut G {
        &mut self.context
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut S {
        &mut self.scheduler
    }
}
