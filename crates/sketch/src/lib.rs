//! Full-canvas shader sketches.
//!
//! A sketch is a vertex/fragment GLSL pair drawn over one two-triangle quad
//! that covers the whole surface. The crate keeps the per-frame plumbing in one
//! place so a sketch only has to provide shaders and, optionally, an update
//! hook for extra uniforms:
//!
//! ```text
//!   run_window ──▶ WindowScheduler ──(RedrawRequested)──▶ SketchRunner::tick
//!                                                              │
//!        resize_to_display ◀── render ──▶ base update ──▶ UpdateHook::update
//!                                   │
//!                                   └─▶ GraphicsContext::draw (6 vertices)
//! ```
//!
//! Every sketch receives `u_time` (seconds), `u_resolution` (drawable size in
//! pixels) and `u_mouse` (pointer position as a fraction of the displayed
//! surface, top-left origin, unclamped). [`SketchRunner`] is generic over the
//! graphics backend and the frame scheduler, so the loop can be driven by
//! [`ManualScheduler`] and a recording context in tests; [`GpuState`] and
//! [`run_window`] provide the `wgpu`/`winit` implementation.

pub mod compile;
mod error;
mod geometry;
pub mod gpu;
mod pointer;
pub mod runner;
pub mod scheduler;
mod types;
pub mod uniforms;
mod window;

pub use error::SketchError;
pub use geometry::{QuadGeometry, FULLSCREEN_QUAD};
pub use gpu::{DisplayTarget, GpuState};
pub use pointer::{normalized_mouse_position, DisplaySize, PointerEvent};
pub use runner::{DrawCall, FrameOutcome, GraphicsContext, NoHook, SketchRunner, UpdateHook};
pub use scheduler::{FrameClock, FrameHandle, FrameQueue, FrameScheduler, ManualScheduler};
pub use types::{
    Antialiasing, ShaderSources, ShaderStageKind, SurfaceSize, Viewport, WindowOptions,
};
pub use uniforms::{UniformKind, UniformLayout, UniformSet, UniformValue, U_MOUSE, U_RESOLUTION, U_TIME};
pub use window::{run_window, WindowScheduler};
