//! `wgpu` backend for [`SketchRunner`](crate::runner::SketchRunner).

mod context;
mod pipeline;
mod state;

pub use pipeline::{QuadBuffer, SketchPipeline};
pub use state::{DisplayTarget, GpuState};
