use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use tracing::{debug, warn};

use crate::compile::adapt_sources;
use crate::geometry::QuadGeometry;
use crate::pointer::DisplaySize;
use crate::runner::{DrawCall, GraphicsContext};
use crate::types::{Antialiasing, ShaderSources, SurfaceSize};
use crate::uniforms::UniformLayout;

use super::context::GpuContext;
use super::pipeline::{QuadBuffer, SketchPipeline};

/// A window-like object a surface can be created for.
pub trait DisplayTarget: HasDisplayHandle + HasWindowHandle {
    /// Drawable size in physical pixels.
    fn inner_size(&self) -> SurfaceSize;

    /// Physical pixels per logical unit.
    fn scale_factor(&self) -> f64;
}

impl DisplayTarget for winit::window::Window {
    fn inner_size(&self) -> SurfaceSize {
        winit::window::Window::inner_size(self).into()
    }

    fn scale_factor(&self) -> f64 {
        winit::window::Window::scale_factor(self)
    }
}

struct MultisampleTarget {
    _texture: wgpu::Texture,
    view: wgpu::TextureView,
}

impl MultisampleTarget {
    fn new(
        device: &wgpu::Device,
        format: wgpu::TextureFormat,
        size: SurfaceSize,
        sample_count: u32,
    ) -> Self {
        let extent = wgpu::Extent3d {
            width: size.width.max(1),
            height: size.height.max(1),
            depth_or_array_layers: 1,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("msaa color target"),
            size: extent,
            mip_level_count: 1,
            sample_count,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            _texture: texture,
            view,
        }
    }
}

/// Presented-frame counter, reported once per second at debug level.
struct FrameStats {
    last_report: Instant,
    frames_since_report: u32,
    frames_per_second: f32,
}

impl FrameStats {
    fn new(now: Instant) -> Self {
        Self {
            last_report: now,
            frames_since_report: 0,
            frames_per_second: 0.0,
        }
    }

    fn record(&mut self, now: Instant) -> Option<f32> {
        self.frames_since_report += 1;
        let elapsed = now.saturating_duration_since(self.last_report);
        if elapsed < Duration::from_secs(1) {
            return None;
        }
        self.frames_per_second = self.frames_since_report as f32 / elapsed.as_secs_f32();
        self.frames_since_report = 0;
        self.last_report = now;
        Some(self.frames_per_second)
    }
}

/// `wgpu` implementation of [`GraphicsContext`] bound to one display target.
pub struct GpuState<T: DisplayTarget> {
    // Declared before `target` so the surface is dropped first.
    context: GpuContext,
    multisample_target: Option<MultisampleTarget>,
    stats: FrameStats,
    target: T,
}

impl<T: DisplayTarget> GpuState<T> {
    pub fn new(target: T, antialiasing: Antialiasing, vsync: bool) -> Result<Self> {
        let context = GpuContext::new(&target, target.inner_size(), antialiasing, vsync)?;
        let multisample_target = Self::multisample_for(&context);
        debug!(
            size = %context.size,
            format = ?context.surface_format,
            sample_count = context.sample_count,
            "gpu state ready"
        );
        Ok(Self {
            context,
            multisample_target,
            stats: FrameStats::new(Instant::now()),
            target,
        })
    }

    pub fn sample_count(&self) -> u32 {
        self.context.sample_count
    }

    fn multisample_for(context: &GpuContext) -> Option<MultisampleTarget> {
        (context.sample_count > 1).then(|| {
            MultisampleTarget::new(
                &context.device,
                context.surface_format,
                context.size,
                context.sample_count,
            )
        })
    }
}

impl<T: DisplayTarget> GraphicsContext for GpuState<T> {
    type Program = SketchPipeline;
    type Geometry = QuadBuffer;

    fn compile_program(
        &mut self,
        sources: &ShaderSources,
        layout: &UniformLayout,
    ) -> Result<SketchPipeline> {
        let adapted = adapt_sources(sources, layout)?;
        SketchPipeline::new(
            &self.context.device,
            &adapted,
            layout,
            self.context.surface_format,
            self.context.sample_count,
            QuadGeometry::default().stride(),
        )
    }

    fn upload_geometry(&mut self, quad: &QuadGeometry) -> Result<QuadBuffer> {
        Ok(QuadBuffer::new(&self.context.device, quad))
    }

    fn resize_to_display(&mut self) -> bool {
        let displayed = self.target.inner_size();
        if !self.context.resize(displayed) {
            return false;
        }
        self.multisample_target = Self::multisample_for(&self.context);
        true
    }

    fn surface_size(&self) -> SurfaceSize {
        self.context.size
    }

    fn display_size(&self) -> DisplaySize {
        let scale = self.target.scale_factor();
        let physical = self.target.inner_size();
        DisplaySize::new(
            physical.width as f64 / scale,
            physical.height as f64 / scale,
        )
    }

    fn draw(&mut self, call: DrawCall<'_, SketchPipeline, QuadBuffer>) -> Result<()> {
        let packed = call.program.layout().pack(call.uniforms);
        self.context
            .queue
            .write_buffer(&call.program.uniform_buffer, 0, &packed.bytes);

        let frame = match self.context.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                warn!("surface lost or outdated; reconfiguring and skipping frame");
                self.context.reconfigure();
                return Ok(());
            }
            Err(wgpu::SurfaceError::Timeout) => {
                debug!("timed out acquiring surface texture; skipping frame");
                return Ok(());
            }
            Err(err) => return Err(anyhow!("failed to acquire surface texture: {err}")),
        };

        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder =
            self.context
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("sketch encoder"),
                });

        {
            let (attachment_view, resolve_target) =
                if let Some(msaa) = self.multisample_target.as_ref() {
                    (&msaa.view, Some(&view))
                } else {
                    (&view, None)
                };
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("sketch pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: attachment_view,
                    depth_slice: None,
                    resolve_target,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            let viewport = call.viewport;
            render_pass.set_viewport(
                viewport.x,
                viewport.y,
                viewport.width,
                viewport.height,
                0.0,
                1.0,
            );
            render_pass.set_pipeline(&call.program.pipeline);
            render_pass.set_bind_group(0, &call.program.uniform_bind_group, &[]);
            render_pass.set_vertex_buffer(0, call.geometry.buffer.slice(..));
            render_pass.draw(0..call.geometry.vertex_count(), 0..1);
        }

        self.context.queue.submit(std::iter::once(encoder.finish()));
        frame.present();

        if let Some(fps) = self.stats.record(Instant::now()) {
            debug!(
                fps = fps.round(),
                time = call.uniforms.time(),
                size = %self.context.size,
                "render stats"
            );
        }
        Ok(())
    }
}
