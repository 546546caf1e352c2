use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use tracing::{debug, error, info};
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, Event, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::keyboard::{Key, NamedKey};
use winit::window::{Window, WindowBuilder};

use crate::gpu::{DisplayTarget, GpuState};
use crate::pointer::PointerEvent;
use crate::runner::{GraphicsContext, SketchRunner, UpdateHook};
use crate::scheduler::{FrameClock, FrameHandle, FrameQueue, FrameScheduler};
use crate::types::{ShaderSources, SurfaceSize, WindowOptions};

impl<W: DisplayTarget> DisplayTarget for Arc<W> {
    fn inner_size(&self) -> SurfaceSize {
        self.as_ref().inner_size()
    }

    fn scale_factor(&self) -> f64 {
        self.as_ref().scale_factor()
    }
}

/// Frame scheduler backed by `winit` redraw requests.
///
/// Every request asks the window for a redraw; [`fire`](Self::fire) is called
/// when `RedrawRequested` arrives.
pub struct WindowScheduler {
    window: Arc<Window>,
    queue: FrameQueue,
}

impl WindowScheduler {
    pub fn new(window: Arc<Window>) -> Self {
        Self {
            window,
            queue: FrameQueue::new(),
        }
    }

    pub fn fire(&mut self) -> usize {
        self.queue.fire()
    }
}

impl FrameScheduler for WindowScheduler {
    fn request_frame(&mut self) -> FrameHandle {
        let handle = self.queue.request();
        self.window.request_redraw();
        handle
    }

    fn cancel_frame(&mut self, handle: FrameHandle) {
        self.queue.cancel(handle);
    }

    fn take_ready(&mut self) -> Vec<FrameHandle> {
        self.queue.take_ready()
    }
}

type WindowRunner<H> = SketchRunner<GpuState<Arc<Window>>, WindowScheduler, H>;

/// Opens a window, starts the sketch loop and blocks until the window closes.
///
/// Space pauses and resumes the loop; Escape closes the window. While paused,
/// redraws the system asks for repaint the last uniforms.
pub fn run_window<H: UpdateHook>(
    options: &WindowOptions,
    sources: &ShaderSources,
    hook: H,
) -> Result<()> {
    let event_loop = EventLoop::new().map_err(|err| anyhow!("failed to create event loop: {err}"))?;
    let window = WindowBuilder::new()
        .with_title(options.title.as_str())
        .with_inner_size(PhysicalSize::new(options.size.0, options.size.1))
        .build(&event_loop)
        .map_err(|err| anyhow!("failed to create sketch window: {err}"))?;
    let window = Arc::new(window);

    let gpu = GpuState::new(window.clone(), options.antialiasing, options.vsync)
        .context("failed to initialise GPU for sketch window")?;
    let scheduler = WindowScheduler::new(window.clone());
    let mut runner: WindowRunner<H> = SketchRunner::new(gpu, sources, scheduler, hook)?;

    info!(
        title = %options.title,
        size = %runner.context().surface_size(),
        sample_count = runner.context().sample_count(),
        vsync = options.vsync,
        "sketch window ready"
    );

    let clock = FrameClock::new();
    runner.start();

    let mut failure: Option<anyhow::Error> = None;
    let run_result = event_loop.run(|event, elwt| {
        elwt.set_control_flow(ControlFlow::Wait);
        let Event::WindowEvent { window_id, event } = event else {
            return;
        };
        if window_id != window.id() {
            return;
        }

        match event {
            WindowEvent::CloseRequested | WindowEvent::Destroyed => elwt.exit(),
            WindowEvent::KeyboardInput { event, .. } => {
                if event.state != ElementState::Pressed || event.repeat {
                    return;
                }
                match event.logical_key {
                    Key::Named(NamedKey::Escape) => elwt.exit(),
                    Key::Named(NamedKey::Space) => toggle_running(&mut runner),
                    _ => {}
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                let logical = position.to_logical::<f64>(window.scale_factor());
                runner.pointer_moved(PointerEvent::new(logical.x, logical.y));
            }
            WindowEvent::RedrawRequested => {
                let result = if runner.is_running() {
                    runner.scheduler_mut().fire();
                    runner.tick(clock.now_ms()).map(|_| ())
                } else {
                    runner.redraw()
                };
                if let Err(err) = result {
                    error!("sketch loop stopped: {err:?}");
                    failure = Some(err);
                    elwt.exit();
                }
            }
            _ => {}
        }
    });

    runner.stop();
    debug!(frames = runner.frames_rendered(), "sketch window closed");

    if let Some(err) = failure {
        return Err(err);
    }
    run_result.map_err(|err| anyhow!("window event loop error: {err}"))
}

fn toggle_running<H: UpdateHook>(runner: &mut WindowRunner<H>) {
    if runner.is_running() {
        runner.stop();
        info!("sketch paused");
    } else {
        runner.start();
        info!("sketch resumed");
    }
}
