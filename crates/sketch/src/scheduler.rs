//! Frame scheduling seam.
//!
//! The runner never talks to a display directly; it asks a [`FrameScheduler`]
//! for "one callback at the next refresh" and later receives the handle back
//! through [`FrameScheduler::take_ready`]. The window host implements this on
//! top of `winit` redraw requests, tests use [`ManualScheduler`].

use std::time::Instant;

/// Opaque identifier of a scheduled frame callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameHandle(u64);

impl FrameHandle {
    pub fn id(&self) -> u64 {
        self.0
    }
}

/// Platform primitive for one-shot frame callbacks.
pub trait FrameScheduler {
    /// Requests a callback at the next display refresh.
    fn request_frame(&mut self) -> FrameHandle;
    /// Cancels a pending request. Unknown or already fired handles are ignored.
    fn cancel_frame(&mut self, handle: FrameHandle);
    /// Drains the requests whose refresh has arrived, oldest first.
    fn take_ready(&mut self) -> Vec<FrameHandle>;
}

/// Bookkeeping shared by scheduler implementations.
#[derive(Debug, Default)]
pub struct FrameQueue {
    next_id: u64,
    pending: Vec<FrameHandle>,
    ready: Vec<FrameHandle>,
}

impl FrameQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&mut self) -> FrameHandle {
        self.next_id = self.next_id.wrapping_add(1);
        let handle = FrameHandle(self.next_id);
        self.pending.push(handle);
        handle
    }

    pub fn cancel(&mut self, handle: FrameHandle) {
        self.pending.retain(|pending| *pending != handle);
        self.ready.retain(|ready| *ready != handle);
    }

    /// Moves every pending request to the ready list.
    pub fn fire(&mut self) -> usize {
        let fired = self.pending.len();
        self.ready.append(&mut self.pending);
        fired
    }

    pub fn take_ready(&mut self) -> Vec<FrameHandle> {
        std::mem::take(&mut self.ready)
    }

    pub fn pending(&self) -> &[FrameHandle] {
        &self.pending
    }
}

/// Scheduler whose refreshes are triggered explicitly through [`fire`](Self::fire).
#[derive(Debug, Default)]
pub struct ManualScheduler {
    queue: FrameQueue,
    cancelled: usize,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulates a display refresh; returns how many callbacks became ready.
    pub fn fire(&mut self) -> usize {
        self.queue.fire()
    }

    pub fn pending(&self) -> &[FrameHandle] {
        self.queue.pending()
    }

    /// Number of `cancel_frame` calls received so far.
    pub fn cancelled(&self) -> usize {
        self.cancelled
    }
}

impl FrameScheduler for ManualScheduler {
    fn request_frame(&mut self) -> FrameHandle {
        self.queue.request()
    }

    fn cancel_frame(&mut self, handle: FrameHandle) {
        self.cancelled += 1;
        self.queue.cancel(handle);
    }

    fn take_ready(&mut self) -> Vec<FrameHandle> {
        self.queue.take_ready()
    }
}

/// Milliseconds elapsed since a fixed time origin; the timestamp handed to frames.
#[derive(Debug, Clone, Copy)]
pub struct FrameClock {
    origin: Instant,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::with_origin(Instant::now())
    }

    pub fn with_origin(origin: Instant) -> Self {
        Self { origin }
    }

    pub fn now_ms(&self) -> f64 {
        self.ms_at(Instant::now())
    }

    pub fn ms_at(&self, now: Instant) -> f64 {
        now.saturating_duration_since(self.origin).as_secs_f64() * 1000.0
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}
