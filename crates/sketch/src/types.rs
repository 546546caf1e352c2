use std::fmt;

use winit::dpi::PhysicalSize;

/// Drawable size of the surface in physical pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceSize {
    pub width: u32,
    pub height: u32,
}

impl SurfaceSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// The `[width, height]` pair as uploaded to `u_resolution`.
    pub fn as_vec2(&self) -> [f32; 2] {
        [self.width as f32, self.height as f32]
    }
}

impl From<PhysicalSize<u32>> for SurfaceSize {
    fn from(value: PhysicalSize<u32>) -> Self {
        Self::new(value.width, value.height)
    }
}

impl fmt::Display for SurfaceSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Region of the surface covered by the single draw call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    /// Covers the whole surface, mirroring `viewport(0, 0, width, height)`.
    pub fn full(surface: SurfaceSize) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: surface.width as f32,
            height: surface.height as f32,
        }
    }
}

/// The vertex/fragment pair a sketch is built from.
///
/// Both are raw GLSL source strings in the WebGL2 dialect; they are opaque to
/// the runner and adapted for the GPU backend just before compilation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderSources {
    pub fragment: String,
    pub vertex: String,
}

impl ShaderSources {
    pub fn new(fragment: impl Into<String>, vertex: impl Into<String>) -> Self {
        Self {
            fragment: fragment.into(),
            vertex: vertex.into(),
        }
    }
}

/// Shader stage, used to label compile diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderStageKind {
    Vertex,
    Fragment,
}

impl fmt::Display for ShaderStageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderStageKind::Vertex => f.write_str("vertex"),
            ShaderStageKind::Fragment => f.write_str("fragment"),
        }
    }
}

/// Anti-aliasing policy for the render pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Antialiasing {
    /// Pick the highest sample count supported by the surface format.
    Auto,
    /// Disable MSAA and render directly into the swapchain.
    Off,
    /// Request a specific MSAA sample count (clamped to what the device supports).
    Samples(u32),
}

impl Default for Antialiasing {
    fn default() -> Self {
        Self::Auto
    }
}

/// Settings for the interactive sketch window.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowOptions {
    /// Window title.
    pub title: String,
    /// Initial inner size in physical pixels.
    pub size: (u32, u32),
    /// Anti-aliasing mode requested by the caller.
    pub antialiasing: Antialiasing,
    /// Present with vsync (Fifo) when true, prefer Immediate/Mailbox otherwise.
    pub vsync: bool,
}

impl Default for WindowOptions {
    fn default() -> Self {
        Self {
            title: "Shader Sketch".to_string(),
            size: (1280, 720),
            antialiasing: Antialiasing::default(),
            vsync: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_viewport_covers_surface() {
        let viewport = Viewport::full(SurfaceSize::new(640, 360));
        assert_eq!(viewport.x, 0.0);
        assert_eq!(viewport.y, 0.0);
        assert_eq!(viewport.width, 640.0);
        assert_eq!(viewport.height, 360.0);
    }

    #[test]
    fn surface_size_displays_as_dimensions() {
        assert_eq!(SurfaceSize::new(1920, 1080).to_string(), "1920x1080");
        assert_eq!(SurfaceSize::new(3, 2).as_vec2(), [3.0, 2.0]);
    }
}
