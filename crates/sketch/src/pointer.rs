/// Pointer position relative to the surface's top-left corner, in display
/// (logical) units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    pub offset_x: f64,
    pub offset_y: f64,
}

impl PointerEvent {
    pub fn new(offset_x: f64, offset_y: f64) -> Self {
        Self { offset_x, offset_y }
    }
}

/// Size at which the surface is displayed, in logical units.
///
/// This can differ from the drawable size in physical pixels whenever the
/// scale factor is not 1.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplaySize {
    pub width: f64,
    pub height: f64,
}

impl DisplaySize {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Maps a pointer offset to fractions of the displayed surface.
///
/// Positions outside the surface are not clamped, so the result may leave
/// `[0, 1]`.
pub fn normalized_mouse_position(event: PointerEvent, display: DisplaySize) -> [f32; 2] {
    [
        (event.offset_x / display.width) as f32,
        (event.offset_y / display.height) as f32,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn centre_of_surface_maps_to_half() {
        let position =
            normalized_mouse_position(PointerEvent::new(50.0, 25.0), DisplaySize::new(100.0, 50.0));
        assert_eq!(position, [0.5, 0.5]);
    }

    #[test]
    fn positions_outside_the_surface_are_not_clamped() {
        let display = DisplaySize::new(100.0, 50.0);
        assert_eq!(
            normalized_mouse_position(PointerEvent::new(150.0, 25.0), display),
            [1.5, 0.5]
        );
        assert_eq!(
            normalized_mouse_position(PointerEvent::new(-10.0, 100.0), display),
            [-0.1, 2.0]
        );
    }

    #[test]
    fn origin_maps_to_zero() {
        let position =
            normalized_mouse_position(PointerEvent::new(0.0, 0.0), DisplaySize::new(640.0, 480.0));
        assert_eq!(position, [0.0, 0.0]);
    }
}
