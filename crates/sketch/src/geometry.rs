/// Fixed two-triangle mesh covering the whole surface in normalized device
/// coordinates. Created once and never mutated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuadGeometry {
    positions: [[f32; 2]; 6],
}

/// The quad every sketch draws: `(-1,-1) (1,-1) (-1,1)` and `(-1,1) (1,-1) (1,1)`.
pub const FULLSCREEN_QUAD: QuadGeometry = QuadGeometry {
    positions: [
        [-1.0, -1.0],
        [1.0, -1.0],
        [-1.0, 1.0],
        [-1.0, 1.0],
        [1.0, -1.0],
        [1.0, 1.0],
    ],
};

impl QuadGeometry {
    /// Name of the single vertex attribute, bound at location 0.
    pub const ATTRIBUTE: &'static str = "position";
    pub const ATTRIBUTE_LOCATION: u32 = 0;
    pub const COMPONENTS: usize = 2;

    pub fn positions(&self) -> &[[f32; 2]; 6] {
        &self.positions
    }

    pub fn vertex_count(&self) -> u32 {
        self.positions.len() as u32
    }

    /// Stride of one vertex in bytes.
    pub fn stride(&self) -> u64 {
        (Self::COMPONENTS * std::mem::size_of::<f32>()) as u64
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.positions)
    }
}

impl Default for QuadGeometry {
    fn default() -> Self {
        FULLSCREEN_QUAD
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quad_has_six_two_component_vertices() {
        let quad = FULLSCREEN_QUAD;
        assert_eq!(quad.vertex_count(), 6);
        assert_eq!(quad.stride(), 8);
        assert_eq!(quad.as_bytes().len(), 48);
    }

    #[test]
    fn quad_spans_all_four_corners() {
        let positions = FULLSCREEN_QUAD.positions();
        for corner in [[-1.0, -1.0], [1.0, -1.0], [-1.0, 1.0], [1.0, 1.0]] {
            assert!(positions.contains(&corner), "missing corner {corner:?}");
        }
    }

    #[test]
    fn triangles_share_the_diagonal() {
        let positions = FULLSCREEN_QUAD.positions();
        let (first, second) = positions.split_at(3);
        let shared = first.iter().filter(|v| second.contains(v)).count();
        assert_eq!(shared, 2);
    }
}
