use std::fmt::Write as _;

use indexmap::IndexMap;

use crate::error::SketchError;
use crate::types::SurfaceSize;

pub const U_TIME: &str = "u_time";
pub const U_RESOLUTION: &str = "u_resolution";
pub const U_MOUSE: &str = "u_mouse";

/// Binding slot of the uniform block in the adapted shaders.
pub(crate) const UNIFORM_BINDING: u32 = 0;
const BLOCK_NAME: &str = "SketchUniforms";
const INSTANCE_NAME: &str = "sketch";
const MEMBER_PREFIX: &str = "sketch_";

/// A single value handed to the shader program.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Float(f32),
    Int(i32),
    Vec2([f32; 2]),
    Vec3([f32; 3]),
    Vec4([f32; 4]),
}

impl UniformValue {
    pub fn kind(&self) -> UniformKind {
        match self {
            UniformValue::Float(_) => UniformKind::Float,
            UniformValue::Int(_) => UniformKind::Int,
            UniformValue::Vec2(_) => UniformKind::Vec2,
            UniformValue::Vec3(_) => UniformKind::Vec3,
            UniformValue::Vec4(_) => UniformKind::Vec4,
        }
    }

    fn write_to(&self, dst: &mut [u8]) {
        match self {
            UniformValue::Float(value) => dst.copy_from_slice(bytemuck::bytes_of(value)),
            UniformValue::Int(value) => dst.copy_from_slice(bytemuck::bytes_of(value)),
            UniformValue::Vec2(value) => dst.copy_from_slice(bytemuck::cast_slice(value)),
            UniformValue::Vec3(value) => dst.copy_from_slice(bytemuck::cast_slice(value)),
            UniformValue::Vec4(value) => dst.copy_from_slice(bytemuck::cast_slice(value)),
        }
    }
}

impl From<f32> for UniformValue {
    fn from(value: f32) -> Self {
        UniformValue::Float(value)
    }
}

/// Narrowed to `f32`; lets float literals and `f64` maths feed [`UniformSet::set`].
impl From<f64> for UniformValue {
    fn from(value: f64) -> Self {
        UniformValue::Float(value as f32)
    }
}

impl From<i32> for UniformValue {
    fn from(value: i32) -> Self {
        UniformValue::Int(value)
    }
}

impl From<[f32; 2]> for UniformValue {
    fn from(value: [f32; 2]) -> Self {
        UniformValue::Vec2(value)
    }
}

impl From<[f32; 3]> for UniformValue {
    fn from(value: [f32; 3]) -> Self {
        UniformValue::Vec3(value)
    }
}

impl From<[f32; 4]> for UniformValue {
    fn from(value: [f32; 4]) -> Self {
        UniformValue::Vec4(value)
    }
}

/// GLSL type of a uniform, with its std140 size and alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniformKind {
    Float,
    Int,
    Vec2,
    Vec3,
    Vec4,
}

impl UniformKind {
    pub fn size(self) -> usize {
        match self {
            UniformKind::Float | UniformKind::Int => 4,
            UniformKind::Vec2 => 8,
            UniformKind::Vec3 => 12,
            UniformKind::Vec4 => 16,
        }
    }

    pub fn align(self) -> usize {
        match self {
            UniformKind::Float | UniformKind::Int => 4,
            UniformKind::Vec2 => 8,
            UniformKind::Vec3 | UniformKind::Vec4 => 16,
        }
    }

    /// Inverse of [`glsl_type`](Self::glsl_type).
    pub fn from_glsl_type(ty: &str) -> Option<Self> {
        match ty {
            "float" => Some(UniformKind::Float),
            "int" => Some(UniformKind::Int),
            "vec2" => Some(UniformKind::Vec2),
            "vec3" => Some(UniformKind::Vec3),
            "vec4" => Some(UniformKind::Vec4),
            _ => None,
        }
    }

    pub fn zero(self) -> UniformValue {
        match self {
            UniformKind::Float => UniformValue::Float(0.0),
            UniformKind::Int => UniformValue::Int(0),
            UniformKind::Vec2 => UniformValue::Vec2([0.0; 2]),
            UniformKind::Vec3 => UniformValue::Vec3([0.0; 3]),
            UniformKind::Vec4 => UniformValue::Vec4([0.0; 4]),
        }
    }

    pub fn glsl_type(self) -> &'static str {
        match self {
            UniformKind::Float => "float",
            UniformKind::Int => "int",
            UniformKind::Vec2 => "vec2",
            UniformKind::Vec3 => "vec3",
            UniformKind::Vec4 => "vec4",
        }
    }
}

/// Named values passed to the shader program each frame.
///
/// Iteration follows insertion order, which is also the order of the members
/// in the generated uniform block.
#[derive(Debug, Clone, PartialEq)]
pub struct UniformSet {
    values: IndexMap<String, UniformValue>,
}

impl UniformSet {
    /// Builds the default set: `u_time = 0`, `u_resolution = [w, h]`, `u_mouse = [0, 0]`.
    pub fn new(surface: SurfaceSize) -> Self {
        let mut values = IndexMap::new();
        values.insert(U_TIME.to_string(), UniformValue::Float(0.0));
        values.insert(U_RESOLUTION.to_string(), UniformValue::Vec2(surface.as_vec2()));
        values.insert(U_MOUSE.to_string(), UniformValue::Vec2([0.0, 0.0]));
        Self { values }
    }

    /// Inserts or overwrites a uniform, returning the previous value.
    pub fn set(
        &mut self,
        name: impl Into<String>,
        value: impl Into<UniformValue>,
    ) -> Option<UniformValue> {
        self.values.insert(name.into(), value.into())
    }

    pub fn get(&self, name: &str) -> Option<UniformValue> {
        self.values.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn float(&self, name: &str) -> Option<f32> {
        match self.get(name)? {
            UniformValue::Float(value) => Some(value),
            _ => None,
        }
    }

    pub fn vec2(&self, name: &str) -> Option<[f32; 2]> {
        match self.get(name)? {
            UniformValue::Vec2(value) => Some(value),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, UniformValue)> + '_ {
        self.values.iter().map(|(name, value)| (name.as_str(), *value))
    }

    /// Seconds stored in `u_time`, or zero when it was replaced by another type.
    pub fn time(&self) -> f32 {
        self.float(U_TIME).unwrap_or(0.0)
    }

    pub fn resolution(&self) -> [f32; 2] {
        self.vec2(U_RESOLUTION).unwrap_or([0.0, 0.0])
    }

    pub fn mouse(&self) -> [f32; 2] {
        self.vec2(U_MOUSE).unwrap_or([0.0, 0.0])
    }

    /// Base per-frame update: time in seconds and the current surface size.
    pub fn apply_frame(&mut self, time_ms: f64, surface: SurfaceSize) {
        self.set(U_TIME, (time_ms * 0.001) as f32);
        self.set(U_RESOLUTION, surface.as_vec2());
    }

    /// Stores a normalised pointer position in `u_mouse`.
    pub fn merge_mouse(&mut self, position: [f32; 2]) {
        self.set(U_MOUSE, position);
    }
}

/// Position of one uniform inside the std140 block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniformSlot {
    pub name: String,
    pub kind: UniformKind,
    pub offset: usize,
}

/// std140 layout of the uniform block, frozen when the program is compiled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniformLayout {
    slots: Vec<UniformSlot>,
    size: usize,
}

/// Bytes ready for upload plus the names that could not be bound.
#[derive(Debug, Clone, PartialEq)]
pub struct PackedUniforms {
    pub bytes: Vec<u8>,
    pub skipped: Vec<String>,
}

impl UniformLayout {
    pub fn from_set(set: &UniformSet) -> Result<Self, SketchError> {
        let mut slots = Vec::with_capacity(set.len());
        let mut cursor = 0usize;
        for (name, value) in set.iter() {
            if !is_glsl_identifier(name) {
                return Err(SketchError::InvalidUniformName(name.to_string()));
            }
            let kind = value.kind();
            let offset = align_up(cursor, kind.align());
            cursor = offset + kind.size();
            slots.push(UniformSlot {
                name: name.to_string(),
                kind,
                offset,
            });
        }

        Ok(Self {
            slots,
            size: align_up(cursor.max(1), 16),
        })
    }

    pub fn slots(&self) -> &[UniformSlot] {
        &self.slots
    }

    /// Size of the block in bytes, always a multiple of 16.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn contains(&self, name: &str) -> bool {
        self.slot(name).is_some()
    }

    pub fn slot(&self, name: &str) -> Option<&UniformSlot> {
        self.slots.iter().find(|slot| slot.name == name)
    }

    /// Serialises the set into the block.
    ///
    /// Names unknown to the layout and values whose type no longer matches
    /// their slot are left out and reported in `skipped`; their slots keep
    /// zeroes.
    pub fn pack(&self, set: &UniformSet) -> PackedUniforms {
        let mut bytes = vec![0u8; self.size];
        let mut skipped = Vec::new();

        for (name, value) in set.iter() {
            match self.slot(name) {
                Some(slot) if slot.kind == value.kind() => {
                    let end = slot.offset + slot.kind.size();
                    value.write_to(&mut bytes[slot.offset..end]);
                }
                _ => skipped.push(name.to_string()),
            }
        }

        PackedUniforms { bytes, skipped }
    }

    /// GLSL declaration of the block followed by `#define` aliases so shader
    /// code keeps referring to uniforms by their plain names.
    pub fn glsl_block(&self) -> String {
        let mut block = format!(
            "layout(std140, set = 0, binding = {UNIFORM_BINDING}) uniform {BLOCK_NAME} {{\n"
        );
        for slot in &self.slots {
            let _ = writeln!(
                block,
                "    {} {MEMBER_PREFIX}{};",
                slot.kind.glsl_type(),
                slot.name
            );
        }
        let _ = writeln!(block, "}} {INSTANCE_NAME};");
        for slot in &self.slots {
            let _ = writeln!(
                block,
                "#define {name} {INSTANCE_NAME}.{MEMBER_PREFIX}{name}",
                name = slot.name
            );
        }
        block
    }

    /// Fully qualified member expression for a uniform, bypassing the alias macro.
    pub(crate) fn member_expr(&self, name: &str) -> Option<String> {
        self.slot(name)
            .map(|slot| format!("{INSTANCE_NAME}.{MEMBER_PREFIX}{}", slot.name))
    }
}

fn align_up(value: usize, align: usize) -> usize {
    value.div_ceil(align) * align
}

pub(crate) fn is_glsl_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    if !(first.is_ascii_alphabetic() || first == '_') {
        return false;
    }
    if name.starts_with("gl_") || name.contains("__") {
        return false;
    }
    chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defaults() -> UniformSet {
        UniformSet::new(SurfaceSize::new(800, 600))
    }

    #[test]
    fn default_set_matches_initial_state() {
        let set = defaults();
        let entries: Vec<_> = set.iter().collect();
        assert_eq!(
            entries,
            vec![
                (U_TIME, UniformValue::Float(0.0)),
                (U_RESOLUTION, UniformValue::Vec2([800.0, 600.0])),
                (U_MOUSE, UniformValue::Vec2([0.0, 0.0])),
            ]
        );
    }

    #[test]
    fn apply_frame_converts_milliseconds_and_refreshes_resolution() {
        let mut set = defaults();
        set.set(U_TIME, 42.0);
        set.apply_frame(1000.0, SurfaceSize::new(1024, 768));
        assert_eq!(set.time(), 1.0);
        assert_eq!(set.resolution(), [1024.0, 768.0]);
        assert_eq!(set.mouse(), [0.0, 0.0]);
    }

    #[test]
    fn default_layout_follows_std140() {
        let layout = UniformLayout::from_set(&defaults()).unwrap();
        let offsets: Vec<_> = layout
            .slots()
            .iter()
            .map(|slot| (slot.name.as_str(), slot.offset))
            .collect();
        assert_eq!(
            offsets,
            vec![(U_TIME, 0), (U_RESOLUTION, 8), (U_MOUSE, 16)]
        );
        assert_eq!(layout.size(), 32);
    }

    #[test]
    fn vec3_aligns_to_sixteen_and_float_fills_its_tail() {
        let mut set = defaults();
        set.set("u_tint", [1.0, 0.5, 0.25]);
        set.set("u_speed", 2.0);
        set.set("u_frame", 3);
        let layout = UniformLayout::from_set(&set).unwrap();

        assert_eq!(layout.slot("u_tint").unwrap().offset, 32);
        assert_eq!(layout.slot("u_speed").unwrap().offset, 44);
        assert_eq!(layout.slot("u_frame").unwrap().offset, 48);
        assert_eq!(layout.size(), 64);
    }

    #[test]
    fn pack_writes_values_at_their_offsets() {
        let mut set = defaults();
        set.apply_frame(1500.0, SurfaceSize::new(640, 480));
        set.merge_mouse([0.25, 0.75]);
        let layout = UniformLayout::from_set(&set).unwrap();
        let packed = layout.pack(&set);

        assert!(packed.skipped.is_empty());
        let floats: Vec<f32> = packed
            .bytes
            .chunks_exact(4)
            .map(|chunk| f32::from_ne_bytes(chunk.try_into().unwrap()))
            .collect();
        assert_eq!(floats[0], 1.5);
        assert_eq!(&floats[2..4], &[640.0, 480.0]);
        assert_eq!(&floats[4..6], &[0.25, 0.75]);
    }

    #[test]
    fn pack_skips_unknown_names_and_changed_types() {
        let set = defaults();
        let layout = UniformLayout::from_set(&set).unwrap();

        let mut later = set.clone();
        later.set("u_late", 1.0);
        later.set(U_MOUSE, 5.0);
        let packed = layout.pack(&later);

        assert_eq!(packed.skipped, vec![U_MOUSE.to_string(), "u_late".to_string()]);
        assert_eq!(packed.bytes.len(), layout.size());
    }

    #[test]
    fn rejects_names_that_are_not_identifiers() {
        let mut set = defaults();
        set.set("2fast", 1.0);
        let err = UniformLayout::from_set(&set).unwrap_err();
        assert!(matches!(err, SketchError::InvalidUniformName(name) if name == "2fast"));

        assert!(!is_glsl_identifier("gl_Time"));
        assert!(!is_glsl_identifier("u__x"));
        assert!(is_glsl_identifier("_u_x1"));
    }

    #[test]
    fn kinds_round_trip_through_glsl_names() {
        for kind in [
            UniformKind::Float,
            UniformKind::Int,
            UniformKind::Vec2,
            UniformKind::Vec3,
            UniformKind::Vec4,
        ] {
            assert_eq!(UniformKind::from_glsl_type(kind.glsl_type()), Some(kind));
            assert_eq!(kind.zero().kind(), kind);
        }
        assert_eq!(UniformKind::from_glsl_type("sampler2D"), None);
    }

    #[test]
    fn glsl_block_declares_members_and_aliases() {
        let layout = UniformLayout::from_set(&defaults()).unwrap();
        let block = layout.glsl_block();
        assert!(block.starts_with("layout(std140, set = 0, binding = 0) uniform SketchUniforms {"));
        assert!(block.contains("    float sketch_u_time;\n"));
        assert!(block.contains("    vec2 sketch_u_resolution;\n"));
        assert!(block.contains("} sketch;\n"));
        assert!(block.contains("#define u_mouse sketch.sketch_u_mouse\n"));
        assert_eq!(
            layout.member_expr(U_RESOLUTION).as_deref(),
            Some("sketch.sketch_u_resolution")
        );
    }
}
