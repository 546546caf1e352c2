use crate::types::ShaderStageKind;

/// Typed failures raised while preparing a sketch program.
///
/// GPU and window plumbing reports through `anyhow`; these variants exist so
/// callers can tell a broken shader apart from a broken device.
#[derive(Debug, thiserror::Error)]
pub enum SketchError {
    #[error("{stage} shader failed to compile:\n{message}")]
    ShaderCompile {
        stage: ShaderStageKind,
        message: String,
    },
    #[error("uniform name '{0}' is not a valid GLSL identifier")]
    InvalidUniformName(String),
}

impl SketchError {
    pub fn stage(&self) -> Option<ShaderStageKind> {
        match self {
            SketchError::ShaderCompile { stage, .. } => Some(*stage),
            SketchError::InvalidUniformName(_) => None,
        }
    }
}
