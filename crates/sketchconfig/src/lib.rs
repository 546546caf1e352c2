use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::de::{self, Deserializer};
use serde::Deserialize;

/// Uniform names every sketch already receives.
pub const RESERVED_UNIFORMS: [&str; 3] = ["u_time", "u_resolution", "u_mouse"];

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read configuration {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SketchConfig {
    #[serde(default)]
    pub window: WindowSection,
    #[serde(default)]
    pub shaders: ShaderSection,
    #[serde(default)]
    pub uniforms: BTreeMap<String, UniformSetting>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct WindowSection {
    pub title: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub vsync: Option<bool>,
    #[serde(default, deserialize_with = "deserialize_antialias_opt")]
    pub antialias: Option<AntialiasSetting>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ShaderSection {
    pub fragment: Option<PathBuf>,
    pub vertex: Option<PathBuf>,
}

/// A static extra uniform: a scalar or a vector of one to four floats.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum UniformSetting {
    Scalar(f32),
    Vector(Vec<f32>),
}

impl UniformSetting {
    pub fn components(&self) -> &[f32] {
        match self {
            UniformSetting::Scalar(value) => std::slice::from_ref(value),
            UniformSetting::Vector(values) => values,
        }
    }
}

/// Parsed through [`FromStr`], so config files and the CLI accept the same spellings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AntialiasSetting {
    Auto,
    Off,
    Samples2,
    Samples4,
    Samples8,
    Samples16,
}

impl AntialiasSetting {
    /// Sample count to request, or `None` for automatic selection.
    pub fn samples(self) -> Option<u32> {
        match self {
            Self::Auto => None,
            Self::Off => Some(1),
            Self::Samples2 => Some(2),
            Self::Samples4 => Some(4),
            Self::Samples8 => Some(8),
            Self::Samples16 => Some(16),
        }
    }
}

impl FromStr for AntialiasSetting {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized = raw.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "auto" | "max" | "default" => Ok(Self::Auto),
            "off" | "none" | "disable" | "disabled" | "0" | "1" => Ok(Self::Off),
            "2" => Ok(Self::Samples2),
            "4" => Ok(Self::Samples4),
            "8" => Ok(Self::Samples8),
            "16" => Ok(Self::Samples16),
            other => Err(format!(
                "invalid antialias setting '{other}' (expected auto, off, 2, 4, 8 or 16)"
            )),
        }
    }
}

fn deserialize_antialias_opt<'de, D>(deserializer: D) -> Result<Option<AntialiasSetting>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Helper {
        Str(String),
        Num(i64),
    }

    let helper: Option<Helper> = Option::deserialize(deserializer)?;
    let result = match helper {
        None => None,
        Some(Helper::Str(raw)) => Some(raw.parse().map_err(de::Error::custom)?),
        Some(Helper::Num(value)) => {
            if value < 0 {
                return Err(de::Error::custom("antialias value must be non-negative"));
            }
            Some(value.to_string().parse().map_err(de::Error::custom)?)
        }
    };
    Ok(result)
}

impl SketchConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let raw: SketchConfig = toml::from_str(input)?;
        raw.validate()?;
        Ok(raw)
    }

    /// Reads and validates a config file. Relative shader paths are resolved
    /// against the file's directory.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let input = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml_str(&input)?;
        if let Some(base) = path.parent() {
            config.shaders.resolve_relative_to(base);
        }
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window.width == Some(0) || self.window.height == Some(0) {
            return Err(ConfigError::Invalid(
                "window width and height must be greater than zero".into(),
            ));
        }

        for (name, setting) in &self.uniforms {
            if RESERVED_UNIFORMS.contains(&name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "uniform '{name}' is provided by the sketch runner and cannot be overridden"
                )));
            }
            let components = setting.components().len();
            if !(1..=4).contains(&components) {
                return Err(ConfigError::Invalid(format!(
                    "uniform '{name}' has {components} components; expected 1 to 4"
                )));
            }
        }

        Ok(())
    }
}

impl ShaderSection {
    fn resolve_relative_to(&mut self, base: &Path) {
        for path in [&mut self.fragment, &mut self.vertex].into_iter().flatten() {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        }
    }
}
