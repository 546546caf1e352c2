use std::path::PathBuf;

use clap::Parser;
use sketch::Antialiasing;
use sketchconfig::AntialiasSetting;

#[derive(Parser, Debug)]
#[command(
    name = "sketchview",
    author,
    version,
    about = "Run a full-canvas GLSL sketch in a window"
)]
pub struct Cli {
    /// Sketch configuration file (TOML).
    #[arg(long, env = "SKETCH_CONFIG", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Fragment shader source (WebGL2 GLSL). Defaults to the bundled sketch.
    #[arg(long, value_name = "FILE")]
    pub fragment: Option<PathBuf>,

    /// Vertex shader source. Defaults to the bundled passthrough shader.
    #[arg(long, value_name = "FILE")]
    pub vertex: Option<PathBuf>,

    /// Initial window size (e.g. `1280x720`).
    #[arg(long, value_name = "WIDTHxHEIGHT", value_parser = parse_size)]
    pub size: Option<(u32, u32)>,

    /// Anti-aliasing policy: `auto`, `off`, or an explicit MSAA sample count (e.g. `4`).
    #[arg(long, value_name = "MODE", value_parser = parse_antialias)]
    pub antialias: Option<Antialiasing>,

    /// Present without waiting for vertical sync.
    #[arg(long)]
    pub no_vsync: bool,

    /// Window title.
    #[arg(long)]
    pub title: Option<String>,

    /// Drive the `u_pulse` uniform from the demo update hook.
    #[arg(long)]
    pub demo: bool,
}

pub fn parse() -> Cli {
    Cli::parse()
}

pub fn parse_antialias(value: &str) -> Result<Antialiasing, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err("anti-alias mode must not be empty".to_string());
    }
    trimmed.parse::<AntialiasSetting>().map(antialiasing_from)
}

pub fn antialiasing_from(setting: AntialiasSetting) -> Antialiasing {
    match setting.samples() {
        None => Antialiasing::Auto,
        Some(1) => Antialiasing::Off,
        Some(samples) => Antialiasing::Samples(samples),
    }
}

pub fn parse_size(value: &str) -> Result<(u32, u32), String> {
    let (width, height) = value
        .trim()
        .split_once(|c: char| c == 'x' || c == 'X')
        .ok_or_else(|| format!("invalid size '{value}'; expected WIDTHxHEIGHT"))?;
    let width: u32 = width
        .trim()
        .parse()
        .map_err(|_| format!("invalid width '{width}' in size '{value}'"))?;
    let height: u32 = height
        .trim()
        .parse()
        .map_err(|_| format!("invalid height '{height}' in size '{value}'"))?;
    if width == 0 || height == 0 {
        return Err(format!("size '{value}' must be non-zero in both dimensions"));
    }
    Ok((width, height))
}
