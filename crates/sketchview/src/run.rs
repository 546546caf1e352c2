use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use sketch::{ShaderSources, WindowOptions};
use sketchconfig::SketchConfig;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::cli::{antialiasing_from, Cli};
use crate::hook::ViewerHook;

const DEFAULT_VERTEX: &str = include_str!("../shaders/vert.glsl");
const DEFAULT_FRAGMENT: &str = include_str!("../shaders/frag.glsl");
const DEMO_FRAGMENT: &str = include_str!("../shaders/pulse.frag.glsl");

pub fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

pub fn run(cli: Cli) -> Result<()> {
    let config = match cli.config.as_deref() {
        Some(path) => SketchConfig::load(path)
            .with_context(|| format!("failed to load sketch config {}", path.display()))?,
        None => SketchConfig::default(),
    };

    let options = window_options(&cli, &config);
    let sources = shader_sources(&cli, &config)?;
    let hook = ViewerHook::new(cli.demo, &config.uniforms);

    info!(
        title = %options.title,
        width = options.size.0,
        height = options.size.1,
        antialias = ?options.antialiasing,
        demo = cli.demo,
        "launching sketch"
    );
    sketch::run_window(&options, &sources, hook)
}

/// CLI flags win over config values, which win over the defaults.
pub(crate) fn window_options(cli: &Cli, config: &SketchConfig) -> WindowOptions {
    let defaults = WindowOptions::default();
    let window = &config.window;
    let size = cli.size.unwrap_or((
        window.width.unwrap_or(defaults.size.0),
        window.height.unwrap_or(defaults.size.1),
    ));
    let antialiasing = cli
        .antialias
        .or_else(|| window.antialias.map(antialiasing_from))
        .unwrap_or(defaults.antialiasing);
    let vsync = !cli.no_vsync && window.vsync.unwrap_or(defaults.vsync);

    WindowOptions {
        title: cli
            .title
            .clone()
            .or_else(|| window.title.clone())
            .unwrap_or(defaults.title),
        size,
        antialiasing,
        vsync,
    }
}

pub(crate) fn shader_sources(cli: &Cli, config: &SketchConfig) -> Result<ShaderSources> {
    let fragment = match cli.fragment.as_deref().or(config.shaders.fragment.as_deref()) {
        Some(path) => read_shader(path)?,
        None if cli.demo => DEMO_FRAGMENT.to_string(),
        None => DEFAULT_FRAGMENT.to_string(),
    };
    let vertex = match cli.vertex.as_deref().or(config.shaders.vertex.as_deref()) {
        Some(path) => read_shader(path)?,
        None => DEFAULT_VERTEX.to_string(),
    };
    Ok(ShaderSources::new(fragment, vertex))
}

fn read_shader(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("failed to read shader {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use sketch::Antialiasing;

    fn cli(args: &[&str]) -> Cli {
        let mut argv = vec!["sketchview"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn defaults_apply_without_flags_or_config() {
        let options = window_options(&cli(&[]), &SketchConfig::default());
        assert_eq!(options, WindowOptions::default());
    }

    #[test]
    fn flags_override_config() {
        let config = SketchConfig::from_toml_str(
            "[window]\ntitle = \"Config\"\nwidth = 800\nheight = 600\nantialias = \"off\"\nvsync = true\n",
        )
        .unwrap();

        let options = window_options(&cli(&[]), &config);
        assert_eq!(options.title, "Config");
        assert_eq!(options.size, (800, 600));
        assert_eq!(options.antialiasing, Antialiasing::Off);
        assert!(options.vsync);

        let options = window_options(
            &cli(&["--title", "Flag", "--size", "320x200", "--antialias", "4", "--no-vsync"]),
            &config,
        );
        assert_eq!(options.title, "Flag");
        assert_eq!(options.size, (320, 200));
        assert_eq!(options.antialiasing, Antialiasing::Samples(4));
        assert!(!options.vsync);
    }

    #[test]
    fn bundled_shaders_are_used_by_default() {
        let sources = shader_sources(&cli(&[]), &SketchConfig::default()).unwrap();
        assert_eq!(sources.fragment, DEFAULT_FRAGMENT);
        assert_eq!(sources.vertex, DEFAULT_VERTEX);

        let sources = shader_sources(&cli(&["--demo"]), &SketchConfig::default()).unwrap();
        assert!(sources.fragment.contains("u_pulse"));
    }

    #[test]
    fn shader_files_override_bundled_sources() {
        let dir = tempfile::tempdir().unwrap();
        let fragment = dir.path().join("sketch.frag");
        fs::write(&fragment, "void main() {}\n").unwrap();

        let config = SketchConfig {
            shaders: sketchconfig::ShaderSection {
                fragment: Some(fragment),
                vertex: None,
            },
            ..SketchConfig::default()
        };
        let sources = shader_sources(&cli(&[]), &config).unwrap();
        assert_eq!(sources.fragment, "void main() {}\n");
        assert_eq!(sources.vertex, DEFAULT_VERTEX);
    }

    #[test]
    fn missing_shader_files_are_reported() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.frag");
        let err = shader_sources(
            &cli(&["--fragment", missing.to_str().unwrap()]),
            &SketchConfig::default(),
        )
        .unwrap_err();
        assert!(format!("{err:#}").contains("nope.frag"));
    }
}
