//! Adapts WebGL2-style GLSL to the Vulkan GLSL dialect `wgpu` consumes.
//!
//! Sketch shaders are written the way one would for a `<canvas>`: a
//! `#version 300 es` line, `precision` statements, loose `uniform`
//! declarations and stage inputs/outputs without explicit locations. Each
//! source is rewritten line by line (removed lines become blank lines so
//! diagnostics keep the caller's line numbers) and prefixed with a header that
//! declares the uniform block derived from the [`UniformLayout`].
//!
//! Vertex inputs other than the quad's `position` attribute have no buffer
//! behind them and become constants holding WebGL's default attribute value.

use std::borrow::Cow;

use anyhow::Result;
use wgpu::naga::front::glsl::{Frontend, Options, ParseErrors};
use wgpu::naga::ShaderStage;

use crate::error::SketchError;
use crate::geometry::QuadGeometry;
use crate::types::{ShaderSources, ShaderStageKind};
use crate::uniforms::{UniformKind, UniformLayout, U_RESOLUTION};

const GLSL_VERSION: &str = "#version 450";
const LINE_MARKER: &str = "#line 1\n";
const WRAPPER_START: &str = "\n#undef main\n";

/// Sources ready to hand to the GLSL front end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdaptedSources {
    pub vertex: String,
    pub fragment: String,
}

/// Adapts both stages and checks they parse, so broken shaders are reported
/// as [`SketchError::ShaderCompile`] before any GPU object is created.
pub fn adapt_sources(
    sources: &ShaderSources,
    layout: &UniformLayout,
) -> Result<AdaptedSources, SketchError> {
    let vertex = adapt_vertex(&sources.vertex, layout);
    validate(ShaderStageKind::Vertex, &vertex)?;
    let fragment = adapt_fragment(&sources.fragment, layout);
    validate(ShaderStageKind::Fragment, &fragment)?;
    Ok(AdaptedSources { vertex, fragment })
}

/// Runs the `naga` GLSL front end over an adapted source.
pub fn validate(stage: ShaderStageKind, source: &str) -> Result<(), SketchError> {
    let options = Options::from(naga_stage(stage));
    Frontend::default()
        .parse(&options, source)
        .map(|_| ())
        .map_err(|errors| SketchError::ShaderCompile {
            stage,
            message: describe_errors(&errors, source),
        })
}

/// One `line L, column C: message` entry per error, with lines counted in the
/// caller's source. Errors inside generated code are tagged `<generated>`.
fn describe_errors(errors: &ParseErrors, source: &str) -> String {
    let body = caller_lines(source);
    errors
        .errors
        .iter()
        .map(|error| {
            let location = error.meta.location(source);
            match body {
                Some((first, last))
                    if (first..=last).contains(&location.line_number) =>
                {
                    format!(
                        "line {}, column {}: {}",
                        location.line_number - first + 1,
                        location.line_position,
                        error.kind
                    )
                }
                _ => format!("<generated>: {}", error.kind),
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// First and last line (1-based, inclusive) of the caller's text inside an
/// adapted source.
fn caller_lines(source: &str) -> Option<(u32, u32)> {
    let marker = source.find(LINE_MARKER)?;
    let start = marker + LINE_MARKER.len();
    let end = source[start..]
        .find(WRAPPER_START)
        .map_or(source.len(), |offset| start + offset);
    let first = source[..start].matches('\n').count() as u32 + 1;
    let last = first + source[start..end].matches('\n').count() as u32;
    Some((first, last.saturating_sub(1).max(first)))
}

/// Plain `float`/`int`/`vecN` uniforms declared at file scope by either
/// stage, vertex first. Such uniforms have to live in the uniform block, so
/// the runner zero-initialises the ones nobody set.
pub fn declared_uniforms(sources: &ShaderSources) -> Vec<(String, UniformKind)> {
    let mut declared: Vec<(String, UniformKind)> = Vec::new();
    for source in [&sources.vertex, &sources.fragment] {
        for line in top_level_lines(source) {
            let Some(rest) = line.strip_prefix("uniform ") else {
                continue;
            };
            let Some((ty, names)) = uniform_declaration(rest) else {
                continue;
            };
            let Some(kind) = UniformKind::from_glsl_type(ty) else {
                continue;
            };
            for name in names {
                if !declared.iter().any(|(known, _)| known == name) {
                    declared.push((name.to_string(), kind));
                }
            }
        }
    }
    declared
}

/// Creates a GLSL shader module, surfacing `wgpu` validation failures as
/// [`SketchError::ShaderCompile`] instead of an uncaptured device error.
pub(crate) fn create_shader_module(
    device: &wgpu::Device,
    label: &str,
    stage: ShaderStageKind,
    source: &str,
) -> Result<wgpu::ShaderModule> {
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Glsl {
            shader: Cow::Borrowed(source),
            stage: naga_stage(stage),
            defines: &[],
        },
    });
    if let Some(err) = pollster::block_on(device.pop_error_scope()) {
        return Err(SketchError::ShaderCompile {
            stage,
            message: err.to_string(),
        }
        .into());
    }
    Ok(module)
}

pub(crate) fn naga_stage(stage: ShaderStageKind) -> ShaderStage {
    match stage {
        ShaderStageKind::Vertex => ShaderStage::Vertex,
        ShaderStageKind::Fragment => ShaderStage::Fragment,
    }
}

pub fn adapt_vertex(source: &str, layout: &UniformLayout) -> String {
    let body = rewrite_body(source, ShaderStageKind::Vertex, layout);
    format!(
        "{GLSL_VERSION}\n{block}\n{LINE_MARKER}{text}",
        block = layout.glsl_block(),
        text = body.text
    )
}

/// Fragment adaptation additionally keeps WebGL's bottom-left `gl_FragCoord`
/// origin: the caller's `main` is renamed and called from a wrapper that
/// mirrors the y coordinate against `u_resolution`.
pub fn adapt_fragment(source: &str, layout: &UniformLayout) -> String {
    let body = rewrite_body(source, ShaderStageKind::Fragment, layout);
    let mut header = format!("{GLSL_VERSION}\n{}", layout.glsl_block());

    if body.uses_frag_color && !body.declares_output {
        header.push_str(
            "layout(location = 0) out vec4 sketch_frag_color;\n#define gl_FragColor sketch_frag_color\n",
        );
    }

    let resolution = layout
        .slot(U_RESOLUTION)
        .filter(|slot| slot.kind == UniformKind::Vec2)
        .and_then(|_| layout.member_expr(U_RESOLUTION));

    match resolution {
        Some(resolution) => {
            header.push_str(
                "vec4 sketch_frag_coord;\n#define gl_FragCoord sketch_frag_coord\n#define main sketch_main\n",
            );
            format!(
                "{header}\n{LINE_MARKER}{text}{WRAPPER_START}#undef gl_FragCoord\n{footer}",
                text = body.text,
                footer = frag_coord_footer(&resolution)
            )
        }
        None => format!("{header}\n{LINE_MARKER}{text}", text = body.text),
    }
}

fn frag_coord_footer(resolution: &str) -> String {
    format!(
        "void main() {{\n    sketch_frag_coord = vec4(gl_FragCoord.x, {resolution}.y - gl_FragCoord.y, gl_FragCoord.z, gl_FragCoord.w);\n    sketch_main();\n}}\n"
    )
}

struct RewrittenBody {
    text: String,
    declares_output: bool,
    uses_frag_color: bool,
}

#[derive(Debug, PartialEq, Eq)]
enum Declaration<'a> {
    Uniform(Vec<&'a str>),
    Input { interpolation: &'a str, rest: String },
    Output { interpolation: &'a str, rest: String },
    Other,
}

fn rewrite_body(source: &str, stage: ShaderStageKind, layout: &UniformLayout) -> RewrittenBody {
    let mut text = String::with_capacity(source.len() + 64);
    let mut depth = 0i32;
    let mut next_input = 0u32;
    let mut next_output = 0u32;
    let mut declares_output = false;

    for line in source.lines() {
        let trimmed = line.trim_start();
        let replacement = if trimmed.starts_with("#version") {
            Some(String::new())
        } else if depth > 0 {
            None
        } else if trimmed.starts_with("precision ") {
            Some(String::new())
        } else {
            match classify(trimmed, stage) {
                Declaration::Uniform(names)
                    if names.iter().all(|name| layout.contains(name)) =>
                {
                    Some(String::new())
                }
                Declaration::Input { rest, .. }
                    if stage == ShaderStageKind::Vertex
                        && declared_name(&rest) != Some(QuadGeometry::ATTRIBUTE) =>
                {
                    Some(unbound_attribute(&rest))
                }
                Declaration::Input {
                    interpolation,
                    rest,
                } => {
                    let location = if stage == ShaderStageKind::Vertex {
                        QuadGeometry::ATTRIBUTE_LOCATION
                    } else {
                        let location = next_input;
                        next_input += 1;
                        location
                    };
                    Some(format!(
                        "layout(location = {location}) {interpolation}in {rest}"
                    ))
                }
                Declaration::Output {
                    interpolation,
                    rest,
                } => {
                    declares_output = true;
                    let location = next_output;
                    next_output += 1;
                    Some(format!(
                        "layout(location = {location}) {interpolation}out {rest}"
                    ))
                }
                Declaration::Uniform(_) | Declaration::Other => None,
            }
        };

        match replacement {
            Some(rewritten) => text.push_str(&rewritten),
            None => text.push_str(line),
        }
        text.push('\n');
        depth += nesting_delta(line);
    }

    let uses_frag_color = stage == ShaderStageKind::Fragment && source.contains("gl_FragColor");
    RewrittenBody {
        text,
        declares_output,
        uses_frag_color,
    }
}

fn classify(trimmed: &str, stage: ShaderStageKind) -> Declaration<'_> {
    if trimmed.starts_with("layout") {
        return Declaration::Other;
    }
    if let Some(rest) = trimmed.strip_prefix("uniform ") {
        return match uniform_declaration(rest) {
            Some((_, names)) => Declaration::Uniform(names),
            None => Declaration::Other,
        };
    }

    let (interpolation, rest) = split_interpolation(trimmed);
    let (is_input, rest) = if let Some(rest) = rest.strip_prefix("in ") {
        (true, rest)
    } else if let Some(rest) = rest.strip_prefix("out ") {
        (false, rest)
    } else if let Some(rest) = rest.strip_prefix("attribute ") {
        if stage != ShaderStageKind::Vertex {
            return Declaration::Other;
        }
        (true, rest)
    } else if let Some(rest) = rest.strip_prefix("varying ") {
        (stage == ShaderStageKind::Fragment, rest)
    } else {
        return Declaration::Other;
    };

    let rest = strip_precision(rest);
    if is_input {
        Declaration::Input {
            interpolation,
            rest,
        }
    } else {
        Declaration::Output {
            interpolation,
            rest,
        }
    }
}

fn split_interpolation(trimmed: &str) -> (&str, &str) {
    for qualifier in ["flat ", "smooth ", "noperspective "] {
        if let Some(rest) = trimmed.strip_prefix(qualifier) {
            return (qualifier, rest.trim_start());
        }
    }
    ("", trimmed)
}

fn strip_precision(declaration: &str) -> String {
    declaration
        .split_whitespace()
        .filter(|token| !matches!(*token, "highp" | "mediump" | "lowp"))
        .collect::<Vec<_>>()
        .join(" ")
}

/// `[precision] type name[, name...];` split into the type and the names.
/// Array declarations are not plain values and yield `None`.
fn uniform_declaration(declaration: &str) -> Option<(&str, Vec<&str>)> {
    let mut statement = declaration.split(';').next()?.trim();
    for qualifier in ["highp ", "mediump ", "lowp "] {
        if let Some(rest) = statement.strip_prefix(qualifier) {
            statement = rest.trim_start();
        }
    }
    let (ty, names) = statement.split_once(char::is_whitespace)?;
    if names.contains('[') {
        return None;
    }
    let names: Vec<&str> = names
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .collect();
    (!names.is_empty()).then_some((ty, names))
}

/// `type name;` rewritten as a constant holding WebGL's default attribute
/// value `(0, 0, 0, 1)` truncated to the type.
fn unbound_attribute(declaration: &str) -> String {
    let statement = declaration.split(';').next().unwrap_or_default().trim();
    let Some((ty, names)) = statement.split_once(char::is_whitespace) else {
        return declaration.to_string();
    };
    let value = match ty {
        "float" => "0.0".to_string(),
        "int" => "0".to_string(),
        "uint" => "0u".to_string(),
        "vec4" => "vec4(0.0, 0.0, 0.0, 1.0)".to_string(),
        ty if ty.starts_with("ivec") => format!("{ty}(0)"),
        ty if ty.starts_with("uvec") => format!("{ty}(0u)"),
        ty => format!("{ty}(0.0)"),
    };
    let names: Vec<String> = names
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(|name| format!("{name} = {value}"))
        .collect();
    format!("const {ty} {};", names.join(", "))
}

/// Name declared by `type name;`, ignoring precision and array suffixes.
fn declared_name(declaration: &str) -> Option<&str> {
    let statement = declaration.split(';').next()?;
    let last = statement.split_whitespace().last()?;
    let name = last.split('[').next()?;
    (!name.is_empty()).then_some(name)
}

/// Trimmed lines outside any function body or parameter list.
fn top_level_lines(source: &str) -> impl Iterator<Item = &str> + '_ {
    let mut depth = 0i32;
    source.lines().filter_map(move |line| {
        let top_level = depth == 0;
        depth += nesting_delta(line);
        top_level.then(|| line.trim_start())
    })
}

/// Change in `{`/`(` nesting contributed by a line, ignoring `//` comments.
fn nesting_delta(line: &str) -> i32 {
    let code = line.split("//").next().unwrap_or_default();
    code.chars().fold(0, |depth, ch| match ch {
        '{' | '(' => depth + 1,
        '}' | ')' => depth - 1,
        _ => depth,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SurfaceSize;
    use crate::uniforms::UniformSet;

    const VERTEX: &str = r#"#version 300 es
in vec2 position;
out vec2 v_uv;

void main() {
    v_uv = position * 0.5 + 0.5;
    gl_Position = vec4(position, 0.0, 1.0);
}
"#;

    const FRAGMENT: &str = r#"#version 300 es
precision highp float;

uniform float u_time;
uniform vec2 u_resolution;
uniform vec2 u_mouse;

in vec2 v_uv;
out vec4 outColor;

void main() {
    vec2 uv = gl_FragCoord.xy / u_resolution;
    float wave = 0.5 + 0.5 * sin(u_time + uv.x * 6.0);
    outColor = vec4(uv, wave, 1.0) + vec4(u_mouse, 0.0, 0.0) * 0.1 + vec4(v_uv, 0.0, 0.0) * 0.0;
}
"#;

    fn layout() -> UniformLayout {
        UniformLayout::from_set(&UniformSet::new(SurfaceSize::new(800, 600))).unwrap()
    }

    fn body_after_line_marker(adapted: &str) -> &str {
        adapted
            .split_once("#line 1\n")
            .map(|(_, body)| body)
            .unwrap()
    }

    #[test]
    fn strips_version_precision_and_block_uniforms() {
        let adapted = adapt_fragment(FRAGMENT, &layout());
        let body = body_after_line_marker(&adapted);

        assert!(!body.contains("#version 300 es"));
        assert!(!body.contains("precision highp float"));
        assert!(!body.contains("uniform float u_time"));
        assert!(!body.contains("uniform vec2 u_mouse"));
        assert!(adapted.starts_with("#version 450\n"));
        assert!(adapted.contains("uniform SketchUniforms"));
    }

    #[test]
    fn removed_lines_keep_caller_line_numbers() {
        let adapted = adapt_vertex(VERTEX, &layout());
        let body = body_after_line_marker(&adapted);
        assert_eq!(body.lines().count(), VERTEX.lines().count());
        assert_eq!(body.lines().nth(1), Some("layout(location = 0) in vec2 position;"));
    }

    #[test]
    fn assigns_locations_in_declaration_order() {
        let adapted = adapt_vertex(VERTEX, &layout());
        assert!(adapted.contains("layout(location = 0) in vec2 position;"));
        assert!(adapted.contains("layout(location = 0) out vec2 v_uv;"));

        let adapted = adapt_fragment(FRAGMENT, &layout());
        assert!(adapted.contains("layout(location = 0) in vec2 v_uv;"));
        assert!(adapted.contains("layout(location = 0) out vec4 outColor;"));
    }

    #[test]
    fn legacy_qualifiers_map_to_stage_inputs_and_outputs() {
        let vertex = "attribute vec2 position;\nvarying highp vec2 v_uv;\nflat out int v_id;\nvoid main() { gl_Position = vec4(position, 0.0, 1.0); }\n";
        let adapted = adapt_vertex(vertex, &layout());
        assert!(adapted.contains("layout(location = 0) in vec2 position;"));
        assert!(adapted.contains("layout(location = 0) out vec2 v_uv;"));
        assert!(adapted.contains("layout(location = 1) flat out int v_id;"));

        let fragment = "varying vec2 v_uv;\nvoid main() { gl_FragColor = vec4(v_uv, 0.0, 1.0); }\n";
        let adapted = adapt_fragment(fragment, &layout());
        assert!(adapted.contains("layout(location = 0) in vec2 v_uv;"));
        assert!(adapted.contains("out vec4 sketch_frag_color;"));
        assert!(adapted.contains("#define gl_FragColor sketch_frag_color"));
    }

    #[test]
    fn declarations_inside_functions_are_left_alone() {
        let fragment = "out vec4 color;\nfloat f(\n    in float x\n) {\n    return x;\n}\nvoid main() { color = vec4(f(1.0)); }\n";
        let adapted = adapt_fragment(fragment, &layout());
        assert!(adapted.contains("\n    in float x\n"));
        assert!(adapted.contains("layout(location = 0) out vec4 color;"));
    }

    #[test]
    fn unknown_uniforms_are_kept_for_the_compiler_to_judge() {
        let fragment = "uniform sampler2D u_texture;\nout vec4 color;\nvoid main() { color = vec4(1.0); }\n";
        let adapted = adapt_fragment(fragment, &layout());
        assert!(adapted.contains("uniform sampler2D u_texture;"));
    }

    fn layout_with_declared(sources: &ShaderSources) -> UniformLayout {
        let mut set = UniformSet::new(SurfaceSize::new(800, 600));
        for (name, kind) in declared_uniforms(sources) {
            if !set.contains(&name) {
                set.set(name, kind.zero());
            }
        }
        UniformLayout::from_set(&set).unwrap()
    }

    #[test]
    fn loose_plain_uniforms_move_into_the_block() {
        let fragment = "#version 300 es\nprecision highp float;\nuniform float u_speed;\nuniform highp float u_time, u_custom;\nout vec4 c;\nvoid main() { c = vec4(u_speed + u_time + u_custom); }\n";
        let sources = ShaderSources::new(fragment, VERTEX);
        let layout = layout_with_declared(&sources);
        assert!(layout.contains("u_speed"));
        assert!(layout.contains("u_custom"));

        let adapted = adapt_sources(&sources, &layout).expect("loose uniforms should compile");
        let body = body_after_line_marker(&adapted.fragment);
        assert!(!body.contains("uniform float u_speed"));
        assert!(!body.contains("u_time, u_custom"));
        assert!(adapted.fragment.contains("    float sketch_u_custom;"));
    }

    #[test]
    fn declared_uniforms_lists_plain_file_scope_values_once() {
        let sources = ShaderSources::new(
            "uniform vec3 u_tint;\nuniform float u_steps[4];\nuniform mat4 u_view;\nvoid main() {\n    float u_local = 1.0;\n}\n",
            "uniform mediump vec3 u_tint;\nuniform int u_count;\nvoid main() {}\n",
        );
        assert_eq!(
            declared_uniforms(&sources),
            vec![
                ("u_tint".to_string(), UniformKind::Vec3),
                ("u_count".to_string(), UniformKind::Int),
            ]
        );
    }

    #[test]
    fn quad_attribute_is_bound_by_name() {
        let vertex = "#version 300 es\nin vec2 a_uv;\nin vec2 position;\nin vec4 a_color;\nout vec2 v_uv;\nvoid main() {\n    v_uv = position * 0.5 + 0.5 + a_uv + a_color.xy;\n    gl_Position = vec4(position, 0.0, 1.0);\n}\n";
        let adapted = adapt_vertex(vertex, &layout());
        assert!(adapted.contains("layout(location = 0) in vec2 position;"));
        assert!(adapted.contains("const vec2 a_uv = vec2(0.0);"));
        assert!(adapted.contains("const vec4 a_color = vec4(0.0, 0.0, 0.0, 1.0);"));
        assert!(!adapted.contains("location = 1) in"));

        let sources = ShaderSources::new(FRAGMENT, vertex);
        adapt_sources(&sources, &layout()).expect("attribute constants should compile");
    }

    #[test]
    fn diagnostics_use_caller_line_numbers() {
        let fragment = "#version 300 es\nprecision highp float;\nout vec4 c;\nvoid main() {\n    c = vec4(1.0)\n}\n";
        let err = validate(
            ShaderStageKind::Fragment,
            &adapt_fragment(fragment, &layout()),
        )
        .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("line 6,"), "{message}");
    }

    #[test]
    fn caller_lines_skip_header_and_wrapper() {
        let adapted = adapt_fragment("out vec4 c;\nvoid main() { c = vec4(1.0); }\n", &layout());
        let (first, last) = caller_lines(&adapted).unwrap();
        let lines: Vec<&str> = adapted.lines().collect();
        assert_eq!(lines[first as usize - 1], "layout(location = 0) out vec4 c;");
        assert_eq!(lines[last as usize - 1], "void main() { c = vec4(1.0); }");
    }

    #[test]
    fn fragment_main_is_wrapped_to_flip_frag_coord() {
        let adapted = adapt_fragment(FRAGMENT, &layout());
        assert!(adapted.contains("#define main sketch_main"));
        assert!(adapted.contains("#undef main"));
        assert!(adapted.contains("sketch.sketch_u_resolution.y - gl_FragCoord.y"));
        assert!(adapted.trim_end().ends_with("sketch_main();\n}"));
    }

    #[test]
    fn frag_coord_is_untouched_when_resolution_is_not_a_vec2() {
        let mut set = UniformSet::new(SurfaceSize::new(10, 10));
        set.set(U_RESOLUTION, 1.0);
        let layout = UniformLayout::from_set(&set).unwrap();
        let adapted = adapt_fragment("out vec4 c;\nvoid main() { c = vec4(1.0); }\n", &layout);
        assert!(!adapted.contains("sketch_main"));
    }

    #[test]
    fn adapted_default_shaders_parse() {
        let sources = ShaderSources::new(FRAGMENT, VERTEX);
        let adapted = adapt_sources(&sources, &layout()).expect("shaders should parse");
        assert!(adapted.vertex.contains("gl_Position"));
    }

    #[test]
    fn syntax_errors_are_reported_with_their_stage() {
        let sources = ShaderSources::new("out vec4 c;\nvoid main() { c = vec4(1.0) }\n", VERTEX);
        let err = adapt_sources(&sources, &layout()).unwrap_err();
        assert_eq!(err.stage(), Some(ShaderStageKind::Fragment));
        assert!(err.to_string().starts_with("fragment shader failed to compile"));
    }

    #[test]
    fn declared_name_handles_precision_and_arrays() {
        assert_eq!(declared_name("highp float u_time;"), Some("u_time"));
        assert_eq!(declared_name("vec3 u_points[4];"), Some("u_points"));
        assert_eq!(declared_name(";"), None);
    }
}
