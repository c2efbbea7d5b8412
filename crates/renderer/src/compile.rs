use std::borrow::Cow;
use std::path::Path;

use modulation::Uniform;
use wgpu::naga::ShaderStage;

/// Set of known uniforms a fragment shader declares.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct DeclaredUniforms(u16);

impl DeclaredUniforms {
    fn bit(uniform: Uniform) -> u16 {
        let index = Uniform::ALL
            .iter()
            .position(|candidate| *candidate == uniform)
            .unwrap_or_default();
        1 << index
    }

    pub(crate) fn insert(&mut self, uniform: Uniform) {
        self.0 |= Self::bit(uniform);
    }

    pub(crate) fn contains(&self, uniform: Uniform) -> bool {
        self.0 & Self::bit(uniform) != 0
    }
}

/// Fragment shader rewritten for `wgpu`, plus the uniforms it declared.
#[derive(Debug, Clone)]
pub(crate) struct WrappedShader {
    pub source: String,
    pub declared: DeclaredUniforms,
}

/// Reads shader text; an unreadable file yields an empty source so the
/// failure surfaces as a compile error with a fallback program.
pub(crate) fn load_shader_source(path: &Path) -> String {
    match std::fs::read_to_string(path) {
        Ok(source) => source,
        Err(err) => {
            tracing::error!(
                path = %path.display(),
                error = %err,
                "failed to read shader; compiling empty source"
            );
            String::new()
        }
    }
}

pub(crate) fn compile_vertex_shader(device: &wgpu::Device) -> wgpu::ShaderModule {
    device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("fullscreen triangle vertex"),
        source: wgpu::ShaderSource::Glsl {
            shader: Cow::Borrowed(VERTEX_SHADER_GLSL),
            stage: ShaderStage::Vertex,
            defines: &[],
        },
    })
}

pub(crate) fn compile_fragment_shader(
    device: &wgpu::Device,
    label: &str,
    wrapped: &WrappedShader,
) -> wgpu::ShaderModule {
    device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Glsl {
            shader: Cow::Owned(wrapped.source.clone()),
            stage: ShaderStage::Fragment,
            defines: &[],
        },
    })
}

/// Produces a self-contained GLSL 450 fragment shader from desktop GLSL.
///
/// 1. Drop the `#version` directive.
/// 2. Remove loose `uniform` declarations of known names and alias them to
///    members of [`HEADER`]'s uniform block; unknown loose uniforms become
///    zero-initialised private globals.
/// 3. Give top-level `in`/`out` declarations location 0.
/// 4. Rename the shader's `main` and append [`FOOTER`], which remaps
///    `gl_FragCoord` to a bottom-left origin before calling it.
pub(crate) fn wrap_fragment(source: &str) -> WrappedShader {
    let mut declared = DeclaredUniforms::default();
    let mut body = String::new();
    let mut skipped_version = false;

    for line in source.lines() {
        let trimmed = line.trim_start();
        if !skipped_version && trimmed.starts_with("#version") {
            skipped_version = true;
            continue;
        }
        if trimmed.starts_with("precision ") {
            continue;
        }

        if let Some(declaration) = trimmed.strip_prefix("uniform ") {
            if let Some(rewritten) = rewrite_uniform(declaration, &mut declared) {
                body.push_str(&rewritten);
                body.push('\n');
            }
            continue;
        }

        if trimmed.starts_with("in ") || trimmed.starts_with("out ") {
            body.push_str("layout(location = 0) ");
            body.push_str(trimmed);
            body.push('\n');
            continue;
        }

        body.push_str(line);
        body.push('\n');
    }

    let mut aliases = String::new();
    for uniform in Uniform::ALL {
        if declared.contains(uniform) {
            aliases.push_str(&format!(
                "#define {name} sinestesia_ubo._{name}\n",
                name = uniform.glsl_name()
            ));
        }
    }

    WrappedShader {
        source: format!("{HEADER}{aliases}{PRELUDE}\n#line 1\n{body}{FOOTER}"),
        declared,
    }
}

/// Returns the replacement line for a loose uniform declaration, or `None`
/// when every declared name is served by the uniform block.
fn rewrite_uniform(declaration: &str, declared: &mut DeclaredUniforms) -> Option<String> {
    let declaration = declaration.trim().trim_end_matches(';').trim();
    let Some((ty, names)) = declaration.split_once(char::is_whitespace) else {
        return Some(format!("uniform {declaration};"));
    };

    let mut unknown = Vec::new();
    for name in names.split(',').map(str::trim).filter(|name| !name.is_empty()) {
        match Uniform::from_glsl_name(name) {
            Some(uniform) => declared.insert(uniform),
            None => unknown.push(name),
        }
    }

    if unknown.is_empty() {
        return None;
    }

    tracing::warn!(
        ?unknown,
        "shader declares uniforms the renderer never sets; they stay zero"
    );
    Some(format!("{ty} {};", unknown.join(", ")))
}

/// Uniform block shared by every region program.
///
/// Layout must match `RegionUniforms` in `gpu/uniforms.rs`.
const HEADER: &str = r"#version 450
layout(std140, set = 0, binding = 0) uniform SinestesiaParams {
    vec2 _frame;
    vec2 _resolution;
    float _time;
    float _u_flowerDensity;
    float _u_noiseAmount;
    float _u_swirlIntensity;
    float _u_xOffset;
    float _xpos;
    float _ypos;
    float _uSize;
} sinestesia_ubo;

";

const PRELUDE: &str = r"
vec4 sinestesia_fragcoord;
#define gl_FragCoord sinestesia_fragcoord
#define main sinestesia_user_main
";

const FOOTER: &str = r"
#undef main
void main() {
    #undef gl_FragCoord
    vec4 builtinFC = gl_FragCoord;
    #define gl_FragCoord sinestesia_fragcoord

    sinestesia_fragcoord = vec4(builtinFC.x, sinestesia_ubo._frame.y - builtinFC.y, builtinFC.z, builtinFC.w);
    sinestesia_user_main();
}
";

/// Full-screen triangle; `TexCoords` has its origin at the top-left.
const VERTEX_SHADER_GLSL: &str = r"#version 450
layout(location = 0) out vec2 v_texcoords;

const vec2 positions[3] = vec2[3](
    vec2(-1.0, -3.0),
    vec2(3.0, 1.0),
    vec2(-1.0, 1.0)
);

void main() {
    uint vertex_index = uint(gl_VertexIndex);
    vec2 pos = positions[vertex_index];
    v_texcoords = vec2(pos.x * 0.5 + 0.5, 0.5 - pos.y * 0.5);
    gl_Position = vec4(pos, 0.0, 1.0);
}
";

/// Magenta stripes drawn in place of any program that fails to compile.
pub(crate) const FALLBACK_FRAGMENT: &str = r"#version 330 core
uniform float time;
out vec4 FragColor;

void main() {
    float stripe = step(0.5, fract((gl_FragCoord.x + gl_FragCoord.y) / 32.0 - time * 0.25));
    FragColor = vec4(stripe, 0.0, stripe, 1.0);
}
";

#[cfg(test)]
mod tests {
    use super::*;

    const REGION_SHADER: &str = r#"
#version 330 core
in vec2 TexCoords;
out vec4 FragColor;
uniform vec2 resolution;
uniform float time;
uniform float u_flowerDensity, u_noiseAmount;
uniform float u_mystery;
void main() {
    FragColor = vec4(TexCoords, time * u_flowerDensity, 1.0);
}
"#;

    #[test]
    fn records_declared_uniforms() {
        let wrapped = wrap_fragment(REGION_SHADER);
        assert!(wrapped.declared.contains(Uniform::Resolution));
        assert!(wrapped.declared.contains(Uniform::Time));
        assert!(wrapped.declared.contains(Uniform::FlowerDensity));
        assert!(wrapped.declared.contains(Uniform::NoiseAmount));
        assert!(!wrapped.declared.contains(Uniform::SwirlIntensity));
        assert!(!wrapped.declared.contains(Uniform::XOffset));
    }

    #[test]
    fn aliases_only_declared_uniforms() {
        let wrapped = wrap_fragment(REGION_SHADER);
        assert!(wrapped.source.contains("#define time sinestesia_ubo._time"));
        assert!(wrapped
            .source
            .contains("#define resolution sinestesia_ubo._resolution"));
        assert!(!wrapped.source.contains("#define u_xOffset"));
        assert!(!wrapped.source.contains("uniform float time"));
    }

    #[test]
    fn keeps_unknown_uniforms_as_globals() {
        let wrapped = wrap_fragment(REGION_SHADER);
        assert!(wrapped.source.contains("float u_mystery;"));
        assert!(!wrapped.source.contains("uniform float u_mystery"));
    }

    #[test]
    fn rewrites_version_and_io() {
        let wrapped = wrap_fragment(REGION_SHADER);
        assert!(wrapped.source.starts_with("#version 450"));
        assert!(!wrapped.source.contains("#version 330"));
        assert!(wrapped
            .source
            .contains("layout(location = 0) in vec2 TexCoords;"));
        assert!(wrapped
            .source
            .contains("layout(location = 0) out vec4 FragColor;"));
        assert!(wrapped.source.contains("sinestesia_user_main();"));
    }

    #[test]
    fn empty_source_declares_nothing() {
        let wrapped = wrap_fragment("");
        assert_eq!(wrapped.declared, DeclaredUniforms::default());
        assert!(wrapped.source.contains("void main()"));
    }

    #[test]
    fn fallback_declares_time() {
        let wrapped = wrap_fragment(FALLBACK_FRAGMENT);
        assert!(wrapped.declared.contains(Uniform::Time));
    }

    #[test]
    fn missing_file_reads_as_empty() {
        let source = load_shader_source(Path::new("/nonexistent/sinestesia/shader.frag"));
        assert!(source.is_empty());
    }
}
