use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use modulation::RegionBinding;
use renderer::RendererConfig;
use sceneconfig::{Preset, RegionSettings, SceneConfig};
use tracing::{debug, info};

use crate::cli::RunArgs;
use crate::paths::AppPaths;

/// Where the scene came from, for logging and `config where`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SceneSource {
    File(PathBuf),
    Preset(Preset),
}

impl fmt::Display for SceneSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SceneSource::File(path) => write!(f, "file {}", path.display()),
            SceneSource::Preset(preset) => write!(f, "preset {preset}"),
        }
    }
}

pub struct ResolvedScene {
    pub config: SceneConfig,
    pub source: SceneSource,
}

impl ResolvedScene {
    pub fn renderer_config(&self) -> RendererConfig {
        let window = &self.config.window;
        RendererConfig {
            surface_size: (window.width, window.height),
            fullscreen: window.fullscreen,
            title: window.title.clone(),
            shader_paths: self
                .config
                .regions
                .iter()
                .map(|region| region.shader.clone())
                .collect(),
            escape_presses: window.escape_presses,
        }
    }

    pub fn bindings(&self) -> Vec<RegionBinding> {
        self.config
            .resolved_regions()
            .iter()
            .map(RegionBinding::from)
            .collect()
    }
}

/// Picks the scene: `--config`, then `--preset`, then the user's config
/// file, then the triptych preset. CLI overrides are applied last.
pub fn resolve_scene(args: &RunArgs, paths: &AppPaths) -> Result<ResolvedScene> {
    let (mut config, source) = if let Some(path) = args.config.as_ref() {
        (load_config_file(path)?, SceneSource::File(path.clone()))
    } else if let Some(preset) = args.preset {
        (preset_config(preset, paths), SceneSource::Preset(preset))
    } else {
        let default_file = paths.config_file();
        if default_file.is_file() {
            (
                load_config_file(&default_file)?,
                SceneSource::File(default_file),
            )
        } else {
            debug!(
                path = %default_file.display(),
                "no user configuration; using the triptych preset"
            );
            (
                preset_config(Preset::Triptych, paths),
                SceneSource::Preset(Preset::Triptych),
            )
        }
    };

    apply_overrides(&mut config, args);
    config
        .validate()
        .with_context(|| format!("invalid scene from {source}"))?;

    info!(
        %source,
        regions = config.regions.len(),
        mode = ?config.mode,
        "resolved scene"
    );
    Ok(ResolvedScene { config, source })
}

fn load_config_file(path: &Path) -> Result<SceneConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read config at {}", path.display()))?;
    let mut config = SceneConfig::from_toml_str(&raw)
        .with_context(|| format!("failed to parse config at {}", path.display()))?;
    if let Some(parent) = path.parent() {
        config.resolve_relative_to(parent);
    }
    Ok(config)
}

fn preset_config(preset: Preset, paths: &AppPaths) -> SceneConfig {
    let mut config = SceneConfig::preset(preset);
    config.resolve_relative_to(paths.share_dir());
    config
}

pub fn apply_overrides(config: &mut SceneConfig, args: &RunArgs) {
    if let Some(device) = args.device.as_ref() {
        config.serial.device = device.clone();
    }
    if let Some(baud) = args.baud {
        config.serial.baud = baud;
    }
    if args.no_sensor {
        config.serial.enabled = false;
    }
    if args.window {
        config.window.fullscreen = false;
    }
    if let Some((width, height)) = args.size {
        config.window.width = width;
        config.window.height = height;
    }
    if !args.shaders.is_empty() {
        config.regions = args
            .shaders
            .iter()
            .map(|path| RegionSettings::new(path.clone()))
            .collect();
    }
}
